use std::collections::BTreeSet;

use dfatrie_types::{AcceptInfo, Bitness, Gpr, InputRr, BUNDLE_SIZE, NOP};

use crate::error::{OracleError, Result};
use crate::{RrOutcome, ValidatorOracle};

/// Appends NOPs so `instruction` fills a whole bundle.
pub fn pad_to_bundle(instruction: &[u8]) -> Result<[u8; BUNDLE_SIZE]> {
    if instruction.len() > BUNDLE_SIZE {
        return Err(OracleError::TooLong {
            sequence: instruction.to_vec(),
            bundle_size: BUNDLE_SIZE,
        });
    }
    let mut bundle = [NOP; BUNDLE_SIZE];
    bundle[..instruction.len()].copy_from_slice(instruction);
    Ok(bundle)
}

/// Every incoming restriction state an x86-64 instruction is checked under: nothing restricted,
/// then each general purpose register.
pub fn rr_hypotheses() -> impl Iterator<Item = Option<Gpr>> {
    core::iter::once(None).chain(Gpr::ALL.into_iter().map(Some))
}

/// The hypothesis set that collapses to [`InputRr::AnyNonSpecial`]: every hypothesis except a
/// restricted `%rsp` or `%rbp`.
pub fn any_nonspecial_hypotheses() -> BTreeSet<Option<Gpr>> {
    rr_hypotheses()
        .filter(|rr| !rr.is_some_and(Gpr::is_special))
        .collect()
}

/// Re-checks an automaton-accepted candidate with the oracle and derives its accept info.
///
/// Returns `Ok(None)` when the oracle rejects the candidate. On x86-64 every hypothesis is tried,
/// even after one succeeds, because the set of valid inputs is itself recorded.
pub fn classify_instruction<O>(
    oracle: &O,
    bitness: Bitness,
    instruction: &[u8],
) -> Result<Option<AcceptInfo>>
where
    O: ValidatorOracle + ?Sized,
{
    let bundle = pad_to_bundle(instruction)?;
    match bitness {
        Bitness::X86_32 => {
            let valid = oracle.validate_chunk(&bundle, bitness)?;
            Ok(valid.then_some(AcceptInfo::EMPTY))
        }
        Bitness::X86_64 => {
            let mut valid_inputs = BTreeSet::new();
            let mut valid_outputs = BTreeSet::new();
            for initial_rr in rr_hypotheses() {
                if let RrOutcome::Valid { final_rr } =
                    oracle.validate_with_rr(&bundle, instruction.len(), initial_rr)?
                {
                    valid_inputs.insert(initial_rr);
                    valid_outputs.insert(final_rr);
                }
            }
            if valid_inputs.is_empty() {
                return Ok(None);
            }
            if valid_outputs.len() != 1 {
                return Err(OracleError::MultipleOutputRr {
                    sequence: instruction.to_vec(),
                    outputs: valid_outputs.into_iter().collect(),
                });
            }
            let output_rr = valid_outputs.into_iter().next().flatten();
            format_rr_info(instruction, &valid_inputs, output_rr).map(Some)
        }
    }
}

/// Folds the set of valid incoming hypotheses and the single outgoing register into the form
/// stored in the trie.
pub fn format_rr_info(
    instruction: &[u8],
    valid_inputs: &BTreeSet<Option<Gpr>>,
    output_rr: Option<Gpr>,
) -> Result<AcceptInfo> {
    let input_rr = match valid_inputs.len() {
        0 => {
            return Err(OracleError::InvalidInputRrSet {
                sequence: instruction.to_vec(),
                inputs: Vec::new(),
            })
        }
        1 => match valid_inputs.iter().next().copied().flatten() {
            None => InputRr::Unrestricted,
            Some(reg) => InputRr::Register(reg),
        },
        _ => {
            if *valid_inputs != any_nonspecial_hypotheses() {
                return Err(OracleError::InvalidInputRrSet {
                    sequence: instruction.to_vec(),
                    inputs: valid_inputs.iter().copied().collect(),
                });
            }
            InputRr::AnyNonSpecial
        }
    };

    if output_rr == Some(Gpr::R15) {
        return Err(OracleError::R15Restricted {
            sequence: instruction.to_vec(),
        });
    }

    Ok(AcceptInfo::new(input_rr, output_rr))
}
