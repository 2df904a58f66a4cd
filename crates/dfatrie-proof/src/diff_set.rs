use std::collections::BTreeSet;

use dfatrie_trie::{diff_tries, NodeCache, NodeId};
use dfatrie_types::{AcceptInfo, Bitness, Gpr, InputRr};

use crate::disasm::Disassembler;
use crate::error::{ProofError, Result};
use crate::operands::Operands;
use crate::parse::parse_instruction;

/// Restricted register requirements of a trie entry, as carried by [`Operands`].
///
/// Only a specific input register is a requirement; [`InputRr::AnyNonSpecial`] imposes none.
pub fn rr_from_accept_info(
    info: &AcceptInfo,
    bitness: Bitness,
) -> Result<(Option<Gpr>, Option<Gpr>)> {
    info.check(bitness)?;
    let input_rr = match info.input_rr {
        InputRr::Register(reg) => Some(reg),
        InputRr::Unrestricted | InputRr::AnyNonSpecial => None,
    };
    Ok((input_rr, info.output_rr))
}

/// Instructions on which two tries disagree, grouped by the side that accepts them.
pub struct TrieDiffSet<'a, D: ?Sized> {
    disassembler: &'a D,
    bitness: Bitness,
    pub accept_trie1: BTreeSet<Operands>,
    pub accept_trie2: BTreeSet<Operands>,
}

impl<'a, D> TrieDiffSet<'a, D>
where
    D: Disassembler + ?Sized,
{
    pub fn new(disassembler: &'a D, bitness: Bitness) -> Self {
        Self {
            disassembler,
            bitness,
            accept_trie1: BTreeSet::new(),
            accept_trie2: BTreeSet::new(),
        }
    }

    /// Records one differing sequence. Each side that accepts it gets an entry.
    pub fn process(
        &mut self,
        sequence: &[u8],
        info1: Option<&AcceptInfo>,
        info2: Option<&AcceptInfo>,
    ) -> Result<()> {
        let disassembly = self.disassembler.disassemble(sequence, self.bitness)?;
        let [text] = disassembly.as_slice() else {
            return Err(ProofError::InstructionCount {
                sequence: sequence.to_vec(),
                count: disassembly.len(),
            });
        };
        let tokens = parse_instruction(text)?.into_tokens();

        if let Some(info) = info1 {
            let (input_rr, output_rr) = rr_from_accept_info(info, self.bitness)?;
            self.accept_trie1.insert(Operands {
                disasms: tokens.clone(),
                input_rr,
                output_rr,
            });
        }
        if let Some(info) = info2 {
            let (input_rr, output_rr) = rr_from_accept_info(info, self.bitness)?;
            self.accept_trie2.insert(Operands {
                disasms: tokens,
                input_rr,
                output_rr,
            });
        }
        Ok(())
    }

    /// Feeds every difference between `a` and `b` through [`TrieDiffSet::process`].
    pub fn collect(&mut self, cache: &NodeCache, a: NodeId, b: NodeId) -> Result<()> {
        diff_tries(cache, a, b, |sequence, info1, info2| {
            self.process(sequence, info1, info2)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.accept_trie1.is_empty() && self.accept_trie2.is_empty()
    }
}
