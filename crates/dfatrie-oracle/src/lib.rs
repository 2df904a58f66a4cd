//! The validator oracle: the authority that confirms automaton-accepted candidates.
//!
//! The automaton's accepting states are necessary but not sufficient; validator actions can
//! still reject a sequence. [`classify_instruction`] asks the oracle and turns its answers into
//! the [`dfatrie_types::AcceptInfo`] recorded in the trie.

mod classify;
mod error;
mod native;
mod table;

use dfatrie_types::{Bitness, Gpr};

pub use classify::{
    any_nonspecial_hypotheses, classify_instruction, format_rr_info, pad_to_bundle,
    rr_hypotheses,
};
pub use error::{OracleError, Result};
pub use native::{NativeValidator, NC_NO_REG};
pub use table::TableOracle;

/// Verdict of a single restricted-register validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RrOutcome {
    Invalid,
    Valid { final_rr: Option<Gpr> },
}

/// Read-only validator interface shared by all workers.
///
/// Implementations must be deterministic: the enumeration never retries a call, and a different
/// answer for the same question would make the resulting trie meaningless.
pub trait ValidatorOracle: Send + Sync {
    /// Validates a whole bundle with no restricted-register context.
    fn validate_chunk(&self, bundle: &[u8], bitness: Bitness) -> Result<bool>;

    /// Validates the first `instruction_len` bytes of an x86-64 bundle assuming `initial_rr` is
    /// restricted on entry.
    fn validate_with_rr(
        &self,
        bundle: &[u8],
        instruction_len: usize,
        initial_rr: Option<Gpr>,
    ) -> Result<RrOutcome>;
}

impl<T: ValidatorOracle + ?Sized> ValidatorOracle for &T {
    fn validate_chunk(&self, bundle: &[u8], bitness: Bitness) -> Result<bool> {
        (**self).validate_chunk(bundle, bitness)
    }

    fn validate_with_rr(
        &self,
        bundle: &[u8],
        instruction_len: usize,
        initial_rr: Option<Gpr>,
    ) -> Result<RrOutcome> {
        (**self).validate_with_rr(bundle, instruction_len, initial_rr)
    }
}
