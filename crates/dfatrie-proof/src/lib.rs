//! Reviewable differences between two tries.
//!
//! Each sequence on which two tries disagree is disassembled and recorded as [`Operands`] on the
//! side that accepts it. The operand constructors ([`all_memory_operands`], [`ops_prod`], ...)
//! build the sets those differences are expected to equal, so a proof is a set comparison.

mod diff_set;
mod disasm;
mod error;
mod operands;
mod parse;

pub use diff_set::{rr_from_accept_info, TrieDiffSet};
pub use disasm::{Disassembler, IcedDisassembler};
pub use error::{ProofError, Result};
pub use operands::{
    all_memory_operands, all_xmm_operands, all_ymm_operands, memory_operands_template,
    merge_operands, ops_prod, Operands,
};
pub use parse::{parse_instruction, ParsedInstruction};
