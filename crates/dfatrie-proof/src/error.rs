use dfatrie_types::{hex_bytes, Gpr, TypeError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProofError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    /// At most one part of an instruction may require a restricted register on input.
    #[error("both operand groups require an input restricted register ({left} and {right})")]
    DuplicateInputRr { left: Gpr, right: Gpr },

    #[error("both operand groups produce an output restricted register ({left} and {right})")]
    DuplicateOutputRr { left: Gpr, right: Gpr },

    #[error("{0:?} is not a 64-bit general purpose register")]
    UnknownRegister(String),

    #[error("[{}] is not a valid instruction", hex_bytes(.sequence))]
    InvalidEncoding { sequence: Vec<u8> },

    #[error("[{}] disassembles to {count} instructions, expected exactly one", hex_bytes(.sequence))]
    InstructionCount { sequence: Vec<u8>, count: usize },

    #[error("cannot parse instruction {0:?}")]
    UnparsableInstruction(String),

    #[error(transparent)]
    AcceptInfo(#[from] TypeError),
}
