use std::path::PathBuf;

use dfatrie_types::{hex_bytes, Gpr};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OracleError>;

fn rr_list(regs: &[Option<Gpr>]) -> String {
    regs.iter()
        .map(|r| r.map_or("none", Gpr::name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("instruction [{}] is longer than a {bundle_size}-byte bundle", hex_bytes(.sequence))]
    TooLong {
        sequence: Vec<u8>,
        bundle_size: usize,
    },

    /// The outgoing restriction must not depend on which incoming restriction was assumed.
    #[error("[{}] produces different output restricted registers: {}", hex_bytes(.sequence), rr_list(.outputs))]
    MultipleOutputRr {
        sequence: Vec<u8>,
        outputs: Vec<Option<Gpr>>,
    },

    #[error("[{}] is valid under an unexpected set of input restricted registers: {}", hex_bytes(.sequence), rr_list(.inputs))]
    InvalidInputRrSet {
        sequence: Vec<u8>,
        inputs: Vec<Option<Gpr>>,
    },

    #[error("[{}] produces %r15 as a restricted register", hex_bytes(.sequence))]
    R15Restricted { sequence: Vec<u8> },

    #[error("failed to load validator library {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("validator library does not export {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("validator returned unknown register number {0}")]
    UnknownRegister(i32),

    #[error("instruction length {len} does not fit the validator interface")]
    LengthOutOfRange { len: usize },
}
