use std::io;

use dfatrie_types::hex_bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DfaError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("automaton json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("automaton has no states")]
    NoStates,

    #[error("initial state {initial} out of range ({states} states)")]
    InitialOutOfRange { initial: usize, states: usize },

    #[error("state {state}: transition target {to} out of range")]
    TransitionOutOfRange { state: usize, to: usize },

    #[error("state {state}: empty byte range {begin:#04x}..={end:#04x}")]
    EmptyRange { state: usize, begin: u8, end: u8 },

    #[error("state {state}: byte {byte:#04x} has more than one transition")]
    OverlappingTransitions { state: usize, byte: u8 },

    #[error("initial state is not accepting")]
    InitialNotAccepting,

    #[error("initial state matches any byte")]
    InitialAnyByte,

    #[error("state {state} is on a cycle that never reaches an accepting state")]
    Cycle { state: usize },

    #[error("number of suffixes from state {state} overflows u64")]
    SuffixCountOverflow { state: usize },

    #[error("candidate [{}] exceeds {max_length} bytes", hex_bytes(.prefix))]
    SequenceTooLong { prefix: Vec<u8>, max_length: usize },

    #[error("traversal task refers to state {state}, which does not exist")]
    UnknownState { state: usize },
}
