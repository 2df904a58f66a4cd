//! Parallel enumeration of a decoder automaton into a canonical trie.
//!
//! The automaton's candidate space is split into [`dfatrie_dfa::TraversalTask`]s. Each worker
//! thread walks one task at a time, confirms every candidate with the validator oracle and
//! builds a private subtrie; the orchestrator imports each finished [`TaskResult`] and merges it
//! into the global trie.

mod error;
mod orchestrator;
mod worker;

pub use error::{GenError, Result};
pub use orchestrator::{GenConfig, GenOutput, NoProgress, Orchestrator, Progress};
pub use worker::{TaskResult, WorkerState};
