//! Decoder automaton model.
//!
//! The automaton is loaded once from JSON, validated, and then only read: suffix counting,
//! task partitioning and traversal all take `&self`, so one instance can be shared by every
//! worker thread.
//!
//! ```json
//! {
//!   "initial": 0,
//!   "states": [
//!     { "accepting": true, "transitions": [ { "begin": 144, "to": 0 }, { "begin": 176, "to": 1 } ] },
//!     { "transitions": [ { "begin": 0, "end": 255, "to": 0 } ] }
//!   ]
//! }
//! ```

mod automaton;
mod error;
mod traversal;

pub use automaton::{Automaton, State, Transition};
pub use error::DfaError;
pub use traversal::{TraversalOptions, TraversalTask, DEFAULT_SPLIT_THRESHOLD};
