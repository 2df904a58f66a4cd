//! Exhaustive traversal of the automaton, split into independent units of work.

use core::fmt;

use dfatrie_types::{hex_bytes, BUNDLE_SIZE};

use crate::automaton::Automaton;
use crate::error::DfaError;

/// Default suffix count above which a state is split into one task per outgoing byte.
pub const DEFAULT_SPLIT_THRESHOLD: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalOptions {
    /// Byte emitted for states that accept any byte (immediates, displacements).
    pub any_byte: u8,
    /// Longest candidate the traversal may produce.
    pub max_length: usize,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            any_byte: 0x00,
            max_length: BUNDLE_SIZE,
        }
    }
}

/// Every candidate that starts with `prefix` and continues from `state`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraversalTask {
    pub prefix: Vec<u8>,
    pub state: usize,
}

impl fmt::Display for TraversalTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] @ state {}", hex_bytes(&self.prefix), self.state)
    }
}

impl Automaton {
    /// Partitions the traversal from the initial state into tasks.
    ///
    /// Each task is a distinct path prefix, so no candidate is reachable from two tasks and every
    /// candidate is reachable from one. A state is split further while it would emit more than
    /// `split_threshold` candidates; accepting and any-byte states are never split. Tasks that
    /// cannot emit anything are dropped.
    pub fn traversal_tasks(&self, split_threshold: u64) -> Result<Vec<TraversalTask>, DfaError> {
        let counts = self.suffix_counts()?;
        let mut tasks = Vec::new();
        let mut prefix = Vec::new();
        for t in self.initial_state().transitions() {
            for byte in t.bytes() {
                prefix.push(byte);
                self.collect_tasks(t.to, &counts, split_threshold, &mut prefix, &mut tasks);
                prefix.pop();
            }
        }
        Ok(tasks)
    }

    fn collect_tasks(
        &self,
        state: usize,
        counts: &[u64],
        split_threshold: u64,
        prefix: &mut Vec<u8>,
        tasks: &mut Vec<TraversalTask>,
    ) {
        if counts[state] == 0 {
            return;
        }
        let node = &self.states()[state];
        if node.accepting || node.any_byte().is_some() || counts[state] <= split_threshold {
            tasks.push(TraversalTask {
                prefix: prefix.clone(),
                state,
            });
            return;
        }
        for t in node.transitions() {
            for byte in t.bytes() {
                prefix.push(byte);
                self.collect_tasks(t.to, counts, split_threshold, prefix, tasks);
                prefix.pop();
            }
        }
    }

    /// Emits every candidate of `task` in ascending byte order.
    pub fn traverse<E, F>(
        &self,
        task: &TraversalTask,
        options: &TraversalOptions,
        mut callback: F,
    ) -> Result<(), E>
    where
        E: From<DfaError>,
        F: FnMut(&[u8]) -> Result<(), E>,
    {
        if task.state >= self.states().len() {
            return Err(DfaError::UnknownState { state: task.state }.into());
        }
        let mut path = task.prefix.clone();
        self.walk(task.state, options, &mut path, &mut callback)
    }

    /// Emits every candidate reachable from the initial state.
    pub fn traverse_all<E, F>(&self, options: &TraversalOptions, mut callback: F) -> Result<(), E>
    where
        E: From<DfaError>,
        F: FnMut(&[u8]) -> Result<(), E>,
    {
        let mut path = Vec::new();
        for t in self.initial_state().transitions() {
            for byte in t.bytes() {
                path.push(byte);
                self.walk(t.to, options, &mut path, &mut callback)?;
                path.pop();
            }
        }
        Ok(())
    }

    fn walk<E, F>(
        &self,
        state: usize,
        options: &TraversalOptions,
        path: &mut Vec<u8>,
        callback: &mut F,
    ) -> Result<(), E>
    where
        E: From<DfaError>,
        F: FnMut(&[u8]) -> Result<(), E>,
    {
        let node = &self.states()[state];
        if node.accepting {
            return callback(path);
        }
        if path.len() >= options.max_length && !node.transitions().is_empty() {
            return Err(DfaError::SequenceTooLong {
                prefix: path.clone(),
                max_length: options.max_length,
            }
            .into());
        }
        if let Some(to) = node.any_byte() {
            path.push(options.any_byte);
            self.walk(to, options, path, callback)?;
            path.pop();
            return Ok(());
        }
        for t in node.transitions() {
            for byte in t.bytes() {
                path.push(byte);
                self.walk(t.to, options, path, callback)?;
                path.pop();
            }
        }
        Ok(())
    }
}
