use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use dfatrie_types::{Bitness, Gpr, BUNDLE_SIZE};

use crate::classify::{any_nonspecial_hypotheses, pad_to_bundle};
use crate::error::Result;
use crate::{RrOutcome, ValidatorOracle};

/// Oracle answering from explicit verdicts instead of a validator library.
///
/// Anything not listed is rejected. Used to replay recorded verdicts and to drive the
/// enumeration without the native validator.
#[derive(Debug, Default)]
pub struct TableOracle {
    chunks: HashSet<[u8; BUNDLE_SIZE]>,
    restricted: HashMap<(Vec<u8>, Option<Gpr>), Option<Gpr>>,
    chunk_calls: AtomicUsize,
    rr_calls: AtomicUsize,
}

impl TableOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts the bundle formed by padding `instruction` (x86-32 style validation).
    ///
    /// # Panics
    ///
    /// Panics if `instruction` is longer than a bundle.
    pub fn accept(mut self, instruction: &[u8]) -> Self {
        let bundle = pad_to_bundle(instruction).expect("instruction longer than a bundle");
        self.chunks.insert(bundle);
        self
    }

    /// Accepts `instruction` when `initial_rr` is restricted coming in, producing `final_rr`.
    pub fn accept_rr(
        mut self,
        instruction: &[u8],
        initial_rr: Option<Gpr>,
        final_rr: Option<Gpr>,
    ) -> Self {
        self.restricted
            .insert((instruction.to_vec(), initial_rr), final_rr);
        self
    }

    /// Accepts `instruction` under every hypothesis except a restricted `%rsp`/`%rbp`.
    pub fn accept_rr_any_nonspecial(mut self, instruction: &[u8], final_rr: Option<Gpr>) -> Self {
        for initial_rr in any_nonspecial_hypotheses() {
            self = self.accept_rr(instruction, initial_rr, final_rr);
        }
        self
    }

    pub fn chunk_calls(&self) -> usize {
        self.chunk_calls.load(Ordering::Relaxed)
    }

    pub fn rr_calls(&self) -> usize {
        self.rr_calls.load(Ordering::Relaxed)
    }
}

impl ValidatorOracle for TableOracle {
    fn validate_chunk(&self, bundle: &[u8], _bitness: Bitness) -> Result<bool> {
        self.chunk_calls.fetch_add(1, Ordering::Relaxed);
        Ok(<[u8; BUNDLE_SIZE]>::try_from(bundle).is_ok_and(|b| self.chunks.contains(&b)))
    }

    fn validate_with_rr(
        &self,
        bundle: &[u8],
        instruction_len: usize,
        initial_rr: Option<Gpr>,
    ) -> Result<RrOutcome> {
        self.rr_calls.fetch_add(1, Ordering::Relaxed);
        let instruction = &bundle[..instruction_len.min(bundle.len())];
        Ok(
            match self.restricted.get(&(instruction.to_vec(), initial_rr)) {
                Some(&final_rr) => RrOutcome::Valid { final_rr },
                None => RrOutcome::Invalid,
            },
        )
    }
}
