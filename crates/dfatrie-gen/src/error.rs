use dfatrie_dfa::DfaError;
use dfatrie_oracle::OracleError;
use dfatrie_trie::TrieError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenError>;

#[derive(Debug, Error)]
pub enum GenError {
    #[error(transparent)]
    Dfa(#[from] DfaError),

    #[error(transparent)]
    Trie(#[from] TrieError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("worker thread panicked")]
    WorkerPanicked,

    /// Another worker failed first; this task was abandoned.
    #[error("task aborted")]
    Aborted,
}

impl GenError {
    pub(crate) fn is_aborted(&self) -> bool {
        matches!(self, GenError::Aborted)
    }
}
