use dfatrie_dfa::TraversalTask;
use dfatrie_oracle::{classify_instruction, ValidatorOracle};
use dfatrie_trie::{NodeCache, TrieImage, UncompressedNode};
use dfatrie_types::Bitness;

use crate::error::Result;

/// Everything a worker hands back for one finished task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub task: TraversalTask,
    /// Candidates the automaton produced for the task.
    pub total_instructions: u64,
    /// Candidates the oracle confirmed.
    pub num_valid: u64,
    pub trie: TrieImage,
}

/// Per-task accumulator. Owned by exactly one worker thread.
pub struct WorkerState<'a, O: ?Sized> {
    oracle: &'a O,
    bitness: Bitness,
    task: TraversalTask,
    cache: NodeCache,
    sub_trie: UncompressedNode,
    total_instructions: u64,
    num_valid: u64,
}

impl<'a, O> WorkerState<'a, O>
where
    O: ValidatorOracle + ?Sized,
{
    pub fn new(oracle: &'a O, bitness: Bitness, task: TraversalTask) -> Self {
        Self {
            oracle,
            bitness,
            task,
            cache: NodeCache::new(),
            sub_trie: UncompressedNode::new(),
            total_instructions: 0,
            num_valid: 0,
        }
    }

    /// Confirms one automaton-accepted candidate and records it if the oracle agrees.
    pub fn receive_instruction(&mut self, instruction: &[u8]) -> Result<()> {
        self.total_instructions += 1;
        if let Some(info) = classify_instruction(self.oracle, self.bitness, instruction)? {
            self.sub_trie.insert(instruction, info)?;
            self.num_valid += 1;
        }
        Ok(())
    }

    pub fn total_instructions(&self) -> u64 {
        self.total_instructions
    }

    pub fn num_valid(&self) -> u64 {
        self.num_valid
    }

    pub fn finish(mut self) -> TaskResult {
        let root = self.cache.canonicalize(&self.sub_trie);
        TaskResult {
            trie: self.cache.export(root),
            task: self.task,
            total_instructions: self.total_instructions,
            num_valid: self.num_valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfatrie_oracle::{OracleError, TableOracle};
    use dfatrie_types::{AcceptInfo, Gpr, InputRr};

    use crate::error::GenError;

    fn task() -> TraversalTask {
        TraversalTask {
            prefix: vec![],
            state: 0,
        }
    }

    #[test]
    fn counts_candidates_and_keeps_only_valid_ones() {
        let oracle = TableOracle::new().accept(&[0x90]);
        let mut worker = WorkerState::new(&oracle, Bitness::X86_32, task());
        worker.receive_instruction(&[0x90]).unwrap();
        worker.receive_instruction(&[0x91]).unwrap();
        assert_eq!(worker.total_instructions(), 2);
        assert_eq!(worker.num_valid(), 1);

        let result = worker.finish();
        let mut cache = NodeCache::new();
        let root = cache.import(&result.trie).unwrap();
        assert_eq!(cache.lookup(root, &[0x90]), Some(&AcceptInfo::EMPTY));
        assert_eq!(cache.lookup(root, &[0x91]), None);
        assert_eq!(result.total_instructions, 2);
        assert_eq!(result.num_valid, 1);
    }

    #[test]
    fn records_restricted_register_info() {
        let seq = [0x4b, 0x8b, 0x04, 0x1c];
        let oracle = TableOracle::new().accept_rr(&seq, Some(Gpr::R11), None);
        let mut worker = WorkerState::new(&oracle, Bitness::X86_64, task());
        worker.receive_instruction(&seq).unwrap();

        let result = worker.finish();
        let mut cache = NodeCache::new();
        let root = cache.import(&result.trie).unwrap();
        assert_eq!(
            cache.lookup(root, &seq),
            Some(&AcceptInfo::new(InputRr::Register(Gpr::R11), None))
        );
    }

    #[test]
    fn oracle_errors_carry_the_sequence() {
        let seq = [0x45, 0x89, 0xff];
        let oracle = TableOracle::new().accept_rr(&seq, None, Some(Gpr::R15));
        let mut worker = WorkerState::new(&oracle, Bitness::X86_64, task());
        match worker.receive_instruction(&seq).unwrap_err() {
            GenError::Oracle(OracleError::R15Restricted { sequence }) => {
                assert_eq!(sequence, seq.to_vec())
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn a_candidate_and_its_extension_are_both_kept() {
        let oracle = TableOracle::new().accept(&[0x66]).accept(&[0x66, 0x90]);
        let mut worker = WorkerState::new(&oracle, Bitness::X86_32, task());
        worker.receive_instruction(&[0x66]).unwrap();
        worker.receive_instruction(&[0x66, 0x90]).unwrap();
        let result = worker.finish();
        let mut cache = NodeCache::new();
        let root = cache.import(&result.trie).unwrap();
        assert_eq!(cache.count_sequences(root), 2);
    }
}
