use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use dfatrie_dfa::{Automaton, TraversalOptions, TraversalTask, DEFAULT_SPLIT_THRESHOLD};
use dfatrie_oracle::ValidatorOracle;
use dfatrie_trie::{NodeCache, NodeId};
use dfatrie_types::Bitness;

use crate::error::{GenError, Result};
use crate::worker::{TaskResult, WorkerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenConfig {
    pub bitness: Bitness,
    /// Worker threads; `0` is treated as `1`.
    pub jobs: usize,
    pub split_threshold: u64,
    pub traversal: TraversalOptions,
}

impl GenConfig {
    /// One worker per available CPU and the default task granularity.
    pub fn new(bitness: Bitness) -> Self {
        Self {
            bitness,
            jobs: thread::available_parallelism().map_or(1, |n| n.get()),
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
            traversal: TraversalOptions::default(),
        }
    }
}

/// Receives run progress on the orchestrator thread.
pub trait Progress {
    fn on_start(&mut self, _expected: u64, _tasks: usize) {}

    /// Called after every merged task. `processed` never decreases.
    fn on_merged(&mut self, processed: u64, expected: u64);
}

/// Discards progress reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_merged(&mut self, _processed: u64, _expected: u64) {}
}

/// The finished trie together with run statistics.
#[derive(Debug)]
pub struct GenOutput {
    pub cache: NodeCache,
    pub root: NodeId,
    pub total_instructions: u64,
    pub num_valid: u64,
    pub tasks: usize,
}

/// Drives the enumeration of an automaton across a pool of worker threads.
pub struct Orchestrator<'a, O: ?Sized> {
    automaton: &'a Automaton,
    oracle: &'a O,
    config: GenConfig,
}

impl<'a, O> Orchestrator<'a, O>
where
    O: ValidatorOracle + ?Sized,
{
    pub fn new(automaton: &'a Automaton, oracle: &'a O, config: GenConfig) -> Self {
        Self {
            automaton,
            oracle,
            config,
        }
    }

    /// Enumerates every candidate, confirms it with the oracle and merges the per-task tries.
    ///
    /// Tasks run on a pool of `jobs` threads and finish in any order; the merged trie does not
    /// depend on it. The first fatal error, including a panicking task, stops every worker at its
    /// next candidate and is returned.
    pub fn run(&self, progress: &mut dyn Progress) -> Result<GenOutput> {
        let expected = self.automaton.expected_instructions()?;
        let tasks = self.automaton.traversal_tasks(self.config.split_threshold)?;
        let jobs = self.config.jobs.clamp(1, tasks.len().max(1));
        tracing::info!(
            states = self.automaton.states().len(),
            expected_instructions = expected,
            tasks = tasks.len(),
            jobs,
            bitness = %self.config.bitness,
            "starting enumeration"
        );
        progress.on_start(expected, tasks.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|index| format!("dfatrie-worker-{index}"))
            .build()?;
        let abort = AtomicBool::new(false);
        let mut merged = Merged::new();
        let (tx, rx) = crossbeam_channel::unbounded::<Result<TaskResult>>();

        pool.in_place_scope(|scope| {
            for task in &tasks {
                let tx = tx.clone();
                let abort = &abort;
                scope.spawn(move |_| {
                    if abort.load(Ordering::Relaxed) {
                        return;
                    }
                    let result =
                        panic::catch_unwind(AssertUnwindSafe(|| self.run_task(task, abort)))
                            .unwrap_or_else(|_| Err(GenError::WorkerPanicked));
                    if result.is_err() {
                        abort.store(true, Ordering::Relaxed);
                    }
                    // The receiver outlives every job in this scope.
                    let _ = tx.send(result);
                });
            }
            drop(tx);

            for result in rx.iter() {
                match result.and_then(|r| merged.merge(r)) {
                    Ok(true) => progress.on_merged(merged.total_instructions, expected),
                    Ok(false) => {}
                    Err(err) => {
                        abort.store(true, Ordering::Relaxed);
                        merged.fail(err);
                    }
                }
            }
        });

        let output = merged.finish(tasks.len())?;
        tracing::info!(
            total_instructions = output.total_instructions,
            num_valid = output.num_valid,
            nodes = output.cache.len(),
            "enumeration finished"
        );
        Ok(output)
    }

    fn run_task(&self, task: &TraversalTask, abort: &AtomicBool) -> Result<TaskResult> {
        let mut worker = WorkerState::new(self.oracle, self.config.bitness, task.clone());
        self.automaton
            .traverse(task, &self.config.traversal, |instruction| {
                if abort.load(Ordering::Relaxed) {
                    return Err(GenError::Aborted);
                }
                worker.receive_instruction(instruction)
            })?;
        Ok(worker.finish())
    }
}

/// Orchestrator-side accumulation of finished tasks.
struct Merged {
    cache: NodeCache,
    root: NodeId,
    total_instructions: u64,
    num_valid: u64,
    error: Option<GenError>,
}

impl Merged {
    fn new() -> Self {
        let cache = NodeCache::new();
        let root = cache.empty();
        Self {
            cache,
            root,
            total_instructions: 0,
            num_valid: 0,
            error: None,
        }
    }

    /// Returns `false` when the result was dropped because the run already failed.
    fn merge(&mut self, result: TaskResult) -> Result<bool> {
        if self.error.is_some() {
            return Ok(false);
        }
        let sub = self.cache.import(&result.trie)?;
        self.root = self.cache.merge(self.root, sub)?;
        self.total_instructions += result.total_instructions;
        self.num_valid += result.num_valid;
        tracing::debug!(
            task = %result.task,
            instructions = result.total_instructions,
            valid = result.num_valid,
            "merged task"
        );
        Ok(true)
    }

    /// Records `err` unless a more informative error is already known.
    fn fail(&mut self, err: GenError) {
        match &self.error {
            Some(existing) if !existing.is_aborted() => {}
            _ => self.error = Some(err),
        }
    }

    fn finish(self, tasks: usize) -> Result<GenOutput> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(GenOutput {
            cache: self.cache,
            root: self.root,
            total_instructions: self.total_instructions,
            num_valid: self.num_valid,
            tasks,
        })
    }
}
