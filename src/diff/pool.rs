//! Bounded worker pool for per-partition diffs.
//!
//! One engine invocation runs per partition map entry on a fixed-size rayon
//! pool, never one thread per partition, which does not scale when the
//! partition count is large. Each completed result or failure is appended to
//! a single shared collection guarded by one mutex; the lock covers only the
//! append, never the computation. After `run` returns, exactly one outcome
//! exists per dispatched partition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use super::engine::DiffEngine;
use super::paths::PartitionPathMap;
use super::DiffResult;

/// Configuration for the diff worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads. Bounded regardless of partition count.
    pub workers: usize,
    /// Optional abort flag: stops dispatching new partitions and lets
    /// in-flight units fail fast on their next blocking call.
    pub abort: Option<Arc<AtomicBool>>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            abort: None,
        }
    }
}

impl PoolConfig {
    /// Set the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the abort flag.
    #[must_use]
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = Some(flag);
        self
    }
}

/// A partition whose diff did not complete, with the recorded reason.
#[derive(Debug, Clone)]
pub struct PartitionFailure {
    /// Partition the unit was dispatched for.
    pub partition: String,
    /// Why the unit failed.
    pub error: String,
}

/// Aggregated outcome of one pool run.
///
/// `results.len() + failures.len()` always equals the number of dispatched
/// partitions: a unit that fails silently is a defect, not a possibility.
#[derive(Debug, Default)]
pub struct DiffReport {
    /// Completed diffs, in completion order.
    pub results: Vec<DiffResult>,
    /// Recorded failures, in completion order.
    pub failures: Vec<PartitionFailure>,
    /// Whether the run was cut short by the abort signal.
    pub interrupted: bool,
}

impl DiffReport {
    /// Total outcomes: successes plus recorded failures.
    #[must_use]
    pub fn outcome_count(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// Whether every dispatched partition produced a result.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fans per-partition diff computations out over a bounded pool and joins
/// before returning.
pub struct DiffWorkerPool {
    config: PoolConfig,
}

impl DiffWorkerPool {
    /// Create a pool with the given configuration.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    fn is_aborted(&self) -> bool {
        self.config
            .abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Run one engine invocation per map entry and join.
    ///
    /// Blocks until every dispatched unit has either produced a result or
    /// recorded a failure. Units not yet dispatched when the abort flag is
    /// raised are recorded as aborted failures, so the outcome count still
    /// matches the partition count.
    #[must_use]
    pub fn run(&self, engine: &DiffEngine<'_>, map: &PartitionPathMap) -> DiffReport {
        log::info!(
            "Dispatching {} partition diffs over {} workers",
            map.len(),
            self.config.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .unwrap_or_else(|_| {
                log::warn!(
                    "Failed to create bounded thread pool, using global pool with {} threads",
                    rayon::current_num_threads()
                );
                rayon::ThreadPoolBuilder::new().build().unwrap()
            });

        let entries: Vec<(&String, &std::path::PathBuf)> = map.iter().collect();
        let outcomes: Mutex<Vec<Result<DiffResult, PartitionFailure>>> =
            Mutex::new(Vec::with_capacity(entries.len()));

        pool.install(|| {
            entries.par_iter().for_each(|(partition, path)| {
                let outcome = if self.is_aborted() {
                    log::debug!("Abort raised, not dispatching '{}'", partition);
                    Err(PartitionFailure {
                        partition: (*partition).clone(),
                        error: "aborted before dispatch".to_string(),
                    })
                } else {
                    engine
                        .diff_partition(partition, path)
                        .map_err(|e| PartitionFailure {
                            partition: (*partition).clone(),
                            error: e.to_string(),
                        })
                };

                // The lock guards only this append.
                let mut guard = outcomes.lock().expect("diff outcome collection poisoned");
                guard.push(outcome);
            });
        });

        let mut report = DiffReport {
            interrupted: self.is_aborted(),
            ..Default::default()
        };
        for outcome in outcomes.into_inner().expect("diff outcome collection poisoned") {
            match outcome {
                Ok(result) => report.results.push(result),
                Err(failure) => {
                    log::error!(
                        "Diff of partition '{}' failed: {}",
                        failure.partition,
                        failure.error
                    );
                    report.failures.push(failure);
                }
            }
        }

        log::info!(
            "Joined diff workers: {} results, {} failures",
            report.results.len(),
            report.failures.len()
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_builders() {
        let flag = Arc::new(AtomicBool::new(false));
        let config = PoolConfig::default()
            .with_workers(8)
            .with_abort_flag(flag.clone());

        assert_eq!(config.workers, 8);
        flag.store(true, Ordering::SeqCst);
        assert!(config.abort.unwrap().load(Ordering::SeqCst));
    }

    #[test]
    fn test_report_outcome_count() {
        let report = DiffReport {
            results: vec![DiffResult {
                partition: "a".to_string(),
                missing_lines: vec![],
            }],
            failures: vec![PartitionFailure {
                partition: "b".to_string(),
                error: "boom".to_string(),
            }],
            interrupted: false,
        };

        assert_eq!(report.outcome_count(), 2);
        assert!(!report.all_succeeded());
    }
}
