//! Batch execution of a build order
//!
//! Runs the compiler once per file, in order, and records an outcome for each
//! attempt. Compile failures never become errors here; they are data in the
//! [`BatchReport`].

use crate::compiler::Compiler;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Result of one compiler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

/// Outcome of compiling one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationOutcome {
    /// Source file
    pub path: PathBuf,
    /// Success or failure
    pub status: Status,
    /// Compiler diagnostic, present on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Wall time spent in the compiler
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl CompilationOutcome {
    /// Successful outcome
    pub fn success(path: impl Into<PathBuf>, duration: Duration) -> Self {
        Self {
            path: path.into(),
            status: Status::Success,
            diagnostic: None,
            duration,
        }
    }

    /// Failed outcome with a diagnostic
    pub fn failure(path: impl Into<PathBuf>, diagnostic: impl Into<String>, duration: Duration) -> Self {
        Self {
            path: path.into(),
            status: Status::Failure,
            diagnostic: Some(diagnostic.into()),
            duration,
        }
    }

    /// Check if this outcome is a success
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// How a batch ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Disposition {
    /// Every file was attempted
    Completed { failures: usize },
    /// Fail-fast stopped the batch at this file
    Aborted { at: PathBuf },
}

/// Ordered outcomes plus how the batch ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Outcomes in build order
    pub outcomes: Vec<CompilationOutcome>,
    /// Overall disposition
    pub disposition: Disposition,
}

impl BatchReport {
    /// Check if every file compiled and the batch was not aborted
    pub fn is_success(&self) -> bool {
        self.disposition == Disposition::Completed { failures: 0 }
    }

    /// Number of successful outcomes
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of failed outcomes
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Failed outcomes in build order
    pub fn failures(&self) -> impl Iterator<Item = &CompilationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Sort outcomes by each file's position in `order`
    ///
    /// Files missing from `order` keep their relative order at the end.
    pub fn sort_by_order(&mut self, order: &[PathBuf]) {
        let position: HashMap<&Path, usize> = order
            .iter()
            .enumerate()
            .map(|(i, path)| (path.as_path(), i))
            .collect();
        self.outcomes
            .sort_by_key(|o| position.get(o.path.as_path()).copied().unwrap_or(usize::MAX));
    }

    /// Process exit code for this report: 0 only for a clean completion
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Execution policy for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Stop at the first failure
    pub fail_fast: bool,
    /// Maximum concurrent compiler invocations; 1 means strictly sequential
    pub jobs: usize,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            fail_fast: false,
            jobs: 1,
        }
    }
}

/// Receives progress notifications while a batch runs
///
/// Called from worker threads in parallel mode.
pub trait ProgressObserver: Send + Sync {
    /// A batch of `total` files is starting
    fn batch_started(&self, _total: usize) {}
    /// A file is about to be compiled
    fn file_started(&self, _index: usize, _total: usize, _path: &Path) {}
    /// A file finished
    fn file_finished(&self, _index: usize, _total: usize, _outcome: &CompilationOutcome) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Runs a build order through a compiler
pub struct BatchExecutor<'o> {
    policy: ExecutionPolicy,
    observer: &'o dyn ProgressObserver,
}

impl BatchExecutor<'static> {
    /// Create an executor with the given policy
    pub fn new(policy: ExecutionPolicy) -> Self {
        Self {
            policy,
            observer: &NoProgress,
        }
    }
}

impl<'o> BatchExecutor<'o> {
    /// Report progress to `observer`
    pub fn with_observer<'n>(self, observer: &'n dyn ProgressObserver) -> BatchExecutor<'n> {
        BatchExecutor {
            policy: self.policy,
            observer,
        }
    }

    /// Compile every file in `order`
    ///
    /// Files run one at a time, strictly in order. Duplicate entries are
    /// attempted once.
    pub fn run(&self, order: &[PathBuf], compiler: &dyn Compiler) -> BatchReport {
        let unique = dedup(order);
        self.observer.batch_started(unique.len());

        let mut outcomes = Vec::with_capacity(unique.len());
        for (index, path) in unique.iter().enumerate() {
            let outcome = self.compile_one(index, unique.len(), path, compiler);
            let failed = !outcome.is_success();
            outcomes.push(outcome);

            if failed && self.policy.fail_fast {
                tracing::info!(file = %path.display(), "fail-fast: aborting batch");
                return BatchReport {
                    outcomes,
                    disposition: Disposition::Aborted {
                        at: path.to_path_buf(),
                    },
                };
            }
        }

        completed(outcomes)
    }

    /// Compile dependency levels with bounded parallelism
    ///
    /// `levels` must be grouped so that no file depends on a file in its own
    /// or a later group; each group runs on a pool of `jobs` threads.
    /// Outcomes are reported in the order the files appear across `levels`.
    /// Under fail-fast, no file is started once a failure is seen: files
    /// already running finish, the rest of the level and every later level
    /// are left out of the report.
    pub fn run_levels(&self, levels: &[Vec<PathBuf>], compiler: &dyn Compiler) -> BatchReport {
        if self.policy.jobs <= 1 {
            let order: Vec<PathBuf> = levels.iter().flatten().cloned().collect();
            return self.run(&order, compiler);
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.policy.jobs)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(error = %e, "cannot start worker pool, compiling sequentially");
                let order: Vec<PathBuf> = levels.iter().flatten().cloned().collect();
                return self.run(&order, compiler);
            }
        };

        let mut seen = HashSet::new();
        let levels: Vec<Vec<&PathBuf>> = levels
            .iter()
            .map(|level| level.iter().filter(|p| seen.insert(p.as_path())).collect())
            .collect();
        let total = levels.iter().map(Vec::len).sum();
        self.observer.batch_started(total);

        let halted = AtomicBool::new(false);
        let mut outcomes: Vec<CompilationOutcome> = Vec::with_capacity(total);
        let mut offset = 0;
        for level in levels {
            // Workers take files in level order; each slot is written at most once.
            let next = AtomicUsize::new(0);
            let slots: Vec<OnceLock<CompilationOutcome>> = level.iter().map(|_| OnceLock::new()).collect();

            pool.scope(|scope| {
                for _ in 0..self.policy.jobs.min(level.len()) {
                    scope.spawn(|_| {
                        while !halted.load(Ordering::SeqCst) {
                            let i = next.fetch_add(1, Ordering::SeqCst);
                            let Some(path) = level.get(i) else { break };

                            let outcome = self.compile_one(offset + i, total, path, compiler);
                            if self.policy.fail_fast && !outcome.is_success() {
                                halted.store(true, Ordering::SeqCst);
                            }
                            let _ = slots[i].set(outcome);
                        }
                    });
                }
            });
            offset += level.len();

            let slots: Vec<CompilationOutcome> = slots.into_iter().filter_map(OnceLock::into_inner).collect();
            let first_failure = slots.iter().find(|o| !o.is_success()).map(|o| o.path.clone());
            outcomes.extend(slots);

            if let (Some(at), true) = (first_failure, self.policy.fail_fast) {
                tracing::info!(file = %at.display(), "fail-fast: aborting batch");
                return BatchReport {
                    outcomes,
                    disposition: Disposition::Aborted { at },
                };
            }
        }

        completed(outcomes)
    }

    fn compile_one(
        &self,
        index: usize,
        total: usize,
        path: &Path,
        compiler: &dyn Compiler,
    ) -> CompilationOutcome {
        self.observer.file_started(index, total, path);
        tracing::debug!(file = %path.display(), "[{}/{}] compiling", index + 1, total);

        let start = Instant::now();
        let outcome = match compiler.compile(path) {
            Ok(()) => CompilationOutcome::success(path, start.elapsed()),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "compilation failed");
                CompilationOutcome::failure(path, e.diagnostic(), start.elapsed())
            }
        };

        self.observer.file_finished(index, total, &outcome);
        outcome
    }
}

fn completed(outcomes: Vec<CompilationOutcome>) -> BatchReport {
    let failures = outcomes.iter().filter(|o| !o.is_success()).count();
    BatchReport {
        outcomes,
        disposition: Disposition::Completed { failures },
    }
}

/// First occurrence of each path, in order
fn dedup(order: &[PathBuf]) -> Vec<&PathBuf> {
    let mut seen = HashSet::with_capacity(order.len());
    order
        .iter()
        .filter(|p| seen.insert(p.as_path()))
        .collect()
}

pub(crate) fn serialize_secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Records every invocation; fails files whose name is listed
    struct StubCompiler {
        failing: Vec<&'static str>,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl StubCompiler {
        fn failing(failing: &[&'static str]) -> Self {
            Self {
                failing: failing.to_vec(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Compiler for StubCompiler {
        fn compile(&self, source: &Path) -> Result<(), CompileError> {
            self.calls.lock().unwrap().push(source.to_path_buf());
            if self.failing.iter().any(|f| source.ends_with(f)) {
                Err(CompileError::Exited {
                    exit_code: Some(1),
                    diagnostic: format!("cannot compile {}", source.display()),
                })
            } else {
                Ok(())
            }
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn statuses(report: &BatchReport) -> Vec<Status> {
        report.outcomes.iter().map(|o| o.status).collect()
    }

    #[test]
    fn test_continue_on_error() {
        let compiler = StubCompiler::failing(&["B.sol"]);
        let report = BatchExecutor::new(ExecutionPolicy::default())
            .run(&paths(&["A.sol", "B.sol", "C.sol"]), &compiler);

        assert_eq!(
            statuses(&report),
            vec![Status::Success, Status::Failure, Status::Success]
        );
        assert_eq!(report.disposition, Disposition::Completed { failures: 1 });
        assert_eq!(
            report.outcomes[1].diagnostic.as_deref(),
            Some("cannot compile B.sol")
        );
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_fail_fast_short_circuits() {
        let compiler = StubCompiler::failing(&["B.sol"]);
        let policy = ExecutionPolicy {
            fail_fast: true,
            jobs: 1,
        };
        let report = BatchExecutor::new(policy).run(&paths(&["A.sol", "B.sol", "C.sol"]), &compiler);

        assert_eq!(statuses(&report), vec![Status::Success, Status::Failure]);
        assert_eq!(
            report.disposition,
            Disposition::Aborted {
                at: PathBuf::from("B.sol")
            }
        );
        assert_eq!(compiler.calls(), paths(&["A.sol", "B.sol"]));
        assert!(!report.is_success());
    }

    #[test]
    fn test_all_success() {
        let compiler = StubCompiler::failing(&[]);
        let report = BatchExecutor::new(ExecutionPolicy::default())
            .run(&paths(&["A.sol", "B.sol"]), &compiler);

        assert!(report.is_success());
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_empty_order() {
        let compiler = StubCompiler::failing(&[]);
        let report = BatchExecutor::new(ExecutionPolicy::default()).run(&[], &compiler);
        assert!(report.outcomes.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn test_duplicates_attempted_once() {
        let compiler = StubCompiler::failing(&["A.sol"]);
        let report = BatchExecutor::new(ExecutionPolicy::default())
            .run(&paths(&["A.sol", "B.sol", "A.sol"]), &compiler);

        assert_eq!(compiler.calls(), paths(&["A.sol", "B.sol"]));
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.disposition, Disposition::Completed { failures: 1 });
    }

    #[test]
    fn test_parallel_levels_report_in_order() {
        let compiler = StubCompiler::failing(&["C.sol"]);
        let levels = vec![paths(&["A.sol", "B.sol", "C.sol", "D.sol"]), paths(&["E.sol"])];
        let policy = ExecutionPolicy {
            fail_fast: false,
            jobs: 4,
        };

        let report = BatchExecutor::new(policy).run_levels(&levels, &compiler);

        let order: Vec<_> = report.outcomes.iter().map(|o| o.path.clone()).collect();
        assert_eq!(order, paths(&["A.sol", "B.sol", "C.sol", "D.sol", "E.sol"]));
        assert_eq!(report.disposition, Disposition::Completed { failures: 1 });
    }

    #[test]
    fn test_parallel_fail_fast_skips_later_levels() {
        let compiler = StubCompiler::failing(&["B.sol"]);
        let levels = vec![paths(&["A.sol", "B.sol"]), paths(&["C.sol"])];
        let policy = ExecutionPolicy {
            fail_fast: true,
            jobs: 2,
        };

        let report = BatchExecutor::new(policy).run_levels(&levels, &compiler);

        assert_eq!(report.outcomes.len(), 2);
        assert!(!compiler.calls().contains(&PathBuf::from("C.sol")));
        assert_eq!(
            report.disposition,
            Disposition::Aborted {
                at: PathBuf::from("B.sol")
            }
        );
    }

    #[test]
    fn test_parallel_fail_fast_stops_starting_files_in_level() {
        /// Fails `A0.sol` at once; every other file takes a while
        struct SlowSuccess(Mutex<Vec<PathBuf>>);

        impl Compiler for SlowSuccess {
            fn compile(&self, source: &Path) -> Result<(), CompileError> {
                self.0.lock().unwrap().push(source.to_path_buf());
                if source.ends_with("A0.sol") {
                    return Err(CompileError::Other("boom".to_string()));
                }
                std::thread::sleep(Duration::from_millis(100));
                Ok(())
            }
        }

        let names: Vec<String> = (0..8).map(|i| format!("A{i}.sol")).collect();
        let level: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();
        let policy = ExecutionPolicy {
            fail_fast: true,
            jobs: 2,
        };
        let compiler = SlowSuccess(Mutex::new(Vec::new()));

        let report = BatchExecutor::new(policy).run_levels(&[level], &compiler);

        let calls = compiler.0.lock().unwrap().clone();
        assert!(calls.len() <= 2, "started after failure: {:?}", calls);
        assert_eq!(report.outcomes.len(), calls.len());
        assert_eq!(report.outcomes[0].path, PathBuf::from("A0.sol"));
        assert_eq!(
            report.disposition,
            Disposition::Aborted {
                at: PathBuf::from("A0.sol")
            }
        );
    }

    #[test]
    fn test_sort_by_order() {
        let mut report = BatchReport {
            outcomes: vec![
                CompilationOutcome::success("C.sol", Duration::ZERO),
                CompilationOutcome::success("X.sol", Duration::ZERO),
                CompilationOutcome::success("A.sol", Duration::ZERO),
            ],
            disposition: Disposition::Completed { failures: 0 },
        };
        report.sort_by_order(&paths(&["A.sol", "B.sol", "C.sol"]));

        let order: Vec<_> = report.outcomes.iter().map(|o| o.path.clone()).collect();
        assert_eq!(order, paths(&["A.sol", "C.sol", "X.sol"]));
    }

    #[test]
    fn test_run_levels_sequential_matches_run() {
        let levels = vec![paths(&["A.sol"]), paths(&["B.sol", "C.sol"])];
        let flat = paths(&["A.sol", "B.sol", "C.sol"]);
        let executor = BatchExecutor::new(ExecutionPolicy::default());

        let a = executor.run_levels(&levels, &StubCompiler::failing(&["B.sol"]));
        let b = executor.run(&flat, &StubCompiler::failing(&["B.sol"]));

        assert_eq!(statuses(&a), statuses(&b));
        assert_eq!(a.disposition, b.disposition);
    }

    #[test]
    fn test_observer_sees_every_file() {
        #[derive(Default)]
        struct Counting(Mutex<Vec<(usize, usize)>>);

        impl ProgressObserver for Counting {
            fn file_finished(&self, index: usize, total: usize, _outcome: &CompilationOutcome) {
                self.0.lock().unwrap().push((index, total));
            }
        }

        let observer = Counting::default();
        let compiler = StubCompiler::failing(&[]);
        BatchExecutor::new(ExecutionPolicy::default())
            .with_observer(&observer)
            .run(&paths(&["A.sol", "B.sol"]), &compiler);

        assert_eq!(*observer.0.lock().unwrap(), vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn test_report_json_shape() {
        let report = BatchReport {
            outcomes: vec![
                CompilationOutcome::success("A.sol", Duration::from_millis(500)),
                CompilationOutcome::failure("B.sol", "boom", Duration::ZERO),
            ],
            disposition: Disposition::Completed { failures: 1 },
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "outcomes": [
                    { "path": "A.sol", "status": "success", "duration": 0.5 },
                    { "path": "B.sol", "status": "failure", "diagnostic": "boom", "duration": 0.0 }
                ],
                "disposition": { "kind": "completed", "failures": 1 }
            })
        );
    }
}
