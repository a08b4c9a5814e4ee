//! Compiler invocation
//!
//! The executor only knows the [`Compiler`] trait. [`ForgeCompiler`] is the
//! process-backed implementation that shells out to `forge build`.

use crate::error::CompileError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Compiles one source file
///
/// `Sync` so the bounded-parallel executor can share one compiler across its
/// worker threads.
pub trait Compiler: Sync {
    /// Compile `source`, writing any artifacts wherever the compiler is
    /// configured to write them
    fn compile(&self, source: &Path) -> Result<(), CompileError>;
}

impl<F> Compiler for F
where
    F: Fn(&Path) -> Result<(), CompileError> + Sync,
{
    fn compile(&self, source: &Path) -> Result<(), CompileError> {
        self(source)
    }
}

/// Lines of stdout kept as the diagnostic when stderr is empty
const STDOUT_TAIL_LINES: usize = 40;

/// Runs `<program> build <file> [--zksync] --out <dir> [extra args...]`
#[derive(Debug, Clone)]
pub struct ForgeCompiler {
    /// Executable name or path
    pub program: String,
    /// Working directory for the process (the project root)
    pub working_dir: PathBuf,
    /// Directory passed as `--out`
    pub output_dir: PathBuf,
    /// Pass `--zksync`
    pub zksync: bool,
    /// Extra arguments appended after the generated ones
    pub extra_args: Vec<String>,
    /// Kill the process after this long
    pub timeout: Option<Duration>,
}

impl ForgeCompiler {
    /// Create a compiler running `forge` with zksync enabled
    pub fn new(working_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "forge".to_string(),
            working_dir: working_dir.into(),
            output_dir: output_dir.into(),
            zksync: true,
            extra_args: Vec::new(),
            timeout: None,
        }
    }

    /// Use a different executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Enable/disable `--zksync`
    pub fn with_zksync(mut self, zksync: bool) -> Self {
        self.zksync = zksync;
        self
    }

    /// Append extra arguments
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Set per-invocation timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments for compiling `source`
    pub fn args(&self, source: &Path) -> Vec<String> {
        let mut args = vec!["build".to_string(), source.display().to_string()];
        if self.zksync {
            args.push("--zksync".to_string());
        }
        args.push("--out".to_string());
        args.push(self.output_dir.display().to_string());
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn spawn(&self, source: &Path) -> Result<Child, CompileError> {
        let args = self.args(source);
        tracing::debug!(program = %self.program, args = ?args, "spawning compiler");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so a timeout also reaches solc/zksolc children.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command
            .spawn()
            .map_err(|e| CompileError::Spawn {
                program: self.program.clone(),
                error: e.to_string(),
            })
    }
}

impl Compiler for ForgeCompiler {
    fn compile(&self, source: &Path) -> Result<(), CompileError> {
        let mut child = self.spawn(source)?;

        // Drain both pipes on their own threads so a chatty compiler cannot
        // block on a full pipe while we wait for it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        // On timeout the drain threads are detached: a grandchild that
        // escaped the kill may still hold the pipes open.
        let status = wait(&mut child, self.timeout)?;

        let stdout = stdout.map(join_drain).unwrap_or_default();
        let stderr = stderr.map(join_drain).unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        let diagnostic = if stderr.trim().is_empty() {
            tail(&stdout, STDOUT_TAIL_LINES)
        } else {
            stderr
        };

        Err(CompileError::Exited {
            exit_code: status.code(),
            diagnostic,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_drain(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Wait for `child`, killing it once `timeout` has elapsed
fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, CompileError> {
    let io_error = |e: std::io::Error| CompileError::Other(format!("failed to wait for compiler: {e}"));

    let Some(limit) = timeout else {
        return child.wait().map_err(io_error);
    };

    let deadline = Instant::now() + limit;
    let mut backoff = Duration::from_millis(5);

    loop {
        if let Some(status) = child.try_wait().map_err(io_error)? {
            return Ok(status);
        }

        let now = Instant::now();
        if now >= deadline {
            kill_tree(child);
            let _ = child.wait();
            return Err(CompileError::TimedOut(limit));
        }

        thread::sleep(backoff.min(deadline - now));
        backoff = (backoff * 2).min(Duration::from_millis(100));
    }
}

/// Kill `child` and every process in its group
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: plain syscall; the group id is the child's pid from `process_group(0)`.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_args() {
        let compiler = ForgeCompiler::new("/p", "/p/out");
        assert_eq!(
            compiler.args(Path::new("/p/contracts/A.sol")),
            vec!["build", "/p/contracts/A.sol", "--zksync", "--out", "/p/out"]
        );
    }

    #[test]
    fn test_args_without_zksync_with_extras() {
        let compiler = ForgeCompiler::new("/p", "out")
            .with_zksync(false)
            .with_extra_args(vec!["--force".to_string()]);
        assert_eq!(
            compiler.args(Path::new("A.sol")),
            vec!["build", "A.sol", "--out", "out", "--force"]
        );
    }

    #[test]
    fn test_closure_is_a_compiler() {
        let compiler = |path: &Path| {
            if path.ends_with("Bad.sol") {
                Err(CompileError::Other("bad".to_string()))
            } else {
                Ok(())
            }
        };
        assert!(compiler.compile(Path::new("Good.sol")).is_ok());
        assert!(compiler.compile(Path::new("Bad.sol")).is_err());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = ForgeCompiler::new(dir.path(), dir.path().join("out"))
            .with_program("solbatch-definitely-not-a-real-binary");
        assert!(matches!(
            compiler.compile(Path::new("A.sol")),
            Err(CompileError::Spawn { .. })
        ));
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\nd", 2), "c\nd");
        assert_eq!(tail("a", 5), "a");
        assert_eq!(tail("", 5), "");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use pretty_assertions::assert_eq;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        /// Write an executable shell script standing in for `forge`
        fn fake_forge(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-forge");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn compiler(dir: &Path, body: &str) -> ForgeCompiler {
            let program = fake_forge(dir, body);
            ForgeCompiler::new(dir, dir.join("out")).with_program(program.display().to_string())
        }

        #[test]
        fn test_zero_exit_is_success() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = compiler(dir.path(), "echo compiled \"$2\"; exit 0");
            assert!(compiler.compile(Path::new("A.sol")).is_ok());
        }

        #[test]
        fn test_nonzero_exit_carries_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = compiler(dir.path(), "echo 'Error: boom' >&2; exit 3");
            match compiler.compile(Path::new("A.sol")) {
                Err(CompileError::Exited {
                    exit_code,
                    diagnostic,
                }) => {
                    assert_eq!(exit_code, Some(3));
                    assert_eq!(diagnostic.trim(), "Error: boom");
                }
                other => panic!("expected Exited, got {:?}", other),
            }
        }

        #[test]
        fn test_nonzero_exit_falls_back_to_stdout() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = compiler(dir.path(), "echo 'Compiler run failed'; exit 1");
            let err = compiler.compile(Path::new("A.sol")).unwrap_err();
            assert_eq!(err.diagnostic(), "Compiler run failed");
        }

        #[test]
        fn test_timeout_kills_process() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = compiler(dir.path(), "exec sleep 5")
                .with_timeout(Some(Duration::from_millis(200)));

            let started = Instant::now();
            let result = compiler.compile(Path::new("A.sol"));

            assert!(matches!(result, Err(CompileError::TimedOut(_))));
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn test_timeout_reaches_grandchildren() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = compiler(dir.path(), "echo starting; sleep 5; echo done")
                .with_timeout(Some(Duration::from_millis(200)));

            let started = Instant::now();
            let result = compiler.compile(Path::new("A.sol"));

            assert!(matches!(result, Err(CompileError::TimedOut(_))));
            assert!(started.elapsed() < Duration::from_secs(4));
        }
    }
}
