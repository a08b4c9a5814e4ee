/// Build system error types
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

/// Fatal errors that abort a run
///
/// Per-file compile failures are not here; they are recorded as outcomes in
/// the batch report.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(#[from] solbatch_config::ConfigError),

    #[error("Cannot read directory {path}: {error}")]
    DirectoryUnreadable { path: PathBuf, error: String },

    #[error("Circular dependency detected: {cycle}")]
    CycleDetected { cycle: String },

    #[error("Bundle directory {bundle} must not be inside output directory {output}")]
    BundleInsideOutput { bundle: PathBuf, output: PathBuf },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl BuildError {
    /// Create a directory-unreadable error
    pub fn directory_unreadable(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::DirectoryUnreadable {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a cycle error from the nodes along the cycle
    ///
    /// The first node is repeated at the end: `a.sol -> b.sol -> a.sol`.
    pub fn cycle(path: &[PathBuf]) -> Self {
        Self::CycleDetected {
            cycle: path
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> "),
        }
    }
}

/// Failure of a single compiler invocation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("compiler exited with {}", describe_status(.exit_code))]
    Exited {
        exit_code: Option<i32>,
        diagnostic: String,
    },

    #[error("failed to launch compiler '{program}': {error}")]
    Spawn { program: String, error: String },

    #[error("compiler timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),

    #[error("{0}")]
    Other(String),
}

fn describe_status(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl CompileError {
    /// Text carried into a failure outcome
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Exited { diagnostic, .. } if !diagnostic.trim().is_empty() => {
                diagnostic.trim_end().to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_rendering() {
        let err = BuildError::cycle(&[
            PathBuf::from("a.sol"),
            PathBuf::from("b.sol"),
            PathBuf::from("a.sol"),
        ]);
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: a.sol -> b.sol -> a.sol"
        );
    }

    #[test]
    fn test_diagnostic_prefers_compiler_text() {
        let err = CompileError::Exited {
            exit_code: Some(1),
            diagnostic: "Error: ParserError\n".to_string(),
        };
        assert_eq!(err.diagnostic(), "Error: ParserError");
    }

    #[test]
    fn test_diagnostic_falls_back_to_display() {
        let err = CompileError::Exited {
            exit_code: Some(3),
            diagnostic: String::new(),
        };
        assert_eq!(err.diagnostic(), "compiler exited with status 3");

        let err = CompileError::TimedOut(Duration::from_secs(2));
        assert_eq!(err.diagnostic(), "compiler timed out after 2s");
    }
}
