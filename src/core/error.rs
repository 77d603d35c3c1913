// This module defines the error type for the firmlink backend using the thiserror crate.
// BackendError covers every way a pipeline stage can fail: an external toolchain utility
// exiting unsuccessfully or failing to start, generated LLVM IR failing verification (with
// the path of the forensic dump), LLVM itself refusing a target, pass pipeline or emission,
// address resolver or demangler output that does not have the expected record shape, emitted
// objects that do not parse, unknown target names, and plain I/O. Each variant carries the
// context needed to diagnose the failure without re-running the build. The module also
// provides BackendResult<T> as a convenience alias for Result<T, BackendError>.

//! Error types for the firmlink backend.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for every pipeline stage.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{program} invocation failed: {stderr}")]
    ToolInvocation {
        program: String,
        stderr: String,
    },

    #[error("cannot run {program}: {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("generated LLVM IR failed verification: {reason}{}", dump_note(.dump))]
    Verification {
        reason: String,
        dump: Option<PathBuf>,
    },

    #[error("LLVM {stage} failed: {message}")]
    Llvm {
        stage: &'static str,
        message: String,
    },

    #[error("malformed resolver output at line {line}: {reason}")]
    MalformedResolverOutput {
        line: usize,
        reason: String,
    },

    #[error("emitted object is malformed: {0}")]
    MalformedObject(String),

    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn dump_note(dump: &Option<PathBuf>) -> String {
    match dump {
        Some(path) => format!(" (broken IR dumped as {})", path.display()),
        None => String::new(),
    }
}

impl BackendError {
    pub(crate) fn llvm(stage: &'static str, message: impl ToString) -> Self {
        BackendError::Llvm {
            stage,
            message: message.to_string(),
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        BackendError::MalformedResolverOutput {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_invocation_message() {
        let err = BackendError::ToolInvocation {
            program: "or1k-linux-ld".to_string(),
            stderr: "undefined reference to `foo'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "or1k-linux-ld invocation failed: undefined reference to `foo'"
        );
    }

    #[test]
    fn test_verification_message_mentions_dump() {
        let err = BackendError::Verification {
            reason: "terminator missing".to_string(),
            dump: Some(PathBuf::from("/tmp/broken.ll")),
        };
        let message = err.to_string();
        assert!(message.contains("terminator missing"));
        assert!(message.contains("/tmp/broken.ll"));

        let err = BackendError::Verification {
            reason: "terminator missing".to_string(),
            dump: None,
        };
        assert!(!err.to_string().contains("dumped"));
    }
}
