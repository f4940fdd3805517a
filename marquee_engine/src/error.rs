//! Typed errors for the fallible, non-script-facing parts of the engine.
//!
//! Problems inside a running script are [`Diagnostic`](crate::diagnostic::Diagnostic)s;
//! the errors here are the ones a caller must handle.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to compile a pattern specification string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,
    #[error("malformed pattern token '{0}' (expected <marker>/<value>)")]
    MalformedToken(String),
    #[error("unknown pattern marker '{marker}' in token '{token}'")]
    UnknownMarker { marker: String, token: String },
    #[error("rest token '{0}' must be the last token of a pattern")]
    RestNotLast(String),
}

/// Failure to evaluate an expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("syntax error in '{expression}': {reason}")]
    Syntax { expression: String, reason: String },
    #[error("division by zero in '{0}'")]
    DivisionByZero(String),
    #[error("type error in '{expression}': {reason}")]
    Type { expression: String, reason: String },
    #[error("evaluation of '{expression}' failed: {reason}")]
    Engine { expression: String, reason: String },
}

/// Fatal problems while reading a script from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("script file '{}' not found", .0.display())]
    MissingScript(PathBuf),
    #[error("failed to read script file '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_script_names_the_file() {
        let err = LoadError::MissingScript(PathBuf::from("show/script.txt"));
        assert_eq!(err.to_string(), "script file 'show/script.txt' not found");
    }

    #[test]
    fn pattern_errors_render_their_token() {
        let err = PatternError::UnknownMarker {
            marker: "@".into(),
            token: "@/x".into(),
        };
        assert!(err.to_string().contains("@/x"));
    }
}
