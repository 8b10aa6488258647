//! Error taxonomy for the VM translator.
//!
//! Covers every recoverable failure mode of translation: a VM command that
//! doesn't resolve to a known operator, a command missing a required
//! argument, a path with no `.vm` input to translate, or a filesystem
//! failure. None of these are recovered locally; translation stops at the
//! first one.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("unknown command {command:?} on line {line}")]
    UnknownCommand { command: String, line: usize },

    #[error("command {command:?} on line {line} is missing a required argument")]
    MissingArgument { command: String, line: usize },

    #[error("no .vm input found at {path}")]
    NoInputFound { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TranslateError>;
