//! Error taxonomy for the assembler.
//!
//! Every variant here corresponds to one of the failure modes the translation
//! pipeline can hit: a malformed mnemonic, an out-of-range literal, or a
//! filesystem failure. None of these are recovered locally; the first one
//! aborts the run (see `main`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblerError {
    #[error("invalid {field} mnemonic {mnemonic:?} on line {line}")]
    InvalidMnemonic {
        field: &'static str,
        mnemonic: String,
        line: usize,
    },

    #[error("constant {value} on line {line} does not fit in 15 bits (max 32767)")]
    ConstantOverflow { value: i64, line: usize },

    #[error("{0}")]
    Parser(#[from] crate::parser::ParserError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssemblerError>;
