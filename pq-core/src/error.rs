//! A real `thiserror` enum rather than `pq_base::Error`'s opaque,
//! backtrace-carrying style: that style suits "something went wrong, log it
//! and bail", but this crate's callers need to distinguish a malformed file
//! from an unsupported codec from a truncated stream, matching on variant
//! rather than message text.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParquetError>;

#[derive(Debug, Error)]
pub enum ParquetError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unknown enum value: {0}")]
    UnknownEnum(String),

    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("malformed: {0}")]
    Malformed(String),

    #[error("truncated: {0}")]
    Truncated(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Logs at error level, once, on construction, rather than only at the
/// top-level boundary.
macro_rules! fail {
    ($variant:ident, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        tracing::error!(target: "pq_core", kind = stringify!($variant), "{}", msg);
        $crate::error::ParquetError::$variant(msg)
    }};
}
pub(crate) use fail;
