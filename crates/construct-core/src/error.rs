//! The error taxonomy every construct surfaces.
//!
//! One variant per failure kind named in the engine's design: intermediate
//! constructs never recover from these (the sole exception is [`crate::constructs::adapters::Repeat`],
//! which treats a clean failure of its child as end-of-sequence).

use thiserror::Error;

/// Dotted path of field names from the root construct down to the point of failure,
/// e.g. `"header.width"`.
pub fn join_path(path: &[String]) -> String {
    path.join(".")
}

#[derive(Debug, Error)]
pub enum ConstructError {
    #[error("unexpected end of stream at {path} (position {position})")]
    UnexpectedEnd { path: String, position: u64 },

    #[error("const mismatch at {path} (position {position}): expected {expected:?}, found {found:?}")]
    ConstMismatch {
        path: String,
        position: u64,
        expected: Vec<u8>,
        found: Vec<u8>,
    },

    #[error("length mismatch at {path} (position {position}): {message}")]
    LengthMismatch {
        path: String,
        position: u64,
        message: String,
    },

    #[error("value out of range at {path} (position {position}): {message}")]
    OutOfRange {
        path: String,
        position: u64,
        message: String,
    },

    #[error("framing error at {path} (position {position}): {message}")]
    FramingError {
        path: String,
        position: u64,
        message: String,
    },

    #[error("switch had no matching case at {path} (position {position})")]
    SwitchNoMatch { path: String, position: u64 },

    #[error("unknown enum value at {path} (position {position}): {message}")]
    UnknownEnumValue {
        path: String,
        position: u64,
        message: String,
    },

    #[error("unknown enum label at {path}: {message}")]
    UnknownEnumLabel { path: String, message: String },

    #[error("checksum mismatch at {path} (position {position})")]
    ChecksumMismatch { path: String, position: u64 },

    #[error("adapter transform failed at {path} (position {position}): {source}")]
    AdapterFailure {
        path: String,
        position: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("sizeof is unknown for construct at {path}")]
    SizeofUnknown { path: String },

    #[error("explicit failure raised at {path} (position {position}): {message}")]
    Raised {
        path: String,
        position: u64,
        message: String,
    },
}

impl ConstructError {
    pub fn unexpected_end(path: &[String], position: u64) -> Self {
        Self::UnexpectedEnd {
            path: join_path(path),
            position,
        }
    }

    pub fn const_mismatch(path: &[String], position: u64, expected: Vec<u8>, found: Vec<u8>) -> Self {
        Self::ConstMismatch {
            path: join_path(path),
            position,
            expected,
            found,
        }
    }

    pub fn length_mismatch(path: &[String], position: u64, message: impl Into<String>) -> Self {
        Self::LengthMismatch {
            path: join_path(path),
            position,
            message: message.into(),
        }
    }

    pub fn out_of_range(path: &[String], position: u64, message: impl Into<String>) -> Self {
        Self::OutOfRange {
            path: join_path(path),
            position,
            message: message.into(),
        }
    }

    pub fn framing(path: &[String], position: u64, message: impl Into<String>) -> Self {
        Self::FramingError {
            path: join_path(path),
            position,
            message: message.into(),
        }
    }

    pub fn switch_no_match(path: &[String], position: u64) -> Self {
        Self::SwitchNoMatch {
            path: join_path(path),
            position,
        }
    }

    pub fn unknown_enum_value(path: &[String], position: u64, message: impl Into<String>) -> Self {
        Self::UnknownEnumValue {
            path: join_path(path),
            position,
            message: message.into(),
        }
    }

    pub fn unknown_enum_label(path: &[String], message: impl Into<String>) -> Self {
        Self::UnknownEnumLabel {
            path: join_path(path),
            message: message.into(),
        }
    }

    pub fn checksum_mismatch(path: &[String], position: u64) -> Self {
        Self::ChecksumMismatch {
            path: join_path(path),
            position,
        }
    }

    pub fn adapter_failure(path: &[String], position: u64, source: anyhow::Error) -> Self {
        Self::AdapterFailure {
            path: join_path(path),
            position,
            source,
        }
    }

    pub fn sizeof_unknown(path: &[String]) -> Self {
        Self::SizeofUnknown {
            path: join_path(path),
        }
    }

    pub fn raised(path: &[String], position: u64, message: impl Into<String>) -> Self {
        Self::Raised {
            path: join_path(path),
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConstructError>;
