use thiserror::Error;

use crate::protocol::address::ValueKind;

/// Failure taxonomy for controller memory transactions.
///
/// The three classes are deliberately distinct so that callers can react
/// without string-matching on messages:
/// - `Classification` is a caller/configuration bug and is never retried.
/// - `Transport` is surfaced verbatim; reconnection policy belongs to the
///   process lifecycle layer, not to the core.
/// - `DecodeInvariant` cannot occur when classification is correct and is
///   treated as a defect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlcError {
    /// The symbolic address matches no known pattern.
    #[error("unknown memory area for '{address}'")]
    Classification { address: String },

    /// Connection failure, timeout, or a rejection from the device.
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// Buffer length does not match the width inferred from the address.
    #[error("buffer length mismatch: expected {expected} bytes, got {actual}")]
    DecodeInvariant { expected: usize, actual: usize },

    /// The value handed to a write does not match the address's inferred type.
    #[error("value type mismatch for '{address}': address expects {expected}")]
    ValueMismatch { address: String, expected: ValueKind },
}

impl PlcError {
    pub fn classification(address: impl Into<String>) -> Self {
        Self::Classification {
            address: address.into(),
        }
    }

    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    /// Whether the error is a transient transport-level condition (as opposed
    /// to a programming/configuration error).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<std::io::Error> for PlcError {
    fn from(err: std::io::Error) -> Self {
        Self::transport(err)
    }
}
