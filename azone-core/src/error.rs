use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`AzoneError`].
///
/// Callers use this to decide whether a failure is the user's input, a
/// configuration/programming mistake, or an environmental problem, without
/// matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input text, or an allocator that ran out of children.
    InvalidArgument,
    /// A CIDR prefix length outside the supported `0..=30` range.
    PrefixLengthOutOfRange,
    /// Misuse of an API or an impossible configuration.
    Logic,
    /// A runtime condition the caller could not have checked up front.
    Runtime,
    /// A lookup for a name that does not exist.
    NotFound,
    /// Reading or writing durable state failed.
    Persistence,
}

#[derive(Error, Debug)]
pub enum AzoneError {
    #[error("Invalid IP address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("Invalid CIDR '{input}': {reason}")]
    InvalidCidr { input: String, reason: String },

    #[error("Prefix length {prefix} is out of range, expected 0-30")]
    PrefixLengthOutOfRange { prefix: String },

    #[error("No more /{child_prefix} subnets available in {parent}")]
    SubnetsExhausted { parent: String, child_prefix: u8 },

    #[error("Invalid operation '{operation}': {reason}")]
    InvalidOperation { operation: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Could not find a free /{prefix_length} subnet in {range} after {attempts} attempts")]
    SubnetGenerationFailed {
        range: String,
        prefix_length: u8,
        attempts: usize,
    },

    #[error("No availability zone is currently available")]
    NoZoneAvailable,

    #[error("Host command '{command}' failed: {details}")]
    HostCommand { command: String, details: String },

    #[error("Availability zone not found: {name}")]
    ZoneNotFound { name: String },

    #[error("IO error during {operation} on {path:?}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt state in {path:?}: {message}")]
    CorruptState { path: PathBuf, message: String },
}

pub type AzoneResult<T> = std::result::Result<T, AzoneError>;

impl AzoneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AzoneError::InvalidAddress { .. }
            | AzoneError::InvalidCidr { .. }
            | AzoneError::SubnetsExhausted { .. } => ErrorKind::InvalidArgument,
            AzoneError::PrefixLengthOutOfRange { .. } => ErrorKind::PrefixLengthOutOfRange,
            AzoneError::InvalidOperation { .. } | AzoneError::Configuration { .. } => {
                ErrorKind::Logic
            }
            AzoneError::SubnetGenerationFailed { .. }
            | AzoneError::NoZoneAvailable
            | AzoneError::HostCommand { .. } => ErrorKind::Runtime,
            AzoneError::ZoneNotFound { .. } => ErrorKind::NotFound,
            AzoneError::Io { .. } | AzoneError::CorruptState { .. } => ErrorKind::Persistence,
        }
    }

    pub(crate) fn io(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        AzoneError::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        AzoneError::CorruptState {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let cases = vec![
            (
                AzoneError::InvalidCidr {
                    input: "192.168/16".to_string(),
                    reason: "missing octets".to_string(),
                },
                ErrorKind::InvalidArgument,
            ),
            (
                AzoneError::PrefixLengthOutOfRange {
                    prefix: "31".to_string(),
                },
                ErrorKind::PrefixLengthOutOfRange,
            ),
            (
                AzoneError::SubnetsExhausted {
                    parent: "10.0.0.0/23".to_string(),
                    child_prefix: 24,
                },
                ErrorKind::InvalidArgument,
            ),
            (AzoneError::NoZoneAvailable, ErrorKind::Runtime),
            (
                AzoneError::ZoneNotFound {
                    name: "zone9".to_string(),
                },
                ErrorKind::NotFound,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.kind(), expected, "unexpected kind for {}", error);
        }
    }

    #[test]
    fn test_generation_failure_mentions_subnet() {
        let error = AzoneError::SubnetGenerationFailed {
            range: "10.97.0.0/16".to_string(),
            prefix_length: 24,
            attempts: 100,
        };
        assert!(error.to_string().contains("subnet"));
    }
}
