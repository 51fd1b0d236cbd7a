//! Error types for record protection

use thiserror::Error;

/// Errors from key derivation and record protection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Requested expansion output is zero or exceeds `255 * HashLen`
    #[error("invalid expansion length: requested {requested}, maximum {max}")]
    InvalidLength {
        /// Requested output length
        requested: usize,
        /// Largest length the expansion function can produce
        max: usize,
    },

    /// Prefixed label or context does not fit its 1-byte length prefix
    #[error("invalid label or context: {length} bytes exceeds 255")]
    InvalidLabel {
        /// Encoded length that did not fit
        length: usize,
    },

    /// Secret has the wrong length for a traffic secret or HKDF key
    #[error("invalid secret length: need {expected} bytes, got {actual}")]
    InvalidSecretLength {
        /// Required secret length (hash output size)
        expected: usize,
        /// Actual secret length
        actual: usize,
    },

    /// AEAD key length is neither 16 nor 32 bytes
    #[error("unsupported AEAD key length: {0}")]
    UnsupportedKeyLength(usize),

    /// Record is structurally invalid (too short, or no content type)
    #[error("malformed record: {reason}")]
    MalformedRecord {
        /// What was wrong with the record
        reason: String,
    },

    /// Record or payload exceeds the protocol maximum
    #[error("record too large: {length} bytes exceeds {max}")]
    RecordOverflow {
        /// Offending length
        length: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Authentication tag did not verify (corrupted or forged record)
    #[error("record authentication failed at sequence number {sequence_number}")]
    AuthenticationFailed {
        /// Sequence number the record was opened under
        sequence_number: u64,
    },

    /// Record authenticated but its inner plaintext is invalid (no content
    /// type, or too long). The peer sent it, so this is a protocol violation.
    #[error("unexpected message: invalid inner plaintext at sequence number {sequence_number}")]
    UnexpectedMessage {
        /// Sequence number the record was opened under
        sequence_number: u64,
    },

    /// Sequence number space is used up; the direction must be rekeyed
    #[error("sequence number space exhausted")]
    Exhausted,

    /// Protector was closed or replaced by a key update
    #[error("record protector is closed")]
    Closed,
}

impl RecordError {
    /// Returns true if the connection must be torn down.
    ///
    /// Everything else is a caller bug or bad input that leaves the protector
    /// usable.
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            Self::AuthenticationFailed { .. }
            | Self::UnexpectedMessage { .. }
            | Self::Exhausted => true,

            Self::InvalidLength { .. }
            | Self::InvalidLabel { .. }
            | Self::InvalidSecretLength { .. }
            | Self::UnsupportedKeyLength(_)
            | Self::MalformedRecord { .. }
            | Self::RecordOverflow { .. }
            | Self::Closed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failure_is_fatal() {
        let err = RecordError::AuthenticationFailed { sequence_number: 7 };
        assert!(err.is_connection_fatal());
    }

    #[test]
    fn unexpected_message_is_fatal() {
        let err = RecordError::UnexpectedMessage { sequence_number: 4 };
        assert!(err.is_connection_fatal());
    }

    #[test]
    fn secret_length_display() {
        let err = RecordError::InvalidSecretLength { expected: 32, actual: 31 };
        assert_eq!(err.to_string(), "invalid secret length: need 32 bytes, got 31");
    }

    #[test]
    fn exhaustion_is_fatal() {
        assert!(RecordError::Exhausted.is_connection_fatal());
    }

    #[test]
    fn caller_errors_are_not_fatal() {
        let errors = [
            RecordError::InvalidLength { requested: 9000, max: 8160 },
            RecordError::InvalidLabel { length: 300 },
            RecordError::InvalidSecretLength { expected: 32, actual: 4 },
            RecordError::UnsupportedKeyLength(24),
            RecordError::MalformedRecord { reason: "short".to_string() },
            RecordError::RecordOverflow { length: 20000, max: 16640 },
            RecordError::Closed,
        ];

        for err in errors {
            assert!(!err.is_connection_fatal(), "{err} should not be fatal");
        }
    }

    #[test]
    fn error_display() {
        let err = RecordError::InvalidLength { requested: 9000, max: 8160 };
        assert_eq!(err.to_string(), "invalid expansion length: requested 9000, maximum 8160");

        let err = RecordError::AuthenticationFailed { sequence_number: 3 };
        assert_eq!(err.to_string(), "record authentication failed at sequence number 3");
    }
}
