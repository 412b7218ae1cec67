//! Error type for handler lifecycle operations
//!
//! Every `prepare_*`/`finalize_*` call reports a [`Status`]. Failures carry a
//! machine-readable kind string (see [`TransferError::kind`]) so a transfer
//! engine can decide how to react without matching on messages.
//!
//! Contract violations (touching an unprepared stream, finalizing without a
//! successful prepare) are not represented here. They panic.

use std::io;

use crate::handler::TransferId;

/// Machine-readable kind for [`TransferError::Unimplemented`]
pub const ERROR_KIND_UNIMPLEMENTED: &str = "unimplemented";

/// Machine-readable kind for [`TransferError::Unbound`]
pub const ERROR_KIND_FAILED_PRECONDITION: &str = "failed_precondition";

/// Machine-readable kind for [`TransferError::AlreadyExists`]
pub const ERROR_KIND_ALREADY_EXISTS: &str = "already_exists";

/// Machine-readable kind for [`TransferError::AlreadyLinked`]
pub const ERROR_KIND_ALREADY_LINKED: &str = "already_linked";

/// Machine-readable kind for [`TransferError::NotFound`]
pub const ERROR_KIND_NOT_FOUND: &str = "not_found";

/// Machine-readable kind for [`TransferError::Io`]
pub const ERROR_KIND_IO_ERROR: &str = "io_error";

/// Machine-readable kind for [`TransferError::DataLoss`]
pub const ERROR_KIND_DATA_LOSS: &str = "data_loss";

/// Machine-readable kind for [`TransferError::Aborted`]
pub const ERROR_KIND_ABORTED: &str = "aborted";

/// Result of a lifecycle call
///
/// Also passed to `finalize_*` to tell the handler how the transfer ended.
pub type Status = Result<(), TransferError>;

/// Error type for handler and registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// The handler never supports this direction
    ///
    /// Permanent: an engine must not retry the same direction on this handler.
    #[error("transfer direction not supported by this handler")]
    Unimplemented,

    /// No stream with the required facet is bound to the handler
    #[error("no stream bound to handler {0}")]
    Unbound(TransferId),

    /// Another handler with the same ID is already registered
    #[error("transfer id {0} is already registered")]
    AlreadyExists(TransferId),

    /// The handler is already linked into a registry
    #[error("handler {0} is already linked into a registry")]
    AlreadyLinked(TransferId),

    /// The resource behind the handler does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The underlying stream failed
    #[error("I/O error: {message}")]
    Io {
        /// Kind of the originating `io::Error`
        kind: io::ErrorKind,
        /// Rendered error message
        message: String,
    },

    /// Received data failed post-transfer validation
    #[error("data loss: {0}")]
    DataLoss(String),

    /// The engine gave up on the transfer before it completed
    #[error("transfer aborted")]
    Aborted,
}

impl TransferError {
    /// Create an I/O error with a custom message
    pub fn io(kind: io::ErrorKind, message: impl Into<String>) -> Self {
        Self::Io {
            kind,
            message: message.into(),
        }
    }

    /// Create a data loss error (e.g., checksum mismatch)
    pub fn data_loss(message: impl Into<String>) -> Self {
        Self::DataLoss(message.into())
    }

    /// Machine-readable kind of this error
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unimplemented => ERROR_KIND_UNIMPLEMENTED,
            Self::Unbound(_) => ERROR_KIND_FAILED_PRECONDITION,
            Self::AlreadyExists(_) => ERROR_KIND_ALREADY_EXISTS,
            Self::AlreadyLinked(_) => ERROR_KIND_ALREADY_LINKED,
            Self::NotFound(_) => ERROR_KIND_NOT_FOUND,
            Self::Io { .. } => ERROR_KIND_IO_ERROR,
            Self::DataLoss(_) => ERROR_KIND_DATA_LOSS,
            Self::Aborted => ERROR_KIND_ABORTED,
        }
    }

    /// Whether retrying the same operation on the same handler cannot succeed
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Unimplemented | Self::AlreadyExists(_) | Self::AlreadyLinked(_)
        )
    }
}

impl From<io::Error> for TransferError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            kind => Self::Io {
                kind,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(TransferError::Unimplemented.kind(), "unimplemented");
        assert_eq!(
            TransferError::Unbound(TransferId::new(4)).kind(),
            "failed_precondition"
        );
        assert_eq!(TransferError::data_loss("bad").kind(), "data_loss");
        assert_eq!(TransferError::Aborted.kind(), "aborted");
    }

    #[test]
    fn test_only_capability_errors_are_permanent() {
        assert!(TransferError::Unimplemented.is_permanent());
        assert!(TransferError::AlreadyExists(TransferId::new(1)).is_permanent());
        assert!(!TransferError::NotFound("missing".into()).is_permanent());
        assert!(!TransferError::io(io::ErrorKind::Other, "disk").is_permanent());
        assert!(!TransferError::Aborted.is_permanent());
    }

    #[test]
    fn test_from_io_error() {
        let err: TransferError = io::Error::new(io::ErrorKind::NotFound, "no such file").into();
        assert_eq!(err, TransferError::NotFound("no such file".into()));

        let err: TransferError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(
            err,
            TransferError::io(io::ErrorKind::PermissionDenied, "denied")
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TransferError::AlreadyExists(TransferId::new(9)).to_string(),
            "transfer id 9 is already registered"
        );
        assert_eq!(
            TransferError::Unimplemented.to_string(),
            "transfer direction not supported by this handler"
        );
    }
}
