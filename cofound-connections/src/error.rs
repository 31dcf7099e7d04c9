use serde::Serialize;
use uuid::Uuid;

use cofound_shared::errors::{AppError, ErrorCode};

/// A stored row that does not satisfy the typed record's invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("unknown connection status {0:?}")]
    UnknownStatus(String),

    #[error("connection {0} points at the same profile on both ends")]
    SelfConnection(Uuid),

    #[error("profile {profile_id} has out-of-range age {age}")]
    AgeOutOfRange { profile_id: Uuid, age: i32 },

    #[error("completed profile {0} has no display name")]
    MissingDisplayName(Uuid),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unordered-pair uniqueness rejected the write.
    #[error("a connection already exists for this pair")]
    Duplicate,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid row: {0}")]
    InvalidRow(#[from] RowError),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    StoreUnavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("cannot send a connection request to yourself")]
    InvalidSelfRequest,

    #[error("only the receiver can respond to this request")]
    NotReceiver,

    #[error("only the requester can withdraw this request")]
    NotRequester,

    #[error("profile is not part of this connection")]
    NotParty,

    #[error("a connection already exists between these profiles")]
    DuplicateConnection,

    #[error("connection is no longer pending")]
    NotPending,

    #[error("connection is not active")]
    NotAccepted,

    #[error("connection {0} not found")]
    ConnectionNotFound(Uuid),

    #[error("profile {0} not found")]
    ProfileNotFound(Uuid),

    #[error("no profile for credential {0}")]
    NoProfileForCredential(Uuid),

    #[error("connection store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ConnectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSelfRequest | Self::NotReceiver | Self::NotRequester | Self::NotParty => {
                ErrorKind::Validation
            }
            Self::DuplicateConnection | Self::NotPending | Self::NotAccepted => ErrorKind::Conflict,
            Self::ConnectionNotFound(_) | Self::ProfileNotFound(_) | Self::NoProfileForCredential(_) => {
                ErrorKind::NotFound
            }
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StoreUnavailable
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidSelfRequest => ErrorCode::InvalidSelfRequest,
            Self::NotReceiver => ErrorCode::NotReceiver,
            Self::NotRequester => ErrorCode::NotRequester,
            Self::NotParty => ErrorCode::NotParty,
            Self::DuplicateConnection => ErrorCode::DuplicateConnection,
            Self::NotPending => ErrorCode::NotPending,
            Self::NotAccepted => ErrorCode::NotAccepted,
            Self::ConnectionNotFound(_) => ErrorCode::ConnectionNotFound,
            Self::ProfileNotFound(_) | Self::NoProfileForCredential(_) => ErrorCode::ProfileNotFound,
            Self::StoreUnavailable(_) => ErrorCode::ServiceUnavailable,
        }
    }

    /// Message shown to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidSelfRequest => "You can't connect with yourself",
            Self::NotReceiver => "Only the person you asked can answer this request",
            Self::NotRequester => "Only the person who sent this request can withdraw it",
            Self::NotParty => "You're not part of this connection",
            Self::DuplicateConnection => "You've already connected with this person",
            Self::NotPending => "This request has already been answered",
            Self::NotAccepted => "You're not connected with this person yet",
            Self::ConnectionNotFound(_) => "This connection no longer exists",
            Self::ProfileNotFound(_) => "This profile could not be found",
            Self::NoProfileForCredential(_) => "Finish setting up your profile first",
            Self::StoreUnavailable(_) => "Something went wrong, please try again",
        }
    }
}

impl From<StoreError> for ConnectionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => Self::DuplicateConnection,
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::InvalidRow(row) => Self::StoreUnavailable(row.to_string()),
        }
    }
}

impl From<ConnectionError> for AppError {
    fn from(err: ConnectionError) -> Self {
        if let ConnectionError::StoreUnavailable(reason) = &err {
            tracing::error!(reason = %reason, "connection store unavailable");
        }
        AppError::with_details(
            err.code(),
            err.user_message(),
            serde_json::json!({
                "kind": err.kind(),
                "retryable": err.is_retryable(),
            }),
        )
    }
}
