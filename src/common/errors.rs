use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while decoding bus events and applying them to
/// Sequencescape.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The payload is missing required fields or is not valid JSON. The
    /// message can never succeed, so it is acknowledged and dropped.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// No decoder is registered for the top-level model name.
    #[error("no decoder registered for model '{0}'")]
    UnsupportedModel(String),

    /// The referenced plate has no UUID mapping yet. The plate message
    /// has not arrived, so the triggering message is requeued.
    #[error("plate {0} not found in Sequencescape")]
    PlateNotFound(Uuid),

    /// A store write failed; the surrounding transaction rolled back.
    #[error("transaction failed: {0}")]
    TransactionFailure(#[from] DbErr),
}

impl SyncError {
    /// Recoverable errors go back to the broker for redelivery;
    /// everything else is acknowledged and dropped.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PlateNotFound(_) | Self::TransactionFailure(_)
        )
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
