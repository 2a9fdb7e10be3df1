//! Error type shared by every piece of the observation module.

#[derive(Debug, thiserror::Error)]
pub enum ObservationError {
    #[error("signal fetch failed: {0}")]
    FetchFailed(String),
    #[error("store error: {0}")]
    StoreError(String),
    #[error("workflow lease error: {0}")]
    LeaseError(String),
}
