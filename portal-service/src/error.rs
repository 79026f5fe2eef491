use crate::store::StoreError;

/// Failure of a single portal operation.
///
/// Input errors are raised before any backend call. Backend errors carry
/// the backend's message unchanged and are never retried.
#[derive(thiserror::Error, Debug)]
pub enum PortalError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("meter {0} not found")]
    MeterNotFound(i64),
    #[error("reading {0} not found")]
    ReadingNotFound(i64),
    #[error("no readings available for meter {0}")]
    NoReadings(i64),
    #[error("request superseded by a newer one")]
    Superseded,
    #[error("backend error: {0}")]
    Backend(#[from] StoreError),
}

impl PortalError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        metrics::counter!("portal_input_rejected_total").increment(1);
        Self::InvalidInput(msg.into())
    }
}
