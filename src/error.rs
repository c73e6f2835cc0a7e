//! Typed errors at component boundaries (§7, §9 "Errors as values").
//!
//! Free-form failures that never need to be matched on stay `anyhow::Error`
//! (the teacher's convention throughout `ingestion::*`); anything a caller is
//! required to branch on — the fetcher's two-source failover, the store's
//! conflict handling — gets a `thiserror` enum instead.

use thiserror::Error;

/// §7 error taxonomy for the Listing Fetcher.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("http status {0}")]
    Http(u16),
    #[error("request timed out")]
    Timeout,
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("decode error: {0}")]
    DecodeError(String),
    #[error("missing required field: {0}")]
    ParseMissingField(String),
    #[error("expected sale listing, upstream reports rental")]
    UnexpectedRentalWhenSaleRequested,
    #[error("expected rental listing, upstream reports sale")]
    UnexpectedSaleWhenRentalRequested,
    #[error("{0}")]
    OtherError(String),
}

impl FetchError {
    /// Histogram bucket name used by the Orchestrator (§4.5 step 3b).
    pub fn histogram_kind(&self) -> String {
        match self {
            FetchError::Http(status) => format!("http_{status}"),
            FetchError::Timeout => "timeout".to_string(),
            FetchError::ConnectionError(_) => "connection_error".to_string(),
            FetchError::DecodeError(_) => "other_error".to_string(),
            FetchError::ParseMissingField(_) => "other_error".to_string(),
            FetchError::UnexpectedRentalWhenSaleRequested => "other_error".to_string(),
            FetchError::UnexpectedSaleWhenRentalRequested => "other_error".to_string(),
            FetchError::OtherError(_) => "other_error".to_string(),
        }
    }

    /// §5 retry policy: transient errors are retried, others are not.
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::ConnectionError(_) => true,
            FetchError::Http(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

/// §7 Store error taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violation on {0}")]
    UniqueViolation(String),
    #[error("storage error: {0}")]
    StorageError(#[from] rusqlite::Error),
}

/// §7 "CancelledByOperator" — surfaced once in-flight workers drain.
#[derive(Debug, Error, Clone, Copy)]
#[error("ingestion run cancelled by operator")]
pub struct CancelledByOperator;
