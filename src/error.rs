// Pipeline error kinds. Record-level errors stay inside the transformer; system-level
// errors are returned as data unless every selected system failed.

use std::fmt;
use std::time::Duration;

/// Failure of one sub-fetch against the record API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication rejected (status {0})")]
    Auth(u16),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("task failed: {0}")]
    Task(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

/// One system's task failed; siblings are unaffected.
#[derive(Debug, Clone, thiserror::Error)]
#[error("system {system_id}: {source}")]
pub struct SystemFetchError {
    pub system_id: String,
    #[source]
    pub source: SourceError,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("all {} selected systems failed: {}", .errors.len(), ErrorList(.errors))]
    AllSystemsFailed { errors: Vec<SystemFetchError> },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalyticsError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// One raw record could not be turned into a point.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecordDecodeError {
    #[error("record {id}: bad timestamp {value:?}")]
    Timestamp { id: String, value: String },
    #[error("record {id}: bad payload: {reason}")]
    Payload { id: String, reason: String },
}

struct ErrorList<'a>(&'a [SystemFetchError]);

impl fmt::Display for ErrorList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}
