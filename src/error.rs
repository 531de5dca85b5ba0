use thiserror::Error;

/// Errors that can cross the crate's public boundary.
///
/// Protocol-level anomalies (stale claims, unmatched acks, timer
/// misdeliveries) are not represented here — per the reconciliation rules
/// they are reconciled silently or logged, never surfaced as errors.
#[derive(Error, Debug)]
pub enum SwimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("failed to decode message: {0}")]
    Decode(String),

    #[error("actor mailbox closed: {0}")]
    MailboxClosed(&'static str),

    #[error("request to {0} actor timed out")]
    RequestTimeout(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SwimError>;
