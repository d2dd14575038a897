use thiserror::Error;

/// Errors that can fail a scheduling pass or a batch.
///
/// Generation errors never appear here — the content pipeline recovers them
/// internally with template fallback.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Reading records or the ledger failed.
    #[error("Store error: {0}")]
    Store(#[from] cakeday_store::StoreError),

    /// The transport refused or failed the delivery. The batch is retried
    /// implicitly on the next tick.
    #[error("Delivery failed: {0}")]
    Delivery(#[from] crate::transport::TransportError),

    /// Delivery succeeded but the ledger commit did not. Depending on
    /// policy this is surfaced (resend) or swallowed (suppress).
    #[error("Ledger write failed after delivery: {0}")]
    LedgerWrite(cakeday_store::StoreError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
