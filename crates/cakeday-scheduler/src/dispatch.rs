use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use cakeday_core::config::LedgerWritePolicy;
use cakeday_content::RenderedBatch;
use cakeday_store::Ledger;

use crate::error::{Result, SchedulerError};
use crate::transport::{Transport, TransportError};
use crate::types::CelebrationBatch;

/// Result of dispatching one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Delivered and committed to the ledger.
    Dispatched { celebrants: usize },
    /// Delivered, ledger write failed, policy chose to report success
    /// anyway (risking a silent miss over a duplicate).
    DispatchedUnlogged { celebrants: usize },
}

/// Sends rendered batches and commits the ledger on success.
///
/// There is no retry loop here: a failed dispatch leaves the ledger
/// untouched, so the next tick re-resolves the same members and retries.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    ledger: Arc<Ledger>,
    ledger_policy: LedgerWritePolicy,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        ledger: Arc<Ledger>,
        ledger_policy: LedgerWritePolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            ledger,
            ledger_policy,
            timeout,
        }
    }

    /// Deliver `rendered` and, on success, record every batch member for
    /// the batch date in one transaction. Commit strictly follows delivery
    /// so a crash in between can only cause a re-send, never a lost
    /// celebration.
    pub async fn dispatch(
        &self,
        batch: &CelebrationBatch,
        rendered: &RenderedBatch,
    ) -> Result<Outcome> {
        let send = tokio::time::timeout(self.timeout, self.transport.send(rendered)).await;
        match send {
            Err(_) => {
                warn!(date = %batch.date, "dispatch timed out, batch will retry next tick");
                return Err(SchedulerError::Delivery(TransportError::Timeout {
                    ms: self.timeout.as_millis() as u64,
                }));
            }
            Ok(Err(e)) => {
                warn!(date = %batch.date, error = %e, "dispatch failed, batch will retry next tick");
                return Err(SchedulerError::Delivery(e));
            }
            Ok(Ok(())) => {}
        }

        let user_ids = batch.user_ids();
        if let Err(e) = self.ledger.commit(batch.date, &user_ids, batch.path) {
            error!(date = %batch.date, error = %e, "ledger commit failed after delivery");
            return match self.ledger_policy {
                LedgerWritePolicy::Resend => Err(SchedulerError::LedgerWrite(e)),
                LedgerWritePolicy::Suppress => Ok(Outcome::DispatchedUnlogged {
                    celebrants: user_ids.len(),
                }),
            };
        }

        info!(
            date = %batch.date,
            celebrants = user_ids.len(),
            path = %batch.path,
            "batch dispatched and committed"
        );
        Ok(Outcome::Dispatched {
            celebrants: user_ids.len(),
        })
    }
}
