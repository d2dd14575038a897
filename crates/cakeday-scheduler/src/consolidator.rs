use chrono::NaiveDate;
use tracing::debug;

use cakeday_store::Ledger;

use crate::error::Result;

/// Subtract already-announced members from a due-set.
///
/// Returns `Ok(None)` when nobody is left — the common case on most ticks,
/// and the point where a pass stops before any generation or transport
/// call. Otherwise the surviving users come back in ascending id order, one
/// consolidated batch per date.
///
/// This function never writes the ledger: announcement is committed only
/// after the transport confirms delivery (see [`crate::dispatch`]), and
/// pass serialization in the engine keeps two ticks from building the same
/// batch concurrently.
pub fn consolidate(
    due: &[String],
    ledger: &Ledger,
    date: NaiveDate,
) -> Result<Option<Vec<String>>> {
    if due.is_empty() {
        return Ok(None);
    }

    // announced_on returns ascending order, so binary_search applies.
    let announced = ledger.announced_on(date)?;
    let mut remaining = due.to_vec();
    remaining.sort();
    remaining.dedup();
    remaining.retain(|u| announced.binary_search(u).is_err());

    if remaining.is_empty() {
        debug!(date = %date, "all due members already announced");
        return Ok(None);
    }
    Ok(Some(remaining))
}
