use chrono::NaiveDate;

use cakeday_content::CelebrantProfile;
use cakeday_store::DetectionPath;

/// One batch of same-date celebrants, built per tick and discarded after
/// dispatch. Celebrants are ordered by ascending user id so the same inputs
/// always produce the same batch.
#[derive(Debug, Clone)]
pub struct CelebrationBatch {
    /// The calendar date being celebrated (the celebrant's local date for
    /// the hourly path, the server date for daily/recovery).
    pub date: NaiveDate,
    pub celebrants: Vec<CelebrantProfile>,
    /// Which tick driver built this batch. Ledger metadata only.
    pub path: DetectionPath,
}

impl CelebrationBatch {
    pub fn user_ids(&self) -> Vec<String> {
        self.celebrants.iter().map(|c| c.user_id.clone()).collect()
    }
}
