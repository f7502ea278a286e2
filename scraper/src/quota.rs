//! Client-side accounting of YouTube Data API quota units.

use crate::error::{Result, ScrapeError};
use tokio::sync::Mutex;

/// Default daily quota granted to a YouTube Data API project.
pub const DEFAULT_DAILY_BUDGET: u64 = 10_000;

/// Cost of a `search.list` call.
pub const SEARCH_COST: u64 = 100;

/// Cost of every other read-only `*.list` call we make.
pub const LIST_COST: u64 = 1;

/// Tracks quota units spent by one API key during one run.
///
/// Calls are charged before they are sent, so a call that would overrun the budget is
/// refused without touching the network.
#[derive(Debug)]
pub struct QuotaTracker {
    budget: u64,
    used: Mutex<u64>,
}

impl QuotaTracker {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            used: Mutex::new(0),
        }
    }

    /// Reserves `units` for an upcoming call.
    pub async fn charge(&self, units: u64, endpoint: &str) -> Result<()> {
        let mut used = self.used.lock().await;
        if *used + units > self.budget {
            tracing::warn!(
                endpoint,
                units,
                used = *used,
                budget = self.budget,
                "refusing call that would exceed the quota budget"
            );
            return Err(ScrapeError::QuotaExceeded(format!(
                "{endpoint} needs {units} units but only {} of {} remain",
                self.budget - *used,
                self.budget
            )));
        }
        *used += units;
        tracing::trace!(endpoint, units, used = *used, "charged quota");
        Ok(())
    }

    /// Units charged so far.
    pub async fn used(&self) -> u64 {
        *self.used.lock().await
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn charges_accumulate() {
        let quota = QuotaTracker::new(150);
        quota.charge(SEARCH_COST, "search.list").await.unwrap();
        quota.charge(LIST_COST, "channels.list").await.unwrap();
        assert_eq!(quota.used().await, 101);
    }

    #[tokio::test]
    async fn over_budget_is_refused_without_charging() {
        let quota = QuotaTracker::new(100);
        quota.charge(LIST_COST, "channels.list").await.unwrap();
        let err = quota.charge(SEARCH_COST, "search.list").await.unwrap_err();
        assert!(matches!(err, ScrapeError::QuotaExceeded(_)));
        assert_eq!(quota.used().await, 1);
        // the exact remainder still fits
        quota.charge(99, "videos.list").await.unwrap();
        assert_eq!(quota.used().await, 100);
    }
}
