//! Per-claim-set sequencing.
//!
//! Runs for different claim sets proceed in parallel; a second run for a
//! claim set that is already being validated waits for the first to finish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one owned guard per claim-set id.
#[derive(Debug, Default)]
pub struct ClaimSetSequencer {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ClaimSetSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other run holds `claim_set_id`, then hold it until the
    /// returned guard is dropped.
    pub async fn acquire(&self, claim_set_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries nobody holds or waits on can go.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks
                .entry(claim_set_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Claim sets currently held or awaited.
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|l| Arc::strong_count(l) > 1)
            .count()
    }
}
