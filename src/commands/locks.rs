use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-customer mutual exclusion for ledger mutations.
///
/// Every read-modify-write of a customer's lots (accrual, redemption, the
/// per-customer slice of an expiry sweep) runs under this lock, so two
/// concurrent redemptions cannot both read the same balance snapshot and
/// over-draw it. Customers lock independently of each other.
#[derive(Debug, Default)]
pub struct CustomerLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl CustomerLocks {
    /// Waits for and returns the exclusive scope for one customer. The scope
    /// is held until the returned guard is dropped.
    pub async fn acquire(&self, customer_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .await
            .entry(customer_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        lock.lock_owned().await
    }
}
