use crate::{
    domain::{LedgerTransaction, PointLot},
    ports::database::{Error, LedgerStorePort, LedgerWrite, LotWrite},
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// In-process ledger store.
///
/// A commit is validated and applied against a scratch copy of the lot table
/// and only swapped in on success, so a failed write leaves no trace and
/// readers never see a lot decrement without its transaction.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    lots: Vec<PointLot>,
    /// Append-only; insertion order is chronological order.
    transactions: Vec<LedgerTransaction>,
}

#[async_trait::async_trait]
impl LedgerStorePort for MemoryLedgerStore {
    async fn active_lots(&self, customer_id: Uuid) -> Result<Vec<PointLot>, Error> {
        let inner = self.inner.lock()?;
        let mut lots: Vec<_> = inner
            .lots
            .iter()
            .filter(|lot| {
                lot.customer_id == customer_id && !lot.is_expired && lot.points_remaining > 0
            })
            .cloned()
            .collect();
        lots.sort_by_key(|lot| (lot.expiry_date, lot.earned_date, lot.lot_id));

        Ok(lots)
    }

    async fn transactions(
        &self,
        customer_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<LedgerTransaction>, Error> {
        let inner = self.inner.lock()?;
        let mut transactions: Vec<_> = inner
            .transactions
            .iter()
            .rev()
            .filter(|transaction| transaction.customer_id == customer_id)
            .cloned()
            .collect();
        if let Some(limit) = limit {
            transactions.truncate(limit);
        }

        Ok(transactions)
    }

    async fn expirable_lots(&self, now: DateTime<Utc>) -> Result<Vec<PointLot>, Error> {
        let inner = self.inner.lock()?;
        let lots = inner
            .lots
            .iter()
            .filter(|lot| lot.expiry_date < now && !lot.is_expired && lot.points_remaining > 0)
            .cloned()
            .collect();

        Ok(lots)
    }

    async fn commit(&self, write: LedgerWrite) -> Result<LedgerTransaction, Error> {
        let mut inner = self.inner.lock()?;

        // Apply every lot write to a scratch copy first; any failure returns
        // before the shared state is touched.
        let mut lots = inner.lots.clone();
        for lot_write in &write.lots {
            match lot_write {
                LotWrite::Insert(new_lot) => {
                    lots.push(PointLot {
                        lot_id: Uuid::new_v4(),
                        customer_id: write.customer_id,
                        points_original: new_lot.points,
                        points_remaining: new_lot.points,
                        earned_date: new_lot.earned_date,
                        expiry_date: new_lot.expiry_date,
                        is_expired: false,
                    });
                }
                LotWrite::Draw { lot_id, points } => {
                    let lot = find_lot(&mut lots, write.customer_id, *lot_id)?;
                    if lot.is_expired {
                        return Err(Error::LotExpired(*lot_id));
                    }
                    if *points > lot.points_remaining {
                        return Err(Error::LotOverdrawn {
                            lot_id: *lot_id,
                            points_remaining: lot.points_remaining,
                            points: *points,
                        });
                    }
                    lot.points_remaining -= points;
                }
                LotWrite::Expire { lot_id } => {
                    let lot = find_lot(&mut lots, write.customer_id, *lot_id)?;
                    if lot.is_expired {
                        return Err(Error::LotExpired(*lot_id));
                    }
                    lot.points_remaining = 0;
                    lot.is_expired = true;
                }
            }
        }

        let transaction = LedgerTransaction {
            transaction_id: Uuid::new_v4(),
            customer_id: write.customer_id,
            kind: write.transaction.kind,
            points: write.transaction.points,
            sale_id: write.transaction.sale_id,
            baht_amount: write.transaction.baht_amount,
            notes: write.transaction.notes,
            created_at: Utc::now(),
        };

        inner.lots = lots;
        inner.transactions.push(transaction.clone());

        Ok(transaction)
    }
}

fn find_lot(lots: &mut [PointLot], customer_id: Uuid, lot_id: Uuid) -> Result<&mut PointLot, Error> {
    lots.iter_mut()
        .find(|lot| lot.lot_id == lot_id && lot.customer_id == customer_id)
        .ok_or(Error::LotNotFound(lot_id))
}

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

/// We need to create a custom `From` implementation here for an error that's specific to this
/// adapter.
impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}
