use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{LedgerTransaction, PointLot, TransactionKind};

/// Durable storage for point lots and ledger transactions.
///
/// This is the only seam to persistence. Reads are snapshot-consistent and
/// [`LedgerStorePort::commit`] applies a whole [`LedgerWrite`] atomically, so
/// callers never observe a lot decrement without its ledger transaction.
#[mockall::automock]
#[async_trait::async_trait]
pub trait LedgerStorePort {
    /// Lots that can still be redeemed against for this customer: not
    /// expired, points remaining, ordered by ascending expiry date (FIFO
    /// consumption order).
    async fn active_lots(&self, customer_id: Uuid) -> Result<Vec<PointLot>, Error>;

    /// Ledger transactions for this customer, most recent first. `limit`
    /// truncates the result; `None` returns the full history.
    async fn transactions(
        &self,
        customer_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<LedgerTransaction>, Error>;

    /// Lots across all customers that are past their expiry date as of `now`
    /// but have not been swept yet.
    async fn expirable_lots(&self, now: DateTime<Utc>) -> Result<Vec<PointLot>, Error>;

    /// Atomically applies the lot writes and appends the transaction, all or
    /// nothing. Returns the transaction as stored.
    async fn commit(&self, write: LedgerWrite) -> Result<LedgerTransaction, Error>;
}

/// One atomic unit of ledger mutation: a set of lot writes plus exactly one
/// appended transaction.
#[derive(Clone, Debug)]
pub struct LedgerWrite {
    pub customer_id: Uuid,
    pub lots: Vec<LotWrite>,
    pub transaction: NewTransaction,
}

/// A single lot mutation within a [`LedgerWrite`].
#[derive(Clone, Debug)]
pub enum LotWrite {
    /// Create a fresh lot with `points` original and remaining.
    Insert(NewLot),
    /// Subtract `points` from the lot's remaining balance.
    Draw { lot_id: Uuid, points: u32 },
    /// Zero the lot's remaining balance and mark it expired.
    Expire { lot_id: Uuid },
}

/// A lot to be created, before the store assigns its id.
#[derive(Clone, Debug)]
pub struct NewLot {
    pub points: u32,
    pub earned_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

/// A transaction to be appended, before the store assigns id and timestamp.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub points: i32,
    pub sale_id: Option<Uuid>,
    pub baht_amount: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A lot write referenced a lot id the store does not know for this
    /// customer.
    #[error("lot {0} does not exist")]
    LotNotFound(Uuid),

    /// Trying to draw more points from a lot than it has remaining
    ///
    /// Committing this would take the lot's balance negative, which is not
    /// supported.
    #[error("lot {lot_id} has {points_remaining} point(s) remaining, tried to draw {points}")]
    LotOverdrawn {
        lot_id: Uuid,
        points_remaining: u32,
        points: u32,
    },

    /// Trying to draw from or re-expire a lot already in a terminal expired
    /// state.
    #[error("lot {0} is already expired")]
    LotExpired(Uuid),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not
    /// part of the domain model, such as connectivity, configuration, or
    /// permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
