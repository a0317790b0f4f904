use std::sync::Arc;

use crate::ports::{customer::CustomerPort, database::LedgerStorePort};

pub mod earn_points;
pub mod expire_points;
pub mod get_balances;
pub mod get_summary;
pub mod get_transactions;
pub mod locks;
pub mod redeem_points;

/// Shared state behind every ledger operation.
///
/// Holds the persistence and customer-registry ports plus the in-process
/// concurrency guards: one lock per customer for ledger mutations and a
/// single-flight gate for the expiry sweep.
pub struct DomainLogic<D, C> {
    database: Arc<D>,
    customers: Arc<C>,
    locks: Arc<locks::CustomerLocks>,
    sweep_gate: Arc<tokio::sync::Mutex<()>>,
}

impl<D, C> DomainLogic<D, C>
where
    D: LedgerStorePort,
    C: CustomerPort,
{
    pub fn new(database: D, customers: C) -> Self {
        Self {
            database: Arc::new(database),
            customers: Arc::new(customers),
            locks: Arc::new(locks::CustomerLocks::default()),
            sweep_gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

impl<D, C> Clone for DomainLogic<D, C> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            customers: self.customers.clone(),
            locks: self.locks.clone(),
            sweep_gate: self.sweep_gate.clone(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("ledger store port error: {0:?}")]
    Database(#[from] crate::ports::database::Error),
    #[error("customer port error: {0:?}")]
    Customer(#[from] crate::ports::customer::Error),

    /// Negative or zero monetary or point input
    #[error(transparent)]
    InvalidAmount(#[from] crate::domain::InvalidAmount),

    /// Requested redemption amount does not match the value of the points
    /// under the fixed 10-points-per-baht rate.
    #[error("{points} point(s) are worth {expected_baht:.2} baht, requested {requested_baht:.2}")]
    ConversionMismatch {
        points: u32,
        expected_baht: f64,
        requested_baht: f64,
    },

    /// Requested redemption exceeds the customer's available balance.
    #[error("insufficient points: requested {requested}, available {available}")]
    InsufficientPoints { requested: u32, available: u32 },
}
