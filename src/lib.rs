//! Loyalty-points ledger for a retail point-of-sale backend.
//!
//! Points are earned from completed sales as expiring *lots*, redeemed
//! oldest-expiry-first, and swept by a periodic expiry job. Every mutation
//! appends an immutable ledger transaction, so the lot table and the
//! transaction log are two views of the same conserved quantity.

pub mod adapters;
pub mod commands;
pub mod domain;
pub mod ports;
