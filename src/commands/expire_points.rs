use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::TransactionKind,
    ports::{
        customer::CustomerPort,
        database::{LedgerStorePort, LedgerWrite, LotWrite, NewTransaction},
    },
};
use chrono::{DateTime, Utc};
use tower::Service;
use uuid::Uuid;

use super::{DomainLogic, Error};

/// Batch expiry sweep, invoked periodically with the current time.
pub struct ExpirePointsRequest {
    pub now: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ExpirePointsResponse {
    /// Number of lots whose remaining points were forfeited.
    pub lots_expired: u32,
    /// Another sweep was already in flight and this invocation did nothing.
    pub skipped: bool,
}

impl<D, C> Service<ExpirePointsRequest> for DomainLogic<D, C>
where
    D: LedgerStorePort + 'static,
    C: CustomerPort + 'static,
{
    type Response = ExpirePointsResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ExpirePointsRequest) -> Self::Future {
        let database = self.database.clone();
        let locks = self.locks.clone();
        let sweep_gate = self.sweep_gate.clone();
        Box::pin(async move {
            // Single-flight: a sweep started while another is running is
            // skipped rather than queued, so one lot set is never expired
            // twice.
            let Ok(_gate) = sweep_gate.try_lock() else {
                tracing::debug!("expiry sweep already in flight, skipping");
                return Ok(ExpirePointsResponse {
                    lots_expired: 0,
                    skipped: true,
                });
            };

            let candidates = database.expirable_lots(req.now).await?;
            let mut customer_ids: Vec<Uuid> =
                candidates.iter().map(|lot| lot.customer_id).collect();
            customer_ids.sort_unstable();
            customer_ids.dedup();

            let mut lots_expired = 0;
            for customer_id in customer_ids {
                let _scope = locks.acquire(customer_id).await;
                // Re-read under the customer lock; a concurrent redemption
                // may have exhausted candidate lots in the meantime.
                let lots = database.active_lots(customer_id).await?;
                for lot in lots.into_iter().filter(|lot| lot.expiry_date < req.now) {
                    let res = database
                        .commit(LedgerWrite {
                            customer_id,
                            lots: vec![LotWrite::Expire { lot_id: lot.lot_id }],
                            transaction: NewTransaction {
                                kind: TransactionKind::Expire,
                                points: -(lot.points_remaining as i32),
                                sale_id: None,
                                baht_amount: None,
                                notes: None,
                            },
                        })
                        .await;
                    match res {
                        Ok(_) => lots_expired += 1,
                        // The lot stays eligible and is retried on the next
                        // scheduled sweep; other lots are unaffected.
                        Err(err) => tracing::warn!(
                            %customer_id,
                            lot_id = %lot.lot_id,
                            error = ?err,
                            "failed to expire lot",
                        ),
                    }
                }
            }
            tracing::debug!(lots_expired, "expiry sweep complete");

            Ok(ExpirePointsResponse {
                lots_expired,
                skipped: false,
            })
        })
    }
}
