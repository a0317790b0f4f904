use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{self, LedgerTransaction, TransactionKind},
    ports::{
        customer::CustomerPort,
        database::{LedgerStorePort, LedgerWrite, LotWrite, NewLot, NewTransaction},
    },
};
use chrono::Utc;
use tower::Service;
use uuid::Uuid;

use super::{DomainLogic, Error};

/// Accrual of points from a finalized sale
///
/// The Sales subsystem supplies the customer, the sale, and the paid amount
/// the moment a sale completes.
pub struct EarnPointsRequest {
    pub customer_id: Uuid,
    pub sale_id: Uuid,
    pub baht_amount: f64,
}

#[derive(Debug, PartialEq)]
pub struct EarnPointsResponse {
    pub customer_id: Uuid,
    pub points_earned: u32,
    /// The committed earn transaction; `None` when the sale was too small to
    /// earn a point and nothing was written.
    pub transaction: Option<LedgerTransaction>,
}

impl<D, C> Service<EarnPointsRequest> for DomainLogic<D, C>
where
    D: LedgerStorePort + 'static,
    C: CustomerPort + 'static,
{
    type Response = EarnPointsResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: EarnPointsRequest) -> Self::Future {
        let database = self.database.clone();
        let locks = self.locks.clone();
        Box::pin(async move {
            let points = domain::points_earned(req.baht_amount)?;
            if points == 0 {
                return Ok(EarnPointsResponse {
                    customer_id: req.customer_id,
                    points_earned: 0,
                    transaction: None,
                });
            }

            let _scope = locks.acquire(req.customer_id).await;
            let earned_date = Utc::now();
            let transaction = database
                .commit(LedgerWrite {
                    customer_id: req.customer_id,
                    lots: vec![LotWrite::Insert(NewLot {
                        points,
                        earned_date,
                        expiry_date: earned_date + domain::expiry_window(),
                    })],
                    transaction: NewTransaction {
                        kind: TransactionKind::Earn,
                        points: points as i32,
                        sale_id: Some(req.sale_id),
                        baht_amount: Some(req.baht_amount),
                        notes: None,
                    },
                })
                .await?;
            tracing::debug!(customer_id = %req.customer_id, points, "earned loyalty points");

            Ok(EarnPointsResponse {
                customer_id: req.customer_id,
                points_earned: points,
                transaction: Some(transaction),
            })
        })
    }
}
