use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{self, CustomerLoyaltySummary, TransactionKind},
    ports::{customer::CustomerPort, database::LedgerStorePort},
};
use tower::Service;
use uuid::Uuid;

use super::{DomainLogic, Error};

/// Read-only projection of a customer's loyalty standing.
pub struct GetSummaryRequest {
    pub customer_id: Uuid,
}

impl<D, C> Service<GetSummaryRequest> for DomainLogic<D, C>
where
    D: LedgerStorePort + 'static,
    C: CustomerPort + 'static,
{
    type Response = CustomerLoyaltySummary;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GetSummaryRequest) -> Self::Future {
        let database = self.database.clone();
        let customers = self.customers.clone();
        Box::pin(async move {
            let transactions = database.transactions(req.customer_id, None).await?;
            let lots = database.active_lots(req.customer_id).await?;

            // A customer without any ledger activity only gets an empty
            // summary if the external registry knows them.
            if transactions.is_empty() && lots.is_empty() {
                customers.get_customer(req.customer_id).await?;
            }

            let available_points: u32 = lots.iter().map(|lot| lot.points_remaining).sum();
            let total_points: u32 = transactions
                .iter()
                .filter(|transaction| transaction.kind == TransactionKind::Earn)
                .map(|transaction| transaction.points.max(0) as u32)
                .sum();
            let total_spent: f64 = transactions
                .iter()
                .filter(|transaction| {
                    transaction.kind == TransactionKind::Earn && transaction.sale_id.is_some()
                })
                .filter_map(|transaction| transaction.baht_amount)
                .sum();

            Ok(CustomerLoyaltySummary {
                customer_id: req.customer_id,
                total_points,
                available_points,
                available_baht_value: domain::points_value(available_points),
                total_transactions: transactions.len(),
                total_spent,
            })
        })
    }
}
