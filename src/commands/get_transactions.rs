use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::LedgerTransaction,
    ports::{customer::CustomerPort, database::LedgerStorePort},
};
use tower::Service;
use uuid::Uuid;

use super::{DomainLogic, Error};

/// Maximum number of ledger entries returned when the caller does not ask
/// for a specific limit.
pub const DEFAULT_TRANSACTION_LIMIT: usize = 100;

/// Ledger history for a customer, most recent first.
pub struct GetTransactionsRequest {
    pub customer_id: Uuid,
    pub limit: Option<usize>,
}

impl<D, C> Service<GetTransactionsRequest> for DomainLogic<D, C>
where
    D: LedgerStorePort + 'static,
    C: CustomerPort + 'static,
{
    type Response = Vec<LedgerTransaction>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GetTransactionsRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let limit = req.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT);
            let transactions = database.transactions(req.customer_id, Some(limit)).await?;

            Ok(transactions)
        })
    }
}
