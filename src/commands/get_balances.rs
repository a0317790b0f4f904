use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{self, PointLot},
    ports::{customer::CustomerPort, database::LedgerStorePort},
};
use tower::Service;
use uuid::Uuid;

use super::{DomainLogic, Error};

/// Active point lots for a customer, ordered by ascending expiry date.
pub struct GetBalancesRequest {
    pub customer_id: Uuid,
}

impl<D, C> Service<GetBalancesRequest> for DomainLogic<D, C>
where
    D: LedgerStorePort + 'static,
    C: CustomerPort + 'static,
{
    type Response = Vec<PointLot>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GetBalancesRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move { Ok(database.active_lots(req.customer_id).await?) })
    }
}

/// Redeemable balance for a customer, as points and their baht value.
pub struct GetAvailablePointsRequest {
    pub customer_id: Uuid,
}

#[derive(Debug, PartialEq)]
pub struct AvailablePoints {
    pub points: u32,
    pub baht_value: f64,
}

impl<D, C> Service<GetAvailablePointsRequest> for DomainLogic<D, C>
where
    D: LedgerStorePort + 'static,
    C: CustomerPort + 'static,
{
    type Response = AvailablePoints;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GetAvailablePointsRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let lots = database.active_lots(req.customer_id).await?;
            let points: u32 = lots.iter().map(|lot| lot.points_remaining).sum();

            Ok(AvailablePoints {
                points,
                baht_value: domain::points_value(points),
            })
        })
    }
}
