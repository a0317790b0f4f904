use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{self, InvalidAmount, LedgerTransaction, PointLot, TransactionKind},
    ports::{
        customer::CustomerPort,
        database::{LedgerStorePort, LedgerWrite, LotWrite, NewTransaction},
    },
};
use tower::Service;
use uuid::Uuid;

use super::{DomainLogic, Error};

/// Redemption of points for a monetary discount.
pub struct RedeemPointsRequest {
    pub customer_id: Uuid,
    pub points_to_redeem: u32,
    /// Discount value the caller expects; must match the points under the
    /// fixed 10-points-per-baht rate.
    pub baht_amount: f64,
    pub sale_id: Option<Uuid>,
}

#[derive(Debug, PartialEq)]
pub struct RedeemPointsResponse {
    pub transaction: LedgerTransaction,
    pub points_redeemed: u32,
    pub baht_value: f64,
}

impl<D, C> Service<RedeemPointsRequest> for DomainLogic<D, C>
where
    D: LedgerStorePort + 'static,
    C: CustomerPort + 'static,
{
    type Response = RedeemPointsResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: RedeemPointsRequest) -> Self::Future {
        let database = self.database.clone();
        let locks = self.locks.clone();
        Box::pin(async move {
            // Input validation happens before any store access
            if req.points_to_redeem == 0 {
                return Err(InvalidAmount { amount: 0.0 }.into());
            }
            if req.baht_amount <= 0.0 {
                return Err(InvalidAmount {
                    amount: req.baht_amount,
                }
                .into());
            }
            if !domain::redemption_value_matches(req.points_to_redeem, req.baht_amount) {
                return Err(Error::ConversionMismatch {
                    points: req.points_to_redeem,
                    expected_baht: domain::points_value(req.points_to_redeem),
                    requested_baht: req.baht_amount,
                });
            }

            // The balance read and the lot decrements must not interleave
            // with another mutation for this customer.
            let _scope = locks.acquire(req.customer_id).await;
            let lots = database.active_lots(req.customer_id).await?;
            let available: u32 = lots.iter().map(|lot| lot.points_remaining).sum();
            if available < req.points_to_redeem {
                return Err(Error::InsufficientPoints {
                    requested: req.points_to_redeem,
                    available,
                });
            }

            let transaction = database
                .commit(LedgerWrite {
                    customer_id: req.customer_id,
                    lots: plan_draws(&lots, req.points_to_redeem),
                    transaction: NewTransaction {
                        kind: TransactionKind::Redeem,
                        points: -(req.points_to_redeem as i32),
                        sale_id: req.sale_id,
                        baht_amount: Some(req.baht_amount),
                        notes: None,
                    },
                })
                .await?;
            tracing::debug!(
                customer_id = %req.customer_id,
                points = req.points_to_redeem,
                "redeemed loyalty points",
            );

            Ok(RedeemPointsResponse {
                transaction,
                points_redeemed: req.points_to_redeem,
                baht_value: req.baht_amount,
            })
        })
    }
}

/// Plans FIFO consumption: lots arrive ordered by ascending expiry and each
/// one is drawn down to at most its remaining balance until the requested
/// points are covered.
fn plan_draws(lots: &[PointLot], mut points: u32) -> Vec<LotWrite> {
    let mut draws = Vec::new();
    for lot in lots {
        if points == 0 {
            break;
        }
        let draw = lot.points_remaining.min(points);
        draws.push(LotWrite::Draw {
            lot_id: lot.lot_id,
            points: draw,
        });
        points -= draw;
    }

    draws
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::database::memory::MemoryLedgerStore,
        ports::customer::MockCustomerPort,
        ports::database::NewLot,
    };
    use chrono::{DateTime, Duration, Utc};
    use rstest::*;
    use speculoos::prelude::*;
    use tower::BoxError;

    async fn seed_lot(
        database: &MemoryLedgerStore,
        customer_id: Uuid,
        points: u32,
        expiry_date: DateTime<Utc>,
    ) {
        database
            .commit(LedgerWrite {
                customer_id,
                lots: vec![LotWrite::Insert(NewLot {
                    points,
                    earned_date: Utc::now(),
                    expiry_date,
                })],
                transaction: NewTransaction {
                    kind: TransactionKind::Earn,
                    points: points as i32,
                    sale_id: Some(Uuid::new_v4()),
                    baht_amount: Some(points as f64 * domain::BAHT_PER_POINT),
                    notes: None,
                },
            })
            .await
            .unwrap();
    }

    async fn assert_conserved(database: &MemoryLedgerStore, customer_id: Uuid) {
        let remaining: i32 = database
            .active_lots(customer_id)
            .await
            .unwrap()
            .iter()
            .map(|lot| lot.points_remaining as i32)
            .sum();
        let ledger_total: i32 = database
            .transactions(customer_id, None)
            .await
            .unwrap()
            .iter()
            .map(|transaction| transaction.points)
            .sum();
        assert_that!(remaining).is_equal_to(ledger_total);
    }

    #[fixture]
    fn customer_id() -> Uuid {
        Uuid::new_v4()
    }

    #[rstest]
    #[tokio::test]
    async fn test_fifo_consumes_earliest_expiry_first(customer_id: Uuid) -> Result<(), BoxError> {
        // GIVEN two 5-point lots, the second one expiring later
        let database = MemoryLedgerStore::default();
        let now = Utc::now();
        seed_lot(&database, customer_id, 5, now + Duration::days(30)).await;
        seed_lot(&database, customer_id, 5, now + Duration::days(90)).await;
        let mut domain = DomainLogic::new(database.clone(), MockCustomerPort::new());

        // WHEN redeeming 7 points
        let res = domain
            .call(RedeemPointsRequest {
                customer_id,
                points_to_redeem: 7,
                baht_amount: 0.7,
                sale_id: None,
            })
            .await;

        // THEN the earliest-expiring lot is exhausted and the later one keeps 3
        assert_that!(res)
            .is_ok()
            .matches(|res| res.transaction.points == -7 && res.points_redeemed == 7);
        let lots = database.active_lots(customer_id).await?;
        assert_that!(lots).has_length(1);
        assert_that!(lots[0].points_remaining).is_equal_to(3);
        assert_that!(lots[0].expiry_date - now).is_equal_to(Duration::days(90));
        assert_conserved(&database, customer_id).await;

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_redeem_exact_balance(customer_id: Uuid) -> Result<(), BoxError> {
        // GIVEN 10 available points
        let database = MemoryLedgerStore::default();
        seed_lot(&database, customer_id, 10, Utc::now() + Duration::days(30)).await;
        let mut domain = DomainLogic::new(database.clone(), MockCustomerPort::new());

        // WHEN redeeming exactly 10 points
        let res = domain
            .call(RedeemPointsRequest {
                customer_id,
                points_to_redeem: 10,
                baht_amount: 1.0,
                sale_id: Some(Uuid::new_v4()),
            })
            .await;

        // THEN the balance drops to zero
        assert_that!(res).is_ok();
        assert_that!(database.active_lots(customer_id).await?).is_empty();
        assert_conserved(&database, customer_id).await;

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_insufficient_points_changes_nothing(customer_id: Uuid) -> Result<(), BoxError> {
        // GIVEN 10 available points
        let database = MemoryLedgerStore::default();
        seed_lot(&database, customer_id, 10, Utc::now() + Duration::days(30)).await;
        let mut domain = DomainLogic::new(database.clone(), MockCustomerPort::new());
        let before_lots = database.active_lots(customer_id).await?;
        let before_transactions = database.transactions(customer_id, None).await?;

        // WHEN redeeming one point more than available
        let res = domain
            .call(RedeemPointsRequest {
                customer_id,
                points_to_redeem: 11,
                baht_amount: 1.1,
                sale_id: None,
            })
            .await;

        // THEN the request fails and no lot or transaction state changed
        assert_that!(res).is_err().matches(|err| {
            matches!(
                err,
                Error::InsufficientPoints {
                    requested: 11,
                    available: 10
                }
            )
        });
        assert_that!(database.active_lots(customer_id).await?).is_equal_to(before_lots);
        assert_that!(database.transactions(customer_id, None).await?)
            .is_equal_to(before_transactions);

        Ok(())
    }

    #[rstest]
    #[case(10, 1.0, true)]
    #[case(10, 2.0, false)]
    #[tokio::test]
    async fn test_conversion_rate_is_enforced(
        customer_id: Uuid,
        #[case] points_to_redeem: u32,
        #[case] baht_amount: f64,
        #[case] accepted: bool,
    ) {
        let database = MemoryLedgerStore::default();
        seed_lot(&database, customer_id, 20, Utc::now() + Duration::days(30)).await;
        let mut domain = DomainLogic::new(database, MockCustomerPort::new());

        let res = domain
            .call(RedeemPointsRequest {
                customer_id,
                points_to_redeem,
                baht_amount,
                sale_id: None,
            })
            .await;

        if accepted {
            assert_that!(res).is_ok();
        } else {
            assert_that!(res)
                .is_err()
                .matches(|err| matches!(err, Error::ConversionMismatch { .. }));
        }
    }

    #[rstest]
    #[case(0, 1.0)]
    #[case(10, 0.0)]
    #[case(10, -1.0)]
    #[tokio::test]
    async fn test_non_positive_inputs_are_rejected(
        customer_id: Uuid,
        #[case] points_to_redeem: u32,
        #[case] baht_amount: f64,
    ) {
        let database = MemoryLedgerStore::default();
        let mut domain = DomainLogic::new(database, MockCustomerPort::new());

        let res = domain
            .call(RedeemPointsRequest {
                customer_id,
                points_to_redeem,
                baht_amount,
                sale_id: None,
            })
            .await;

        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::InvalidAmount(_)));
    }
}
