use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Baht spent per loyalty point earned (accrual rate).
pub const BAHT_PER_POINT: f64 = 100.0;

/// Baht value of a single loyalty point when redeemed (10 points = 1 baht).
pub const BAHT_VALUE_PER_POINT: f64 = 0.1;

/// Absolute tolerance when comparing a requested redemption amount against
/// the value of the redeemed points, absorbing floating-point rounding.
pub const REDEMPTION_VALUE_TOLERANCE: f64 = 0.01;

/// Days before a lot of earned points expires.
pub const EXPIRY_WINDOW_DAYS: i64 = 180;

/// Duration between a lot being earned and it expiring.
pub fn expiry_window() -> Duration {
    Duration::days(EXPIRY_WINDOW_DAYS)
}

/// A negative or zero monetary or point input where a positive one is required.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("invalid amount: {amount}")]
pub struct InvalidAmount {
    pub amount: f64,
}

/// Points earned for a sale amount, 1 point per full 100 baht.
///
/// Fractions of the accrual unit are discarded, so a 99-baht sale earns
/// nothing. Negative amounts are rejected.
pub fn points_earned(baht_amount: f64) -> Result<u32, InvalidAmount> {
    if baht_amount < 0.0 {
        return Err(InvalidAmount {
            amount: baht_amount,
        });
    }

    Ok((baht_amount / BAHT_PER_POINT) as u32)
}

/// Baht value of a number of points under the fixed redemption rate.
pub fn points_value(points: u32) -> f64 {
    points as f64 * BAHT_VALUE_PER_POINT
}

/// Whether a requested baht amount matches the value of the points being
/// redeemed, within [`REDEMPTION_VALUE_TOLERANCE`].
pub fn redemption_value_matches(points: u32, baht_amount: f64) -> bool {
    (baht_amount - points_value(points)).abs() <= REDEMPTION_VALUE_TOLERANCE
}

/// One earning event's worth of points, sharing a single expiry date.
///
/// A lot is born active, is drawn down by redemptions, and terminates either
/// exhausted (`points_remaining == 0` through redemption) or expired
/// (`is_expired == true`, remaining points forfeited). Both states are
/// terminal; lots are never deleted.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLot {
    pub lot_id: Uuid,
    pub customer_id: Uuid,
    /// Points earned when the lot was created.
    pub points_original: u32,
    /// Points still available for redemption. Never exceeds
    /// `points_original`; permanently zero once the lot is expired.
    pub points_remaining: u32,
    pub earned_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub is_expired: bool,
}

/// Kind of ledger transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionKind {
    Earn,
    Redeem,
    Expire,
}

/// One immutable entry in the append-only loyalty ledger.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerTransaction {
    pub transaction_id: Uuid,
    pub customer_id: Uuid,
    pub kind: TransactionKind,
    /// Signed point delta: positive for earn, negative for redeem and expire.
    pub points: i32,
    /// Sale that triggered the transaction, if any.
    pub sale_id: Option<Uuid>,
    /// Monetary amount associated with the transaction: the sale total for an
    /// earn, the discount value for a redemption.
    pub baht_amount: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read-only projection of a customer's loyalty standing.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomerLoyaltySummary {
    pub customer_id: Uuid,
    /// Lifetime earned points, ignoring later redemptions and expiries.
    pub total_points: u32,
    /// Points currently available for redemption.
    pub available_points: u32,
    pub available_baht_value: f64,
    pub total_transactions: usize,
    /// Lifetime purchase total: baht amounts of earn transactions that
    /// reference a sale.
    pub total_spent: f64,
}
