use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate portfolio statistics for one user.
///
/// All monetary fields are derived at query time; nothing here is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioStats {
    /// Market value of all current holdings at refreshed prices.
    pub total_value: Decimal,
    /// Unrealized gain/loss of all holdings versus their cost basis.
    pub total_gain_loss: Decimal,
    /// Sum of all BUY transaction amounts, ever (not reduced by sells).
    pub total_invested: Decimal,
    pub holdings_count: usize,
    /// Unrealized gain/loss as a percentage of total invested capital.
    /// Zero when nothing was ever invested. A coarse approximation, not a
    /// time-weighted return.
    pub annual_return_pct: Decimal,
}
