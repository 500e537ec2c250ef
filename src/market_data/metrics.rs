use crate::domain::AssetMetrics;
use rust_decimal::prelude::*;

const DECIMAL_PLACES: u32 = 8;

fn change_percent(previous: Decimal, latest: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    latest
        .checked_sub(previous)?
        .checked_div(previous)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

fn average(closes: &[Decimal]) -> Option<Decimal> {
    let sum = closes
        .iter()
        .try_fold(Decimal::ZERO, |acc, close| acc.checked_add(*close))?;
    sum.checked_div(Decimal::from(closes.len()))
}

/// Turns a window of daily closes (oldest first) into the tracked metrics.
///
/// Needs at least two closes: the last one is the latest price, the one before
/// it anchors the 24h change, and the whole window feeds the average. Returns
/// `None` when the series is too short or the arithmetic overflows.
pub fn compute_metrics(closes: &[Decimal]) -> Option<AssetMetrics> {
    let (latest, rest) = closes.split_last()?;
    let previous = rest.last()?;
    let change = change_percent(*previous, *latest)?;
    Some(AssetMetrics {
        latest_price: latest.round_dp(DECIMAL_PLACES),
        change_percent_24h: change.round_dp(DECIMAL_PLACES),
        average_price_7d: average(closes)?.round_dp(DECIMAL_PLACES),
    })
}

/// Drops the gaps providers leave for halted sessions and converts the rest.
pub fn closes_from_f64(raw: &[Option<f64>]) -> Vec<Decimal> {
    raw.iter()
        .flatten()
        .filter_map(|close| Decimal::from_f64(*close))
        .collect()
}
