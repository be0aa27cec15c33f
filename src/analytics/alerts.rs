//! Heuristic spending alerts. These are informational only and never fail.

use super::DailySpending;
use crate::model::{saturating_sum, Amount};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of trailing days compared against the whole range.
const TRAILING_DAYS: usize = 7;

/// The trailing mean must exceed the overall mean by this factor (1.5).
const OVERSPENDING_FACTOR: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Overspending needs more than this many receipts before it is worth flagging.
const OVERSPENDING_MIN_COUNT: usize = 7;

const MILESTONE_AMOUNT: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);
const MILESTONE_AMOUNT_COUNT: usize = 100;
const MILESTONE_COUNT: usize = 50;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Overspending,
    Milestone,
}

serde_plain::derive_display_from_serialize!(AlertKind);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Decimal>,
    /// The last day of the analysed range.
    pub as_of: NaiveDate,
}

/// Runs every heuristic over an already-computed daily trend.
pub(super) fn detect(
    daily: &[DailySpending],
    total: Decimal,
    count: usize,
    as_of: NaiveDate,
) -> Vec<SpendingAlert> {
    let mut alerts = Vec::new();
    if let Some(alert) = overspending(daily, total, count, as_of) {
        alerts.push(alert);
    }
    if let Some(alert) = milestone(total, count, as_of) {
        alerts.push(alert);
    }
    debug!("Detected {} spending alert(s)", alerts.len());
    alerts
}

fn overspending(
    daily: &[DailySpending],
    total: Decimal,
    count: usize,
    as_of: NaiveDate,
) -> Option<SpendingAlert> {
    if daily.is_empty() || count <= OVERSPENDING_MIN_COUNT {
        return None;
    }
    let window = &daily[daily.len().saturating_sub(TRAILING_DAYS)..];
    let trailing_total = saturating_sum(window.iter().map(|d| d.amount));
    let trailing_mean = trailing_total / Decimal::from(window.len());
    let overall_mean = total / Decimal::from(daily.len());
    debug!("Trailing daily mean {trailing_mean}, overall daily mean {overall_mean}");

    let threshold = match overall_mean.checked_mul(OVERSPENDING_FACTOR) {
        Some(t) => t,
        // Out of range: nothing exceeds a positive threshold, everything exceeds a negative one.
        None if overall_mean.is_sign_negative() => Decimal::MIN,
        None => return None,
    };
    if trailing_mean <= threshold {
        return None;
    }

    let increase = if overall_mean.is_zero() {
        0.0
    } else {
        trailing_mean
            .checked_div(overall_mean)
            .and_then(|ratio| ratio.checked_sub(Decimal::ONE))
            .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
            .and_then(|p| p.to_f64())
            .unwrap_or_default()
    };
    Some(SpendingAlert {
        id: "overspending-trailing-week".to_string(),
        kind: AlertKind::Overspending,
        message: format!(
            "You spent {} in the last {} days, {increase:.0}% above your daily average for \
            this period",
            Amount::new(trailing_total),
            window.len()
        ),
        amount: Some(trailing_total),
        as_of,
    })
}

fn milestone(total: Decimal, count: usize, as_of: NaiveDate) -> Option<SpendingAlert> {
    if total >= MILESTONE_AMOUNT && count >= MILESTONE_AMOUNT_COUNT {
        Some(SpendingAlert {
            id: "milestone-spending".to_string(),
            kind: AlertKind::Milestone,
            message: format!(
                "Milestone: {count} receipts tracked totaling {}",
                Amount::new(total)
            ),
            amount: Some(total),
            as_of,
        })
    } else if count >= MILESTONE_COUNT {
        Some(SpendingAlert {
            id: "milestone-receipts".to_string(),
            kind: AlertKind::Milestone,
            message: format!("Milestone: {count} receipts tracked"),
            amount: None,
            as_of,
        })
    } else {
        None
    }
}
