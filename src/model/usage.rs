use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The subscription plans. Each carries a monthly receipt-processing limit.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Basic,
    Pro,
}

serde_plain::derive_display_from_serialize!(PlanTier);
serde_plain::derive_fromstr_from_deserialize!(PlanTier);

impl PlanTier {
    pub fn receipt_limit(&self) -> ReceiptLimit {
        match self {
            PlanTier::Free => ReceiptLimit::Limited(10),
            PlanTier::Basic => ReceiptLimit::Limited(100),
            PlanTier::Pro => ReceiptLimit::Unlimited,
        }
    }

    /// Monthly price in cents.
    pub fn price_cents(&self) -> u32 {
        match self {
            PlanTier::Free => 0,
            PlanTier::Basic => 900,
            PlanTier::Pro => 2900,
        }
    }
}

/// How many receipts may be processed per month.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptLimit {
    Limited(u32),
    Unlimited,
}

/// Receipt processing for the current billing month measured against the plan limit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub processed_this_month: u32,
    pub limit: ReceiptLimit,
    /// The day the monthly count starts over.
    pub reset_date: NaiveDate,
}

impl Usage {
    /// Builds the usage for `plan` as of `today`, with the reset on the first of next month.
    pub fn new(plan: PlanTier, processed_this_month: u32, today: NaiveDate) -> Self {
        Self {
            processed_this_month,
            limit: plan.receipt_limit(),
            reset_date: first_of_next_month(today),
        }
    }

    pub fn has_reached_limit(&self) -> bool {
        match self.limit {
            ReceiptLimit::Limited(limit) => self.processed_this_month >= limit,
            ReceiptLimit::Unlimited => false,
        }
    }

    pub fn can_process_receipt(&self) -> bool {
        !self.has_reached_limit()
    }

    /// Receipts left this month. `None` means unlimited.
    pub fn remaining(&self) -> Option<u32> {
        match self.limit {
            ReceiptLimit::Limited(limit) => Some(limit.saturating_sub(self.processed_this_month)),
            ReceiptLimit::Unlimited => None,
        }
    }

    /// Share of the limit used, capped at 100. Always 0 for unlimited plans.
    pub fn percentage(&self) -> f64 {
        match self.limit {
            ReceiptLimit::Limited(0) => 100.0,
            ReceiptLimit::Limited(limit) => {
                (f64::from(self.processed_this_month) / f64::from(limit) * 100.0).min(100.0)
            }
            ReceiptLimit::Unlimited => 0.0,
        }
    }
}

/// The first day of the month in which usage is counted, i.e. the month containing `today`.
pub fn first_of_month(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

fn first_of_next_month(today: NaiveDate) -> NaiveDate {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 14).unwrap()
    }

    #[test]
    fn test_free_plan_limit() {
        let usage = Usage::new(PlanTier::Free, 4, today());
        assert!(!usage.has_reached_limit());
        assert!(usage.can_process_receipt());
        assert_eq!(usage.remaining(), Some(6));
        assert_eq!(usage.percentage(), 40.0);
    }

    #[test]
    fn test_over_limit_saturates() {
        let usage = Usage::new(PlanTier::Basic, 130, today());
        assert!(usage.has_reached_limit());
        assert!(!usage.can_process_receipt());
        assert_eq!(usage.remaining(), Some(0));
        assert_eq!(usage.percentage(), 100.0);
    }

    #[test]
    fn test_unlimited() {
        let usage = Usage::new(PlanTier::Pro, 5000, today());
        assert!(!usage.has_reached_limit());
        assert_eq!(usage.remaining(), None);
        assert_eq!(usage.percentage(), 0.0);
    }

    #[test]
    fn test_usage_json_keys() {
        let json = serde_json::to_value(Usage::new(PlanTier::Free, 3, today())).unwrap();
        assert_eq!(json["processedThisMonth"], 3);
        assert_eq!(json["resetDate"], "2025-01-01");
        assert_eq!(json["limit"]["limited"], 10);
    }

    #[test]
    fn test_reset_date_rolls_over_year() {
        let usage = Usage::new(PlanTier::Free, 0, today());
        assert_eq!(usage.reset_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(
            first_of_month(today()),
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
        );
    }

    #[test]
    fn test_plan_tier_from_str() {
        assert_eq!("basic".parse::<PlanTier>().unwrap(), PlanTier::Basic);
        assert_eq!(PlanTier::Pro.to_string(), "pro");
        assert_eq!(PlanTier::Basic.price_cents(), 900);
    }
}
