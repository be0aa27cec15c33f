use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// The quick date ranges offered for analytics. Each resolves relative to a given `today`.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DatePreset {
    #[value(name = "last7days")]
    Last7Days,
    #[default]
    #[value(name = "last30days")]
    Last30Days,
    #[value(name = "last3months")]
    Last3Months,
    #[value(name = "thismonth")]
    ThisMonth,
    #[value(name = "lastmonth")]
    LastMonth,
}

serde_plain::derive_display_from_serialize!(DatePreset);
serde_plain::derive_fromstr_from_deserialize!(DatePreset);

impl DatePreset {
    /// Returns the inclusive `(from, to)` range for this preset.
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            DatePreset::Last7Days => (sub_days(today, 7), today),
            DatePreset::Last30Days => (sub_days(today, 30), today),
            DatePreset::Last3Months => (
                today.checked_sub_months(Months::new(3)).unwrap_or(today),
                today,
            ),
            DatePreset::ThisMonth => month_bounds(today),
            DatePreset::LastMonth => {
                let in_last_month = today.checked_sub_months(Months::new(1)).unwrap_or(today);
                month_bounds(in_last_month)
            }
        }
    }
}

fn sub_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(date)
}

/// The first and last day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .unwrap_or(date);
    (first, last)
}

/// Every calendar day from `from` to `to` inclusive. Empty when `from > to`.
pub fn days_inclusive(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_presets() {
        let today = ymd(2024, 3, 31);
        assert_eq!(DatePreset::Last7Days.resolve(today), (ymd(2024, 3, 24), today));
        assert_eq!(DatePreset::Last30Days.resolve(today), (ymd(2024, 3, 1), today));
        assert_eq!(
            DatePreset::Last3Months.resolve(today),
            (ymd(2023, 12, 31), today)
        );
        assert_eq!(
            DatePreset::ThisMonth.resolve(today),
            (ymd(2024, 3, 1), ymd(2024, 3, 31))
        );
        assert_eq!(
            DatePreset::LastMonth.resolve(today),
            (ymd(2024, 2, 1), ymd(2024, 2, 29))
        );
    }

    #[test]
    fn test_last_month_across_year_boundary() {
        let today = ymd(2025, 1, 15);
        assert_eq!(
            DatePreset::LastMonth.resolve(today),
            (ymd(2024, 12, 1), ymd(2024, 12, 31))
        );
    }

    #[test]
    fn test_days_inclusive() {
        let days: Vec<_> = days_inclusive(ymd(2024, 2, 27), ymd(2024, 3, 1)).collect();
        assert_eq!(
            days,
            vec![
                ymd(2024, 2, 27),
                ymd(2024, 2, 28),
                ymd(2024, 2, 29),
                ymd(2024, 3, 1)
            ]
        );
        assert_eq!(days_inclusive(ymd(2024, 1, 2), ymd(2024, 1, 1)).count(), 0);
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!(
            "last3months".parse::<DatePreset>().unwrap(),
            DatePreset::Last3Months
        );
        assert_eq!(DatePreset::default().to_string(), "last30days");
    }
}
