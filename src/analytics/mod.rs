//! The analytics aggregator.
//!
//! `compute_analytics` turns a snapshot of receipts and a filter into an `AnalyticsSummary`. It is
//! a pure function: it performs no I/O, reads no clock, does not mutate its inputs and never
//! fails. Missing extraction data is resolved by `model::normalize` before any grouping happens.

mod alerts;
mod range;

pub use alerts::{AlertKind, SpendingAlert};
pub use range::{days_inclusive, month_bounds, DatePreset};

use crate::model::{normalize, saturating_sum, NormalizedReceipt, Receipt};
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Maximum number of entries in `AnalyticsSummary::top_merchants`.
pub const TOP_MERCHANTS: usize = 10;

/// Categories whose spending counts toward the tax-deductible summary.
pub const TAX_DEDUCTIBLE_CATEGORIES: &[&str] = &[
    "Business",
    "Office Supplies",
    "Travel",
    "Meals & Entertainment",
    "Transportation",
    "Professional Services",
];

/// Selects which receipts are analysed. The date range is inclusive on both ends. `None` for
/// `categories` or `merchants` means no restriction.
///
/// Category and merchant names are matched against normalized values, so `"Uncategorized"` and
/// `"Unknown"` select receipts that are missing those fields.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsFilter {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub merchants: Option<Vec<String>>,
}

impl AnalyticsFilter {
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            date_from,
            date_to,
            categories: None,
            merchants: None,
        }
    }

    /// A filter covering the range that `preset` resolves to as of `today`.
    pub fn from_preset(preset: DatePreset, today: NaiveDate) -> Self {
        let (from, to) = preset.resolve(today);
        Self::new(from, to)
    }

    pub fn with_categories<S: Into<String>>(mut self, categories: impl IntoIterator<Item = S>) -> Self {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_merchants<S: Into<String>>(mut self, merchants: impl IntoIterator<Item = S>) -> Self {
        self.merchants = Some(merchants.into_iter().map(Into::into).collect());
        self
    }

    /// The number of calendar days in the range, 0 when `date_from > date_to`.
    pub fn day_count(&self) -> usize {
        let days = (self.date_to - self.date_from).num_days() + 1;
        usize::try_from(days).unwrap_or(0)
    }

    fn matches(&self, receipt: &NormalizedReceipt) -> bool {
        receipt.date >= self.date_from
            && receipt.date <= self.date_to
            && allowed(self.categories.as_deref(), &receipt.category)
            && allowed(self.merchants.as_deref(), &receipt.merchant)
    }
}

fn allowed(list: Option<&[String]>, value: &str) -> bool {
    list.is_none_or(|l| l.iter().any(|v| v == value))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySpending {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpending {
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub count: usize,
    /// Share of total spending in the range, 0 to 100.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantSpending {
    pub merchant: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub count: usize,
    /// The latest effective date among this merchant's receipts.
    pub last_visit: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySpending {
    /// `YYYY-MM`
    pub month: String,
    pub year: i32,
    /// 1 to 12
    pub month_index: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub count: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxDeductibleSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub count: usize,
    /// Spending per deductible category. Only categories with receipts appear.
    #[serde(serialize_with = "serialize_amount_map")]
    pub categories: BTreeMap<String, Decimal>,
}

fn serialize_amount_map<S>(map: &BTreeMap<String, Decimal>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(
        map.iter()
            .map(|(k, v)| (k, v.to_f64().unwrap_or_default())),
    )
}

/// Everything the charts and reports need for one filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub filter: AnalyticsFilter,
    pub spending_trends: Vec<DailySpending>,
    pub category_breakdown: Vec<CategorySpending>,
    pub top_merchants: Vec<MerchantSpending>,
    pub monthly_comparison: Vec<MonthlySpending>,
    pub tax_deductible: TaxDeductibleSummary,
    pub alerts: Vec<SpendingAlert>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_spending: Decimal,
    pub transaction_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_transaction: Decimal,
}

/// Aggregates `receipts` that pass `filter` into an `AnalyticsSummary`.
pub fn compute_analytics(receipts: &[Receipt], filter: &AnalyticsFilter) -> AnalyticsSummary {
    trace!("compute_analytics over {} receipts with {filter:?}", receipts.len());
    let filtered: Vec<NormalizedReceipt> = receipts
        .iter()
        .map(normalize)
        .filter(|r| filter.matches(r))
        .collect();
    debug!(
        "{} of {} receipts fall within {} to {}",
        filtered.len(),
        receipts.len(),
        filter.date_from,
        filter.date_to
    );

    let total_spending = saturating_sum(filtered.iter().map(|r| r.amount));
    let transaction_count = filtered.len();
    let average_transaction = if transaction_count == 0 {
        Decimal::ZERO
    } else {
        total_spending / Decimal::from(transaction_count)
    };

    let spending_trends = daily_trend(&filtered, filter);
    let alerts = alerts::detect(
        &spending_trends,
        total_spending,
        transaction_count,
        filter.date_to,
    );

    AnalyticsSummary {
        filter: filter.clone(),
        category_breakdown: category_breakdown(&filtered, total_spending),
        top_merchants: top_merchants(&filtered),
        monthly_comparison: monthly_comparison(&filtered),
        tax_deductible: tax_deductible(&filtered),
        spending_trends,
        alerts,
        total_spending,
        transaction_count,
        average_transaction,
    }
}

/// Sums amount and count per key, with keys in ascending order.
fn group_by<K, F>(receipts: &[NormalizedReceipt], key: F) -> BTreeMap<K, (Decimal, usize)>
where
    K: Ord,
    F: Fn(&NormalizedReceipt) -> K,
{
    let mut groups: BTreeMap<K, (Decimal, usize)> = BTreeMap::new();
    for r in receipts {
        let entry = groups.entry(key(r)).or_insert((Decimal::ZERO, 0));
        entry.0 = entry.0.saturating_add(r.amount);
        entry.1 += 1;
    }
    groups
}

/// One entry per day of the filter range, zero-filled.
fn daily_trend(receipts: &[NormalizedReceipt], filter: &AnalyticsFilter) -> Vec<DailySpending> {
    let by_day: HashMap<NaiveDate, (Decimal, usize)> =
        group_by(receipts, |r| r.date).into_iter().collect();
    days_inclusive(filter.date_from, filter.date_to)
        .map(|date| {
            let (amount, count) = by_day.get(&date).copied().unwrap_or((Decimal::ZERO, 0));
            DailySpending {
                date,
                amount,
                count,
            }
        })
        .collect()
}

fn category_breakdown(receipts: &[NormalizedReceipt], total: Decimal) -> Vec<CategorySpending> {
    let mut categories: Vec<CategorySpending> = group_by(receipts, |r| r.category.clone())
        .into_iter()
        .map(|(category, (amount, count))| CategorySpending {
            category,
            amount,
            count,
            percentage: percentage(amount, total),
        })
        .collect();
    categories.sort_by(|a, b| b.amount.cmp(&a.amount));
    categories
}

fn percentage(part: Decimal, total: Decimal) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    part.checked_div(total)
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|p| p.to_f64())
        .unwrap_or_default()
}

fn top_merchants(receipts: &[NormalizedReceipt]) -> Vec<MerchantSpending> {
    let mut merchants: BTreeMap<&str, MerchantSpending> = BTreeMap::new();
    for r in receipts {
        let entry = merchants
            .entry(r.merchant.as_str())
            .or_insert_with(|| MerchantSpending {
                merchant: r.merchant.clone(),
                amount: Decimal::ZERO,
                count: 0,
                last_visit: r.date,
            });
        entry.amount = entry.amount.saturating_add(r.amount);
        entry.count += 1;
        entry.last_visit = entry.last_visit.max(r.date);
    }
    let mut merchants: Vec<MerchantSpending> = merchants.into_values().collect();
    merchants.sort_by(|a, b| b.amount.cmp(&a.amount));
    merchants.truncate(TOP_MERCHANTS);
    merchants
}

/// Ordered by the numeric `(year, month)` pair, never by label text.
fn monthly_comparison(receipts: &[NormalizedReceipt]) -> Vec<MonthlySpending> {
    group_by(receipts, |r| (r.date.year(), r.date.month()))
        .into_iter()
        .map(|((year, month_index), (amount, count))| MonthlySpending {
            month: format!("{year:04}-{month_index:02}"),
            year,
            month_index,
            amount,
            count,
        })
        .collect()
}

fn tax_deductible(receipts: &[NormalizedReceipt]) -> TaxDeductibleSummary {
    let deductible: Vec<NormalizedReceipt> = receipts
        .iter()
        .filter(|r| TAX_DEDUCTIBLE_CATEGORIES.contains(&r.category.as_str()))
        .cloned()
        .collect();
    let categories: BTreeMap<String, Decimal> = group_by(&deductible, |r| r.category.clone())
        .into_iter()
        .map(|(category, (amount, _))| (category, amount))
        .collect();
    TaxDeductibleSummary {
        total_amount: saturating_sum(categories.values().copied()),
        count: deductible.len(),
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashSet;
    use std::str::FromStr;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn receipt(id: &str, date: &str, total: &str, category: &str) -> Receipt {
        Receipt::new(id, created())
            .with_date(date)
            .with_total(Decimal::from_str(total).unwrap())
            .with_category(category)
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn food_and_travel() -> Vec<Receipt> {
        vec![
            receipt("1", "2024-01-01", "100", "Food"),
            receipt("2", "2024-01-02", "50", "Food"),
            receipt("3", "2024-01-03", "50", "Travel"),
        ]
    }

    #[test]
    fn test_worked_example() {
        let filter = AnalyticsFilter::new(ymd(2024, 1, 1), ymd(2024, 1, 3));
        let s = compute_analytics(&food_and_travel(), &filter);

        assert_eq!(s.total_spending, dec("200"));
        assert_eq!(s.transaction_count, 3);
        let avg = s.average_transaction.to_f64().unwrap();
        assert!((avg - 66.67).abs() < 0.01);

        assert_eq!(s.category_breakdown.len(), 2);
        let food = &s.category_breakdown[0];
        assert_eq!(
            (food.category.as_str(), food.amount, food.count),
            ("Food", dec("150"), 2)
        );
        assert!((food.percentage - 75.0).abs() < 1e-9);
        let travel = &s.category_breakdown[1];
        assert_eq!(
            (travel.category.as_str(), travel.amount, travel.count),
            ("Travel", dec("50"), 1)
        );
        assert!((travel.percentage - 25.0).abs() < 1e-9);

        let amounts: Vec<_> = s.spending_trends.iter().map(|d| d.amount).collect();
        assert_eq!(amounts, vec![dec("100"), dec("50"), dec("50")]);
        assert!(s.alerts.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let filter = AnalyticsFilter::new(ymd(2024, 2, 1), ymd(2024, 2, 29));
        let s = compute_analytics(&[], &filter);
        assert_eq!(s.total_spending, Decimal::ZERO);
        assert_eq!(s.transaction_count, 0);
        assert_eq!(s.average_transaction, Decimal::ZERO);
        assert!(s.category_breakdown.is_empty());
        assert!(s.top_merchants.is_empty());
        assert!(s.monthly_comparison.is_empty());
        assert_eq!(s.tax_deductible, TaxDeductibleSummary::default());
        assert!(s.alerts.is_empty());
        assert_eq!(s.spending_trends.len(), 29);
        assert!(s
            .spending_trends
            .iter()
            .all(|d| d.amount.is_zero() && d.count == 0));
    }

    #[test]
    fn test_daily_trend_covers_range_exactly() {
        let receipts = vec![
            receipt("1", "2023-12-31", "5", "Food"),
            receipt("2", "2024-01-15", "7", "Food"),
            receipt("3", "2024-01-15", "3", "Food"),
            receipt("4", "2024-03-02", "9", "Food"),
        ];
        for (from, to) in [
            (ymd(2024, 1, 1), ymd(2024, 1, 1)),
            (ymd(2023, 12, 1), ymd(2024, 3, 1)),
            (ymd(2024, 2, 28), ymd(2024, 3, 5)),
        ] {
            let filter = AnalyticsFilter::new(from, to);
            let s = compute_analytics(&receipts, &filter);
            assert_eq!(s.spending_trends.len(), filter.day_count());
            assert_eq!(s.spending_trends.first().unwrap().date, from);
            assert_eq!(s.spending_trends.last().unwrap().date, to);
            assert!(s.spending_trends.windows(2).all(|w| w[0].date < w[1].date));
            let unique: HashSet<_> = s.spending_trends.iter().map(|d| d.date).collect();
            assert_eq!(unique.len(), s.spending_trends.len());
        }

        let filter = AnalyticsFilter::new(ymd(2024, 1, 1), ymd(2024, 1, 31));
        let s = compute_analytics(&receipts, &filter);
        let jan_15 = &s.spending_trends[14];
        assert_eq!((jan_15.amount, jan_15.count), (dec("10"), 2));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let filter = AnalyticsFilter::new(ymd(2024, 1, 3), ymd(2024, 1, 1));
        let s = compute_analytics(&food_and_travel(), &filter);
        assert_eq!(filter.day_count(), 0);
        assert!(s.spending_trends.is_empty());
        assert_eq!(s.transaction_count, 0);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let receipts = vec![
            // No date: falls back to created_at, 2024-01-01.
            Receipt::new("a", created()).with_total(12),
            // Unparseable date and no total.
            Receipt::new("b", created()).with_date("yesterday-ish"),
        ];
        let filter = AnalyticsFilter::new(ymd(2024, 1, 1), ymd(2024, 1, 1));
        let s = compute_analytics(&receipts, &filter);
        assert_eq!(s.transaction_count, 2);
        assert_eq!(s.total_spending, dec("12"));
        assert_eq!(s.category_breakdown[0].category, "Uncategorized");
        assert_eq!(s.category_breakdown[0].count, 2);
        assert_eq!(s.top_merchants[0].merchant, "Unknown");
        assert_eq!(s.top_merchants[0].last_visit, ymd(2024, 1, 1));
    }

    #[test]
    fn test_zero_total_percentages_are_zero() {
        let receipts = vec![Receipt::new("a", created()).with_category("Food")];
        let filter = AnalyticsFilter::new(ymd(2024, 1, 1), ymd(2024, 1, 1));
        let s = compute_analytics(&receipts, &filter);
        assert_eq!(s.category_breakdown[0].percentage, 0.0);
        assert_eq!(s.average_transaction, Decimal::ZERO);
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let receipts: Vec<Receipt> = (0..23)
            .map(|i| {
                receipt(
                    &i.to_string(),
                    "2024-05-05",
                    &format!("{}.{:02}", 3 + i * 7 % 11, i * 13 % 100),
                    ["A", "B", "C", "D", "E", "F", "G"][i % 7],
                )
            })
            .collect();
        let filter = AnalyticsFilter::new(ymd(2024, 5, 1), ymd(2024, 5, 31));
        let s = compute_analytics(&receipts, &filter);
        let sum: f64 = s.category_breakdown.iter().map(|c| c.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.01, "sum was {sum}");
        assert!(s
            .category_breakdown
            .windows(2)
            .all(|w| w[0].amount >= w[1].amount));
    }

    #[test]
    fn test_category_and_merchant_filters() {
        let receipts = vec![
            receipt("1", "2024-01-01", "10", "Food").with_merchant("Deli"),
            receipt("2", "2024-01-01", "20", "Travel").with_merchant("Airline"),
            receipt("3", "2024-01-01", "30", "Food").with_merchant("Bistro"),
            Receipt::new("4", created()).with_total(40),
        ];
        let base = AnalyticsFilter::new(ymd(2024, 1, 1), ymd(2024, 1, 1));

        let s = compute_analytics(&receipts, &base.clone().with_categories(["Food"]));
        assert_eq!(s.total_spending, dec("40"));

        let s = compute_analytics(
            &receipts,
            &base
                .clone()
                .with_categories(["Food"])
                .with_merchants(["Bistro"]),
        );
        assert_eq!(s.total_spending, dec("30"));

        let s = compute_analytics(&receipts, &base.clone().with_categories(["Uncategorized"]));
        assert_eq!(s.total_spending, dec("40"));

        let s = compute_analytics(&receipts, &base.with_categories(Vec::<String>::new()));
        assert_eq!(s.transaction_count, 0);
    }

    #[test]
    fn test_top_merchants_capped_and_sorted() {
        let receipts: Vec<Receipt> = (1..=14)
            .flat_map(|i| {
                let merchant = format!("Shop {i:02}");
                vec![
                    receipt(&format!("{i}a"), "2024-04-02", &i.to_string(), "Food")
                        .with_merchant(merchant.clone()),
                    receipt(&format!("{i}b"), "2024-04-09", "1", "Food").with_merchant(merchant),
                ]
            })
            .collect();
        let filter = AnalyticsFilter::new(ymd(2024, 4, 1), ymd(2024, 4, 30));
        let s = compute_analytics(&receipts, &filter);
        assert_eq!(s.top_merchants.len(), TOP_MERCHANTS);
        assert!(s.top_merchants.windows(2).all(|w| w[0].amount >= w[1].amount));
        let top = &s.top_merchants[0];
        assert_eq!(top.merchant, "Shop 14");
        assert_eq!((top.amount, top.count), (dec("15"), 2));
        assert_eq!(top.last_visit, ymd(2024, 4, 9));
    }

    #[test]
    fn test_monthly_comparison_across_years() {
        let receipts = vec![
            receipt("1", "2024-01-10", "1", "Food"),
            receipt("2", "2023-12-10", "2", "Food"),
            receipt("3", "2023-04-10", "3", "Food"),
            receipt("4", "2023-12-20", "4", "Food"),
        ];
        let filter = AnalyticsFilter::new(ymd(2023, 1, 1), ymd(2024, 12, 31));
        let s = compute_analytics(&receipts, &filter);
        let months: Vec<_> = s
            .monthly_comparison
            .iter()
            .map(|m| (m.month.as_str(), m.year, m.month_index, m.count))
            .collect();
        assert_eq!(
            months,
            vec![
                ("2023-04", 2023, 4, 1),
                ("2023-12", 2023, 12, 2),
                ("2024-01", 2024, 1, 1)
            ]
        );
        assert_eq!(s.monthly_comparison[1].amount, dec("6"));
    }

    #[test]
    fn test_tax_deductible() {
        let receipts = vec![
            receipt("1", "2024-01-01", "100", "Travel"),
            receipt("2", "2024-01-02", "25.50", "Office Supplies"),
            receipt("3", "2024-01-03", "12", "Travel"),
            receipt("4", "2024-01-03", "80", "Groceries"),
        ];
        let filter = AnalyticsFilter::new(ymd(2024, 1, 1), ymd(2024, 1, 31));
        let s = compute_analytics(&receipts, &filter);
        let tax = &s.tax_deductible;
        assert_eq!(tax.total_amount, dec("137.50"));
        assert_eq!(tax.count, 3);
        assert_eq!(tax.categories.len(), 2);
        assert_eq!(tax.categories["Travel"], dec("112"));
        assert_eq!(tax.categories["Office Supplies"], dec("25.50"));
    }

    #[test]
    fn test_overspending_in_trailing_week() {
        // 8 receipts all inside the last 7 days of a 30 day range.
        let dates = [
            "2024-06-24",
            "2024-06-25",
            "2024-06-26",
            "2024-06-27",
            "2024-06-28",
            "2024-06-29",
            "2024-06-30",
            "2024-06-30",
        ];
        let receipts: Vec<Receipt> = dates
            .iter()
            .enumerate()
            .map(|(i, d)| receipt(&i.to_string(), d, "20", "Food"))
            .collect();
        let filter = AnalyticsFilter::new(ymd(2024, 6, 1), ymd(2024, 6, 30));
        let s = compute_analytics(&receipts, &filter);
        assert_eq!(s.alerts.len(), 1);
        let alert = &s.alerts[0];
        assert_eq!(alert.kind, AlertKind::Overspending);
        assert_eq!(alert.amount, Some(dec("160")));
        assert_eq!(alert.as_of, ymd(2024, 6, 30));
    }

    #[test]
    fn test_amounts_near_decimal_max_saturate() {
        let receipts: Vec<Receipt> = serde_json::from_str(
            r#"[
                {"date": "2024-01-01", "total": 5e28, "category": "Travel", "merchant": "Jet",
                 "createdAt": "2024-01-01T09:00:00Z"},
                {"date": "2024-01-01", "total": 5e28, "category": "Travel", "merchant": "Jet",
                 "createdAt": "2024-01-01T10:00:00Z"}
            ]"#,
        )
        .unwrap();
        let filter = AnalyticsFilter::new(ymd(2024, 1, 1), ymd(2024, 1, 1));
        let s = compute_analytics(&receipts, &filter);

        assert_eq!(s.transaction_count, 2);
        assert_eq!(s.total_spending, Decimal::MAX);
        assert_eq!(s.spending_trends[0].amount, Decimal::MAX);
        assert_eq!(s.category_breakdown[0].amount, Decimal::MAX);
        assert_eq!(s.category_breakdown[0].percentage, 100.0);
        assert_eq!(s.top_merchants[0].amount, Decimal::MAX);
        assert_eq!(s.monthly_comparison[0].amount, Decimal::MAX);
        assert_eq!(s.tax_deductible.total_amount, Decimal::MAX);
        assert!(s.average_transaction > Decimal::ZERO);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let receipts = food_and_travel();
        let before = receipts.clone();
        let filter = AnalyticsFilter::new(ymd(2024, 1, 1), ymd(2024, 1, 3));
        let a = compute_analytics(&receipts, &filter);
        let b = compute_analytics(&receipts, &filter);
        assert_eq!(receipts, before);
        assert_eq!(a, b);
    }

    #[test]
    fn test_summary_serializes_amounts_as_numbers() {
        let filter = AnalyticsFilter::new(ymd(2024, 1, 1), ymd(2024, 1, 3));
        let s = compute_analytics(&food_and_travel(), &filter);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["totalSpending"], serde_json::json!(200.0));
        assert_eq!(json["spendingTrends"][0]["date"], "2024-01-01");
        assert_eq!(json["categoryBreakdown"][0]["category"], "Food");
        assert_eq!(json["filter"]["dateFrom"], "2024-01-01");
    }
}
