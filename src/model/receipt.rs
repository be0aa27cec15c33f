use crate::model::Amount;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The label used for receipts whose category was not extracted.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// The label used for receipts whose merchant was not extracted.
pub const UNKNOWN_MERCHANT: &str = "Unknown";

/// The processing state of a stored receipt, as reported by the extraction backend.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Processing,
    /// Records that arrive without a status already carry extracted data, so they are treated as
    /// completed.
    #[default]
    Completed,
    Failed,
}

serde_plain::derive_display_from_serialize!(ReceiptStatus);
serde_plain::derive_fromstr_from_deserialize!(ReceiptStatus);

/// A single line from the itemized part of a receipt.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    #[serde(default = "one")]
    pub quantity: u32,
    pub unit_price: Amount,
    #[serde(default)]
    pub total: Amount,
}

fn one() -> u32 {
    1
}

/// A receipt record with whatever fields extraction managed to produce.
///
/// `merchant`, `date`, `total` and `category` are optional because extraction may have failed or
/// may not have run yet. Nothing reads these fields directly for aggregation; `normalize` is the
/// one place where defaults are applied.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Empty for records that have not been stored yet; the store assigns one on insert.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    /// The date printed on the receipt, as extracted. Usually `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub total: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub status: ReceiptStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Receipt {
    /// Creates a completed receipt with nothing extracted.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            file_name: String::new(),
            image_url: None,
            merchant: None,
            date: None,
            total: None,
            subtotal: None,
            tax: None,
            currency: None,
            category: None,
            line_items: Vec::new(),
            status: ReceiptStatus::Completed,
            created_at,
            updated_at: None,
            error: None,
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_total(mut self, total: impl Into<Decimal>) -> Self {
        self.total = Some(Amount::from(total.into()));
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_status(mut self, status: ReceiptStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == ReceiptStatus::Completed
    }
}

/// Field edits for a stored receipt. `None` leaves a field unchanged.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptUpdates {
    pub merchant: Option<String>,
    pub date: Option<String>,
    pub total: Option<Amount>,
    pub subtotal: Option<Amount>,
    pub tax: Option<Amount>,
    pub currency: Option<String>,
    pub category: Option<String>,
}

impl ReceiptUpdates {
    pub fn is_empty(&self) -> bool {
        self == &ReceiptUpdates::default()
    }

    /// Applies the edits to `receipt` in place.
    pub fn apply(&self, receipt: &mut Receipt) {
        if let Some(v) = &self.merchant {
            receipt.merchant = Some(v.clone());
        }
        if let Some(v) = &self.date {
            receipt.date = Some(v.clone());
        }
        if let Some(v) = self.total {
            receipt.total = Some(v);
        }
        if let Some(v) = self.subtotal {
            receipt.subtotal = Some(v);
        }
        if let Some(v) = self.tax {
            receipt.tax = Some(v);
        }
        if let Some(v) = &self.currency {
            receipt.currency = Some(v.clone());
        }
        if let Some(v) = &self.category {
            receipt.category = Some(v.clone());
        }
    }
}

/// The outcome of extracting one field from a receipt image.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Extracted<T> {
    Present(T),
    Absent,
}

impl<T> Extracted<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Extracted::Present(_))
    }

    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Extracted::Present(v) => v,
            Extracted::Absent => default,
        }
    }

    pub fn unwrap_or_else(self, f: impl FnOnce() -> T) -> T {
        match self {
            Extracted::Present(v) => v,
            Extracted::Absent => f(),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Option<U>) -> Extracted<U> {
        match self {
            Extracted::Present(v) => f(v).into(),
            Extracted::Absent => Extracted::Absent,
        }
    }
}

impl<T> From<Option<T>> for Extracted<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Extracted::Present(v),
            None => Extracted::Absent,
        }
    }
}

impl<'a> Extracted<&'a str> {
    /// Blank strings are what a low-confidence extraction usually leaves behind; they count as
    /// absent.
    pub fn text(value: Option<&'a str>) -> Self {
        match value.map(str::trim) {
            Some(s) if !s.is_empty() => Extracted::Present(s),
            _ => Extracted::Absent,
        }
    }
}

/// Where a receipt's effective date came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// The extracted date printed on the receipt.
    Extracted,
    /// The record creation timestamp.
    CreatedAt,
}

/// A receipt with every default applied. This is the only shape the aggregator works with.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NormalizedReceipt {
    pub id: String,
    pub merchant: String,
    pub category: String,
    pub amount: Decimal,
    /// The effective date: the extracted date when it parses, otherwise the creation date.
    pub date: NaiveDate,
    pub date_source: DateSource,
}

/// Resolves every optional field of `receipt` to its default.
pub fn normalize(receipt: &Receipt) -> NormalizedReceipt {
    let merchant = Extracted::text(receipt.merchant.as_deref()).unwrap_or(UNKNOWN_MERCHANT);
    let category = Extracted::text(receipt.category.as_deref()).unwrap_or(UNCATEGORIZED);
    let amount = Extracted::from(receipt.total)
        .and_then(|a| Some(a.value()))
        .unwrap_or(Decimal::ZERO);

    let extracted_date = Extracted::text(receipt.date.as_deref());
    let (date, date_source) = match extracted_date.and_then(parse_receipt_date) {
        Extracted::Present(d) => (d, DateSource::Extracted),
        Extracted::Absent => {
            if let Extracted::Present(raw) = extracted_date {
                warn!(
                    "Receipt {} has an unparseable date '{raw}', using its creation date",
                    receipt.id
                );
            }
            (receipt.created_at.date_naive(), DateSource::CreatedAt)
        }
    };

    NormalizedReceipt {
        id: receipt.id.clone(),
        merchant: merchant.to_string(),
        category: category.to_string(),
        amount,
        date,
        date_source,
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses the date strings that extraction produces. Timestamps keep the calendar date as written,
/// whatever their offset.
pub fn parse_receipt_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().date());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 18, 30, 0).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_applies_defaults() {
        let n = normalize(&Receipt::new("r1", created()));
        assert_eq!(n.merchant, UNKNOWN_MERCHANT);
        assert_eq!(n.category, UNCATEGORIZED);
        assert_eq!(n.amount, Decimal::ZERO);
        assert_eq!(n.date, ymd(2024, 3, 9));
        assert_eq!(n.date_source, DateSource::CreatedAt);
    }

    #[test]
    fn test_normalize_blank_strings_are_absent() {
        let r = Receipt::new("r1", created())
            .with_merchant("  ")
            .with_category("")
            .with_date(" ");
        let n = normalize(&r);
        assert_eq!(n.merchant, UNKNOWN_MERCHANT);
        assert_eq!(n.category, UNCATEGORIZED);
        assert_eq!(n.date_source, DateSource::CreatedAt);
    }

    #[test]
    fn test_normalize_uses_extracted_values() {
        let r = Receipt::new("r1", created())
            .with_merchant(" Corner Cafe ")
            .with_category("Meals & Entertainment")
            .with_date("2024-02-29")
            .with_total(Decimal::new(1250, 2));
        let n = normalize(&r);
        assert_eq!(n.merchant, "Corner Cafe");
        assert_eq!(n.category, "Meals & Entertainment");
        assert_eq!(n.amount, Decimal::new(1250, 2));
        assert_eq!(n.date, ymd(2024, 2, 29));
        assert_eq!(n.date_source, DateSource::Extracted);
    }

    #[test]
    fn test_normalize_unparseable_date_falls_back() {
        let r = Receipt::new("r1", created()).with_date("sometime in March");
        let n = normalize(&r);
        assert_eq!(n.date, ymd(2024, 3, 9));
        assert_eq!(n.date_source, DateSource::CreatedAt);
    }

    #[test]
    fn test_parse_receipt_date_formats() {
        let expected = Some(ymd(2024, 1, 5));
        assert_eq!(parse_receipt_date("2024-01-05"), expected);
        assert_eq!(parse_receipt_date("01/05/2024"), expected);
        assert_eq!(parse_receipt_date("2024/01/05"), expected);
        assert_eq!(parse_receipt_date("2024-01-05T23:59:00-08:00"), expected);
        assert_eq!(parse_receipt_date("2024-01-05T10:00:00Z"), expected);
        assert_eq!(parse_receipt_date("2024-01-05T10:00:00"), expected);
        assert_eq!(parse_receipt_date("2024-01-05 10:00:00.250"), expected);
        assert_eq!(parse_receipt_date("2024-13-05"), None);
        assert_eq!(parse_receipt_date(""), None);
    }

    #[test]
    fn test_deserialize_wire_format() {
        let json = r#"{
            "id": "abc",
            "fileName": "lunch.jpg",
            "merchant": "Deli",
            "date": "2024-01-02",
            "total": 18.75,
            "category": "Food",
            "lineItems": [{"description": "Sandwich", "quantity": 2, "unitPrice": 7.5, "total": 15}],
            "status": "completed",
            "createdAt": "2024-01-02T12:00:00Z"
        }"#;
        let r: Receipt = serde_json::from_str(json).unwrap();
        assert_eq!(r.id, "abc");
        assert_eq!(r.total.unwrap().value(), Decimal::new(1875, 2));
        assert_eq!(r.line_items.len(), 1);
        assert_eq!(r.line_items[0].quantity, 2);
        assert!(r.is_completed());
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let json = r#"{"createdAt": "2024-01-02T12:00:00Z"}"#;
        let r: Receipt = serde_json::from_str(json).unwrap();
        assert!(r.id.is_empty());
        assert!(r.merchant.is_none());
        assert_eq!(r.status, ReceiptStatus::Completed);
    }

    #[test]
    fn test_updates_apply() {
        let mut r = Receipt::new("r1", created()).with_merchant("Old");
        let updates = ReceiptUpdates {
            merchant: Some("New".into()),
            category: Some("Travel".into()),
            ..Default::default()
        };
        assert!(!updates.is_empty());
        updates.apply(&mut r);
        assert_eq!(r.merchant.as_deref(), Some("New"));
        assert_eq!(r.category.as_deref(), Some("Travel"));
        assert!(r.total.is_none());
        assert!(ReceiptUpdates::default().is_empty());
    }
}
