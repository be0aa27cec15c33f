//! CSV exports of stored receipts and of an analytics summary.

use crate::analytics::AnalyticsSummary;
use crate::model::{fixed, parse_receipt_date, Amount, Receipt};
use crate::Result;
use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use std::io;

/// The currency symbol written when a receipt has none.
const DEFAULT_CURRENCY: &str = "$";

/// `receipts_YYYY-MM-DD.csv`
pub fn receipts_file_name(today: NaiveDate) -> String {
    format!("receipts_{}.csv", today.format("%Y-%m-%d"))
}

/// `analytics-report-YYYY-MM-DD.csv`
pub fn analytics_file_name(today: NaiveDate) -> String {
    format!("analytics-report-{}.csv", today.format("%Y-%m-%d"))
}

#[derive(Debug, Serialize)]
struct ReceiptRecord<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Merchant")]
    merchant: &'a str,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Currency")]
    currency: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Subtotal")]
    subtotal: String,
    #[serde(rename = "Tax")]
    tax: String,
    #[serde(rename = "File Name")]
    file_name: &'a str,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Created At")]
    created_at: String,
}

impl<'a> From<&'a Receipt> for ReceiptRecord<'a> {
    fn from(r: &'a Receipt) -> Self {
        // Dates that do not parse are written as extracted.
        let date = match r.date.as_deref() {
            None => String::new(),
            Some(raw) => parse_receipt_date(raw)
                .map(|d| d.to_string())
                .unwrap_or_else(|| raw.to_string()),
        };
        Self {
            date,
            merchant: r.merchant.as_deref().unwrap_or_default(),
            amount: r.total.unwrap_or_default().to_fixed(),
            currency: r.currency.as_deref().unwrap_or(DEFAULT_CURRENCY),
            category: r.category.as_deref().unwrap_or_default(),
            subtotal: optional_amount(r.subtotal),
            tax: optional_amount(r.tax),
            file_name: &r.file_name,
            status: r.status.to_string(),
            created_at: r.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

fn optional_amount(amount: Option<Amount>) -> String {
    amount.map(|a| a.to_fixed()).unwrap_or_default()
}

/// Writes one row per receipt, with a header row.
pub fn write_receipts_csv<W: io::Write>(receipts: &[Receipt], w: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(w);
    for receipt in receipts {
        writer
            .serialize(ReceiptRecord::from(receipt))
            .with_context(|| format!("Unable to write receipt {} as CSV", receipt.id))?;
    }
    writer.flush().context("Unable to flush receipts CSV")?;
    Ok(())
}

/// Writes the sectioned analytics report. Rows have different lengths, and blank rows separate
/// the sections.
pub fn write_analytics_csv<W: io::Write>(summary: &AnalyticsSummary, w: W) -> Result<()> {
    let mut report = Report::new(w);
    let period = format!(
        "{} - {}",
        summary.filter.date_from.format("%b %d, %Y"),
        summary.filter.date_to.format("%b %d, %Y")
    );

    report.row(["Analytics Report"])?;
    report.blank()?;
    report.row(["Period".to_string(), period])?;
    report.blank()?;

    report.row(["Summary"])?;
    report.row(["Total Spending".to_string(), fixed(summary.total_spending)])?;
    report.row([
        "Transaction Count".to_string(),
        summary.transaction_count.to_string(),
    ])?;
    report.row([
        "Average Transaction".to_string(),
        fixed(summary.average_transaction),
    ])?;
    report.blank()?;

    report.row(["Category Breakdown"])?;
    report.row(["Category", "Amount", "Count", "Percentage"])?;
    for c in &summary.category_breakdown {
        report.row([
            c.category.clone(),
            fixed(c.amount),
            c.count.to_string(),
            format!("{:.1}%", c.percentage),
        ])?;
    }
    report.blank()?;

    report.row(["Top Merchants"])?;
    report.row(["Merchant", "Amount", "Visits", "Last Visit"])?;
    for m in &summary.top_merchants {
        report.row([
            m.merchant.clone(),
            fixed(m.amount),
            m.count.to_string(),
            m.last_visit.to_string(),
        ])?;
    }
    report.blank()?;

    let tax = &summary.tax_deductible;
    report.row(["Tax-Deductible Expenses"])?;
    report.row(["Total Amount".to_string(), fixed(tax.total_amount)])?;
    report.row(["Count".to_string(), tax.count.to_string()])?;
    report.blank()?;

    report.row(["By Category"])?;
    for (category, amount) in &tax.categories {
        report.row([category.clone(), fixed(*amount)])?;
    }

    report.finish()
}

struct Report<W: io::Write> {
    out: W,
}

impl<W: io::Write> Report<W> {
    fn new(w: W) -> Self {
        Self { out: w }
    }

    fn row<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(&mut self.out);
        writer
            .write_record(fields)
            .context("Unable to write analytics report row")?;
        writer
            .flush()
            .context("Unable to flush analytics report")
    }

    /// An empty line between sections. The csv writer renders a record without fields as `""`,
    /// so the line terminator goes straight to the underlying writer.
    fn blank(&mut self) -> Result<()> {
        self.out
            .write_all(b"\n")
            .context("Unable to write analytics report row")
    }

    fn finish(mut self) -> Result<()> {
        self.out
            .flush()
            .context("Unable to flush analytics report")
    }
}
