//! Handlers for `receipts stats` and `receipts usage`.

use crate::commands::{receipts_noun, Out};
use crate::db::ReceiptStatistics;
use crate::error::{ErrorType, IntoResult};
use crate::model::{first_of_month, ReceiptLimit, Usage};
use crate::{Config, Result};
use chrono::{NaiveDate, NaiveTime};
use format_num::format_num;
use rust_decimal::prelude::ToPrimitive;

/// Returns totals over every stored receipt, per category, and for the last 30 days.
pub async fn stats(config: Config, today: NaiveDate) -> Result<Out<ReceiptStatistics>> {
    let stats = config
        .db()
        .statistics(today)
        .await
        .pub_result(ErrorType::Database)?;
    let total = format_num!(",.2", stats.total_amount.to_f64().unwrap_or_default());
    Ok(Out::new(
        format!("{} totalling {total}", receipts_noun(stats.total_receipts as usize)),
        stats,
    ))
}

/// Returns how many receipts were added this calendar month against the plan's limit.
pub async fn usage(config: Config, today: NaiveDate) -> Result<Out<Usage>> {
    let since = first_of_month(today).and_time(NaiveTime::MIN).and_utc();
    let processed = config
        .db()
        .count_receipts_since(since)
        .await
        .pub_result(ErrorType::Database)?;
    let usage = Usage::new(config.plan(), processed, today);
    let message = match usage.limit {
        ReceiptLimit::Limited(limit) => format!(
            "{processed} of {limit} receipts used on the {} plan, resets on {}",
            config.plan(),
            usage.reset_date
        ),
        ReceiptLimit::Unlimited => format!(
            "{processed} receipts this month on the {} plan",
            config.plan()
        ),
    };
    Ok(Out::new(message, usage))
}
