//! Handlers for `receipts analytics` and `receipts export`.

use crate::analytics::{compute_analytics, AnalyticsFilter, AnalyticsSummary};
use crate::args::{AnalyticsArgs, ExportArgs, ReportFormat};
use crate::commands::{receipts_noun, Out};
use crate::error::{ErrorType, IntoResult};
use crate::export::{analytics_file_name, receipts_file_name, write_analytics_csv, write_receipts_csv};
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::debug;

/// Aggregates the completed receipts over the range and filters in `args`.
///
/// JSON is returned as the command's structure unless `--out` is given. CSV is always written to
/// a file, `analytics-report-YYYY-MM-DD.csv` in the current directory by default.
pub async fn analytics(
    config: Config,
    args: AnalyticsArgs,
    today: NaiveDate,
) -> Result<Out<AnalyticsSummary>> {
    let filter = filter(&args, today);
    debug!(?filter, "Computing analytics");
    let receipts = config
        .db()
        .completed_receipts()
        .await
        .pub_result(ErrorType::Database)?;
    let summary = compute_analytics(&receipts, &filter);
    let message = format!(
        "{} from {} to {}",
        receipts_noun(summary.transaction_count),
        filter.date_from,
        filter.date_to
    );

    match (args.format(), args.out()) {
        (ReportFormat::Json, None) => Ok(Out::new(message, summary)),
        (ReportFormat::Json, Some(path)) => {
            let json = serde_json::to_string_pretty(&summary)
                .context("Unable to serialize the analytics summary")
                .pub_result(ErrorType::Internal)?;
            utils::write(path, json).await.pub_result(ErrorType::Io)?;
            Ok(format!("{message}, written to {}", path.display()).into())
        }
        (ReportFormat::Csv, out) => {
            let path = out
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(analytics_file_name(today)));
            let mut buf = Vec::new();
            write_analytics_csv(&summary, &mut buf).pub_result(ErrorType::Internal)?;
            utils::write(&path, buf).await.pub_result(ErrorType::Io)?;
            Ok(format!("{message}, written to {}", path.display()).into())
        }
    }
}

/// Writes every stored receipt to a CSV file, `receipts_YYYY-MM-DD.csv` in the current directory
/// by default. Returns the path written.
pub async fn export(config: Config, args: ExportArgs, today: NaiveDate) -> Result<Out<String>> {
    let receipts = config
        .db()
        .all_receipts()
        .await
        .pub_result(ErrorType::Database)?;
    let path = args
        .out()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(receipts_file_name(today)));
    let mut buf = Vec::new();
    write_receipts_csv(&receipts, &mut buf).pub_result(ErrorType::Internal)?;
    utils::write(&path, buf).await.pub_result(ErrorType::Io)?;
    Ok(Out::new(
        format!("Exported {} to {}", receipts_noun(receipts.len()), path.display()),
        path.display().to_string(),
    ))
}

/// The preset range with any explicit `--from`/`--to` applied. Empty category or merchant lists
/// mean no restriction.
fn filter(args: &AnalyticsArgs, today: NaiveDate) -> AnalyticsFilter {
    let (from, to) = args.range().resolve(today);
    let mut filter = AnalyticsFilter::new(
        args.date_from().unwrap_or(from),
        args.date_to().unwrap_or(to),
    );
    if !args.categories().is_empty() {
        filter = filter.with_categories(args.categories().iter().cloned());
    }
    if !args.merchants().is_empty() {
        filter = filter.with_merchants(args.merchants().iter().cloned());
    }
    filter
}
