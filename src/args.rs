//! These structs provide the CLI interface for the receipts CLI.

use crate::analytics::DatePreset;
use crate::db::{ReceiptQuery, SortDirection, SortField, DEFAULT_PAGE_SIZE};
use crate::model::{Amount, PlanTier, ReceiptUpdates};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// receipts: A command-line tool for keeping extracted receipt data and analysing your spending.
///
/// Receipts are imported as JSON records, the shape produced by an extraction service, into a
/// local SQLite store. From there you can browse and correct them, export them to CSV, and compute
/// spending analytics over any date range: daily trends, category and merchant breakdowns, monthly
/// comparisons, tax-deductible totals and spending alerts.
#[derive(Debug, Parser, Clone)]
#[command(name = "receipts", version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, its configuration file and an empty receipts database.
    ///
    /// This is the first command you should run. By default the data directory is
    /// $HOME/receipts, pass --receipts-home or set RECEIPTS_HOME to put it somewhere else.
    Init(InitArgs),
    /// Load receipts from a JSON array of receipt records.
    Import(ImportArgs),
    /// List stored receipts with optional filters, sorting and paging.
    List(ListArgs),
    /// Print one receipt.
    Show(ShowArgs),
    /// Correct the extracted fields of a receipt.
    Update(UpdateArgs),
    /// Delete one or more receipts. The deleted receipts are written to a backup first.
    Delete(DeleteArgs),
    /// Print totals over all stored receipts.
    Stats,
    /// Compute spending analytics over a date range.
    Analytics(AnalyticsArgs),
    /// Export all receipts to a CSV file.
    Export(ExportArgs),
    /// Show how many receipts have been processed this month against the plan limit.
    Usage,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where receipt data and configuration is held. Defaults to ~/receipts
    #[arg(long, env = "RECEIPTS_HOME", default_value_t = default_receipts_home())]
    receipts_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, receipts_home: PathBuf) -> Self {
        Self {
            log_level,
            receipts_home: receipts_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn receipts_home(&self) -> &DisplayPath {
        &self.receipts_home
    }
}

/// Args for the `receipts init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The subscription plan, which sets how many receipts may be processed per month.
    #[arg(long, value_enum, default_value_t = PlanTier::Free)]
    plan: PlanTier,
}

impl InitArgs {
    pub fn new(plan: PlanTier) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> PlanTier {
        self.plan
    }
}

/// Args for the `receipts import` command.
#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// The JSON file to read. If not supplied, input will be taken from stdin.
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,

    /// Delete every stored receipt before importing. A backup is written first.
    #[arg(long)]
    replace: bool,
}

impl ImportArgs {
    pub fn new(file: Option<PathBuf>, replace: bool) -> Self {
        Self { file, replace }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn replace(&self) -> bool {
        self.replace
    }
}

/// Args for the `receipts list` command.
#[derive(Debug, Parser, Clone)]
pub struct ListArgs {
    /// Only receipts in this category. Use "Uncategorized" for receipts without one.
    #[arg(long)]
    category: Option<String>,

    /// Only receipts dated on or after this day (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Only receipts dated on or before this day (YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Case-insensitive text to look for in the merchant or file name.
    #[arg(long)]
    search: Option<String>,

    /// Only receipts with a total of at least this amount.
    #[arg(long)]
    min_amount: Option<Decimal>,

    /// Only receipts with a total of at most this amount.
    #[arg(long)]
    max_amount: Option<Decimal>,

    /// The field to sort by.
    #[arg(long, value_enum, default_value_t = SortField::CreatedAt)]
    sort: SortField,

    /// The sort direction.
    #[arg(long, value_enum, default_value_t = SortDirection::Desc)]
    direction: SortDirection,

    /// How many receipts to return.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Continue after the receipt with this ID, i.e. the `lastId` of the previous page.
    #[arg(long)]
    start_after: Option<String>,
}

impl ListArgs {
    pub fn query(&self) -> ReceiptQuery {
        ReceiptQuery {
            category: self.category.clone(),
            date_from: self.from,
            date_to: self.to,
            search: self.search.clone(),
            min_amount: self.min_amount,
            max_amount: self.max_amount,
            sort_by: self.sort,
            direction: self.direction,
            page_size: self.page_size,
            start_after: self.start_after.clone(),
        }
    }
}

impl From<ReceiptQuery> for ListArgs {
    fn from(q: ReceiptQuery) -> Self {
        Self {
            category: q.category,
            from: q.date_from,
            to: q.date_to,
            search: q.search,
            min_amount: q.min_amount,
            max_amount: q.max_amount,
            sort: q.sort_by,
            direction: q.direction,
            page_size: q.page_size,
            start_after: q.start_after,
        }
    }
}

/// Args for the `receipts show` command.
#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    /// The receipt ID, e.g. rcpt-9f1c0e4d2b6a4f1e8a0c3d5b7e9f1a2c
    id: String,
}

impl ShowArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Args for the `receipts update` command. Only the fields given are changed.
#[derive(Debug, Parser, Clone)]
pub struct UpdateArgs {
    /// The receipt ID.
    id: String,

    #[arg(long)]
    merchant: Option<String>,

    /// The date printed on the receipt, preferably YYYY-MM-DD.
    #[arg(long)]
    date: Option<String>,

    #[arg(long)]
    total: Option<Amount>,

    #[arg(long)]
    subtotal: Option<Amount>,

    #[arg(long)]
    tax: Option<Amount>,

    #[arg(long)]
    currency: Option<String>,

    #[arg(long)]
    category: Option<String>,
}

impl UpdateArgs {
    pub fn new(id: impl Into<String>, updates: ReceiptUpdates) -> Self {
        Self {
            id: id.into(),
            merchant: updates.merchant,
            date: updates.date,
            total: updates.total,
            subtotal: updates.subtotal,
            tax: updates.tax,
            currency: updates.currency,
            category: updates.category,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn updates(&self) -> ReceiptUpdates {
        ReceiptUpdates {
            merchant: self.merchant.clone(),
            date: self.date.clone(),
            total: self.total,
            subtotal: self.subtotal,
            tax: self.tax,
            currency: self.currency.clone(),
            category: self.category.clone(),
        }
    }
}

/// Args for the `receipts delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The IDs of the receipts to delete. Either all of them are deleted or none are.
    #[arg(required = true, num_args = 1..)]
    ids: Vec<String>,
}

impl DeleteArgs {
    pub fn new<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

/// The output format for `receipts analytics`.
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
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

serde_plain::derive_display_from_serialize!(ReportFormat);
serde_plain::derive_fromstr_from_deserialize!(ReportFormat);

/// Args for the `receipts analytics` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct AnalyticsArgs {
    /// A quick date range, resolved relative to today.
    #[arg(value_enum, default_value_t = DatePreset::Last30Days)]
    range: DatePreset,

    /// The first day to include (YYYY-MM-DD). Overrides the start of the quick range.
    #[arg(long)]
    from: Option<NaiveDate>,

    /// The last day to include (YYYY-MM-DD). Overrides the end of the quick range.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Only include this category. May be given more than once.
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Only include this merchant. May be given more than once.
    #[arg(long = "merchant")]
    merchants: Vec<String>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    format: ReportFormat,

    /// Write the report to this file. For CSV the default is analytics-report-YYYY-MM-DD.csv in
    /// the current directory; JSON goes to stdout unless this is given.
    #[arg(long)]
    out: Option<PathBuf>,
}

impl AnalyticsArgs {
    pub fn new(range: DatePreset, format: ReportFormat) -> Self {
        Self {
            range,
            format,
            ..Self::default()
        }
    }

    pub fn with_dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_merchants(mut self, merchants: Vec<String>) -> Self {
        self.merchants = merchants;
        self
    }

    pub fn with_out(mut self, out: impl Into<PathBuf>) -> Self {
        self.out = Some(out.into());
        self
    }

    pub fn range(&self) -> DatePreset {
        self.range
    }

    pub fn date_from(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn date_to(&self) -> Option<NaiveDate> {
        self.to
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn merchants(&self) -> &[String] {
        &self.merchants
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn out(&self) -> Option<&Path> {
        self.out.as_deref()
    }
}

/// Args for the `receipts export` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct ExportArgs {
    /// The CSV file to write. Defaults to receipts_YYYY-MM-DD.csv in the current directory.
    #[arg(long)]
    out: Option<PathBuf>,
}

impl ExportArgs {
    pub fn new(out: Option<PathBuf>) -> Self {
        Self { out }
    }

    pub fn out(&self) -> Option<&Path> {
        self.out.as_deref()
    }
}

fn default_receipts_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("receipts"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --receipts-home or RECEIPTS_HOME instead of relying on the \
                default receipts home directory. If you continue using the program right now, you \
                may have problems!",
            );
            PathBuf::from("receipts")
        }
    })
}

/// A path that can be used as a clap default value.
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
