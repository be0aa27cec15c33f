//! This module is responsible for reading, writing and managing the SQLite receipt store.

mod migrations;

use crate::model::{normalize, Amount, LineItem, Receipt, ReceiptStatus, ReceiptUpdates};
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use chrono::{DateTime, Days, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, trace};

/// The number of receipts per page when a query does not say otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Receipts created within this many days count toward `ReceiptStatistics::recent_total`.
const RECENT_DAYS: u64 = 30;

const RECEIPT_COLUMNS: &str = "id, file_name, image_url, merchant, date, total, subtotal, tax, \
    currency, category, status, created_at, updated_at, error";

#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the schema to the current version
    pub async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure!(
            !path.exists(),
            "A database already exists at '{}'",
            path.display()
        );
        let pool = connect(path, true).await?;
        migrations::bootstrap(&pool).await?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        debug!("Created receipts database at {}", path.display());
        Ok(Self { pool })
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Upgrades the schema if it is older than the current version
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing '{}'", path.display())
        }
        let pool = connect(path, false).await?;
        let found = migrations::version(&pool).await?;
        ensure!(
            found <= migrations::CURRENT_VERSION,
            "The database schema version {found} is newer than this program supports ({})",
            migrations::CURRENT_VERSION
        );
        migrations::run(&pool, found, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    /// Stores `receipt` and its line items under a newly generated ID, which is returned. Any ID
    /// already on `receipt` is ignored.
    pub async fn insert_receipt(&self, receipt: &Receipt) -> Result<String> {
        let mut tx = self.pool.begin().await.context("Failed to begin insert")?;
        let id = insert_row(&mut *tx, receipt).await?;
        tx.commit().await.context("Failed to commit insert")?;
        Ok(id)
    }

    /// Stores `receipts` in one transaction and returns their new IDs in order. With `replace`,
    /// every existing receipt is deleted first. If any insert fails the store is left unchanged.
    pub async fn insert_receipts(&self, receipts: &[Receipt], replace: bool) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await.context("Failed to begin import")?;
        if replace {
            let removed = sqlx::query("DELETE FROM receipts")
                .execute(&mut *tx)
                .await
                .context("Failed to delete receipts")?
                .rows_affected();
            debug!("Removing {removed} receipts before import");
        }
        let mut ids = Vec::with_capacity(receipts.len());
        for receipt in receipts {
            ids.push(insert_row(&mut *tx, receipt).await?);
        }
        tx.commit().await.context("Failed to commit import")?;
        Ok(ids)
    }

    pub async fn get_receipt(&self, id: &str) -> Result<Option<Receipt>> {
        let row: Option<ReceiptRow> =
            sqlx::query_as(&format!("SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Failed to read receipt {id}"))?;
        match row {
            None => Ok(None),
            Some(row) => Ok(self.with_line_items(vec![row]).await?.pop()),
        }
    }

    /// Applies `updates` to the receipt with `id`, stamps `updated_at` and returns the result.
    pub async fn update_receipt(&self, id: &str, updates: &ReceiptUpdates) -> Result<Receipt> {
        let mut receipt = self
            .get_receipt(id)
            .await?
            .with_context(|| format!("Receipt '{id}' not found"))?;
        updates.apply(&mut receipt);
        receipt.updated_at = Some(Utc::now().trunc_subsecs(6));

        sqlx::query(
            "UPDATE receipts SET merchant = ?, date = ?, effective_date = ?, total = ?, \
            subtotal = ?, tax = ?, currency = ?, category = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&receipt.merchant)
        .bind(&receipt.date)
        .bind(effective_date(&receipt))
        .bind(amount_text(receipt.total))
        .bind(amount_text(receipt.subtotal))
        .bind(amount_text(receipt.tax))
        .bind(&receipt.currency)
        .bind(&receipt.category)
        .bind(receipt.updated_at.as_ref().map(timestamp))
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update receipt {id}"))?;

        debug!("Updated receipt {id}");
        Ok(receipt)
    }

    /// Deletes the receipt with `id` along with its line items.
    pub async fn delete_receipt(&self, id: &str) -> Result<()> {
        self.delete_receipts(&[id.to_string()]).await
    }

    /// Deletes the receipts with `ids` in one transaction. If any ID is unknown nothing is
    /// deleted.
    pub async fn delete_receipts(&self, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin delete")?;
        for id in ids {
            let result = sqlx::query("DELETE FROM receipts WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to delete receipt {id}"))?;
            // Returning early drops `tx`, which rolls back.
            ensure!(result.rows_affected() > 0, "Receipt '{id}' not found");
        }
        tx.commit().await.context("Failed to commit delete")?;
        debug!("Deleted {} receipt(s)", ids.len());
        Ok(())
    }

    /// One page of receipts matching `query`. Pass the previous page's `last_id` as
    /// `start_after` to continue.
    pub async fn list_receipts(&self, query: &ReceiptQuery) -> Result<Page> {
        trace!("list_receipts {query:?}");
        ensure!(query.page_size > 0, "The page size must be at least 1");
        let sort = query.sort_by.expr();
        let dir = query.direction.keyword();

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {RECEIPT_COLUMNS} FROM receipts WHERE 1 = 1"));
        if let Some(category) = &query.category {
            qb.push(" AND COALESCE(NULLIF(TRIM(category), ''), ")
                .push_bind(crate::model::UNCATEGORIZED)
                .push(") = ")
                .push_bind(category.clone());
        }
        if let Some(from) = query.date_from {
            qb.push(" AND effective_date >= ").push_bind(from.to_string());
        }
        if let Some(to) = query.date_to {
            qb.push(" AND effective_date <= ").push_bind(to.to_string());
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND (instr(lower(COALESCE(merchant, '')), lower(")
                .push_bind(search.to_string())
                .push(")) > 0 OR instr(lower(file_name), lower(")
                .push_bind(search.to_string())
                .push(")) > 0)");
        }
        if let Some(min) = query.min_amount {
            qb.push(format!(" AND {} >= ", SortField::Total.expr()))
                .push_bind(min.to_f64().unwrap_or_default());
        }
        if let Some(max) = query.max_amount {
            qb.push(format!(" AND {} <= ", SortField::Total.expr()))
                .push_bind(max.to_f64().unwrap_or_default());
        }
        if let Some(cursor) = &query.start_after {
            let known: Option<(String,)> = sqlx::query_as("SELECT id FROM receipts WHERE id = ?")
                .bind(cursor)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to look up the page cursor")?;
            ensure!(known.is_some(), "Unknown page cursor '{cursor}'");

            let op = match query.direction {
                SortDirection::Asc => ">",
                SortDirection::Desc => "<",
            };
            qb.push(format!(
                " AND ({sort}, id) {op} ((SELECT {sort} FROM receipts WHERE id = "
            ))
            .push_bind(cursor.clone())
            .push("), ")
            .push_bind(cursor.clone())
            .push(")");
        }
        qb.push(format!(" ORDER BY {sort} {dir}, id {dir} LIMIT "))
            .push_bind(i64::from(query.page_size) + 1);

        let mut rows: Vec<ReceiptRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list receipts")?;
        let has_more = rows.len() > query.page_size as usize;
        rows.truncate(query.page_size as usize);
        let receipts = self.with_line_items(rows).await?;
        let last_id = receipts.last().map(|r| r.id.clone());
        debug!("Listed {} receipts, has_more = {has_more}", receipts.len());
        Ok(Page {
            receipts,
            last_id,
            has_more,
        })
    }

    /// Every receipt, oldest first.
    pub async fn all_receipts(&self) -> Result<Vec<Receipt>> {
        let rows: Vec<ReceiptRow> = sqlx::query_as(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to read receipts")?;
        self.with_line_items(rows).await
    }

    /// Every receipt whose extraction has completed, oldest first. This is what analytics run on.
    pub async fn completed_receipts(&self) -> Result<Vec<Receipt>> {
        let rows: Vec<ReceiptRow> = sqlx::query_as(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE status = ? ORDER BY created_at, id"
        ))
        .bind(ReceiptStatus::Completed.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to read completed receipts")?;
        self.with_line_items(rows).await
    }

    pub async fn count_receipts(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM receipts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count receipts")?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// The number of receipts created at or after `since`.
    pub async fn count_receipts_since(&self, since: DateTime<Utc>) -> Result<u32> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM receipts WHERE created_at >= ?")
            .bind(timestamp(&since))
            .fetch_one(&self.pool)
            .await
            .context("Failed to count receipts")?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Totals over every stored receipt, with `recent_total` covering the receipts created in
    /// the 30 days up to `today`.
    pub async fn statistics(&self, today: NaiveDate) -> Result<ReceiptStatistics> {
        let receipts = self.all_receipts().await?;
        let recent_start = today.checked_sub_days(Days::new(RECENT_DAYS)).unwrap_or(today);

        let mut stats = ReceiptStatistics::default();
        for receipt in &receipts {
            let n = normalize(receipt);
            stats.total_receipts += 1;
            stats.total_amount = stats.total_amount.saturating_add(n.amount);
            let entry = stats.by_category.entry(n.category).or_default();
            entry.count += 1;
            entry.total = entry.total.saturating_add(n.amount);
            if receipt.created_at.date_naive() >= recent_start {
                stats.recent_total = stats.recent_total.saturating_add(n.amount);
            }
        }
        Ok(stats)
    }

    /// Loads the line items for `rows` in one query and assembles the receipts, keeping row order.
    async fn with_line_items(&self, rows: Vec<ReceiptRow>) -> Result<Vec<Receipt>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT receipt_id, description, quantity, unit_price, total FROM line_items \
            WHERE receipt_id IN (",
        );
        let mut ids = qb.separated(", ");
        for row in &rows {
            ids.push_bind(row.id.clone());
        }
        ids.push_unseparated(") ORDER BY receipt_id, position");
        let items: Vec<LineItemRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("Failed to read line items")?;

        let mut by_receipt: HashMap<String, Vec<LineItem>> = HashMap::new();
        for item in items {
            let receipt_id = item.receipt_id.clone();
            by_receipt
                .entry(receipt_id)
                .or_default()
                .push(LineItem::try_from(item)?);
        }

        rows.into_iter()
            .map(|row| -> Result<Receipt> {
                let line_items = by_receipt.remove(&row.id).unwrap_or_default();
                let mut receipt = Receipt::try_from(row)?;
                receipt.line_items = line_items;
                Ok(receipt)
            })
            .collect()
    }
}

/// Inserts `receipt` and its line items under a newly generated ID.
async fn insert_row(conn: &mut SqliteConnection, receipt: &Receipt) -> Result<String> {
    let id = utils::generate_receipt_id();
    trace!("Inserting receipt {id}");
    sqlx::query(
        "INSERT INTO receipts (id, file_name, image_url, merchant, date, effective_date, \
        total, subtotal, tax, currency, category, status, created_at, updated_at, error) \
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&receipt.file_name)
    .bind(&receipt.image_url)
    .bind(&receipt.merchant)
    .bind(&receipt.date)
    .bind(effective_date(receipt))
    .bind(amount_text(receipt.total))
    .bind(amount_text(receipt.subtotal))
    .bind(amount_text(receipt.tax))
    .bind(&receipt.currency)
    .bind(&receipt.category)
    .bind(receipt.status.to_string())
    .bind(timestamp(&receipt.created_at))
    .bind(receipt.updated_at.as_ref().map(timestamp))
    .bind(&receipt.error)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert receipt {id}"))?;

    for (position, item) in receipt.line_items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO line_items (receipt_id, position, description, quantity, \
            unit_price, total) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(i64::try_from(position).context("Too many line items")?)
        .bind(&item.description)
        .bind(i64::from(item.quantity))
        .bind(item.unit_price.value().to_string())
        .bind(item.total.value().to_string())
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to insert line items for receipt {id}"))?;
    }
    Ok(id)
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open SQLite database at {}", path.display()))
}

/// Receipt columns used for sorting a listing.
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
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Date,
    Total,
    Merchant,
}

serde_plain::derive_display_from_serialize!(SortField);
serde_plain::derive_fromstr_from_deserialize!(SortField);

impl SortField {
    /// The SQL expression this field sorts by. None of these can be NULL, so keyset comparisons
    /// always have a value to compare.
    fn expr(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Date => "effective_date",
            SortField::Total => "CAST(COALESCE(total, '0') AS REAL)",
            SortField::Merchant => "lower(COALESCE(merchant, ''))",
        }
    }
}

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
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

serde_plain::derive_display_from_serialize!(SortDirection);
serde_plain::derive_fromstr_from_deserialize!(SortDirection);

impl SortDirection {
    fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Filters, ordering and paging for `list_receipts`. `category` matches the normalized category,
/// dates match the effective date, and `search` is a case-insensitive substring of the merchant or
/// file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptQuery {
    pub category: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub sort_by: SortField,
    pub direction: SortDirection,
    pub page_size: u32,
    /// The ID of the last receipt on the previous page.
    pub start_after: Option<String>,
}

impl Default for ReceiptQuery {
    fn default() -> Self {
        Self {
            category: None,
            date_from: None,
            date_to: None,
            search: None,
            min_amount: None,
            max_amount: None,
            sort_by: SortField::default(),
            direction: SortDirection::default(),
            page_size: DEFAULT_PAGE_SIZE,
            start_after: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub receipts: Vec<Receipt>,
    pub last_id: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatistics {
    pub count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptStatistics {
    pub total_receipts: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub by_category: BTreeMap<String, CategoryStatistics>,
    #[serde(with = "rust_decimal::serde::float")]
    pub recent_total: Decimal,
}

#[derive(sqlx::FromRow)]
struct ReceiptRow {
    id: String,
    file_name: String,
    image_url: Option<String>,
    merchant: Option<String>,
    date: Option<String>,
    total: Option<String>,
    subtotal: Option<String>,
    tax: Option<String>,
    currency: Option<String>,
    category: Option<String>,
    status: String,
    created_at: String,
    updated_at: Option<String>,
    error: Option<String>,
}

impl TryFrom<ReceiptRow> for Receipt {
    type Error = anyhow::Error;

    fn try_from(row: ReceiptRow) -> Result<Self> {
        let status = ReceiptStatus::from_str(&row.status)
            .with_context(|| format!("Receipt {} has an invalid status '{}'", row.id, row.status))?;
        Ok(Receipt {
            total: parse_amount(row.total.as_deref())?,
            subtotal: parse_amount(row.subtotal.as_deref())?,
            tax: parse_amount(row.tax.as_deref())?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: row.updated_at.as_deref().map(parse_timestamp).transpose()?,
            id: row.id,
            file_name: row.file_name,
            image_url: row.image_url,
            merchant: row.merchant,
            date: row.date,
            currency: row.currency,
            category: row.category,
            line_items: Vec::new(),
            status,
            error: row.error,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LineItemRow {
    receipt_id: String,
    description: String,
    quantity: i64,
    unit_price: String,
    total: String,
}

impl TryFrom<LineItemRow> for LineItem {
    type Error = anyhow::Error;

    fn try_from(row: LineItemRow) -> Result<Self> {
        Ok(LineItem {
            description: row.description,
            quantity: u32::try_from(row.quantity).context("Invalid line item quantity")?,
            unit_price: parse_amount(Some(&row.unit_price))?.unwrap_or_default(),
            total: parse_amount(Some(&row.total))?.unwrap_or_default(),
        })
    }
}

fn effective_date(receipt: &Receipt) -> String {
    normalize(receipt).date.to_string()
}

fn amount_text(amount: Option<Amount>) -> Option<String> {
    amount.map(|a| a.value().to_string())
}

fn parse_amount(s: Option<&str>) -> Result<Option<Amount>> {
    s.map(|s| {
        Decimal::from_str(s)
            .map(Amount::from)
            .with_context(|| format!("Invalid stored amount '{s}'"))
    })
    .transpose()
}

/// Fixed-width UTC timestamps so that text order is time order.
fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Invalid stored timestamp '{s}'"))
}
