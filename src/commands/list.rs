//! Handlers for `receipts list` and `receipts show`.

use crate::args::{ListArgs, ShowArgs};
use crate::commands::{receipts_noun, Out};
use crate::db::Page;
use crate::error::{ErrorType, IntoResult};
use crate::model::Receipt;
use crate::{Config, Result};
use anyhow::anyhow;

/// Returns one page of receipts matching the filters in `args`. Pass the page's `lastId` as
/// `--start-after` to get the next page.
pub async fn list(config: Config, args: ListArgs) -> Result<Out<Page>> {
    let page = config
        .db()
        .list_receipts(&args.query())
        .await
        .pub_result(ErrorType::Database)?;
    let message = if page.has_more {
        format!("Found {}, more are available", receipts_noun(page.receipts.len()))
    } else {
        format!("Found {}", receipts_noun(page.receipts.len()))
    };
    Ok(Out::new(message, page))
}

/// Returns a single receipt with its line items.
pub async fn show(config: Config, args: ShowArgs) -> Result<Out<Receipt>> {
    let receipt = config
        .db()
        .get_receipt(args.id())
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| anyhow!("Receipt '{}' not found", args.id()))
        .pub_result(ErrorType::Request)?;
    Ok(Out::new(format!("Receipt {}", receipt.id), receipt))
}
