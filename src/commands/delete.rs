use crate::args::DeleteArgs;
use crate::backup::PRE_DELETE;
use crate::commands::{receipts_noun, Out};
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::anyhow;
use std::collections::HashSet;
use tracing::info;

/// Deletes the receipts named in `args`. Every ID must exist, otherwise nothing is deleted. An ID
/// given more than once is deleted once.
///
/// The receipts are saved to a `pre-delete` JSON backup before they are removed.
pub async fn delete(config: Config, args: DeleteArgs) -> Result<Out<Vec<String>>> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = args
        .ids()
        .iter()
        .filter(|id| seen.insert(id.to_string()))
        .cloned()
        .collect();

    let mut doomed = Vec::with_capacity(ids.len());
    for id in &ids {
        let receipt = config
            .db()
            .get_receipt(id)
            .await
            .pub_result(ErrorType::Database)?
            .ok_or_else(|| anyhow!("Receipt '{id}' not found"))
            .pub_result(ErrorType::Request)?;
        doomed.push(receipt);
    }

    let path = config
        .backup()
        .save_json(PRE_DELETE, &doomed)
        .await
        .pub_result(ErrorType::Io)?;
    info!("Saved {} to {}", receipts_noun(doomed.len()), path.display());

    config
        .db()
        .delete_receipts(&ids)
        .await
        .pub_result(ErrorType::Database)?;

    Ok(Out::new(format!("Deleted {}", receipts_noun(ids.len())), ids))
}
