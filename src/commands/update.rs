use crate::args::UpdateArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::Receipt;
use crate::{Config, Result};
use anyhow::anyhow;
use tracing::debug;

/// Changes the extracted fields given in `args` on one receipt and returns the updated receipt.
///
/// # Errors
/// - A request error if no fields were given or the receipt does not exist.
pub async fn update(config: Config, args: UpdateArgs) -> Result<Out<Receipt>> {
    let updates = args.updates();
    if updates.is_empty() {
        return Err(anyhow!("Nothing to update, give at least one field to change"))
            .pub_result(ErrorType::Request);
    }
    if config
        .db()
        .get_receipt(args.id())
        .await
        .pub_result(ErrorType::Database)?
        .is_none()
    {
        return Err(anyhow!("Receipt '{}' not found", args.id())).pub_result(ErrorType::Request);
    }
    debug!(?updates, "Updating receipt {}", args.id());
    let receipt = config
        .db()
        .update_receipt(args.id(), &updates)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(format!("Updated receipt {}", receipt.id), receipt))
}
