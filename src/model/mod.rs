//! Types that represent the core data model: receipts, money, the upload lifecycle and plan usage.
mod amount;
mod receipt;
mod upload;
mod usage;

pub use amount::{Amount, AmountError, AmountFormat};
pub(crate) use amount::{fixed, saturating_sum};
pub use receipt::{
    normalize, parse_receipt_date, DateSource, Extracted, LineItem, NormalizedReceipt, Receipt,
    ReceiptStatus, ReceiptUpdates, UNCATEGORIZED, UNKNOWN_MERCHANT,
};
pub use upload::{Upload, UploadConfig, UploadEvent, UploadQueue, UploadStatus};
pub use usage::{first_of_month, PlanTier, ReceiptLimit, Usage};
