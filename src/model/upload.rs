//! The lifecycle of a receipt image from selection to extracted data.
//!
//! Each upload is a state value that only changes by applying an `UploadEvent`. Illegal moves are
//! rejected rather than silently ignored, so a late progress event cannot resurrect a failed
//! upload.
//!
//! ```text
//! pending -> uploading -> uploaded -> processing -> processed
//!    (any non-terminal state) -> error -> pending (retry)
//! ```

use crate::Result;
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Limits applied to images before they are uploaded.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    pub max_size_bytes: u64,
    /// Images above this size are compressed before upload.
    pub target_size_bytes: u64,
    pub allowed_formats: Vec<String>,
    pub max_files: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 10 * 1024 * 1024,
            target_size_bytes: 2 * 1024 * 1024,
            allowed_formats: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/heic".to_string(),
            ],
            max_files: 10,
        }
    }
}

impl UploadConfig {
    /// Checks a selected file against the size and format limits.
    pub fn validate(&self, file_name: &str, mime_type: &str, size_bytes: u64) -> Result<()> {
        ensure!(
            self.allowed_formats.iter().any(|f| f == mime_type),
            "{file_name}: unsupported format '{mime_type}', expected one of {}",
            self.allowed_formats.join(", ")
        );
        ensure!(
            size_bytes <= self.max_size_bytes,
            "{file_name}: {size_bytes} bytes exceeds the {} byte limit",
            self.max_size_bytes
        );
        Ok(())
    }

    pub fn needs_compression(&self, size_bytes: u64) -> bool {
        size_bytes > self.target_size_bytes
    }
}

/// Where an upload is in its lifecycle.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum UploadStatus {
    #[default]
    Pending,
    Uploading {
        /// Percent complete, 0 to 100.
        progress: u8,
    },
    Uploaded {
        url: String,
    },
    Processing {
        url: String,
    },
    Processed {
        url: String,
        receipt_id: String,
    },
    Error {
        message: String,
    },
}

/// The inputs that move an upload through its lifecycle.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum UploadEvent {
    Start,
    Progress { percent: u8 },
    Uploaded { url: String },
    BeginProcessing,
    Processed { receipt_id: String },
    Failed { message: String },
    Retry,
}

impl UploadStatus {
    pub fn name(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading { .. } => "uploading",
            UploadStatus::Uploaded { .. } => "uploaded",
            UploadStatus::Processing { .. } => "processing",
            UploadStatus::Processed { .. } => "processed",
            UploadStatus::Error { .. } => "error",
        }
    }

    /// `Processed` is final. `Error` can only be left by a retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Processed { .. })
    }

    /// Returns the state that follows `self` after `event`, or an error when `event` is not
    /// allowed in the current state.
    pub fn apply(&self, event: UploadEvent) -> Result<UploadStatus> {
        use UploadEvent as E;
        use UploadStatus as S;
        let next = match (self, event) {
            (S::Pending, E::Start) => S::Uploading { progress: 0 },
            (S::Uploading { progress }, E::Progress { percent }) => {
                ensure!(percent <= 100, "Upload progress {percent}% is out of range");
                // Progress events can arrive out of order; never move backwards.
                S::Uploading {
                    progress: (*progress).max(percent),
                }
            }
            (S::Uploading { .. }, E::Uploaded { url }) => S::Uploaded { url },
            (S::Uploaded { url }, E::BeginProcessing) => S::Processing { url: url.clone() },
            (S::Processing { url }, E::Processed { receipt_id }) => S::Processed {
                url: url.clone(),
                receipt_id,
            },
            (S::Error { .. }, E::Retry) => S::Pending,
            (S::Error { .. }, E::Failed { message }) => S::Error { message },
            (state, E::Failed { message }) if !state.is_terminal() => S::Error { message },
            (state, event) => bail!(
                "Cannot apply {event:?} to an upload that is {}",
                state.name()
            ),
        };
        Ok(next)
    }
}

/// One selected receipt image and its lifecycle state.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub id: String,
    pub file_name: String,
    pub size_bytes: u64,
    #[serde(flatten)]
    pub status: UploadStatus,
}

/// The set of uploads in flight, updated only through `apply`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct UploadQueue {
    config: UploadConfig,
    uploads: Vec<Upload>,
}

impl UploadQueue {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            config,
            uploads: Vec::new(),
        }
    }

    pub fn uploads(&self) -> &[Upload] {
        &self.uploads
    }

    pub fn get(&self, id: &str) -> Option<&Upload> {
        self.uploads.iter().find(|u| u.id == id)
    }

    /// Validates and enqueues a file in the `Pending` state.
    pub fn add(
        &mut self,
        id: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: &str,
        size_bytes: u64,
    ) -> Result<()> {
        let id = id.into();
        let file_name = file_name.into();
        ensure!(
            self.uploads.len() < self.config.max_files,
            "At most {} receipts can be uploaded at once",
            self.config.max_files
        );
        ensure!(self.get(&id).is_none(), "Upload {id} already exists");
        self.config.validate(&file_name, mime_type, size_bytes)?;
        debug!("Queued upload {id} ({file_name}, {size_bytes} bytes)");
        self.uploads.push(Upload {
            id,
            file_name,
            size_bytes,
            status: UploadStatus::Pending,
        });
        Ok(())
    }

    /// Applies `event` to the upload with `id` and returns its new state.
    pub fn apply(&mut self, id: &str, event: UploadEvent) -> Result<&UploadStatus> {
        let upload = self
            .uploads
            .iter_mut()
            .find(|u| u.id == id)
            .with_context(|| format!("Upload {id} not found"))?;
        trace!("Upload {id}: {} + {event:?}", upload.status.name());
        upload.status = upload.status.apply(event)?;
        Ok(&upload.status)
    }

    pub fn remove(&mut self, id: &str) -> Option<Upload> {
        let ix = self.uploads.iter().position(|u| u.id == id)?;
        Some(self.uploads.remove(ix))
    }

    pub fn clear(&mut self) {
        self.uploads.clear();
    }

    /// Number of uploads that have neither finished nor failed.
    pub fn in_flight(&self) -> usize {
        self.uploads
            .iter()
            .filter(|u| !u.status.is_terminal() && !matches!(u.status, UploadStatus::Error { .. }))
            .count()
    }
}
