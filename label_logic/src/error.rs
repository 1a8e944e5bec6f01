use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("no images found")]
    NoImagesFound,

    #[error("snapshot {path:?} is corrupt: {reason}")]
    CorruptSnapshot { path: PathBuf, reason: String },

    #[error("position {position} is out of range for {count} records")]
    IndexOutOfRange { position: usize, count: usize },

    #[error("label {0:?} is not one of the configured labels")]
    InvalidLabel(String),

    #[error("label {0:?} cannot be used as a folder name")]
    InvalidLabelName(String),

    #[error("at least one label is required")]
    NoLabels,

    #[error("label {0:?} is configured more than once")]
    DuplicateLabel(String),

    #[error("failed to copy {from:?} to {to:?}")]
    CopyFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write snapshot {path:?}")]
    PersistFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan {path:?}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl LabelError {
    /// Stable machine-readable name, used by the web UI.
    pub fn kind(&self) -> &'static str {
        match self {
            LabelError::NoImagesFound => "no_images_found",
            LabelError::CorruptSnapshot { .. } => "corrupt_snapshot",
            LabelError::IndexOutOfRange { .. } => "index_out_of_range",
            LabelError::InvalidLabel(_) => "invalid_label",
            LabelError::InvalidLabelName(_) => "invalid_label_name",
            LabelError::NoLabels => "no_labels",
            LabelError::DuplicateLabel(_) => "duplicate_label",
            LabelError::CopyFailure { .. } => "copy_failure",
            LabelError::PersistFailure { .. } => "persist_failure",
            LabelError::Scan { .. } => "scan",
        }
    }
}
