//! Per-item failure reasons
//!
//! A failing file or group never aborts a batch run. Instead the stage
//! returns one of these and the pipeline records it as absent or skipped.

use thiserror::Error;

/// Why a single PDF (scan) or group (merge) could not be processed
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("failed to load PDF: {0}")]
    Load(#[from] lopdf::Error),

    #[error("document has no pages")]
    NoPages,

    #[error("first page has no embedded images")]
    NoImages,

    #[error("unsupported image encoding: {0}")]
    UnsupportedImage(String),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed page tree: {0}")]
    PageTree(String),

    #[error("no PDF files to merge")]
    NoFilesToMerge,

    #[error("panic while processing: {0}")]
    Panicked(String),
}

impl ItemError {
    pub(crate) fn page_tree(message: impl Into<String>) -> Self {
        Self::PageTree(message.into())
    }
}
