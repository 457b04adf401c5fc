//! The two batch pipelines
//!
//! Both process one item at a time, record per-item failures instead of
//! aborting, and stop early when the user interrupts.

pub mod merge;
pub mod scan;

pub use merge::{run_merge, MergeSummary};
pub use scan::{run_scan, ScanSummary};

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::error::ItemError;

/// Run one item's work, turning a panic in a PDF or image library into an error
pub(crate) fn isolate<T>(work: impl FnOnce() -> Result<T, ItemError>) -> Result<T, ItemError> {
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ItemError::Panicked(message))
        }
    }
}

/// File or directory name for progress display
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
