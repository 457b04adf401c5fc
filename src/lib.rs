//! PDF Batch Library
//!
//! Two sequential batch tools over directories of PDF files:
//! - blur scan: score the first image of every PDF and export the scores
//! - group merge: merge the PDFs of each top-level directory into one file

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod reporting;
pub mod scanner;

pub use config::{MergeConfig, ScanConfig};
pub use error::ItemError;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{MergeConfig, ScanConfig};
    pub use crate::core::blur_scorer::{score_file, score_image};
    pub use crate::core::image_extractor::{extract_first_image, ExtractedImage};
    pub use crate::core::interrupt::Interrupt;
    pub use crate::core::merger::{merge_documents, merge_group, write_document, GroupOutcome};
    pub use crate::error::ItemError;
    pub use crate::pipeline::{run_merge, run_scan, MergeSummary, ScanSummary};
    pub use crate::reporting::progress::{ConsoleObserver, ProgressObserver, SilentObserver};
    pub use crate::reporting::write_export;
    pub use crate::scanner::file_scanner::{collect_pdf_files, ScoreOutcome, ScoreRecord, ScoreTable};
    pub use crate::scanner::group_resolver::{list_candidate_groups, resolve_group, DocumentGroup};
}
