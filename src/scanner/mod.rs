//! File and group discovery

pub mod file_scanner;
pub mod group_resolver;

pub use file_scanner::{collect_pdf_files, ensure_root, ScoreOutcome, ScoreRecord, ScoreTable};
pub use group_resolver::{list_candidate_groups, resolve_group, DocumentGroup};
