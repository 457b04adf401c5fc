//! Per-item processing stages

pub mod blur_scorer;
pub mod image_extractor;
pub mod interrupt;
pub mod merger;

pub use blur_scorer::{score_file, score_image};
pub use image_extractor::{extract_first_image, ExtractedImage};
pub use interrupt::Interrupt;
pub use merger::{merge_documents, merge_group, write_document, GroupOutcome};
