//! Blur scan: walk → extract first image → score → export

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::Level;

use crate::config::ScanConfig;
use crate::core::{extract_first_image, score_file, Interrupt};
use crate::error::ItemError;
use crate::pipeline::{display_name, isolate};
use crate::reporting::{write_export, ProgressObserver};
use crate::scanner::{collect_pdf_files, ensure_root, ScoreRecord, ScoreTable};

/// What a scan run did
#[derive(Debug)]
pub struct ScanSummary {
    pub discovered: usize,
    pub scored: usize,
    pub absent: usize,
    pub interrupted: bool,
    /// `None` when the export file could not be written
    pub export_file: Option<PathBuf>,
    pub records: Vec<ScoreRecord>,
}

/// Blur score of the first image on the first page of `pdf`
pub fn score_pdf(pdf: &Path, scratch_dir: &Path) -> Result<f64, ItemError> {
    isolate(|| {
        let image = extract_first_image(pdf, scratch_dir)?;
        tracing::debug!(
            "Extracted {}x{} {:?} image from {}",
            image.width,
            image.height,
            image.format,
            pdf.display()
        );
        score_file(image.path())
    })
}

/// Run the blur scan over `config.root`
///
/// Fails only when the root is missing or cannot be walked. Per-file
/// failures are exported with an empty score; an interrupt stops the loop
/// but the partial results are still exported.
pub fn run_scan(
    config: &ScanConfig,
    observer: &mut dyn ProgressObserver,
    interrupt: &Interrupt,
) -> Result<ScanSummary> {
    let root = ensure_root(&config.root)?;
    observer.log(Level::INFO, &format!("PDF directory: {}", root.display()));

    observer.log(Level::INFO, "Searching for PDF files...");
    let files = collect_pdf_files(&root, true)?;
    let total = files.len();
    observer.log(Level::INFO, &format!("Found {} PDF file(s) to scan", total));

    let scratch = create_scratch_dir(&root, config.scratch_in_root)?;
    observer.log(
        Level::DEBUG,
        &format!("Created scratch directory: {}", scratch.path().display()),
    );

    let mut table = ScoreTable::new();
    let mut interrupted = false;

    observer.start("Scanning", total);
    for (idx, path) in files.iter().enumerate() {
        if interrupt.is_requested() {
            interrupted = true;
            observer.log(Level::INFO, "Interrupted by user");
            break;
        }

        observer.item_started(&display_name(path));
        let record = match score_pdf(path, scratch.path()) {
            Ok(score) => ScoreRecord::scored(path.clone(), score),
            Err(e) => {
                observer.log(
                    Level::DEBUG,
                    &format!("Could not score {}: {}", path.display(), e),
                );
                ScoreRecord::absent(path.clone(), e.to_string())
            }
        };
        table.insert(record);
        observer.item_finished(idx + 1, total);
    }
    observer.finish(if interrupted { "Interrupted" } else { "Scan complete" });

    let scored = table.scored_count();
    let absent = table.len() - scored;

    let export_file = match write_export(&root, table.records()) {
        Ok(path) => Some(path),
        Err(e) => {
            observer.log(Level::ERROR, &format!("Failed to write export file: {:#}", e));
            None
        }
    };

    let scratch_path = scratch.path().to_path_buf();
    match scratch.close() {
        Ok(()) => observer.log(
            Level::DEBUG,
            &format!("Removed scratch directory: {}", scratch_path.display()),
        ),
        Err(e) => observer.log(
            Level::WARN,
            &format!("Failed to remove scratch directory {}: {}", scratch_path.display(), e),
        ),
    }

    let destination = export_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<no export>".to_string());
    observer.log(
        Level::INFO,
        &format!(
            "Scan complete: {} file(s), {} scored, {} without score -> {}",
            total, scored, absent, destination
        ),
    );

    Ok(ScanSummary {
        discovered: total,
        scored,
        absent,
        interrupted,
        export_file,
        records: table.into_records(),
    })
}

/// Scratch directory for extracted images, under the root when possible
fn create_scratch_dir(root: &Path, in_root: bool) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("tmp-blur-");

    if in_root {
        match builder.tempdir_in(root) {
            Ok(dir) => return Ok(dir),
            Err(e) => tracing::debug!(
                "Cannot create scratch directory in {}: {}; using system temp",
                root.display(),
                e
            ),
        }
    }
    builder.tempdir().context("Failed to create scratch directory")
}
