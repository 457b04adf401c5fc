//! PDF file discovery and scan results

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Outcome of scoring a single PDF
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Scored(f64),
    Absent { reason: String },
}

/// Result of scanning a single PDF file
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub path: PathBuf,
    pub outcome: ScoreOutcome,
}

impl ScoreRecord {
    pub fn scored(path: PathBuf, score: f64) -> Self {
        Self {
            path,
            outcome: ScoreOutcome::Scored(score),
        }
    }

    pub fn absent(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            path,
            outcome: ScoreOutcome::Absent {
                reason: reason.into(),
            },
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            ScoreOutcome::Scored(score) => Some(score),
            ScoreOutcome::Absent { .. } => None,
        }
    }
}

/// Insertion-ordered scan results, unique by path
#[derive(Debug, Default)]
pub struct ScoreTable {
    records: Vec<ScoreRecord>,
    seen: HashSet<PathBuf>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Returns `false` and keeps the first record when the
    /// path is already present.
    pub fn insert(&mut self, record: ScoreRecord) -> bool {
        if !self.seen.insert(record.path.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn scored_count(&self) -> usize {
        self.records.iter().filter(|r| r.score().is_some()).count()
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ScoreRecord> {
        self.records
    }
}

/// Check that the root exists and is a directory, returning its absolute form
pub fn ensure_root(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        bail!("Directory does not exist: {}", path.display());
    }
    if !path.is_dir() {
        bail!("Not a directory: {}", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to resolve directory: {}", path.display()))
}

/// Whether a path carries a `.pdf` extension, ignoring case
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Collect all PDF files from a directory
///
/// # Arguments
/// * `dir` - Directory to scan
/// * `recursive` - Whether to scan subdirectories recursively
///
/// # Returns
/// PDF file paths sorted by path
pub fn collect_pdf_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut pdf_files = Vec::new();

    if recursive {
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if has_pdf_extension(entry.path()) {
                pdf_files.push(entry.path().to_path_buf());
            } else {
                tracing::debug!("Skipping non-PDF file: {}", entry.path().display());
            }
        }
    } else {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if has_pdf_extension(&entry.path()) {
                pdf_files.push(entry.path());
            } else {
                tracing::debug!("Skipping non-PDF file: {}", entry.path().display());
            }
        }
    }

    pdf_files.sort();
    Ok(pdf_files)
}
