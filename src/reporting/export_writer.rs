//! Scan result export

use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::scanner::file_scanner::ScoreRecord;

/// Prefix of every generated export file name
pub const EXPORT_PREFIX: &str = "export_";
/// Extension of generated export files
pub const EXPORT_SUFFIX: &str = ".csv";

/// One export row: the file path and its score, empty when absent
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    path: Cow<'a, str>,
    score: Option<f64>,
}

impl<'a> From<&'a ScoreRecord> for ExportRow<'a> {
    fn from(record: &'a ScoreRecord) -> Self {
        Self {
            path: record.path.to_string_lossy(),
            score: record.score(),
        }
    }
}

/// Write scan results to a newly created, uniquely named file in `dir`
///
/// # Arguments
/// * `dir` - Directory that receives the export file
/// * `records` - Scan results, written in order
///
/// # Returns
/// Path of the export file
pub fn write_export(dir: &Path, records: &[ScoreRecord]) -> Result<PathBuf> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(EXPORT_PREFIX).suffix(EXPORT_SUFFIX);
    // Same mode as any other file the user creates; the umask still applies
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }

    let mut file = builder
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create export file in {}", dir.display()))?;

    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(file.as_file_mut());

        for record in records {
            writer
                .serialize(ExportRow::from(record))
                .with_context(|| format!("Failed to write row for {}", record.path.display()))?;
        }
        writer.flush().context("Failed to flush export file")?;
    }

    let (_, path) = file.keep().context("Failed to keep export file")?;
    Ok(path)
}
