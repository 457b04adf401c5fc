//! Run configuration for the two pipelines
//!
//! Everything a pipeline needs is passed in through one of these values;
//! nothing is read from process-wide state.

use std::path::PathBuf;

/// Configuration for the blur scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Absolute root that is walked recursively and receives the export file
    pub root: PathBuf,
    /// Create the scratch directory for extracted images under `root`
    /// instead of the system temp dir
    pub scratch_in_root: bool,
}

impl ScanConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scratch_in_root: true,
        }
    }
}

/// Configuration for the per-directory merge
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Absolute root whose immediate subdirectories are the groups
    pub root: PathBuf,
    /// Name of the output directory created under `root`
    pub output_dir_name: String,
    /// Files whose name contains this (case-insensitive) are never merged
    pub exclusion_marker: String,
    /// Top-level entries starting with this character are not groups
    pub reserved_prefix: char,
}

impl MergeConfig {
    pub const DEFAULT_OUTPUT_DIR_NAME: &'static str = "exports";
    pub const DEFAULT_EXCLUSION_MARKER: &'static str = "binder";
    pub const RESERVED_PREFIX: char = '.';

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dir_name: Self::DEFAULT_OUTPUT_DIR_NAME.to_string(),
            exclusion_marker: Self::DEFAULT_EXCLUSION_MARKER.to_string(),
            reserved_prefix: Self::RESERVED_PREFIX,
        }
    }

    pub fn with_exclusion_marker(mut self, marker: impl Into<String>) -> Self {
        self.exclusion_marker = marker.into();
        self
    }

    pub fn with_output_dir_name(mut self, name: impl Into<String>) -> Self {
        self.output_dir_name = name.into();
        self
    }

    /// Directory that receives `<group>.pdf` files
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output_dir_name)
    }

    /// Whether a top-level entry name is reserved and never treated as a group
    pub fn is_reserved_name(&self, name: &str) -> bool {
        name.starts_with(self.reserved_prefix) || name == self.output_dir_name
    }

    /// Whether a file name carries the exclusion marker
    pub fn is_excluded_file(&self, file_name: &str) -> bool {
        if self.exclusion_marker.is_empty() {
            return false;
        }
        file_name
            .to_lowercase()
            .contains(&self.exclusion_marker.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_config_defaults() {
        let config = MergeConfig::new("/data/pdfs");
        assert_eq!(config.output_dir(), PathBuf::from("/data/pdfs/exports"));
        assert_eq!(config.exclusion_marker, "binder");
    }

    #[test]
    fn test_reserved_names() {
        let config = MergeConfig::new("/data");
        assert!(config.is_reserved_name(".git"));
        assert!(config.is_reserved_name("exports"));
        assert!(!config.is_reserved_name("Exports-2021"));
        assert!(!config.is_reserved_name("A"));
    }

    #[test]
    fn test_exclusion_marker_is_case_insensitive() {
        let config = MergeConfig::new("/data");
        assert!(config.is_excluded_file("Binder.pdf"));
        assert!(config.is_excluded_file("00-BINDER-cover.PDF"));
        assert!(!config.is_excluded_file("1.pdf"));

        let custom = MergeConfig::new("/data").with_exclusion_marker("Cover");
        assert!(custom.is_excluded_file("front-cover.pdf"));
        assert!(!custom.is_excluded_file("binder.pdf"));
    }

    #[test]
    fn test_empty_marker_excludes_nothing() {
        let config = MergeConfig::new("/data").with_exclusion_marker("");
        assert!(!config.is_excluded_file("binder.pdf"));
    }
}
