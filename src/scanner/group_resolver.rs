//! Group discovery for the merge pipeline
//!
//! Every immediate subdirectory of the root is a document group. Its PDFs
//! (minus excluded names) are merged in file name order.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MergeConfig;
use crate::scanner::file_scanner::has_pdf_extension;

/// A directory whose PDFs become one merged document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentGroup {
    pub name: String,
    pub dir: PathBuf,
    pub members: Vec<PathBuf>,
}

impl DocumentGroup {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Target file for this group inside `output_dir`
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.pdf", self.name))
    }
}

/// List the top-level directories of `root` that are merge groups
///
/// Entries starting with the reserved prefix, the output directory and
/// plain files are skipped.
pub fn list_candidate_groups(root: &Path, config: &MergeConfig) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("Failed to read directory: {}", root.display()))?;

    let mut groups = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();

        if config.is_reserved_name(&name) {
            tracing::debug!("Ignoring reserved directory: {}", name);
            continue;
        }
        if !entry.file_type()?.is_dir() {
            tracing::debug!("Ignoring top-level file: {}", name);
            continue;
        }
        groups.push(entry.path());
    }

    groups.sort();
    Ok(groups)
}

/// Resolve the ordered member list of one group directory
pub fn resolve_group(dir: &Path, config: &MergeConfig) -> Result<DocumentGroup> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Group directory has no name: {}", dir.display()))?;

    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read group directory: {}", dir.display()))?;

    let mut members: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();

        if !has_pdf_extension(&path) {
            tracing::debug!("Ignoring non-PDF file: {}", file_name);
            continue;
        }
        if config.is_excluded_file(&file_name) {
            tracing::debug!("Ignoring excluded file: {}", file_name);
            continue;
        }
        members.push((file_name, path));
    }

    members.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(DocumentGroup {
        name,
        dir: dir.to_path_buf(),
        members: members.into_iter().map(|(_, path)| path).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    fn member_names(group: &DocumentGroup) -> Vec<String> {
        group
            .members
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_list_candidate_groups_skips_reserved_entries() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for dir in ["B", "A", ".hidden", "exports"] {
            fs::create_dir(root.join(dir)).unwrap();
        }
        touch(root, "loose.pdf");

        let config = MergeConfig::new(root);
        let groups = list_candidate_groups(root, &config).unwrap();

        assert_eq!(groups, vec![root.join("A"), root.join("B")]);
    }

    #[test]
    fn test_list_candidate_groups_honors_custom_output_name() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("exports")).unwrap();
        fs::create_dir(root.join("merged")).unwrap();

        let config = MergeConfig::new(root).with_output_dir_name("merged");
        let groups = list_candidate_groups(root, &config).unwrap();

        assert_eq!(groups, vec![root.join("exports")]);
    }

    #[test]
    fn test_resolve_group_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("A");
        fs::create_dir(&dir).unwrap();
        for name in ["2.pdf", "10.pdf", "1.PDF", "Binder.pdf", "notes.txt"] {
            touch(&dir, name);
        }
        fs::create_dir(dir.join("nested.pdf")).unwrap();

        let config = MergeConfig::new(temp_dir.path());
        let group = resolve_group(&dir, &config).unwrap();

        assert_eq!(group.name, "A");
        assert_eq!(member_names(&group), vec!["1.PDF", "10.pdf", "2.pdf"]);
    }

    #[test]
    fn test_resolve_group_without_pdfs_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("C");
        fs::create_dir(&dir).unwrap();
        touch(&dir, "binder.pdf");
        touch(&dir, "readme.md");

        let config = MergeConfig::new(temp_dir.path());
        let group = resolve_group(&dir, &config).unwrap();

        assert!(group.is_empty());
    }

    #[test]
    fn test_output_path() {
        let group = DocumentGroup {
            name: "2021024236-302#1".to_string(),
            dir: PathBuf::from("/root/2021024236-302#1"),
            members: vec![],
        };
        assert_eq!(
            group.output_path(Path::new("/root/exports")),
            PathBuf::from("/root/exports/2021024236-302#1.pdf")
        );
    }
}
