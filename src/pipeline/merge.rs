//! Group merge: walk → resolve groups → merge → write `<group>.pdf`

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

use crate::config::MergeConfig;
use crate::core::{merge_group, GroupOutcome, Interrupt};
use crate::pipeline::{display_name, isolate};
use crate::reporting::ProgressObserver;
use crate::scanner::{ensure_root, list_candidate_groups, resolve_group};

/// What a merge run did
#[derive(Debug)]
pub struct MergeSummary {
    pub candidates: usize,
    pub processed: usize,
    pub merged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub interrupted: bool,
    pub output_dir: PathBuf,
    /// Group name and outcome, in processing order
    pub outcomes: Vec<(String, GroupOutcome)>,
}

/// Run the group merge over `config.root`
///
/// Fails only when the root is missing or unreadable. A failing group is
/// logged and the next one is processed; an interrupt stops before the next
/// group.
pub fn run_merge(
    config: &MergeConfig,
    observer: &mut dyn ProgressObserver,
    interrupt: &Interrupt,
) -> Result<MergeSummary> {
    let root = ensure_root(&config.root)?;
    observer.log(Level::INFO, &format!("PDF directory: {}", root.display()));

    let output_dir = root.join(&config.output_dir_name);
    if let Err(e) = prepare_output_dir(&output_dir) {
        observer.log(
            Level::ERROR,
            &format!(
                "Output directory cannot be created: {:#}. Check permissions or move the PDF directory under your user directory",
                e
            ),
        );
    }

    let groups = list_candidate_groups(&root, config)?;
    let total = groups.len();
    observer.log(Level::DEBUG, &format!("Found {} candidate group(s)", total));

    let mut summary = MergeSummary {
        candidates: total,
        processed: 0,
        merged: 0,
        skipped: 0,
        failed: 0,
        interrupted: false,
        output_dir: output_dir.clone(),
        outcomes: Vec::with_capacity(total),
    };

    observer.start("Merging", total);
    for (idx, dir) in groups.iter().enumerate() {
        if interrupt.is_requested() {
            summary.interrupted = true;
            observer.log(Level::INFO, "Interrupted by user");
            break;
        }

        let name = display_name(dir);
        observer.item_started(&name);

        let outcome = match process_group(dir, config, &output_dir) {
            Ok(GroupOutcome::Skipped) => {
                observer.log(
                    Level::INFO,
                    &format!("Skipping directory without PDF files: {}", dir.display()),
                );
                summary.skipped += 1;
                GroupOutcome::Skipped
            }
            Ok(outcome) => {
                summary.merged += 1;
                outcome
            }
            Err(e) => {
                observer.log(Level::WARN, &format!("Failed to merge PDFs: {}", name));
                observer.log(Level::DEBUG, &format!("Failed to merge PDFs in {}: {:?}", name, e));
                summary.failed += 1;
                GroupOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        };

        summary.outcomes.push((name, outcome));
        summary.processed += 1;
        observer.item_finished(idx + 1, total);
    }
    observer.finish(if summary.interrupted {
        "Interrupted"
    } else {
        "Merge complete"
    });

    observer.log(
        Level::INFO,
        &format!(
            "Merge complete: {}/{} ({} merged, {} skipped, {} failed)",
            summary.processed, total, summary.merged, summary.skipped, summary.failed
        ),
    );
    observer.log(
        Level::INFO,
        &format!("Merged files saved in: {}", output_dir.display()),
    );

    Ok(summary)
}

fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        tracing::debug!("Created output directory: {}", output_dir.display());
    }
    Ok(())
}

fn process_group(dir: &Path, config: &MergeConfig, output_dir: &Path) -> Result<GroupOutcome> {
    let group = resolve_group(dir, config)?;
    let outcome = isolate(|| merge_group(&group, output_dir))
        .with_context(|| format!("Failed to merge group {}", group.name))?;
    Ok(outcome)
}
