//! PDF concatenation
//!
//! The first document is the base. Every following document is renumbered
//! above the base's highest object id, its objects are moved in, and its
//! pages are appended to the base's root page tree node.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ItemError;
use crate::scanner::DocumentGroup;

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Result of merging a single group
#[derive(Debug, PartialEq)]
pub enum GroupOutcome {
    Merged { output: PathBuf, pages: usize, bytes: u64 },
    Skipped,
    Failed { reason: String },
}

/// Merge a group's members and write `<output_dir>/<group>.pdf`
pub fn merge_group(group: &DocumentGroup, output_dir: &Path) -> Result<GroupOutcome, ItemError> {
    if group.is_empty() {
        return Ok(GroupOutcome::Skipped);
    }

    let target = group.output_path(output_dir);
    tracing::debug!(
        "Merging {} PDF(s): {} -> {}",
        group.members.len(),
        group.dir.display(),
        target.display()
    );

    let mut merged = merge_documents(&group.members)?;
    let pages = merged.get_pages().len();
    let bytes = write_document(&mut merged, &target)?;

    tracing::debug!("Merged PDF written: {} ({} pages)", target.display(), pages);
    Ok(GroupOutcome::Merged {
        output: target,
        pages,
        bytes,
    })
}

/// Load `paths` in order and concatenate their pages
pub fn merge_documents(paths: &[PathBuf]) -> Result<Document, ItemError> {
    let (first, rest) = paths.split_first().ok_or(ItemError::NoFilesToMerge)?;

    let mut merged = Document::load(first)?;
    let root_pages = root_pages_id(&merged)?;
    if let Some(&(highest, _)) = merged.objects.keys().next_back() {
        merged.max_id = merged.max_id.max(highest);
    }

    for path in rest {
        let mut doc = Document::load(path)?;

        doc.renumber_objects_with(merged.max_id + 1);
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &page_ids {
            materialize_inherited(&mut doc, page_id)?;
        }
        let outline = top_level_outline(&doc);

        merged.max_id = doc.max_id;
        merged.objects.extend(doc.objects);
        append_pages(&mut merged, root_pages, &page_ids)?;
        if let Some(outline) = outline {
            append_outline(&mut merged, outline)?;
        }
    }

    merged.prune_objects();
    merged.renumber_objects();
    merged.compress();

    Ok(merged)
}

/// Remove any existing file at `target`, then write `doc` there
///
/// Returns the number of bytes written.
pub fn write_document(doc: &mut Document, target: &Path) -> Result<u64, ItemError> {
    if target.exists() {
        fs::remove_file(target)?;
    }

    let file = File::create(target)?;
    let mut writer = BufWriter::new(file);
    doc.save_to(&mut writer)?;
    writer.flush()?;

    Ok(fs::metadata(target)?.len())
}

fn root_pages_id(doc: &Document) -> Result<ObjectId, ItemError> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| ItemError::page_tree(format!("missing root Pages reference: {e}")))
}

/// Copy inheritable attributes from a page's ancestors onto the page itself
///
/// Pages are reparented to another tree, so values they used to inherit
/// must travel with them.
fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), ItemError> {
    let page = doc.get_dictionary(page_id)?;
    let mut missing: Vec<&[u8]> = INHERITABLE_PAGE_KEYS
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let mut inherited: Vec<(Vec<u8>, Object)> = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(node_id) = parent {
        if missing.is_empty() || depth >= 64 {
            break;
        }
        let node = doc.get_dictionary(node_id)?;
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                inherited.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    Ok(())
}

/// Append pages to the root `Kids` array, pointing their `Parent` at the root
fn append_pages(merged: &mut Document, root_pages: ObjectId, page_ids: &[ObjectId]) -> Result<(), ItemError> {
    for &page_id in page_ids {
        merged
            .get_dictionary_mut(page_id)?
            .set("Parent", Object::Reference(root_pages));
    }

    let root: &mut Dictionary = merged.get_dictionary_mut(root_pages)?;
    let kids = root
        .get_mut(b"Kids")
        .map_err(|_| ItemError::page_tree("Pages dictionary missing Kids array"))?;
    match kids {
        Object::Array(kids) => kids.extend(page_ids.iter().map(|&id| Object::Reference(id))),
        _ => return Err(ItemError::page_tree("Kids is not an array")),
    }

    let count = root.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    root.set("Count", Object::Integer(count + page_ids.len() as i64));
    Ok(())
}

/// Top-level bookmarks of a document, as linked in its outline dictionary
#[derive(Debug)]
struct OutlineChain {
    items: Vec<ObjectId>,
    open_count: i64,
}

fn top_level_outline(doc: &Document) -> Option<OutlineChain> {
    let outlines = doc
        .catalog()
        .and_then(|catalog| catalog.get(b"Outlines"))
        .and_then(Object::as_reference)
        .ok()?;
    let root = doc.get_dictionary(outlines).ok()?;

    let mut items = Vec::new();
    let mut next = root.get(b"First").and_then(Object::as_reference).ok();
    while let Some(id) = next {
        // A Next cycle would otherwise never end
        if items.contains(&id) || items.len() >= 10_000 {
            break;
        }
        let Ok(item) = doc.get_dictionary(id) else {
            break;
        };
        items.push(id);
        next = item.get(b"Next").and_then(Object::as_reference).ok();
    }
    if items.is_empty() {
        return None;
    }

    let open_count = root.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    Some(OutlineChain { items, open_count })
}

/// Link bookmarks of an appended document after the merged document's own
fn append_outline(merged: &mut Document, chain: OutlineChain) -> Result<(), ItemError> {
    let (Some(&first), Some(&last)) = (chain.items.first(), chain.items.last()) else {
        return Ok(());
    };

    let existing = merged
        .catalog()?
        .get(b"Outlines")
        .and_then(Object::as_reference)
        .ok()
        .filter(|id| merged.get_dictionary(*id).is_ok());
    let root_id = match existing {
        Some(id) => id,
        None => {
            let id = merged.add_object(dictionary! { "Type" => "Outlines" });
            merged.catalog_mut()?.set("Outlines", id);
            id
        }
    };

    for &item in &chain.items {
        merged.get_dictionary_mut(item)?.set("Parent", root_id);
    }

    let root = merged.get_dictionary(root_id)?;
    let previous_last = root
        .get(b"Last")
        .and_then(Object::as_reference)
        .ok()
        .filter(|id| *id != first && merged.get_dictionary(*id).is_ok());
    let count = root.get(b"Count").and_then(Object::as_i64).unwrap_or(0).max(0);
    let added = if chain.open_count > 0 {
        chain.open_count
    } else {
        chain.items.len() as i64
    };

    match previous_last {
        Some(previous) => {
            merged.get_dictionary_mut(previous)?.set("Next", first);
            merged.get_dictionary_mut(first)?.set("Prev", previous);
        }
        None => merged.get_dictionary_mut(root_id)?.set("First", first),
    }

    let root = merged.get_dictionary_mut(root_id)?;
    root.set("Last", last);
    root.set("Count", count + added);
    Ok(())
}
