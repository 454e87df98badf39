//! Revision reconstruction.
//!
//! Every `%%EOF` marker ends one saved generation of the file. Re-parsing
//! the document at each generation boundary yields the document as it
//! existed then; diffing consecutive generations shows what an edit
//! actually changed — per-page line diffs for the UI, and the kinds of
//! objects rewritten (font, annotation, content stream…) for triage.

use crate::model::RevisionSummary;
use crate::pdf::object::Object;
use crate::pdf::xref::generation_boundaries;
use crate::pdf::PdfFile;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Upper bound on revisions we reconstruct; beyond this the edit count
/// alone is evidence enough.
const MAX_RECONSTRUCTED_REVISIONS: usize = 6;
/// Per-page cap on reported diff lines.
const MAX_DIFF_LINES: usize = 5;

fn page_texts(file: &PdfFile) -> Vec<String> {
    match file.pages() {
        Ok(pages) => pages
            .iter()
            .map(|p| crate::pdf::text::assemble_text(&file.page_run(p).spans))
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn classify_object(obj: &Object) -> &'static str {
    let dict = match obj.as_dict() {
        Some(d) => d,
        None => return "other",
    };
    if let Some(ty) = dict.get("Type").and_then(Object::as_name) {
        return match ty {
            "Font" => "font",
            "FontDescriptor" => "font",
            "Page" => "page",
            "Pages" => "page-tree",
            "Catalog" => "catalog",
            "Annot" => "annotation",
            "XObject" => "xobject",
            "Metadata" => "metadata",
            "XRef" => "xref",
            "Sig" => "signature",
            _ => "other",
        };
    }
    if dict.get("Subtype").and_then(Object::as_name) == Some("Image") {
        return "image";
    }
    if matches!(obj, Object::Stream { .. }) {
        return "content-stream";
    }
    "other"
}

fn line_diff(old: &str, new: &str) -> (Vec<String>, Vec<String>) {
    let old_lines: BTreeSet<&str> = old.lines().filter(|l| !l.trim().is_empty()).collect();
    let new_lines: BTreeSet<&str> = new.lines().filter(|l| !l.trim().is_empty()).collect();
    let added = new_lines
        .difference(&old_lines)
        .take(MAX_DIFF_LINES)
        .map(|l| l.to_string())
        .collect();
    let removed = old_lines
        .difference(&new_lines)
        .take(MAX_DIFF_LINES)
        .map(|l| l.to_string())
        .collect();
    (added, removed)
}

/// Object numbers whose definition changed between two generations, with
/// the kind of the new definition.
fn changed_kinds(older: &PdfFile, newer: &PdfFile) -> Vec<String> {
    let mut kinds = BTreeSet::new();
    let old_entries: BTreeMap<u32, _> = older.xref().entries.clone();
    for (num, entry) in newer.xref().entries.iter() {
        let changed = match old_entries.get(num) {
            Some(old_entry) => old_entry != entry,
            None => true,
        };
        if !changed {
            continue;
        }
        if let Ok(obj) = newer.get(*num) {
            kinds.insert(classify_object(&obj).to_string());
        }
        if kinds.len() >= 8 {
            break;
        }
    }
    kinds.into_iter().collect()
}

/// Reconstruct the modification history of a file.
///
/// Returns one summary per incremental revision (none for a single-save
/// file). Generations that fail to re-parse are skipped with a debug log —
/// a truncated prefix is common when the first save used a linearized
/// writer.
pub fn modification_history(bytes: &[u8]) -> Vec<RevisionSummary> {
    let boundaries = generation_boundaries(bytes);
    if boundaries.len() < 2 {
        return Vec::new();
    }
    let reconstruct = boundaries.len().min(MAX_RECONSTRUCTED_REVISIONS + 1);
    let start = boundaries.len() - reconstruct;
    let mut parsed: Vec<(usize, PdfFile)> = Vec::new();
    for (index, boundary) in boundaries.iter().enumerate().skip(start) {
        match PdfFile::parse_prefix(bytes, *boundary) {
            Ok(file) => parsed.push((index, file)),
            Err(e) => debug!("generation {} unparseable: {}", index + 1, e),
        }
    }

    let mut out = Vec::new();
    for pair in parsed.windows(2) {
        let (_, older) = &pair[0];
        let (new_index, newer) = &pair[1];
        let old_texts = page_texts(older);
        let new_texts = page_texts(newer);
        let mut pages_touched = Vec::new();
        let mut added_lines = Vec::new();
        let mut removed_lines = Vec::new();
        let page_span = old_texts.len().max(new_texts.len());
        for page in 0..page_span {
            let old = old_texts.get(page).map(String::as_str).unwrap_or("");
            let new = new_texts.get(page).map(String::as_str).unwrap_or("");
            if old == new {
                continue;
            }
            pages_touched.push(page);
            let (mut added, mut removed) = line_diff(old, new);
            added_lines.append(&mut added);
            removed_lines.append(&mut removed);
        }
        added_lines.truncate(MAX_DIFF_LINES);
        removed_lines.truncate(MAX_DIFF_LINES);
        out.push(RevisionSummary {
            revision: new_index + 1,
            pages_touched,
            added_lines,
            removed_lines,
            changed_kinds: changed_kinds(older, newer),
        });
    }
    out
}
