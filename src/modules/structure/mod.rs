//! Structure analysis.
//!
//! The one module that reads the raw file again: it censuses `%%EOF`
//! generations, reconstructs revision diffs, and inspects the catalog
//! corners where tampering and payloads hide — JavaScript, embedded files,
//! annotations, interactive forms, freed object slots, and the XMP/Info
//! producer pair. Signature trust (see [`signature`]) modulates two of the
//! checks: signed incremental updates are the normal signing pattern, and
//! signing tools legitimately leave more ghost objects behind.

pub mod revisions;
pub mod signature;

use crate::model::{Flag, FlagCode, FlagDetails, ModuleName, ModuleResult, Severity};
use crate::modules::ModuleContext;
use crate::pdf::object::Object;
use crate::pdf::xref::count_eof_markers;
use crate::pdf::PdfFile;
use log::warn;
pub use revisions::modification_history;
use signature::{best_verdict, SignatureStatus, TrustStore};

/// Freed-object thresholds: normal editing vs. post-signature ghosts.
const DELETED_OBJECTS_THRESHOLD: usize = 8;
const DELETED_OBJECTS_THRESHOLD_SIGNED: usize = 20;

/// Annotation subtypes that carry payloads or behavior invoices never need.
const SUSPICIOUS_ANNOTATION_TYPES: &[&str] = &["FileAttachment", "Sound", "Movie", "Screen"];

/// Number of saved generations in the raw bytes.
pub fn count_incremental_updates(bytes: &[u8]) -> usize {
    count_eof_markers(bytes)
}

/// Incremental-update flag, suppressed for trusted signatures.
pub fn check_incremental_updates(bytes: &[u8], signature_trusted: bool) -> Option<Flag> {
    let generations = count_incremental_updates(bytes);
    if generations <= 1 || signature_trusted {
        return None;
    }
    let edit_count = generations - 1;
    let revisions = modification_history(bytes);
    Some(
        Flag::new(
            Severity::High,
            FlagCode::StructIncrementalUpdates,
            format!(
                "The file was saved {} more time{} after production",
                edit_count,
                if edit_count > 1 { "s" } else { "" }
            ),
        )
        .with_details(FlagDetails::RevisionReport {
            eof_count: generations,
            edit_count,
            revisions,
        }),
    )
}

/// JavaScript anywhere in the document.
pub fn check_javascript(file: &PdfFile) -> Option<Flag> {
    let actions = file.javascript_actions();
    if actions.is_empty() {
        return None;
    }
    Some(
        Flag::new(
            Severity::High,
            FlagCode::StructJavascriptDetected,
            format!("The document declares {} JavaScript action(s)", actions.len()),
        )
        .with_details(FlagDetails::CountReport {
            count: actions.len(),
            threshold: 0,
        }),
    )
}

/// Embedded file streams.
pub fn check_embedded_files(file: &PdfFile) -> Option<Flag> {
    let names = file.embedded_file_names();
    if names.is_empty() {
        return None;
    }
    Some(
        Flag::new(
            Severity::High,
            FlagCode::StructEmbeddedFiles,
            format!("The document embeds {} file(s)", names.len()),
        )
        .with_details(FlagDetails::CountReport {
            count: names.len(),
            threshold: 0,
        }),
    )
}

/// Annotations painted fully transparent.
pub fn check_hidden_annotations(file: &PdfFile) -> Option<Flag> {
    let mut hidden = 0usize;
    for page in file.pages().unwrap_or_default() {
        for annot in &page.annotations {
            if let Some(ca) = annot.get("CA").and_then(Object::as_float) {
                if ca == 0.0 {
                    hidden += 1;
                }
            }
        }
    }
    if hidden == 0 {
        return None;
    }
    Some(
        Flag::new(
            Severity::Medium,
            FlagCode::StructHiddenAnnotations,
            format!("{} annotation(s) are drawn with zero opacity", hidden),
        )
        .with_details(FlagDetails::CountReport {
            count: hidden,
            threshold: 0,
        }),
    )
}

/// Annotation subtypes out of place on an invoice.
pub fn check_suspicious_annotations(file: &PdfFile) -> Option<Flag> {
    let mut found = 0usize;
    for page in file.pages().unwrap_or_default() {
        for annot in &page.annotations {
            if let Some(subtype) = annot.get("Subtype").and_then(Object::as_name) {
                if SUSPICIOUS_ANNOTATION_TYPES.contains(&subtype) {
                    found += 1;
                }
            }
        }
    }
    if found == 0 {
        return None;
    }
    Some(
        Flag::new(
            Severity::Medium,
            FlagCode::StructSuspiciousAnnotations,
            format!("{} annotation(s) of payload-carrying subtypes", found),
        )
        .with_details(FlagDetails::CountReport {
            count: found,
            threshold: 0,
        }),
    )
}

/// Interactive form fields.
pub fn check_acroform(file: &PdfFile) -> Option<Flag> {
    let fields = file.acroform_fields();
    if fields.is_empty() {
        return None;
    }
    Some(
        Flag::new(
            Severity::Medium,
            FlagCode::StructAcroformDetected,
            format!("The document carries an interactive form ({} fields)", fields.len()),
        )
        .with_details(FlagDetails::CountReport {
            count: fields.len(),
            threshold: 0,
        }),
    )
}

/// Freed-but-present object census.
pub fn check_deleted_objects(freed_count: usize, signature_trusted: bool) -> Option<Flag> {
    let threshold = if signature_trusted {
        DELETED_OBJECTS_THRESHOLD_SIGNED
    } else {
        DELETED_OBJECTS_THRESHOLD
    };
    if freed_count <= threshold {
        return None;
    }
    Some(
        Flag::new(
            Severity::Medium,
            FlagCode::StructDeletedObjects,
            format!("{} deleted objects remain in the file", freed_count),
        )
        .with_details(FlagDetails::CountReport {
            count: freed_count,
            threshold,
        }),
    )
}

fn normalize_tool(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// XMP toolkit vs. Info producer: a different last writer than the claimed
/// producer means a second tool touched the file.
pub fn check_xmp_editor_mismatch(
    xmp_toolkit: Option<&str>,
    producer: Option<&str>,
) -> Option<Flag> {
    let toolkit = xmp_toolkit?.trim();
    let producer = producer?.trim();
    if toolkit.is_empty() || producer.is_empty() {
        return None;
    }
    let a = normalize_tool(toolkit);
    let b = normalize_tool(producer);
    if a.contains(&b) || b.contains(&a) {
        return None;
    }
    Some(
        Flag::new(
            Severity::Medium,
            FlagCode::StructXmpEditorMismatch,
            format!(
                "XMP metadata was last written by \"{}\" but the producer claims \"{}\"",
                toolkit, producer
            ),
        )
        .with_details(FlagDetails::XmpReport {
            xmp_toolkit: toolkit.to_string(),
            info_producer: producer.to_string(),
        }),
    )
}

fn signature_flag(status: SignatureStatus, signer: Option<String>, sub_filter: Option<String>) -> Flag {
    let (severity, code, message) = match status {
        SignatureStatus::Trusted => (
            Severity::Low,
            FlagCode::StructSignatureTrusted,
            "The document is signed by a recognized authority",
        ),
        SignatureStatus::TrustedExpired => (
            Severity::Medium,
            FlagCode::StructSignatureTrustedExpired,
            "The signing certificate is from a recognized authority but has expired",
        ),
        SignatureStatus::NotTrusted => (
            Severity::Low,
            FlagCode::StructSignatureNotTrusted,
            "The document is signed, but not under a recognized authority",
        ),
        SignatureStatus::Unverifiable => (
            Severity::Medium,
            FlagCode::StructSignatureUnverifiable,
            "The signature payload could not be verified",
        ),
        SignatureStatus::Invalid => (
            Severity::High,
            FlagCode::StructSignatureInvalid,
            "The signature dictionary is malformed",
        ),
    };
    let status_name = format!("{:?}", status);
    Flag::new(severity, code, message).with_details(FlagDetails::SignatureReport {
        status: status_name,
        signer,
        sub_filter,
    })
}

/// Run the structure module.
pub fn analyze(ctx: &ModuleContext) -> ModuleResult {
    let file = match PdfFile::open(&ctx.bundle.file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("structure: cannot reopen document: {}", e);
            return ModuleResult::from_flags(ModuleName::Structure, Vec::new(), 0.3);
        }
    };
    let mut flags = Vec::new();

    let records = file.signature_records();
    let verdict = best_verdict(&records, &ctx.options.trust_store, ctx.services.clock.now());
    let signature_trusted = matches!(
        verdict.as_ref().map(|v| v.status),
        Some(SignatureStatus::Trusted)
    );
    if let Some(v) = verdict {
        flags.push(signature_flag(v.status, v.signer, v.sub_filter));
    }

    if let Some(flag) = check_incremental_updates(file.raw(), signature_trusted) {
        flags.push(flag);
    }
    if let Some(flag) = check_javascript(&file) {
        flags.push(flag);
    }
    if let Some(flag) = check_embedded_files(&file) {
        flags.push(flag);
    }
    if let Some(flag) = check_hidden_annotations(&file) {
        flags.push(flag);
    }
    if let Some(flag) = check_suspicious_annotations(&file) {
        flags.push(flag);
    }
    if let Some(flag) = check_acroform(&file) {
        flags.push(flag);
    }
    if let Some(flag) = check_deleted_objects(file.object_freed_count(), signature_trusted) {
        flags.push(flag);
    }
    let (toolkit, _creator_tool) = file.xmp_toolkit();
    if let Some(flag) =
        check_xmp_editor_mismatch(toolkit.as_deref(), ctx.bundle.metadata.producer.as_deref())
    {
        flags.push(flag);
    }

    ModuleResult::from_flags(ModuleName::Structure, flags, 0.9)
}
