//! Metadata analysis.
//!
//! Classifies the producer/creator software against tiered vocabularies and
//! checks the date relations the container itself encodes. Date checks here
//! are limited to the metadata; textual dates belong to the content module.

use crate::bundle::{to_utc, DocumentMetadata};
use crate::model::{Flag, FlagCode, FlagDetails, ModuleName, ModuleResult, Severity};
use crate::modules::ModuleContext;
use crate::summary::format_delta;
use chrono::Duration;

/// AI generators: a document produced by one cannot be an authentic invoice.
pub const AI_PRODUCERS: &[&str] = &[
    "chatgpt",
    "openai",
    "claude",
    "anthropic",
    "gemini",
    "copilot",
    "midjourney",
    "dall-e",
    "ai generated",
    "generative ai",
];

/// Aggressive online converters, the usual laundering step after an edit.
pub const HIGH_RISK_PRODUCERS: &[&str] = &[
    "ilovepdf",
    "smallpdf",
    "sejda",
    "pdfescape",
    "dochub",
    "pdffiller",
    "soda pdf",
    "pdf candy",
    "online2pdf",
    "camscanner",
];

/// Editors that are legitimate tools but rarely produce invoices.
pub const MODERATE_PRODUCERS: &[&str] = &[
    "photoshop",
    "illustrator",
    "gimp",
    "inkscape",
    "canva",
    "wondershare",
    "pdfelement",
    "pdf24",
];

/// Modification windows: a re-save within this margin of creation is normal.
const MODIFICATION_TOLERANCE_SECONDS: i64 = 2;

/// Classify producer/creator strings. First match wins in priority order
/// AI > high > moderate; at most one flag is emitted.
pub fn check_producer(metadata: &DocumentMetadata) -> Option<Flag> {
    let haystack = format!(
        "{} {}",
        metadata.producer.as_deref().unwrap_or(""),
        metadata.creator.as_deref().unwrap_or("")
    )
    .to_lowercase();
    if haystack.trim().is_empty() {
        return None;
    }
    let tiers: [(&[&str], Severity, FlagCode, &str); 3] = [
        (
            AI_PRODUCERS,
            Severity::Critical,
            FlagCode::MetaAiGenerated,
            "Document was generated by an AI tool",
        ),
        (
            HIGH_RISK_PRODUCERS,
            Severity::High,
            FlagCode::MetaSuspiciousProducer,
            "Document was processed by an online conversion service",
        ),
        (
            MODERATE_PRODUCERS,
            Severity::Medium,
            FlagCode::MetaOnlineConverter,
            "Document was produced by an editing tool unusual for invoices",
        ),
    ];
    for (vocabulary, severity, code, message) in tiers {
        if let Some(term) = vocabulary.iter().find(|t| haystack.contains(*t)) {
            return Some(
                Flag::new(severity, code, format!("{} ({})", message, term)).with_details(
                    FlagDetails::ProducerMatch {
                        matched_term: (*term).to_string(),
                        producer: metadata.producer.clone(),
                        creator: metadata.creator.clone(),
                    },
                ),
            );
        }
    }
    None
}

/// Date relations encoded in the metadata itself.
pub fn check_dates(metadata: &DocumentMetadata, now: chrono::DateTime<chrono::Utc>) -> Vec<Flag> {
    let mut flags = Vec::new();
    if let Some(created) = &metadata.creation_date {
        if to_utc(created) > now + Duration::days(1) {
            flags.push(Flag::new(
                Severity::Critical,
                FlagCode::MetaFutureCreationDate,
                format!(
                    "Creation date {} lies in the future",
                    created.format("%Y-%m-%d %H:%M:%S")
                ),
            ));
        }
    }
    if let (Some(created), Some(modified)) = (&metadata.creation_date, &metadata.mod_date) {
        let created = to_utc(created);
        let modified = to_utc(modified);
        if modified < created {
            flags.push(Flag::new(
                Severity::High,
                FlagCode::MetaImpossibleDates,
                "Modification date precedes creation date",
            ));
        } else {
            let delta = (modified - created).num_seconds();
            if delta > MODIFICATION_TOLERANCE_SECONDS {
                flags.push(
                    Flag::new(
                        Severity::Critical,
                        FlagCode::MetaDocumentModified,
                        format!(
                            "Document was modified {} after its creation",
                            format_delta(delta)
                        ),
                    )
                    .with_details(FlagDetails::DateDelta {
                        delta_seconds: delta,
                        display: format_delta(delta),
                    }),
                );
            }
        }
    }
    flags
}

/// Missing-metadata checks.
pub fn check_missing_metadata(metadata: &DocumentMetadata) -> Option<Flag> {
    if metadata.is_empty() {
        return Some(Flag::new(
            Severity::Medium,
            FlagCode::MetaNoMetadata,
            "All metadata is absent, possibly stripped",
        ));
    }
    let producer_absent = metadata.producer.as_deref().map(str::trim).unwrap_or("").is_empty();
    let creator_absent = metadata.creator.as_deref().map(str::trim).unwrap_or("").is_empty();
    if producer_absent && creator_absent {
        return Some(Flag::new(
            Severity::Low,
            FlagCode::MetaNoProducer,
            "No producer or creator software recorded",
        ));
    }
    None
}

/// Run the metadata module.
pub fn analyze(ctx: &ModuleContext) -> ModuleResult {
    let metadata = &ctx.bundle.metadata;
    let mut flags = Vec::new();
    if let Some(flag) = check_producer(metadata) {
        flags.push(flag);
    }
    flags.extend(check_dates(metadata, ctx.services.clock.now()));
    if let Some(flag) = check_missing_metadata(metadata) {
        flags.push(flag);
    }
    let confidence = if metadata.is_empty() { 0.6 } else { 0.9 };
    ModuleResult::from_flags(ModuleName::Metadata, flags, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn meta(producer: Option<&str>, creator: Option<&str>) -> DocumentMetadata {
        DocumentMetadata {
            producer: producer.map(str::to_string),
            creator: creator.map(str::to_string),
            ..Default::default()
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> chrono::DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .unwrap()
    }

    #[test]
    fn ai_beats_converter() {
        let m = meta(Some("iLovePDF via ChatGPT"), None);
        let flag = check_producer(&m).unwrap();
        assert_eq!(flag.code, FlagCode::MetaAiGenerated);
        assert_eq!(flag.severity, Severity::Critical);
    }

    #[test]
    fn converter_tiers() {
        let high = check_producer(&meta(Some("Smallpdf.com"), None)).unwrap();
        assert_eq!(high.code, FlagCode::MetaSuspiciousProducer);
        let medium = check_producer(&meta(None, Some("Adobe Photoshop 2024"))).unwrap();
        assert_eq!(medium.code, FlagCode::MetaOnlineConverter);
        assert!(check_producer(&meta(Some("Microsoft Word"), None)).is_none());
    }

    #[test]
    fn only_one_producer_flag() {
        let m = meta(Some("ilovepdf"), Some("photoshop"));
        let flag = check_producer(&m).unwrap();
        assert_eq!(flag.code, FlagCode::MetaSuspiciousProducer);
    }

    #[test]
    fn modified_after_creation() {
        let m = DocumentMetadata {
            creation_date: Some(at(2024, 1, 15, 10, 0, 0)),
            mod_date: Some(at(2024, 1, 20, 10, 0, 0)),
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let flags = check_dates(&m, now);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].code, FlagCode::MetaDocumentModified);
        assert_eq!(flags[0].severity, Severity::Critical);
    }

    #[test]
    fn small_resave_window_tolerated() {
        let m = DocumentMetadata {
            creation_date: Some(at(2024, 1, 15, 10, 0, 0)),
            mod_date: Some(at(2024, 1, 15, 10, 0, 2)),
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(check_dates(&m, now).is_empty());
    }

    #[test]
    fn impossible_and_future_dates() {
        let m = DocumentMetadata {
            creation_date: Some(at(2024, 1, 15, 10, 0, 0)),
            mod_date: Some(at(2024, 1, 10, 10, 0, 0)),
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let flags = check_dates(&m, now);
        assert_eq!(flags[0].code, FlagCode::MetaImpossibleDates);

        let future = DocumentMetadata {
            creation_date: Some(at(2030, 1, 1, 0, 0, 0)),
            ..Default::default()
        };
        let flags = check_dates(&future, now);
        assert_eq!(flags[0].code, FlagCode::MetaFutureCreationDate);
        assert_eq!(flags[0].severity, Severity::Critical);
    }

    #[test]
    fn missing_metadata_flags() {
        let empty = DocumentMetadata::default();
        assert_eq!(
            check_missing_metadata(&empty).unwrap().code,
            FlagCode::MetaNoMetadata
        );
        let titled = DocumentMetadata {
            title: Some("Facture".into()),
            ..Default::default()
        };
        assert_eq!(
            check_missing_metadata(&titled).unwrap().code,
            FlagCode::MetaNoProducer
        );
        let with_producer = meta(Some("Word"), None);
        assert!(check_missing_metadata(&with_producer).is_none());
    }
}
