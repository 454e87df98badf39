//! Font analysis.
//!
//! Builds a canonical family graph from base-font names (subset prefixes
//! and style suffixes stripped, aliases applied) and looks for the editing
//! patterns fonts betray: too many families, system fonts standing in for
//! brand fonts, non-embedded fonts, the same family both subset and not,
//! and — strongest of all — family switches in the middle of a line.

use crate::bundle::FontRecord;
use crate::model::{Flag, FlagCode, FlagDetails, ModuleName, ModuleResult, Severity};
use crate::modules::ModuleContext;
use crate::pdf::text::PlacedSpan;
use std::collections::{BTreeMap, BTreeSet};

/// Family-count thresholds. Deliberately high: legitimate invoices carry
/// many families (brand + table + legal footer).
const EXCESSIVE_FAMILIES: usize = 10;
const HIGH_FAMILIES: usize = 7;

/// Substrings of common desktop system fonts.
const SYSTEM_FONTS: &[&str] = &[
    "arial",
    "calibri",
    "times new roman",
    "courier new",
    "verdana",
    "tahoma",
    "segoe",
    "cambria",
    "georgia",
    "comic sans",
];

/// Substrings of fonts found in professionally produced documents.
const PROFESSIONAL_FONTS: &[&str] = &[
    "helvetica neue",
    "futura",
    "garamond",
    "frutiger",
    "univers",
    "gotham",
    "avenir",
    "myriad",
    "minion",
];

/// The base-14 families a viewer always supplies; never expected embedded.
const STANDARD_FONTS: &[&str] = &["helvetica", "courier", "times", "symbol", "zapfdingbats"];

/// Aliases mapping PostScript names to their marketing family.
fn alias(base: &str) -> &str {
    match base {
        "arialmt" | "arial" => "arial",
        "arialnarrow" => "arial",
        "timesnewromanpsmt" | "timesnewromanps" | "timesnewroman" => "times new roman",
        "couriernewpsmt" | "couriernewps" | "couriernew" => "courier new",
        "helveticaneue" => "helvetica neue",
        "segoeui" => "segoe",
        other => other,
    }
}

/// Canonical family for a base-font name. `None` for generic CID
/// pseudo-fonts, which carry no family information.
pub fn extract_base_font_name(name: &str) -> Option<String> {
    let stripped = if crate::bundle::is_subset_name(name) {
        &name[7..]
    } else {
        name
    };
    let token = stripped
        .split(|c| c == '-' || c == ',')
        .next()
        .unwrap_or(stripped);
    let lowered = token.trim().to_lowercase();
    if lowered.is_empty() || lowered.starts_with("cidfont") {
        return None;
    }
    Some(alias(&lowered).to_string())
}

/// Distinct canonical families present in the records.
pub fn canonical_families(fonts: &[FontRecord]) -> BTreeSet<String> {
    fonts
        .iter()
        .filter_map(|f| extract_base_font_name(&f.name))
        .collect()
}

/// Family-count flags.
pub fn check_font_diversity(fonts: &[FontRecord]) -> Option<Flag> {
    let families = canonical_families(fonts);
    let count = families.len();
    let (severity, code, label) = if count > EXCESSIVE_FAMILIES {
        (
            Severity::High,
            FlagCode::FontsExcessiveDiversity,
            "far more font families than an invoice needs",
        )
    } else if count > HIGH_FAMILIES {
        (
            Severity::Medium,
            FlagCode::FontsHighDiversity,
            "unusually many font families",
        )
    } else {
        return None;
    };
    Some(
        Flag::new(severity, code, format!("{} families: {}", count, label)).with_details(
            FlagDetails::FontReport {
                families: families.into_iter().collect(),
                family_count: count,
            },
        ),
    )
}

/// System fonts without any professional font alongside.
pub fn check_system_fonts(fonts: &[FontRecord]) -> Option<Flag> {
    let families = canonical_families(fonts);
    let has_system = families
        .iter()
        .any(|f| SYSTEM_FONTS.iter().any(|s| f.contains(s)));
    let has_professional = families
        .iter()
        .any(|f| PROFESSIONAL_FONTS.iter().any(|p| f.contains(p)));
    if has_system && !has_professional {
        let offenders: Vec<String> = families
            .iter()
            .filter(|f| SYSTEM_FONTS.iter().any(|s| f.contains(s)))
            .cloned()
            .collect();
        let count = offenders.len();
        return Some(
            Flag::new(
                Severity::Low,
                FlagCode::FontsSystemFonts,
                "Only desktop system fonts are used",
            )
            .with_details(FlagDetails::FontReport {
                families: offenders,
                family_count: count,
            }),
        );
    }
    None
}

/// Non-standard fonts reported as not embedded.
pub fn check_font_embedding(fonts: &[FontRecord]) -> Option<Flag> {
    let missing: Vec<String> = fonts
        .iter()
        .filter(|f| !f.is_embedded)
        .filter_map(|f| extract_base_font_name(&f.name))
        .filter(|family| !STANDARD_FONTS.iter().any(|s| family.starts_with(s)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if missing.is_empty() {
        return None;
    }
    let count = missing.len();
    Some(
        Flag::new(
            Severity::Low,
            FlagCode::FontsNotEmbedded,
            format!("{} non-standard fonts are not embedded", count),
        )
        .with_details(FlagDetails::FontReport {
            families: missing,
            family_count: count,
        }),
    )
}

/// The same base family present both as subset and non-subset — the trace
/// of a second tool touching the file.
pub fn check_mixed_subset_fonts(fonts: &[FontRecord]) -> Option<Flag> {
    let mut subset: BTreeSet<String> = BTreeSet::new();
    let mut plain: BTreeSet<String> = BTreeSet::new();
    for font in fonts {
        if let Some(family) = extract_base_font_name(&font.name) {
            if font.is_subset {
                subset.insert(family);
            } else {
                plain.insert(family);
            }
        }
    }
    let mixed: Vec<String> = subset.intersection(&plain).cloned().collect();
    if mixed.is_empty() {
        return None;
    }
    let count = mixed.len();
    Some(
        Flag::new(
            Severity::Low,
            FlagCode::FontsMixedSubsets,
            format!("{} families appear both subset and non-subset", count),
        )
        .with_details(FlagDetails::FontReport {
            families: mixed,
            family_count: count,
        }),
    )
}

/// A line of text whose spans use more than one canonical family.
#[derive(Debug, Clone)]
pub struct SuspiciousLine {
    /// Zero-based page
    pub page: usize,
    /// Concatenated line text (trimmed)
    pub text: String,
    /// Families seen on the line
    pub families: Vec<String>,
}

/// Detect mid-line family switches: group spans by baseline per page and
/// compare canonical families inside each line.
pub fn find_midline_changes(spans_by_page: &[Vec<PlacedSpan>]) -> Vec<SuspiciousLine> {
    let mut suspicious = Vec::new();
    for (page, spans) in spans_by_page.iter().enumerate() {
        // bucket by baseline, half-point resolution
        let mut lines: BTreeMap<i64, Vec<&PlacedSpan>> = BTreeMap::new();
        for span in spans {
            if span.text.trim().is_empty() {
                continue;
            }
            let key = (span.y * 2.0).round() as i64;
            lines.entry(key).or_default().push(span);
        }
        for bucket in lines.values() {
            if bucket.len() < 2 {
                continue;
            }
            let families: BTreeSet<String> = bucket
                .iter()
                .filter_map(|s| extract_base_font_name(&s.font))
                .collect();
            if families.len() > 1 {
                let mut ordered: Vec<&PlacedSpan> = bucket.clone();
                ordered.sort_by(|a, b| {
                    a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
                });
                let text = ordered
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                suspicious.push(SuspiciousLine {
                    page,
                    text: text.trim().to_string(),
                    families: families.into_iter().collect(),
                });
            }
        }
    }
    suspicious
}

/// Summarize mid-line switches into one flag.
pub fn check_midline_changes(spans_by_page: &[Vec<PlacedSpan>]) -> Option<Flag> {
    let lines = find_midline_changes(spans_by_page);
    if lines.is_empty() {
        return None;
    }
    let severity = if lines.len() <= 2 {
        Severity::Medium
    } else {
        Severity::High
    };
    let samples: Vec<String> = lines
        .iter()
        .take(5)
        .map(|l| format!("p{}: {}", l.page + 1, l.text))
        .collect();
    Some(
        Flag::new(
            severity,
            FlagCode::FontsMidlineChange,
            format!("{} lines switch font family mid-line", lines.len()),
        )
        .with_details(FlagDetails::MidlineReport {
            sample_lines: samples,
            affected_lines: lines.len(),
        }),
    )
}

/// Run the fonts module.
pub fn analyze(ctx: &ModuleContext) -> ModuleResult {
    let fonts = &ctx.bundle.fonts;
    let mut flags = Vec::new();
    if let Some(flag) = check_font_diversity(fonts) {
        flags.push(flag);
    }
    if let Some(flag) = check_system_fonts(fonts) {
        flags.push(flag);
    }
    if let Some(flag) = check_font_embedding(fonts) {
        flags.push(flag);
    }
    if let Some(flag) = check_mixed_subset_fonts(fonts) {
        flags.push(flag);
    }
    if let Some(flag) = check_midline_changes(&ctx.bundle.spans_by_page) {
        flags.push(flag);
    }
    let confidence = if fonts.len() >= 3 {
        0.9
    } else if !fonts.is_empty() {
        0.7
    } else {
        0.3
    };
    ModuleResult::from_flags(ModuleName::Fonts, flags, confidence)
}
