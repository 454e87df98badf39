//! Invoice reference extraction and coherence checks.
//!
//! References are only harvested next to contextual keywords ("facture n°",
//! "invoice #", …) and never on lines carrying exclusion keywords (postal
//! artifacts such as "libre réponse" or "cedex", meter identifiers, client
//! or contract numbers). Many issuers embed the emission date inside the
//! reference; when one can be read back it must agree with the stated
//! invoice date.

use super::dates::ExtractedDate;
use crate::model::{Flag, FlagCode, FlagDetails, Severity};
use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

/// Keywords that anchor an invoice reference.
const ANCHOR_KEYWORDS: &[&str] = &[
    "facture n°",
    "facture no",
    "facture nº",
    "facture #",
    "facture num",
    "n° de facture",
    "no de facture",
    "numéro de facture",
    "numero de facture",
    "réf. facture",
    "ref. facture",
    "référence facture",
    "reference facture",
    "invoice #",
    "invoice no",
    "invoice number",
];

/// Keywords that disqualify a line from carrying an invoice reference.
const EXCLUSION_KEYWORDS: &[&str] = &[
    "libre réponse",
    "libre reponse",
    "cedex",
    "pdl",
    "pce",
    "client n°",
    "client no",
    "contrat n°",
    "contrat no",
    "compte n°",
    "compte no",
];

lazy_static! {
    static ref REFERENCE_TOKEN: Regex = Regex::new(r"[A-Za-z0-9][A-Za-z0-9\-_/]{2,24}").unwrap();
    static ref DIGIT_RUN: Regex = Regex::new(r"\d{4,8}").unwrap();
}

/// Which part of an embedded date disagrees with the invoice date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    /// Full `YYYYMMDD`
    Day,
    /// `YYYYMM`
    Month,
    /// `YYYY` only
    Year,
}

/// Extract the first invoice reference, if any.
pub fn extract_invoice_reference(text: &str) -> Option<String> {
    extract_all_invoice_references(text).into_iter().next()
}

/// Extract every invoice reference in document order.
pub fn extract_all_invoice_references(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        let lowered = line.to_lowercase();
        if EXCLUSION_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            continue;
        }
        for anchor in ANCHOR_KEYWORDS {
            if let Some(pos) = lowered.find(anchor) {
                // map the lowered offset back into the original line; both
                // strings have identical byte layout because lowercasing
                // keeps the anchor region ASCII-compatible here
                let after_start = pos + anchor.len();
                let after = match line.get(after_start..) {
                    Some(a) => a,
                    None => continue,
                };
                let after_trim = after.trim_start_matches(|c: char| {
                    c.is_whitespace() || c == ':' || c == '.' || c == '-'
                });
                if let Some(m) = REFERENCE_TOKEN.find(after_trim) {
                    if m.start() == 0 {
                        out.push(m.as_str().to_string());
                        break;
                    }
                }
            }
        }
    }
    out
}

/// Try to read a date embedded in a reference: `YYYYMMDD` over `YYYYMM`
/// over `YYYY`, always requiring the `20` century prefix.
pub fn extract_date_from_reference(reference: &str) -> Option<(NaiveDate, DatePart)> {
    let runs: Vec<&str> = DIGIT_RUN
        .find_iter(reference)
        .map(|m| m.as_str())
        .collect();
    for run in &runs {
        if run.len() >= 8 {
            for start in 0..=(run.len() - 8) {
                let slice = &run[start..start + 8];
                if !slice.starts_with("20") {
                    continue;
                }
                let (y, m, d) = (
                    slice[0..4].parse::<i32>().ok()?,
                    slice[4..6].parse::<u32>().ok()?,
                    slice[6..8].parse::<u32>().ok()?,
                );
                if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                    return Some((date, DatePart::Day));
                }
            }
        }
    }
    for run in &runs {
        if run.len() >= 6 {
            for start in 0..=(run.len() - 6) {
                let slice = &run[start..start + 6];
                if !slice.starts_with("20") {
                    continue;
                }
                let (y, m) = (
                    slice[0..4].parse::<i32>().ok()?,
                    slice[4..6].parse::<u32>().ok()?,
                );
                if let Some(date) = NaiveDate::from_ymd_opt(y, m, 1) {
                    return Some((date, DatePart::Month));
                }
            }
        }
    }
    for run in &runs {
        if run.len() >= 4 {
            for start in 0..=(run.len() - 4) {
                let slice = &run[start..start + 4];
                if !slice.starts_with("20") {
                    continue;
                }
                let y = slice.parse::<i32>().ok()?;
                if (2000..2100).contains(&y) {
                    return Some((NaiveDate::from_ymd_opt(y, 1, 1)?, DatePart::Year));
                }
            }
        }
    }
    None
}

/// Compare a reference-embedded date with the invoice date.
pub fn check_reference_date_match(
    references: &[String],
    invoice_date: Option<NaiveDate>,
) -> Option<Flag> {
    let invoice = invoice_date?;
    for reference in references {
        let (embedded, granularity) = match extract_date_from_reference(reference) {
            Some(v) => v,
            None => continue,
        };
        let (severity, part) = if embedded.year() != invoice.year() {
            (Severity::High, "year")
        } else if granularity != DatePart::Year && embedded.month() != invoice.month() {
            (Severity::Medium, "month")
        } else if granularity == DatePart::Day && embedded.day() != invoice.day() {
            (Severity::Low, "day")
        } else {
            continue;
        };
        return Some(
            Flag::new(
                severity,
                FlagCode::ContentReferenceDateMismatch,
                format!(
                    "Reference {} embeds {} which disagrees with the invoice date {} ({})",
                    reference, embedded, invoice, part
                ),
            )
            .with_details(FlagDetails::ReferenceReport {
                references: vec![reference.clone()],
                embedded_date: Some(embedded.format("%Y-%m-%d").to_string()),
                mismatch_part: Some(part.to_string()),
            }),
        );
    }
    None
}

/// Multiple distinct reference numbers on one invoice is a strong signal.
///
/// Identity is lexical after case-folding; `FAC-001` and `FAC-1` stay
/// distinct on purpose.
pub fn check_reference_consistency(references: &[String]) -> Option<Flag> {
    let distinct: BTreeSet<String> = references.iter().map(|r| r.to_uppercase()).collect();
    if distinct.len() <= 1 {
        return None;
    }
    Some(
        Flag::new(
            Severity::Critical,
            FlagCode::ContentInconsistentReferences,
            format!(
                "The document states {} different invoice references",
                distinct.len()
            ),
        )
        .with_details(FlagDetails::ReferenceReport {
            references: distinct.into_iter().collect(),
            embedded_date: None,
            mismatch_part: None,
        }),
    )
}

/// Full reference pass: extraction plus both checks.
pub fn check_references(text: &str, dates: &[ExtractedDate]) -> Vec<Flag> {
    let references = extract_all_invoice_references(text);
    let mut flags = Vec::new();
    if let Some(flag) =
        check_reference_date_match(&references, super::dates::invoice_date(dates))
    {
        flags.push(flag);
    }
    if let Some(flag) = check_reference_consistency(&references) {
        flags.push(flag);
    }
    flags
}
