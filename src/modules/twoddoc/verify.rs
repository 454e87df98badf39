//! Cross-verification of signed barcode fields against the visible text.
//!
//! The barcode payload is signed; the printed text is not. Any salient
//! signed field that cannot be found in the visible text means the visible
//! text was altered after emission. Matching rules differ by field kind:
//! names and places match after NFD accent-stripping and whitespace
//! collapsing; postal codes, tax identifiers and invoice numbers match as
//! exact substrings; amounts parse numerically with a small tolerance.
//!
//! On tax notices the checks go further: the balance (tax minus amount
//! already paid) must appear verbatim, and any figure printed next to
//! income vocabulary must be plausible for the signed tax amount given the
//! household parts and the progressive bracket table.

use super::message::Message;
use crate::model::{FieldMatch, Flag, FlagCode, FlagDetails, Severity};
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Absolute tolerance for amount comparison.
const AMOUNT_TOLERANCE: f64 = 0.01;

/// DIs matched with text normalization (names, places, streets).
const NORMALIZED_DIS: &[&str] = &[
    "10", "11", "12", "13", "14", "15", "16", "17", "18", "19", "21", "25", "60", "61", "62",
    "63", "64",
];

/// DIs matched as exact substrings (codes and identifiers).
const EXACT_DIS: &[&str] = &["20", "24", "40", "44", "47", "49", "50", "51", "52", "1D"];

/// DIs matched as amounts.
const AMOUNT_DIS: &[&str] = &["41", "55", "4V", "4X", "80", "81", "82", "83", "84"];

/// Tax-notice DIs whose absence from the visible text is benefit fraud.
const CRITICAL_TAX_DIS: &[&str] = &["41", "4V", "47", "49"];

/// French income-tax brackets, per household part: (upper bound, rate).
const TAX_BRACKETS: &[(f64, f64)] = &[
    (11_497.0, 0.0),
    (29_315.0, 0.11),
    (83_823.0, 0.30),
    (180_294.0, 0.41),
    (f64::INFINITY, 0.45),
];

/// Tolerance applied around the re-derived income.
const INCOME_TOLERANCE: f64 = 0.25;

/// Keywords marking income figures in the text.
const INCOME_KEYWORDS: &[&str] = &[
    "revenu brut",
    "revenu imposable",
    "revenu net",
    "revenu fiscal",
    "revenu global",
    "net imposable",
    "brut global",
];

lazy_static! {
    // the grouped-thousands alternative must require at least one group,
    // otherwise it would claim a bare 3-digit prefix of longer runs
    static ref NUMBER: Regex =
        Regex::new(r"\d{1,3}(?:[ \u{00A0}]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// NFD-decompose, strip combining marks, collapse whitespace, uppercase.
pub fn normalize_text(input: &str) -> String {
    let stripped: String = input
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect();
    WHITESPACE
        .replace_all(&stripped, " ")
        .trim()
        .to_uppercase()
}

/// Parse a number written in European or US convention.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().replace(['\u{00A0}', ' '], "");
    if trimmed.is_empty() {
        return None;
    }
    let (int_part, dec_part) = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(c), Some(d)) if c > d => (trimmed[..c].replace('.', ""), trimmed[c + 1..].to_string()),
        (Some(c), Some(d)) => (trimmed[..d].replace(',', ""), trimmed[d + 1..].to_string()),
        (Some(c), None) => (trimmed[..c].to_string(), trimmed[c + 1..].to_string()),
        (None, Some(d)) => (trimmed[..d].replace(',', ""), trimmed[d + 1..].to_string()),
        (None, None) => (trimmed.clone(), String::new()),
    };
    let int_clean: String = int_part.chars().filter(|c| c.is_ascii_digit()).collect();
    if int_clean.is_empty() {
        return None;
    }
    let composed = if dec_part.is_empty() {
        int_clean
    } else {
        format!("{}.{}", int_clean, dec_part)
    };
    composed.parse().ok()
}

/// All numbers present in the text.
fn text_amounts(text: &str) -> Vec<f64> {
    NUMBER
        .find_iter(text)
        .filter_map(|m| parse_amount(m.as_str()))
        .collect()
}

/// Does the text contain this amount, up to the tolerance?
pub fn amount_in_text(text: &str, value: f64) -> bool {
    text_amounts(text)
        .iter()
        .any(|v| (v - value).abs() <= AMOUNT_TOLERANCE)
}

/// Match one field against the document text by its kind.
fn field_found(di: &str, value: &str, raw_text: &str, normalized_text: &str) -> bool {
    if value.trim().is_empty() {
        return true; // empty signed value constrains nothing
    }
    if EXACT_DIS.contains(&di) {
        return raw_text.contains(value.trim());
    }
    if AMOUNT_DIS.contains(&di) {
        return match parse_amount(value) {
            Some(v) => amount_in_text(raw_text, v),
            None => raw_text.contains(value.trim()),
        };
    }
    if NORMALIZED_DIS.contains(&di) {
        return normalized_text.contains(&normalize_text(value));
    }
    // non-salient DIs are not cross-checked
    true
}

/// Income tax for one part under the progressive table.
fn tax_per_part(income_per_part: f64) -> f64 {
    let mut tax = 0.0;
    let mut lower = 0.0;
    for &(upper, rate) in TAX_BRACKETS {
        if income_per_part <= lower {
            break;
        }
        let taxable = (income_per_part.min(upper)) - lower;
        tax += taxable * rate;
        lower = upper;
    }
    tax
}

/// Invert the tax table: income-per-part that produces this tax-per-part.
fn income_per_part_for_tax(tax: f64) -> f64 {
    if tax <= 0.0 {
        return TAX_BRACKETS[0].0; // anywhere in the zero bracket; take its top
    }
    let mut cumulative = 0.0;
    let mut lower = 0.0;
    for &(upper, rate) in TAX_BRACKETS {
        let bracket_tax = if upper.is_finite() {
            (upper - lower) * rate
        } else {
            f64::INFINITY
        };
        if tax <= cumulative + bracket_tax || !upper.is_finite() {
            if rate == 0.0 {
                return upper;
            }
            return lower + (tax - cumulative) / rate;
        }
        cumulative += bracket_tax;
        lower = upper;
    }
    lower
}

/// Plausible income window `[min, max]` for a signed tax amount and
/// household parts, tolerance included.
pub fn plausible_income_range(tax_amount: f64, parts: f64) -> (f64, f64) {
    let parts = if parts > 0.0 { parts } else { 1.0 };
    let income = income_per_part_for_tax(tax_amount / parts) * parts;
    (
        income * (1.0 - INCOME_TOLERANCE),
        income * (1.0 + INCOME_TOLERANCE),
    )
}

/// Numbers in `[1000, 500000]` within 50 chars after an income keyword.
pub fn income_figures(text: &str) -> Vec<f64> {
    let lowered = text.to_lowercase();
    let mut out = Vec::new();
    for keyword in INCOME_KEYWORDS {
        let mut search_from = 0usize;
        while let Some(pos) = lowered[search_from..].find(keyword) {
            let hit = search_from + pos + keyword.len();
            let window_end = lowered
                .char_indices()
                .map(|(i, _)| i)
                .find(|&i| i >= hit + 50)
                .unwrap_or(lowered.len());
            let window = text.get(hit..window_end).unwrap_or("");
            for m in NUMBER.find_iter(window) {
                if let Some(v) = parse_amount(m.as_str()) {
                    if (1000.0..=500_000.0).contains(&v) {
                        out.push(v);
                    }
                }
            }
            search_from = hit;
        }
    }
    out
}

/// Everything the cross-verification produced.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    /// Per-field comparison outcomes for salient DIs
    pub matches: Vec<FieldMatch>,
    /// Flags raised
    pub flags: Vec<Flag>,
}

/// Cross-verify a parsed message against the visible document text.
pub fn cross_verify(message: &Message, text: &str) -> VerificationReport {
    let normalized_text = normalize_text(text);
    let mut report = VerificationReport::default();
    let mut missing_critical: Vec<String> = Vec::new();
    let mut mismatched: Vec<FieldMatch> = Vec::new();

    for field in &message.fields {
        let di = field.di.as_str();
        let salient = NORMALIZED_DIS.contains(&di)
            || EXACT_DIS.contains(&di)
            || AMOUNT_DIS.contains(&di);
        if !salient || field.truncated {
            continue;
        }
        let matched = field_found(di, &field.value, text, &normalized_text);
        let record = FieldMatch {
            di: field.di.clone(),
            name: field.name.clone(),
            value: field.value.clone(),
            matched,
        };
        if !matched {
            if CRITICAL_TAX_DIS.contains(&di) {
                missing_critical.push(format!("{} ({})", field.di, field.name));
            } else {
                mismatched.push(record.clone());
            }
        }
        report.matches.push(record);
    }

    if !missing_critical.is_empty() {
        report.flags.push(
            Flag::new(
                Severity::Critical,
                FlagCode::TwoddocMissingTaxField,
                format!(
                    "Signed tax fields absent from the visible text: {}",
                    missing_critical.join(", ")
                ),
            )
            .with_details(FlagDetails::BarcodeReport {
                doc_type: None,
                fields: report.matches.clone(),
            }),
        );
    }
    for record in &mismatched {
        report.flags.push(
            Flag::new(
                Severity::High,
                FlagCode::TwoddocFieldMismatch,
                format!(
                    "Signed field \"{}\" ({}) not found in the visible text",
                    record.name, record.di
                ),
            )
            .with_details(FlagDetails::BarcodeReport {
                doc_type: None,
                fields: vec![record.clone()],
            }),
        );
    }

    // balance: 4V − 4X must be printed verbatim
    if let (Some(tax), Some(paid)) = (
        message.get("4V").and_then(|f| parse_amount(&f.value)),
        message.get("4X").and_then(|f| parse_amount(&f.value)),
    ) {
        let balance = tax - paid;
        if balance.abs() > AMOUNT_TOLERANCE && !amount_in_text(text, balance) {
            report.flags.push(Flag::new(
                Severity::High,
                FlagCode::TwoddocBalanceMismatch,
                format!(
                    "The balance {:.2} (tax minus prepaid) does not appear in the text",
                    balance
                ),
            ));
        }
    }

    // income plausibility against the signed tax amount
    if let Some(tax) = message.get("4V").and_then(|f| parse_amount(&f.value)) {
        let parts = message
            .get("43")
            .and_then(|f| parse_amount(&f.value))
            .unwrap_or(1.0);
        let (min, max) = plausible_income_range(tax, parts);
        for figure in income_figures(text) {
            if figure < min / 2.0 {
                report.flags.push(
                    Flag::new(
                        Severity::Critical,
                        FlagCode::TwoddocIncomeTooLow,
                        format!(
                            "Printed income {:.0} is far below what the signed tax implies",
                            figure
                        ),
                    )
                    .with_details(FlagDetails::IncomeReport {
                        tax_amount: tax,
                        household_parts: parts,
                        plausible_min: min,
                        plausible_max: max,
                        found_value: figure,
                    }),
                );
            } else if figure > max * 2.0 {
                report.flags.push(
                    Flag::new(
                        Severity::High,
                        FlagCode::TwoddocIncomeTooHigh,
                        format!(
                            "Printed income {:.0} is far above what the signed tax implies",
                            figure
                        ),
                    )
                    .with_details(FlagDetails::IncomeReport {
                        tax_amount: tax,
                        household_parts: parts,
                        plausible_min: min,
                        plausible_max: max,
                        found_value: figure,
                    }),
                );
            } else {
                report.matches.push(FieldMatch {
                    di: "4V".into(),
                    name: "Revenu plausible".into(),
                    value: format!("{:.0}", figure),
                    matched: true,
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::twoddoc::message::parse_message;

    #[test]
    fn normalization() {
        assert_eq!(normalize_text("Jérôme  Dupont"), "JEROME DUPONT");
        assert_eq!(normalize_text("  élise\nmartin "), "ELISE MARTIN");
    }

    #[test]
    fn amount_parsing_conventions() {
        assert_eq!(parse_amount("1 234,56"), Some(1234.56));
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("1234"), Some(1234.0));
        assert_eq!(parse_amount("12,5"), Some(12.5));
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn name_match_is_accent_insensitive() {
        let message = parse_message(b"13DUPONT\x1D12JEROME\x1D");
        let report = cross_verify(&message, "Facture pour Jérôme Dupont");
        assert!(report.flags.is_empty());
        assert!(report.matches.iter().all(|m| m.matched));
    }

    #[test]
    fn missing_name_is_a_mismatch() {
        let message = parse_message(b"13DUPONT\x1D");
        let report = cross_verify(&message, "Facture pour Martin Durand");
        assert_eq!(report.flags.len(), 1);
        assert_eq!(report.flags[0].code, FlagCode::TwoddocFieldMismatch);
        assert_eq!(report.flags[0].severity, Severity::High);
    }

    #[test]
    fn postal_code_is_exact() {
        let message = parse_message(b"2075012\x1D");
        let ok = cross_verify(&message, "adresse: 75012 PARIS");
        assert!(ok.flags.is_empty());
        let ko = cross_verify(&message, "adresse: 75013 PARIS");
        assert_eq!(ko.flags.len(), 1);
    }

    #[test]
    fn missing_tax_fields_are_critical() {
        let message = parse_message(b"411234\x1D471234567890123\x1D");
        let report = cross_verify(&message, "document sans ces valeurs");
        let critical: Vec<_> = report
            .flags
            .iter()
            .filter(|f| f.code == FlagCode::TwoddocMissingTaxField)
            .collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].severity, Severity::Critical);
    }

    #[test]
    fn balance_must_be_printed() {
        let message = parse_message(b"4V1500\x1D4X500\x1D");
        let ok = cross_verify(&message, "impot 1500, deja paye 500, solde 1 000,00");
        assert!(!ok
            .flags
            .iter()
            .any(|f| f.code == FlagCode::TwoddocBalanceMismatch));
        let ko = cross_verify(&message, "impot 1500, deja paye 500, solde 999");
        assert!(ko
            .flags
            .iter()
            .any(|f| f.code == FlagCode::TwoddocBalanceMismatch));
    }

    #[test]
    fn tax_table_inversion() {
        // zero tax: anything in the zero bracket
        let (min, max) = plausible_income_range(0.0, 1.0);
        assert!(min < 11_497.0 && max > 11_497.0);

        // the inversion is consistent with the forward table
        for &tax in &[500.0, 3_000.0, 12_000.0, 60_000.0] {
            let income = income_per_part_for_tax(tax);
            assert!((tax_per_part(income) - tax).abs() < 1.0);
        }

        // two parts double the window
        let (min1, _) = plausible_income_range(2_000.0, 1.0);
        let (min2, _) = plausible_income_range(4_000.0, 2.0);
        assert!((min2 - 2.0 * min1).abs() < 1.0);
    }

    #[test]
    fn income_plausibility_flags() {
        // tax 4 000 on one part → income around 40 000 (30% bracket)
        let message = parse_message(b"4V4000\x1D431\x1D411234\x1D");
        let text_low = "Revenu fiscal de reference: 1234\nrevenu imposable 5 000";
        let report = cross_verify(&message, text_low);
        assert!(report
            .flags
            .iter()
            .any(|f| f.code == FlagCode::TwoddocIncomeTooLow));

        let text_high = "revenu imposable 450 000\nRevenu fiscal de reference: 1234";
        let report = cross_verify(&message, text_high);
        assert!(report
            .flags
            .iter()
            .any(|f| f.code == FlagCode::TwoddocIncomeTooHigh));

        let text_ok = "revenu imposable 41 000\nreference avis 1234";
        let report = cross_verify(&message, text_ok);
        assert!(!report
            .flags
            .iter()
            .any(|f| f.code == FlagCode::TwoddocIncomeTooLow
                || f.code == FlagCode::TwoddocIncomeTooHigh));
    }
}
