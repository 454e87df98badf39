//! French company identifiers: SIREN, SIRET, VAT, RCS.
//!
//! SIREN (9 digits) and SIRET (14 digits) both use Luhn checksums with
//! opposite parities: SIREN doubles digits at odd 0-indexed positions,
//! SIRET at even ones. A French VAT number is `FR` + 2 check digits + the
//! SIREN, where `check = (12 + 3·(SIREN mod 97)) mod 97`.

use crate::model::{Flag, FlagCode, FlagDetails, Severity};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref SIRET_ANCHORED: Regex =
        Regex::new(r"(?i)siret\s*(?:n°|no|:)?\s*((?:\d[ .]?){13}\d)").unwrap();
    static ref SIREN_ANCHORED: Regex =
        Regex::new(r"(?i)siren\s*(?:n°|no|:)?\s*((?:\d[ .]?){8}\d)").unwrap();
    static ref VAT_PATTERN: Regex =
        Regex::new(r"(?i)\bFR\s?(\d{2})\s?(\d{3})\s?(\d{3})\s?(\d{3})\b").unwrap();
    static ref RCS_MENTION: Regex = Regex::new(r"(?i)\bRCS\b").unwrap();
    static ref RCS_SIREN: Regex =
        Regex::new(r"(?i)\bRCS\b[^\n\d]{0,40}((?:\d[ .]?){8}\d)").unwrap();
    static ref POTENTIAL_SIREN: Regex = Regex::new(r"\b\d{3} \d{3} \d{3}\b").unwrap();
}

fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn luhn_sum(digits: &str, double_odd_positions: bool) -> Option<u32> {
    let mut sum = 0u32;
    for (i, c) in digits.chars().enumerate() {
        let mut d = c.to_digit(10)?;
        let double = if double_odd_positions { i % 2 == 1 } else { i % 2 == 0 };
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    Some(sum)
}

/// Validate a 9-digit SIREN (Luhn, odd positions doubled).
pub fn validate_siren_checksum(siren: &str) -> bool {
    if siren.len() != 9 || !siren.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    matches!(luhn_sum(siren, true), Some(s) if s % 10 == 0)
}

/// Validate a 14-digit SIRET (Luhn, even positions doubled).
pub fn validate_siret_checksum(siret: &str) -> bool {
    if siret.len() != 14 || !siret.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    matches!(luhn_sum(siret, false), Some(s) if s % 10 == 0)
}

/// Validate a French VAT number (`FRxx` + SIREN).
pub fn validate_french_vat(vat: &str) -> bool {
    let vat = vat.trim().to_uppercase();
    if vat.len() != 13 || !vat.starts_with("FR") {
        return false;
    }
    let rest = &vat[2..];
    if !rest.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let check: u64 = match rest[..2].parse() {
        Ok(v) => v,
        Err(_) => return false,
    };
    let siren = &rest[2..];
    if !validate_siren_checksum(siren) {
        return false;
    }
    let siren_num: u64 = match siren.parse() {
        Ok(v) => v,
        Err(_) => return false,
    };
    check == (12 + 3 * (siren_num % 97)) % 97
}

/// SIRETs stated next to a "SIRET" mention.
pub fn extract_siret(text: &str) -> Vec<String> {
    SIRET_ANCHORED
        .captures_iter(text)
        .map(|c| digits_only(&c[1]))
        .filter(|d| d.len() == 14)
        .collect()
}

/// SIRENs stated next to a "SIREN" mention.
pub fn extract_siren(text: &str) -> Vec<String> {
    SIREN_ANCHORED
        .captures_iter(text)
        .map(|c| digits_only(&c[1]))
        .filter(|d| d.len() == 9)
        .collect()
}

/// French VAT numbers (TVA intracommunautaire).
pub fn extract_french_vat(text: &str) -> Vec<String> {
    VAT_PATTERN
        .captures_iter(text)
        .map(|c| format!("FR{}{}{}{}", &c[1], &c[2], &c[3], &c[4]))
        .collect()
}

/// SIRENs stated after an RCS mention (`RCS Paris 552 081 317`).
pub fn extract_rcs(text: &str) -> Vec<String> {
    RCS_SIREN
        .captures_iter(text)
        .map(|c| digits_only(&c[1]))
        .filter(|d| d.len() == 9)
        .collect()
}

/// True when the text mentions an RCS registration at all.
pub fn has_rcs_mention(text: &str) -> bool {
    RCS_MENTION.is_match(text)
}

/// Checksum-valid `XXX XXX XXX` groups without an explicit SIREN label.
/// Low-confidence: consumed by the external verifier, never flagged here.
pub fn extract_potential_sirens(text: &str) -> Vec<String> {
    POTENTIAL_SIREN
        .find_iter(text)
        .map(|m| digits_only(m.as_str()))
        .filter(|d| validate_siren_checksum(d))
        .collect()
}

/// Markers that make a text look like a French invoice.
const INVOICE_MARKERS: &[&str] = &["facture", "siret", "tva", "€", "eur"];

/// Validate every extracted identifier and cross-check SIREN vs VAT.
pub fn check_legal_mentions(text: &str) -> Vec<Flag> {
    let mut flags = Vec::new();
    let sirets = extract_siret(text);
    let sirens = extract_siren(text);
    let vats = extract_french_vat(text);

    for siret in &sirets {
        if !validate_siret_checksum(siret) {
            flags.push(
                Flag::new(
                    Severity::High,
                    FlagCode::ContentInvalidSiret,
                    format!("SIRET {} fails its checksum", siret),
                )
                .with_details(FlagDetails::IdentifierReport {
                    kind: "siret".into(),
                    value: siret.clone(),
                }),
            );
        }
    }
    for siren in &sirens {
        if !validate_siren_checksum(siren) {
            flags.push(
                Flag::new(
                    Severity::High,
                    FlagCode::ContentInvalidSiren,
                    format!("SIREN {} fails its checksum", siren),
                )
                .with_details(FlagDetails::IdentifierReport {
                    kind: "siren".into(),
                    value: siren.clone(),
                }),
            );
        }
    }
    for vat in &vats {
        if !validate_french_vat(vat) {
            flags.push(
                Flag::new(
                    Severity::High,
                    FlagCode::ContentInvalidVat,
                    format!("VAT number {} fails its checksum", vat),
                )
                .with_details(FlagDetails::IdentifierReport {
                    kind: "vat".into(),
                    value: vat.clone(),
                }),
            );
        }
    }

    // SIREN vs VAT cross-check, only on checksum-valid values on both sides
    let document_sirens: BTreeSet<String> = sirens
        .iter()
        .cloned()
        .chain(sirets.iter().map(|s| s[..9].to_string()))
        .filter(|s| validate_siren_checksum(s))
        .collect();
    let vat_sirens: BTreeSet<String> = vats
        .iter()
        .filter(|v| validate_french_vat(v))
        .map(|v| v[4..].to_string())
        .collect();
    if !document_sirens.is_empty()
        && !vat_sirens.is_empty()
        && document_sirens.is_disjoint(&vat_sirens)
    {
        flags.push(
            Flag::new(
                Severity::Critical,
                FlagCode::ContentSirenVatMismatch,
                "The VAT number does not belong to the stated SIREN/SIRET",
            )
            .with_details(FlagDetails::IdentifierSets {
                document_sirens: document_sirens.into_iter().collect(),
                vat_sirens: vat_sirens.into_iter().collect(),
            }),
        );
    }

    // missing-identifier check, gated on the text looking like an invoice
    let lowered = text.to_lowercase();
    let looks_french_invoice = INVOICE_MARKERS.iter().any(|m| lowered.contains(m));
    if looks_french_invoice && sirets.is_empty() && sirens.is_empty() && !has_rcs_mention(text) {
        flags.push(Flag::new(
            Severity::Medium,
            FlagCode::ContentMissingCompanyId,
            "No SIRET, SIREN or RCS mention on a French-looking invoice",
        ));
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siret_checksum_cases() {
        assert!(validate_siret_checksum("55208131766522"));
        assert!(!validate_siret_checksum("55208131766523"));
        assert!(!validate_siret_checksum("5520813176652A"));
        assert!(!validate_siret_checksum("552081317"));
    }

    #[test]
    fn siren_checksum_cases() {
        assert!(validate_siren_checksum("552081317"));
        assert!(!validate_siren_checksum("552081318"));
        assert!(!validate_siren_checksum("55208131"));
    }

    #[test]
    fn vat_checksum_cases() {
        assert!(validate_french_vat("FR03552081317"));
        assert!(!validate_french_vat("FR99552081317"));
        assert!(!validate_french_vat("DE03552081317"));
        assert!(!validate_french_vat("FR0355208131"));
    }

    #[test]
    fn extraction_with_spacing() {
        let text = "SIRET : 552 081 317 66522\nTVA: FR 03 552 081 317";
        assert_eq!(extract_siret(text), vec!["55208131766522"]);
        assert_eq!(extract_french_vat(text), vec!["FR03552081317"]);
    }

    #[test]
    fn rcs_and_potential() {
        let rcs = extract_rcs("RCS Paris 552 081 317");
        assert_eq!(rcs, vec!["552081317"]);
        let potential = extract_potential_sirens("identifiant 552 081 317 et 123 456 789");
        assert_eq!(potential, vec!["552081317"]); // the second fails Luhn
    }

    #[test]
    fn invalid_identifier_flags() {
        let flags = check_legal_mentions("Facture\nSIRET: 55208131766523");
        assert!(flags.iter().any(|f| f.code == FlagCode::ContentInvalidSiret));
    }

    #[test]
    fn siren_vat_mismatch_only_on_valid_pairs() {
        // 732829320 is checksum-valid and differs from 552081317
        let text = "SIREN: 732 829 320\nTVA: FR03552081317";
        let flags = check_legal_mentions(text);
        assert!(flags
            .iter()
            .any(|f| f.code == FlagCode::ContentSirenVatMismatch));

        // invalid VAT side: no comparison
        let text = "SIREN: 732 829 320\nTVA: FR99552081317";
        let flags = check_legal_mentions(text);
        assert!(!flags
            .iter()
            .any(|f| f.code == FlagCode::ContentSirenVatMismatch));
    }

    #[test]
    fn missing_company_id_needs_invoice_markers() {
        let flags = check_legal_mentions("Facture pour services rendus, total 100 €");
        assert!(flags
            .iter()
            .any(|f| f.code == FlagCode::ContentMissingCompanyId));

        let flags = check_legal_mentions("A plain letter without invoice vocabulary");
        assert!(!flags
            .iter()
            .any(|f| f.code == FlagCode::ContentMissingCompanyId));

        let flags = check_legal_mentions("Facture — RCS Lyon 552 081 317");
        assert!(!flags
            .iter()
            .any(|f| f.code == FlagCode::ContentMissingCompanyId));
    }
}
