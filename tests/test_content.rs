//! Content checks: checksum algebra (property-based) and the documented
//! concrete cases.

use proptest::prelude::*;
use veridoc::modules::content::{
    extract_all_invoice_references, extract_date_from_reference, extract_dates_from_text,
    validate_french_vat, validate_siren_checksum, validate_siret_checksum,
};

#[test]
fn documented_siret_cases() {
    assert!(validate_siret_checksum("55208131766522"));
    assert!(!validate_siret_checksum("55208131766523"));
    assert!(!validate_siret_checksum("5520813176652A"));
}

#[test]
fn documented_vat_cases() {
    assert!(validate_french_vat("FR03552081317"));
    assert!(!validate_french_vat("FR99552081317"));
    assert!(!validate_french_vat("DE03552081317"));
}

proptest! {
    /// For any 8-digit prefix there is exactly one valid SIREN check digit.
    #[test]
    fn siren_check_digit_is_unique(prefix in "[0-9]{8}") {
        let valid: Vec<u32> = (0..10)
            .filter(|d| validate_siren_checksum(&format!("{}{}", prefix, d)))
            .collect();
        prop_assert_eq!(valid.len(), 1);
    }

    /// Same for the 13-digit SIRET prefix.
    #[test]
    fn siret_check_digit_is_unique(prefix in "[0-9]{13}") {
        let valid: Vec<u32> = (0..10)
            .filter(|d| validate_siret_checksum(&format!("{}{}", prefix, d)))
            .collect();
        prop_assert_eq!(valid.len(), 1);
    }

    /// A French VAT number is valid iff its SIREN is valid and the check
    /// digits follow `(12 + 3·(siren mod 97)) mod 97`.
    #[test]
    fn vat_check_formula(prefix in "[0-9]{8}") {
        let siren = (0..10)
            .map(|d| format!("{}{}", prefix, d))
            .find(|s| validate_siren_checksum(s))
            .expect("one valid check digit exists");
        let n: u64 = siren.parse().unwrap();
        let check = (12 + 3 * (n % 97)) % 97;
        prop_assert!(validate_french_vat(&format!("FR{:02}{}", check, siren)), "expected valid VAT");
        let wrong = (check + 1) % 97;
        prop_assert!(!validate_french_vat(&format!("FR{:02}{}", wrong, siren)), "expected invalid VAT");
    }

    /// Anything that is not exactly nine digits never validates.
    #[test]
    fn garbage_never_validates(s in "[A-Za-z0-9]{0,20}") {
        prop_assume!(s.len() != 9 || !s.chars().all(|c| c.is_ascii_digit()));
        prop_assert!(!validate_siren_checksum(&s));
    }

    /// Every valid calendar date written day-first is extracted back.
    #[test]
    fn numeric_dates_roundtrip(day in 1u32..=28, month in 1u32..=12, year in 2001i32..=2099) {
        let text = format!("document du {:02}/{:02}/{}", day, month, year);
        let dates = extract_dates_from_text(&text);
        prop_assert_eq!(dates.len(), 1);
        let date = dates[0].date;
        prop_assert_eq!(
            date,
            chrono::NaiveDate::from_ymd_opt(year, month, day).unwrap()
        );
    }
}

#[test]
fn reference_extraction_and_embedded_date_priority() {
    let refs =
        extract_all_invoice_references("Facture n° F20240115-A\nClient n° 999999\nCedex 12345");
    assert_eq!(refs, vec!["F20240115-A"]);

    // YYYYMMDD wins over YYYYMM wins over YYYY
    let (full, _) = extract_date_from_reference("F20240115").unwrap();
    assert_eq!(full, chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    let (month, _) = extract_date_from_reference("F202403").unwrap();
    assert_eq!(month, chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    let (year, _) = extract_date_from_reference("F2024").unwrap();
    assert_eq!(year, chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
}
