//! Content analysis.
//!
//! Pure-text checks over the extracted text layer: date extraction and
//! logic, amount statistics, invoice references, and French company
//! identifiers. Everything here is a function of the text and the injected
//! clock, which keeps the whole module trivially testable.

pub mod amounts;
pub mod dates;
pub mod identifiers;
pub mod references;

use crate::model::{ModuleName, ModuleResult};
use crate::modules::ModuleContext;
use dates::DateType;

pub use amounts::{check_duplicate_amounts, extract_amounts};
pub use dates::{
    check_date_logic, check_future_invoice_date, check_impossible_dates, extract_dates_from_text,
    identify_date_type, ExtractedDate,
};
pub use identifiers::{
    check_legal_mentions, extract_french_vat, extract_potential_sirens, extract_rcs,
    extract_siren, extract_siret, validate_french_vat, validate_siren_checksum,
    validate_siret_checksum,
};
pub use references::{
    check_reference_consistency, check_reference_date_match, extract_all_invoice_references,
    extract_date_from_reference, extract_invoice_reference,
};

/// Confidence from how much dated material the text offered.
fn confidence_for(text: &str, dates: &[ExtractedDate]) -> f64 {
    if text.trim().is_empty() {
        return 0.1;
    }
    let typed = dates
        .iter()
        .filter(|d| d.date_type != DateType::Unknown)
        .count();
    if typed >= 2 {
        0.9
    } else if dates.len() >= 2 {
        0.7
    } else if dates.len() == 1 {
        0.5
    } else {
        0.3
    }
}

/// Run the content module.
pub fn analyze(ctx: &ModuleContext) -> ModuleResult {
    let text = ctx.bundle.full_text();
    if text.trim().is_empty() {
        return ModuleResult::from_flags(ModuleName::Content, Vec::new(), 0.1);
    }
    let now = ctx.services.clock.now();
    let dates = extract_dates_from_text(&text);

    let mut flags = Vec::new();
    flags.extend(check_impossible_dates(&dates, now));
    if let Some(flag) = check_future_invoice_date(&dates, now) {
        flags.push(flag);
    }
    flags.extend(check_date_logic(&dates));

    let amounts = extract_amounts(&text);
    if let Some(flag) = check_duplicate_amounts(&amounts) {
        flags.push(flag);
    }

    flags.extend(references::check_references(&text, &dates));
    flags.extend(check_legal_mentions(&text));

    let confidence = confidence_for(&text, &dates);
    ModuleResult::from_flags(ModuleName::Content, flags, confidence)
}
