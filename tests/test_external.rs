//! External verification with scripted registry/VAT services.

mod common;

use common::{company, invoice_pdf, write_temp, PdfOptions, ScriptedRegistry, ScriptedVat};
use std::sync::Arc;
use veridoc::model::{FlagCode, ModuleName, Severity};
use veridoc::services::{CompanyStatus, LookupOutcome, Services, VatOutcome};
use veridoc::{Analyzer, AnalyzerOptions, FixedClock};

const VALID_SIRET: &str = "55208131766522";
const VALID_SIREN: &str = "552081317";

fn external_module(
    lines: &[&str],
    registry: ScriptedRegistry,
    vat: Option<VatOutcome>,
    expected_company_name: Option<&str>,
) -> veridoc::ModuleResult {
    let pdf_options = PdfOptions {
        lines: lines.iter().map(|s| s.to_string()).collect(),
        info: vec![("Producer".to_string(), "Word".to_string())],
        ..Default::default()
    };
    let file = write_temp(&invoice_pdf(pdf_options));
    let mut services = Services::offline(FixedClock::at(2024, 6, 1));
    services.registry = Some(Arc::new(registry));
    if let Some(outcome) = vat {
        services.vat = Some(Arc::new(ScriptedVat(outcome)));
    }
    let options = AnalyzerOptions {
        enable_external: true,
        expected_company_name: expected_company_name.map(str::to_string),
        ..Default::default()
    };
    let result = Analyzer::new(options)
        .with_services(services)
        .analyze(file.path())
        .expect("analysis");
    result
        .modules
        .into_iter()
        .find(|m| m.module == ModuleName::External)
        .expect("external module present")
}

#[test]
fn unknown_siret_is_critical() {
    let registry = ScriptedRegistry::default(); // everything NotFound
    let module = external_module(
        &[&format!("SIRET : {}", VALID_SIRET)],
        registry,
        None,
        None,
    );
    let flag = module
        .flags
        .iter()
        .find(|f| f.code == FlagCode::ExternalSiretNotFound)
        .expect("not-found flag");
    assert_eq!(flag.severity, Severity::Critical);
    // one definite lookup: confidence 0.5 + 0.5
    assert_eq!(module.confidence, 1.0);
}

#[test]
fn closed_company_is_high() {
    let mut registry = ScriptedRegistry::default();
    registry.sirets.insert(
        VALID_SIRET.to_string(),
        LookupOutcome::Found(company(VALID_SIREN, "DUPONT SAS", CompanyStatus::Closed)),
    );
    let module = external_module(
        &[&format!("SIRET : {}", VALID_SIRET)],
        registry,
        None,
        None,
    );
    assert!(module
        .flags
        .iter()
        .any(|f| f.code == FlagCode::ExternalCompanyClosed && f.severity == Severity::High));
}

#[test]
fn name_mismatch_uses_jaccard() {
    let mut registry = ScriptedRegistry::default();
    registry.sirets.insert(
        VALID_SIRET.to_string(),
        LookupOutcome::Found(company(VALID_SIREN, "DUPONT SAS", CompanyStatus::Active)),
    );
    // same tokens after legal-form stripping: passes
    let module = external_module(
        &[&format!("SIRET : {}", VALID_SIRET)],
        registry,
        None,
        Some("Dupont"),
    );
    assert!(module.flags.is_empty(), "flags: {:#?}", module.flags);

    let mut registry = ScriptedRegistry::default();
    registry.sirets.insert(
        VALID_SIRET.to_string(),
        LookupOutcome::Found(company(VALID_SIREN, "DUPONT SAS", CompanyStatus::Active)),
    );
    let module = external_module(
        &[&format!("SIRET : {}", VALID_SIRET)],
        registry,
        None,
        Some("Plomberie Durand"),
    );
    assert!(module
        .flags
        .iter()
        .any(|f| f.code == FlagCode::ExternalCompanyNameMismatch));
}

#[test]
fn network_failure_costs_at_most_the_low_penalty() {
    let mut registry = ScriptedRegistry::default();
    registry.sirets.insert(
        VALID_SIRET.to_string(),
        LookupOutcome::Error("timeout".into()),
    );
    let module = external_module(
        &[&format!("SIRET : {}", VALID_SIRET)],
        registry,
        None,
        None,
    );
    let flag = module
        .flags
        .iter()
        .find(|f| f.code == FlagCode::ExternalSiretVerificationFailed)
        .expect("verification-failed flag");
    assert_eq!(flag.severity, Severity::Low);
    assert_eq!(module.score, 95); // exactly one low penalty
    // zero definite answers out of one attempt
    assert_eq!(module.confidence, 0.5);
}

#[test]
fn siren_implied_by_siret_is_not_queried_twice() {
    let mut registry = ScriptedRegistry::default();
    registry.sirets.insert(
        VALID_SIRET.to_string(),
        LookupOutcome::Found(company(VALID_SIREN, "DUPONT", CompanyStatus::Active)),
    );
    // the SIREN is implied by the SIRET; a NotFound default for SIRENs
    // must not produce a second (critical) flag
    let module = external_module(
        &[
            &format!("SIRET : {}", VALID_SIRET),
            &format!("SIREN : {}", VALID_SIREN),
        ],
        registry,
        None,
        None,
    );
    assert!(module.flags.is_empty(), "flags: {:#?}", module.flags);
}

#[test]
fn invalid_vat_reply_is_critical() {
    let module = external_module(
        &["TVA : FR03552081317"],
        ScriptedRegistry::default(),
        Some(VatOutcome::Invalid),
        None,
    );
    assert!(module
        .flags
        .iter()
        .any(|f| f.code == FlagCode::ExternalVatInvalid && f.severity == Severity::Critical));
}

#[test]
fn nothing_to_verify_means_low_confidence() {
    let module = external_module(
        &["Aucune mention legale ici"],
        ScriptedRegistry::default(),
        None,
        None,
    );
    assert!(module.flags.is_empty());
    assert_eq!(module.confidence, 0.1);
}
