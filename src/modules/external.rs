//! External verification.
//!
//! The only module allowed to perform network I/O, always through the
//! injected registry/VAT/reputation primitives and never mandatory: every
//! network failure degrades into a low-severity flag, so a dead registry
//! can cost at most five points.

use crate::model::{Flag, FlagCode, FlagDetails, ModuleName, ModuleResult, Severity};
use crate::modules::content::{
    extract_french_vat, extract_potential_sirens, extract_siren, extract_siret,
    validate_french_vat, validate_siren_checksum, validate_siret_checksum,
};
use crate::modules::ModuleContext;
use crate::services::{CompanyStatus, LookupOutcome, ReputationOutcome, VatOutcome};
use log::{debug, info};
use std::collections::BTreeSet;

/// Legal-form tokens stripped before name comparison.
const LEGAL_FORMS: &[&str] = &[
    "sa", "sas", "sarl", "eurl", "snc", "sci", "scop", "sel", "gie", "se", "sca",
];

/// Jaccard similarity threshold above which names are the same company.
const NAME_SIMILARITY_THRESHOLD: f64 = 0.8;

fn normalize_name_tokens(name: &str) -> BTreeSet<String> {
    name.to_lowercase()
        .split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|token| !token.is_empty() && !LEGAL_FORMS.contains(&token.as_str()))
        .collect()
}

/// Jaccard similarity over normalized word tokens.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let ta = normalize_name_tokens(a);
    let tb = normalize_name_tokens(b);
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

struct Tally {
    attempted: usize,
    succeeded: usize,
}

impl Tally {
    fn definite(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }
    fn failed(&mut self) {
        self.attempted += 1;
    }
}

fn check_company_info(
    flags: &mut Vec<Flag>,
    identifier: &str,
    info: &crate::services::CompanyInfo,
    expected_name: Option<&str>,
) {
    if info.status == CompanyStatus::Closed {
        flags.push(
            Flag::new(
                Severity::High,
                FlagCode::ExternalCompanyClosed,
                format!("Company {} is administratively closed", identifier),
            )
            .with_details(FlagDetails::RegistryReport {
                identifier: identifier.to_string(),
                registered_name: Some(info.name.clone()),
                status: Some("closed".into()),
                similarity: None,
            }),
        );
    }
    if let Some(expected) = expected_name {
        let registered = info.trade_name.as_deref().unwrap_or(&info.name);
        let similarity = name_similarity(expected, registered)
            .max(name_similarity(expected, &info.name));
        if similarity < NAME_SIMILARITY_THRESHOLD {
            flags.push(
                Flag::new(
                    Severity::High,
                    FlagCode::ExternalCompanyNameMismatch,
                    format!(
                        "Registered name \"{}\" does not match the expected \"{}\"",
                        info.name, expected
                    ),
                )
                .with_details(FlagDetails::RegistryReport {
                    identifier: identifier.to_string(),
                    registered_name: Some(info.name.clone()),
                    status: None,
                    similarity: Some(similarity),
                }),
            );
        }
    }
}

/// Run the external module.
pub fn analyze(ctx: &ModuleContext) -> ModuleResult {
    let text = ctx.bundle.full_text();
    let mut flags = Vec::new();
    let mut tally = Tally {
        attempted: 0,
        succeeded: 0,
    };
    let expected_name = ctx.options.expected_company_name.as_deref();

    let sirets: Vec<String> = extract_siret(&text)
        .into_iter()
        .filter(|s| validate_siret_checksum(s))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let implied_sirens: BTreeSet<String> =
        sirets.iter().map(|s| s[..9].to_string()).collect();
    let sirens: Vec<String> = extract_siren(&text)
        .into_iter()
        .filter(|s| validate_siren_checksum(s))
        .filter(|s| !implied_sirens.contains(s))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let potential: Vec<String> = extract_potential_sirens(&text)
        .into_iter()
        .filter(|s| !implied_sirens.contains(s))
        .filter(|s| !sirens.contains(s))
        .collect();

    if let Some(registry) = &ctx.services.registry {
        for siret in &sirets {
            match registry.lookup_siret(siret) {
                LookupOutcome::Found(info) => {
                    tally.definite();
                    check_company_info(&mut flags, siret, &info, expected_name);
                }
                LookupOutcome::NotFound => {
                    tally.definite();
                    flags.push(
                        Flag::new(
                            Severity::Critical,
                            FlagCode::ExternalSiretNotFound,
                            format!("SIRET {} is unknown to the company registry", siret),
                        )
                        .with_details(FlagDetails::RegistryReport {
                            identifier: siret.clone(),
                            registered_name: None,
                            status: Some("not_found".into()),
                            similarity: None,
                        }),
                    );
                }
                LookupOutcome::Error(e) => {
                    tally.failed();
                    info!("SIRET lookup failed: {}", e);
                    flags.push(Flag::new(
                        Severity::Low,
                        FlagCode::ExternalSiretVerificationFailed,
                        "SIRET could not be verified (registry unreachable)",
                    ));
                }
            }
        }
        for siren in &sirens {
            match registry.lookup_siren(siren) {
                LookupOutcome::Found(info) => {
                    tally.definite();
                    check_company_info(&mut flags, siren, &info, expected_name);
                }
                LookupOutcome::NotFound => {
                    tally.definite();
                    flags.push(
                        Flag::new(
                            Severity::Critical,
                            FlagCode::ExternalSirenNotFound,
                            format!("SIREN {} is unknown to the company registry", siren),
                        )
                        .with_details(FlagDetails::RegistryReport {
                            identifier: siren.clone(),
                            registered_name: None,
                            status: Some("not_found".into()),
                            similarity: None,
                        }),
                    );
                }
                LookupOutcome::Error(e) => {
                    tally.failed();
                    info!("SIREN lookup failed: {}", e);
                    flags.push(Flag::new(
                        Severity::Low,
                        FlagCode::ExternalSirenVerificationFailed,
                        "SIREN could not be verified (registry unreachable)",
                    ));
                }
            }
        }
        // low-confidence patterns: logged, never flagged
        for candidate in &potential {
            match registry.lookup_siren(candidate) {
                LookupOutcome::Found(info) => {
                    tally.definite();
                    check_company_info(&mut flags, candidate, &info, expected_name);
                }
                LookupOutcome::NotFound => {
                    tally.definite();
                    debug!("potential SIREN {} not in registry (not flagged)", candidate);
                }
                LookupOutcome::Error(e) => {
                    tally.failed();
                    debug!("potential SIREN lookup failed: {}", e);
                }
            }
        }
    }

    if let Some(vat_service) = &ctx.services.vat {
        let vats: BTreeSet<String> = extract_french_vat(&text)
            .into_iter()
            .filter(|v| validate_french_vat(v))
            .collect();
        for vat in vats {
            match vat_service.validate("FR", &vat[2..]) {
                VatOutcome::Valid { .. } => tally.definite(),
                VatOutcome::Invalid => {
                    tally.definite();
                    flags.push(
                        Flag::new(
                            Severity::Critical,
                            FlagCode::ExternalVatInvalid,
                            format!("VAT number {} is rejected by the validation service", vat),
                        )
                        .with_details(FlagDetails::RegistryReport {
                            identifier: vat.clone(),
                            registered_name: None,
                            status: Some("invalid".into()),
                            similarity: None,
                        }),
                    );
                }
                VatOutcome::Error(e) => {
                    tally.failed();
                    info!("VAT validation failed: {}", e);
                    flags.push(Flag::new(
                        Severity::Low,
                        FlagCode::ExternalVatVerificationFailed,
                        "VAT number could not be verified (service unreachable)",
                    ));
                }
            }
        }
    }

    if let Some(reputation) = &ctx.services.reputation {
        match reputation.reputation(&ctx.bundle.content_hash) {
            ReputationOutcome::Malicious {
                positives, total, ..
            } => {
                tally.definite();
                flags.push(Flag::new(
                    Severity::Critical,
                    FlagCode::ExternalFileReputation,
                    format!(
                        "The file hash is flagged malicious ({}/{} engines)",
                        positives, total
                    ),
                ));
            }
            ReputationOutcome::Clean | ReputationOutcome::Unknown => tally.definite(),
            ReputationOutcome::Error(e) => {
                tally.failed();
                info!("reputation lookup failed: {}", e);
                flags.push(Flag::new(
                    Severity::Low,
                    FlagCode::ExternalReputationFailed,
                    "File reputation could not be checked",
                ));
            }
        }
    }

    let confidence = if tally.attempted == 0 {
        0.1
    } else {
        0.5 + 0.5 * (tally.succeeded as f64 / tally.attempted as f64)
    };
    ModuleResult::from_flags(ModuleName::External, flags, confidence)
}
