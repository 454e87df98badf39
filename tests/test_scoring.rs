//! Scoring engine: thresholds, overrides, collection and serialization.

use veridoc::model::{
    AnalysisResult, Flag, FlagCode, FlagDetails, ModuleName, ModuleResult, RiskLevel, Severity,
};
use veridoc::scoring::{
    calculate_final_score, calculate_risk_level, collect_all_flags, count_flags_by_severity,
    create_analysis_result,
};

fn module(name: ModuleName, score: u8, confidence: f64, flags: Vec<Flag>) -> ModuleResult {
    ModuleResult {
        module: name,
        score,
        confidence,
        flags,
    }
}

fn all_clean() -> Vec<ModuleResult> {
    ModuleName::ALL
        .iter()
        .map(|&m| module(m, 100, 1.0, vec![]))
        .collect()
}

#[test]
fn scenario_clean_invoice() {
    let result = create_analysis_result("ff".repeat(32), all_clean(), 12);
    assert_eq!(result.trust_score, 100);
    assert_eq!(result.risk_level, RiskLevel::Low);
    let summary = veridoc::generate_rich_summary(&result);
    assert_eq!(summary.verdict, "This document appears legitimate.");
}

#[test]
fn scenario_ai_producer() {
    let mut modules = all_clean();
    modules[0] = module(
        ModuleName::Metadata,
        50,
        1.0,
        vec![Flag::new(
            Severity::Critical,
            FlagCode::MetaAiGenerated,
            "AI-generated document",
        )],
    );
    let result = create_analysis_result("00".repeat(32), modules, 3);
    assert!(result.trust_score <= 40);
    assert!(result.risk_level >= RiskLevel::High);
}

#[test]
fn scenario_two_criticals() {
    let mut modules = all_clean();
    modules[0] = module(
        ModuleName::Metadata,
        50,
        1.0,
        vec![Flag::new(Severity::Critical, FlagCode::MetaAiGenerated, "AI")],
    );
    modules[1] = module(
        ModuleName::Content,
        50,
        1.0,
        vec![Flag::new(
            Severity::Critical,
            FlagCode::ContentInconsistentReferences,
            "two references",
        )],
    );
    let result = create_analysis_result("00".repeat(32), modules, 3);
    assert!(result.trust_score <= 19);
    assert_eq!(result.risk_level, RiskLevel::Critical);
}

#[test]
fn risk_is_monotone_in_score() {
    // levels only move toward Low as the score grows
    for score in 1..=100u8 {
        assert!(
            veridoc::scoring::risk_level_for(score) <= veridoc::scoring::risk_level_for(score - 1)
        );
    }
    // spot checks at the documented boundaries
    assert_eq!(veridoc::scoring::risk_level_for(19), RiskLevel::Critical);
    assert_eq!(veridoc::scoring::risk_level_for(20), RiskLevel::High);
    assert_eq!(veridoc::scoring::risk_level_for(49), RiskLevel::High);
    assert_eq!(veridoc::scoring::risk_level_for(50), RiskLevel::Medium);
    assert_eq!(veridoc::scoring::risk_level_for(79), RiskLevel::Medium);
    assert_eq!(veridoc::scoring::risk_level_for(80), RiskLevel::Low);
}

#[test]
fn disabled_modules_carry_no_weight() {
    let mut modules = all_clean();
    for m in &mut modules {
        m.confidence = 0.0;
        m.score = 0;
    }
    assert_eq!(calculate_final_score(&modules), 100);
    assert_eq!(
        calculate_risk_level(&modules, 100),
        RiskLevel::Low
    );
}

#[test]
fn collection_orders_and_counts() {
    let modules = vec![
        module(
            ModuleName::Metadata,
            55,
            1.0,
            vec![
                Flag::new(Severity::Medium, FlagCode::MetaNoMetadata, "m1"),
                Flag::new(Severity::Critical, FlagCode::MetaFutureCreationDate, "m2"),
            ],
        ),
        module(
            ModuleName::Structure,
            70,
            1.0,
            vec![
                Flag::new(Severity::High, FlagCode::StructIncrementalUpdates, "s1"),
                Flag::new(Severity::Medium, FlagCode::StructAcroformDetected, "s2"),
            ],
        ),
    ];
    let counts = count_flags_by_severity(&modules);
    assert_eq!(counts.critical, 1);
    assert_eq!(counts.high, 1);
    assert_eq!(counts.medium, 2);
    assert_eq!(counts.total(), 4);

    let collected = collect_all_flags(&modules);
    let messages: Vec<&str> = collected.iter().map(|(_, f)| f.message.as_str()).collect();
    // severity buckets, module order preserved inside a bucket
    assert_eq!(messages, vec!["m2", "s1", "m1", "s2"]);
}

#[test]
fn full_result_round_trips_with_details() {
    let modules = vec![module(
        ModuleName::Structure,
        70,
        0.9,
        vec![Flag::new(
            Severity::High,
            FlagCode::StructIncrementalUpdates,
            "saved twice",
        )
        .with_details(FlagDetails::RevisionReport {
            eof_count: 2,
            edit_count: 1,
            revisions: vec![veridoc::model::RevisionSummary {
                revision: 2,
                pages_touched: vec![0],
                added_lines: vec!["Total TTC : 999,00".into()],
                removed_lines: vec!["Total TTC : 100,00".into()],
                changed_kinds: vec!["content-stream".into()],
            }],
        })],
    )];
    let result = create_analysis_result("ab".repeat(32), modules, 8);
    let json = serde_json::to_string_pretty(&result).unwrap();
    let parsed: AnalysisResult = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, result);
    assert!(json.contains("STRUCT_INCREMENTAL_UPDATES"));
    assert!(json.contains("\"severity\": \"high\""));
}
