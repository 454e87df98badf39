//! Scoring engine.
//!
//! Combines module results into the final trust score and risk level. The
//! aggregate is a confidence-weighted average, but two business rules sit
//! on top and must never be diluted:
//!
//! - one critical flag anywhere caps the score at 40 (then subtracts for
//!   every high and medium flag, floored at 5) and forces at least HIGH;
//! - two or more critical flags cap the score at 19 and force CRITICAL.
//!
//! This is the defense against a single weak module masking a certain
//! finding in another.

use crate::model::{AnalysisResult, Flag, ModuleName, ModuleResult, RiskLevel, Severity};

/// Weight applied to a module that is not in the fixed table.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Per-module weight in the aggregate.
pub fn module_weight(module: ModuleName) -> f64 {
    match module {
        ModuleName::Metadata => 1.0,
        ModuleName::Content => 1.2,
        ModuleName::Visual => 0.8,
        ModuleName::Fonts => 0.9,
        ModuleName::Images => 0.8,
        ModuleName::Structure => 1.3,
        ModuleName::Forensics => 1.0,
        ModuleName::External => 1.5,
        ModuleName::Twoddoc => DEFAULT_WEIGHT,
    }
}

/// Risk level for a trust score.
pub fn risk_level_for(score: u8) -> RiskLevel {
    match score {
        80..=u8::MAX => RiskLevel::Low,
        50..=79 => RiskLevel::Medium,
        20..=49 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

/// Count flags per severity across all modules.
pub fn count_flags_by_severity(modules: &[ModuleResult]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for module in modules {
        for flag in &module.flags {
            match flag.severity {
                Severity::Low => counts.low += 1,
                Severity::Medium => counts.medium += 1,
                Severity::High => counts.high += 1,
                Severity::Critical => counts.critical += 1,
            }
        }
    }
    counts
}

/// Flag totals per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    /// Critical flags
    pub critical: usize,
    /// High flags
    pub high: usize,
    /// Medium flags
    pub medium: usize,
    /// Low flags
    pub low: usize,
}

impl SeverityCounts {
    /// Total number of flags.
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Weighted confidence-average of module scores, before overrides.
fn weighted_average(modules: &[ModuleResult]) -> u8 {
    let mut numerator = 0.0f64;
    let mut denominator = 0.0f64;
    for module in modules {
        let w = module_weight(module.module) * module.confidence;
        numerator += module.score as f64 * w;
        denominator += w;
    }
    if denominator <= f64::EPSILON {
        // innocent until analyzable
        return 100;
    }
    (numerator / denominator).round().clamp(0.0, 100.0) as u8
}

/// Final trust score with the critical-flag overrides applied.
pub fn calculate_final_score(modules: &[ModuleResult]) -> u8 {
    let base = weighted_average(modules);
    let counts = count_flags_by_severity(modules);
    apply_overrides(base, &counts)
}

fn apply_overrides(base: u8, counts: &SeverityCounts) -> u8 {
    if counts.critical == 0 {
        return base;
    }
    let mut score = base.min(40) as i64;
    score -= 5 * counts.high as i64;
    score -= 2 * counts.medium as i64;
    let mut score = score.max(5) as u8;
    if counts.critical >= 2 {
        score = score.min(19);
    }
    score
}

/// Risk level with the critical-flag overrides applied.
pub fn calculate_risk_level(modules: &[ModuleResult], score: u8) -> RiskLevel {
    let counts = count_flags_by_severity(modules);
    let mut level = risk_level_for(score);
    if counts.critical >= 1 && level < RiskLevel::High {
        level = RiskLevel::High;
    }
    if counts.critical >= 2 {
        level = RiskLevel::Critical;
    }
    level
}

/// Collect every flag, stable-sorted by severity (critical first).
///
/// Within one severity, module order and then per-module insertion order
/// are preserved; sorting the output again yields the same sequence.
pub fn collect_all_flags(modules: &[ModuleResult]) -> Vec<(ModuleName, Flag)> {
    let mut all: Vec<(ModuleName, Flag)> = modules
        .iter()
        .flat_map(|m| m.flags.iter().map(move |f| (m.module, f.clone())))
        .collect();
    all.sort_by(|a, b| b.1.severity.cmp(&a.1.severity));
    all
}

/// Assemble the final result from module results.
pub fn create_analysis_result(
    content_hash: impl Into<String>,
    modules: Vec<ModuleResult>,
    analysis_time_ms: u64,
) -> AnalysisResult {
    let trust_score = calculate_final_score(&modules);
    let risk_level = calculate_risk_level(&modules, trust_score);
    AnalysisResult {
        content_hash: content_hash.into(),
        trust_score,
        risk_level,
        analysis_time_ms,
        modules,
    }
}
