//! Human-readable summaries.
//!
//! Groups flags by user-facing theme (not by module) and renders a short
//! verdict plus bullet findings. Template-based on purpose: instant,
//! offline, and deterministic.

use crate::model::{AnalysisResult, AnalysisSummary, Flag, FlagCode, RiskLevel, Severity, Theme};
use crate::scoring::collect_all_flags;

/// Render a time delta for humans.
///
/// Seconds under a minute, minutes under an hour, hours under a day, then
/// whole days rounded half-up on hours (35 h reads "1 day", 36 h reads
/// "2 days").
pub fn format_delta(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        plural(seconds, "second")
    } else if seconds < 3600 {
        plural(seconds / 60, "minute")
    } else if seconds < 86_400 {
        plural(seconds / 3600, "hour")
    } else {
        let hours = seconds / 3600;
        let days = ((hours + 12) / 24).max(1);
        plural(days, "day")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

fn verdict_for(result: &AnalysisResult) -> String {
    let has_flags = result.flag_count() > 0;
    match result.risk_level {
        RiskLevel::Low if !has_flags => "This document appears legitimate.".to_string(),
        RiskLevel::Low => "This document looks trustworthy overall.".to_string(),
        RiskLevel::Medium => "Some details of this document deserve a closer look.".to_string(),
        RiskLevel::High => "We suspect this document has been altered.".to_string(),
        RiskLevel::Critical => "This document shows strong signs of fraud.".to_string(),
    }
}

fn theme_label(theme: Theme) -> &'static str {
    match theme {
        Theme::Tampering => "Editing traces",
        Theme::Dates => "Date coherence",
        Theme::Identity => "Company identity",
        Theme::Software => "Producing software",
        Theme::Visual => "Visible marks",
        Theme::Structure => "File structure",
        Theme::Images => "Embedded images",
        Theme::External => "Registry checks",
        Theme::Barcode => "2D-DOC barcode",
    }
}

const THEME_ORDER: [Theme; 9] = [
    Theme::Tampering,
    Theme::Barcode,
    Theme::Dates,
    Theme::Identity,
    Theme::External,
    Theme::Software,
    Theme::Images,
    Theme::Visual,
    Theme::Structure,
];

/// Positive signals worth surfacing even though they are not problems.
fn positive_bullets(result: &AnalysisResult) -> Vec<String> {
    let mut out = Vec::new();
    for module in &result.modules {
        for flag in &module.flags {
            if flag.code == FlagCode::StructSignatureTrusted {
                out.push(
                    "The document carries a digital signature from a recognized authority."
                        .to_string(),
                );
            }
        }
    }
    out
}

fn is_positive(flag: &Flag) -> bool {
    flag.code == FlagCode::StructSignatureTrusted
}

/// Build the rich summary for a result.
pub fn generate_rich_summary(result: &AnalysisResult) -> AnalysisSummary {
    let verdict = verdict_for(result);
    let all = collect_all_flags(&result.modules);
    let mut bullets = Vec::new();

    for theme in THEME_ORDER {
        let themed: Vec<&Flag> = all
            .iter()
            .map(|(_, f)| f)
            .filter(|f| f.code.theme() == theme && !is_positive(f))
            .collect();
        if themed.is_empty() {
            continue;
        }
        let worst = themed
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Low);
        let mut sentence = format!("{}: {}", theme_label(theme), themed[0].message);
        if themed.len() > 1 {
            sentence.push_str(&format!(" (+{} related findings)", themed.len() - 1));
        }
        if worst >= Severity::High {
            sentence.push_str(" — significant.");
        } else {
            sentence.push('.');
        }
        bullets.push(sentence);
    }

    bullets.extend(positive_bullets(result));

    if bullets.is_empty() {
        bullets.push("No suspicious signal was raised by any analysis module.".to_string());
    }
    AnalysisSummary { verdict, bullets }
}

/// Render the summary as plain text.
pub fn generate_summary(result: &AnalysisResult) -> String {
    let rich = generate_rich_summary(result);
    let mut out = String::new();
    out.push_str(&rich.verdict);
    out.push('\n');
    for bullet in &rich.bullets {
        out.push_str("  - ");
        out.push_str(bullet);
        out.push('\n');
    }
    out.push_str(&format!(
        "Trust score: {}/100 ({})\n",
        result.trust_score, result.risk_level
    ));
    out
}
