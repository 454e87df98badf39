//! Date extraction and date-logic checks.
//!
//! Three cooperating parsers run in order (full French month names, then
//! day-first numeric forms, then abbreviated month + two-digit year) and
//! deduplicate on (date, matched substring lowercased). Each date carries
//! up to 60 characters of line-local context, which a longest-match-first
//! keyword table turns into a date type. Invalid calendar dates are
//! discarded silently.

use crate::model::{Flag, FlagCode, FlagDetails, Severity};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// What a date stands for in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateType {
    /// Invoice emission date
    Invoice,
    /// Service or delivery date
    Service,
    /// Payment due date
    Due,
    /// Order date
    Order,
    /// Document creation wording
    Creation,
    /// No identifying context
    Unknown,
}

/// One date found in the text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDate {
    /// The calendar date
    pub date: NaiveDate,
    /// The exact substring that matched
    pub source: String,
    /// Up to 60 chars of context, from line start to the match
    pub context: String,
    /// Classified role
    pub date_type: DateType,
}

fn month_number(name: &str) -> Option<u32> {
    let n = name.to_lowercase();
    let month = match n.as_str() {
        "janvier" | "janv" => 1,
        "février" | "fevrier" | "févr" | "fevr" => 2,
        "mars" => 3,
        "avril" | "avr" => 4,
        "mai" => 5,
        "juin" => 6,
        "juillet" | "juil" => 7,
        "août" | "aout" => 8,
        "septembre" | "sept" => 9,
        "octobre" | "oct" => 10,
        "novembre" | "nov" => 11,
        "décembre" | "decembre" | "déc" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

lazy_static! {
    static ref FRENCH_DATE: Regex = Regex::new(
        r"(?i)\b(1er|\d{1,2})\s+(janvier|février|fevrier|mars|avril|mai|juin|juillet|août|aout|septembre|octobre|novembre|décembre|decembre)\s+(\d{4})\b"
    )
    .unwrap();
    static ref NUMERIC_DATE: Regex = Regex::new(
        r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})(?:\s+(\d{1,2}):(\d{2}))?\b"
    )
    .unwrap();
    static ref NUMERIC_DATE_SHORT: Regex =
        Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2})\b").unwrap();
    static ref ABBREV_DATE: Regex = Regex::new(
        r"(?i)\b(janv|févr|fevr|avr|mai|juin|juil|août|aout|sept|oct|nov|déc|dec|mars)\.?\s+(\d{2})\b"
    )
    .unwrap();
}

/// Parse a single French date expression (`15 janvier 2024`, `1er mars 2023`).
pub fn parse_french_date(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let day: u32 = if day.eq_ignore_ascii_case("1er") {
        1
    } else {
        day.parse().ok()?
    };
    let month = month_number(month)?;
    let year: i32 = year.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Keyword table for typing a date from its context. Longest match wins, so
/// "date de commande" is never stolen by a shorter phrase.
const TYPE_KEYWORDS: &[(&str, DateType)] = &[
    ("date de facturation", DateType::Invoice),
    ("date de facture", DateType::Invoice),
    ("date d'émission", DateType::Invoice),
    ("date d'emission", DateType::Invoice),
    ("date facture", DateType::Invoice),
    ("facturé le", DateType::Invoice),
    ("facture le", DateType::Invoice),
    ("facture du", DateType::Invoice),
    ("émise le", DateType::Invoice),
    ("emise le", DateType::Invoice),
    ("date de livraison", DateType::Service),
    ("date de prestation", DateType::Service),
    ("période de prestation", DateType::Service),
    ("periode de prestation", DateType::Service),
    ("livraison", DateType::Service),
    ("livré le", DateType::Service),
    ("livre le", DateType::Service),
    ("prestation du", DateType::Service),
    ("date d'échéance", DateType::Due),
    ("date d'echeance", DateType::Due),
    ("date limite de paiement", DateType::Due),
    ("à payer avant", DateType::Due),
    ("a payer avant", DateType::Due),
    ("payable avant", DateType::Due),
    ("échéance", DateType::Due),
    ("echeance", DateType::Due),
    ("date de commande", DateType::Order),
    ("bon de commande", DateType::Order),
    ("commandé le", DateType::Order),
    ("commande le", DateType::Order),
    ("commande du", DateType::Order),
    ("date de création", DateType::Creation),
    ("date de creation", DateType::Creation),
    ("créé le", DateType::Creation),
    ("cree le", DateType::Creation),
];

/// Classify a date from its context, longest keyword phrase first.
pub fn identify_date_type(context: &str) -> DateType {
    let lowered = context.to_lowercase();
    let mut best: Option<(&str, DateType)> = None;
    for (phrase, ty) in TYPE_KEYWORDS {
        if lowered.contains(phrase) {
            match best {
                Some((current, _)) if current.len() >= phrase.len() => {}
                _ => best = Some((phrase, *ty)),
            }
        }
    }
    best.map(|(_, ty)| ty).unwrap_or(DateType::Unknown)
}

/// Up to 60 characters of context, from the start of the line to `at`.
fn line_context(text: &str, at: usize) -> String {
    let before = &text[..at];
    let line_start = before.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let line = &before[line_start..];
    let chars: Vec<char> = line.chars().collect();
    let keep = chars.len().min(60);
    chars[chars.len() - keep..].iter().collect()
}

fn push_unique(
    out: &mut Vec<ExtractedDate>,
    seen: &mut HashSet<(NaiveDate, String)>,
    text: &str,
    at: usize,
    date: NaiveDate,
    source: &str,
) {
    let key = (date, source.to_lowercase());
    if !seen.insert(key) {
        return;
    }
    let context = line_context(text, at);
    let date_type = identify_date_type(&context);
    out.push(ExtractedDate {
        date,
        source: source.to_string(),
        context,
        date_type,
    });
}

/// Dates written with full French month names.
pub fn find_french_dates(text: &str, out: &mut Vec<ExtractedDate>, seen: &mut HashSet<(NaiveDate, String)>) {
    for caps in FRENCH_DATE.captures_iter(text) {
        let whole = caps.get(0).expect("group 0");
        if let Some(date) = parse_french_date(&caps[1], &caps[2], &caps[3]) {
            push_unique(out, seen, text, whole.start(), date, whole.as_str());
        }
    }
}

/// Day-first numeric dates, 4-digit and 2-digit years.
pub fn find_numeric_dates(text: &str, out: &mut Vec<ExtractedDate>, seen: &mut HashSet<(NaiveDate, String)>) {
    for caps in NUMERIC_DATE.captures_iter(text) {
        let whole = caps.get(0).expect("group 0");
        let (day, month, year): (u32, u32, i32) = match (
            caps[1].parse(),
            caps[2].parse(),
            caps[3].parse(),
        ) {
            (Ok(d), Ok(m), Ok(y)) => (d, m, y),
            _ => continue,
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            push_unique(out, seen, text, whole.start(), date, whole.as_str());
        }
    }
    for caps in NUMERIC_DATE_SHORT.captures_iter(text) {
        let whole = caps.get(0).expect("group 0");
        let (day, month, yy): (u32, u32, i32) = match (
            caps[1].parse(),
            caps[2].parse(),
            caps[3].parse(),
        ) {
            (Ok(d), Ok(m), Ok(y)) => (d, m, y),
            _ => continue,
        };
        if let Some(date) = NaiveDate::from_ymd_opt(2000 + yy, month, day) {
            push_unique(out, seen, text, whole.start(), date, whole.as_str());
        }
    }
}

/// Abbreviated month + 2-digit year (`Avr 24`), read as the first of the month.
pub fn find_abbreviated_month_dates(
    text: &str,
    out: &mut Vec<ExtractedDate>,
    seen: &mut HashSet<(NaiveDate, String)>,
) {
    for caps in ABBREV_DATE.captures_iter(text) {
        let whole = caps.get(0).expect("group 0");
        let month = match month_number(&caps[1]) {
            Some(m) => m,
            None => continue,
        };
        let yy: i32 = match caps[2].parse() {
            Ok(y) => y,
            Err(_) => continue,
        };
        if let Some(date) = NaiveDate::from_ymd_opt(2000 + yy, month, 1) {
            push_unique(out, seen, text, whole.start(), date, whole.as_str());
        }
    }
}

/// Run all three parsers over the text, in order.
pub fn extract_dates_from_text(text: &str) -> Vec<ExtractedDate> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    find_french_dates(text, &mut out, &mut seen);
    find_numeric_dates(text, &mut out, &mut seen);
    find_abbreviated_month_dates(text, &mut out, &mut seen);
    out
}

/// Absolute plausibility checks: far-future and very old dates.
pub fn check_impossible_dates(dates: &[ExtractedDate], now: DateTime<Utc>) -> Vec<Flag> {
    let mut flags = Vec::new();
    let today = now.date_naive();
    if let Some(future) = dates.iter().find(|d| d.date > today + Duration::days(365)) {
        flags.push(
            Flag::new(
                Severity::Critical,
                FlagCode::ContentFarFutureDate,
                format!("The document mentions {}, more than a year ahead", future.date),
            )
            .with_details(date_details(future)),
        );
    }
    let floor = NaiveDate::from_ymd_opt(2000, 1, 1).expect("fixed date");
    if let Some(old) = dates.iter().find(|d| d.date < floor) {
        flags.push(
            Flag::new(
                Severity::Medium,
                FlagCode::ContentVeryOldDate,
                format!("The document mentions {}, before 2000", old.date),
            )
            .with_details(date_details(old)),
        );
    }
    flags
}

/// Invoice-typed dates must not lie in the future.
pub fn check_future_invoice_date(dates: &[ExtractedDate], now: DateTime<Utc>) -> Option<Flag> {
    let today = now.date_naive();
    let offending = dates
        .iter()
        .find(|d| d.date_type == DateType::Invoice && d.date > today + Duration::days(1))?;
    Some(
        Flag::new(
            Severity::Critical,
            FlagCode::ContentFutureInvoiceDate,
            format!("Invoice date {} lies in the future", offending.date),
        )
        .with_details(date_details(offending)),
    )
}

/// The invoice date other checks compare against: the earliest
/// invoice-typed date.
pub fn invoice_date(dates: &[ExtractedDate]) -> Option<NaiveDate> {
    dates
        .iter()
        .filter(|d| d.date_type == DateType::Invoice)
        .map(|d| d.date)
        .min()
}

/// Cross-date anachronisms relative to the invoice date.
pub fn check_date_logic(dates: &[ExtractedDate]) -> Vec<Flag> {
    let mut flags = Vec::new();
    let invoice = match invoice_date(dates) {
        Some(d) => d,
        None => return flags,
    };
    if let Some(service) = dates
        .iter()
        .find(|d| d.date_type == DateType::Service && d.date > invoice + Duration::days(1))
    {
        flags.push(
            Flag::new(
                Severity::High,
                FlagCode::ContentAnachronismService,
                format!(
                    "Service date {} is after the invoice date {}",
                    service.date, invoice
                ),
            )
            .with_details(date_details(service)),
        );
    }
    if let Some(due) = dates
        .iter()
        .find(|d| d.date_type == DateType::Due && d.date < invoice - Duration::days(1))
    {
        flags.push(
            Flag::new(
                Severity::High,
                FlagCode::ContentAnachronismDue,
                format!("Due date {} precedes the invoice date {}", due.date, invoice),
            )
            .with_details(date_details(due)),
        );
    }
    if let Some(order) = dates
        .iter()
        .find(|d| d.date_type == DateType::Order && d.date > invoice + Duration::days(1))
    {
        flags.push(
            Flag::new(
                Severity::High,
                FlagCode::ContentAnachronismOrder,
                format!(
                    "Order date {} is after the invoice date {}",
                    order.date, invoice
                ),
            )
            .with_details(date_details(order)),
        );
    }
    flags
}

fn date_details(date: &ExtractedDate) -> FlagDetails {
    FlagDetails::DateFinding {
        dates: vec![date.date.format("%Y-%m-%d").to_string()],
        context: Some(date.context.clone()),
    }
}
