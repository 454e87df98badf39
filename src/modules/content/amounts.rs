//! Amount extraction.
//!
//! Handles the European convention (`1 234,56`), the US convention
//! (`1,234.56`) and bare numbers next to a currency symbol. Amounts below
//! 1.0 are noise (quantities, percentages) and are filtered out.

use crate::model::{Flag, FlagCode, FlagDetails, Severity};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref EU_AMOUNT: Regex =
        Regex::new(r"\b\d{1,3}(?:[ \u{00A0}\u{202F}]\d{3})*,\d{2}\b").unwrap();
    static ref US_AMOUNT: Regex = Regex::new(r"\b\d{1,3}(?:,\d{3})+\.\d{2}\b").unwrap();
    static ref SYMBOL_AMOUNT: Regex = Regex::new(
        r"(?:[€$£]\s*(\d+(?:[.,]\d{1,2})?))|(?:(\d+(?:[.,]\d{1,2})?)\s*(?:[€$£]|EUR|USD|GBP)\b)"
    )
    .unwrap();
}

/// Occurrence threshold above which a repeated amount is flagged.
const REPEAT_THRESHOLD: usize = 3;

fn parse_eu(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    cleaned.replace(',', ".").parse().ok()
}

fn parse_us(s: &str) -> Option<f64> {
    s.replace(',', "").parse().ok()
}

fn overlaps(taken: &[(usize, usize)], start: usize, end: usize) -> bool {
    taken.iter().any(|&(s, e)| start < e && s < end)
}

/// Extract all monetary amounts from the text.
pub fn extract_amounts(text: &str) -> Vec<f64> {
    let mut taken: Vec<(usize, usize)> = Vec::new();
    let mut out = Vec::new();
    for m in EU_AMOUNT.find_iter(text) {
        if let Some(v) = parse_eu(m.as_str()) {
            taken.push((m.start(), m.end()));
            out.push(v);
        }
    }
    for m in US_AMOUNT.find_iter(text) {
        if overlaps(&taken, m.start(), m.end()) {
            continue;
        }
        if let Some(v) = parse_us(m.as_str()) {
            taken.push((m.start(), m.end()));
            out.push(v);
        }
    }
    for caps in SYMBOL_AMOUNT.captures_iter(text) {
        let group = caps.get(1).or_else(|| caps.get(2));
        let m = match group {
            Some(m) => m,
            None => continue,
        };
        if overlaps(&taken, m.start(), m.end()) {
            continue;
        }
        if let Some(v) = parse_eu(m.as_str()).or_else(|| m.as_str().parse().ok()) {
            taken.push((m.start(), m.end()));
            out.push(v);
        }
    }
    out.retain(|v| *v >= 1.0);
    out
}

/// Flag an amount that recurs suspiciously often.
pub fn check_duplicate_amounts(amounts: &[f64]) -> Option<Flag> {
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for &a in amounts {
        let key = (a * 100.0).round() as u64;
        let entry = counts.entry(key).or_insert((a, 0));
        entry.1 += 1;
    }
    let (amount, occurrences) = counts
        .values()
        .filter(|(_, n)| *n > REPEAT_THRESHOLD)
        .max_by_key(|(_, n)| *n)
        .copied()?;
    Some(
        Flag::new(
            Severity::Low,
            FlagCode::ContentRepeatedAmount,
            format!("The amount {:.2} appears {} times", amount, occurrences),
        )
        .with_details(FlagDetails::AmountRepetition {
            amount,
            occurrences,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn european_format() {
        let amounts = extract_amounts("Total TTC : 1 234,56 EUR");
        assert_eq!(amounts, vec![1234.56]);
        let nbsp = extract_amounts("Total : 12\u{00A0}345,00");
        assert_eq!(nbsp, vec![12345.0]);
    }

    #[test]
    fn us_format() {
        let amounts = extract_amounts("Amount due: 1,234.56");
        assert_eq!(amounts, vec![1234.56]);
    }

    #[test]
    fn symbol_anchored() {
        let amounts = extract_amounts("Prix: € 42 et aussi 19,99 € et 7 EUR");
        assert!(amounts.contains(&42.0));
        assert!(amounts.contains(&19.99));
        assert!(amounts.contains(&7.0));
    }

    #[test]
    fn small_values_filtered() {
        let amounts = extract_amounts("TVA 0,55 € et total 10,00 €");
        assert_eq!(amounts, vec![10.0]);
    }

    #[test]
    fn repeated_amount_flagged_above_threshold() {
        let four = vec![99.9, 99.9, 99.9, 99.9];
        let flag = check_duplicate_amounts(&four).unwrap();
        assert_eq!(flag.code, FlagCode::ContentRepeatedAmount);
        assert_eq!(flag.severity, Severity::Low);

        let three = vec![99.9, 99.9, 99.9];
        assert!(check_duplicate_amounts(&three).is_none());
    }
}
