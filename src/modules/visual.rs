//! Visual analysis: QR payloads and watermark text.
//!
//! QR codes on invoices should point at the issuer. Shortened URLs,
//! throwaway TLDs, and domains that disagree with the document's own
//! contact lines are phishing patterns. Watermark detection scans the text
//! layer for SPECIMEN/VOID-class tokens and for converter watermarks.

use crate::model::{Flag, FlagCode, FlagDetails, ModuleName, ModuleResult, Severity};
use crate::modules::ModuleContext;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

/// URL shortener hosts.
const SHORTENER_DOMAINS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "goo.gl",
    "t.co",
    "ow.ly",
    "is.gd",
    "buff.ly",
    "cutt.ly",
    "rb.gy",
    "shorturl.at",
];

/// TLDs with an outsized share of abuse.
const SUSPICIOUS_TLDS: &[&str] = &[
    ".tk", ".ml", ".ga", ".cf", ".gq", ".xyz", ".top", ".click", ".link", ".zip",
];

/// Social platforms excluded when deriving expected domains from the text.
const SOCIAL_DOMAINS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
];

/// Watermark tokens and their severities.
const WATERMARK_TOKENS: &[(&str, Severity)] = &[
    (r"SP[EÉ]CIMEN", Severity::High),
    (r"VOID", Severity::High),
    (r"ANNUL[EÉ]", Severity::High),
    (r"CANCELLED", Severity::High),
    (r"NOT\s+VALID", Severity::High),
    (r"NON\s+VALIDE", Severity::High),
    (r"COPY", Severity::Medium),
    (r"COPIE", Severity::Medium),
    (r"DRAFT", Severity::Medium),
    (r"BROUILLON", Severity::Medium),
    (r"DUPLICATE", Severity::Medium),
    (r"DUPLICATA", Severity::Medium),
    (r"SAMPLE", Severity::Medium),
    (r"TEST", Severity::Low),
    (r"CONFIDENTIAL", Severity::Low),
];

/// Converter names whose visible watermark is a high-severity signal.
const CONVERTER_NAMES: &[&str] = &[
    "ilovepdf", "smallpdf", "sejda", "pdfescape", "dochub", "pdffiller", "camscanner",
];

/// Generic unregistered-tool phrases.
const TRIAL_PHRASES: &[&str] = &[
    "trial version",
    "evaluation only",
    "free version",
    "unregistered",
    "version d'essai",
];

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@([A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap();
    static ref TEXT_URL: Regex =
        Regex::new(r"(?i)\bhttps?://([A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap();
    static ref WWW_URL: Regex = Regex::new(r"(?i)\bwww\.([A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap();
}

/// A decoded QR payload located on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct QrCodeInfo {
    /// Decoded payload
    pub payload: String,
    /// Zero-based page index
    pub page: usize,
}

/// Pull the host out of a URL without a full URL parser: scheme and
/// userinfo stripped, port removed, lowercased.
pub fn extract_domain_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .or_else(|| trimmed.strip_prefix("HTTPS://"))
        .or_else(|| trimmed.strip_prefix("HTTP://"))?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    let host = host.split(':').next()?;
    if host.is_empty() || !host.contains('.') {
        return None;
    }
    Some(host.to_lowercase())
}

/// Domains the document itself claims (emails and URLs in the text),
/// excluding common social platforms.
pub fn extract_sender_domains(text: &str) -> Vec<String> {
    let mut out = BTreeSet::new();
    for caps in EMAIL.captures_iter(text) {
        out.insert(caps[1].to_lowercase());
    }
    for caps in TEXT_URL.captures_iter(text) {
        out.insert(caps[1].to_lowercase());
    }
    for caps in WWW_URL.captures_iter(text) {
        out.insert(caps[1].to_lowercase());
    }
    out.retain(|d| !SOCIAL_DOMAINS.iter().any(|s| d == s || d.ends_with(&format!(".{}", s))));
    out.into_iter().collect()
}

fn host_matches(host: &str, expected: &str) -> bool {
    host == expected || host.ends_with(&format!(".{}", expected))
}

/// Check decoded QR payloads against URL policy.
pub fn check_qr_codes(codes: &[QrCodeInfo], expected_domains: &[String]) -> Vec<Flag> {
    let mut flags = Vec::new();
    for code in codes {
        let host = match extract_domain_from_url(&code.payload) {
            Some(h) => h,
            None => continue, // non-URL payloads carry no URL policy
        };
        if SHORTENER_DOMAINS.iter().any(|s| host.contains(s)) {
            flags.push(
                Flag::new(
                    Severity::High,
                    FlagCode::VisualQrUrlShortener,
                    format!("QR code points at a URL shortener ({})", host),
                )
                .with_details(FlagDetails::UrlReport {
                    url: code.payload.clone(),
                    host: host.clone(),
                    expected_domains: expected_domains.to_vec(),
                }),
            );
        }
        if SUSPICIOUS_TLDS.iter().any(|t| host.ends_with(t)) {
            flags.push(
                Flag::new(
                    Severity::Medium,
                    FlagCode::VisualQrSuspiciousTld,
                    format!("QR code domain uses a suspicious TLD ({})", host),
                )
                .with_details(FlagDetails::UrlReport {
                    url: code.payload.clone(),
                    host: host.clone(),
                    expected_domains: expected_domains.to_vec(),
                }),
            );
        }
        if !expected_domains.is_empty()
            && !expected_domains.iter().any(|e| host_matches(&host, e))
        {
            flags.push(
                Flag::new(
                    Severity::Critical,
                    FlagCode::VisualQrDomainMismatch,
                    format!(
                        "QR code domain {} does not match the document's sender",
                        host
                    ),
                )
                .with_details(FlagDetails::UrlReport {
                    url: code.payload.clone(),
                    host,
                    expected_domains: expected_domains.to_vec(),
                }),
            );
        }
    }
    flags
}

lazy_static! {
    static ref WATERMARK_REGEXES: Vec<(Regex, Severity, &'static str)> = WATERMARK_TOKENS
        .iter()
        .map(|(pattern, severity)| {
            (
                Regex::new(&format!(r"(?i)\b{}\b", pattern)).expect("watermark regex"),
                *severity,
                *pattern,
            )
        })
        .collect();
}

/// Scan page text for watermark tokens; one flag per distinct token.
pub fn check_watermarks(text_by_page: &[String]) -> Vec<Flag> {
    let mut flags = Vec::new();
    for (regex, severity, _pattern) in WATERMARK_REGEXES.iter() {
        let mut pages = Vec::new();
        let mut token = None;
        for (page, text) in text_by_page.iter().enumerate() {
            if let Some(m) = regex.find(text) {
                pages.push(page);
                token.get_or_insert_with(|| m.as_str().to_uppercase());
            }
        }
        if let Some(token) = token {
            flags.push(
                Flag::new(
                    *severity,
                    FlagCode::VisualWatermark,
                    format!("Watermark text \"{}\" present", token),
                )
                .with_details(FlagDetails::WatermarkReport { token, pages }),
            );
        }
    }
    flags
}

/// Visible converter watermark text.
pub fn check_converter_watermarks(text: &str) -> Option<Flag> {
    let lowered = text.to_lowercase();
    if let Some(name) = CONVERTER_NAMES.iter().find(|n| lowered.contains(*n)) {
        return Some(
            Flag::new(
                Severity::High,
                FlagCode::VisualConverterWatermark,
                format!("Visible converter watermark ({})", name),
            )
            .with_details(FlagDetails::WatermarkReport {
                token: name.to_string(),
                pages: vec![],
            }),
        );
    }
    if let Some(phrase) = TRIAL_PHRASES.iter().find(|p| lowered.contains(*p)) {
        return Some(
            Flag::new(
                Severity::Medium,
                FlagCode::VisualConverterWatermark,
                format!("Visible unregistered-tool watermark (\"{}\")", phrase),
            )
            .with_details(FlagDetails::WatermarkReport {
                token: phrase.to_string(),
                pages: vec![],
            }),
        );
    }
    None
}

/// Decode QR codes on every page through the injected primitives.
fn scan_qr_codes(ctx: &ModuleContext) -> Option<Vec<QrCodeInfo>> {
    let rasterizer = ctx.services.rasterizer.as_ref()?;
    let decoder = ctx.services.barcode.as_ref()?;
    let mut codes = Vec::new();
    for page in 0..ctx.bundle.page_count {
        let bitmap = match rasterizer.render(page, 2.0) {
            Some(b) => b,
            None => continue,
        };
        for decoded in decoder.decode_qr(&bitmap) {
            codes.push(QrCodeInfo {
                payload: String::from_utf8_lossy(&decoded.payload).into_owned(),
                page,
            });
        }
        // the bitmap drops here, before the next page renders
    }
    Some(codes)
}

/// Run the visual module.
pub fn analyze(ctx: &ModuleContext) -> ModuleResult {
    let mut flags = Vec::new();
    let mut scanned = false;
    if ctx.options.enable_qr {
        if let Some(codes) = scan_qr_codes(ctx) {
            scanned = true;
            let expected = match &ctx.options.expected_domains {
                Some(domains) => domains.clone(),
                None => extract_sender_domains(&ctx.bundle.full_text()),
            };
            flags.extend(check_qr_codes(&codes, &expected));
        }
    }
    flags.extend(check_watermarks(&ctx.bundle.text_by_page));
    if let Some(flag) = check_converter_watermarks(&ctx.bundle.full_text()) {
        flags.push(flag);
    }
    let confidence = if scanned { 0.9 } else { 0.6 };
    ModuleResult::from_flags(ModuleName::Visual, flags, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_extraction() {
        assert_eq!(
            extract_domain_from_url("https://www.edf.fr/facture?id=1"),
            Some("www.edf.fr".into())
        );
        assert_eq!(
            extract_domain_from_url("http://user:pw@evil.tk:8080/x"),
            Some("evil.tk".into())
        );
        assert_eq!(extract_domain_from_url("not a url"), None);
        assert_eq!(extract_domain_from_url("mailto:a@b.fr"), None);
    }

    fn qr(payload: &str) -> QrCodeInfo {
        QrCodeInfo {
            payload: payload.into(),
            page: 0,
        }
    }

    #[test]
    fn shortener_and_tld() {
        let flags = check_qr_codes(&[qr("https://bit.ly/3xYz")], &[]);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].code, FlagCode::VisualQrUrlShortener);

        let flags = check_qr_codes(&[qr("https://paiement-edf.xyz/pay")], &[]);
        assert_eq!(flags[0].code, FlagCode::VisualQrSuspiciousTld);
    }

    #[test]
    fn domain_mismatch_needs_expectations() {
        let expected = vec!["edf.fr".to_string()];
        let flags = check_qr_codes(&[qr("https://evil.example.com/pay")], &expected);
        assert!(flags.iter().any(|f| f.code == FlagCode::VisualQrDomainMismatch));
        assert!(flags
            .iter()
            .any(|f| f.severity == Severity::Critical));

        // exact and subdomain matches pass
        let flags = check_qr_codes(&[qr("https://edf.fr/x")], &expected);
        assert!(flags.is_empty());
        let flags = check_qr_codes(&[qr("https://pay.edf.fr/x")], &expected);
        assert!(flags.is_empty());

        // no expectations, no mismatch check
        let flags = check_qr_codes(&[qr("https://anything.example.com")], &[]);
        assert!(flags.is_empty());
    }

    #[test]
    fn sender_domains_from_text() {
        let text = "Contact: service@edf.fr — suivez-nous sur https://facebook.com/edf \
                    et https://www.edf.fr";
        let domains = extract_sender_domains(text);
        assert!(domains.contains(&"edf.fr".to_string()));
        assert!(domains.contains(&"www.edf.fr".to_string()));
        assert!(!domains.iter().any(|d| d.contains("facebook")));
    }

    #[test]
    fn watermark_severities() {
        let pages = vec!["FACTURE SPECIMEN — ne pas payer".to_string()];
        let flags = check_watermarks(&pages);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].severity, Severity::High);

        let pages = vec!["Ceci est un BROUILLON".to_string()];
        assert_eq!(check_watermarks(&pages)[0].severity, Severity::Medium);

        let pages = vec!["environnement de TEST".to_string()];
        assert_eq!(check_watermarks(&pages)[0].severity, Severity::Low);

        // word boundary: "latest" is not "test"
        let pages = vec!["the latest invoice".to_string()];
        assert!(check_watermarks(&pages).is_empty());
    }

    #[test]
    fn converter_watermarks() {
        let high = check_converter_watermarks("Edited with iLovePDF — www.ilovepdf.com").unwrap();
        assert_eq!(high.severity, Severity::High);
        let medium = check_converter_watermarks("Produced with X — trial version").unwrap();
        assert_eq!(medium.severity, Severity::Medium);
        assert!(check_converter_watermarks("une facture normale").is_none());
    }
}
