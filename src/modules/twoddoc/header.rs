//! 2D-DOC header parsing.
//!
//! Every 2D-DOC starts with the literal `DC`, a two-char version that fixes
//! the header size (01/02 → 22 chars, 03 → 24, 04 → 26), then fixed-width
//! fields: CA id (4), certificate id (4), emission date (4 hex), signature
//! date (4 hex), document type (2), plus a perimeter (2, version ≥ 03) and
//! a country (2, version 04). Dates count days since 2000-01-01 in
//! uppercase hex; `FFFF` means absent.

use super::TwoDDocError;
use chrono::{Duration, NaiveDate};

/// Parsed header of a 2D-DOC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoDDocHeader {
    /// Specification version (1–4)
    pub version: u8,
    /// Certification-authority identifier
    pub ca_id: String,
    /// Certificate identifier
    pub cert_id: String,
    /// Emission date, absent when encoded `FFFF`
    pub emission_date: Option<NaiveDate>,
    /// Signature date, absent when encoded `FFFF`
    pub signature_date: Option<NaiveDate>,
    /// Document type code (`01` = justificatif de domicile, `04` = avis
    /// d'impôt, …)
    pub doc_type: String,
    /// Perimeter (version ≥ 3)
    pub perimeter: Option<String>,
    /// Emitting country (version 4)
    pub country: Option<String>,
}

/// 2000-01-01, the epoch of 2D-DOC dates.
fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).expect("fixed date")
}

/// Header size for a version, `None` for unknown versions.
pub fn header_len(version: u8) -> Option<usize> {
    match version {
        1 | 2 => Some(22),
        3 => Some(24),
        4 => Some(26),
        _ => None,
    }
}

/// Decode a 4-hex-char day offset. `FFFF` is the explicit absent marker.
pub fn parse_hex_date(hex: &str) -> Result<Option<NaiveDate>, TwoDDocError> {
    if hex.len() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TwoDDocError::Header(format!("bad hex date '{}'", hex)));
    }
    if hex == "FFFF" {
        return Ok(None);
    }
    let days = u16::from_str_radix(hex, 16)
        .map_err(|_| TwoDDocError::Header(format!("bad hex date '{}'", hex)))?;
    Ok(Some(epoch() + Duration::days(days as i64)))
}

/// Encode a date as 4 uppercase hex chars; `None` becomes `FFFF`.
pub fn date_to_hex(date: Option<NaiveDate>) -> String {
    match date {
        None => "FFFF".to_string(),
        Some(d) => {
            let days = (d - epoch()).num_days().clamp(0, 0xFFFE);
            format!("{:04X}", days)
        }
    }
}

/// Parse a header off the front of `input`; returns the header and the
/// message remainder.
pub fn parse_header(input: &str) -> Result<(TwoDDocHeader, &str), TwoDDocError> {
    if !input.starts_with("DC") {
        return Err(TwoDDocError::Header("missing DC marker".into()));
    }
    let version: u8 = input
        .get(2..4)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| TwoDDocError::Header("unreadable version".into()))?;
    let len = header_len(version)
        .ok_or_else(|| TwoDDocError::Header(format!("unknown version {:02}", version)))?;
    if input.len() < len {
        return Err(TwoDDocError::Header(format!(
            "header truncated: {} < {}",
            input.len(),
            len
        )));
    }
    if !input.as_bytes()[..len].is_ascii() {
        return Err(TwoDDocError::Header("non-ASCII header zone".into()));
    }
    let field = |from: usize, width: usize| input[from..from + width].to_string();
    let header = TwoDDocHeader {
        version,
        ca_id: field(4, 4),
        cert_id: field(8, 4),
        emission_date: parse_hex_date(&input[12..16])?,
        signature_date: parse_hex_date(&input[16..20])?,
        doc_type: field(20, 2),
        perimeter: if version >= 3 { Some(field(22, 2)) } else { None },
        country: if version >= 4 { Some(field(24, 2)) } else { None },
    };
    Ok((header, &input[len..]))
}

/// Build a header string — the inverse of [`parse_header`], used by tests
/// and fixtures.
#[allow(clippy::too_many_arguments)]
pub fn build_header(
    version: u8,
    ca_id: &str,
    cert_id: &str,
    emission: Option<NaiveDate>,
    signature: Option<NaiveDate>,
    doc_type: &str,
    perimeter: Option<&str>,
    country: Option<&str>,
) -> String {
    let mut out = format!(
        "DC{:02}{:<4}{:<4}{}{}{:<2}",
        version,
        ca_id,
        cert_id,
        date_to_hex(emission),
        date_to_hex(signature),
        doc_type
    );
    if version >= 3 {
        out.push_str(perimeter.unwrap_or("01"));
    }
    if version >= 4 {
        out.push_str(country.unwrap_or("FR"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_dates() {
        assert_eq!(parse_hex_date("FFFF").unwrap(), None);
        assert_eq!(parse_hex_date("0000").unwrap(), Some(epoch()));
        assert_eq!(
            parse_hex_date("0001").unwrap(),
            Some(NaiveDate::from_ymd_opt(2000, 1, 2).unwrap())
        );
        assert!(parse_hex_date("ZZZZ").is_err());
        assert!(parse_hex_date("123").is_err());
    }

    #[test]
    fn hex_date_roundtrip_bounds() {
        // the codec covers 2000-01-01 through 2179-06-06
        let last = epoch() + Duration::days(0xFFFE);
        assert_eq!(last, NaiveDate::from_ymd_opt(2179, 6, 6).unwrap());
        assert_eq!(parse_hex_date(&date_to_hex(Some(last))).unwrap(), Some(last));
    }

    #[test]
    fn v02_header() {
        let emission = NaiveDate::from_ymd_opt(2023, 5, 10);
        let raw = build_header(2, "FR00", "0001", emission, emission, "04", None, None);
        assert_eq!(raw.len(), 22);
        let (header, rest) = parse_header(&raw).unwrap();
        assert_eq!(header.version, 2);
        assert_eq!(header.ca_id, "FR00");
        assert_eq!(header.cert_id, "0001");
        assert_eq!(header.emission_date, emission);
        assert_eq!(header.doc_type, "04");
        assert_eq!(header.perimeter, None);
        assert_eq!(header.country, None);
        assert!(rest.is_empty());
    }

    #[test]
    fn v04_header_with_country() {
        let raw = build_header(4, "FR04", "1234", None, None, "01", Some("02"), Some("FR"));
        assert_eq!(raw.len(), 26);
        let (header, _) = parse_header(&raw).unwrap();
        assert_eq!(header.perimeter.as_deref(), Some("02"));
        assert_eq!(header.country.as_deref(), Some("FR"));
        assert_eq!(header.emission_date, None);
    }

    #[test]
    fn unknown_versions_fail() {
        let raw = build_header(2, "FR00", "0001", None, None, "04", None, None);
        let bad = raw.replace("DC02", "DC09");
        assert!(parse_header(&bad).is_err());
        assert!(parse_header("XX020000").is_err());
        assert!(parse_header("DC02FR00").is_err()); // truncated
    }
}
