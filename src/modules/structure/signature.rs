//! Signature trust evaluation.
//!
//! The pipeline does not re-compute signature digests; it answers a
//! narrower question: does the document carry a signature whose certificate
//! chain involves an authority we recognize, and is that certificate inside
//! its validity window? That is what decides whether incremental updates
//! are the normal signing pattern or a tampering signal.

use crate::pdf::SignatureRecord;
use chrono::{DateTime, Utc};
use log::debug;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Verdict on a signature record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Issued under a recognized authority, currently valid
    Trusted,
    /// Issued under a recognized authority, but expired
    TrustedExpired,
    /// Parsed fine, authority unknown to the trust store
    NotTrusted,
    /// No certificate could be parsed out of the CMS payload
    Unverifiable,
    /// The signature dictionary itself is malformed
    Invalid,
}

/// Authorities the structure module recognizes, matched as substrings of
/// the certificate issuer/subject distinguished names.
#[derive(Debug, Clone)]
pub struct TrustStore {
    authorities: Vec<String>,
}

impl Default for TrustStore {
    fn default() -> Self {
        Self {
            authorities: [
                "Certigna",
                "ChamberSign",
                "Universign",
                "CertEurope",
                "Docusign France",
                "Adobe Root CA",
                "GlobalSign",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl TrustStore {
    /// Build a store from authority name substrings.
    pub fn new(authorities: Vec<String>) -> Self {
        Self { authorities }
    }

    /// True when a distinguished name involves a recognized authority.
    pub fn recognizes(&self, dn: &str) -> bool {
        self.authorities.iter().any(|a| dn.contains(a.as_str()))
    }
}

/// Outcome of verifying one signature record.
#[derive(Debug, Clone)]
pub struct SignatureVerdict {
    /// Trust status
    pub status: SignatureStatus,
    /// Signer distinguished name (leaf certificate subject) when parsed
    pub signer: Option<String>,
    /// `/SubFilter` of the record
    pub sub_filter: Option<String>,
}

/// Scan a DER blob for embedded certificates. CMS payloads carry their
/// certificate set as nested SEQUENCEs; trying every `30 82` offset finds
/// them without a full CMS parser.
fn harvest_certificates(der: &[u8]) -> Vec<X509Certificate<'_>> {
    let mut certs = Vec::new();
    let mut i = 0usize;
    while i + 4 < der.len() {
        if der[i] == 0x30 && der[i + 1] == 0x82 {
            let declared = u16::from_be_bytes([der[i + 2], der[i + 3]]) as usize;
            if i + 4 + declared <= der.len() {
                if let Ok((_, cert)) = X509Certificate::from_der(&der[i..i + 4 + declared]) {
                    certs.push(cert);
                    i += 4 + declared;
                    continue;
                }
            }
        }
        i += 1;
    }
    certs
}

/// Evaluate one signature record against the trust store.
pub fn verify_signature(
    record: &SignatureRecord,
    store: &TrustStore,
    now: DateTime<Utc>,
) -> SignatureVerdict {
    let sub_filter = record.sub_filter.clone();
    if record.contents.is_empty() || record.byte_range.len() < 4 {
        return SignatureVerdict {
            status: SignatureStatus::Invalid,
            signer: record.signer_name.clone(),
            sub_filter,
        };
    }
    if record.byte_range.iter().any(|v| *v < 0) {
        return SignatureVerdict {
            status: SignatureStatus::Invalid,
            signer: record.signer_name.clone(),
            sub_filter,
        };
    }
    let certs = harvest_certificates(&record.contents);
    if certs.is_empty() {
        debug!("no certificate parsed from signature '{}'", record.field_name);
        return SignatureVerdict {
            status: SignatureStatus::Unverifiable,
            signer: record.signer_name.clone(),
            sub_filter,
        };
    }
    let signer = Some(certs[0].subject().to_string());
    let recognized = certs.iter().find(|c| {
        store.recognizes(&c.issuer().to_string()) || store.recognizes(&c.subject().to_string())
    });
    let status = match recognized {
        Some(cert) => {
            let valid_now = x509_parser::time::ASN1Time::from_timestamp(now.timestamp())
                .map(|t| cert.validity().is_valid_at(t))
                .unwrap_or(false);
            if valid_now {
                SignatureStatus::Trusted
            } else {
                SignatureStatus::TrustedExpired
            }
        }
        None => SignatureStatus::NotTrusted,
    };
    SignatureVerdict {
        status,
        signer,
        sub_filter,
    }
}

/// Verify every signature record; the best status wins (a document with one
/// trusted signature and one unparseable widget is treated as signed).
pub fn best_verdict(
    records: &[SignatureRecord],
    store: &TrustStore,
    now: DateTime<Utc>,
) -> Option<SignatureVerdict> {
    let mut best: Option<SignatureVerdict> = None;
    for record in records {
        let verdict = verify_signature(record, store, now);
        let rank = |s: SignatureStatus| match s {
            SignatureStatus::Trusted => 0,
            SignatureStatus::TrustedExpired => 1,
            SignatureStatus::NotTrusted => 2,
            SignatureStatus::Unverifiable => 3,
            SignatureStatus::Invalid => 4,
        };
        match &best {
            Some(b) if rank(b.status) <= rank(verdict.status) => {}
            _ => best = Some(verdict),
        }
    }
    best
}
