//! 2D-DOC verification.
//!
//! French official documents (tax notices, invoices from large issuers,
//! proofs of address) carry a DataMatrix barcode whose payload is signed by
//! a certification authority. Parsing it and comparing the signed fields
//! with the visible text catches the most common tampering: the barcode
//! still says the truth after the printed text was edited.

pub mod header;
pub mod locate;
pub mod message;
pub mod registry;
pub mod verify;

use crate::model::{Flag, FlagCode, FlagDetails, ModuleName, ModuleResult, Severity};
use crate::modules::ModuleContext;
use header::TwoDDocHeader;
use locate::LocateOutcome;
use log::{debug, info};
use message::Message;

/// Local parse failure inside the 2D-DOC subsystem. Never escapes the
/// module: it degrades to a flag or an absent value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TwoDDocError {
    /// Header grammar violation
    #[error("2D-DOC header: {0}")]
    Header(String),
}

/// A fully parsed 2D-DOC.
#[derive(Debug, Clone)]
pub struct TwoDDoc {
    /// Fixed-position header
    pub header: TwoDDocHeader,
    /// Message fields + signature payload
    pub message: Message,
}

/// Parse a complete barcode payload (header + message + signature).
pub fn parse_twoddoc(payload: &[u8]) -> Result<TwoDDoc, TwoDDocError> {
    // the header zone is ASCII by construction; Latin-1 view is safe
    let text: String = payload.iter().map(|&b| b as char).collect();
    let (parsed_header, _) = header::parse_header(&text)?;
    let header_bytes = header::header_len(parsed_header.version).unwrap_or(0);
    let message = message::parse_message(&payload[header_bytes..]);
    Ok(TwoDDoc {
        header: parsed_header,
        message,
    })
}

/// Run the 2D-DOC module.
pub fn analyze(ctx: &ModuleContext) -> ModuleResult {
    let (rasterizer, decoder) = match (&ctx.services.rasterizer, &ctx.services.barcode) {
        (Some(r), Some(d)) => (r, d),
        _ => {
            debug!("2D-DOC: raster/decoder primitives absent, nothing to do");
            return ModuleResult::from_flags(ModuleName::Twoddoc, Vec::new(), 0.3);
        }
    };
    if ctx.bundle.page_count == 0 {
        return ModuleResult::from_flags(ModuleName::Twoddoc, Vec::new(), 0.3);
    }

    let outcome = locate::locate_and_decode(rasterizer.as_ref(), decoder.as_ref());
    let payload = match outcome {
        LocateOutcome::Decoded(payload) => payload,
        LocateOutcome::CandidatesOnly(n) => {
            debug!("2D-DOC: {} candidates, none decoded", n);
            return ModuleResult::from_flags(ModuleName::Twoddoc, Vec::new(), 0.5);
        }
        LocateOutcome::Nothing => {
            return ModuleResult::from_flags(ModuleName::Twoddoc, Vec::new(), 0.6);
        }
        LocateOutcome::NoRender => {
            return ModuleResult::from_flags(ModuleName::Twoddoc, Vec::new(), 0.3);
        }
    };

    let doc = match parse_twoddoc(&payload) {
        Ok(doc) => doc,
        Err(e) => {
            info!("2D-DOC payload rejected: {}", e);
            let flag = Flag::new(
                Severity::Medium,
                FlagCode::TwoddocParseError,
                format!("A DataMatrix was decoded but its 2D-DOC payload is malformed ({})", e),
            );
            return ModuleResult::from_flags(ModuleName::Twoddoc, vec![flag], 0.9);
        }
    };

    let text = ctx.bundle.full_text();
    let mut report = verify::cross_verify(&doc.message, &text);
    // carry the document type into the first barcode-family details blob
    for flag in &mut report.flags {
        if let Some(FlagDetails::BarcodeReport { doc_type, .. }) = &mut flag.details {
            *doc_type = Some(doc.header.doc_type.clone());
        }
    }
    ModuleResult::from_flags(ModuleName::Twoddoc, report.flags, 0.9)
}
