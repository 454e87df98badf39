//! Shared test fixtures: tiny PDFs built programmatically, plus mock
//! service implementations. No binary fixtures — every test document is
//! constructed here so tests stay self-contained and reproducible.

#![allow(dead_code)]

use image::GrayImage;
use std::collections::BTreeMap;
use std::io::Write;
use veridoc::services::{
    BarcodeDecoder, CompanyInfo, CompanyRegistry, CompanyStatus, DecodedBarcode, LookupOutcome,
    PageRasterizer, VatOutcome, VatValidator,
};

/// Serialize a classic-xref PDF from contiguously numbered object bodies
/// (`1..=n`, body bytes without the `N 0 obj` wrapper).
pub fn build_pdf(objects: &[Vec<u8>], root: u32, info: Option<u32>) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n%\xc3\xa4\xc3\xbc\n".to_vec();
    let mut offsets: BTreeMap<u32, usize> = BTreeMap::new();
    for (index, body) in objects.iter().enumerate() {
        let num = index as u32 + 1;
        offsets.insert(num, out.len());
        write!(out, "{} 0 obj\n", num).unwrap();
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }
    let xref_pos = out.len();
    write!(out, "xref\n0 {}\n", objects.len() + 1).unwrap();
    out.extend_from_slice(b"0000000000 65535 f \n");
    for index in 0..objects.len() {
        let offset = offsets[&(index as u32 + 1)];
        write!(out, "{:010} 00000 n \n", offset).unwrap();
    }
    let info_entry = info
        .map(|n| format!(" /Info {} 0 R", n))
        .unwrap_or_default();
    write!(
        out,
        "trailer\n<< /Size {} /Root {} 0 R{} >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        root,
        info_entry,
        xref_pos
    )
    .unwrap();
    out
}

/// Append an incremental update redefining some objects.
pub fn append_revision(base: Vec<u8>, updates: &[(u32, String)], prev_size: usize) -> Vec<u8> {
    let prev_startxref = find_last_startxref(&base);
    let mut out = base;
    let mut offsets: BTreeMap<u32, usize> = BTreeMap::new();
    for (num, body) in updates {
        offsets.insert(*num, out.len());
        write!(out, "{} 0 obj\n{}\nendobj\n", num, body).unwrap();
    }
    let xref_pos = out.len();
    out.extend_from_slice(b"xref\n");
    for (num, offset) in &offsets {
        write!(out, "{} 1\n{:010} 00000 n \n", num, offset).unwrap();
    }
    write!(
        out,
        "trailer\n<< /Size {} /Prev {} >>\nstartxref\n{}\n%%EOF\n",
        prev_size, prev_startxref, xref_pos
    )
    .unwrap();
    out
}

fn find_last_startxref(bytes: &[u8]) -> usize {
    let tail = String::from_utf8_lossy(bytes);
    let pos = tail.rfind("startxref").expect("startxref in base");
    tail[pos + "startxref".len()..]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .expect("startxref offset")
}

/// Options for the standard one-page invoice fixture.
#[derive(Default)]
pub struct PdfOptions {
    /// Lines of page text
    pub lines: Vec<String>,
    /// Info dictionary entries (e.g. `("Producer", "Microsoft Word")`)
    pub info: Vec<(String, String)>,
    /// Extra entries spliced into the catalog dictionary
    pub catalog_extra: String,
    /// Extra entries spliced into the page dictionary
    pub page_extra: String,
    /// Extra entries spliced into the page `/Font` resource dictionary
    pub font_extra: String,
    /// Extra entries spliced into the page `/Resources` dictionary
    pub resources_extra: String,
    /// Content-stream operators appended after the text block
    pub content_extra: String,
    /// Extra objects appended after the fixed five
    pub extra_objects: Vec<String>,
}

/// Encode text as Latin-1 bytes (the encoding simple PDF fonts read),
/// with string-literal escaping applied.
fn latin1_literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.extend_from_slice(br"\\"),
            '(' => out.extend_from_slice(br"\("),
            ')' => out.extend_from_slice(br"\)"),
            c if (c as u32) <= 0xFF => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

/// One-page PDF with a Helvetica text layer and optional trimmings.
///
/// Fixed layout: 1 catalog, 2 pages, 3 page, 4 content, 5 font,
/// then `extra_objects` (numbered from 6), then the Info dict last.
pub fn invoice_pdf(options: PdfOptions) -> Vec<u8> {
    let mut content: Vec<u8> = b"BT /F1 12 Tf 72 720 Td 14 TL\n".to_vec();
    for (index, line) in options.lines.iter().enumerate() {
        content.push(b'(');
        content.extend_from_slice(&latin1_literal(line));
        if index == 0 {
            content.extend_from_slice(b") Tj\n");
        } else {
            content.extend_from_slice(b") '\n");
        }
    }
    content.extend_from_slice(b"ET");
    if !options.content_extra.is_empty() {
        content.push(b'\n');
        content.extend_from_slice(options.content_extra.as_bytes());
    }

    let mut stream_obj = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
    stream_obj.extend_from_slice(&content);
    stream_obj.extend_from_slice(b"\nendstream");

    let mut objects: Vec<Vec<u8>> = vec![
        format!("<< /Type /Catalog /Pages 2 0 R{} >>", options.catalog_extra).into_bytes(),
        b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
             /Resources << /Font << /F1 5 0 R{} >>{} >> /Contents 4 0 R{} >>",
            options.font_extra, options.resources_extra, options.page_extra
        )
        .into_bytes(),
        stream_obj,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec(),
    ];
    objects.extend(options.extra_objects.iter().map(|o| o.clone().into_bytes()));
    let info_num = if options.info.is_empty() {
        None
    } else {
        let mut info_obj = b"<< ".to_vec();
        for (k, v) in &options.info {
            write!(info_obj, "/{} (", k).unwrap();
            info_obj.extend_from_slice(&latin1_literal(v));
            info_obj.extend_from_slice(b") ");
        }
        info_obj.extend_from_slice(b">>");
        objects.push(info_obj);
        Some(objects.len() as u32)
    };
    build_pdf(&objects, 1, info_num)
}

/// Write PDF bytes to a fresh temp file and return the guard (the file
/// lives as long as the guard does).
pub fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .expect("temp file");
    file.write_all(bytes).expect("write pdf");
    file.flush().expect("flush pdf");
    file
}

/// Rasterizer serving pre-built bitmaps per page.
pub struct FixedRaster {
    pub pages: Vec<GrayImage>,
}

impl PageRasterizer for FixedRaster {
    fn render(&self, page: usize, _zoom: f32) -> Option<GrayImage> {
        self.pages.get(page).cloned()
    }
}

/// Barcode decoder returning canned payloads.
pub struct FixedBarcodes {
    pub datamatrix: Vec<Vec<u8>>,
    pub qr: Vec<Vec<u8>>,
}

impl BarcodeDecoder for FixedBarcodes {
    fn decode_datamatrix(&self, _bitmap: &GrayImage) -> Vec<DecodedBarcode> {
        self.datamatrix
            .iter()
            .map(|payload| DecodedBarcode {
                payload: payload.clone(),
                bbox: [0, 0, 10, 10],
            })
            .collect()
    }

    fn decode_qr(&self, _bitmap: &GrayImage) -> Vec<DecodedBarcode> {
        self.qr
            .iter()
            .map(|payload| DecodedBarcode {
                payload: payload.clone(),
                bbox: [0, 0, 10, 10],
            })
            .collect()
    }
}

/// Registry with a scripted response per identifier.
#[derive(Default)]
pub struct ScriptedRegistry {
    pub sirets: BTreeMap<String, LookupOutcome>,
    pub sirens: BTreeMap<String, LookupOutcome>,
}

impl CompanyRegistry for ScriptedRegistry {
    fn lookup_siret(&self, siret: &str) -> LookupOutcome {
        self.sirets
            .get(siret)
            .cloned()
            .unwrap_or(LookupOutcome::NotFound)
    }

    fn lookup_siren(&self, siren: &str) -> LookupOutcome {
        self.sirens
            .get(siren)
            .cloned()
            .unwrap_or(LookupOutcome::NotFound)
    }
}

/// Company record shorthand.
pub fn company(siren: &str, name: &str, status: CompanyStatus) -> CompanyInfo {
    CompanyInfo {
        siren: siren.to_string(),
        siret: None,
        name: name.to_string(),
        trade_name: None,
        address: None,
        postal_code: None,
        city: None,
        status,
        legal_form: Some("SAS".into()),
        creation_date: None,
    }
}

/// VAT validator with one scripted answer for everything.
pub struct ScriptedVat(pub VatOutcome);

impl VatValidator for ScriptedVat {
    fn validate(&self, _cc: &str, _number: &str) -> VatOutcome {
        self.0.clone()
    }
}
