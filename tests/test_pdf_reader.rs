//! Container-level tests: header, pages, text, metadata, bundle.

mod common;

use common::{invoice_pdf, write_temp, PdfOptions};
use veridoc::bundle::{compute_content_hash, extract_bundle};
use veridoc::pdf::PdfFile;
use veridoc::Error;

fn fixture() -> PdfOptions {
    PdfOptions {
        lines: vec![
            "Facture n° FAC-2024-0042".to_string(),
            "Total TTC : 100,00 EUR".to_string(),
        ],
        info: vec![
            ("Producer".to_string(), "Microsoft Word 2019".to_string()),
            ("CreationDate".to_string(), "D:20240115100000Z".to_string()),
            ("ModDate".to_string(), "D:20240115100000Z".to_string()),
        ],
        ..Default::default()
    }
}

#[test]
fn open_and_read_pages() {
    let bytes = invoice_pdf(fixture());
    let file = PdfFile::from_bytes(bytes).expect("parse fixture");
    assert_eq!(file.version(), (1, 4));
    let pages = file.pages().expect("pages");
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].media_box, [0.0, 0.0, 595.0, 842.0]);

    let run = file.page_run(&pages[0]);
    assert_eq!(run.spans.len(), 2);
    assert_eq!(run.spans[0].text, "Facture n° FAC-2024-0042");

    let fonts = file.page_fonts(&pages[0]);
    assert_eq!(fonts.len(), 1);
    assert_eq!(fonts[0].base_font, "Helvetica");
    assert!(!fonts[0].embedded);
}

#[test]
fn bad_magic_is_invalid_container() {
    let err = PdfFile::from_bytes(b"GIF89a not a pdf".to_vec()).unwrap_err();
    assert!(matches!(err, Error::InvalidContainer(_)));

    let mut truncated = invoice_pdf(fixture());
    truncated.truncate(40); // loses the xref
    assert!(PdfFile::from_bytes(truncated).is_err());
}

#[test]
fn bundle_extraction() {
    let bytes = invoice_pdf(fixture());
    let file = write_temp(&bytes);
    let bundle = extract_bundle(file.path()).expect("bundle");

    assert_eq!(bundle.content_hash.len(), 64);
    assert!(bundle.content_hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(
        bundle.content_hash,
        compute_content_hash(file.path()).unwrap()
    );

    assert_eq!(bundle.page_count, 1);
    assert!(bundle.text_by_page[0].contains("FAC-2024-0042"));
    assert_eq!(bundle.metadata.producer.as_deref(), Some("Microsoft Word 2019"));
    let created = bundle.metadata.creation_date.expect("creation date");
    assert_eq!(created.naive_utc().to_string(), "2024-01-15 10:00:00");

    assert_eq!(bundle.fonts.len(), 1);
    assert_eq!(bundle.fonts[0].name, "Helvetica");
    assert!(!bundle.fonts[0].is_subset);
    assert_eq!(bundle.fonts[0].pages_used, vec![0]);

    // raw metadata preserves every advertised key
    assert!(bundle.raw_metadata.contains_key("CreationDate"));
}

#[test]
fn missing_file_is_a_file_not_found() {
    let err = extract_bundle("/nonexistent/invoice.pdf").unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
    assert!(err.is_input_error());
}

#[test]
fn page_without_text_yields_empty_string() {
    let options = PdfOptions {
        lines: vec![],
        info: vec![("Producer".to_string(), "X".to_string())],
        ..Default::default()
    };
    let bytes = invoice_pdf(options);
    let file = write_temp(&bytes);
    let bundle = extract_bundle(file.path()).expect("bundle");
    assert_eq!(bundle.text_by_page, vec![String::new()]);
}
