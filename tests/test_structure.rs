//! Structure analysis over programmatically built PDFs.

mod common;

use common::{append_revision, invoice_pdf, write_temp, PdfOptions};
use veridoc::model::{FlagCode, FlagDetails, ModuleName};
use veridoc::modules::structure::modification_history;
use veridoc::services::Services;
use veridoc::{Analyzer, AnalyzerOptions, FixedClock};

fn analyzer() -> Analyzer {
    Analyzer::new(AnalyzerOptions::default())
        .with_services(Services::offline(FixedClock::at(2024, 6, 1)))
}

fn base_options(lines: &[&str]) -> PdfOptions {
    PdfOptions {
        lines: lines.iter().map(|s| s.to_string()).collect(),
        info: vec![
            ("Producer".to_string(), "Microsoft Word 2019".to_string()),
            ("CreationDate".to_string(), "D:20240115100000Z".to_string()),
            ("ModDate".to_string(), "D:20240115100000Z".to_string()),
        ],
        ..Default::default()
    }
}

fn structure_result(bytes: &[u8]) -> veridoc::ModuleResult {
    let file = write_temp(bytes);
    let result = analyzer().analyze(file.path()).expect("analysis");
    result
        .modules
        .into_iter()
        .find(|m| m.module == ModuleName::Structure)
        .expect("structure module present")
}

#[test]
fn single_save_raises_nothing() {
    let bytes = invoice_pdf(base_options(&["Total TTC : 100,00 EUR"]));
    let structure = structure_result(&bytes);
    assert!(structure.flags.is_empty(), "flags: {:#?}", structure.flags);
}

#[test]
fn incremental_update_is_flagged_with_history() {
    let base = invoice_pdf(base_options(&["Total TTC : 100,00 EUR"]));
    let altered_content = "BT /F1 12 Tf 72 720 Td (Total TTC : 999,00 EUR) Tj ET";
    let updated = append_revision(
        base,
        &[(
            4,
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                altered_content.len(),
                altered_content
            ),
        )],
        7,
    );
    let structure = structure_result(&updated);
    let flag = structure
        .flags
        .iter()
        .find(|f| f.code == FlagCode::StructIncrementalUpdates)
        .expect("incremental-updates flag");
    match &flag.details {
        Some(FlagDetails::RevisionReport {
            eof_count,
            edit_count,
            revisions,
        }) => {
            assert_eq!(*eof_count, 2);
            assert_eq!(*edit_count, 1);
            assert_eq!(revisions.len(), 1);
            assert_eq!(revisions[0].pages_touched, vec![0]);
            assert!(revisions[0]
                .added_lines
                .iter()
                .any(|l| l.contains("999,00")));
            assert!(revisions[0]
                .removed_lines
                .iter()
                .any(|l| l.contains("100,00")));
        }
        other => panic!("expected revision report, got {:?}", other),
    }

    // the public history API sees the same revision
    let history = modification_history(&updated);
    assert_eq!(history.len(), 1);
    assert!(history[0].changed_kinds.contains(&"content-stream".to_string()));
}

#[test]
fn javascript_open_action() {
    let mut options = base_options(&["Une facture."]);
    options.catalog_extra =
        " /OpenAction << /S /JavaScript /JS (app.alert\\(1\\)) >>".to_string();
    let structure = structure_result(&invoice_pdf(options));
    assert!(structure
        .flags
        .iter()
        .any(|f| f.code == FlagCode::StructJavascriptDetected));
}

#[test]
fn acroform_fields() {
    let mut options = base_options(&["Une facture."]);
    options.catalog_extra = " /AcroForm << /Fields [6 0 R] >>".to_string();
    options.extra_objects = vec!["<< /FT /Tx /T (montant) >>".to_string()];
    let structure = structure_result(&invoice_pdf(options));
    let flag = structure
        .flags
        .iter()
        .find(|f| f.code == FlagCode::StructAcroformDetected)
        .expect("acroform flag");
    assert_eq!(flag.severity, veridoc::Severity::Medium);
}

#[test]
fn hidden_and_suspicious_annotations() {
    let mut options = base_options(&["Une facture."]);
    options.page_extra = " /Annots [6 0 R 7 0 R]".to_string();
    options.extra_objects = vec![
        "<< /Type /Annot /Subtype /Square /CA 0 /Rect [0 0 10 10] >>".to_string(),
        "<< /Type /Annot /Subtype /FileAttachment /Rect [0 0 10 10] >>".to_string(),
    ];
    let structure = structure_result(&invoice_pdf(options));
    assert!(structure
        .flags
        .iter()
        .any(|f| f.code == FlagCode::StructHiddenAnnotations));
    assert!(structure
        .flags
        .iter()
        .any(|f| f.code == FlagCode::StructSuspiciousAnnotations));
}

#[test]
fn xmp_toolkit_disagreeing_with_producer() {
    let packet = r#"<?xpacket begin=""?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="LibreOffice 7.6">
</x:xmpmeta>"#;
    let mut options = base_options(&["Une facture."]);
    options.catalog_extra = " /Metadata 6 0 R".to_string();
    options.extra_objects = vec![format!(
        "<< /Type /Metadata /Subtype /XML /Length {} >>\nstream\n{}\nendstream",
        packet.len(),
        packet
    )];
    let structure = structure_result(&invoice_pdf(options));
    let flag = structure
        .flags
        .iter()
        .find(|f| f.code == FlagCode::StructXmpEditorMismatch)
        .expect("xmp mismatch flag");
    assert!(flag.message.contains("LibreOffice"));
}

#[test]
fn embedded_files_are_flagged() {
    let mut options = base_options(&["Une facture."]);
    options.catalog_extra =
        " /Names << /EmbeddedFiles << /Names [(payload.exe) 6 0 R] >> >>".to_string();
    options.extra_objects =
        vec!["<< /Type /Filespec /F (payload.exe) >>".to_string()];
    let structure = structure_result(&invoice_pdf(options));
    let flag = structure
        .flags
        .iter()
        .find(|f| f.code == FlagCode::StructEmbeddedFiles)
        .expect("embedded-files flag");
    match &flag.details {
        Some(FlagDetails::CountReport { count, .. }) => assert_eq!(*count, 1),
        other => panic!("expected count report, got {:?}", other),
    }
}
