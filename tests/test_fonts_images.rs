//! Font and image modules exercised through real (tiny) documents.

mod common;

use common::{invoice_pdf, write_temp, PdfOptions};
use veridoc::model::{FlagCode, ModuleName, Severity};
use veridoc::services::Services;
use veridoc::{Analyzer, AnalyzerOptions, FixedClock};

fn analyzer() -> Analyzer {
    Analyzer::new(AnalyzerOptions::default())
        .with_services(Services::offline(FixedClock::at(2024, 6, 1)))
}

fn module_of(
    result: veridoc::AnalysisResult,
    name: ModuleName,
) -> veridoc::ModuleResult {
    result
        .modules
        .into_iter()
        .find(|m| m.module == name)
        .expect("module present")
}

fn base_info() -> Vec<(String, String)> {
    vec![
        ("Producer".to_string(), "Microsoft Word 2019".to_string()),
        ("CreationDate".to_string(), "D:20240115100000Z".to_string()),
        ("ModDate".to_string(), "D:20240115100000Z".to_string()),
    ]
}

#[test]
fn midline_family_switch_detected_in_a_real_page() {
    let options = PdfOptions {
        lines: vec!["Montant fixe".to_string()],
        info: base_info(),
        font_extra: " /F2 6 0 R".to_string(),
        // a second span on the same baseline with a different family
        content_extra: "BT /F2 12 Tf 200 720 Td (1 234,56) Tj ET".to_string(),
        extra_objects: vec![
            "<< /Type /Font /Subtype /TrueType /BaseFont /ArialMT >>".to_string(),
        ],
        ..Default::default()
    };
    let file = write_temp(&invoice_pdf(options));
    let result = analyzer().analyze(file.path()).expect("analysis");
    let fonts = module_of(result, ModuleName::Fonts);
    let flag = fonts
        .flags
        .iter()
        .find(|f| f.code == FlagCode::FontsMidlineChange)
        .expect("midline flag");
    assert_eq!(flag.severity, Severity::Medium); // one affected line
}

#[test]
fn same_family_on_one_line_stays_quiet() {
    let options = PdfOptions {
        lines: vec!["Montant fixe".to_string()],
        info: base_info(),
        font_extra: " /F2 6 0 R".to_string(),
        content_extra: "BT /F2 12 Tf 200 720 Td (42,00) Tj ET".to_string(),
        extra_objects: vec![
            // a Helvetica variant: same canonical family as /F1
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold >>".to_string(),
        ],
        ..Default::default()
    };
    let file = write_temp(&invoice_pdf(options));
    let result = analyzer().analyze(file.path()).expect("analysis");
    let fonts = module_of(result, ModuleName::Fonts);
    assert!(fonts
        .flags
        .iter()
        .all(|f| f.code != FlagCode::FontsMidlineChange));
}

/// A fake JPEG XObject: the descriptor checks never decode the pixels.
fn screenshot_object(width: u32, height: u32, payload_len: usize) -> String {
    let payload = "J".repeat(payload_len);
    format!(
        "<< /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB \
         /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n{}\nendstream",
        width,
        height,
        payload.len(),
        payload
    )
}

#[test]
fn image_descriptor_extraction_and_dpi_from_placement() {
    let options = PdfOptions {
        lines: vec!["Voir photo".to_string()],
        info: base_info(),
        resources_extra: " /XObject << /Im1 6 0 R >>".to_string(),
        // 600x400 px painted over 200x100 pt → 216 x 288 DPI
        content_extra: "q 200 0 0 100 50 400 cm /Im1 Do Q".to_string(),
        extra_objects: vec![screenshot_object(600, 400, 4000)],
        ..Default::default()
    };
    let file = write_temp(&invoice_pdf(options));
    let bundle = veridoc::extract_bundle(file.path()).expect("bundle");
    assert_eq!(bundle.images.len(), 1);
    let image = &bundle.images[0];
    assert_eq!((image.width, image.height), (600, 400));
    assert_eq!(image.filter.as_deref(), Some("DCTDecode"));
    assert!((image.dpi_x - 216.0).abs() < 1.0, "dpi_x {}", image.dpi_x);
    assert!((image.dpi_y - 288.0).abs() < 1.0, "dpi_y {}", image.dpi_y);
}

#[test]
fn screenshot_sized_image_is_flagged() {
    let options = PdfOptions {
        lines: vec!["Capture jointe".to_string()],
        info: base_info(),
        resources_extra: " /XObject << /Im1 6 0 R >>".to_string(),
        content_extra: "q 500 0 0 280 40 300 cm /Im1 Do Q".to_string(),
        extra_objects: vec![screenshot_object(1920, 1080, 500_000)],
        ..Default::default()
    };
    let file = write_temp(&invoice_pdf(options));
    let result = analyzer().analyze(file.path()).expect("analysis");
    let images = module_of(result, ModuleName::Images);
    let flag = images
        .flags
        .iter()
        .find(|f| f.code == FlagCode::ImagesScreenshotDetected)
        .expect("screenshot flag");
    assert_eq!(flag.severity, Severity::High);
}

#[test]
fn heavy_compression_flag_through_the_pipeline() {
    let options = PdfOptions {
        lines: vec!["Photo compressée".to_string()],
        info: base_info(),
        resources_extra: " /XObject << /Im1 6 0 R >>".to_string(),
        content_extra: "q 100 0 0 100 40 300 cm /Im1 Do Q".to_string(),
        // 800x600x3 / 5000 ≈ 288: far past the recompression limit
        extra_objects: vec![screenshot_object(800, 600, 5000)],
        ..Default::default()
    };
    let file = write_temp(&invoice_pdf(options));
    let result = analyzer().analyze(file.path()).expect("analysis");
    let images = module_of(result, ModuleName::Images);
    assert!(images
        .flags
        .iter()
        .any(|f| f.code == FlagCode::ImagesHeavyCompression));
}
