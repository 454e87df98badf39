//! PDF 1.5 cross-reference streams and object streams, built byte by byte.

use std::io::Write;
use veridoc::pdf::object::Object;
use veridoc::pdf::PdfFile;

/// Build a PDF whose xref is a cross-reference stream and whose Info
/// dictionary lives inside an object stream.
///
/// Layout:
///   1 catalog, 2 pages, 3 page, 4 object stream (holds object 6 = Info),
///   5 xref stream. Object 6 is type-2 (compressed) in the xref.
fn xref_stream_pdf() -> Vec<u8> {
    let mut out = b"%PDF-1.5\n".to_vec();
    let mut offsets = Vec::new();

    // objects 1..3
    let bodies = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] >>".to_string(),
    ];
    for (index, body) in bodies.iter().enumerate() {
        offsets.push(out.len());
        write!(out, "{} 0 obj\n{}\nendobj\n", index + 1, body).unwrap();
    }

    // object 4: object stream holding object 6 (the Info dictionary)
    let inner = "<< /Producer (ObjStm Writer) >>";
    let header = "6 0";
    let first = header.len() + 1;
    let stm_payload = format!("{} {}", header, inner);
    offsets.push(out.len());
    write!(
        out,
        "4 0 obj\n<< /Type /ObjStm /N 1 /First {} /Length {} >>\nstream\n{}\nendstream\nendobj\n",
        first,
        stm_payload.len(),
        stm_payload
    )
    .unwrap();

    // object 5: the xref stream itself, W [1 2 1], entries 0..=6
    let xref_offset = out.len();
    let mut rows: Vec<u8> = Vec::new();
    rows.extend_from_slice(&[0, 0, 0, 0]); // object 0: free
    for &offset in &offsets {
        rows.push(1);
        rows.extend_from_slice(&(offset as u16).to_be_bytes());
        rows.push(0);
    }
    rows.extend_from_slice(&[1, (xref_offset >> 8) as u8, xref_offset as u8, 0]); // object 5
    rows.extend_from_slice(&[2, 0, 4, 0]); // object 6: in stream 4, index 0
    write!(
        out,
        "5 0 obj\n<< /Type /XRef /Size 7 /W [1 2 1] /Root 1 0 R /Info 6 0 R /Length {} >>\nstream\n",
        rows.len()
    )
    .unwrap();
    out.extend_from_slice(&rows);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    write!(out, "startxref\n{}\n%%EOF\n", xref_offset).unwrap();
    out
}

#[test]
fn xref_stream_parses() {
    let file = PdfFile::from_bytes(xref_stream_pdf()).expect("xref-stream file parses");
    assert_eq!(file.version(), (1, 5));
    assert_eq!(file.pages().expect("pages").len(), 1);
}

#[test]
fn compressed_object_resolves_through_its_object_stream() {
    let file = PdfFile::from_bytes(xref_stream_pdf()).expect("parse");
    let info = file.info();
    assert_eq!(
        info.get("Producer").and_then(Object::as_text).as_deref(),
        Some("ObjStm Writer")
    );
}

#[test]
fn trailer_comes_from_the_stream_dictionary() {
    let file = PdfFile::from_bytes(xref_stream_pdf()).expect("parse");
    assert_eq!(
        file.trailer().get("Size").and_then(Object::as_int),
        Some(7)
    );
    assert!(file.trailer().contains_key("Root"));
}
