//! Positioned text extraction from content streams.
//!
//! A deliberately small content-stream interpreter: it executes the text
//! positioning and showing operators (`BT`/`ET`, `Td`/`TD`/`Tm`/`T*`,
//! `Tf`, `Tj`/`TJ`/`'`/`"`) plus enough graphics state (`q`/`Q`/`cm`) to
//! place spans in page space. Glyph metrics are not loaded; advances are
//! estimated from the font size, which is accurate enough for line grouping
//! and region lookups, the two consumers in this crate.
//!
//! Bytes are mapped to text as Latin-1 for simple fonts and UTF-16BE for
//! Type0 fonts. Unmappable input degrades to U+FFFD and never errors:
//! missing text is itself a signal handled upstream.

use super::lexer::{lex_token, Token};
use super::object::Object;
use std::collections::HashMap;

/// What the interpreter needs to know about a page font resource.
#[derive(Debug, Clone, Default)]
pub struct FontNote {
    /// `/BaseFont` value, subset prefix included
    pub base_font: String,
    /// True for `/Subtype /Type0` (composite) fonts
    pub is_type0: bool,
}

/// A run of text as placed on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSpan {
    /// Decoded text
    pub text: String,
    /// Font resource's `/BaseFont` (subset prefix kept)
    pub font: String,
    /// Font size after text-matrix scaling
    pub font_size: f32,
    /// Baseline origin x in page space
    pub x: f32,
    /// Baseline origin y in page space
    pub y: f32,
    /// Estimated advance width
    pub width: f32,
}

/// 2D affine matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn mul(self, m: Matrix) -> Matrix {
        Matrix {
            a: self.a * m.a + self.b * m.c,
            b: self.a * m.b + self.b * m.d,
            c: self.c * m.a + self.d * m.c,
            d: self.c * m.b + self.d * m.d,
            e: self.e * m.a + self.f * m.c + m.e,
            f: self.e * m.b + self.f * m.d + m.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn translated(tx: f32, ty: f32) -> Matrix {
        Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        }
    }
}

#[derive(Debug, Clone)]
struct TextState {
    tm: Matrix,
    tlm: Matrix,
    leading: f32,
    font_res: String,
    font_size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            leading: 0.0,
            font_res: String::new(),
            font_size: 0.0,
        }
    }
}

/// One `Do` invocation of a named XObject, with its placement rectangle in
/// page space (width/height are the magnitudes of the CTM axes, which for
/// images equal the painted size in points).
#[derive(Debug, Clone, PartialEq)]
pub struct XObjectUse {
    /// Resource name as referenced by the content stream
    pub name: String,
    /// Placement origin x
    pub x: f32,
    /// Placement origin y
    pub y: f32,
    /// Painted width in points
    pub width: f32,
    /// Painted height in points
    pub height: f32,
}

/// Everything a single content-stream run produces.
#[derive(Debug, Clone, Default)]
pub struct PageRun {
    /// Text spans in paint order
    pub spans: Vec<PlacedSpan>,
    /// XObject placements in paint order
    pub xobjects: Vec<XObjectUse>,
}

/// Rough per-character advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Execute `content` and return the spans it paints.
pub fn extract_spans(content: &[u8], fonts: &HashMap<String, FontNote>) -> Vec<PlacedSpan> {
    run_content(content, fonts).spans
}

/// Execute `content` and return spans plus XObject placements.
pub fn run_content(content: &[u8], fonts: &HashMap<String, FontNote>) -> PageRun {
    let mut run = PageRun::default();
    let mut spans = Vec::new();
    let mut operands: Vec<Object> = Vec::new();
    let mut ctm = Matrix::IDENTITY;
    let mut gs_stack: Vec<Matrix> = Vec::new();
    let mut ts = TextState::default();
    let mut input = content;

    while let Ok((rest, tok)) = lex_token(input) {
        input = rest;
        match tok {
            Token::Integer(v) => operands.push(Object::Integer(v)),
            Token::Real(v) => operands.push(Object::Real(v)),
            Token::String(s) => operands.push(Object::String(s)),
            Token::Name(n) => operands.push(Object::Name(n)),
            Token::True => operands.push(Object::Boolean(true)),
            Token::False => operands.push(Object::Boolean(false)),
            Token::Null => operands.push(Object::Null),
            Token::ArrayStart => {
                let (arr, rest2) = collect_array(input);
                operands.push(Object::Array(arr));
                input = rest2;
            }
            Token::DictStart => {
                let (_, rest2) = collect_dict(input);
                operands.push(Object::Null); // property lists are irrelevant here
                input = rest2;
            }
            Token::ArrayEnd | Token::DictEnd => operands.clear(),
            Token::Obj | Token::EndObj | Token::Stream | Token::EndStream | Token::RefMarker => {
                operands.clear()
            }
            Token::Keyword(op) => {
                match op.as_str() {
                    "q" => gs_stack.push(ctm),
                    "Q" => ctm = gs_stack.pop().unwrap_or(Matrix::IDENTITY),
                    "cm" => {
                        if let Some(m) = matrix_from(&operands) {
                            ctm = m.mul(ctm);
                        }
                    }
                    "BT" => {
                        ts.tm = Matrix::IDENTITY;
                        ts.tlm = Matrix::IDENTITY;
                    }
                    "ET" => {}
                    "Tf" => {
                        let mut it = operands.iter().rev();
                        ts.font_size = it.next().and_then(Object::as_float).unwrap_or(0.0) as f32;
                        ts.font_res = it
                            .next()
                            .and_then(Object::as_name)
                            .unwrap_or_default()
                            .to_string();
                    }
                    "TL" => {
                        ts.leading =
                            operands.last().and_then(Object::as_float).unwrap_or(0.0) as f32;
                    }
                    "Td" => {
                        if let [x, y] = last_two_floats(&operands) {
                            ts.tlm = Matrix::translated(x, y).mul(ts.tlm);
                            ts.tm = ts.tlm;
                        }
                    }
                    "TD" => {
                        if let [x, y] = last_two_floats(&operands) {
                            ts.leading = -y;
                            ts.tlm = Matrix::translated(x, y).mul(ts.tlm);
                            ts.tm = ts.tlm;
                        }
                    }
                    "Tm" => {
                        if let Some(m) = matrix_from(&operands) {
                            ts.tlm = m;
                            ts.tm = m;
                        }
                    }
                    "T*" => {
                        ts.tlm = Matrix::translated(0.0, -ts.leading).mul(ts.tlm);
                        ts.tm = ts.tlm;
                    }
                    "Tj" => {
                        if let Some(Object::String(s)) = operands.last() {
                            show_string(s, fonts, &mut ts, &ctm, &mut spans);
                        }
                    }
                    "'" => {
                        ts.tlm = Matrix::translated(0.0, -ts.leading).mul(ts.tlm);
                        ts.tm = ts.tlm;
                        if let Some(Object::String(s)) = operands.last() {
                            show_string(s, fonts, &mut ts, &ctm, &mut spans);
                        }
                    }
                    "\"" => {
                        ts.tlm = Matrix::translated(0.0, -ts.leading).mul(ts.tlm);
                        ts.tm = ts.tlm;
                        if let Some(Object::String(s)) = operands.last() {
                            show_string(s, fonts, &mut ts, &ctm, &mut spans);
                        }
                    }
                    "TJ" => {
                        if let Some(Object::Array(items)) = operands.last() {
                            let items = items.clone();
                            for item in &items {
                                match item {
                                    Object::String(s) => {
                                        show_string(s, fonts, &mut ts, &ctm, &mut spans)
                                    }
                                    Object::Integer(_) | Object::Real(_) => {
                                        let adj = item.as_float().unwrap_or(0.0) as f32;
                                        let dx = -adj / 1000.0 * ts.font_size;
                                        ts.tm = Matrix::translated(dx, 0.0).mul(ts.tm);
                                    }
                                    _ => {}
                                }
                            }
                        }
                    }
                    "BI" => {
                        // inline image: skip binary payload to the EI marker
                        input = skip_inline_image(input);
                    }
                    "Do" => {
                        if let Some(Object::Name(name)) = operands.last() {
                            let (x, y) = ctm.apply(0.0, 0.0);
                            let width = (ctm.a * ctm.a + ctm.b * ctm.b).sqrt();
                            let height = (ctm.c * ctm.c + ctm.d * ctm.d).sqrt();
                            run.xobjects.push(XObjectUse {
                                name: name.clone(),
                                x,
                                y,
                                width,
                                height,
                            });
                        }
                    }
                    _ => {}
                }
                operands.clear();
            }
        }
    }
    run.spans = spans;
    run
}

fn collect_array(mut input: &[u8]) -> (Vec<Object>, &[u8]) {
    let mut items = Vec::new();
    while let Ok((rest, tok)) = lex_token(input) {
        input = rest;
        match tok {
            Token::ArrayEnd => break,
            Token::Integer(v) => items.push(Object::Integer(v)),
            Token::Real(v) => items.push(Object::Real(v)),
            Token::String(s) => items.push(Object::String(s)),
            Token::Name(n) => items.push(Object::Name(n)),
            Token::ArrayStart => {
                let (inner, rest2) = collect_array(input);
                items.push(Object::Array(inner));
                input = rest2;
            }
            _ => {}
        }
    }
    (items, input)
}

fn collect_dict(mut input: &[u8]) -> ((), &[u8]) {
    let mut depth = 1;
    while let Ok((rest, tok)) = lex_token(input) {
        input = rest;
        match tok {
            Token::DictStart => depth += 1,
            Token::DictEnd => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    ((), input)
}

fn skip_inline_image(input: &[u8]) -> &[u8] {
    let mut i = 0;
    while i + 1 < input.len() {
        if input[i] == b'E'
            && input[i + 1] == b'I'
            && (i == 0 || super::lexer::is_whitespace(input[i - 1]))
        {
            let end = i + 2;
            return &input[end..];
        }
        i += 1;
    }
    &input[input.len()..]
}

fn matrix_from(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let v: Vec<f32> = operands[operands.len() - 6..]
        .iter()
        .filter_map(|o| o.as_float().map(|f| f as f32))
        .collect();
    if v.len() != 6 {
        return None;
    }
    Some(Matrix {
        a: v[0],
        b: v[1],
        c: v[2],
        d: v[3],
        e: v[4],
        f: v[5],
    })
}

fn last_two_floats(operands: &[Object]) -> [f32; 2] {
    let mut it = operands.iter().rev().filter_map(Object::as_float);
    let y = it.next().unwrap_or(0.0) as f32;
    let x = it.next().unwrap_or(0.0) as f32;
    [x, y]
}

fn decode_shown_bytes(bytes: &[u8], note: Option<&FontNote>) -> String {
    if note.map(|n| n.is_type0).unwrap_or(false) {
        let mut units = Vec::with_capacity(bytes.len() / 2);
        for pair in bytes.chunks(2) {
            match pair {
                [hi, lo] => units.push(u16::from_be_bytes([*hi, *lo])),
                [only] => units.push(*only as u16),
                _ => {}
            }
        }
        char::decode_utf16(units.into_iter())
            .map(|c| c.unwrap_or('\u{FFFD}'))
            .collect()
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

fn show_string(
    bytes: &[u8],
    fonts: &HashMap<String, FontNote>,
    ts: &mut TextState,
    ctm: &Matrix,
    spans: &mut Vec<PlacedSpan>,
) {
    let note = fonts.get(&ts.font_res);
    let text = decode_shown_bytes(bytes, note);
    if text.is_empty() {
        return;
    }
    let device = ts.tm.mul(*ctm);
    let (x, y) = device.apply(0.0, 0.0);
    let scale = (device.a * device.a + device.b * device.b).sqrt();
    let size = ts.font_size * scale;
    let advance = text.chars().count() as f32 * AVG_GLYPH_WIDTH * ts.font_size;
    spans.push(PlacedSpan {
        text,
        font: note.map(|n| n.base_font.clone()).unwrap_or_default(),
        font_size: size,
        x,
        y,
        width: advance * scale,
    });
    ts.tm = Matrix::translated(advance, 0.0).mul(ts.tm);
}

/// Assemble plain page text from spans: lines grouped by baseline, top to
/// bottom, left to right, one `\n` per line.
pub fn assemble_text(spans: &[PlacedSpan]) -> String {
    if spans.is_empty() {
        return String::new();
    }
    let mut ordered: Vec<&PlacedSpan> = spans.iter().collect();
    ordered.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });
    let mut out = String::new();
    let mut line_y = f32::INFINITY;
    let mut first = true;
    for span in ordered {
        let tol = (span.font_size * 0.5).max(2.0);
        if first {
            line_y = span.y;
            first = false;
        } else if (line_y - span.y).abs() > tol {
            out.push('\n');
            line_y = span.y;
        } else if !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        out.push_str(&span.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fonts() -> HashMap<String, FontNote> {
        let mut m = HashMap::new();
        m.insert(
            "F1".to_string(),
            FontNote {
                base_font: "Helvetica".into(),
                is_type0: false,
            },
        );
        m
    }

    #[test]
    fn simple_tj() {
        let content = b"BT /F1 12 Tf 72 700 Td (Facture) Tj ET";
        let spans = extract_spans(content, &fonts());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Facture");
        assert_eq!(spans[0].font, "Helvetica");
        assert!((spans[0].x - 72.0).abs() < 0.01);
        assert!((spans[0].y - 700.0).abs() < 0.01);
    }

    #[test]
    fn tj_array_and_lines() {
        let content = b"BT /F1 10 Tf 10 100 Td [(Total) -250 (: 42,00 EUR)] TJ T* ET";
        let spans = extract_spans(content, &fonts());
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "Total");
        assert_eq!(spans[1].text, ": 42,00 EUR");
        assert!(spans[1].x > spans[0].x);
    }

    #[test]
    fn quote_advances_line() {
        let content = b"BT /F1 10 Tf 14 TL 10 100 Td (un) Tj (deux) ' ET";
        let spans = extract_spans(content, &fonts());
        assert_eq!(spans.len(), 2);
        assert!((spans[0].y - spans[1].y - 14.0).abs() < 0.01);
    }

    #[test]
    fn assembled_text_reads_top_down() {
        let content =
            b"BT /F1 10 Tf 10 100 Td (ligne haute) Tj ET BT /F1 10 Tf 10 50 Td (ligne basse) Tj ET";
        let spans = extract_spans(content, &fonts());
        let text = assemble_text(&spans);
        assert_eq!(text, "ligne haute\nligne basse");
    }

    #[test]
    fn xobject_placement_recorded() {
        let content = b"q 200 0 0 100 50 400 cm /Im1 Do Q";
        let run = run_content(content, &fonts());
        assert_eq!(run.xobjects.len(), 1);
        let xo = &run.xobjects[0];
        assert_eq!(xo.name, "Im1");
        assert!((xo.width - 200.0).abs() < 0.01);
        assert!((xo.height - 100.0).abs() < 0.01);
        assert!((xo.x - 50.0).abs() < 0.01 && (xo.y - 400.0).abs() < 0.01);
    }

    #[test]
    fn inline_image_skipped() {
        let content = b"BI /W 1 /H 1 ID \x00\xff\x00 EI BT /F1 9 Tf (apres) Tj ET";
        let spans = extract_spans(content, &fonts());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "apres");
    }
}
