//! Compact PDF container access.
//!
//! This is a read-only PDF reader reduced to the surface the fraud pipeline
//! consumes: header/version, the xref chain, the page tree with inherited
//! attributes, page content (text spans, image placements), font and image
//! resources, annotations, the interactive-form and name-tree corners of
//! the catalog where tampering evidence hides, and the XMP packet.
//!
//! The whole file is held in memory; documents in this domain are invoices,
//! not print masters. Parsing never panics on malformed input — every
//! malformed corner degrades to an absent value with a debug log, except
//! the two conditions that make a file unanalyzable (no `%PDF-` magic, no
//! parseable xref), which surface as [`Error::InvalidContainer`].

pub mod decode;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod text;
pub mod xref;

use crate::error::{Error, Result};
use log::debug;
use object::{Dict, ObjRef, Object};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use text::{FontNote, PageRun};
use xref::{XrefEntry, XrefTable};

/// Maximum reference-chain depth before giving up (cycle guard).
const MAX_RESOLVE_DEPTH: u32 = 64;
/// Page-tree recursion guard.
const MAX_TREE_DEPTH: u32 = 64;
/// Upper bound on pages we will walk.
const MAX_PAGES: usize = 10_000;

/// A parsed PDF file.
#[derive(Debug)]
pub struct PdfFile {
    bytes: Vec<u8>,
    version: (u8, u8),
    xref: XrefTable,
    cache: RefCell<HashMap<u32, Object>>,
}

/// One page with inherited attributes applied.
#[derive(Debug, Clone)]
pub struct Page {
    /// Zero-based page index
    pub index: usize,
    /// MediaBox `[x0 y0 x1 y1]`
    pub media_box: [f32; 4],
    /// Resolved `/Resources` dictionary
    pub resources: Dict,
    /// Decoded, concatenated content stream
    pub content: Vec<u8>,
    /// Resolved annotation dictionaries
    pub annotations: Vec<Dict>,
}

/// A font resource as referenced by a page.
#[derive(Debug, Clone)]
pub struct PageFont {
    /// Resource name (`/F1`, …)
    pub res_name: String,
    /// `/BaseFont`, subset prefix included
    pub base_font: String,
    /// True when a FontFile stream is present in the descriptor
    pub embedded: bool,
    /// `/Subtype /Type0`
    pub type0: bool,
}

/// An image XObject as referenced by a page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Object number of the XObject (0 when inlined in the resource dict)
    pub obj_num: u32,
    /// Resource name (`/Im1`, …)
    pub res_name: String,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Colorspace name when directly named
    pub colorspace: Option<String>,
    /// Bits per component
    pub bpc: Option<u8>,
    /// Outermost filter name
    pub filter: Option<String>,
    /// Raw (encoded) stream length in bytes
    pub byte_size: usize,
}

/// A signature field found in the AcroForm.
#[derive(Debug, Clone)]
pub struct SignatureRecord {
    /// Form field name
    pub field_name: String,
    /// `/ByteRange` values
    pub byte_range: Vec<i64>,
    /// Raw `/Contents` (DER PKCS#7 payload, zero-padded)
    pub contents: Vec<u8>,
    /// `/SubFilter`
    pub sub_filter: Option<String>,
    /// `/Name` (human signer name, if the producer recorded one)
    pub signer_name: Option<String>,
    /// `/M` signing time, raw PDF date string
    pub signing_time: Option<String>,
}

impl PdfFile {
    /// Open and parse a PDF from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
        Self::from_bytes(bytes)
    }

    /// Parse a PDF from a byte buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let version = parse_header(&bytes)?;
        let start = xref::find_startxref(&bytes)
            .ok_or_else(|| Error::InvalidContainer("no startxref marker".into()))?;
        let xref = xref::parse_xref_chain(&bytes, start)?;
        Ok(Self {
            bytes,
            version,
            xref,
            cache: RefCell::new(HashMap::new()),
        })
    }

    /// Re-parse the document as it existed at a byte prefix (one saved
    /// generation). Used by the revision differ.
    pub fn parse_prefix(bytes: &[u8], prefix_len: usize) -> Result<Self> {
        let end = prefix_len.min(bytes.len());
        Self::from_bytes(bytes[..end].to_vec())
    }

    /// PDF version from the header.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// The raw file bytes.
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }

    /// Merged trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.xref.trailer
    }

    /// The cross-reference view.
    pub fn xref(&self) -> &XrefTable {
        &self.xref
    }

    /// Number of freed-but-present object slots in the final table.
    pub fn object_freed_count(&self) -> usize {
        self.xref.free_count()
    }

    /// Load the object with the given number.
    pub fn get(&self, num: u32) -> Result<Object> {
        if let Some(cached) = self.cache.borrow().get(&num) {
            return Ok(cached.clone());
        }
        let entry = *self
            .xref
            .get(num)
            .ok_or(Error::ObjectNotFound(num, 0))?;
        let obj = match entry {
            XrefEntry::Compressed { stream, index } => {
                let container = self.get(stream)?;
                xref::load_from_object_stream(&container, index, num)?
            }
            ref e => xref::load_at(&self.bytes, e, num)?,
        };
        self.cache.borrow_mut().insert(num, obj.clone());
        Ok(obj)
    }

    /// Resolve reference chains to a concrete object (depth-capped).
    pub fn resolve(&self, obj: &Object) -> Result<Object> {
        let mut current = obj.clone();
        let mut depth = 0;
        while let Object::Reference(ObjRef { num, .. }) = current {
            depth += 1;
            if depth > MAX_RESOLVE_DEPTH {
                return Err(Error::Parse {
                    offset: 0,
                    reason: "reference chain too deep".into(),
                });
            }
            current = self.get(num)?;
        }
        Ok(current)
    }

    fn resolve_dict(&self, obj: Option<&Object>) -> Option<Dict> {
        let obj = obj?;
        self.resolve(obj).ok()?.as_dict().cloned()
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<Dict> {
        let root = self
            .xref
            .trailer
            .get("Root")
            .ok_or_else(|| Error::InvalidContainer("trailer has no /Root".into()))?;
        self.resolve(root)?
            .as_dict()
            .cloned()
            .ok_or_else(|| Error::InvalidContainer("/Root is not a dictionary".into()))
    }

    /// The Info dictionary (empty when absent).
    pub fn info(&self) -> Dict {
        self.xref
            .trailer
            .get("Info")
            .and_then(|o| self.resolve(o).ok())
            .and_then(|o| o.as_dict().cloned())
            .unwrap_or_default()
    }

    /// Walk the page tree, applying inheritable attributes.
    pub fn pages(&self) -> Result<Vec<Page>> {
        let catalog = self.catalog()?;
        let root = self
            .resolve_dict(catalog.get("Pages"))
            .ok_or_else(|| Error::InvalidContainer("catalog has no /Pages".into()))?;
        let mut pages = Vec::new();
        self.walk_pages(&root, None, None, &mut pages, 0)?;
        Ok(pages)
    }

    /// Page count without loading content.
    pub fn page_count(&self) -> Result<usize> {
        let catalog = self.catalog()?;
        if let Some(root) = self.resolve_dict(catalog.get("Pages")) {
            if let Some(count) = root.get("Count").and_then(Object::as_int) {
                return Ok(count.max(0) as usize);
            }
        }
        Ok(self.pages()?.len())
    }

    fn walk_pages(
        &self,
        node: &Dict,
        inherited_resources: Option<&Dict>,
        inherited_media: Option<[f32; 4]>,
        out: &mut Vec<Page>,
        depth: u32,
    ) -> Result<()> {
        if depth > MAX_TREE_DEPTH || out.len() >= MAX_PAGES {
            return Ok(());
        }
        let resources = self
            .resolve_dict(node.get("Resources"))
            .or_else(|| inherited_resources.cloned());
        let media = media_box(node).or(inherited_media);
        match node.get("Type").and_then(Object::as_name) {
            Some("Page") => {
                let content = self.page_content(node);
                let annotations = self.page_annotations(node);
                out.push(Page {
                    index: out.len(),
                    media_box: media.unwrap_or([0.0, 0.0, 612.0, 792.0]),
                    resources: resources.unwrap_or_default(),
                    content,
                    annotations,
                });
            }
            _ => {
                let kids = match node.get("Kids").map(|k| self.resolve(k)) {
                    Some(Ok(Object::Array(kids))) => kids,
                    _ => return Ok(()),
                };
                for kid in kids {
                    if let Ok(Object::Dictionary(kid_dict)) = self.resolve(&kid) {
                        self.walk_pages(
                            &kid_dict,
                            resources.as_ref().or(inherited_resources),
                            media,
                            out,
                            depth + 1,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn page_content(&self, node: &Dict) -> Vec<u8> {
        let mut out = Vec::new();
        let contents = match node.get("Contents").map(|c| self.resolve(c)) {
            Some(Ok(obj)) => obj,
            _ => return out,
        };
        let streams: Vec<Object> = match contents {
            Object::Array(items) => items
                .iter()
                .filter_map(|o| self.resolve(o).ok())
                .collect(),
            single => vec![single],
        };
        for stream in streams {
            if let Object::Stream { ref dict, ref data } = stream {
                match decode::decode_stream(dict, data) {
                    Ok(mut decoded) => {
                        if !out.is_empty() {
                            out.push(b'\n');
                        }
                        out.append(&mut decoded);
                    }
                    Err(e) => debug!("undecodable content stream: {}", e),
                }
            }
        }
        out
    }

    fn page_annotations(&self, node: &Dict) -> Vec<Dict> {
        let mut out = Vec::new();
        if let Some(Ok(Object::Array(annots))) = node.get("Annots").map(|a| self.resolve(a)) {
            for annot in annots {
                if let Ok(Object::Dictionary(d)) = self.resolve(&annot) {
                    out.push(d);
                }
            }
        }
        out
    }

    /// Font resources of a page.
    pub fn page_fonts(&self, page: &Page) -> Vec<PageFont> {
        let mut out = Vec::new();
        let fonts = match self.resolve_dict(page.resources.get("Font")) {
            Some(f) => f,
            None => return out,
        };
        for (res_name, font_obj) in fonts.iter() {
            let font = match self.resolve(font_obj) {
                Ok(Object::Dictionary(d)) => d,
                _ => continue,
            };
            let base_font = font
                .get("BaseFont")
                .and_then(Object::as_name)
                .unwrap_or("")
                .to_string();
            let type0 = font.get("Subtype").and_then(Object::as_name) == Some("Type0");
            // descendant fonts hold the descriptor for Type0
            let descriptor = self
                .resolve_dict(font.get("FontDescriptor"))
                .or_else(|| {
                    let descendants = self.resolve(font.get("DescendantFonts")?).ok()?;
                    let first = descendants.as_array()?.first()?;
                    let desc = self.resolve(first).ok()?.as_dict().cloned()?;
                    self.resolve_dict(desc.get("FontDescriptor"))
                });
            let embedded = descriptor
                .map(|d| {
                    d.contains_key("FontFile")
                        || d.contains_key("FontFile2")
                        || d.contains_key("FontFile3")
                })
                .unwrap_or(false);
            out.push(PageFont {
                res_name: res_name.clone(),
                base_font,
                embedded,
                type0,
            });
        }
        out
    }

    /// Font notes for the content interpreter.
    pub fn font_notes(&self, page: &Page) -> HashMap<String, FontNote> {
        self.page_fonts(page)
            .into_iter()
            .map(|f| {
                (
                    f.res_name,
                    FontNote {
                        base_font: f.base_font,
                        is_type0: f.type0,
                    },
                )
            })
            .collect()
    }

    /// Image XObject resources of a page.
    pub fn page_images(&self, page: &Page) -> Vec<PageImage> {
        let mut out = Vec::new();
        let xobjects = match self.resolve_dict(page.resources.get("XObject")) {
            Some(x) => x,
            None => return out,
        };
        for (res_name, entry) in xobjects.iter() {
            let obj_num = entry.as_ref_id().map(|r| r.num).unwrap_or(0);
            let resolved = match self.resolve(entry) {
                Ok(o) => o,
                Err(_) => continue,
            };
            let (dict, data_len) = match &resolved {
                Object::Stream { dict, data } => (dict, data.len()),
                _ => continue,
            };
            if dict.get("Subtype").and_then(Object::as_name) != Some("Image") {
                continue;
            }
            out.push(PageImage {
                obj_num,
                res_name: res_name.clone(),
                width: dict.get("Width").and_then(Object::as_int).unwrap_or(0).max(0) as u32,
                height: dict.get("Height").and_then(Object::as_int).unwrap_or(0).max(0) as u32,
                colorspace: dict
                    .get("ColorSpace")
                    .and_then(|c| self.resolve(c).ok())
                    .and_then(|c| c.as_name().map(str::to_string)),
                bpc: dict
                    .get("BitsPerComponent")
                    .and_then(Object::as_int)
                    .map(|v| v.clamp(0, 255) as u8),
                filter: decode::filter_names(dict).into_iter().next_back(),
                byte_size: data_len,
            });
        }
        out
    }

    /// Raw (filter-decoded where possible) payload of an image XObject.
    ///
    /// For DCTDecode images this returns the JPEG bytes verbatim, ready for
    /// the `image` crate.
    pub fn image_payload(&self, obj_num: u32) -> Result<(Dict, Vec<u8>)> {
        match self.get(obj_num)? {
            Object::Stream { dict, data } => {
                let decoded = decode::decode_stream(&dict, &data)?;
                Ok((dict, decoded))
            }
            _ => Err(Error::Decode("image object is not a stream".into())),
        }
    }

    /// Run the content interpreter over a page.
    pub fn page_run(&self, page: &Page) -> PageRun {
        let fonts = self.font_notes(page);
        text::run_content(&page.content, &fonts)
    }

    /// True when the document declares an interactive form with fields.
    pub fn acroform_fields(&self) -> Vec<Dict> {
        let mut out = Vec::new();
        let catalog = match self.catalog() {
            Ok(c) => c,
            Err(_) => return out,
        };
        let form = match self.resolve_dict(catalog.get("AcroForm")) {
            Some(f) => f,
            None => return out,
        };
        if let Some(Ok(Object::Array(fields))) = form.get("Fields").map(|f| self.resolve(f)) {
            for field in fields {
                if let Ok(Object::Dictionary(d)) = self.resolve(&field) {
                    out.push(d);
                }
            }
        }
        out
    }

    /// Signature fields with a filled `/V` value.
    pub fn signature_records(&self) -> Vec<SignatureRecord> {
        let mut out = Vec::new();
        for field in self.acroform_fields() {
            if field.get("FT").and_then(Object::as_name) != Some("Sig") {
                continue;
            }
            let value = match self.resolve_dict(field.get("V")) {
                Some(v) => v,
                None => continue,
            };
            let byte_range = value
                .get("ByteRange")
                .and_then(|o| self.resolve(o).ok())
                .and_then(|o| {
                    o.as_array().map(|a| {
                        a.iter().filter_map(Object::as_int).collect::<Vec<i64>>()
                    })
                })
                .unwrap_or_default();
            let contents = value
                .get("Contents")
                .and_then(|o| self.resolve(o).ok())
                .and_then(|o| o.as_string().map(<[u8]>::to_vec))
                .unwrap_or_default();
            out.push(SignatureRecord {
                field_name: field
                    .get("T")
                    .and_then(Object::as_text)
                    .unwrap_or_default(),
                byte_range,
                contents,
                sub_filter: value
                    .get("SubFilter")
                    .and_then(Object::as_name)
                    .map(str::to_string),
                signer_name: value.get("Name").and_then(Object::as_text),
                signing_time: value.get("M").and_then(Object::as_text),
            });
        }
        out
    }

    /// JavaScript actions declared anywhere we can see them: the catalog
    /// OpenAction, the Names/JavaScript tree, and annotation actions.
    pub fn javascript_actions(&self) -> Vec<String> {
        let mut out = Vec::new();
        let catalog = match self.catalog() {
            Ok(c) => c,
            Err(_) => return out,
        };
        if let Some(Ok(Object::Dictionary(action))) =
            catalog.get("OpenAction").map(|a| self.resolve(a))
        {
            if action.get("S").and_then(Object::as_name) == Some("JavaScript") {
                out.push("OpenAction".to_string());
            }
        }
        if let Some(names) = self.resolve_dict(catalog.get("Names")) {
            if let Some(js_tree) = self.resolve_dict(names.get("JavaScript")) {
                let mut entries = Vec::new();
                self.walk_name_tree(&js_tree, &mut entries, 0);
                for (name, _) in entries {
                    out.push(name);
                }
            }
        }
        for page in self.pages().unwrap_or_default() {
            for annot in &page.annotations {
                if let Some(Ok(Object::Dictionary(action))) =
                    annot.get("A").map(|a| self.resolve(a))
                {
                    if action.get("S").and_then(Object::as_name) == Some("JavaScript") {
                        out.push(format!("annotation p{}", page.index + 1));
                    }
                }
            }
        }
        out
    }

    /// Filenames of embedded file streams (Names/EmbeddedFiles).
    pub fn embedded_file_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        let catalog = match self.catalog() {
            Ok(c) => c,
            Err(_) => return out,
        };
        if let Some(names) = self.resolve_dict(catalog.get("Names")) {
            if let Some(tree) = self.resolve_dict(names.get("EmbeddedFiles")) {
                let mut entries = Vec::new();
                self.walk_name_tree(&tree, &mut entries, 0);
                for (name, spec) in entries {
                    let display = self
                        .resolve(&spec)
                        .ok()
                        .and_then(|s| s.as_dict().cloned())
                        .and_then(|d| {
                            d.get("UF")
                                .and_then(Object::as_text)
                                .or_else(|| d.get("F").and_then(Object::as_text))
                        })
                        .unwrap_or(name);
                    out.push(display);
                }
            }
        }
        out
    }

    fn walk_name_tree(&self, node: &Dict, out: &mut Vec<(String, Object)>, depth: u32) {
        if depth > MAX_TREE_DEPTH {
            return;
        }
        if let Some(Ok(Object::Array(pairs))) = node.get("Names").map(|n| self.resolve(n)) {
            for pair in pairs.chunks(2) {
                if let [key, value] = pair {
                    let name = self
                        .resolve(key)
                        .ok()
                        .and_then(|k| k.as_text())
                        .unwrap_or_default();
                    out.push((name, value.clone()));
                }
            }
        }
        if let Some(Ok(Object::Array(kids))) = node.get("Kids").map(|k| self.resolve(k)) {
            for kid in kids {
                if let Ok(Object::Dictionary(d)) = self.resolve(&kid) {
                    self.walk_name_tree(&d, out, depth + 1);
                }
            }
        }
    }

    /// Raw XMP packet bytes from the catalog `/Metadata` stream.
    pub fn xmp_packet(&self) -> Option<Vec<u8>> {
        let catalog = self.catalog().ok()?;
        let meta = self.resolve(catalog.get("Metadata")?).ok()?;
        match meta {
            Object::Stream { ref dict, ref data } => decode::decode_stream(dict, data).ok(),
            _ => None,
        }
    }

    /// The `x:xmptk` toolkit attribute and `xmp:CreatorTool` value of the
    /// XMP packet, when present.
    pub fn xmp_toolkit(&self) -> (Option<String>, Option<String>) {
        let packet = match self.xmp_packet() {
            Some(p) => p,
            None => return (None, None),
        };
        parse_xmp_toolkit(&packet)
    }
}

/// Parse the `%PDF-M.N` header, tolerating leading junk up to 1 KiB as real
/// readers do.
fn parse_header(bytes: &[u8]) -> Result<(u8, u8)> {
    let window = &bytes[..bytes.len().min(1024)];
    let pos = parser::find_subslice(window, b"%PDF-")
        .ok_or_else(|| Error::InvalidContainer("missing %PDF- magic".into()))?;
    let after = &window[pos + 5..];
    let major = after
        .first()
        .filter(|b| b.is_ascii_digit())
        .map(|b| b - b'0');
    let minor = after
        .get(2)
        .filter(|b| b.is_ascii_digit())
        .map(|b| b - b'0');
    match (major, after.get(1), minor) {
        (Some(major), Some(&b'.'), Some(minor)) => Ok((major, minor)),
        _ => Err(Error::InvalidContainer("malformed version in header".into())),
    }
}

fn media_box(node: &Dict) -> Option<[f32; 4]> {
    let arr = node.get("MediaBox")?.as_array()?;
    let v: Vec<f32> = arr.iter().filter_map(|o| o.as_float().map(|f| f as f32)).collect();
    if v.len() == 4 {
        Some([v[0], v[1], v[2], v[3]])
    } else {
        None
    }
}

/// Pull toolkit and creator-tool out of an XMP packet.
fn parse_xmp_toolkit(packet: &[u8]) -> (Option<String>, Option<String>) {
    let content = String::from_utf8_lossy(packet);
    let mut reader = Reader::from_str(&content);
    reader.trim_text(true);
    let mut toolkit = None;
    let mut creator_tool = None;
    let mut in_creator_tool = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name.ends_with("xmpmeta") {
                    for attr in e.attributes().flatten() {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        if key.ends_with("xmptk") {
                            toolkit =
                                Some(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                    }
                }
                if name.ends_with("CreatorTool") {
                    in_creator_tool = true;
                }
                // CreatorTool may also appear as an attribute of rdf:Description
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    if key.ends_with("CreatorTool") && creator_tool.is_none() {
                        creator_tool = Some(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Ok(Event::Text(ref t)) if in_creator_tool => {
                if creator_tool.is_none() {
                    creator_tool = Some(String::from_utf8_lossy(t.as_ref()).into_owned());
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name.ends_with("CreatorTool") {
                    in_creator_tool = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("XMP packet parse stopped: {}", e);
                break;
            }
            _ => {}
        }
    }
    (toolkit, creator_tool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_parsing() {
        assert_eq!(parse_header(b"%PDF-1.7\n...").unwrap(), (1, 7));
        assert_eq!(parse_header(b"junk\n%PDF-2.0\n").unwrap(), (2, 0));
        assert!(parse_header(b"GIF89a").is_err());
    }

    #[test]
    fn xmp_toolkit_extraction() {
        let packet = br#"<?xpacket begin=""?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="Adobe XMP Core 5.6">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description xmlns:xmp="http://ns.adobe.com/xap/1.0/">
   <xmp:CreatorTool>Microsoft Word</xmp:CreatorTool>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>"#;
        let (toolkit, tool) = parse_xmp_toolkit(packet);
        assert_eq!(toolkit.as_deref(), Some("Adobe XMP Core 5.6"));
        assert_eq!(tool.as_deref(), Some("Microsoft Word"));
    }

    #[test]
    fn media_box_reading() {
        let mut d = Dict::new();
        d.insert(
            "MediaBox".into(),
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ]),
        );
        assert_eq!(media_box(&d), Some([0.0, 0.0, 595.0, 842.0]));
    }
}
