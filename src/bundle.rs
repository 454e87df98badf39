//! Document bundle extraction.
//!
//! Runs once per analysis and produces the [`DocumentBundle`] every module
//! reads: content hash, structured + raw metadata, per-page text and
//! positioned spans, font records and image descriptors. The bundle is
//! immutable after construction and shared by reference.
//!
//! The content hash is computed by streaming the file before any parsing is
//! attempted, so corrupt files can still be identified in reports.

use crate::error::{Error, Result};
use crate::pdf::object::Object;
use crate::pdf::text::{PlacedSpan, XObjectUse};
use crate::pdf::PdfFile;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Structured view of the container metadata. Every field is optional;
/// absence is itself a signal for the metadata analyzer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    /// CreationDate, offset preserved from the source
    pub creation_date: Option<DateTime<FixedOffset>>,
    /// ModDate, offset preserved from the source
    pub mod_date: Option<DateTime<FixedOffset>>,
    /// Producer software
    pub producer: Option<String>,
    /// Creator application
    pub creator: Option<String>,
    /// Author
    pub author: Option<String>,
    /// Title
    pub title: Option<String>,
    /// Subject
    pub subject: Option<String>,
    /// Keywords
    pub keywords: Option<String>,
}

impl DocumentMetadata {
    /// True when every recognized key is empty or absent.
    pub fn is_empty(&self) -> bool {
        self.creation_date.is_none()
            && self.mod_date.is_none()
            && none_or_blank(&self.producer)
            && none_or_blank(&self.creator)
            && none_or_blank(&self.author)
            && none_or_blank(&self.title)
            && none_or_blank(&self.subject)
            && none_or_blank(&self.keywords)
    }
}

fn none_or_blank(v: &Option<String>) -> bool {
    v.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

/// Aggregated record for one font name across the document.
#[derive(Debug, Clone, PartialEq)]
pub struct FontRecord {
    /// `/BaseFont` name, subset prefix included
    pub name: String,
    /// Name begins with exactly six uppercase letters and `+`
    pub is_subset: bool,
    /// A FontFile stream exists in the descriptor
    pub is_embedded: bool,
    /// Zero-based pages referencing this font
    pub pages_used: Vec<usize>,
    /// Number of page-resource references
    pub usage_count: usize,
}

/// Descriptor for one embedded image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescriptor {
    /// Object number of the image XObject
    pub xref: u32,
    /// Zero-based page index
    pub page: usize,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Colorspace name
    pub colorspace: Option<String>,
    /// Bits per component
    pub bpc: Option<u8>,
    /// Outermost stream filter
    pub filter: Option<String>,
    /// Encoded stream size in bytes
    pub byte_size: usize,
    /// Estimated horizontal DPI (0.0 when no placement was seen)
    pub dpi_x: f32,
    /// Estimated vertical DPI (0.0 when no placement was seen)
    pub dpi_y: f32,
}

/// Everything the analysis modules read. Immutable after construction.
#[derive(Debug, Clone)]
pub struct DocumentBundle {
    /// Path the document was loaded from
    pub file_path: PathBuf,
    /// SHA-256 of the file bytes, lowercase hex
    pub content_hash: String,
    /// Page count
    pub page_count: usize,
    /// Structured metadata
    pub metadata: DocumentMetadata,
    /// Every key the Info dictionary advertised, verbatim, insertion order
    pub raw_metadata: IndexMap<String, String>,
    /// Plain text, one string per page (empty when no text layer)
    pub text_by_page: Vec<String>,
    /// Positioned spans per page
    pub spans_by_page: Vec<Vec<PlacedSpan>>,
    /// Image placements per page
    pub image_uses_by_page: Vec<Vec<XObjectUse>>,
    /// Page sizes in points (width, height)
    pub page_sizes: Vec<(f32, f32)>,
    /// Aggregated font records
    pub fonts: Vec<FontRecord>,
    /// Image descriptors
    pub images: Vec<ImageDescriptor>,
}

impl DocumentBundle {
    /// All page text joined, for whole-document scans.
    pub fn full_text(&self) -> String {
        self.text_by_page.join("\n")
    }

    /// Total character count of the text layer.
    pub fn text_len(&self) -> usize {
        self.text_by_page.iter().map(|t| t.chars().count()).sum()
    }
}

/// SHA-256 of a file, streamed in 8 KiB chunks.
pub fn compute_content_hash(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound(path.display().to_string()),
        _ => Error::Io(e),
    })?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

lazy_static! {
    static ref SUBSET_PREFIX: Regex = Regex::new(r"^[A-Z]{6}\+").unwrap();
}

/// True when a font name carries the `ABCDEF+` subset tag.
pub fn is_subset_name(name: &str) -> bool {
    SUBSET_PREFIX.is_match(name)
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSS` plus optional offset).
///
/// Malformed input degrades to `None`; a missing offset is read as UTC.
pub fn parse_pdf_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.strip_prefix("D:").unwrap_or(raw).trim();
    if s.len() < 4 {
        return None;
    }
    let digits: String = s.chars().take(14).take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        debug!("unparseable PDF date '{}'", raw);
        return None;
    }
    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits.get(4..6).and_then(|v| v.parse().ok()).unwrap_or(1);
    let day: u32 = digits.get(6..8).and_then(|v| v.parse().ok()).unwrap_or(1);
    let hour: u32 = digits.get(8..10).and_then(|v| v.parse().ok()).unwrap_or(0);
    let minute: u32 = digits.get(10..12).and_then(|v| v.parse().ok()).unwrap_or(0);
    let second: u32 = digits.get(12..14).and_then(|v| v.parse().ok()).unwrap_or(0);
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let naive: NaiveDateTime = date.and_hms_opt(hour, minute, second)?;
    let offset =
        parse_tz_offset(&s[digits.len()..]).unwrap_or_else(|| FixedOffset::east_opt(0).expect("UTC"));
    match offset.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Some(dt),
        chrono::LocalResult::Ambiguous(dt, _) => Some(dt),
        chrono::LocalResult::None => {
            debug!("impossible local instant in PDF date '{}'", raw);
            None
        }
    }
}

fn parse_tz_offset(rest: &str) -> Option<FixedOffset> {
    let mut chars = rest.chars();
    match chars.next() {
        Some('Z') => FixedOffset::east_opt(0),
        Some(sign @ ('+' | '-')) => {
            let tail: String = chars.collect();
            let digits: Vec<u32> = tail
                .split('\'')
                .filter(|p| !p.is_empty())
                .filter_map(|p| p.parse().ok())
                .collect();
            let hours = *digits.first()? as i32;
            let minutes = *digits.get(1).unwrap_or(&0) as i32;
            let total = hours * 3600 + minutes * 60;
            FixedOffset::east_opt(if sign == '-' { -total } else { total })
        }
        _ => None,
    }
}

/// The instant as UTC, for comparisons.
pub fn to_utc(dt: &DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

fn object_display(obj: &Object) -> Option<String> {
    match obj {
        Object::String(_) => obj.as_text(),
        Object::Name(n) => Some(n.clone()),
        Object::Integer(i) => Some(i.to_string()),
        Object::Real(r) => Some(r.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract the full bundle from a document on disk.
pub fn extract_bundle(path: impl AsRef<Path>) -> Result<DocumentBundle> {
    let path = path.as_ref();
    let content_hash = compute_content_hash(path)?;
    let file = PdfFile::open(path)?;

    let info = file.info();
    let mut raw_metadata = IndexMap::new();
    for (key, value) in info.iter() {
        if let Some(text) = object_display(value) {
            raw_metadata.insert(key.clone(), text);
        }
    }
    let metadata = DocumentMetadata {
        creation_date: raw_metadata.get("CreationDate").and_then(|v| parse_pdf_date(v)),
        mod_date: raw_metadata.get("ModDate").and_then(|v| parse_pdf_date(v)),
        producer: raw_metadata.get("Producer").cloned(),
        creator: raw_metadata.get("Creator").cloned(),
        author: raw_metadata.get("Author").cloned(),
        title: raw_metadata.get("Title").cloned(),
        subject: raw_metadata.get("Subject").cloned(),
        keywords: raw_metadata.get("Keywords").cloned(),
    };

    let pages = match file.pages() {
        Ok(p) => p,
        Err(e) => {
            warn!("page tree unreadable, analyzing without pages: {}", e);
            Vec::new()
        }
    };

    let mut text_by_page = Vec::with_capacity(pages.len());
    let mut spans_by_page = Vec::with_capacity(pages.len());
    let mut image_uses_by_page = Vec::with_capacity(pages.len());
    let mut page_sizes = Vec::with_capacity(pages.len());
    let mut fonts: IndexMap<String, FontRecord> = IndexMap::new();
    let mut images = Vec::new();

    for page in &pages {
        let run = file.page_run(page);
        text_by_page.push(crate::pdf::text::assemble_text(&run.spans));
        page_sizes.push((
            page.media_box[2] - page.media_box[0],
            page.media_box[3] - page.media_box[1],
        ));

        for font in file.page_fonts(page) {
            if font.base_font.is_empty() {
                continue;
            }
            let record = fonts.entry(font.base_font.clone()).or_insert_with(|| FontRecord {
                name: font.base_font.clone(),
                is_subset: is_subset_name(&font.base_font),
                is_embedded: font.embedded,
                pages_used: Vec::new(),
                usage_count: 0,
            });
            record.is_embedded = record.is_embedded || font.embedded;
            if record.pages_used.last() != Some(&page.index) {
                record.pages_used.push(page.index);
            }
            record.usage_count += 1;
        }

        for img in file.page_images(page) {
            let placement = run
                .xobjects
                .iter()
                .find(|u| u.name == img.res_name)
                .cloned();
            let (dpi_x, dpi_y) = match &placement {
                Some(p) if p.width > 0.5 && p.height > 0.5 => (
                    img.width as f32 * 72.0 / p.width,
                    img.height as f32 * 72.0 / p.height,
                ),
                _ => (0.0, 0.0),
            };
            images.push(ImageDescriptor {
                xref: img.obj_num,
                page: page.index,
                width: img.width,
                height: img.height,
                colorspace: img.colorspace.clone(),
                bpc: img.bpc,
                filter: img.filter.clone(),
                byte_size: img.byte_size,
                dpi_x,
                dpi_y,
            });
        }
        image_uses_by_page.push(run.xobjects.clone());
        spans_by_page.push(run.spans);
    }

    Ok(DocumentBundle {
        file_path: path.to_path_buf(),
        content_hash,
        page_count: pages.len(),
        metadata,
        raw_metadata,
        text_by_page,
        spans_by_page,
        image_uses_by_page,
        page_sizes,
        fonts: fonts.into_values().collect(),
        images,
    })
}
