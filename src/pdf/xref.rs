//! Cross-reference parsing.
//!
//! Supports classic xref tables and xref streams (PDF 1.5+), following the
//! `/Prev` chain across incremental updates. The merged view keeps the
//! newest definition of every object, exactly like a conforming reader; the
//! per-revision views feed the structure analyzer's revision diff.
//!
//! The free-slot census (`free_count`) counts objects the final table marks
//! free while older revisions still carry their bodies — ghost objects left
//! behind by editors and signers.

use super::decode::decode_stream;
use super::object::{Dict, Object};
use super::parser::{find_subslice, parse_indirect, parse_object};
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// One cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free slot: next free object number, generation to use on reuse
    Free {
        /// Next free object in the free list
        next: u32,
        /// Generation for reuse
        gen: u16,
    },
    /// In-use object at a byte offset
    InUse {
        /// Byte offset of the object in the file
        offset: u64,
        /// Generation number
        gen: u16,
    },
    /// Object stored inside an object stream
    Compressed {
        /// Object number of the containing stream
        stream: u32,
        /// Index within the stream
        index: u32,
    },
}

/// Merged cross-reference table plus trailer, newest revision first.
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    /// Newest entry per object number
    pub entries: BTreeMap<u32, XrefEntry>,
    /// Merged trailer (newest keys win)
    pub trailer: Dict,
    /// startxref offsets of each revision, newest first
    pub section_offsets: Vec<u64>,
}

impl XrefTable {
    /// Look up an object.
    pub fn get(&self, num: u32) -> Option<&XrefEntry> {
        self.entries.get(&num)
    }

    /// Number of free slots in the final table, excluding the list head
    /// (object 0 is always free by construction).
    pub fn free_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(num, e)| **num != 0 && matches!(e, XrefEntry::Free { .. }))
            .count()
    }
}

/// Locate the `startxref` offset by scanning the file tail.
pub fn find_startxref(bytes: &[u8]) -> Option<u64> {
    let tail_len = bytes.len().min(2048);
    let tail = &bytes[bytes.len() - tail_len..];
    let pos = rfind_subslice(tail, b"startxref")?;
    let after = &tail[pos + b"startxref".len()..];
    let digits: Vec<u8> = after
        .iter()
        .copied()
        .skip_while(|b| super::lexer::is_whitespace(*b))
        .take_while(|b| b.is_ascii_digit())
        .collect();
    std::str::from_utf8(&digits).ok()?.parse().ok()
}

fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// Parse the whole xref chain starting at `start_offset`.
///
/// Entries already present (from a newer revision) are never overwritten
/// while following `/Prev`. The chain length is bounded to guard against
/// cyclic `/Prev` links in malformed files.
pub fn parse_xref_chain(bytes: &[u8], start_offset: u64) -> Result<XrefTable> {
    let mut table = XrefTable::default();
    let mut next = Some(start_offset);
    let mut hops = 0;
    while let Some(offset) = next {
        if hops > 64 {
            return Err(Error::InvalidContainer("cyclic /Prev chain".into()));
        }
        hops += 1;
        if offset as usize >= bytes.len() {
            return Err(Error::InvalidContainer(format!(
                "xref offset {} beyond end of file",
                offset
            )));
        }
        table.section_offsets.push(offset);
        let section = parse_xref_section(bytes, offset as usize)?;
        for (num, entry) in section.entries {
            table.entries.entry(num).or_insert(entry);
        }
        for (k, v) in section.trailer.iter() {
            if !table.trailer.contains_key(k) {
                table.trailer.insert(k.clone(), v.clone());
            }
        }
        next = section.prev;
        // hybrid-reference files: the classic table points to a parallel
        // xref stream via /XRefStm; merge it at lower priority than /Prev
        if let Some(stm) = section.xref_stm {
            if (stm as usize) < bytes.len() {
                if let Ok(sub) = parse_xref_section(bytes, stm as usize) {
                    for (num, entry) in sub.entries {
                        table.entries.entry(num).or_insert(entry);
                    }
                }
            }
        }
    }
    if table.trailer.is_empty() {
        return Err(Error::InvalidContainer("no trailer found".into()));
    }
    Ok(table)
}

/// A single parsed xref section (one revision).
pub struct XrefSection {
    /// Entries declared by this section
    pub entries: BTreeMap<u32, XrefEntry>,
    /// This section's trailer dictionary
    pub trailer: Dict,
    /// `/Prev` link to the previous revision
    pub prev: Option<u64>,
    /// `/XRefStm` link (hybrid files)
    pub xref_stm: Option<u64>,
}

/// Parse one xref section, classic or stream, at `offset`.
pub fn parse_xref_section(bytes: &[u8], offset: usize) -> Result<XrefSection> {
    let slice = &bytes[offset..];
    let trimmed: &[u8] = {
        let mut i = 0;
        while i < slice.len() && super::lexer::is_whitespace(slice[i]) {
            i += 1;
        }
        &slice[i..]
    };
    if trimmed.starts_with(b"xref") {
        parse_classic_section(trimmed)
    } else {
        parse_stream_section(slice)
    }
}

fn parse_classic_section(input: &[u8]) -> Result<XrefSection> {
    let mut rest = &input[b"xref".len()..];
    let mut entries = BTreeMap::new();
    loop {
        rest = skip_white(rest);
        if rest.starts_with(b"trailer") {
            rest = &rest[b"trailer".len()..];
            break;
        }
        // subsection header: "start count"
        let (start, r) = read_uint(rest)
            .ok_or_else(|| Error::InvalidContainer("malformed xref subsection".into()))?;
        let (count, r) = read_uint(skip_white(r))
            .ok_or_else(|| Error::InvalidContainer("malformed xref subsection".into()))?;
        rest = skip_white(r);
        for i in 0..count {
            if rest.len() < 18 {
                return Err(Error::InvalidContainer("truncated xref entry".into()));
            }
            let line = &rest[..18];
            let offset: u64 = std::str::from_utf8(&line[0..10])
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| Error::InvalidContainer("bad xref offset field".into()))?;
            let gen: u16 = std::str::from_utf8(&line[11..16])
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| Error::InvalidContainer("bad xref generation field".into()))?;
            let kind = line[17];
            let num = (start + i) as u32;
            let entry = match kind {
                b'n' => XrefEntry::InUse { offset, gen },
                b'f' => XrefEntry::Free {
                    next: offset as u32,
                    gen,
                },
                other => {
                    return Err(Error::InvalidContainer(format!(
                        "bad xref entry type '{}'",
                        other as char
                    )))
                }
            };
            entries.insert(num, entry);
            // entries are 18 significant bytes padded to 20 with EOL
            rest = skip_white(&rest[18..]);
        }
    }
    let (trailer_obj, _) = parse_object(rest)?;
    let trailer = trailer_obj
        .as_dict()
        .cloned()
        .ok_or_else(|| Error::InvalidContainer("trailer is not a dictionary".into()))?;
    let prev = trailer.get("Prev").and_then(Object::as_int).map(|v| v as u64);
    let xref_stm = trailer
        .get("XRefStm")
        .and_then(Object::as_int)
        .map(|v| v as u64);
    Ok(XrefSection {
        entries,
        trailer,
        prev,
        xref_stm,
    })
}

fn parse_stream_section(input: &[u8]) -> Result<XrefSection> {
    let (_id, obj, _rest) = parse_indirect(input)
        .map_err(|_| Error::InvalidContainer("xref offset points at no object".into()))?;
    let (dict, data) = match &obj {
        Object::Stream { dict, data } => (dict.clone(), decode_stream(dict, data)?),
        _ => return Err(Error::InvalidContainer("xref stream expected".into())),
    };
    if dict.get("Type").and_then(Object::as_name) != Some("XRef") {
        return Err(Error::InvalidContainer("not an XRef stream".into()));
    }
    let w: Vec<usize> = dict
        .get("W")
        .and_then(Object::as_array)
        .map(|a| a.iter().filter_map(|o| o.as_int().map(|v| v as usize)).collect())
        .unwrap_or_default();
    if w.len() < 3 {
        return Err(Error::InvalidContainer("XRef stream missing /W".into()));
    }
    let size = dict.get("Size").and_then(Object::as_int).unwrap_or(0);
    let index: Vec<u64> = dict
        .get("Index")
        .and_then(Object::as_array)
        .map(|a| a.iter().filter_map(|o| o.as_int().map(|v| v as u64)).collect())
        .unwrap_or_else(|| vec![0, size.max(0) as u64]);
    let row_len: usize = w.iter().sum();
    if row_len == 0 {
        return Err(Error::InvalidContainer("XRef stream zero row width".into()));
    }
    let mut entries = BTreeMap::new();
    let mut rows = data.chunks_exact(row_len);
    for pair in index.chunks(2) {
        let (start, count) = match pair {
            [s, c] => (*s, *c),
            _ => break,
        };
        for i in 0..count {
            let row = match rows.next() {
                Some(r) => r,
                None => break,
            };
            let mut fields = [1u64, 0, 0]; // field 1 defaults to type 1
            let mut cursor = 0usize;
            for (fi, &width) in w.iter().enumerate() {
                if width > 0 {
                    let mut v = 0u64;
                    for &b in &row[cursor..cursor + width] {
                        v = (v << 8) | b as u64;
                    }
                    fields[fi] = v;
                    cursor += width;
                }
            }
            let num = (start + i) as u32;
            let entry = match fields[0] {
                0 => XrefEntry::Free {
                    next: fields[1] as u32,
                    gen: fields[2] as u16,
                },
                1 => XrefEntry::InUse {
                    offset: fields[1],
                    gen: fields[2] as u16,
                },
                2 => XrefEntry::Compressed {
                    stream: fields[1] as u32,
                    index: fields[2] as u32,
                },
                _ => continue, // reserved entry types per ISO 32000 are skipped
            };
            entries.insert(num, entry);
        }
    }
    let prev = dict.get("Prev").and_then(Object::as_int).map(|v| v as u64);
    Ok(XrefSection {
        entries,
        trailer: dict,
        prev,
        xref_stm: None,
    })
}

/// Load an object at its xref-declared offset, verifying the object number.
pub fn load_at(bytes: &[u8], entry: &XrefEntry, want: u32) -> Result<Object> {
    match entry {
        XrefEntry::InUse { offset, .. } => {
            let start = *offset as usize;
            if start >= bytes.len() {
                return Err(Error::ObjectNotFound(want, 0));
            }
            let (id, obj, _) = parse_indirect(&bytes[start..])?;
            if id.num != want {
                return Err(Error::ObjectNotFound(want, 0));
            }
            Ok(obj)
        }
        XrefEntry::Free { .. } => Ok(Object::Null),
        XrefEntry::Compressed { .. } => Err(Error::Decode(
            "compressed entry must be resolved through its object stream".into(),
        )),
    }
}

/// Extract one object out of an object stream (`/Type /ObjStm`).
pub fn load_from_object_stream(stream: &Object, index: u32, want: u32) -> Result<Object> {
    let (dict, data) = match stream {
        Object::Stream { dict, data } => (dict, decode_stream(dict, data)?),
        _ => return Err(Error::Decode("object stream expected".into())),
    };
    let n = dict.get("N").and_then(Object::as_int).unwrap_or(0) as usize;
    let first = dict.get("First").and_then(Object::as_int).unwrap_or(0) as usize;
    let mut header = &data[..first.min(data.len())];
    let mut pairs = Vec::with_capacity(n);
    for _ in 0..n {
        let (num, r1) = match read_uint(skip_white(header)) {
            Some(v) => v,
            None => break,
        };
        let (off, r2) = match read_uint(skip_white(r1)) {
            Some(v) => v,
            None => break,
        };
        pairs.push((num as u32, off as usize));
        header = r2;
    }
    let slot = pairs
        .get(index as usize)
        .copied()
        .filter(|(num, _)| *num == want)
        .or_else(|| pairs.iter().copied().find(|(num, _)| *num == want))
        .ok_or(Error::ObjectNotFound(want, 0))?;
    let start = first + slot.1;
    if start >= data.len() {
        return Err(Error::ObjectNotFound(want, 0));
    }
    let (obj, _) = parse_object(&data[start..])?;
    Ok(obj)
}

fn skip_white(mut input: &[u8]) -> &[u8] {
    while let Some(b) = input.first() {
        if super::lexer::is_whitespace(*b) {
            input = &input[1..];
        } else {
            break;
        }
    }
    input
}

fn read_uint(input: &[u8]) -> Option<(u64, &[u8])> {
    let end = input.iter().position(|b| !b.is_ascii_digit())?;
    if end == 0 {
        return None;
    }
    let v = std::str::from_utf8(&input[..end]).ok()?.parse().ok()?;
    Some((v, &input[end..]))
}

/// Count `%%EOF` markers — the number of saved generations of the file.
pub fn count_eof_markers(bytes: &[u8]) -> usize {
    let mut count = 0;
    let mut pos = 0;
    while let Some(found) = find_subslice(&bytes[pos..], b"%%EOF") {
        count += 1;
        pos += found + b"%%EOF".len();
    }
    count
}

/// Byte offsets just past each `%%EOF` marker (revision boundaries).
pub fn generation_boundaries(bytes: &[u8]) -> Vec<usize> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(found) = find_subslice(&bytes[pos..], b"%%EOF") {
        let mut end = pos + found + b"%%EOF".len();
        // include the EOL terminating the marker
        if bytes.get(end) == Some(&b'\r') {
            end += 1;
        }
        if bytes.get(end) == Some(&b'\n') {
            end += 1;
        }
        out.push(end);
        pos = end;
    }
    out
}
