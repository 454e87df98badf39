//! Stream filter decoding.
//!
//! Supports the filters the pipeline actually meets in invoices:
//! FlateDecode (with PNG/TIFF predictors, required for xref streams),
//! ASCIIHexDecode, ASCII85Decode and RunLengthDecode. DCTDecode payloads are
//! passed through untouched — they are JPEG images consumed by the
//! forensics module via the `image` crate. Anything else is reported as an
//! unsupported filter.

use super::object::{Dict, Object};
use crate::error::{Error, Result};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Decompression bomb guard.
const MAX_DECODED_SIZE: usize = 64 * 1024 * 1024;

/// Filter parameters relevant to prediction.
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10..15 = PNG)
    pub predictor: u8,
    /// Samples per row
    pub columns: usize,
    /// Color components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl DecodeParams {
    /// Read `/DecodeParms` out of a stream dictionary.
    pub fn from_dict(parms: &Dict) -> Self {
        Self {
            predictor: parms
                .get("Predictor")
                .and_then(Object::as_int)
                .unwrap_or(1)
                .clamp(1, 15) as u8,
            columns: parms.get("Columns").and_then(Object::as_int).unwrap_or(1).max(1) as usize,
            colors: parms.get("Colors").and_then(Object::as_int).unwrap_or(1).max(1) as usize,
            bits_per_component: parms
                .get("BitsPerComponent")
                .and_then(Object::as_int)
                .unwrap_or(8)
                .max(1) as usize,
        }
    }
}

/// Names of the filters applied to a stream, outermost first.
pub fn filter_names(dict: &Dict) -> Vec<String> {
    match dict.get("Filter") {
        Some(Object::Name(n)) => vec![n.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode a stream's payload by applying its declared filter chain.
///
/// DCTDecode (and the rarer JPXDecode) terminate the chain with the raw
/// compressed image returned as-is.
pub fn decode_stream(dict: &Dict, data: &[u8]) -> Result<Vec<u8>> {
    let filters = filter_names(dict);
    if filters.is_empty() {
        return Ok(data.to_vec());
    }
    let params = match dict.get("DecodeParms").or_else(|| dict.get("DP")) {
        Some(Object::Dictionary(d)) => DecodeParams::from_dict(d),
        _ => DecodeParams::default(),
    };
    let mut current = data.to_vec();
    for filter in &filters {
        current = match filter.as_str() {
            "FlateDecode" | "Fl" => {
                let inflated = flate_decode(&current)?;
                apply_predictor(inflated, &params)?
            }
            "ASCIIHexDecode" | "AHx" => ascii_hex_decode(&current)?,
            "ASCII85Decode" | "A85" => ascii85_decode(&current)?,
            "RunLengthDecode" | "RL" => run_length_decode(&current)?,
            "DCTDecode" | "DCT" | "JPXDecode" => return Ok(current),
            other => return Err(Error::Decode(format!("unsupported filter: {}", other))),
        };
    }
    Ok(current)
}

fn flate_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut decoder = ZlibDecoder::new(data).take(MAX_DECODED_SIZE as u64 + 1);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decode(format!("flate: {}", e)))?;
    if out.len() > MAX_DECODED_SIZE {
        return Err(Error::Decode("flate: output exceeds size limit".into()));
    }
    Ok(out)
}

/// Undo the row predictor applied before compression.
fn apply_predictor(data: Vec<u8>, params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data),
        2 => tiff_predictor(data, params),
        10..=15 => png_predictor(data, params),
        p => Err(Error::Decode(format!("unknown predictor {}", p))),
    }
}

fn bytes_per_pixel(params: &DecodeParams) -> usize {
    ((params.colors * params.bits_per_component) / 8).max(1)
}

fn tiff_predictor(mut data: Vec<u8>, params: &DecodeParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(Error::Decode("TIFF predictor: only 8 bpc supported".into()));
    }
    let bpp = bytes_per_pixel(params);
    let row_len = params.columns * params.colors;
    for row in data.chunks_mut(row_len) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    Ok(data)
}

fn png_predictor(data: Vec<u8>, params: &DecodeParams) -> Result<Vec<u8>> {
    let bpp = bytes_per_pixel(params);
    let row_len = (params.columns * params.colors * params.bits_per_component + 7) / 8;
    let stride = row_len + 1; // one tag byte per row
    if stride == 1 {
        return Ok(Vec::new());
    }
    let mut out: Vec<u8> = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_len];
    for chunk in data.chunks(stride) {
        if chunk.len() < 2 {
            break;
        }
        let tag = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_len, 0);
        match tag {
            0 => {}
            1 => {
                for i in bpp..row_len {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            }
            2 => {
                for i in 0..row_len {
                    row[i] = row[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                for i in 0..row_len {
                    let left = if i >= bpp { row[i - bpp] as u16 } else { 0 };
                    let up = prev_row[i] as u16;
                    row[i] = row[i].wrapping_add(((left + up) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row_len {
                    let a = if i >= bpp { row[i - bpp] as i16 } else { 0 };
                    let b = prev_row[i] as i16;
                    let c = if i >= bpp { prev_row[i - bpp] as i16 } else { 0 };
                    let p = a + b - c;
                    let (pa, pb, pc) = ((p - a).abs(), (p - b).abs(), (p - c).abs());
                    let pred = if pa <= pb && pa <= pc {
                        a
                    } else if pb <= pc {
                        b
                    } else {
                        c
                    };
                    row[i] = row[i].wrapping_add(pred as u8);
                }
            }
            t => return Err(Error::Decode(format!("bad PNG predictor tag {}", t))),
        }
        out.extend_from_slice(&row);
        prev_row = row;
    }
    Ok(out)
}

fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;
    for &b in data {
        let v = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            b'>' => break,
            b if super::lexer::is_whitespace(b) => continue,
            other => {
                return Err(Error::Decode(format!(
                    "ASCIIHex: invalid byte 0x{:02x}",
                    other
                )))
            }
        };
        match pending.take() {
            Some(hi) => out.push((hi << 4) | v),
            None => pending = Some(v),
        }
    }
    if let Some(hi) = pending {
        out.push(hi << 4);
    }
    Ok(out)
}

fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut n = 0usize;
    let mut i = 0usize;
    while i < data.len() {
        let b = data[i];
        i += 1;
        if super::lexer::is_whitespace(b) {
            continue;
        }
        if b == b'~' {
            break;
        }
        if b == b'z' && n == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        if !(b'!'..=b'u').contains(&b) {
            return Err(Error::Decode(format!("ASCII85: invalid byte 0x{:02x}", b)));
        }
        group[n] = b - b'!';
        n += 1;
        if n == 5 {
            let v = group.iter().fold(0u32, |acc, &d| acc * 85 + d as u32);
            out.extend_from_slice(&v.to_be_bytes());
            n = 0;
        }
    }
    if n > 0 {
        // pad the partial group with 'u' and keep n-1 output bytes
        for slot in group.iter_mut().skip(n) {
            *slot = 84;
        }
        let v = group.iter().fold(0u32, |acc, &d| acc * 85 + d as u32);
        out.extend_from_slice(&v.to_be_bytes()[..n - 1]);
    }
    Ok(out)
}

fn run_length_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < data.len() {
        let len = data[i];
        i += 1;
        match len {
            128 => break,
            0..=127 => {
                let take = len as usize + 1;
                if i + take > data.len() {
                    return Err(Error::Decode("RunLength: truncated literal run".into()));
                }
                out.extend_from_slice(&data[i..i + take]);
                i += take;
            }
            129..=255 => {
                if i >= data.len() {
                    return Err(Error::Decode("RunLength: truncated repeat run".into()));
                }
                let count = 257 - len as usize;
                out.extend(std::iter::repeat(data[i]).take(count));
                i += 1;
            }
        }
    }
    Ok(out)
}
