//! Two-phase barcode location.
//!
//! DataMatrix decoding is expensive, and most documents carry no 2D-DOC at
//! all. Phase one rasterizes page 1 at ~100 DPI, thresholds it, and keeps
//! dark connected regions that look like a DataMatrix: square-ish, the
//! right size, and of intermediate fill density. Only when candidates exist
//! does phase two re-rasterize at ~200 DPI and run the decoder, restricted
//! to the candidate quadrants, stopping at the first successful parse.

use crate::services::{BarcodeDecoder, PageRasterizer};
use image::GrayImage;
use log::debug;

/// Binarization threshold: pixels darker than this are foreground.
const DARK_THRESHOLD: u8 = 80;
/// Candidate side-length bounds at ~100 DPI, in pixels.
const MIN_SIDE: u32 = 60;
const MAX_SIDE: u32 = 300;
/// Aspect-ratio bounds (width / height).
const MIN_ASPECT: f32 = 0.6;
const MAX_ASPECT: f32 = 1.7;
/// Filled-pixel density bounds inside the bounding box.
const MIN_DENSITY: f32 = 0.25;
const MAX_DENSITY: f32 = 0.70;
/// Pre-filter zoom (~100 DPI) and decode zoom (~200 DPI).
const PREFILTER_ZOOM: f32 = 1.4;
const DECODE_ZOOM: f32 = 2.8;

/// A barcode-shaped region, in pre-filter bitmap pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Bounding box `[x, y, w, h]`
    pub bbox: [u32; 4],
}

/// Phase-one candidate search over a thresholded bitmap. Only the top-left
/// and top-right quadrants are examined — 2D-DOC placement rules put the
/// barcode there.
pub fn find_candidates(bitmap: &GrayImage) -> Vec<Candidate> {
    let (w, h) = bitmap.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let top_half = h / 2;
    let mut visited = vec![false; (w * h) as usize];
    let idx = |x: u32, y: u32| (y * w + x) as usize;
    let dark = |x: u32, y: u32| bitmap.get_pixel(x, y).0[0] < DARK_THRESHOLD;
    let mut out = Vec::new();
    let mut stack = Vec::new();

    for sy in 0..top_half {
        for sx in 0..w {
            if visited[idx(sx, sy)] || !dark(sx, sy) {
                continue;
            }
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (sx, sy, sx, sy);
            let mut filled = 0u32;
            stack.push((sx, sy));
            visited[idx(sx, sy)] = true;
            while let Some((x, y)) = stack.pop() {
                filled += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
                // 8-connectivity bridges the quiet gaps between modules
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                            continue;
                        }
                        let (nx, ny) = (nx as u32, ny as u32);
                        if !visited[idx(nx, ny)] && dark(nx, ny) {
                            visited[idx(nx, ny)] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }
            let bw = max_x - min_x + 1;
            let bh = max_y - min_y + 1;
            if !(MIN_SIDE..=MAX_SIDE).contains(&bw) || !(MIN_SIDE..=MAX_SIDE).contains(&bh) {
                continue;
            }
            let aspect = bw as f32 / bh as f32;
            if !(MIN_ASPECT..=MAX_ASPECT).contains(&aspect) {
                continue;
            }
            let density = filled as f32 / (bw * bh) as f32;
            if !(MIN_DENSITY..=MAX_DENSITY).contains(&density) {
                continue;
            }
            out.push(Candidate {
                bbox: [min_x, min_y, bw, bh],
            });
        }
    }
    out
}

/// Outcome of the two-phase search.
#[derive(Debug, Clone, PartialEq)]
pub enum LocateOutcome {
    /// A payload was decoded
    Decoded(Vec<u8>),
    /// Candidates existed but none decoded
    CandidatesOnly(usize),
    /// Nothing barcode-shaped on page 1
    Nothing,
    /// Page 1 could not be rendered
    NoRender,
}

/// Run both phases over page 1.
pub fn locate_and_decode(
    rasterizer: &dyn PageRasterizer,
    decoder: &dyn BarcodeDecoder,
) -> LocateOutcome {
    let preview = match rasterizer.render(0, PREFILTER_ZOOM) {
        Some(b) => b,
        None => return LocateOutcome::NoRender,
    };
    let candidates = find_candidates(&preview);
    if candidates.is_empty() {
        return LocateOutcome::Nothing;
    }
    debug!("{} DataMatrix candidates on page 1", candidates.len());

    let full = match rasterizer.render(0, DECODE_ZOOM) {
        Some(b) => b,
        None => return LocateOutcome::CandidatesOnly(candidates.len()),
    };
    let scale = DECODE_ZOOM / PREFILTER_ZOOM;
    let (fw, fh) = full.dimensions();
    for candidate in &candidates {
        let [x, y, w, h] = candidate.bbox;
        // margin of half a module-grid around the candidate
        let margin = (w.max(h) as f32 * scale * 0.25) as u32;
        let cx = ((x as f32 * scale) as u32).saturating_sub(margin);
        let cy = ((y as f32 * scale) as u32).saturating_sub(margin);
        let cw = ((w as f32 * scale) as u32 + 2 * margin).min(fw.saturating_sub(cx));
        let ch = ((h as f32 * scale) as u32 + 2 * margin).min(fh.saturating_sub(cy));
        if cw == 0 || ch == 0 {
            continue;
        }
        let crop = image::imageops::crop_imm(&full, cx, cy, cw, ch).to_image();
        let decoded = decoder.decode_datamatrix(&crop);
        if let Some(first) = decoded.into_iter().next() {
            return LocateOutcome::Decoded(first.payload);
        }
    }
    LocateOutcome::CandidatesOnly(candidates.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, image::Luma([255]))
    }

    /// Paint a checker-ish DataMatrix-like square.
    fn paint_matrix(img: &mut GrayImage, x0: u32, y0: u32, side: u32) {
        for y in 0..side {
            for x in 0..side {
                // solid L-shaped finder plus ~50% checkered interior
                let border = x == 0 || y == side - 1;
                let checker = (x / 4 + y / 4) % 2 == 0;
                if border || checker {
                    img.put_pixel(x0 + x, y0 + y, image::Luma([0]));
                }
            }
        }
    }

    #[test]
    fn matrix_like_region_is_a_candidate() {
        let mut img = page(800, 1100);
        paint_matrix(&mut img, 600, 40, 100);
        let candidates = find_candidates(&img);
        assert_eq!(candidates.len(), 1);
        let [x, y, w, h] = candidates[0].bbox;
        assert!(x >= 590 && y <= 50);
        assert!((90..=110).contains(&w) && (90..=110).contains(&h));
    }

    #[test]
    fn bottom_half_is_ignored() {
        let mut img = page(800, 1100);
        paint_matrix(&mut img, 100, 900, 100);
        assert!(find_candidates(&img).is_empty());
    }

    #[test]
    fn size_and_density_filters() {
        // tiny speck
        let mut img = page(800, 1100);
        paint_matrix(&mut img, 100, 100, 20);
        assert!(find_candidates(&img).is_empty());

        // solid block: density ~1.0, above the ceiling
        let mut img = page(800, 1100);
        for y in 100..200 {
            for x in 100..200 {
                img.put_pixel(x, y, image::Luma([0]));
            }
        }
        assert!(find_candidates(&img).is_empty());
    }
}
