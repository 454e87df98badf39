//! Error-level analysis of embedded raster images.
//!
//! Re-encoding an image as JPEG at a known quality and amplifying the
//! difference exposes regions whose compression history differs from the
//! rest of the image — the footprint of a local edit (an amount painted
//! over in an image editor survives this even when it is invisible to the
//! eye). Regions are binarized at μ+3σ and reported as bounding boxes for
//! UI overlay.

use crate::bundle::ImageDescriptor;
use crate::model::{Flag, FlagCode, FlagDetails, ModuleName, ModuleResult, Severity};
use crate::modules::ModuleContext;
use crate::pdf::object::Object;
use crate::pdf::PdfFile;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, RgbImage};
use log::{debug, warn};

/// Images smaller than this carry too little texture for ELA.
const MIN_DIMENSION: u32 = 200;
/// Images beyond 2 MP are skipped to bound per-image work.
const MAX_PIXELS: u64 = 2_000_000;
/// Re-encode quality.
const ELA_JPEG_QUALITY: u8 = 95;
/// Amplification applied to the absolute difference.
const ELA_SCALE: u16 = 20;
/// Binarization offset in standard deviations.
const ELA_THRESHOLD_SIGMAS: f64 = 3.0;
/// Minimum connected-component area in pixels.
const ELA_MIN_REGION_AREA: usize = 500;
/// Edited-area ratios for the two severities.
const ELA_SUSPICIOUS_RATIO: f64 = 0.03;
const ELA_HIGHLY_SUSPICIOUS_RATIO: f64 = 0.05;

/// Outcome of ELA on one image.
#[derive(Debug, Clone)]
pub struct ElaOutcome {
    /// Ratio of suspicious area to image area
    pub edited_ratio: f64,
    /// Bounding boxes `[x, y, w, h]` of suspicious regions
    pub regions: Vec<[u32; 4]>,
}

/// Decode an embedded image object into RGB. JPEG payloads decode through
/// the image crate; Flate images reconstruct from their pixel geometry.
fn decode_embedded(file: &PdfFile, descriptor: &ImageDescriptor) -> Option<RgbImage> {
    let (dict, payload) = file.image_payload(descriptor.xref).ok()?;
    match descriptor.filter.as_deref() {
        Some("DCTDecode") | Some("DCT") | Some("JPXDecode") => {
            image::load_from_memory(&payload).ok().map(|d| d.to_rgb8())
        }
        _ => {
            let w = descriptor.width;
            let h = descriptor.height;
            let bpc = dict
                .get("BitsPerComponent")
                .and_then(Object::as_int)
                .unwrap_or(8);
            if bpc != 8 || w == 0 || h == 0 {
                return None;
            }
            let n = (w * h) as usize;
            match descriptor.colorspace.as_deref() {
                Some("DeviceRGB") if payload.len() >= n * 3 => {
                    RgbImage::from_raw(w, h, payload[..n * 3].to_vec())
                }
                Some("DeviceGray") if payload.len() >= n => {
                    let mut rgb = Vec::with_capacity(n * 3);
                    for &v in &payload[..n] {
                        rgb.extend_from_slice(&[v, v, v]);
                    }
                    RgbImage::from_raw(w, h, rgb)
                }
                _ => None,
            }
        }
    }
}

/// Run error-level analysis on one RGB image.
pub fn error_level_analysis(original: &RgbImage) -> Option<ElaOutcome> {
    let (w, h) = original.dimensions();
    let mut reencoded_bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut reencoded_bytes, ELA_JPEG_QUALITY);
    encoder.encode_image(original).ok()?;
    let reencoded = image::load_from_memory(&reencoded_bytes).ok()?.to_rgb8();
    if reencoded.dimensions() != (w, h) {
        return None;
    }

    // amplified grayscale difference
    let mut diff = GrayImage::new(w, h);
    let mut sum = 0.0f64;
    for y in 0..h {
        for x in 0..w {
            let a = original.get_pixel(x, y).0;
            let b = reencoded.get_pixel(x, y).0;
            let mut acc = 0u32;
            for c in 0..3 {
                let d = (a[c] as i16 - b[c] as i16).unsigned_abs() as u32;
                acc += (d * ELA_SCALE as u32).min(255);
            }
            let v = (acc / 3).min(255) as u8;
            diff.put_pixel(x, y, image::Luma([v]));
            sum += v as f64;
        }
    }
    let n = (w as f64) * (h as f64);
    let mean = sum / n;
    let mut var = 0.0f64;
    for p in diff.pixels() {
        let d = p.0[0] as f64 - mean;
        var += d * d;
    }
    let sigma = (var / n).sqrt();
    // a floor of 1 keeps a perfectly clean diff from matching everywhere
    let threshold = (mean + ELA_THRESHOLD_SIGMAS * sigma).clamp(1.0, 255.0) as u8;

    let regions = connected_regions(&diff, threshold);
    let area: usize = regions.iter().map(|r| (r[2] * r[3]) as usize).sum();
    Some(ElaOutcome {
        edited_ratio: area as f64 / n,
        regions,
    })
}

/// Connected components above `threshold` with area ≥ the minimum, as
/// bounding boxes.
fn connected_regions(diff: &GrayImage, threshold: u8) -> Vec<[u32; 4]> {
    let (w, h) = diff.dimensions();
    let mut visited = vec![false; (w * h) as usize];
    let idx = |x: u32, y: u32| (y * w + x) as usize;
    let mut regions = Vec::new();
    let mut stack = Vec::new();
    for sy in 0..h {
        for sx in 0..w {
            if visited[idx(sx, sy)] || diff.get_pixel(sx, sy).0[0] < threshold {
                continue;
            }
            // flood fill
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (sx, sy, sx, sy);
            let mut area = 0usize;
            stack.push((sx, sy));
            visited[idx(sx, sy)] = true;
            while let Some((x, y)) = stack.pop() {
                area += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
                let neighbors = [
                    (x.wrapping_sub(1), y),
                    (x + 1, y),
                    (x, y.wrapping_sub(1)),
                    (x, y + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx < w && ny < h && !visited[idx(nx, ny)] {
                        if diff.get_pixel(nx, ny).0[0] >= threshold {
                            visited[idx(nx, ny)] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }
            if area >= ELA_MIN_REGION_AREA {
                regions.push([min_x, min_y, max_x - min_x + 1, max_y - min_y + 1]);
            }
        }
    }
    regions
}

fn flag_for(descriptor: &ImageDescriptor, outcome: &ElaOutcome) -> Option<Flag> {
    let (severity, code, label) = if outcome.edited_ratio > ELA_HIGHLY_SUSPICIOUS_RATIO {
        (
            Severity::High,
            FlagCode::ForensicsElaMajorEdit,
            "large edited regions",
        )
    } else if outcome.edited_ratio > ELA_SUSPICIOUS_RATIO {
        (
            Severity::Medium,
            FlagCode::ForensicsElaMinorEdit,
            "localized edited regions",
        )
    } else {
        return None;
    };
    Some(
        Flag::new(
            severity,
            code,
            format!(
                "Error-level analysis shows {} on the page-{} image ({:.1}% of area)",
                label,
                descriptor.page + 1,
                outcome.edited_ratio * 100.0
            ),
        )
        .with_details(FlagDetails::ElaReport {
            xref: descriptor.xref,
            page: descriptor.page,
            edited_ratio: outcome.edited_ratio,
            regions: outcome.regions.clone(),
        }),
    )
}

/// Run the forensics module.
pub fn analyze(ctx: &ModuleContext) -> ModuleResult {
    let file = match PdfFile::open(&ctx.bundle.file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("forensics: cannot reopen document: {}", e);
            return ModuleResult::from_flags(ModuleName::Forensics, Vec::new(), 0.3);
        }
    };
    let mut flags = Vec::new();
    let mut analyzed = 0usize;
    for descriptor in &ctx.bundle.images {
        if descriptor.width <= MIN_DIMENSION || descriptor.height <= MIN_DIMENSION {
            continue;
        }
        if descriptor.width as u64 * descriptor.height as u64 > MAX_PIXELS {
            debug!(
                "forensics: image {} ({}x{}) over the pixel limit, skipped",
                descriptor.xref, descriptor.width, descriptor.height
            );
            continue;
        }
        let rgb = match decode_embedded(&file, descriptor) {
            Some(img) => img,
            None => {
                debug!("forensics: image {} not decodable", descriptor.xref);
                continue;
            }
        };
        analyzed += 1;
        if let Some(outcome) = error_level_analysis(&rgb) {
            if let Some(flag) = flag_for(descriptor, &outcome) {
                flags.push(flag);
            }
        }
        // the decoded bitmap drops here, before the next image loads
    }
    let confidence = if analyzed > 0 { 0.8 } else { 0.3 };
    ModuleResult::from_flags(ModuleName::Forensics, flags, confidence)
}
