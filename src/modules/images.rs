//! Embedded-image analysis.
//!
//! Two halves: descriptor heuristics (screenshot-sized images, DPI
//! mismatches, heavy recompression, image-only documents) and paste
//! detection, which compares the sensor-noise variance inside amount
//! regions against their neighborhood. A pasted amount patch carries the
//! noise history of another image — usually none at all.

use crate::bundle::ImageDescriptor;
use crate::model::{Flag, FlagCode, FlagDetails, ModuleName, ModuleResult, Severity};
use crate::modules::ModuleContext;
use crate::pdf::text::PlacedSpan;
use image::GrayImage;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

/// Common screen resolutions (desktop and phone), matched in either
/// orientation with a ±50 px tolerance.
pub const SCREEN_RESOLUTIONS: &[(u32, u32)] = &[
    (1920, 1080),
    (1366, 768),
    (1536, 864),
    (1440, 900),
    (1280, 720),
    (1280, 800),
    (1600, 900),
    (2560, 1440),
    (3840, 2160),
    (1024, 768),
    (750, 1334),
    (828, 1792),
    (1080, 1920),
    (1125, 2436),
    (1170, 2532),
];

const SCREEN_TOLERANCE: i64 = 50;
const DPI_RATIO_LIMIT: f64 = 2.5;
const COMPRESSION_RATIO_LIMIT: f64 = 50.0;
const IMAGES_PER_PAGE_LIMIT: f64 = 15.0;
const FULL_PAGE_MIN_W: u32 = 500;
const FULL_PAGE_MIN_H: u32 = 700;

lazy_static! {
    static ref AMOUNT_SPAN: Regex =
        Regex::new(r"(?:\d[\d \u{00A0}]*[.,]\d{2})\s*(?:[€$£]|EUR)?|[€$£]\s*\d").unwrap();
}

/// Screenshot-sized image dimensions.
pub fn check_screenshot_dimensions(images: &[ImageDescriptor]) -> Option<Flag> {
    let offender = images.iter().find(|img| {
        SCREEN_RESOLUTIONS.iter().any(|&(rw, rh)| {
            let close = |a: u32, b: u32| (a as i64 - b as i64).abs() <= SCREEN_TOLERANCE;
            (close(img.width, rw) && close(img.height, rh))
                || (close(img.width, rh) && close(img.height, rw))
        })
    })?;
    Some(
        Flag::new(
            Severity::High,
            FlagCode::ImagesScreenshotDetected,
            format!(
                "An embedded image is screen-sized ({}x{})",
                offender.width, offender.height
            ),
        )
        .with_details(FlagDetails::ImageReport {
            xref: offender.xref,
            page: offender.page,
            width: offender.width,
            height: offender.height,
        }),
    )
}

/// DPI spread across images.
pub fn check_resolution_consistency(images: &[ImageDescriptor]) -> Option<Flag> {
    let dpis: Vec<f64> = images
        .iter()
        .flat_map(|i| [i.dpi_x as f64, i.dpi_y as f64])
        .filter(|d| *d > 10.0)
        .collect();
    let min = dpis.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = dpis.iter().cloned().fold(0.0f64, f64::max);
    if !min.is_finite() || max <= min * DPI_RATIO_LIMIT {
        return None;
    }
    Some(
        Flag::new(
            Severity::Medium,
            FlagCode::ImagesResolutionMismatch,
            format!("Image resolutions span {:.0}–{:.0} DPI", min, max),
        )
        .with_details(FlagDetails::DpiReport {
            min_dpi: min,
            max_dpi: max,
        }),
    )
}

/// JPEGs compressed well past what a first save produces.
pub fn check_heavy_compression(images: &[ImageDescriptor]) -> Option<Flag> {
    let offender = images.iter().find(|img| {
        matches!(img.filter.as_deref(), Some("DCTDecode") | Some("DCT"))
            && img.byte_size > 0
            && (img.width as f64 * img.height as f64 * 3.0) / img.byte_size as f64
                > COMPRESSION_RATIO_LIMIT
    })?;
    Some(
        Flag::new(
            Severity::Medium,
            FlagCode::ImagesHeavyCompression,
            "An embedded JPEG shows very heavy compression (multiple re-saves)",
        )
        .with_details(FlagDetails::ImageReport {
            xref: offender.xref,
            page: offender.page,
            width: offender.width,
            height: offender.height,
        }),
    )
}

/// Unusual image counts.
pub fn check_image_count(images: &[ImageDescriptor], page_count: usize) -> Option<Flag> {
    if page_count == 0 {
        return None;
    }
    let per_page = images.len() as f64 / page_count as f64;
    if per_page <= IMAGES_PER_PAGE_LIMIT {
        return None;
    }
    Some(
        Flag::new(
            Severity::Medium,
            FlagCode::ImagesExcessiveCount,
            format!("{:.0} images per page on average", per_page),
        )
        .with_details(FlagDetails::CountReport {
            count: images.len(),
            threshold: IMAGES_PER_PAGE_LIMIT as usize * page_count,
        }),
    )
}

/// Text-heavy documents with no image at all (no logo, no signature scan).
pub fn check_no_images(images: &[ImageDescriptor], text_len: usize) -> Option<Flag> {
    if !images.is_empty() || text_len <= 500 {
        return None;
    }
    Some(Flag::new(
        Severity::Low,
        FlagCode::ImagesNoImages,
        "No embedded image despite substantial text (no logo or branding)",
    ))
}

/// Pages that are just one big image: scans or screenshots re-wrapped as
/// PDF, with no real text layer.
pub fn check_image_only_pdf(
    images: &[ImageDescriptor],
    text_by_page: &[String],
) -> Option<Flag> {
    let page_count = text_by_page.len();
    if page_count == 0 {
        return None;
    }
    let full_page_pages = (0..page_count)
        .filter(|page| {
            images.iter().any(|img| {
                img.page == *page && img.width > FULL_PAGE_MIN_W && img.height > FULL_PAGE_MIN_H
            })
        })
        .count();
    let coverage = full_page_pages as f64 / page_count as f64;
    if coverage < 0.8 {
        return None;
    }
    let chars_per_page =
        text_by_page.iter().map(|t| t.chars().count()).sum::<usize>() as f64 / page_count as f64;
    if chars_per_page < 50.0 {
        Some(Flag::new(
            Severity::High,
            FlagCode::ImagesImageOnlyPdf,
            "The document is image-only: full-page images and no text layer",
        ))
    } else if chars_per_page < 200.0 {
        Some(Flag::new(
            Severity::Medium,
            FlagCode::ImagesMostlyImagePdf,
            "The document is mostly images with a thin text layer",
        ))
    } else {
        None
    }
}

/// An amount-bearing region in page space.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountRegion {
    /// Zero-based page
    pub page: usize,
    /// Origin x in points
    pub x: f32,
    /// Baseline y in points
    pub y: f32,
    /// Width in points
    pub width: f32,
    /// Height in points
    pub height: f32,
}

/// Text-block bounding boxes whose text carries an amount.
pub fn find_amount_regions(spans_by_page: &[Vec<PlacedSpan>]) -> Vec<AmountRegion> {
    let mut out = Vec::new();
    for (page, spans) in spans_by_page.iter().enumerate() {
        for span in spans {
            if AMOUNT_SPAN.is_match(&span.text) {
                out.push(AmountRegion {
                    page,
                    x: span.x,
                    y: span.y,
                    width: span.width.max(span.font_size),
                    height: span.font_size.max(6.0),
                });
            }
        }
    }
    out
}

/// 5×5 Gaussian blur (σ≈1), borders clamped.
fn gaussian_blur_5x5(src: &GrayImage) -> GrayImage {
    const KERNEL: [[f32; 5]; 5] = [
        [1.0, 4.0, 6.0, 4.0, 1.0],
        [4.0, 16.0, 24.0, 16.0, 4.0],
        [6.0, 24.0, 36.0, 24.0, 6.0],
        [4.0, 16.0, 24.0, 16.0, 4.0],
        [1.0, 4.0, 6.0, 4.0, 1.0],
    ];
    const KERNEL_SUM: f32 = 256.0;
    let (w, h) = src.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, k) in row.iter().enumerate() {
                    let sx = (x as i64 + kx as i64 - 2).clamp(0, w as i64 - 1) as u32;
                    let sy = (y as i64 + ky as i64 - 2).clamp(0, h as i64 - 1) as u32;
                    acc += *k * src.get_pixel(sx, sy).0[0] as f32;
                }
            }
            out.put_pixel(x, y, image::Luma([(acc / KERNEL_SUM).round() as u8]));
        }
    }
    out
}

/// Noise layer: |original − blurred|.
fn noise_layer(src: &GrayImage) -> GrayImage {
    let blurred = gaussian_blur_5x5(src);
    let (w, h) = src.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let a = src.get_pixel(x, y).0[0] as i16;
            let b = blurred.get_pixel(x, y).0[0] as i16;
            out.put_pixel(x, y, image::Luma([(a - b).unsigned_abs() as u8]));
        }
    }
    out
}

fn region_variance(img: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) -> f64 {
    let (w, h) = img.dimensions();
    let x1 = x1.min(w);
    let y1 = y1.min(h);
    if x0 >= x1 || y0 >= y1 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let n = ((x1 - x0) as f64) * ((y1 - y0) as f64);
    for y in y0..y1 {
        for x in x0..x1 {
            let v = img.get_pixel(x, y).0[0] as f64;
            sum += v;
            sum_sq += v * v;
        }
    }
    let mean = sum / n;
    (sum_sq / n) - mean * mean
}

/// One paste-suspicious amount region, in bitmap pixels.
#[derive(Debug, Clone)]
struct PasteHit {
    page: usize,
    region_var: f64,
    neighborhood_var: f64,
}

/// Compare amount-region noise with neighborhood noise on each rendered
/// page. Purely digital pages (noise variance < 1.0) carry no signal and
/// are skipped.
pub fn check_paste_artifacts(ctx: &ModuleContext) -> Option<Flag> {
    let rasterizer = ctx.services.rasterizer.as_ref()?;
    let regions = find_amount_regions(&ctx.bundle.spans_by_page);
    if regions.is_empty() {
        return None;
    }
    let mut hits: Vec<PasteHit> = Vec::new();
    for page in 0..ctx.bundle.page_count {
        let page_regions: Vec<&AmountRegion> =
            regions.iter().filter(|r| r.page == page).collect();
        if page_regions.is_empty() {
            continue;
        }
        let bitmap = match rasterizer.render(page, 2.0) {
            Some(b) => b,
            None => continue,
        };
        let (page_w_pt, page_h_pt) = ctx
            .bundle
            .page_sizes
            .get(page)
            .copied()
            .unwrap_or((612.0, 792.0));
        if page_w_pt <= 0.0 || page_h_pt <= 0.0 {
            continue;
        }
        let noise = noise_layer(&bitmap);
        let (bw, bh) = noise.dimensions();
        let page_var = region_variance(&noise, 0, 0, bw, bh);
        if page_var < 1.0 {
            debug!("page {} looks purely digital, paste check skipped", page);
            continue;
        }
        let sx = bw as f32 / page_w_pt;
        let sy = bh as f32 / page_h_pt;
        for region in page_regions {
            // page space is bottom-up, bitmaps are top-down
            let x0 = (region.x * sx).max(0.0) as u32;
            let x1 = ((region.x + region.width) * sx).max(0.0) as u32;
            let y_top_pt = region.y + region.height;
            let y0 = ((page_h_pt - y_top_pt) * sy).max(0.0) as u32;
            let y1 = ((page_h_pt - region.y) * sy).max(0.0) as u32;
            if x1 <= x0 || y1 <= y0 {
                continue;
            }
            let region_var = region_variance(&noise, x0, y0, x1, y1);
            let pad = (x1 - x0).max(y1 - y0);
            let nx0 = x0.saturating_sub(pad);
            let ny0 = y0.saturating_sub(pad);
            let nx1 = (x1 + pad).min(bw);
            let ny1 = (y1 + pad).min(bh);
            let neighborhood_var = region_variance(&noise, nx0, ny0, nx1, ny1);
            if neighborhood_var > 2.0 && region_var < neighborhood_var / 4.0 {
                hits.push(PasteHit {
                    page,
                    region_var,
                    neighborhood_var,
                });
            }
        }
    }
    let first = hits.first()?;
    Some(
        Flag::new(
            Severity::High,
            FlagCode::ImagesPasteNoiseAnomaly,
            format!(
                "{} amount regions show much less noise than their surroundings",
                hits.len()
            ),
        )
        .with_details(FlagDetails::Map({
            let mut m = indexmap::IndexMap::new();
            m.insert("regions".to_string(), serde_json::json!(hits.len()));
            m.insert("first_page".to_string(), serde_json::json!(first.page));
            m.insert(
                "region_variance".to_string(),
                serde_json::json!(first.region_var),
            );
            m.insert(
                "neighborhood_variance".to_string(),
                serde_json::json!(first.neighborhood_var),
            );
            m
        })),
    )
}

/// Run the images module.
pub fn analyze(ctx: &ModuleContext) -> ModuleResult {
    let images = &ctx.bundle.images;
    let mut flags = Vec::new();
    if let Some(flag) = check_screenshot_dimensions(images) {
        flags.push(flag);
    }
    if let Some(flag) = check_resolution_consistency(images) {
        flags.push(flag);
    }
    if let Some(flag) = check_heavy_compression(images) {
        flags.push(flag);
    }
    if let Some(flag) = check_image_count(images, ctx.bundle.page_count) {
        flags.push(flag);
    }
    if let Some(flag) = check_no_images(images, ctx.bundle.text_len()) {
        flags.push(flag);
    }
    if let Some(flag) = check_image_only_pdf(images, &ctx.bundle.text_by_page) {
        flags.push(flag);
    }
    if let Some(flag) = check_paste_artifacts(ctx) {
        flags.push(flag);
    }
    let confidence = if images.is_empty() { 0.6 } else { 0.9 };
    ModuleResult::from_flags(ModuleName::Images, flags, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(w: u32, h: u32) -> ImageDescriptor {
        ImageDescriptor {
            xref: 7,
            page: 0,
            width: w,
            height: h,
            colorspace: Some("DeviceRGB".into()),
            bpc: Some(8),
            filter: None,
            byte_size: 1000,
            dpi_x: 0.0,
            dpi_y: 0.0,
        }
    }

    #[test]
    fn screenshot_dimensions() {
        assert!(check_screenshot_dimensions(&[img(1920, 1080)]).is_some());
        // tolerance and rotation
        assert!(check_screenshot_dimensions(&[img(1040, 1890)]).is_some());
        assert!(check_screenshot_dimensions(&[img(600, 400)]).is_none());
    }

    #[test]
    fn dpi_spread() {
        let mut a = img(1000, 1000);
        a.dpi_x = 72.0;
        a.dpi_y = 72.0;
        let mut b = img(1000, 1000);
        b.dpi_x = 300.0;
        b.dpi_y = 300.0;
        assert!(check_resolution_consistency(&[a.clone(), b]).is_some());
        // low-dpi noise (< 10) is ignored
        let mut c = img(10, 10);
        c.dpi_x = 2.0;
        assert!(check_resolution_consistency(&[a, c]).is_none());
    }

    #[test]
    fn heavy_compression_only_for_jpeg() {
        let mut jpeg = img(1000, 1000);
        jpeg.filter = Some("DCTDecode".into());
        jpeg.byte_size = 20_000; // ratio 150
        assert!(check_heavy_compression(&[jpeg.clone()]).is_some());

        jpeg.byte_size = 500_000; // ratio 6
        assert!(check_heavy_compression(&[jpeg]).is_none());

        let mut flate = img(1000, 1000);
        flate.filter = Some("FlateDecode".into());
        flate.byte_size = 100;
        assert!(check_heavy_compression(&[flate]).is_none());
    }

    #[test]
    fn counts_and_absences() {
        let many: Vec<ImageDescriptor> = (0..16).map(|_| img(50, 50)).collect();
        assert!(check_image_count(&many, 1).is_some());
        assert!(check_image_count(&many, 2).is_none());

        assert!(check_no_images(&[], 600).is_some());
        assert!(check_no_images(&[], 100).is_none());
        assert!(check_no_images(&[img(10, 10)], 600).is_none());
    }

    #[test]
    fn image_only_detection() {
        let scan = vec![img(1200, 1700)];
        let empty_pages = vec![String::new()];
        let flag = check_image_only_pdf(&scan, &empty_pages).unwrap();
        assert_eq!(flag.code, FlagCode::ImagesImageOnlyPdf);
        assert_eq!(flag.severity, Severity::High);

        let thin_pages = vec!["a".repeat(100)];
        let flag = check_image_only_pdf(&scan, &thin_pages).unwrap();
        assert_eq!(flag.code, FlagCode::ImagesMostlyImagePdf);

        let texty = vec!["a".repeat(1000)];
        assert!(check_image_only_pdf(&scan, &texty).is_none());

        // small logo never counts as page coverage
        let logo = vec![img(200, 100)];
        assert!(check_image_only_pdf(&logo, &empty_pages).is_none());
    }

    #[test]
    fn amount_regions_from_spans() {
        let spans = vec![
            PlacedSpan {
                text: "Total: 1 234,56 €".into(),
                font: "F".into(),
                font_size: 12.0,
                x: 10.0,
                y: 100.0,
                width: 90.0,
            },
            PlacedSpan {
                text: "Conditions générales".into(),
                font: "F".into(),
                font_size: 9.0,
                x: 10.0,
                y: 80.0,
                width: 120.0,
            },
        ];
        let regions = find_amount_regions(&[spans]);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].page, 0);
    }

    #[test]
    fn variance_math() {
        let flat = GrayImage::from_pixel(8, 8, image::Luma([100]));
        assert!(region_variance(&flat, 0, 0, 8, 8) < 1e-9);

        let mut noisy = GrayImage::from_pixel(8, 8, image::Luma([100]));
        for y in 0..8 {
            for x in 0..8 {
                if (x + y) % 2 == 0 {
                    noisy.put_pixel(x, y, image::Luma([120]));
                }
            }
        }
        assert!(region_variance(&noisy, 0, 0, 8, 8) > 50.0);
    }
}
