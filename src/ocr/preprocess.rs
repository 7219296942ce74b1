//! Prepares the bitmap handed to the OCR engine: downscale, local threshold,
//! small-gap closing.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

pub const DEFAULT_MAX_WIDTH: u32 = 1600;
pub const ADAPTIVE_BLOCK_SIZE: u32 = 11;
pub const ADAPTIVE_OFFSET: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct OcrPreprocessor {
    max_width: u32,
    block_size: u32,
    offset: f64,
}

impl OcrPreprocessor {
    pub fn new() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            block_size: ADAPTIVE_BLOCK_SIZE,
            offset: ADAPTIVE_OFFSET,
        }
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width.max(1);
        self
    }

    /// Dark text on a white background, at most `max_width` wide.
    pub fn prepare(&self, page: &GrayImage) -> GrayImage {
        let scaled = downscale(page, self.max_width);
        let ink = adaptive_threshold_inv(&scaled, self.block_size, self.offset);
        let mut closed = morphology::close(&ink, Norm::LInf, 1);
        imageops::invert(&mut closed);
        closed
    }
}

impl Default for OcrPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the aspect ratio; never upscales.
pub fn downscale(page: &GrayImage, max_width: u32) -> GrayImage {
    let (width, height) = page.dimensions();
    if width <= max_width {
        return page.clone();
    }
    let ratio = max_width as f64 / width as f64;
    let new_height = ((height as f64 * ratio) as u32).max(1);
    imageops::resize(page, max_width, new_height, FilterType::Triangle)
}

/// Local mean threshold over a `block_size` window using an integral image.
/// Pixels darker than `mean - offset` become 255 (ink), the rest 0.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_size: u32, offset: f64) -> GrayImage {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let iw = w + 1;
    let mut integral = vec![0u64; iw * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += gray.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * iw + x + 1] = row_sum + integral[y * iw + x + 1];
        }
    }

    let half = (block_size / 2) as usize;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let (x, y) = (x as usize, y as usize);
        let x0 = x.saturating_sub(half);
        let y0 = y.saturating_sub(half);
        let x1 = (x + half).min(w - 1) + 1;
        let y1 = (y + half).min(h - 1) + 1;
        let area = ((x1 - x0) * (y1 - y0)) as f64;
        let sum = (integral[y1 * iw + x1] + integral[y0 * iw + x0]) as f64
            - (integral[y0 * iw + x1] + integral[y1 * iw + x0]) as f64;
        let threshold = sum / area - offset;
        let value = gray.get_pixel(x as u32, y as u32)[0] as f64;
        Luma([if value <= threshold { 255 } else { 0 }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downscales_wide_pages_only() {
        let wide = GrayImage::from_pixel(3200, 400, Luma([255]));
        assert_eq!(downscale(&wide, 1600).dimensions(), (1600, 200));
        let narrow = GrayImage::from_pixel(800, 400, Luma([255]));
        assert_eq!(downscale(&narrow, 1600).dimensions(), (800, 400));
    }

    #[test]
    fn adaptive_threshold_marks_dark_strokes() {
        let page = GrayImage::from_fn(30, 30, |x, _| Luma([if x == 15 { 20 } else { 230 }]));
        let ink = adaptive_threshold_inv(&page, 11, 2.0);
        assert_eq!(ink.get_pixel(15, 15)[0], 255);
        assert_eq!(ink.get_pixel(5, 15)[0], 0);
    }

    #[test]
    fn prepared_bitmap_has_dark_text_on_white() {
        let page = GrayImage::from_fn(40, 40, |x, y| {
            Luma([if (18..21).contains(&x) && (5..35).contains(&y) { 10 } else { 240 }])
        });
        let bitmap = OcrPreprocessor::new().prepare(&page);
        assert_eq!(bitmap.dimensions(), (40, 40));
        assert_eq!(bitmap.get_pixel(19, 20)[0], 0);
        assert_eq!(bitmap.get_pixel(2, 2)[0], 255);
    }
}
