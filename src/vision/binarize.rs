use std::path::Path;

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use tracing::debug;

use crate::core::error::Result;
use crate::vision::raster::RasterDocument;

/// Boolean foreground grid, row-major. `true` is ink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl BinaryMask {
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize,
            "mask data does not match {width}x{height}"
        );
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize]
    }

    fn row(&self, y: u32) -> &[bool] {
        let start = y as usize * self.width as usize;
        &self.data[start..start + self.width as usize]
    }

    pub fn foreground_count(&self) -> u64 {
        self.data.iter().filter(|&&v| v).count() as u64
    }

    /// Foreground pixels per row.
    pub fn row_counts(&self) -> Vec<u32> {
        (0..self.height)
            .map(|y| self.row(y).iter().filter(|&&v| v).count() as u32)
            .collect()
    }

    /// Foreground pixels per column.
    pub fn column_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.width as usize];
        for y in 0..self.height {
            for (count, &value) in counts.iter_mut().zip(self.row(y)) {
                if value {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// First column holding foreground anywhere in rows `[y_start, y_end)`.
    pub fn first_foreground_column(&self, y_start: u32, y_end: u32) -> Option<u32> {
        let y_end = y_end.min(self.height);
        (0..self.width).find(|&x| (y_start..y_end).any(|y| self.get(x, y)))
    }

    /// 255 for foreground, 0 for background.
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }
}

/// Global Otsu binarization with dark pixels as foreground.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryMaskExtractor;

impl BinaryMaskExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn load(&self, bytes: &[u8], hint: Option<&Path>) -> Result<(RasterDocument, BinaryMask)> {
        let raster = RasterDocument::decode(bytes, hint)?;
        let mask = self.extract(&raster);
        Ok((raster, mask))
    }

    pub fn extract(&self, raster: &RasterDocument) -> BinaryMask {
        let gray = raster.pixels();
        if gray.width() == 0 || gray.height() == 0 {
            return BinaryMask::new(gray.width(), gray.height(), Vec::new());
        }
        let level = otsu_level(gray);
        debug!(level, "otsu threshold");
        let data = gray.pixels().map(|p| p[0] <= level).collect();
        BinaryMask::new(gray.width(), gray.height(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page_with_block() -> GrayImage {
        GrayImage::from_fn(40, 30, |x, y| {
            if (10..20).contains(&x) && (5..15).contains(&y) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn dark_ink_becomes_foreground() {
        let raster = RasterDocument::from_gray(page_with_block());
        let mask = BinaryMaskExtractor::new().extract(&raster);
        assert_eq!(mask.foreground_count(), 100);
        assert!(mask.get(12, 7));
        assert!(!mask.get(0, 0));
    }

    #[test]
    fn blank_page_has_no_foreground() {
        let raster = RasterDocument::from_gray(GrayImage::from_pixel(20, 20, Luma([255])));
        let mask = BinaryMaskExtractor::new().extract(&raster);
        assert_eq!(mask.foreground_count(), 0);
    }

    #[test]
    fn projections_and_margins() {
        let mask = BinaryMask::from_fn(6, 4, |x, y| y == 1 && (2..5).contains(&x));
        assert_eq!(mask.row_counts(), vec![0, 3, 0, 0]);
        assert_eq!(mask.column_counts(), vec![0, 0, 1, 1, 1, 0]);
        assert_eq!(mask.first_foreground_column(0, 4), Some(2));
        assert_eq!(mask.first_foreground_column(2, 4), None);
        assert_eq!(mask.to_luma().get_pixel(3, 1)[0], 255);
    }
}
