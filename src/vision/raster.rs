use std::fs;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, ImageReader};
use tracing::debug;

use crate::core::error::{ClassifyError, Result};
use crate::ocr::cache::content_hash;

/// Formats tried explicitly once sniffing and the extension hint failed.
const FALLBACK_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Tiff,
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
];

/// Decoded 8-bit grayscale page plus the digest of the bytes it came from.
#[derive(Debug, Clone)]
pub struct RasterDocument {
    pixels: GrayImage,
    content_hash: String,
}

impl RasterDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|err| ClassifyError::Decode {
            attempts: vec![format!("read {}: {err}", path.display())],
        })?;
        Self::decode(&bytes, Some(path))
    }

    /// Decodes `bytes`, using `hint` (usually the original file name) as a
    /// second opinion on the format.
    pub fn decode(bytes: &[u8], hint: Option<&Path>) -> Result<Self> {
        let image = decode_with_fallback(bytes, hint)?;
        Ok(Self {
            pixels: image.to_luma8(),
            content_hash: content_hash(bytes),
        })
    }

    /// Wraps an already decoded page; the digest covers its dimensions and pixels.
    pub fn from_gray(pixels: GrayImage) -> Self {
        let mut bytes = Vec::with_capacity(8 + pixels.as_raw().len());
        bytes.extend_from_slice(&pixels.width().to_le_bytes());
        bytes.extend_from_slice(&pixels.height().to_le_bytes());
        bytes.extend_from_slice(pixels.as_raw());
        Self {
            content_hash: content_hash(&bytes),
            pixels,
        }
    }

    pub fn pixels(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }
}

fn decode_with_fallback(bytes: &[u8], hint: Option<&Path>) -> Result<DynamicImage> {
    let mut attempts = Vec::new();

    match image::load_from_memory(bytes) {
        Ok(image) => return Ok(image),
        Err(err) => attempts.push(format!("content sniffing: {err}")),
    }

    let hinted = hint.and_then(|path| ImageFormat::from_path(path).ok());
    if let Some(format) = hinted {
        match image::load_from_memory_with_format(bytes, format) {
            Ok(image) => {
                debug!(?format, "decoded via extension hint");
                return Ok(image);
            }
            Err(err) => attempts.push(format!("{format:?} from extension: {err}")),
        }
    }

    for format in FALLBACK_FORMATS {
        if Some(format) == hinted {
            continue;
        }
        let reader = ImageReader::with_format(std::io::Cursor::new(bytes), format);
        match reader.decode() {
            Ok(image) => {
                debug!(?format, "decoded via explicit format");
                return Ok(image);
            }
            Err(err) => attempts.push(format!("{format:?}: {err}")),
        }
    }

    Err(ClassifyError::Decode { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::io::Cursor;

    fn encode(image: &GrayImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(image.clone())
            .write_to(&mut buf, format)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_png_and_tiff() {
        let page = GrayImage::from_pixel(12, 8, Luma([200]));
        for format in [ImageFormat::Png, ImageFormat::Tiff] {
            let raster = RasterDocument::decode(&encode(&page, format), None).unwrap();
            assert_eq!((raster.width(), raster.height()), (12, 8));
            assert_eq!(raster.pixels().get_pixel(3, 3)[0], 200);
        }
    }

    #[test]
    fn garbage_fails_after_every_strategy() {
        let err = RasterDocument::decode(b"CORRUPTED IMAGE DATA", Some(Path::new("scan.tif")))
            .unwrap_err();
        match err {
            ClassifyError::Decode { attempts } => {
                assert!(attempts.len() >= 2);
                assert!(attempts[0].starts_with("content sniffing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_decode_error() {
        let err = RasterDocument::open(Path::new("/nonexistent/page.tif")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn hash_follows_bytes_not_name() {
        let bytes = encode(&GrayImage::from_pixel(4, 4, Luma([10])), ImageFormat::Png);
        let a = RasterDocument::decode(&bytes, Some(Path::new("a.png"))).unwrap();
        let b = RasterDocument::decode(&bytes, Some(Path::new("b.png"))).unwrap();
        assert_eq!(a.content_hash(), b.content_hash());
    }
}
