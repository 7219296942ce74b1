//! Error taxonomy for the classification engine.
//!
//! Only [`ClassifyError::Decode`] is fatal for a classification request; the
//! pipeline downgrades every other variant into a still-valid result.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// No decoder could read the raster.
    #[error("could not decode raster: {}", attempts.join("; "))]
    Decode { attempts: Vec<String> },

    /// Structural segmentation could not run on the mask.
    #[error("structural segmentation failed: {0}")]
    Segmentation(String),

    /// No OCR engine is configured or the configured one cannot be started.
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),

    /// The OCR engine exceeded its wall-clock budget.
    #[error("OCR exceeded its {}s budget", .0.as_secs_f32())]
    OcrTimeout(Duration),

    /// The OCR engine ran but failed.
    #[error("OCR engine failed: {0}")]
    Ocr(String),

    /// Reading or writing the OCR cache failed.
    #[error("OCR cache I/O failed for {key}")]
    CacheIo {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A calibration profile is unknown or malformed.
    #[error("calibration profile: {0}")]
    Profile(String),
}

impl ClassifyError {
    pub fn cache_io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::CacheIo {
            key: key.into(),
            source,
        }
    }

    /// Whether this error must abort the whole classification.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClassifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_decode_errors_are_fatal() {
        let decode = ClassifyError::Decode {
            attempts: vec!["content sniffing: bad magic".to_string()],
        };
        assert!(decode.is_fatal());
        assert!(!ClassifyError::OcrTimeout(Duration::from_secs(30)).is_fatal());
        assert!(!ClassifyError::Segmentation("empty mask".to_string()).is_fatal());
    }

    #[test]
    fn decode_message_lists_attempts() {
        let err = ClassifyError::Decode {
            attempts: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "could not decode raster: a; b");
    }
}
