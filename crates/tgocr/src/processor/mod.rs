pub mod image;
pub mod ocr;
pub mod text;

use crate::error::ProcessError;

pub use ocr::{tesseract_language, OcrProcessor};

/// Turns raw image bytes into text. An image without text yields `Ok("")`.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, image_data: &[u8]) -> Result<String, ProcessError>;
}
