use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::error::ProcessError;

/// Decodes an attachment and re-encodes it as an RGB PNG for Tesseract.
///
/// Telegram hands out JPEG for photos but documents can be anything `image`
/// understands (WebP, GIF, TIFF, ...). Leptonica's own decoders are less
/// forgiving, so everything goes through one normalized format.
pub fn normalize_for_ocr(image_data: &[u8]) -> Result<Vec<u8>, ProcessError> {
    if image_data.is_empty() {
        return Err(ProcessError::NotAnImage("empty attachment".to_string()));
    }

    let format = image::guess_format(image_data)
        .map_err(|e| ProcessError::NotAnImage(format!("unrecognized format: {}", e)))?;

    let img = image::load_from_memory_with_format(image_data, format)
        .map_err(|e| ProcessError::ImageProcessing(format!("Failed to load image: {}", e)))?;

    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut png_data = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut png_data), ImageFormat::Png)
        .map_err(|e| ProcessError::ImageProcessing(format!("Failed to convert image: {}", e)))?;

    Ok(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut data = Vec::new();
        img.write_to(&mut Cursor::new(&mut data), format).unwrap();
        data
    }

    #[test]
    fn test_normalizes_rgba_png() {
        let img = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 128]));
        let data = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);

        let png = normalize_for_ocr(&data).unwrap();
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 3);
        assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_normalizes_jpeg() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(8, 8));
        let data = encode(img, ImageFormat::Jpeg);
        assert!(normalize_for_ocr(&data).is_ok());
    }

    #[test]
    fn test_rejects_empty_data() {
        assert!(matches!(
            normalize_for_ocr(&[]),
            Err(ProcessError::NotAnImage(_))
        ));
    }

    #[test]
    fn test_rejects_non_image_data() {
        assert!(matches!(
            normalize_for_ocr(b"definitely not an image"),
            Err(ProcessError::NotAnImage(_))
        ));
    }

    #[test]
    fn test_rejects_truncated_png() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(16, 16));
        let data = encode(img, ImageFormat::Png);
        let truncated = &data[..data.len() / 2];
        assert!(matches!(
            normalize_for_ocr(truncated),
            Err(ProcessError::ImageProcessing(_))
        ));
    }
}
