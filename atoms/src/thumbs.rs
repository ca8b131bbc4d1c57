//! Thumbnail generation and inference-bound resizing.
//!
//! Both paths decode once, fit inside a square bounding box without ever
//! upscaling, and re-encode as JPEG. The thumbnail box (500 px) is tuned for
//! gallery previews; the analysis long edge (1536 px) trades inference cost
//! against vision-model quality.

use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;

use crate::error::{GalleryError, GalleryResult};

const JPEG_QUALITY: u8 = 80;

/// A generated preview plus the source image's aspect ratio
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub aspect_ratio: f64,
}

/// Re-encode `bytes` to a JPEG preview that fits inside
/// `bounding_box` x `bounding_box`, preserving aspect ratio and never
/// upscaling. Undecodable bytes are a validation error so one corrupt file
/// cannot abort a batch upload.
pub fn generate_thumbnail(bytes: &[u8], bounding_box: u32) -> GalleryResult<Thumbnail> {
    let img = decode(bytes)?;
    let (width, height) = img.dimensions();
    let aspect_ratio = width as f64 / height as f64;

    let resized = fit_within(img, bounding_box);
    let bytes = encode_jpeg(&resized)?;

    Ok(Thumbnail { bytes, aspect_ratio })
}

/// Resize for the vision model: fit the long edge within `max_long_edge`
/// without enlargement and re-encode as JPEG.
pub fn resize_for_analysis(bytes: &[u8], max_long_edge: u32) -> GalleryResult<Vec<u8>> {
    let img = decode(bytes)?;
    let resized = fit_within(img, max_long_edge);
    encode_jpeg(&resized)
}

fn decode(bytes: &[u8]) -> GalleryResult<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| GalleryError::Validation(format!("Unsupported or corrupt image: {}", e)))
}

fn fit_within(img: DynamicImage, bound: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= bound && height <= bound {
        img
    } else {
        img.thumbnail(bound, bound)
    }
}

fn encode_jpeg(img: &DynamicImage) -> GalleryResult<Vec<u8>> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(|e| GalleryError::Storage(format!("JPEG encode error: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 80, 40]),
        ));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)
            .unwrap();
        out
    }

    fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
        image::load_from_memory(bytes).unwrap().dimensions()
    }

    #[test]
    fn thumbnail_fits_bounding_box_and_keeps_aspect() {
        let source = png_bytes(2000, 1000);
        let thumb = generate_thumbnail(&source, 500).unwrap();

        let (w, h) = decoded_dimensions(&thumb.bytes);
        assert!(w <= 500 && h <= 500);
        assert_eq!((w, h), (500, 250));
        assert!((thumb.aspect_ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn small_images_are_never_upscaled() {
        let source = png_bytes(120, 80);
        let thumb = generate_thumbnail(&source, 500).unwrap();

        assert_eq!(decoded_dimensions(&thumb.bytes), (120, 80));
    }

    #[test]
    fn portrait_aspect_ratio_is_below_one() {
        let source = png_bytes(600, 900);
        let thumb = generate_thumbnail(&source, 500).unwrap();

        assert!((thumb.aspect_ratio - (600.0 / 900.0)).abs() < 1e-9);
        let (w, h) = decoded_dimensions(&thumb.bytes);
        assert!(w <= 500 && h <= 500);
    }

    #[test]
    fn corrupt_bytes_are_a_validation_error() {
        let err = generate_thumbnail(b"definitely not an image", 500).unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)));
    }

    #[test]
    fn analysis_resize_bounds_the_long_edge() {
        let source = png_bytes(4000, 2000);
        let resized = resize_for_analysis(&source, 1536).unwrap();

        let (w, h) = decoded_dimensions(&resized);
        assert_eq!((w, h), (1536, 768));
    }

    #[test]
    fn analysis_resize_leaves_small_images_alone() {
        let source = png_bytes(800, 600);
        let resized = resize_for_analysis(&source, 1536).unwrap();

        assert_eq!(decoded_dimensions(&resized), (800, 600));
    }
}
