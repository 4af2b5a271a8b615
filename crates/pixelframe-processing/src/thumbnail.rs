//! Square thumbnail rendering.
//!
//! The largest centered square is cut out of the frame, scaled to a fixed
//! 160×160 canvas and encoded as a JPEG data URL.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Edge length of the thumbnail canvas in pixels.
pub const THUMBNAIL_SIZE: u32 = 160;
/// JPEG quality (0-100) of the encoded thumbnail.
pub const THUMBNAIL_QUALITY: u8 = 75;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Source rectangle of the centered square crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// Compute the centered square crop for a `width`×`height` frame.
pub fn square_crop(width: u32, height: u32) -> CropRect {
    if width >= height {
        CropRect {
            x: (width - height) / 2,
            y: 0,
            size: height,
        }
    } else {
        CropRect {
            x: 0,
            y: (height - width) / 2,
            size: width,
        }
    }
}

/// Render `image` into a JPEG data URL thumbnail.
pub fn render_thumbnail(image: &DynamicImage) -> Result<String> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("Cannot thumbnail an empty frame"));
    }

    let crop = square_crop(width, height);
    let thumbnail = image
        .crop_imm(crop.x, crop.y, crop.size, crop.size)
        .resize_exact(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle)
        .to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, THUMBNAIL_QUALITY)
        .encode_image(&thumbnail)
        .context("Failed to encode thumbnail JPEG")?;

    Ok(format!("{}{}", DATA_URL_PREFIX, BASE64.encode(&buf)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn decode_data_url(data_url: &str) -> Vec<u8> {
        let payload = data_url.strip_prefix(DATA_URL_PREFIX).unwrap();
        BASE64.decode(payload).unwrap()
    }

    #[test]
    fn landscape_crops_horizontally() {
        assert_eq!(
            square_crop(1920, 1080),
            CropRect {
                x: 420,
                y: 0,
                size: 1080
            }
        );
        // odd difference is floored
        assert_eq!(square_crop(201, 100).x, 50);
    }

    #[test]
    fn portrait_crops_vertically() {
        assert_eq!(
            square_crop(100, 301),
            CropRect {
                x: 0,
                y: 100,
                size: 100
            }
        );
    }

    #[test]
    fn square_is_untouched() {
        assert_eq!(
            square_crop(500, 500),
            CropRect {
                x: 0,
                y: 0,
                size: 500
            }
        );
    }

    #[test]
    fn renders_fixed_size_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 360, Rgb([200, 10, 10])));
        let url = render_thumbnail(&img).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let bytes = decode_data_url(&url);
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
    }

    #[test]
    fn crop_keeps_center_content() {
        // Left and right thirds are black, center is white.
        let mut img = RgbImage::from_pixel(300, 100, Rgb([0, 0, 0]));
        for x in 100..200 {
            for y in 0..100 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let url = render_thumbnail(&DynamicImage::ImageRgb8(img)).unwrap();
        let bytes = decode_data_url(&url);
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        let corner = decoded.get_pixel(2, 2);
        assert!(corner[0] > 200, "expected white corner, got {:?}", corner);
    }

    #[test]
    fn rejects_empty_frame() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(render_thumbnail(&img).is_err());
    }
}
