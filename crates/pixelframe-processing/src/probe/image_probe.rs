//! Still image probe.

use image::{DynamicImage, GenericImageView, ImageReader};
use pixelframe_core::{MediaKind, ProbeError, ProbedFile, RawFile};
use std::io::Cursor;

use crate::thumbnail::render_thumbnail;

/// Decodes stills in memory; nothing outlives the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageProbe;

impl ImageProbe {
    pub async fn probe(&self, file: &RawFile) -> Result<ProbedFile, ProbeError> {
        let data = file.data.clone();
        let name = file.name.clone();

        // Image decode is CPU-bound; run off the async pool to avoid blocking other tasks.
        tokio::task::spawn_blocking(move || Self::probe_blocking(&name, &data))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Image probe task failed");
                ProbeError::Info
            })?
    }

    fn probe_blocking(name: &str, data: &[u8]) -> Result<ProbedFile, ProbeError> {
        let image = Self::decode(data).map_err(|e| {
            tracing::warn!(file = %name, error = %e, "Image decode failed");
            ProbeError::Info
        })?;
        let (width, height) = image.dimensions();

        let thumbnail = render_thumbnail(&image).map_err(|e| {
            tracing::warn!(file = %name, error = %e, "Image thumbnail failed");
            ProbeError::Thumbnail
        })?;

        tracing::debug!(file = %name, width, height, "Image probe completed");

        Ok(ProbedFile {
            kind: MediaKind::Image,
            width,
            height,
            duration: None,
            thumbnail,
        })
    }

    fn decode(data: &[u8]) -> Result<DynamicImage, image::ImageError> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        reader.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        Bytes::from(buf.into_inner())
    }

    #[tokio::test]
    async fn probes_dimensions_and_thumbnail() {
        let file = RawFile::new("a.png", "image/png", png_bytes(320, 200));
        let probed = ImageProbe.probe(&file).await.unwrap();

        assert_eq!(probed.kind, MediaKind::Image);
        assert_eq!((probed.width, probed.height), (320, 200));
        assert!(probed.duration.is_none());
        assert!(probed.thumbnail.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn corrupt_data_is_an_info_error() {
        let file = RawFile::new(
            "broken.png",
            "image/png",
            Bytes::from_static(b"definitely not a png"),
        );
        assert_eq!(ImageProbe.probe(&file).await, Err(ProbeError::Info));
    }
}
