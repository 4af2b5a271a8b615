//! Media probing: intrinsic dimensions, duration and thumbnail of a raw file.

mod image_probe;
mod video_probe;

use async_trait::async_trait;
use pixelframe_core::{MediaKind, ProbeConfig, ProbeError, ProbedFile, RawFile};

pub use image_probe::ImageProbe;
pub use video_probe::{VideoInfo, VideoProbe};

/// Extracts a [`ProbedFile`] from a raw blob of a declared kind.
///
/// Probe failures are per-file and never retried.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, file: &RawFile, kind: MediaKind) -> Result<ProbedFile, ProbeError>;
}

/// Probe backed by the `image` crate for stills and ffprobe/ffmpeg for video.
pub struct NativeProbe {
    image: ImageProbe,
    video: VideoProbe,
}

impl NativeProbe {
    pub fn new(config: &ProbeConfig) -> anyhow::Result<Self> {
        Ok(Self {
            image: ImageProbe,
            video: VideoProbe::new(
                config.ffprobe_path.clone(),
                config.ffmpeg_path.clone(),
                config.frame_timeout(),
            )?,
        })
    }
}

#[async_trait]
impl MediaProbe for NativeProbe {
    async fn probe(&self, file: &RawFile, kind: MediaKind) -> Result<ProbedFile, ProbeError> {
        match kind {
            MediaKind::Image => self.image.probe(file).await,
            MediaKind::Video => self.video.probe(file).await,
        }
    }
}
