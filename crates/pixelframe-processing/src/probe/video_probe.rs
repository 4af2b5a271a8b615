//! Video probe - metadata via ffprobe, thumbnail frame via ffmpeg

use anyhow::{anyhow, Context, Result};
use pixelframe_core::{MediaKind, ProbeError, ProbedFile, RawFile};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::thumbnail::render_thumbnail;

/// Timestamp the thumbnail frame is taken from.
const THUMBNAIL_SEEK_SECONDS: f64 = 1.0;

/// Validate that a binary path doesn't contain shell metacharacters or dangerous sequences
fn validate_binary_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }

    if path.contains("..") {
        return Err(anyhow!("Path contains directory traversal: {}", path));
    }

    Ok(())
}

/// Intrinsic video attributes reported by ffprobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub(crate) fn parse_probe_output(stdout: &[u8]) -> Result<VideoInfo> {
    let probe_data: serde_json::Value =
        serde_json::from_slice(stdout).context("Failed to parse ffprobe output")?;

    let stream = probe_data["streams"]
        .get(0)
        .ok_or_else(|| anyhow!("No video stream found"))?;

    let width = stream["width"]
        .as_u64()
        .ok_or_else(|| anyhow!("Could not parse width"))? as u32;

    let height = stream["height"]
        .as_u64()
        .ok_or_else(|| anyhow!("Could not parse height"))? as u32;

    // Some containers only report duration on the stream.
    let duration = [&probe_data["format"]["duration"], &stream["duration"]]
        .iter()
        .find_map(|v| v.as_str().and_then(|d| d.parse::<f64>().ok()))
        .ok_or_else(|| anyhow!("Could not parse duration"))?;

    Ok(VideoInfo {
        width,
        height,
        duration,
    })
}

/// Seek position for the thumbnail frame; clips shorter than the default
/// position use their first frame.
pub(crate) fn thumbnail_seek_position(duration: f64) -> f64 {
    if duration > THUMBNAIL_SEEK_SECONDS {
        THUMBNAIL_SEEK_SECONDS
    } else {
        0.0
    }
}

pub struct VideoProbe {
    ffprobe_path: String,
    ffmpeg_path: String,
    frame_timeout: Duration,
}

impl VideoProbe {
    pub fn new(ffprobe_path: String, ffmpeg_path: String, frame_timeout: Duration) -> Result<Self> {
        validate_binary_path(&ffprobe_path).context("Invalid ffprobe_path")?;
        validate_binary_path(&ffmpeg_path).context("Invalid ffmpeg_path")?;

        Ok(Self {
            ffprobe_path,
            ffmpeg_path,
            frame_timeout,
        })
    }

    /// Probe a video blob.
    ///
    /// The blob is staged in a temporary file for the decoders. The file is
    /// removed when the handle drops, on success and on every error path.
    pub async fn probe(&self, file: &RawFile) -> Result<ProbedFile, ProbeError> {
        let handle = self.stage(file).await.map_err(|e| {
            tracing::warn!(file = %file.name, error = %e, "Failed to stage video for probing");
            ProbeError::Info
        })?;

        let info = self.read_info(handle.path()).await.map_err(|e| {
            tracing::warn!(file = %file.name, error = %e, "Video probe failed");
            ProbeError::Info
        })?;

        let frame = self
            .capture_frame(handle.path(), thumbnail_seek_position(info.duration))
            .await
            .map_err(|e| {
                tracing::warn!(file = %file.name, error = %e, "Video frame capture failed");
                ProbeError::Thumbnail
            })?;
        drop(handle);

        let thumbnail = tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&frame).context("Failed to decode frame")?;
            render_thumbnail(&image)
        })
        .await
        .map_err(|e| anyhow!("Thumbnail task failed: {}", e))
        .and_then(|r| r)
        .map_err(|e| {
            tracing::warn!(file = %file.name, error = %e, "Video thumbnail failed");
            ProbeError::Thumbnail
        })?;

        Ok(ProbedFile {
            kind: MediaKind::Video,
            width: info.width,
            height: info.height,
            duration: Some(info.duration),
            thumbnail,
        })
    }

    async fn stage(&self, file: &RawFile) -> Result<NamedTempFile> {
        let temp_file = NamedTempFile::new().context("Failed to create temp file")?;
        tokio::time::timeout(self.frame_timeout, tokio::fs::write(temp_file.path(), &file.data))
            .await
            .map_err(|_| anyhow!("Staging timed out after {:?}", self.frame_timeout))?
            .context("Failed to write temp file")?;
        Ok(temp_file)
    }

    /// Read size and duration with ffprobe, bounded by the frame timeout.
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn read_info(&self, video_path: &Path) -> Result<VideoInfo> {
        let start = std::time::Instant::now();

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(video_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.frame_timeout, output)
            .await
            .map_err(|_| anyhow!("ffprobe timed out after {:?}", self.frame_timeout))?
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let info = parse_probe_output(&output.stdout)?;

        tracing::debug!(
            duration_ms = start.elapsed().as_millis(),
            video_duration = info.duration,
            width = info.width,
            height = info.height,
            "Video probe completed"
        );

        Ok(info)
    }

    /// Grab one PNG frame at `timestamp` seconds.
    ///
    /// Bounded by the configured frame timeout; the ffmpeg child is killed if
    /// the deadline passes.
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "thumbnail"
    ))]
    async fn capture_frame(&self, video_path: &Path, timestamp: f64) -> Result<Vec<u8>> {
        let output = Command::new(&self.ffmpeg_path)
            .args(["-v", "error", "-ss"])
            .arg(timestamp.to_string())
            .arg("-i")
            .arg(video_path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.frame_timeout, output)
            .await
            .map_err(|_| anyhow!("Frame capture timed out after {:?}", self.frame_timeout))?
            .context("Failed to execute ffmpeg")?;

        if !output.status.success() {
            return Err(anyhow!(
                "FFmpeg failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        if output.stdout.is_empty() {
            return Err(anyhow!("FFmpeg produced no frame at {}s", timestamp));
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn parses_format_duration() {
        let out = br#"{
            "streams": [{ "width": 1280, "height": 720, "codec_name": "h264" }],
            "format": { "duration": "12.480000" }
        }"#;
        let info = parse_probe_output(out).unwrap();
        assert_eq!(info.width, 1280);
        assert_eq!(info.height, 720);
        assert!((info.duration - 12.48).abs() < f64::EPSILON);
    }

    #[test]
    fn falls_back_to_stream_duration() {
        let out = br#"{
            "streams": [{ "width": 640, "height": 480, "duration": "3.5" }],
            "format": {}
        }"#;
        assert_eq!(parse_probe_output(out).unwrap().duration, 3.5);
    }

    #[test]
    fn missing_stream_is_an_error() {
        assert!(parse_probe_output(br#"{ "streams": [], "format": {} }"#).is_err());
        assert!(parse_probe_output(b"not json").is_err());
    }

    #[test]
    fn seek_position_for_short_clips() {
        assert_eq!(thumbnail_seek_position(30.0), 1.0);
        assert_eq!(thumbnail_seek_position(0.6), 0.0);
    }

    #[test]
    fn rejects_unsafe_binary_paths() {
        let timeout = Duration::from_secs(1);
        assert!(VideoProbe::new("ffprobe; rm -rf /".into(), "ffmpeg".into(), timeout).is_err());
        assert!(VideoProbe::new("ffprobe".into(), "../ffmpeg".into(), timeout).is_err());
        assert!(VideoProbe::new("/usr/bin/ffprobe".into(), "ffmpeg".into(), timeout).is_ok());
    }

    #[tokio::test]
    async fn garbage_blob_fails_with_info_error() {
        let probe = VideoProbe::new(
            "pixelframe-missing-ffprobe".into(),
            "pixelframe-missing-ffmpeg".into(),
            Duration::from_secs(1),
        )
        .unwrap();
        let file = RawFile::new("clip.mp4", "video/mp4", Bytes::from_static(b"junk"));
        assert_eq!(probe.probe(&file).await, Err(ProbeError::Info));
    }

    #[cfg(unix)]
    fn stalled_binary(dir: &Path, name: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stalled_ffprobe_times_out_with_info_error() {
        let dir = tempfile::tempdir().unwrap();
        let probe = VideoProbe::new(
            stalled_binary(dir.path(), "ffprobe"),
            stalled_binary(dir.path(), "ffmpeg"),
            Duration::from_millis(500),
        )
        .unwrap();
        let file = RawFile::new("clip.mp4", "video/mp4", Bytes::from_static(b"junk"));

        let outcome = tokio::time::timeout(Duration::from_secs(5), probe.probe(&file))
            .await
            .expect("probe should give up after the frame timeout");
        assert_eq!(outcome, Err(ProbeError::Info));
    }

    #[tokio::test]
    #[ignore] // Requires ffmpeg/ffprobe on PATH
    async fn probes_generated_clip() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        let status = std::process::Command::new("ffmpeg")
            .args(["-v", "error", "-f", "lavfi", "-i", "testsrc=size=320x240:rate=10"])
            .args(["-t", "2", "-pix_fmt", "yuv420p"])
            .arg(&clip)
            .status()
            .unwrap();
        assert!(status.success());

        let data = Bytes::from(std::fs::read(&clip).unwrap());
        let probe =
            VideoProbe::new("ffprobe".into(), "ffmpeg".into(), Duration::from_secs(10)).unwrap();
        let probed = probe
            .probe(&RawFile::new("clip.mp4", "video/mp4", data))
            .await
            .unwrap();

        assert_eq!((probed.width, probed.height), (320, 240));
        assert!(probed.duration.unwrap() > 1.5);
        assert!(probed.thumbnail.starts_with("data:image/jpeg;base64,"));
    }
}
