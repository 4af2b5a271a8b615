//! Configuration module
//!
//! The uploader is driven by one resolved [`UploaderConfig`] value. It is
//! loaded once (from a JSON file and/or the environment), validated, and then
//! shared read-only for the lifetime of every batch started with it.

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::accept::AcceptList;
use crate::models::MediaKind;
use crate::storage_types::StorageBackend;

// Defaults
const DEFAULT_ACCEPT: &str = ".jpg,.jpeg,.png,.gif,.webp,.avif,.mov,.mp4,.ogg,.webm";
const MIN_DIMENSION: u32 = 100;
const MAX_IMAGE_SIZE_BYTES: u64 = 1024 * 1024 * 50;
const MAX_VIDEO_SIZE_BYTES: u64 = 1024 * 1024 * 300;
const MAX_VIDEO_DURATION_SECS: f64 = 60.0 * 60.0;
const MAX_IMAGE_COUNT: usize = 5;
const MAX_VIDEO_COUNT: usize = 5;
const FRAME_TIMEOUT_MS: u64 = 10_000;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Per-kind acceptance limits.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub min_width: u32,
    pub min_height: u32,
    pub max_size_bytes: u64,
    /// Only applied to videos.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<f64>,
}

impl Limits {
    pub fn image_default() -> Self {
        Self {
            min_width: MIN_DIMENSION,
            min_height: MIN_DIMENSION,
            max_size_bytes: MAX_IMAGE_SIZE_BYTES,
            max_duration_seconds: None,
        }
    }

    pub fn video_default() -> Self {
        Self {
            min_width: MIN_DIMENSION,
            min_height: MIN_DIMENSION,
            max_size_bytes: MAX_VIDEO_SIZE_BYTES,
            max_duration_seconds: Some(MAX_VIDEO_DURATION_SECS),
        }
    }

    fn merged(mut self, partial: PartialLimits) -> Self {
        if let Some(v) = partial.min_width {
            self.min_width = v;
        }
        if let Some(v) = partial.min_height {
            self.min_height = v;
        }
        if let Some(v) = partial.max_size_bytes {
            self.max_size_bytes = v;
        }
        if partial.max_duration_seconds.is_some() {
            self.max_duration_seconds = partial.max_duration_seconds;
        }
        self
    }
}

/// Limits as written in a config file; missing fields keep the kind's default.
#[derive(Deserialize, Default)]
struct PartialLimits {
    #[serde(default, alias = "minWidth", alias = "minwidth")]
    min_width: Option<u32>,
    #[serde(default, alias = "minHeight", alias = "minheight")]
    min_height: Option<u32>,
    #[serde(default, alias = "maxSizeBytes", alias = "size")]
    max_size_bytes: Option<u64>,
    #[serde(default, alias = "maxDurationSeconds", alias = "duration")]
    max_duration_seconds: Option<f64>,
}

fn deserialize_image_limits<'de, D: Deserializer<'de>>(d: D) -> Result<Limits, D::Error> {
    Ok(Limits::image_default().merged(PartialLimits::deserialize(d)?))
}

fn deserialize_video_limits<'de, D: Deserializer<'de>>(d: D) -> Result<Limits, D::Error> {
    Ok(Limits::video_default().merged(PartialLimits::deserialize(d)?))
}

/// Counts must be non-negative integers; anything else keeps the default.
fn lenient_count<'de, D: Deserializer<'de>>(d: D, default: usize) -> Result<usize, D::Error> {
    let value = JsonValue::deserialize(d)?;
    let parsed = match &value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(parsed.map(|n| n as usize).unwrap_or(default))
}

fn deserialize_image_count<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    lenient_count(d, MAX_IMAGE_COUNT)
}

fn deserialize_video_count<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    lenient_count(d, MAX_VIDEO_COUNT)
}

/// Credential ("token") service endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenServiceConfig {
    pub url: String,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000/api/v1/aws/resources/s3/credentials?role=content-upload"
                .to_string(),
        }
    }
}

/// Registration endpoints, one per media kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrationUrls {
    pub image: String,
    pub video: String,
}

impl Default for RegistrationUrls {
    fn default() -> Self {
        Self {
            image: "http://localhost:3000/api/v1/images/upload".to_string(),
            video: "http://localhost:3000/api/v1/videos/upload".to_string(),
        }
    }
}

/// Registration ("upload") service: endpoints and the fixed parameters sent
/// with every registration call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationServiceConfig {
    #[serde(default)]
    pub urls: RegistrationUrls,
    #[serde(default)]
    pub params: Map<String, JsonValue>,
}

impl RegistrationServiceConfig {
    pub fn url_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.urls.image,
            MediaKind::Video => &self.urls.video,
        }
    }
}

/// Remote collaborators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub token: TokenServiceConfig,
    #[serde(default)]
    pub upload: RegistrationServiceConfig,
    /// Timeout applied to token and registration requests.
    #[serde(default = "default_request_timeout_secs", alias = "requestTimeoutSecs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            token: TokenServiceConfig::default(),
            upload: RegistrationServiceConfig::default(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ServicesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Where uploaded objects go.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Custom endpoint for S3-compatible providers (MinIO, etc.)
    #[serde(default, alias = "s3Endpoint")]
    pub s3_endpoint: Option<String>,
    #[serde(default, alias = "localPath")]
    pub local_path: Option<PathBuf>,
    #[serde(default, alias = "localBaseUrl")]
    pub local_base_url: Option<String>,
}

/// External decoders used by the media probe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_ffprobe_path", alias = "ffprobePath")]
    pub ffprobe_path: String,
    #[serde(default = "default_ffmpeg_path", alias = "ffmpegPath")]
    pub ffmpeg_path: String,
    /// Upper bound for each video probing step: staging, ffprobe and the
    /// thumbnail frame capture.
    #[serde(default = "default_frame_timeout_ms", alias = "frameTimeoutMs")]
    pub frame_timeout_ms: u64,
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_frame_timeout_ms() -> u64 {
    FRAME_TIMEOUT_MS
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe_path(),
            ffmpeg_path: default_ffmpeg_path(),
            frame_timeout_ms: FRAME_TIMEOUT_MS,
        }
    }
}

impl ProbeConfig {
    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }
}

/// Resolved uploader configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploaderConfig {
    #[serde(default = "default_accept")]
    pub accept: String,
    #[serde(default)]
    pub multiple: bool,
    #[serde(
        default = "Limits::image_default",
        alias = "imagelimitation",
        alias = "imageLimitation",
        deserialize_with = "deserialize_image_limits"
    )]
    pub image_limits: Limits,
    #[serde(
        default = "Limits::video_default",
        alias = "videolimitation",
        alias = "videoLimitation",
        deserialize_with = "deserialize_video_limits"
    )]
    pub video_limits: Limits,
    #[serde(
        default = "default_max_image_count",
        alias = "maximagecount",
        deserialize_with = "deserialize_image_count"
    )]
    pub max_image_count: usize,
    #[serde(
        default = "default_max_video_count",
        alias = "maxvideocount",
        deserialize_with = "deserialize_video_count"
    )]
    pub max_video_count: usize,
    #[serde(default, alias = "webservice")]
    pub services: ServicesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}

fn default_max_image_count() -> usize {
    MAX_IMAGE_COUNT
}

fn default_max_video_count() -> usize {
    MAX_VIDEO_COUNT
}

/// Invalid counts fall back to the default, same as in a config file.
fn env_count(var: &str, value: &str, default: usize) -> usize {
    value.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(var, value, default, "Invalid count, using default");
        default
    })
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            accept: default_accept(),
            multiple: false,
            image_limits: Limits::image_default(),
            video_limits: Limits::video_default(),
            max_image_count: MAX_IMAGE_COUNT,
            max_video_count: MAX_VIDEO_COUNT,
            services: ServicesConfig::default(),
            storage: StorageConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl UploaderConfig {
    /// Load a JSON config file; absent fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: UploaderConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the environment.
    ///
    /// `PIXELFRAME_CONFIG` optionally names a JSON file used as the base;
    /// individual `PIXELFRAME_*` and storage variables override it.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let mut config = match env::var("PIXELFRAME_CONFIG") {
            Ok(path) => {
                tracing::info!(path = %path, "Loading uploader config file");
                Self::from_file(path)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(accept) = env::var("PIXELFRAME_ACCEPT") {
            if !accept.trim().is_empty() {
                config.accept = accept;
            }
        }
        if let Ok(multiple) = env::var("PIXELFRAME_MULTIPLE") {
            config.multiple = multiple.to_lowercase().parse().unwrap_or(config.multiple);
        }
        if let Ok(count) = env::var("PIXELFRAME_MAX_IMAGE_COUNT") {
            config.max_image_count =
                env_count("PIXELFRAME_MAX_IMAGE_COUNT", &count, MAX_IMAGE_COUNT);
        }
        if let Ok(count) = env::var("PIXELFRAME_MAX_VIDEO_COUNT") {
            config.max_video_count =
                env_count("PIXELFRAME_MAX_VIDEO_COUNT", &count, MAX_VIDEO_COUNT);
        }
        if let Ok(url) = env::var("PIXELFRAME_TOKEN_URL") {
            config.services.token.url = url;
        }
        if let Ok(url) = env::var("PIXELFRAME_IMAGE_REGISTER_URL") {
            config.services.upload.urls.image = url;
        }
        if let Ok(url) = env::var("PIXELFRAME_VIDEO_REGISTER_URL") {
            config.services.upload.urls.video = url;
        }
        if let Ok(backend) = env::var("STORAGE_BACKEND") {
            config.storage.backend = backend.parse()?;
        }
        if let Ok(endpoint) = env::var("S3_ENDPOINT") {
            config.storage.s3_endpoint = Some(endpoint);
        }
        if let Ok(path) = env::var("LOCAL_STORAGE_PATH") {
            config.storage.local_path = Some(PathBuf::from(path));
        }
        if let Ok(url) = env::var("LOCAL_STORAGE_BASE_URL") {
            config.storage.local_base_url = Some(url);
        }
        if let Ok(path) = env::var("FFMPEG_PATH") {
            config.probe.ffmpeg_path = path;
        }
        if let Ok(path) = env::var("FFPROBE_PATH") {
            config.probe.ffprobe_path = path;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the uploader cannot run with.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.services.token.url.trim().is_empty() {
            return Err(anyhow::anyhow!("Token service URL must be set"));
        }
        for kind in [MediaKind::Image, MediaKind::Video] {
            if self.services.upload.url_for(kind).trim().is_empty() {
                return Err(anyhow::anyhow!("Registration URL for {} must be set", kind));
            }
        }
        if self.storage.backend == StorageBackend::Local && self.storage.local_path.is_none() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set for the local storage backend"
            ));
        }
        Ok(())
    }

    pub fn limits_for(&self, kind: MediaKind) -> &Limits {
        match kind {
            MediaKind::Image => &self.image_limits,
            MediaKind::Video => &self.video_limits,
        }
    }

    pub fn max_count_for(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Image => self.max_image_count,
            MediaKind::Video => self.max_video_count,
        }
    }

    pub fn accept_list(&self) -> AcceptList {
        AcceptList::parse(&self.accept)
    }
}
