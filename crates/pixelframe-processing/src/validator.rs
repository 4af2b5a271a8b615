use pixelframe_core::{
    AcceptedFile, ErrorMetadata, EventSink, Limits, LogLevel, MediaKind, ProbedFile, RawFile,
    UnitId, UploaderConfig, UploaderEvent, ValidationError,
};
use std::sync::Arc;

use crate::probe::MediaProbe;

/// Media file validator
///
/// Decides whether one raw file may join a batch. Checks run in a fixed
/// order and stop at the first failure: declared type, probe, byte size,
/// width, height, and finally duration for videos.
pub struct MediaValidator {
    probe: Arc<dyn MediaProbe>,
}

impl MediaValidator {
    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self { probe }
    }

    /// Validate a single file against the per-kind limits of `config`.
    ///
    /// On acceptance the file is assigned a fresh unit id.
    pub async fn validate(
        &self,
        file: RawFile,
        config: &UploaderConfig,
    ) -> Result<AcceptedFile, ValidationError> {
        let kind = MediaKind::from_content_type(&file.content_type).ok_or_else(|| {
            ValidationError::UnsupportedType {
                content_type: file.content_type.clone(),
            }
        })?;

        let probed = self.probe.probe(&file, kind).await?;

        check_limits(file.size(), &probed, config.limits_for(kind))?;

        Ok(AcceptedFile {
            id: UnitId::generate(),
            kind,
            file,
            thumbnail: probed.thumbnail,
            width: probed.width,
            height: probed.height,
            duration: probed.duration,
        })
    }

    /// Validate and publish any rejection as an `error` event.
    ///
    /// Rejections are per-file; the caller keeps going with the remaining files.
    pub async fn validate_and_report(
        &self,
        file: RawFile,
        config: &UploaderConfig,
        events: &dyn EventSink,
    ) -> Result<AcceptedFile, ValidationError> {
        let name = file.name.clone();
        let result = self.validate(file, config).await;

        match &result {
            Ok(accepted) => {
                tracing::debug!(
                    file = %name,
                    unit_id = %accepted.id,
                    kind = %accepted.kind,
                    width = accepted.width,
                    height = accepted.height,
                    "File accepted"
                );
            }
            Err(e) => {
                log_rejection(&name, e);
                events.emit(UploaderEvent::error(e.to_string()));
            }
        }

        result
    }
}

fn log_rejection(name: &str, error: &ValidationError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(file = %name, error = %error, code, "File rejected");
        }
        LogLevel::Warn => {
            tracing::warn!(file = %name, error = %error, code, "File rejected");
        }
        LogLevel::Error => {
            tracing::error!(file = %name, error = %error, code, "File rejected");
        }
    }
}

/// Size, dimension and duration checks on an already probed file.
pub fn check_limits(
    size: u64,
    probed: &ProbedFile,
    limits: &Limits,
) -> Result<(), ValidationError> {
    if size > limits.max_size_bytes {
        return Err(ValidationError::TooLarge {
            size,
            max: limits.max_size_bytes,
        });
    }

    if probed.width < limits.min_width {
        return Err(ValidationError::TooNarrow {
            width: probed.width,
            min: limits.min_width,
        });
    }

    if probed.height < limits.min_height {
        return Err(ValidationError::TooShort {
            height: probed.height,
            min: limits.min_height,
        });
    }

    if probed.kind == MediaKind::Video {
        if let (Some(duration), Some(max)) = (probed.duration, limits.max_duration_seconds) {
            if duration > max {
                return Err(ValidationError::TooLong { duration, max });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use pixelframe_core::ProbeError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedProbe {
        width: u32,
        height: u32,
        duration: Option<f64>,
        fail: Option<ProbeError>,
        calls: AtomicUsize,
    }

    impl FixedProbe {
        fn new(width: u32, height: u32, duration: Option<f64>) -> Self {
            Self {
                width,
                height,
                duration,
                fail: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaProbe for FixedProbe {
        async fn probe(&self, _file: &RawFile, kind: MediaKind) -> Result<ProbedFile, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = &self.fail {
                return Err(e.clone());
            }
            Ok(ProbedFile {
                kind,
                width: self.width,
                height: self.height,
                duration: self.duration,
                thumbnail: "data:image/jpeg;base64,AAAA".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<UploaderEvent>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: UploaderEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn file(content_type: &str, size: usize) -> RawFile {
        RawFile::new("upload.bin", content_type, Bytes::from(vec![0u8; size]))
    }

    #[tokio::test]
    async fn test_accepts_image_within_limits() {
        let validator = MediaValidator::new(Arc::new(FixedProbe::new(800, 600, None)));
        let accepted = validator
            .validate(file("image/png", 1024), &UploaderConfig::default())
            .await
            .unwrap();

        assert_eq!(accepted.kind, MediaKind::Image);
        assert_eq!((accepted.width, accepted.height), (800, 600));
        assert!(accepted.id.as_str().starts_with("unit-"));
    }

    #[tokio::test]
    async fn test_unsupported_type_skips_probe() {
        let probe = Arc::new(FixedProbe::new(800, 600, None));
        let validator = MediaValidator::new(probe.clone());

        let err = validator
            .validate(file("application/pdf", 10), &UploaderConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
        assert_eq!(err.to_string(), "file type not allowed.");
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_is_rejection() {
        let mut probe = FixedProbe::new(0, 0, None);
        probe.fail = Some(ProbeError::Thumbnail);
        let validator = MediaValidator::new(Arc::new(probe));

        let err = validator
            .validate(file("video/mp4", 10), &UploaderConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err, ValidationError::Probe(ProbeError::Thumbnail));
        assert_eq!(err.to_string(), "fetch file thumbnail error.");
    }

    #[tokio::test]
    async fn test_size_checked_before_dimensions() {
        let validator = MediaValidator::new(Arc::new(FixedProbe::new(10, 10, None)));
        let mut config = UploaderConfig::default();
        config.image_limits.max_size_bytes = 100;

        let err = validator
            .validate(file("image/jpeg", 101), &config)
            .await
            .unwrap_err();

        assert_eq!(err, ValidationError::TooLarge { size: 101, max: 100 });
        assert_eq!(err.to_string(), "file size must under 100 bytes.");
    }

    #[tokio::test]
    async fn test_narrow_then_short() {
        let config = UploaderConfig::default();

        let narrow = MediaValidator::new(Arc::new(FixedProbe::new(50, 50, None)));
        let err = narrow
            .validate(file("image/png", 10), &config)
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::TooNarrow { width: 50, min: 100 });
        assert_eq!(err.to_string(), "file width must be bigger than 100px.");

        let short = MediaValidator::new(Arc::new(FixedProbe::new(200, 99, None)));
        let err = short
            .validate(file("image/png", 10), &config)
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::TooShort { height: 99, min: 100 });
    }

    #[tokio::test]
    async fn test_duration_only_checked_for_video() {
        let mut config = UploaderConfig::default();
        config.video_limits.max_duration_seconds = Some(60.0);
        config.image_limits.max_duration_seconds = Some(60.0);

        let validator = MediaValidator::new(Arc::new(FixedProbe::new(640, 480, Some(61.5))));
        let err = validator
            .validate(file("video/mp4", 10), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { .. }));
        assert_eq!(err.to_string(), "file duration must be smaller than 60s.");

        assert!(validator.validate(file("image/gif", 10), &config).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejection_emits_error_event() {
        let validator = MediaValidator::new(Arc::new(FixedProbe::new(50, 50, None)));
        let sink = RecordingSink::default();

        let result = validator
            .validate_and_report(file("image/png", 10), &UploaderConfig::default(), &sink)
            .await;

        assert!(result.is_err());
        let events = sink.0.lock().unwrap();
        assert_eq!(
            *events,
            vec![UploaderEvent::error("file width must be bigger than 100px.")]
        );
    }

    #[tokio::test]
    async fn test_acceptance_emits_nothing() {
        let validator = MediaValidator::new(Arc::new(FixedProbe::new(500, 500, None)));
        let sink = RecordingSink::default();

        let result = validator
            .validate_and_report(file("image/png", 10), &UploaderConfig::default(), &sink)
            .await;

        assert!(result.is_ok());
        assert!(sink.0.lock().unwrap().is_empty());
    }
}
