//! Batch formation: validate a file selection and cut it down to the
//! accepted, capped, video-first list that becomes a batch.

use futures::future::join_all;
use pixelframe_core::{
    AcceptedFile, EventSink, MediaKind, PickedUnit, RawFile, UnitId, UploaderConfig,
    UploaderEvent,
};
use std::sync::Arc;

use crate::validator::MediaValidator;

/// How the files of one selection are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// One file fully probed before the next starts. Used on constrained
    /// (touch-primary) devices.
    Sequential,
    /// Every file probed concurrently.
    #[default]
    Parallel,
}

impl ValidationPolicy {
    pub fn for_device(touch_primary: bool) -> Self {
        if touch_primary {
            ValidationPolicy::Sequential
        } else {
            ValidationPolicy::Parallel
        }
    }
}

/// Outcome of one selection.
#[derive(Debug, Default)]
pub struct Selection {
    /// Accepted files in batch order: videos first, then images.
    pub accepted: Vec<AcceptedFile>,
    /// Files that passed validation but fell beyond their kind's cap.
    pub over_cap: usize,
    /// Files rejected during validation.
    pub rejected: usize,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn order(&self) -> Vec<UnitId> {
        self.accepted.iter().map(|f| f.id.clone()).collect()
    }

    pub fn picked(&self) -> Vec<PickedUnit> {
        self.accepted.iter().map(AcceptedFile::picked).collect()
    }
}

pub struct BatchSelector {
    validator: MediaValidator,
    policy: ValidationPolicy,
}

impl BatchSelector {
    pub fn new(validator: MediaValidator, policy: ValidationPolicy) -> Self {
        Self { validator, policy }
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Validate `files`, group the survivors by kind, apply the per-kind caps
    /// and emit one `pick` event if anything was accepted.
    ///
    /// Rejections are reported through `events` as they happen. An empty
    /// selection emits nothing further.
    #[tracing::instrument(skip_all, fields(files = files.len(), policy = ?self.policy))]
    pub async fn select(
        &self,
        files: Vec<RawFile>,
        config: &UploaderConfig,
        events: Arc<dyn EventSink>,
    ) -> Selection {
        let results = match self.policy {
            ValidationPolicy::Sequential => {
                let mut results = Vec::with_capacity(files.len());
                for file in files {
                    results.push(
                        self.validator
                            .validate_and_report(file, config, events.as_ref())
                            .await,
                    );
                }
                results
            }
            ValidationPolicy::Parallel => {
                join_all(files.into_iter().map(|file| {
                    self.validator
                        .validate_and_report(file, config, events.as_ref())
                }))
                .await
            }
        };

        let mut videos = Vec::new();
        let mut images = Vec::new();
        let mut rejected = 0;
        for result in results {
            match result {
                Ok(accepted) => match accepted.kind {
                    MediaKind::Video => videos.push(accepted),
                    MediaKind::Image => images.push(accepted),
                },
                Err(_) => rejected += 1,
            }
        }

        let valid = videos.len() + images.len();
        videos.truncate(config.max_count_for(MediaKind::Video));
        images.truncate(config.max_count_for(MediaKind::Image));

        let mut accepted = videos;
        accepted.append(&mut images);

        let selection = Selection {
            over_cap: valid - accepted.len(),
            rejected,
            accepted,
        };

        if selection.over_cap > 0 {
            tracing::info!(
                dropped = selection.over_cap,
                max_images = config.max_image_count,
                max_videos = config.max_video_count,
                "Selection truncated to per-kind caps"
            );
        }

        if selection.is_empty() {
            tracing::debug!(rejected = selection.rejected, "Nothing accepted");
        } else {
            events.emit(UploaderEvent::Pick {
                picked: selection.picked(),
            });
        }

        selection
    }
}
