//! Uploader facade: admission through the processing gate, batch selection
//! and hand-off to the upload pipeline.

use anyhow::{Context, Result};
use pixelframe_core::{Batch, EventSink, RawFile, UploaderConfig, UploaderEvent};
use pixelframe_processing::{
    BatchSelector, MediaProbe, MediaValidator, NativeProbe, ValidationPolicy,
};
use pixelframe_storage::create_storage;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::events::EventBus;
use crate::gate::{ProcessingGate, BUSY_MESSAGE};
use crate::pipeline::{BatchHandle, UnitTable, UploadPipeline, UploadServices};
use crate::services::HttpServiceClient;

pub struct Uploader {
    config: UploaderConfig,
    selector: BatchSelector,
    pipeline: UploadPipeline,
    gate: Arc<ProcessingGate>,
    bus: EventBus,
    current: Mutex<Option<UnitTable>>,
    cancel: CancellationToken,
}

impl Uploader {
    pub fn new(
        config: UploaderConfig,
        probe: Arc<dyn MediaProbe>,
        services: UploadServices,
        policy: ValidationPolicy,
    ) -> Self {
        let bus = EventBus::default();
        let gate = Arc::new(ProcessingGate::new());
        let events: Arc<dyn EventSink> = Arc::new(bus.clone());

        Self {
            config,
            selector: BatchSelector::new(MediaValidator::new(probe), policy),
            pipeline: UploadPipeline::new(services, events, Arc::clone(&gate)),
            gate,
            bus,
            current: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Wire up the native probe, the HTTP services and the configured
    /// storage backend.
    pub async fn from_config(config: UploaderConfig, policy: ValidationPolicy) -> Result<Self> {
        config.validate()?;

        let probe = NativeProbe::new(&config.probe).context("Failed to set up media probe")?;
        let client = Arc::new(HttpServiceClient::new(&config.services)?);
        let storage = create_storage(&config.storage)
            .await
            .context("Failed to set up storage backend")?;

        tracing::info!(
            backend = %storage.backend_type(),
            policy = ?policy,
            max_images = config.max_image_count,
            max_videos = config.max_video_count,
            "Uploader ready"
        );

        let services = UploadServices {
            credentials: client.clone(),
            storage,
            registrar: client,
        };

        Ok(Self::new(config, Arc::new(probe), services, policy))
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploaderEvent> {
        self.bus.subscribe()
    }

    /// Whether a selection or batch is in flight.
    pub fn processing(&self) -> bool {
        self.gate.is_active()
    }

    pub fn supported_events(&self) -> Vec<String> {
        UploaderEvent::supported_events()
    }

    /// Unit table of the most recent batch.
    pub fn snapshot(&self) -> Option<Batch> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(UnitTable::snapshot)
    }

    /// Run one file selection.
    ///
    /// Returns the started batch, or `None` when nothing was started: an empty
    /// selection, a selection made while another batch is in flight (reported
    /// as an `error` event), or a selection in which no file was accepted.
    pub async fn pass_files(&self, files: Vec<RawFile>) -> Option<BatchHandle> {
        if files.is_empty() {
            return None;
        }

        if !self.gate.try_start() {
            tracing::warn!(files = files.len(), "Selection rejected, batch in flight");
            self.bus.emit(UploaderEvent::error(BUSY_MESSAGE));
            return None;
        }

        let events: Arc<dyn EventSink> = Arc::new(self.bus.clone());
        let selection = self.selector.select(files, &self.config, events).await;

        if selection.is_empty() {
            self.gate.finish();
            return None;
        }

        let handle = self.pipeline.run(selection.accepted);
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(handle.table().clone());

        Some(handle)
    }

    /// Consume selection events until the channel closes or [`detach`] is
    /// called.
    ///
    /// [`detach`]: Uploader::detach
    pub async fn listen(&self, mut selections: mpsc::Receiver<Vec<RawFile>>) {
        let token = self.cancel.clone();

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("Selection listener detached");
                    break;
                }
                next = selections.recv() => match next {
                    Some(files) => {
                        self.pass_files(files).await;
                    }
                    None => break,
                },
            }
        }
    }

    /// Stop listening for selections. Batches already started keep running.
    pub fn detach(&self) {
        self.cancel.cancel();
    }
}
