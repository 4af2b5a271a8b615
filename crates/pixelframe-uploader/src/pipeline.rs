//! Upload pipeline: credentials → storage → registration, one task per unit.
//!
//! Every accepted unit of a batch runs its own sequential pipeline; units run
//! concurrently with no cap beyond the per-kind counts already applied at
//! selection. All unit transitions go through the batch's [`UnitTable`],
//! which also owns completion detection: the first transition that leaves
//! every unit terminal reopens the processing gate and emits `process-end`
//! followed by `done`. Later transitions never fire it again.

use pixelframe_core::{
    AcceptedFile, Batch, ErrorMetadata, EventSink, LogLevel, PickedUnit, UnitId, UnitState,
    UnitSummary, UploadError, UploaderEvent,
};
use pixelframe_storage::{ProgressFn, Storage, UploadProgress};
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::Instrument;

use crate::gate::ProcessingGate;
use crate::services::{AssetRegistrar, CredentialProvider};

/// External collaborators every unit pipeline talks to.
#[derive(Clone)]
pub struct UploadServices {
    pub credentials: Arc<dyn CredentialProvider>,
    pub storage: Arc<dyn Storage>,
    pub registrar: Arc<dyn AssetRegistrar>,
}

struct TableState {
    batch: Batch,
    finished: bool,
}

/// Shared unit table of one batch.
#[derive(Clone)]
pub struct UnitTable {
    state: Arc<Mutex<TableState>>,
}

impl UnitTable {
    fn new(batch: Batch) -> Self {
        Self {
            state: Arc::new(Mutex::new(TableState {
                batch,
                finished: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the table as it stands.
    pub fn snapshot(&self) -> Batch {
        self.lock().batch.clone()
    }

    /// True once the completion event has fired.
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }
}

/// Observer of one running batch.
pub struct BatchHandle {
    table: UnitTable,
    done: watch::Receiver<Option<Vec<UnitSummary>>>,
}

impl BatchHandle {
    pub fn table(&self) -> &UnitTable {
        &self.table
    }

    pub fn snapshot(&self) -> Batch {
        self.table.snapshot()
    }

    /// Wait until every unit has settled and return the per-unit summaries
    /// in selection order.
    pub async fn wait(mut self) -> Vec<UnitSummary> {
        match self.done.wait_for(Option::is_some).await {
            Ok(results) => results.clone().unwrap_or_default(),
            Err(_) => self.table.snapshot().summaries(),
        }
    }
}

/// State shared by the unit tasks of one batch.
struct BatchContext {
    table: UnitTable,
    events: Arc<dyn EventSink>,
    gate: Arc<ProcessingGate>,
    done: watch::Sender<Option<Vec<UnitSummary>>>,
}

impl BatchContext {
    fn enter(&self, id: &UnitId, next: UnitState) {
        if let Some(unit) = self.table.lock().batch.get_mut(id) {
            unit.enter(next);
        }
    }

    /// Storage progress callback for one unit. Only increases are published,
    /// and never beyond the in-flight cap.
    fn progress_fn(self: &Arc<Self>, id: UnitId) -> ProgressFn {
        let ctx = Arc::clone(self);
        Arc::new(move |progress: UploadProgress| {
            let mut state = ctx.table.lock();
            if let Some(unit) = state.batch.get_mut(&id) {
                if let Some(progress) = unit.advance_progress(progress.percent()) {
                    ctx.events.emit(UploaderEvent::Progress {
                        id: id.clone(),
                        progress,
                    });
                }
            }
        })
    }

    /// Record the unit's outcome, then run the completion check.
    ///
    /// Events are emitted while the table is locked so that no unit event
    /// can trail the batch's `done`.
    fn settle(&self, id: &UnitId, outcome: Result<JsonValue, UploadError>) {
        let mut state = self.table.lock();

        if let Some(unit) = state.batch.get_mut(id) {
            match outcome {
                Ok(result) => {
                    if unit.complete(result) {
                        tracing::info!(unit_id = %id, kind = %unit.kind, "Unit uploaded");
                        self.events.emit(UploaderEvent::Progress {
                            id: id.clone(),
                            progress: 100,
                        });
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    if unit.fail(message.clone()) {
                        log_unit_failure(id, &e);
                        self.events.emit(UploaderEvent::Progress {
                            id: id.clone(),
                            progress: 100,
                        });
                        self.events.emit(UploaderEvent::unit_error(id.clone(), message));
                    }
                }
            }
        }

        self.complete_if_settled(&mut state);
    }

    fn complete_if_settled(&self, state: &mut TableState) {
        if state.finished || !state.batch.is_settled() {
            return;
        }
        state.finished = true;

        let results = state.batch.summaries();
        let failed = results.iter().filter(|r| r.error.is_some()).count();
        tracing::info!(units = results.len(), failed, "Batch finished");

        self.events.emit(UploaderEvent::ProcessEnd);
        self.events.emit(UploaderEvent::Done {
            results: results.clone(),
        });
        // Reopen only after `done` so the next batch's `pick` cannot precede it.
        self.gate.finish();
        self.done.send_replace(Some(results));
    }
}

fn log_unit_failure(id: &UnitId, error: &UploadError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(unit_id = %id, error = %error, code, "Unit failed"),
        LogLevel::Warn => tracing::warn!(unit_id = %id, error = %error, code, "Unit failed"),
        LogLevel::Error => tracing::error!(unit_id = %id, error = %error, code, "Unit failed"),
    }
}

/// Runs accepted units through upload and registration.
#[derive(Clone)]
pub struct UploadPipeline {
    services: UploadServices,
    events: Arc<dyn EventSink>,
    gate: Arc<ProcessingGate>,
}

impl UploadPipeline {
    pub fn new(
        services: UploadServices,
        events: Arc<dyn EventSink>,
        gate: Arc<ProcessingGate>,
    ) -> Self {
        Self {
            services,
            events,
            gate,
        }
    }

    /// Start the batch: emit `process-start` and spawn one task per unit.
    ///
    /// Returns immediately. The gate is expected to be claimed by the caller
    /// and is released when the batch completes.
    pub fn run(&self, files: Vec<AcceptedFile>) -> BatchHandle {
        let picked: Vec<PickedUnit> = files.iter().map(AcceptedFile::picked).collect();
        let table = UnitTable::new(Batch::from_picked(&picked));
        let (done_tx, done_rx) = watch::channel(None);

        let ctx = Arc::new(BatchContext {
            table: table.clone(),
            events: Arc::clone(&self.events),
            gate: Arc::clone(&self.gate),
            done: done_tx,
        });

        tracing::info!(units = files.len(), "Starting batch upload");
        self.events.emit(UploaderEvent::ProcessStart);

        if files.is_empty() {
            ctx.complete_if_settled(&mut ctx.table.lock());
        }

        for file in files {
            let id = file.id.clone();
            let span = tracing::info_span!("upload_unit", unit_id = %id, kind = %file.kind);
            let task = tokio::spawn(
                upload_unit(self.services.clone(), Arc::clone(&ctx), file).instrument(span),
            );

            // A panicking unit task still has to settle, or the batch never completes.
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                if let Err(e) = task.await {
                    tracing::error!(unit_id = %id, error = %e, "Upload task aborted");
                    let error = UploadError::Storage(format!("Upload task failed: {}", e));
                    ctx.settle(&id, Err(error));
                }
            });
        }

        BatchHandle {
            table,
            done: done_rx,
        }
    }
}

async fn upload_unit(services: UploadServices, ctx: Arc<BatchContext>, file: AcceptedFile) {
    let id = file.id.clone();
    let outcome = transfer(&services, &ctx, &file).await;
    ctx.settle(&id, outcome);
}

async fn transfer(
    services: &UploadServices,
    ctx: &Arc<BatchContext>,
    file: &AcceptedFile,
) -> Result<JsonValue, UploadError> {
    let start = std::time::Instant::now();
    ctx.enter(&file.id, UnitState::Uploading);

    let credentials = services.credentials.fetch_credentials().await?;
    tracing::debug!(bucket = %credentials.bucket_name, "Upload credentials received");

    let location = services
        .storage
        .upload(
            &credentials,
            &file.file.content_type,
            file.file.data.clone(),
            ctx.progress_fn(file.id.clone()),
        )
        .await
        .map_err(|e| UploadError::Storage(e.to_string()))?;

    ctx.enter(&file.id, UnitState::Registering);
    tracing::debug!(
        location = %location,
        duration_ms = start.elapsed().as_millis(),
        "Stored, registering"
    );

    services.registrar.register(file.kind, &location).await
}
