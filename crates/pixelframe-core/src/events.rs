//! Observable uploader events and the sink they are published through.

use serde::{Deserialize, Serialize};

use crate::models::{PickedUnit, UnitId, UnitSummary};

const EVENT_PREFIX: &str = "pixelframe-uploader";

/// Events emitted while forming and uploading a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "detail", rename_all = "kebab-case")]
pub enum UploaderEvent {
    /// Accepted units of a new batch, without their file blobs.
    Pick { picked: Vec<PickedUnit> },
    /// A rejection or failure. `id` is absent for pre-acceptance errors.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<UnitId>,
        message: String,
    },
    ProcessStart,
    ProcessEnd,
    Progress { id: UnitId, progress: u8 },
    /// Fired once per batch when every unit has settled.
    Done { results: Vec<UnitSummary> },
}

impl UploaderEvent {
    pub fn error(message: impl Into<String>) -> Self {
        UploaderEvent::Error {
            id: None,
            message: message.into(),
        }
    }

    pub fn unit_error(id: UnitId, message: impl Into<String>) -> Self {
        UploaderEvent::Error {
            id: Some(id),
            message: message.into(),
        }
    }

    /// Fully qualified event name, e.g. `pixelframe-uploader-progress`.
    pub fn name(&self) -> &'static str {
        match self {
            UploaderEvent::Pick { .. } => "pixelframe-uploader-pick",
            UploaderEvent::Error { .. } => "pixelframe-uploader-error",
            UploaderEvent::ProcessStart => "pixelframe-uploader-process-start",
            UploaderEvent::ProcessEnd => "pixelframe-uploader-process-end",
            UploaderEvent::Progress { .. } => "pixelframe-uploader-progress",
            UploaderEvent::Done { .. } => "pixelframe-uploader-done",
        }
    }

    /// Every event name this uploader can emit.
    pub fn supported_events() -> Vec<String> {
        ["pick", "error", "process-start", "process-end", "progress", "done"]
            .iter()
            .map(|suffix| format!("{}-{}", EVENT_PREFIX, suffix))
            .collect()
    }
}

/// Receiver of uploader events.
///
/// Emission is fire-and-forget: a sink must never block the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: UploaderEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    #[test]
    fn supported_events_match_names() {
        let events = UploaderEvent::supported_events();
        assert_eq!(events.len(), 6);
        assert!(events.contains(&UploaderEvent::ProcessStart.name().to_string()));
        assert!(events.contains(&UploaderEvent::error("x").name().to_string()));
    }

    #[test]
    fn serializes_with_detail_payload() {
        let event = UploaderEvent::Progress {
            id: UnitId::from("unit-1"),
            progress: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["detail"]["id"], "unit-1");
        assert_eq!(json["detail"]["progress"], 42);

        let json = serde_json::to_value(UploaderEvent::ProcessEnd).unwrap();
        assert_eq!(json["event"], "process-end");
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn pre_acceptance_error_has_no_id() {
        let json = serde_json::to_value(UploaderEvent::error("file type not allowed.")).unwrap();
        assert!(json["detail"].get("id").is_none());
        assert_eq!(json["detail"]["message"], "file type not allowed.");
    }

    #[test]
    fn done_round_trips() {
        let event = UploaderEvent::Done {
            results: vec![UnitSummary {
                id: UnitId::from("unit-1"),
                kind: MediaKind::Image,
                result: None,
                error: Some("denied".to_string()),
            }],
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: UploaderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
