use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use super::media::{MediaKind, PickedUnit};

/// Highest progress a unit may report while its upload is still in flight.
/// 100 is reserved for terminal states.
pub const MAX_IN_FLIGHT_PROGRESS: u8 = 95;

/// Opaque unit identifier (`unit-{uuid}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn generate() -> Self {
        UnitId(format!("unit-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitId {
    fn from(value: &str) -> Self {
        UnitId(value.to_string())
    }
}

impl From<String> for UnitId {
    fn from(value: String) -> Self {
        UnitId(value)
    }
}

impl Display for UnitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Upload lifecycle of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Pending,
    Uploading,
    Registering,
    Done,
    Failed,
}

impl UnitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Done | UnitState::Failed)
    }
}

/// The authoritative record for one accepted file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub thumbnail: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub state: UnitState,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Unit {
    pub fn from_picked(picked: &PickedUnit) -> Self {
        Self {
            id: picked.id.clone(),
            kind: picked.kind,
            thumbnail: picked.thumbnail.clone(),
            width: picked.width,
            height: picked.height,
            duration: picked.duration,
            state: UnitState::Pending,
            progress: 0,
            result: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to a non-terminal step. Ignored once the unit has settled.
    pub fn enter(&mut self, state: UnitState) {
        if !self.is_terminal() && !state.is_terminal() {
            self.state = state;
        }
    }

    /// Record in-flight progress.
    ///
    /// The value is capped at [`MAX_IN_FLIGHT_PROGRESS`] and never moves
    /// backwards. Returns the new progress when it changed.
    pub fn advance_progress(&mut self, progress: u8) -> Option<u8> {
        if self.is_terminal() {
            return None;
        }
        let capped = progress.min(MAX_IN_FLIGHT_PROGRESS);
        if capped <= self.progress {
            return None;
        }
        self.progress = capped;
        Some(capped)
    }

    /// Settle successfully. Returns false if the unit had already settled.
    pub fn complete(&mut self, result: JsonValue) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = UnitState::Done;
        self.progress = 100;
        self.result = Some(result);
        true
    }

    /// Settle with a failure. Returns false if the unit had already settled.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = UnitState::Failed;
        self.progress = 100;
        self.error = Some(message.into());
        true
    }

    pub fn summary(&self) -> UnitSummary {
        UnitSummary {
            id: self.id.clone(),
            kind: self.kind,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// Per-unit entry of the aggregate `done` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSummary {
    pub id: UnitId,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ordered unit table for one file selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub order: Vec<UnitId>,
    pub units: HashMap<UnitId, Unit>,
}

impl Batch {
    pub fn from_picked(picked: &[PickedUnit]) -> Self {
        let order = picked.iter().map(|p| p.id.clone()).collect();
        let units = picked
            .iter()
            .map(|p| (p.id.clone(), Unit::from_picked(p)))
            .collect();
        Self { order, units }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn get_mut(&mut self, id: &UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    /// True when every unit in `order` has reached progress 100.
    pub fn is_settled(&self) -> bool {
        self.order
            .iter()
            .all(|id| self.units.get(id).is_some_and(|u| u.progress == 100))
    }

    /// Summaries in original selection order.
    pub fn summaries(&self) -> Vec<UnitSummary> {
        self.order
            .iter()
            .filter_map(|id| self.units.get(id))
            .map(Unit::summary)
            .collect()
    }
}
