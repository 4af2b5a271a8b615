//! Domain models for the uploader: raw picked files, probe results and the
//! per-file unit records tracked through an upload batch.

pub mod media;
pub mod unit;

pub use media::{AcceptedFile, MediaKind, PickedUnit, ProbedFile, RawFile};
pub use unit::{Batch, Unit, UnitId, UnitState, UnitSummary, MAX_IN_FLIGHT_PROGRESS};
