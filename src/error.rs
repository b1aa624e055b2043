//! Error taxonomy for the panel scheduler.
//!
//! Core grid and planning operations are synchronous; collaborator failures
//! (stores, roster files) are converted into `PersistenceUnavailable` or
//! `Roster` at the call site so local state is never left half-mutated.

use thiserror::Error;

use crate::schedule::types::AssignmentKey;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid schedule window: {reason}")]
    InvalidScheduleWindow { reason: String },

    #[error("Roster is empty, nothing to place")]
    EmptyRoster,

    #[error("Cell (slot {slot}, panel {panel}) is outside the {slots}x{panels} grid")]
    OutOfRangeCell {
        slot: usize,
        panel: usize,
        slots: usize,
        panels: usize,
    },

    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Team {0} is not in the roster")]
    UnknownTeam(AssignmentKey),

    #[error("Team {0} is already placed in the grid")]
    TeamAlreadyPlaced(AssignmentKey),

    #[error("Failed to read roster: {0}")]
    Roster(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SchedulerError {
    pub fn invalid_window(reason: impl Into<String>) -> Self {
        SchedulerError::InvalidScheduleWindow {
            reason: reason.into(),
        }
    }

    /// Warnings are reported to the organizer but leave the grid usable.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            SchedulerError::EmptyRoster | SchedulerError::PersistenceUnavailable(_)
        )
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(err: std::io::Error) -> Self {
        SchedulerError::PersistenceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::PersistenceUnavailable(err.to_string())
    }
}

impl From<csv::Error> for SchedulerError {
    fn from(err: csv::Error) -> Self {
        SchedulerError::Roster(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
