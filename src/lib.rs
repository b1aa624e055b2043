//! Pitch slot scheduling for competition teams across parallel review panels.
//!
//! The [`schedule`] module is the engine: slot generation, the automatic
//! planner, the editable grid and the collision scan. The other modules load
//! rosters, persist and export grids, and expose the CLI and HTTP surfaces.

pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod parser;
pub mod pool;
pub mod schedule;
pub mod store;
pub mod web;
pub mod workspace;

pub use error::{Result, SchedulerError};
pub use workspace::{EditReport, Workspace};
