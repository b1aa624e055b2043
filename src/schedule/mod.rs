pub mod types;
pub mod slot_utils;
pub mod random;
pub mod grid;
pub mod collision;
pub mod planner;

pub use types::{Assignment, AssignmentKey, CellRef, DistributionMode, ScheduleConfig, Team, TimeSlot};
pub use slot_utils::{calculate_time_slots, generate_time_slots, label_for_row};
pub use grid::{Grid, InsertOutcome};
pub use collision::detect_collisions;
pub use planner::{plan, plan_with_rng, PlanOutcome, PlanSummary, PriorityRule};
