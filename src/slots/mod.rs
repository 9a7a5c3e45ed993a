//! Pure slot management logic.
//!
//! This module computes which slot ranges move and where, separately from
//! executing the moves.
//!
//! ## Module Structure
//!
//! - [`range`]: The [`SlotRange`] type and slot-space constant
//! - [`planner`]: Reshard planning with [`ReshardPlan`] and [`SlotMigrationStep`]

pub mod planner;
pub mod range;

// Re-export commonly used types
pub use planner::{MigrationEndpoint, ReshardPlan, SlotMigrationStep, plan_reshard};
pub use range::{SlotRange, TOTAL_SLOTS, total_slots};
