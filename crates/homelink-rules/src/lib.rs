//! Automation rule evaluation for HomeLink.
//!
//! The [`evaluator`] sweeps stored rules against current device state and
//! dispatches relay commands when conditions match; the [`scheduler`] runs
//! those sweeps on fixed cadences.

pub mod evaluator;
pub mod scheduler;

pub use evaluator::{FiredRule, RuleEvaluator};
pub use scheduler::{spawn_recurring, JobHandle};
