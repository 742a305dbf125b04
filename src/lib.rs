//! laneq - lane-scoped task queue and plan orchestrator
//!
//! Agent tasks are admitted into named lanes, each with its own concurrency
//! limit, and dispatched by priority once their dependencies complete.
//! Multi-step plans run on top, with keyword-classified retries and
//! critical-step abort.

pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod id;
pub mod orchestrator;
pub mod queue;

pub use error::{LaneError, Result};
