//! # Orchestration
//!
//! Composes the retry executor, status waiter and lifecycle tables into the
//! entry point CRUD handlers call.
//!
//! ## Core Components
//!
//! - **Step**: a remote call plus an optional wait, built from the lifecycle tables
//! - **Entity**: caller-owned local view with the step journal
//! - **Orchestrator**: runs (or resumes) a step sequence strictly in order

pub mod entity;
pub mod orchestrator;
pub mod step;

pub use entity::{Entity, StepOutcome, StepRecord};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use step::Step;
