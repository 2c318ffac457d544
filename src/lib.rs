#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Provider Lifecycle
//!
//! Asynchronous remote-operation orchestrator for cloud infrastructure providers.
//!
//! ## Overview
//!
//! Cloud control planes accept a request and then take minutes to act on it.
//! Provisioning a migration task, a cluster or an instance group means issuing
//! a fixed sequence of side-effecting calls and confirming, by polling, that
//! the remote reached the expected state before issuing the next one. This
//! crate implements that pattern once, driven by per-kind lifecycle tables.
//!
//! ## Module Organization
//!
//! - [`resilience`] - error classification, backoff and the bounded retry executor
//! - [`polling`] - wait specs and the status waiter
//! - [`state_machine`] - lifecycle states, actions and per-kind transition tables
//! - [`orchestration`] - steps, the entity journal and the orchestrator
//! - [`resource`] - CRUD handlers built on the orchestrator
//! - [`remote`] - the control-plane API trait and its request and error types
//! - [`config`] - layered configuration
//! - [`events`] - lifecycle event broadcasting
//! - [`logging`] - structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use provider_lifecycle::config::LifecycleConfig;
//! use provider_lifecycle::events::EventPublisher;
//! use provider_lifecycle::orchestration::{Orchestrator, OrchestratorSettings};
//! use provider_lifecycle::remote::EntityKind;
//! use provider_lifecycle::resource::ResourceHandler;
//! use provider_lifecycle::test_helpers::MockRemote;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LifecycleConfig::default();
//! let orchestrator = Arc::new(Orchestrator::new(
//!     Arc::new(MockRemote::new()),
//!     OrchestratorSettings::from_config(&config),
//!     EventPublisher::new(config.events.capacity),
//! ));
//!
//! let tasks = ResourceHandler::from_config(EntityKind::MigrationTask, orchestrator, &config);
//! let id = tasks.create(json!({"source": "db-a", "target": "db-b"})).await?;
//! tasks.delete(&id).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod orchestration;
pub mod polling;
pub mod remote;
pub mod resilience;
pub mod resource;
pub mod state_machine;
pub mod test_helpers;

pub use config::{ConfigManager, ConfigurationError, LifecycleConfig};
pub use error::{LifecycleError, Result};
pub use events::{EventPublisher, LifecycleEvent};
pub use orchestration::{Entity, Orchestrator, OrchestratorSettings, Step, StepOutcome, StepRecord};
pub use polling::{StatusWaiter, WaitOutcome, WaitSpec, WaitTiming};
pub use remote::{EntityId, EntityKind, IdempotencyToken, RemoteApi, RemoteError};
pub use resilience::{BackoffShape, RetryExecutor, RetryPolicy, StandardErrorClassifier};
pub use resource::ResourceHandler;
pub use state_machine::{EntityState, LifecycleAction};
