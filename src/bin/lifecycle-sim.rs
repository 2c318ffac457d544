//! # Lifecycle Simulator
//!
//! Drives several migration tasks concurrently through create and delete
//! against the in-memory remote and prints each journal as JSON.
//!
//! Usage: `lifecycle-sim [task-count]`

use anyhow::Context;
use futures::future::join_all;
use provider_lifecycle::config::ConfigManager;
use provider_lifecycle::events::EventPublisher;
use provider_lifecycle::logging::init_structured_logging;
use provider_lifecycle::orchestration::{Entity, Orchestrator, OrchestratorSettings};
use provider_lifecycle::remote::EntityKind;
use provider_lifecycle::resource::ResourceHandler;
use provider_lifecycle::test_helpers::MockRemote;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_TASK_COUNT: usize = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let task_count = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<usize>()
            .with_context(|| format!("task count must be a number, got {arg:?}"))?,
        None => DEFAULT_TASK_COUNT,
    };

    let manager = ConfigManager::load().context("loading lifecycle configuration")?;
    let config = manager.config();
    init_structured_logging(&config.logging);

    let remote = Arc::new(MockRemote::new());
    remote.set_latency(Duration::from_millis(10));

    let events = EventPublisher::new(config.events.capacity);
    let orchestrator = Arc::new(Orchestrator::new(
        remote.clone(),
        OrchestratorSettings::from_config(config),
        events,
    ));
    let handler = ResourceHandler::from_config(EntityKind::MigrationTask, orchestrator, config);

    info!(
        task_count,
        environment = manager.environment(),
        "🚀 Starting lifecycle simulation"
    );

    let runs = (0..task_count).map(|n| {
        let handler = handler.clone();
        async move {
            let mut created = Entity::new(EntityKind::MigrationTask);
            let spec = json!({"source": format!("db-{n}-a"), "target": format!("db-{n}-b")});
            handler.apply_create(&mut created, spec).await?;

            let id = created.id.clone().context("create returned no entity id")?;
            let mut deleted = Entity::existing(EntityKind::MigrationTask, id, None);
            handler.apply_delete(&mut deleted).await?;

            anyhow::Ok((created, deleted))
        }
    });

    let mut failures = 0;
    for result in join_all(runs).await {
        match result {
            Ok((created, deleted)) => {
                println!("{}", serde_json::to_string_pretty(&created.journal)?);
                println!("{}", serde_json::to_string_pretty(&deleted.journal)?);
            }
            Err(e) => {
                failures += 1;
                error!(error = %e, "Simulated task failed");
            }
        }
    }

    info!(
        task_count,
        failures,
        remote_calls = remote.calls().len(),
        remaining_entities = remote.entity_count(),
        "✅ Lifecycle simulation complete"
    );

    anyhow::ensure!(failures == 0, "{failures} simulated task(s) failed");
    Ok(())
}
