use provider_lifecycle::events::{EventPublisher, LifecycleEvent};
use provider_lifecycle::orchestration::{Orchestrator, OrchestratorSettings, Step};
use provider_lifecycle::polling::{StatusWaiter, WaitSpec, WaitTiming};
use provider_lifecycle::remote::EntityKind;
use provider_lifecycle::resilience::{
    BackoffShape, RetryExecutor, RetryPolicy, StandardErrorClassifier,
};
use provider_lifecycle::resource::ResourceHandler;
use provider_lifecycle::state_machine::{EntityState, LifecycleAction};
use provider_lifecycle::test_helpers::MockRemote;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Retry policy with a fixed delay, suitable for fast tests
pub fn fast_policy(budget: Duration, delay: Duration) -> RetryPolicy {
    RetryPolicy::new(
        Arc::new(StandardErrorClassifier::new()),
        budget,
        BackoffShape::fixed(delay),
    )
}

pub fn fast_executor() -> RetryExecutor {
    RetryExecutor::new(fast_policy(Duration::from_secs(1), Duration::from_millis(1)))
}

pub fn fast_waiter() -> StatusWaiter {
    StatusWaiter::new(fast_executor())
}

pub fn fast_timing() -> WaitTiming {
    WaitTiming::new(Duration::from_millis(5), Duration::from_secs(2))
}

pub fn wait_spec(target: &[EntityState], failure: &[EntityState]) -> WaitSpec {
    WaitSpec::new(target, failure, fast_timing()).expect("valid wait spec")
}

/// Mock remote, orchestrator and event publisher wired together
pub struct Harness {
    pub remote: Arc<MockRemote>,
    pub orchestrator: Arc<Orchestrator>,
    pub events: EventPublisher,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(OrchestratorSettings {
            retry: fast_policy(Duration::from_secs(1), Duration::from_millis(10)),
            operation_timeout: None,
        })
    }

    pub fn with_settings(settings: OrchestratorSettings) -> Self {
        let remote = Arc::new(MockRemote::new());
        let events = EventPublisher::new(256);
        let orchestrator = Arc::new(Orchestrator::new(
            remote.clone(),
            settings,
            events.clone(),
        ));
        Self {
            remote,
            orchestrator,
            events,
        }
    }

    pub fn handler(&self, kind: EntityKind) -> ResourceHandler {
        ResourceHandler::new(kind, self.orchestrator.clone(), fast_timing())
    }
}

/// configure, precheck (checking -> checkPassed | checkFailed), start (running -> finished | runFailed)
pub fn configure_precheck_start() -> Vec<Step> {
    vec![
        Step::new("configure", LifecycleAction::Configure),
        Step::new("precheck", LifecycleAction::Precheck).with_wait(wait_spec(
            &[EntityState::CheckPassed],
            &[EntityState::CheckFailed],
        )),
        Step::new("start", LifecycleAction::Start).with_wait(wait_spec(
            &[EntityState::Finished],
            &[EntityState::RunFailed],
        )),
    ]
}

/// Every event currently buffered for `receiver`
pub fn drain_events(receiver: &mut broadcast::Receiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
