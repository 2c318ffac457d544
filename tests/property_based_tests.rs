mod common;

use common::strategies::*;
use proptest::prelude::*;
use provider_lifecycle::error::LifecycleError;
use provider_lifecycle::polling::{PollDisposition, WaitSpec, WaitTiming};
use provider_lifecycle::remote::{EntityKind, IdempotencyToken, RemoteError};
use provider_lifecycle::resilience::{
    BackoffShape, ErrorClassifier, RetryExecutor, RetryPolicy, StandardErrorClassifier,
};
use provider_lifecycle::state_machine::{definition, LifecycleAction};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn kind_strategy() -> impl Strategy<Value = EntityKind> {
    prop::sample::select(vec![
        EntityKind::MigrationTask,
        EntityKind::Cluster,
        EntityKind::InstanceGroup,
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// An always-failing call is retried exactly when its error classifies as retryable
    #[test]
    fn retries_happen_only_for_retryable_errors(error in remote_error_strategy()) {
        let classifier = Arc::new(StandardErrorClassifier::new());
        let retryable = classifier.classify(&error).is_retryable();
        let executor = RetryExecutor::new(RetryPolicy::new(
            classifier,
            Duration::from_millis(20),
            BackoffShape::fixed(Duration::from_millis(2)),
        ));

        let result = tokio_test::block_on(executor.execute("always_fails", |_| {
            let error = error.clone();
            async move { Err::<(), RemoteError>(error) }
        }));

        match result {
            Err(LifecycleError::PermanentRemote { attempts, .. }) => {
                prop_assert!(!retryable);
                prop_assert_eq!(attempts, 1);
            }
            Err(LifecycleError::RetryTimeout { attempts, last_error, .. }) => {
                prop_assert!(retryable);
                prop_assert!(attempts > 1);
                prop_assert_eq!(last_error, Some(error));
            }
            other => prop_assert!(false, "unexpected result {:?}", other),
        }
    }

    /// Server-provided retry hints never survive a permanent classification
    #[test]
    fn retry_after_only_accompanies_retryable_errors(
        error in remote_error_strategy(),
        hint_ms in 1u64..10_000,
    ) {
        let error = error.with_retry_after(Duration::from_millis(hint_ms));
        let classification = StandardErrorClassifier::new().classify(&error);
        if classification.is_retryable() {
            prop_assert_eq!(classification.retry_after, Some(Duration::from_millis(hint_ms)));
        } else {
            prop_assert_eq!(classification.retry_after, None);
        }
    }

    /// A wait spec exists only for a non-empty target disjoint from its failure set
    #[test]
    fn wait_spec_requires_disjoint_nonempty_target((target, failure) in state_sets_strategy()) {
        let timing = WaitTiming::new(Duration::from_millis(10), Duration::from_secs(1));
        let valid = !target.is_empty() && !target.iter().any(|state| failure.contains(state));
        let spec = WaitSpec::new(target.clone(), failure.clone(), timing);

        prop_assert_eq!(spec.is_ok(), valid);
        if let Ok(spec) = spec {
            for state in failure {
                prop_assert_eq!(spec.disposition(Some(state)), PollDisposition::Failed(state));
            }
        }
    }

    /// Backoff never exceeds its cap and never shrinks between attempts without jitter
    #[test]
    fn exponential_backoff_is_capped_and_monotonic(
        base_ms in 1u64..1_000,
        multiplier in 1.0f64..4.0,
        max_ms in 1u64..60_000,
        attempt in 1u32..64,
    ) {
        let max = Duration::from_millis(max_ms);
        let backoff = BackoffShape::exponential(Duration::from_millis(base_ms), multiplier, max);

        let current = backoff.delay_for_attempt(attempt);
        let next = backoff.delay_for_attempt(attempt + 1);
        prop_assert!(current <= max);
        prop_assert!(next >= current);

        let jittered = backoff.with_jitter(0.5).delay_for_attempt(attempt);
        prop_assert!(jittered <= max);
    }

    /// Table transitions never list a state as both target and failure
    #[test]
    fn table_waits_are_always_constructible(kind in kind_strategy()) {
        let timing = WaitTiming::new(Duration::from_millis(10), Duration::from_secs(1));
        for action in LifecycleAction::ALL {
            if let Some(transition) = definition(kind).transition(action) {
                prop_assert!(WaitSpec::for_transition(transition, timing).is_ok());
            }
        }
    }

    /// Tokens are stable per (operation, step) and distinct across steps
    #[test]
    fn tokens_are_stable_per_step(index in 0usize..32, other in 0usize..32, name in "[a-z_]{1,16}") {
        let operation_id = Uuid::new_v4();
        let token = IdempotencyToken::derive(operation_id, index, &name);

        prop_assert_eq!(token, IdempotencyToken::derive(operation_id, index, &name));
        if other != index {
            prop_assert_ne!(token, IdempotencyToken::derive(operation_id, other, &name));
        }
        prop_assert_ne!(token, IdempotencyToken::derive(Uuid::new_v4(), index, &name));
    }
}
