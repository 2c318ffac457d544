use proptest::prelude::*;
use provider_lifecycle::remote::RemoteError;
use provider_lifecycle::state_machine::EntityState;

/// Error codes the control plane is known to return, plus a few it is not
pub fn error_code_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        Just("InternalError".to_string()),
        Just("InternalError.DbTimeout".to_string()),
        Just("RequestLimitExceeded".to_string()),
        Just("Throttling".to_string()),
        Just("ServiceUnavailable".to_string()),
        Just("InvalidParameter".to_string()),
        Just("InvalidParameterValue.Name".to_string()),
        Just("ResourceNotFound".to_string()),
        Just("ResourceInUse".to_string()),
        Just("AuthFailure".to_string()),
        "[A-Z][a-zA-Z]{2,20}",
    ])
}

pub fn http_status_strategy() -> impl Strategy<Value = Option<u16>> {
    prop::option::of(prop_oneof![
        Just(400u16),
        Just(401),
        Just(404),
        Just(409),
        Just(429),
        Just(500),
        Just(502),
        Just(503),
        Just(504),
        200u16..600,
    ])
}

/// Arbitrary remote errors
pub fn remote_error_strategy() -> impl Strategy<Value = RemoteError> {
    (error_code_strategy(), http_status_strategy(), "[a-z ]{1,30}").prop_map(
        |(code, status, message)| {
            let mut error = match code {
                Some(code) => RemoteError::new(code, message),
                None => RemoteError::uncoded(message),
            };
            error.http_status = status;
            error
        },
    )
}

pub fn entity_state_strategy() -> impl Strategy<Value = EntityState> {
    prop::sample::select(EntityState::ALL.to_vec())
}

/// Two sets of states drawn independently, so they may overlap
pub fn state_sets_strategy() -> impl Strategy<Value = (Vec<EntityState>, Vec<EntityState>)> {
    (
        prop::collection::vec(entity_state_strategy(), 0..4),
        prop::collection::vec(entity_state_strategy(), 0..4),
    )
}
