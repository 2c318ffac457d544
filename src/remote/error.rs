use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Error returned by a remote control-plane call.
///
/// Carries whatever machine-readable information the remote supplied; the
/// classifier decides from these fields whether the call may be retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    /// Machine-readable error code, e.g. `InternalError` or `ResourceNotFound.Task`
    pub code: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Transport status, when the error came from an HTTP response
    pub http_status: Option<u16>,
    /// Remote request id for support tickets
    pub request_id: Option<String>,
    /// Server-specified minimum delay before retrying
    pub retry_after: Option<Duration>,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            http_status: None,
            request_id: None,
            retry_after: None,
        }
    }

    /// An error with no code at all (transport failures, malformed responses)
    pub fn uncoded(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            http_status: None,
            request_id: None,
            retry_after: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("InternalError", message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RequestLimitExceeded", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("ResourceNotFound", message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new("InvalidParameter", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("ResourceInUse", message)
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Code family: the part before the first `.` (`InternalError.DbTimeout` → `InternalError`)
    pub fn code_family(&self) -> Option<&str> {
        self.code
            .as_deref()
            .map(|code| code.split('.').next().unwrap_or(code))
    }

    /// Whether the remote reported that the entity does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code_family().map(str::to_ascii_lowercase).as_deref(),
            Some("resourcenotfound") | Some("notfound")
        ) || (self.code.is_none() && self.http_status == Some(404))
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request id: {request_id})")?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
