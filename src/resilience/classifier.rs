//! # Remote Error Classification
//!
//! Decides whether an error returned by the control plane is worth retrying.
//!
//! Classification looks at the machine-readable code first, then at the HTTP
//! status. Anything that cannot be classified is permanent: retrying an error
//! we do not understand would hide real failures behind a retry loop.

use crate::remote::RemoteError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Primary error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Request throttled by the remote
    RateLimit,
    /// Remote-side fault
    Internal,
    /// Remote temporarily unreachable or overloaded
    Unavailable,
    /// Entity does not exist
    NotFound,
    /// Malformed or semantically invalid request
    InvalidRequest,
    /// Entity is in a state that does not permit the request
    Conflict,
    /// Credentials or permissions problem
    Unauthorized,
    /// Unrecognized code, or no code at all
    Unknown,
}

impl ErrorCategory {
    pub fn retryability(&self) -> Retryability {
        match self {
            Self::RateLimit | Self::Internal | Self::Unavailable => Retryability::Retryable,
            _ => Retryability::Permanent,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::RateLimit => write!(f, "Rate Limit"),
            ErrorCategory::Internal => write!(f, "Internal"),
            ErrorCategory::Unavailable => write!(f, "Unavailable"),
            ErrorCategory::NotFound => write!(f, "Not Found"),
            ErrorCategory::InvalidRequest => write!(f, "Invalid Request"),
            ErrorCategory::Conflict => write!(f, "Conflict"),
            ErrorCategory::Unauthorized => write!(f, "Unauthorized"),
            ErrorCategory::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retryability {
    Retryable,
    Permanent,
}

/// Result of error classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassification {
    pub category: ErrorCategory,
    pub retryability: Retryability,
    /// Server-specified minimum delay, carried only for retryable errors
    pub retry_after: Option<Duration>,
}

impl ErrorClassification {
    pub fn is_retryable(&self) -> bool {
        self.retryability == Retryability::Retryable
    }
}

/// Trait for error classification strategies
pub trait ErrorClassifier: Send + Sync {
    /// Classify a remote error
    fn classify(&self, error: &RemoteError) -> ErrorClassification;

    /// Get the classifier name for identification
    fn classifier_name(&self) -> &'static str;
}

const RATE_LIMIT_CODES: &[&str] = &[
    "requestlimitexceeded",
    "throttling",
    "throttlingexception",
    "toomanyrequests",
    "limitexceeded",
];
const INTERNAL_CODES: &[&str] = &["internalerror", "internalservererror", "internalfailure"];
const UNAVAILABLE_CODES: &[&str] = &[
    "serviceunavailable",
    "requesttimeout",
    "networkerror",
    "gatewaytimeout",
];
const NOT_FOUND_CODES: &[&str] = &["resourcenotfound", "notfound"];
const INVALID_REQUEST_CODES: &[&str] = &[
    "invalidparameter",
    "invalidparametervalue",
    "missingparameter",
    "badrequest",
    "unsupportedoperation",
];
const CONFLICT_CODES: &[&str] = &[
    "resourceinuse",
    "conflict",
    "operationdenied",
    "failedoperation",
    "idempotencyconflict",
];
const UNAUTHORIZED_CODES: &[&str] = &[
    "authfailure",
    "unauthorizedoperation",
    "forbidden",
    "accessdenied",
];

/// Standard classifier covering the common control-plane error vocabulary
#[derive(Debug, Clone, Default)]
pub struct StandardErrorClassifier {
    /// Additional code families (lowercase) to treat as transient
    extra_retryable_codes: HashSet<String>,
}

impl StandardErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier that also retries the given code families
    pub fn with_retryable_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extra_retryable_codes: codes
                .into_iter()
                .map(|code| code.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    fn category_for_code(&self, family: &str) -> Option<ErrorCategory> {
        let family = family.to_ascii_lowercase();
        let lookup = |codes: &[&str]| codes.contains(&family.as_str());

        if self.extra_retryable_codes.contains(&family) {
            // Operator-declared transient codes are treated like remote faults
            Some(ErrorCategory::Internal)
        } else if lookup(RATE_LIMIT_CODES) {
            Some(ErrorCategory::RateLimit)
        } else if lookup(INTERNAL_CODES) {
            Some(ErrorCategory::Internal)
        } else if lookup(UNAVAILABLE_CODES) {
            Some(ErrorCategory::Unavailable)
        } else if lookup(NOT_FOUND_CODES) {
            Some(ErrorCategory::NotFound)
        } else if lookup(INVALID_REQUEST_CODES) {
            Some(ErrorCategory::InvalidRequest)
        } else if lookup(CONFLICT_CODES) {
            Some(ErrorCategory::Conflict)
        } else if lookup(UNAUTHORIZED_CODES) {
            Some(ErrorCategory::Unauthorized)
        } else {
            None
        }
    }

    fn category_for_status(status: u16) -> ErrorCategory {
        match status {
            429 => ErrorCategory::RateLimit,
            500 => ErrorCategory::Internal,
            502..=504 => ErrorCategory::Unavailable,
            404 => ErrorCategory::NotFound,
            409 => ErrorCategory::Conflict,
            401 | 403 => ErrorCategory::Unauthorized,
            400 | 405..=422 => ErrorCategory::InvalidRequest,
            _ => ErrorCategory::Unknown,
        }
    }
}

impl ErrorClassifier for StandardErrorClassifier {
    fn classify(&self, error: &RemoteError) -> ErrorClassification {
        let category = error
            .code_family()
            .and_then(|family| self.category_for_code(family))
            .or_else(|| error.http_status.map(Self::category_for_status))
            .unwrap_or(ErrorCategory::Unknown);

        let retryability = category.retryability();
        ErrorClassification {
            category,
            retryability,
            retry_after: match retryability {
                Retryability::Retryable => error.retry_after,
                Retryability::Permanent => None,
            },
        }
    }

    fn classifier_name(&self) -> &'static str {
        "StandardErrorClassifier"
    }
}
