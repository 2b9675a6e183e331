use crate::endpoint::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx;
use std::fmt;
use thiserror::Error;

/// One reason a request body failed schema validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Violation {
    MissingField { field: String },
    WrongType { field: String, expected: FieldType },
    NotAllowed { field: String, allowed: Vec<Value> },
    UnparsableBody,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingField { field } => {
                write!(f, "field `{field}` is required")
            }
            Violation::WrongType { field, expected } => {
                write!(f, "field `{field}` must be of type {expected}")
            }
            Violation::NotAllowed { field, allowed } => {
                write!(
                    f,
                    "field `{field}` must be one of {}",
                    Value::Array(allowed.clone())
                )
            }
            Violation::UnparsableBody => f.write_str("request body is not valid JSON"),
        }
    }
}

/// Error body returned by every surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorShape {
    pub error: String,
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<String>>,
}

#[derive(Error, Debug)]
pub enum MockError {
    #[error("No matching endpoint.")]
    NoMatchingEndpoint,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{}", join_violations(.violations))]
    ValidationFailed { violations: Vec<Violation> },

    #[error("Malformed endpoint definition: {reason}")]
    MalformedDefinition { reason: String },

    #[error("Endpoint not found: {id}")]
    EndpointNotFound { id: i64 },

    #[error("{reason}")]
    UpstreamUnreachable { reason: String },

    #[error("Database error: {reason}")]
    DatabaseError { reason: String },

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("Internal server error: {reason}")]
    InternalError { reason: String },
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl MockError {
    pub fn to_error_shape(&self) -> ErrorShape {
        let violations = match self {
            MockError::ValidationFailed { violations } => {
                Some(violations.iter().map(|v| v.to_string()).collect())
            }
            _ => None,
        };
        ErrorShape {
            error: self.to_string(),
            error_type: self.error_type().to_string(),
            violations,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            MockError::NoMatchingEndpoint => "NoMatchingEndpoint",
            MockError::Unauthorized => "Unauthorized",
            MockError::ValidationFailed { .. } => "ValidationFailed",
            MockError::MalformedDefinition { .. } => "MalformedDefinition",
            MockError::EndpointNotFound { .. } => "EndpointNotFound",
            MockError::UpstreamUnreachable { .. } => "UpstreamUnreachable",
            MockError::DatabaseError { .. } => "ServiceError",
            MockError::SqlxError(_) => "ServiceError",
            MockError::ConfigError { .. } => "ServiceError",
            MockError::InternalError { .. } => "ServiceError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            MockError::NoMatchingEndpoint => 404,
            MockError::Unauthorized => 401,
            MockError::ValidationFailed { .. } => 400,
            MockError::MalformedDefinition { .. } => 400,
            MockError::EndpointNotFound { .. } => 404,
            MockError::UpstreamUnreachable { .. } => 500,
            MockError::DatabaseError { .. } => 500,
            MockError::SqlxError(_) => 500,
            MockError::ConfigError { .. } => 500,
            MockError::InternalError { .. } => 500,
        }
    }
}
