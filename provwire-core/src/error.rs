use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Failure raised while marshaling or unmarshaling property values.
///
/// Unknown values are not errors; they travel through the `known` flag and
/// the unknown-key set. These variants abort the whole operation and no
/// partial result is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarshalError {
    #[error("internal invariant violated: {0}")]
    InvariantViolated(String),

    #[error("cannot resolve resource reference {urn}: {source}")]
    Resolve {
        urn: String,
        #[source]
        source: ResolveError,
    },
}

impl MarshalError {
    pub fn invariant(message: impl Into<String>) -> Self {
        MarshalError::InvariantViolated(message.into())
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, MarshalError::InvariantViolated(_))
    }
}

/// Failure reported by a URN resolver.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("legacy URN format is not permitted")]
    LegacyUrn,

    #[error("malformed URN")]
    MalformedUrn,

    #[error("no resource is registered under this URN")]
    UnknownResource,

    #[error("no resolver is available")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    Unimplemented,
    Canceled,
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Unimplemented => "unimplemented",
            ErrorCode::Canceled => "canceled",
            ErrorCode::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

/// Failure of a single provider request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        RpcError {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: Value) -> Self {
        RpcError {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unimplemented, message)
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Canceled, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

impl From<MarshalError> for RpcError {
    fn from(err: MarshalError) -> Self {
        match err {
            MarshalError::InvariantViolated(_) => RpcError::internal(err.to_string()),
            MarshalError::Resolve { .. } => RpcError::bad_request(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::bad_request(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RpcError::new(ErrorCode::BadRequest, "Invalid input");
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(err.message, "Invalid input");
        assert_eq!(err.data, None);
    }

    #[test]
    fn test_error_with_data() {
        let data = serde_json::json!({"property": "size"});
        let err = RpcError::with_data(ErrorCode::Internal, "Provider failure", data.clone());
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.data, Some(data));
    }

    #[test]
    fn test_convenience_constructors() {
        assert_eq!(RpcError::bad_request("x").code, ErrorCode::BadRequest);
        assert_eq!(RpcError::not_found("x").code, ErrorCode::NotFound);
        assert_eq!(RpcError::unimplemented("x").code, ErrorCode::Unimplemented);
        assert_eq!(RpcError::canceled("x").code, ErrorCode::Canceled);
        assert_eq!(RpcError::internal("x").code, ErrorCode::Internal);
    }

    #[test]
    fn test_error_serialization() {
        let err = RpcError::new(ErrorCode::NotFound, "Resource not found");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"not_found\""));
        assert!(!json.contains("\"data\""));
        let deserialized: RpcError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_invariant_violation_becomes_internal() {
        let err: RpcError = MarshalError::invariant("computed inside computed").into();
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(err.message.starts_with("internal invariant violated"));
        assert!(err.message.contains("computed inside computed"));
    }

    #[test]
    fn test_resolve_failure_becomes_bad_request() {
        let err: RpcError = MarshalError::Resolve {
            urn: "urn:lumi:old::mod::type::name".to_string(),
            source: ResolveError::LegacyUrn,
        }
        .into();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert!(err.message.contains("legacy URN"));
    }

    #[test]
    fn test_error_display() {
        let display = format!("{}", RpcError::internal("Something went wrong"));
        assert!(display.contains("Internal"));
        assert!(display.contains("Something went wrong"));
    }
}
