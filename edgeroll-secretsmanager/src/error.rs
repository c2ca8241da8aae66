//! Secrets Manager wire error types and formatting

use serde::Serialize;
use thiserror::Error;

use crate::storage::SecretsManagerError;

/// Secrets Manager error codes returned by the emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ResourceNotFound,
    ResourceExists,
    InvalidParameter,
    InvalidRequest,
    Validation,
    UnknownOperation,
    InternalService,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceNotFound => "ResourceNotFoundException",
            Self::ResourceExists => "ResourceExistsException",
            Self::InvalidParameter => "InvalidParameterException",
            Self::InvalidRequest => "InvalidRequestException",
            Self::Validation => "ValidationException",
            Self::UnknownOperation => "UnknownOperationException",
            Self::InternalService => "InternalServiceError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::InternalService => 500,
            Self::ResourceNotFound
            | Self::ResourceExists
            | Self::InvalidParameter
            | Self::InvalidRequest
            | Self::Validation
            | Self::UnknownOperation => 400,
        }
    }
}

/// AWS-style JSON protocol error
#[derive(Debug, Error)]
#[error("{}: {message}", .code.as_str())]
pub struct AwsError {
    pub code: ErrorCode,
    pub message: String,
    pub request_id: String,
}

impl AwsError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Format as a JSON 1.1 protocol error body
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        struct JsonError<'a> {
            #[serde(rename = "__type")]
            error_type: &'a str,
            message: &'a str,
        }

        let error = JsonError {
            error_type: self.code.as_str(),
            message: &self.message,
        };

        serde_json::to_string(&error).unwrap_or_else(|_| {
            format!(r#"{{"__type":"{}","message":"{}"}}"#, self.code.as_str(), self.message)
        })
    }
}

impl From<SecretsManagerError> for AwsError {
    fn from(e: SecretsManagerError) -> Self {
        let code = match &e {
            SecretsManagerError::ResourceNotFound(_) => ErrorCode::ResourceNotFound,
            SecretsManagerError::ResourceExists(_) => ErrorCode::ResourceExists,
            SecretsManagerError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            SecretsManagerError::InvalidRequest(_) => ErrorCode::InvalidRequest,
        };
        Self::new(code, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_json_format() {
        let error = AwsError::new(ErrorCode::ResourceNotFound, "Secret edge-token not found")
            .with_request_id("test-request-id");

        let json: serde_json::Value = serde_json::from_str(&error.to_json()).unwrap();
        assert_eq!(json["__type"], "ResourceNotFoundException");
        assert_eq!(json["message"], "Secret edge-token not found");
        assert_eq!(error.request_id, "test-request-id");
    }

    #[test]
    fn test_storage_errors_map_to_codes() {
        let error = AwsError::from(SecretsManagerError::InvalidParameter("bad".into()));
        assert_eq!(error.code, ErrorCode::InvalidParameter);
        assert_eq!(error.code.http_status(), 400);
        assert_eq!(ErrorCode::InternalService.http_status(), 500);
    }
}
