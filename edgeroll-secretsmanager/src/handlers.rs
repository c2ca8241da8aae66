//! HTTP handlers for the Secrets Manager emulator

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AwsError, ErrorCode};
use crate::storage::{random_password, SecretsManagerState};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const DEFAULT_PASSWORD_LENGTH: u32 = 32;

/// Handle Secrets Manager requests based on X-Amz-Target header
pub async fn handle_request(
    State(state): State<Arc<SecretsManagerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = headers
        .get("x-amz-target")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    info!(target = %target, "Secrets Manager request");

    let result = match target {
        "secretsmanager.CreateSecret" => handle_create_secret(&state, &body),
        "secretsmanager.GetSecretValue" => handle_get_secret_value(&state, &body),
        "secretsmanager.PutSecretValue" => handle_put_secret_value(&state, &body),
        "secretsmanager.DescribeSecret" => handle_describe_secret(&state, &body),
        "secretsmanager.UpdateSecretVersionStage" => handle_update_version_stage(&state, &body),
        "secretsmanager.GetRandomPassword" => handle_get_random_password(&body),
        _ => {
            warn!(target = %target, "Unknown Secrets Manager operation");
            Err(AwsError::new(
                ErrorCode::UnknownOperation,
                format!("Unknown operation: {}", target),
            ))
        }
    };

    match result {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

// === Request/Response types ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSecretRequest {
    name: String,
    description: Option<String>,
    secret_string: Option<String>,
    client_request_token: Option<String>,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Tag {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSecretResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetSecretValueRequest {
    secret_id: String,
    version_id: Option<String>,
    version_stage: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetSecretValueResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    version_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_string: Option<String>,
    version_stages: Vec<String>,
    created_date: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PutSecretValueRequest {
    secret_id: String,
    client_request_token: Option<String>,
    secret_string: Option<String>,
    version_stages: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutSecretValueResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    version_id: String,
    version_stages: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecretRequest {
    secret_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecretResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    rotation_enabled: bool,
    created_date: f64,
    last_changed_date: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_accessed_date: Option<f64>,
    version_ids_to_stages: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateSecretVersionStageRequest {
    secret_id: String,
    version_stage: String,
    move_to_version_id: Option<String>,
    remove_from_version_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateSecretVersionStageResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetRandomPasswordRequest {
    password_length: Option<u32>,
    #[serde(default)]
    exclude_punctuation: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetRandomPasswordResponse {
    random_password: String,
}

// === Handlers ===

fn handle_create_secret(state: &SecretsManagerState, body: &[u8]) -> Result<Response, AwsError> {
    let req: CreateSecretRequest = parse(body)?;
    let tags: HashMap<String, String> = req.tags.into_iter().map(|t| (t.key, t.value)).collect();

    let secret = state.storage.create_secret(
        &req.name,
        req.description,
        req.secret_string,
        req.client_request_token,
        tags,
    )?;

    let version_id = secret
        .version_with_stage("AWSCURRENT")
        .map(|v| v.version_id.clone());
    Ok(json_response(&CreateSecretResponse {
        arn: secret.arn,
        name: secret.name,
        version_id,
    }))
}

fn handle_get_secret_value(
    state: &SecretsManagerState,
    body: &[u8],
) -> Result<Response, AwsError> {
    let req: GetSecretValueRequest = parse(body)?;

    let (secret, version) = state.storage.get_secret_value(
        &req.secret_id,
        req.version_id.as_deref(),
        req.version_stage.as_deref(),
    )?;

    Ok(json_response(&GetSecretValueResponse {
        arn: secret.arn,
        name: secret.name,
        version_id: version.version_id,
        secret_string: version.secret_string,
        version_stages: version.version_stages,
        created_date: epoch_seconds(version.created_date),
    }))
}

fn handle_put_secret_value(
    state: &SecretsManagerState,
    body: &[u8],
) -> Result<Response, AwsError> {
    let req: PutSecretValueRequest = parse(body)?;
    let secret_string = req.secret_string.ok_or_else(|| {
        AwsError::new(ErrorCode::Validation, "SecretString is required")
    })?;

    let (secret, version) = state.storage.put_secret_value(
        &req.secret_id,
        req.client_request_token,
        secret_string,
        req.version_stages,
    )?;

    Ok(json_response(&PutSecretValueResponse {
        arn: secret.arn,
        name: secret.name,
        version_id: version.version_id,
        version_stages: version.version_stages,
    }))
}

fn handle_describe_secret(
    state: &SecretsManagerState,
    body: &[u8],
) -> Result<Response, AwsError> {
    let req: DescribeSecretRequest = parse(body)?;
    let secret = state.storage.describe_secret(&req.secret_id)?;

    Ok(json_response(&DescribeSecretResponse {
        version_ids_to_stages: secret.version_ids_to_stages(),
        arn: secret.arn,
        name: secret.name,
        description: secret.description,
        rotation_enabled: secret.rotation_enabled,
        created_date: epoch_seconds(secret.created_date),
        last_changed_date: epoch_seconds(secret.last_changed_date),
        last_accessed_date: secret.last_accessed_date.map(epoch_seconds),
    }))
}

fn handle_update_version_stage(
    state: &SecretsManagerState,
    body: &[u8],
) -> Result<Response, AwsError> {
    let req: UpdateSecretVersionStageRequest = parse(body)?;

    let secret = state.storage.update_secret_version_stage(
        &req.secret_id,
        &req.version_stage,
        req.move_to_version_id.as_deref(),
        req.remove_from_version_id.as_deref(),
    )?;

    Ok(json_response(&UpdateSecretVersionStageResponse {
        arn: secret.arn,
        name: secret.name,
    }))
}

fn handle_get_random_password(body: &[u8]) -> Result<Response, AwsError> {
    // All GetRandomPassword parameters are optional, including the body itself
    let req: GetRandomPasswordRequest = if body.is_empty() {
        GetRandomPasswordRequest::default()
    } else {
        parse(body)?
    };

    let random_password = random_password(
        req.password_length.unwrap_or(DEFAULT_PASSWORD_LENGTH),
        req.exclude_punctuation,
    )?;

    Ok(json_response(&GetRandomPasswordResponse { random_password }))
}

// === Helpers ===

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, AwsError> {
    serde_json::from_slice(body).map_err(|e| AwsError::new(ErrorCode::Validation, e.to_string()))
}

#[allow(clippy::cast_precision_loss)]
fn epoch_seconds(date: chrono::DateTime<chrono::Utc>) -> f64 {
    date.timestamp() as f64
}

fn json_response<T: Serialize>(body: &T) -> Response {
    match serde_json::to_string(body) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE))],
            body,
        )
            .into_response(),
        Err(e) => error_response(&AwsError::new(ErrorCode::InternalService, e.to_string())),
    }
}

fn error_response(error: &AwsError) -> Response {
    let status =
        StatusCode::from_u16(error.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let request_id = HeaderValue::from_str(&error.request_id)
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
    (
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE)),
            (header::HeaderName::from_static("x-amzn-requestid"), request_id),
        ],
        error.to_json(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn headers(target: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-amz-target", HeaderValue::from_str(target).unwrap());
        headers
    }

    async fn call(
        state: &Arc<SecretsManagerState>,
        target: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = handle_request(
            State(state.clone()),
            headers(target),
            Bytes::from(body.to_string()),
        )
        .await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_rotation_flow_over_json_protocol() {
        let state = Arc::new(SecretsManagerState::new());

        let (status, _) = call(
            &state,
            "secretsmanager.CreateSecret",
            serde_json::json!({"Name": "edge-token", "SecretString": "old", "ClientRequestToken": "v1"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, put) = call(
            &state,
            "secretsmanager.PutSecretValue",
            serde_json::json!({
                "SecretId": "edge-token",
                "ClientRequestToken": "req1",
                "SecretString": "new",
                "VersionStages": ["AWSPENDING"]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(put["VersionStages"], serde_json::json!(["AWSPENDING"]));

        let (status, _) = call(
            &state,
            "secretsmanager.UpdateSecretVersionStage",
            serde_json::json!({
                "SecretId": "edge-token",
                "VersionStage": "AWSCURRENT",
                "MoveToVersionId": "req1",
                "RemoveFromVersionId": "v1"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, described) = call(
            &state,
            "secretsmanager.DescribeSecret",
            serde_json::json!({"SecretId": "edge-token"}),
        )
        .await;
        assert_eq!(described["VersionIdsToStages"]["v1"], serde_json::json!(["AWSPREVIOUS"]));
        assert_eq!(described["RotationEnabled"], false);
    }

    #[tokio::test]
    async fn test_missing_secret_returns_resource_not_found() {
        let state = Arc::new(SecretsManagerState::new());

        let (status, body) = call(
            &state,
            "secretsmanager.GetSecretValue",
            serde_json::json!({"SecretId": "missing"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["__type"], "ResourceNotFoundException");
    }

    #[tokio::test]
    async fn test_random_password_request() {
        let state = Arc::new(SecretsManagerState::new());

        let (status, body) = call(
            &state,
            "secretsmanager.GetRandomPassword",
            serde_json::json!({"PasswordLength": 40, "ExcludePunctuation": true}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let password = body["RandomPassword"].as_str().unwrap();
        assert_eq!(password.len(), 40);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let state = Arc::new(SecretsManagerState::new());

        let (status, body) = call(&state, "secretsmanager.RotateSecret", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["__type"], "UnknownOperationException");
    }
}
