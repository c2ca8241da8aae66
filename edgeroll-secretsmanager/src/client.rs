//! AWS Secrets Manager backed secret store

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::Client;
use tracing::debug;

use edgeroll_core::{SecretDescription, SecretStore, SecretValue, Stage, StoreError};

/// Secret store speaking to AWS Secrets Manager (or anything wire-compatible)
#[derive(Debug, Clone)]
pub struct AwsSecretStore {
    client: Client,
}

impl AwsSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a store from shared SDK configuration
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

fn store_error<E, R>(secret_id: &str, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.as_service_error().and_then(ProvideErrorMetadata::code);
    match code {
        Some("ResourceNotFoundException") => StoreError::NotFound(format!(
            "{}: {}",
            secret_id,
            err.as_service_error()
                .and_then(ProvideErrorMetadata::message)
                .unwrap_or("resource not found")
        )),
        Some(
            "InvalidParameterException"
            | "InvalidRequestException"
            | "ResourceExistsException"
            | "ValidationException",
        ) => StoreError::InvalidRequest(DisplayErrorContext(&err).to_string()),
        _ => StoreError::Service(DisplayErrorContext(&err).to_string()),
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn describe(&self, secret_id: &str) -> Result<SecretDescription, StoreError> {
        debug!(secret_id = %secret_id, "DescribeSecret");
        let out = self
            .client
            .describe_secret()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| store_error(secret_id, e))?;

        Ok(SecretDescription {
            arn: out.arn().unwrap_or(secret_id).to_string(),
            name: out.name().unwrap_or_default().to_string(),
            rotation_enabled: out.rotation_enabled().unwrap_or(false),
            version_ids_to_stages: out.version_ids_to_stages().cloned().unwrap_or_default(),
        })
    }

    async fn get_value(
        &self,
        secret_id: &str,
        version_id: Option<&str>,
        stage: Option<Stage>,
    ) -> Result<SecretValue, StoreError> {
        debug!(secret_id = %secret_id, version_id = ?version_id, stage = ?stage, "GetSecretValue");
        let out = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .set_version_id(version_id.map(str::to_string))
            .set_version_stage(stage.map(|s| s.as_str().to_string()))
            .send()
            .await
            .map_err(|e| store_error(secret_id, e))?;

        let version_id = out.version_id().unwrap_or_default().to_string();
        let secret_string = out
            .secret_string()
            .ok_or_else(|| {
                StoreError::NotFound(format!("Version {} has no string value", version_id))
            })?
            .to_string();

        Ok(SecretValue {
            arn: out.arn().unwrap_or(secret_id).to_string(),
            version_id,
            secret_string,
            version_stages: out.version_stages().to_vec(),
        })
    }

    async fn put_version(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &str,
        stages: &[Stage],
    ) -> Result<(), StoreError> {
        debug!(secret_id = %secret_id, version_id = %version_id, "PutSecretValue");
        self.client
            .put_secret_value()
            .secret_id(secret_id)
            .client_request_token(version_id)
            .secret_string(value)
            .set_version_stages(Some(stages.iter().map(|s| s.as_str().to_string()).collect()))
            .send()
            .await
            .map_err(|e| store_error(secret_id, e))?;
        Ok(())
    }

    async fn move_stage(
        &self,
        secret_id: &str,
        stage: Stage,
        from: Option<&str>,
        to: &str,
    ) -> Result<(), StoreError> {
        debug!(secret_id = %secret_id, stage = %stage, from = ?from, to = %to, "UpdateSecretVersionStage");
        self.client
            .update_secret_version_stage()
            .secret_id(secret_id)
            .version_stage(stage.as_str())
            .move_to_version_id(to)
            .set_remove_from_version_id(from.map(str::to_string))
            .send()
            .await
            .map_err(|e| store_error(secret_id, e))?;
        Ok(())
    }

    async fn random_token(
        &self,
        length: u32,
        exclude_punctuation: bool,
    ) -> Result<String, StoreError> {
        let out = self
            .client
            .get_random_password()
            .password_length(i64::from(length))
            .exclude_punctuation(exclude_punctuation)
            .send()
            .await
            .map_err(|e| store_error("GetRandomPassword", e))?;

        out.random_password()
            .map(str::to_string)
            .ok_or_else(|| StoreError::Service("GetRandomPassword returned no password".to_string()))
    }
}
