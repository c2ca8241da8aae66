//! In-process Secrets Manager emulator for tests

use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_secretsmanager::config::{Credentials, Region};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use edgeroll_secretsmanager::{AwsSecretStore, SecretsManagerState, SecretsManagerStorage};

/// Version id given to the current version of seeded secrets
pub const SEED_VERSION: &str = "v1";

/// A running emulator bound to a random local port
pub struct EmulatorServer {
    storage: Arc<SecretsManagerStorage>,
    port: u16,
    base_url: String,
    handle: JoinHandle<()>,
}

impl EmulatorServer {
    /// Start the emulator on a random available port
    pub async fn start() -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| TestError::StartFailed(e.to_string()))?;
        let port = listener
            .local_addr()
            .map_err(|e| TestError::StartFailed(e.to_string()))?
            .port();

        let storage = Arc::new(SecretsManagerStorage::new());
        let router = edgeroll_secretsmanager::router(Arc::new(SecretsManagerState::with_storage(
            storage.clone(),
        )));

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Emulator stopped");
            }
        });

        info!(port = port, "Secrets Manager emulator started");
        Ok(Self {
            storage,
            port,
            base_url: format!("http://127.0.0.1:{}", port),
            handle,
        })
    }

    /// Get the base URL
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Get the port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Direct access to the emulator's storage, for seeding and assertions
    pub fn storage(&self) -> Arc<SecretsManagerStorage> {
        self.storage.clone()
    }

    /// Create `name` holding `value` as [`SEED_VERSION`] under `AWSCURRENT`,
    /// with rotation enabled. Returns the secret's ARN.
    pub fn seed_secret(&self, name: &str, value: &str) -> Result<String, TestError> {
        let secret = self
            .storage
            .create_secret(
                name,
                None,
                Some(value.to_string()),
                Some(SEED_VERSION.to_string()),
                HashMap::new(),
            )
            .map_err(|e| TestError::Seed(e.to_string()))?;
        self.storage
            .set_rotation_enabled(name, true)
            .map_err(|e| TestError::Seed(e.to_string()))?;
        Ok(secret.arn)
    }

    /// SDK configuration pointing at this emulator with static test credentials
    pub async fn sdk_config(&self) -> SdkConfig {
        aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(self.base_url.clone())
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .region(Region::new("us-east-1"))
            .load()
            .await
    }

    /// Production secret store talking to this emulator through the AWS SDK
    pub async fn secret_store(&self) -> AwsSecretStore {
        AwsSecretStore::from_sdk_config(&self.sdk_config().await)
    }

    /// Stop the server
    pub fn stop(&self) {
        info!(port = self.port, "Stopping Secrets Manager emulator");
        self.handle.abort();
    }
}

impl Drop for EmulatorServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Errors that can occur with the test server
#[derive(Debug)]
pub enum TestError {
    StartFailed(String),
    Seed(String),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::StartFailed(msg) => write!(f, "Failed to start server: {}", msg),
            TestError::Seed(msg) => write!(f, "Failed to seed secret: {}", msg),
        }
    }
}

impl std::error::Error for TestError {}

#[cfg(test)]
mod tests {
    use super::*;
    use edgeroll_core::{SecretStore, Stage};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_seeded_secret_is_readable_through_sdk() {
        let server = EmulatorServer::start().await.unwrap();
        let arn = server.seed_secret("edge-token", "old123").unwrap();
        assert!(arn.starts_with("arn:aws:secretsmanager:"));

        let store = server.secret_store().await;
        let value = store
            .get_value("edge-token", None, Some(Stage::Current))
            .await
            .unwrap();
        assert_eq!(value.version_id, SEED_VERSION);
        assert_eq!(value.secret_string, "old123");

        let description = store.describe(&arn).await.unwrap();
        assert!(description.rotation_enabled);
    }

    #[tokio::test]
    async fn test_stop_closes_the_port() {
        let server = EmulatorServer::start().await.unwrap();
        assert_eq!(server.url(), format!("http://127.0.0.1:{}", server.port()));
        assert!(TcpStream::connect(("127.0.0.1", server.port())).await.is_ok());

        server.stop();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(TcpStream::connect(("127.0.0.1", server.port())).await.is_err());
    }

    #[tokio::test]
    async fn test_seeding_twice_fails() {
        let server = EmulatorServer::start().await.unwrap();
        server.seed_secret("edge-token", "old123").unwrap();

        let err = server.seed_secret("edge-token", "other").unwrap_err();
        assert!(matches!(err, TestError::Seed(_)));
    }
}
