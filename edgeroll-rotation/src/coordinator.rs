//! Four-step rotation state machine

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use edgeroll_core::{
    RotationError, RuleModifier, SecretDescription, SecretStore, Stage, StoreError,
};

use crate::step::{RotationEvent, RotationStep};

/// Tunables for token generation and collaborator calls
#[derive(Debug, Clone)]
pub struct RotationSettings {
    /// Length of generated tokens
    pub token_length: u32,
    /// Exclude punctuation from generated tokens
    pub exclude_punctuation: bool,
    /// Upper bound on every secret store and rule modifier call
    pub call_timeout: Duration,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            token_length: 32,
            exclude_punctuation: true,
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Drives rotation steps against the secret store and both rule modifiers
///
/// The coordinator holds no state between calls. It relies on the caller to
/// run at most one rotation per secret at a time and never retries on its own.
pub struct RotationCoordinator {
    pub(crate) store: Arc<dyn SecretStore>,
    pub(crate) edge: Arc<dyn RuleModifier>,
    pub(crate) listener: Arc<dyn RuleModifier>,
    pub(crate) settings: RotationSettings,
}

impl RotationCoordinator {
    pub fn new(
        store: Arc<dyn SecretStore>,
        edge: Arc<dyn RuleModifier>,
        listener: Arc<dyn RuleModifier>,
        settings: RotationSettings,
    ) -> Self {
        Self {
            store,
            edge,
            listener,
            settings,
        }
    }

    /// Triggered-step caller: run the single step named by `event`
    pub async fn handle(&self, event: &RotationEvent) -> Result<(), RotationError> {
        let step: RotationStep = event.step.parse()?;
        info!(
            secret_id = %event.secret_id,
            step = %step,
            token = %event.client_request_token,
            "Rotation step requested"
        );

        self.ensure_rotation_enabled(&event.secret_id).await?;
        self.run_step(step, &event.secret_id, &event.client_request_token)
            .await
    }

    /// One-shot caller: run all four steps
    ///
    /// A version holding `AWSPENDING` but not `AWSCURRENT` belongs to an
    /// unfinished rotation whose token the edge may already inject, so it is
    /// resumed under its own id. Otherwise a fresh request token is used.
    /// Returns the request token, which is also the id of the new version.
    pub async fn rotate(&self, secret_id: &str) -> Result<String, RotationError> {
        let description = self.ensure_rotation_enabled(secret_id).await?;

        let token = match unfinished_version(&description) {
            Some(version_id) => {
                info!(secret_id = %secret_id, token = %version_id, "Resuming unfinished rotation");
                version_id.to_string()
            }
            None => {
                let token = Uuid::new_v4().to_string();
                info!(secret_id = %secret_id, token = %token, "Starting one-shot rotation");
                token
            }
        };

        for step in RotationStep::ALL {
            self.run_step(step, secret_id, &token).await?;
        }

        info!(secret_id = %secret_id, token = %token, "Rotation complete");
        Ok(token)
    }

    async fn run_step(
        &self,
        step: RotationStep,
        secret_id: &str,
        token: &str,
    ) -> Result<(), RotationError> {
        let result = match step {
            RotationStep::CreateSecret => self.create_secret(secret_id, token).await,
            RotationStep::SetSecret => self.set_secret(secret_id, token).await,
            RotationStep::TestSecret => self.test_secret(secret_id, token).await,
            RotationStep::FinishSecret => self.finish_secret(secret_id, token).await,
        };

        if let Err(e) = &result {
            warn!(
                secret_id = %secret_id,
                step = %step,
                retryable = e.is_retryable(),
                error = %e,
                "Rotation step failed"
            );
        }
        result
    }

    /// Checked once per caller invocation and never cached across invocations.
    async fn ensure_rotation_enabled(
        &self,
        secret_id: &str,
    ) -> Result<SecretDescription, RotationError> {
        let description = self.within("DescribeSecret", self.store.describe(secret_id)).await??;
        if !description.rotation_enabled {
            return Err(RotationError::NotEnabledForRotation(secret_id.to_string()));
        }
        Ok(description)
    }

    /// Ensure a `AWSPENDING` version with id `token` exists
    pub(crate) async fn create_secret(&self, secret_id: &str, token: &str) -> Result<(), RotationError> {
        let existing = self
            .within(
                "GetSecretValue",
                self.store.get_value(secret_id, Some(token), Some(Stage::Pending)),
            )
            .await?;

        match existing {
            Ok(_) => {
                info!(secret_id = %secret_id, token = %token, "Pending version already exists");
                return Ok(());
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let value = self
            .within(
                "GetRandomPassword",
                self.store.random_token(
                    self.settings.token_length,
                    self.settings.exclude_punctuation,
                ),
            )
            .await??;

        self.within(
            "PutSecretValue",
            self.store
                .put_version(secret_id, token, &value, &[Stage::Pending]),
        )
        .await??;

        info!(secret_id = %secret_id, token = %token, "Created pending version");
        Ok(())
    }

    /// Propagate the pending token to both rule modifiers
    pub(crate) async fn set_secret(&self, secret_id: &str, token: &str) -> Result<(), RotationError> {
        let old = self
            .within(
                "GetSecretValue",
                self.store.get_value(secret_id, None, Some(Stage::Current)),
            )
            .await??;
        let new = self
            .within(
                "GetSecretValue",
                self.store
                    .get_value(secret_id, Some(token), Some(Stage::Pending)),
            )
            .await??;

        info!(
            secret_id = %secret_id,
            current_version = %old.version_id,
            pending_version = %new.version_id,
            "Propagating pending token"
        );
        self.dual_write(&old.secret_string, &new.secret_string)
            .await
    }

    /// No independent verification endpoint exists for the edge path, so
    /// this step always succeeds.
    pub(crate) async fn test_secret(&self, secret_id: &str, token: &str) -> Result<(), RotationError> {
        info!(secret_id = %secret_id, token = %token, "No verification configured for pending token");
        Ok(())
    }

    /// Move `AWSCURRENT` onto version `token`
    pub(crate) async fn finish_secret(&self, secret_id: &str, token: &str) -> Result<(), RotationError> {
        let description = self.within("DescribeSecret", self.store.describe(secret_id)).await??;

        if description.has_stage(token, Stage::Current) {
            info!(secret_id = %secret_id, token = %token, "Version already marked as AWSCURRENT");
            return Ok(());
        }

        let holder = description
            .version_with(Stage::Current)
            .ok_or_else(|| {
                RotationError::MalformedState(format!(
                    "no version of {} holds {}",
                    secret_id,
                    Stage::Current
                ))
            })?
            .to_string();

        self.within(
            "UpdateSecretVersionStage",
            self.store
                .move_stage(secret_id, Stage::Current, Some(&holder), token),
        )
        .await??;

        info!(
            secret_id = %secret_id,
            from_version = %holder,
            to_version = %token,
            "Promoted pending version to AWSCURRENT"
        );
        Ok(())
    }

    /// Bound a collaborator call by the configured timeout
    pub(crate) async fn within<F: Future>(
        &self,
        operation: &'static str,
        call: F,
    ) -> Result<F::Output, RotationError> {
        let after = self.settings.call_timeout;
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| RotationError::Timeout { operation, after })
    }
}

fn unfinished_version(description: &SecretDescription) -> Option<&str> {
    description
        .version_with(Stage::Pending)
        .filter(|id| !description.has_stage(id, Stage::Current))
}
