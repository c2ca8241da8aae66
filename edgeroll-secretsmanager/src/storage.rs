//! Secrets Manager in-memory storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use edgeroll_core::{SecretDescription, SecretStore, SecretValue, Stage, StoreError};

const AWSCURRENT: &str = "AWSCURRENT";
const AWSPREVIOUS: &str = "AWSPREVIOUS";

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const PUNCTUATION: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Longest password GetRandomPassword will generate
pub const MAX_PASSWORD_LENGTH: u32 = 4096;

/// A secret with its versions
#[derive(Debug, Clone)]
pub struct Secret {
    /// Secret ARN
    pub arn: String,
    /// Secret name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Secret versions (version_id -> SecretVersion)
    pub versions: HashMap<String, SecretVersion>,
    /// Whether a rotation function is configured
    pub rotation_enabled: bool,
    /// Creation date
    pub created_date: DateTime<Utc>,
    /// Last changed date
    pub last_changed_date: DateTime<Utc>,
    /// Last accessed date
    pub last_accessed_date: Option<DateTime<Utc>>,
    /// Tags
    pub tags: HashMap<String, String>,
}

impl Secret {
    /// The version currently carrying `stage`
    pub fn version_with_stage(&self, stage: &str) -> Option<&SecretVersion> {
        self.versions
            .values()
            .find(|v| v.version_stages.iter().any(|s| s == stage))
    }

    pub fn version_ids_to_stages(&self) -> HashMap<String, Vec<String>> {
        self.versions
            .iter()
            .map(|(k, v)| (k.clone(), v.version_stages.clone()))
            .collect()
    }

    /// Attach `stage` to `version_id`, detaching it from every other version.
    /// Moving AWSCURRENT demotes the prior holder to AWSPREVIOUS.
    fn attach_stage(&mut self, version_id: &str, stage: &str) {
        let prior = self
            .version_with_stage(stage)
            .map(|v| v.version_id.clone())
            .filter(|id| id != version_id);

        for version in self.versions.values_mut() {
            if version.version_id != version_id {
                version.version_stages.retain(|s| s != stage);
            }
        }

        if let Some(target) = self.versions.get_mut(version_id) {
            if !target.version_stages.iter().any(|s| s == stage) {
                target.version_stages.push(stage.to_string());
            }
        }

        if stage == AWSCURRENT {
            if let Some(prior) = prior {
                self.attach_stage(&prior, AWSPREVIOUS);
            }
        }
    }
}

/// A version of a secret
#[derive(Debug, Clone)]
pub struct SecretVersion {
    /// Version ID
    pub version_id: String,
    /// Secret string value
    pub secret_string: Option<String>,
    /// Creation date
    pub created_date: DateTime<Utc>,
    /// Version stages (e.g., AWSCURRENT, AWSPREVIOUS)
    pub version_stages: Vec<String>,
}

/// In-memory storage for secrets
#[derive(Debug, Default)]
pub struct SecretsManagerStorage {
    /// Secrets indexed by name
    secrets: DashMap<String, Secret>,
}

impl SecretsManagerStorage {
    pub fn new() -> Self {
        Self {
            secrets: DashMap::new(),
        }
    }

    /// Look a secret up by name or ARN, holding its shard lock
    fn entry_mut(&self, secret_id: &str) -> Result<RefMut<'_, String, Secret>, SecretsManagerError> {
        if let Some(secret) = self.secrets.get_mut(secret_id) {
            return Ok(secret);
        }

        let name = self
            .secrets
            .iter()
            .find(|r| r.value().arn == secret_id)
            .map(|r| r.key().clone())
            .ok_or_else(|| SecretsManagerError::ResourceNotFound(secret_id.to_string()))?;

        self.secrets
            .get_mut(&name)
            .ok_or_else(|| SecretsManagerError::ResourceNotFound(secret_id.to_string()))
    }

    /// Create a new secret
    pub fn create_secret(
        &self,
        name: &str,
        description: Option<String>,
        secret_string: Option<String>,
        client_request_token: Option<String>,
        tags: HashMap<String, String>,
    ) -> Result<Secret, SecretsManagerError> {
        if self.secrets.contains_key(name) {
            return Err(SecretsManagerError::ResourceExists(name.to_string()));
        }

        let now = Utc::now();
        let arn = format!(
            "arn:aws:secretsmanager:us-east-1:000000000000:secret:{}-{}",
            name,
            &Uuid::new_v4().to_string()[..6]
        );

        let mut versions = HashMap::new();
        if secret_string.is_some() {
            let version_id = client_request_token.unwrap_or_else(|| Uuid::new_v4().to_string());
            versions.insert(
                version_id.clone(),
                SecretVersion {
                    version_id,
                    secret_string,
                    created_date: now,
                    version_stages: vec![AWSCURRENT.to_string()],
                },
            );
        }

        let secret = Secret {
            arn,
            name: name.to_string(),
            description,
            versions,
            rotation_enabled: false,
            created_date: now,
            last_changed_date: now,
            last_accessed_date: None,
            tags,
        };

        self.secrets.insert(name.to_string(), secret.clone());
        Ok(secret)
    }

    /// Get a secret by name or ARN
    pub fn get_secret(&self, secret_id: &str) -> Result<Secret, SecretsManagerError> {
        self.entry_mut(secret_id).map(|s| s.clone())
    }

    /// Get secret value by version id, stage, or both
    pub fn get_secret_value(
        &self,
        secret_id: &str,
        version_id: Option<&str>,
        version_stage: Option<&str>,
    ) -> Result<(Secret, SecretVersion), SecretsManagerError> {
        let mut secret = self.entry_mut(secret_id)?;

        // Update last accessed date
        secret.last_accessed_date = Some(Utc::now());

        let version = match (version_id, version_stage) {
            (Some(vid), stage) => {
                let version = secret.versions.get(vid).ok_or_else(|| {
                    SecretsManagerError::ResourceNotFound(format!("Version {} not found", vid))
                })?;
                if let Some(stage) = stage {
                    if !version.version_stages.iter().any(|s| s == stage) {
                        return Err(SecretsManagerError::ResourceNotFound(format!(
                            "Version {} does not carry stage {}",
                            vid, stage
                        )));
                    }
                }
                version.clone()
            }
            (None, stage) => {
                let stage = stage.unwrap_or(AWSCURRENT);
                secret.version_with_stage(stage).cloned().ok_or_else(|| {
                    SecretsManagerError::ResourceNotFound(format!("No version with stage {}", stage))
                })?
            }
        };

        Ok((secret.clone(), version))
    }

    /// Put a new secret value
    ///
    /// Replaying the same `client_request_token` with the same value is a
    /// no-op; a different value under an existing token is rejected.
    pub fn put_secret_value(
        &self,
        secret_id: &str,
        client_request_token: Option<String>,
        secret_string: String,
        version_stages: Option<Vec<String>>,
    ) -> Result<(Secret, SecretVersion), SecretsManagerError> {
        let mut secret = self.entry_mut(secret_id)?;
        let version_id = client_request_token.unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Some(existing) = secret.versions.get(&version_id) {
            if existing.secret_string.as_deref() == Some(secret_string.as_str()) {
                let existing = existing.clone();
                return Ok((secret.clone(), existing));
            }
            return Err(SecretsManagerError::ResourceExists(format!(
                "Version {} already exists with a different value",
                version_id
            )));
        }

        let now = Utc::now();
        secret.versions.insert(
            version_id.clone(),
            SecretVersion {
                version_id: version_id.clone(),
                secret_string: Some(secret_string),
                created_date: now,
                version_stages: Vec::new(),
            },
        );

        let stages = version_stages.unwrap_or_else(|| vec![AWSCURRENT.to_string()]);
        for stage in &stages {
            secret.attach_stage(&version_id, stage);
        }
        secret.last_changed_date = now;

        let version = secret.versions[&version_id].clone();
        Ok((secret.clone(), version))
    }

    /// Move or remove a stage label
    ///
    /// When the stage is attached to another version, `remove_from` must name
    /// that version. The whole move happens under the secret's lock.
    pub fn update_secret_version_stage(
        &self,
        secret_id: &str,
        version_stage: &str,
        move_to: Option<&str>,
        remove_from: Option<&str>,
    ) -> Result<Secret, SecretsManagerError> {
        let mut secret = self.entry_mut(secret_id)?;
        let holder = secret
            .version_with_stage(version_stage)
            .map(|v| v.version_id.clone());

        match move_to {
            Some(to) => {
                if !secret.versions.contains_key(to) {
                    return Err(SecretsManagerError::ResourceNotFound(format!(
                        "Version {} not found",
                        to
                    )));
                }
                if let Some(holder) = holder.as_deref().filter(|h| *h != to) {
                    if remove_from != Some(holder) {
                        return Err(SecretsManagerError::InvalidParameter(format!(
                            "Stage {} is attached to version {}; RemoveFromVersionId must name it",
                            version_stage, holder
                        )));
                    }
                }
                secret.attach_stage(to, version_stage);
            }
            None => {
                let from = remove_from.ok_or_else(|| {
                    SecretsManagerError::InvalidParameter(
                        "MoveToVersionId or RemoveFromVersionId is required".to_string(),
                    )
                })?;
                if version_stage == AWSCURRENT {
                    return Err(SecretsManagerError::InvalidRequest(
                        "AWSCURRENT can only be moved, not removed".to_string(),
                    ));
                }
                if holder.as_deref() != Some(from) {
                    return Err(SecretsManagerError::InvalidParameter(format!(
                        "Stage {} is not attached to version {}",
                        version_stage, from
                    )));
                }
                if let Some(version) = secret.versions.get_mut(from) {
                    version.version_stages.retain(|s| s != version_stage);
                }
            }
        }

        secret.last_changed_date = Utc::now();
        Ok(secret.clone())
    }

    /// Turn automatic rotation on or off
    pub fn set_rotation_enabled(
        &self,
        secret_id: &str,
        enabled: bool,
    ) -> Result<Secret, SecretsManagerError> {
        let mut secret = self.entry_mut(secret_id)?;
        secret.rotation_enabled = enabled;
        Ok(secret.clone())
    }

    /// Describe a secret
    pub fn describe_secret(&self, secret_id: &str) -> Result<Secret, SecretsManagerError> {
        self.get_secret(secret_id)
    }
}

/// Generate a random password containing at least one character of every
/// included class
pub fn random_password(
    length: u32,
    exclude_punctuation: bool,
) -> Result<String, SecretsManagerError> {
    if length == 0 || length > MAX_PASSWORD_LENGTH {
        return Err(SecretsManagerError::InvalidParameter(format!(
            "PasswordLength must be between 1 and {}",
            MAX_PASSWORD_LENGTH
        )));
    }

    let mut classes = vec![LOWERCASE, UPPERCASE, DIGITS];
    if !exclude_punctuation {
        classes.push(PUNCTUATION);
    }
    let alphabet: Vec<u8> = classes.concat();

    let mut rng = rand::thread_rng();
    let mut chars: Vec<u8> = classes
        .iter()
        .take(length as usize)
        .filter_map(|class| class.choose(&mut rng).copied())
        .collect();
    while chars.len() < length as usize {
        if let Some(c) = alphabet.choose(&mut rng) {
            chars.push(*c);
        }
    }
    chars.shuffle(&mut rng);

    Ok(chars.into_iter().map(char::from).collect())
}

/// Secrets Manager errors
#[derive(Debug, thiserror::Error)]
pub enum SecretsManagerError {
    #[error("Secret already exists: {0}")]
    ResourceExists(String),

    #[error("Secret not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<SecretsManagerError> for StoreError {
    fn from(e: SecretsManagerError) -> Self {
        match e {
            SecretsManagerError::ResourceNotFound(id) => StoreError::NotFound(id),
            other => StoreError::InvalidRequest(other.to_string()),
        }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStorage {
    async fn describe(&self, secret_id: &str) -> Result<SecretDescription, StoreError> {
        let secret = self.describe_secret(secret_id)?;
        Ok(SecretDescription {
            version_ids_to_stages: secret.version_ids_to_stages(),
            arn: secret.arn,
            name: secret.name,
            rotation_enabled: secret.rotation_enabled,
        })
    }

    async fn get_value(
        &self,
        secret_id: &str,
        version_id: Option<&str>,
        stage: Option<Stage>,
    ) -> Result<SecretValue, StoreError> {
        let (secret, version) =
            self.get_secret_value(secret_id, version_id, stage.as_ref().map(Stage::as_str))?;
        let secret_string = version.secret_string.ok_or_else(|| {
            StoreError::NotFound(format!("Version {} has no string value", version.version_id))
        })?;
        Ok(SecretValue {
            arn: secret.arn,
            version_id: version.version_id,
            secret_string,
            version_stages: version.version_stages,
        })
    }

    async fn put_version(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &str,
        stages: &[Stage],
    ) -> Result<(), StoreError> {
        let stages = stages.iter().map(|s| s.as_str().to_string()).collect();
        self.put_secret_value(
            secret_id,
            Some(version_id.to_string()),
            value.to_string(),
            Some(stages),
        )?;
        Ok(())
    }

    async fn move_stage(
        &self,
        secret_id: &str,
        stage: Stage,
        from: Option<&str>,
        to: &str,
    ) -> Result<(), StoreError> {
        self.update_secret_version_stage(secret_id, stage.as_str(), Some(to), from)?;
        Ok(())
    }

    async fn random_token(
        &self,
        length: u32,
        exclude_punctuation: bool,
    ) -> Result<String, StoreError> {
        Ok(random_password(length, exclude_punctuation)?)
    }
}

/// State for Secrets Manager handlers
pub struct SecretsManagerState {
    pub storage: Arc<SecretsManagerStorage>,
}

impl SecretsManagerState {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(SecretsManagerStorage::new()),
        }
    }

    /// Serve an existing storage, so callers can seed and inspect it directly
    pub fn with_storage(storage: Arc<SecretsManagerStorage>) -> Self {
        Self { storage }
    }
}

impl Default for SecretsManagerState {
    fn default() -> Self {
        Self::new()
    }
}
