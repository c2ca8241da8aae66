//! Versioned secret store contract

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

use crate::error::StoreError;
use crate::stage::Stage;

/// Secret metadata, including the stage labels of every version
#[derive(Debug, Clone, Default)]
pub struct SecretDescription {
    pub arn: String,
    pub name: String,
    pub rotation_enabled: bool,
    /// version_id -> stage labels (custom labels are kept verbatim)
    pub version_ids_to_stages: HashMap<String, Vec<String>>,
}

impl SecretDescription {
    /// The version currently holding `stage`, if any
    pub fn version_with(&self, stage: Stage) -> Option<&str> {
        self.version_ids_to_stages
            .iter()
            .find(|(_, labels)| stage.is_in(labels))
            .map(|(id, _)| id.as_str())
    }

    pub fn has_stage(&self, version_id: &str, stage: Stage) -> bool {
        self.version_ids_to_stages
            .get(version_id)
            .is_some_and(|labels| stage.is_in(labels))
    }

    /// Number of versions holding `stage`
    pub fn holders(&self, stage: Stage) -> usize {
        self.version_ids_to_stages
            .values()
            .filter(|labels| stage.is_in(labels))
            .count()
    }
}

/// A single secret version and its value
#[derive(Clone)]
pub struct SecretValue {
    pub arn: String,
    pub version_id: String,
    pub secret_string: String,
    pub version_stages: Vec<String>,
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("arn", &self.arn)
            .field("version_id", &self.version_id)
            .field("secret_string", &"<redacted>")
            .field("version_stages", &self.version_stages)
            .finish()
    }
}

/// Versioned key/value storage with stage labels per version
///
/// Stage moves must be atomic: no observer may see `AWSCURRENT` on zero or
/// two versions. Moving `AWSCURRENT` demotes the prior holder to
/// `AWSPREVIOUS`.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn describe(&self, secret_id: &str) -> Result<SecretDescription, StoreError>;

    /// Fetch a version by id, by stage, or by both (the version must then
    /// carry the stage). With neither, the `AWSCURRENT` version is returned.
    async fn get_value(
        &self,
        secret_id: &str,
        version_id: Option<&str>,
        stage: Option<Stage>,
    ) -> Result<SecretValue, StoreError>;

    /// Store `value` as version `version_id` labelled with `stages`
    async fn put_version(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &str,
        stages: &[Stage],
    ) -> Result<(), StoreError>;

    /// Move `stage` from `from` (its current holder, if any) onto `to`
    async fn move_stage(
        &self,
        secret_id: &str,
        stage: Stage,
        from: Option<&str>,
        to: &str,
    ) -> Result<(), StoreError>;

    /// Generate a random token using the store's generator
    async fn random_token(
        &self,
        length: u32,
        exclude_punctuation: bool,
    ) -> Result<String, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description() -> SecretDescription {
        let mut version_ids_to_stages = HashMap::new();
        version_ids_to_stages.insert(
            "v1".to_string(),
            vec!["AWSCURRENT".to_string(), "CUSTOM".to_string()],
        );
        version_ids_to_stages.insert("v2".to_string(), vec!["AWSPENDING".to_string()]);
        SecretDescription {
            arn: "arn".to_string(),
            name: "token".to_string(),
            rotation_enabled: true,
            version_ids_to_stages,
        }
    }

    #[test]
    fn test_version_with_stage() {
        let desc = description();
        assert_eq!(desc.version_with(Stage::Current), Some("v1"));
        assert_eq!(desc.version_with(Stage::Pending), Some("v2"));
        assert_eq!(desc.version_with(Stage::Previous), None);
        assert_eq!(desc.holders(Stage::Current), 1);
    }

    #[test]
    fn test_has_stage() {
        let desc = description();
        assert!(desc.has_stage("v2", Stage::Pending));
        assert!(!desc.has_stage("v2", Stage::Current));
        assert!(!desc.has_stage("missing", Stage::Current));
    }

    #[test]
    fn test_secret_value_debug_redacts() {
        let value = SecretValue {
            arn: "arn".to_string(),
            version_id: "v1".to_string(),
            secret_string: "hunter2".to_string(),
            version_stages: vec![],
        };
        assert!(!format!("{:?}", value).contains("hunter2"));
    }
}
