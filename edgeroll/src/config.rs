//! Configuration management

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use edgeroll_cloudflare::EdgeRuleConfig;
use edgeroll_elb::ListenerRuleConfig;
use edgeroll_rotation::RotationSettings;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub rotation: RotationConfig,

    #[serde(default)]
    pub cloudflare: CloudflareConfig,

    #[serde(default)]
    pub listener: ListenerConfig,

    #[serde(default)]
    pub aws: AwsConfig,
}

#[derive(Debug, Deserialize)]
pub struct RotationConfig {
    #[serde(default = "default_token_length")]
    pub token_length: u32,

    #[serde(default = "default_true")]
    pub exclude_punctuation: bool,

    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            token_length: default_token_length(),
            exclude_punctuation: default_true(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CloudflareConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub zone_id: String,

    #[serde(default)]
    pub ruleset_id: String,

    #[serde(default)]
    pub rule_id: String,

    #[serde(default = "default_header_name")]
    pub header_name: String,

    #[serde(default = "default_expression")]
    pub expression: String,

    #[serde(default = "default_header_name")]
    pub description: String,

    /// Secret holding the Cloudflare API token
    #[serde(default = "default_api_token_secret")]
    pub api_token_secret: String,
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            zone_id: String::new(),
            ruleset_id: String::new(),
            rule_id: String::new(),
            header_name: default_header_name(),
            expression: default_expression(),
            description: default_header_name(),
            api_token_secret: default_api_token_secret(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListenerConfig {
    #[serde(default)]
    pub rule_arn: String,

    #[serde(default = "default_header_name")]
    pub header_name: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            rule_arn: String::new(),
            header_name: default_header_name(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AwsConfig {
    pub region: Option<String>,

    /// Override for every AWS endpoint, e.g. a local emulator
    pub endpoint_url: Option<String>,
}

fn default_token_length() -> u32 {
    32
}

fn default_call_timeout_secs() -> u64 {
    10
}

fn default_api_base() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_header_name() -> String {
    "X-ALB-SECRET".to_string()
}

fn default_expression() -> String {
    "(http.host ne \"1\")".to_string()
}

fn default_api_token_secret() -> String {
    "nzh-cf-access-token-to-modify-transform-rules".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Without an explicit path, `edgeroll.toml` in the working directory is
    /// read if present. `EDGEROLL__SECTION__KEY` variables override both.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("edgeroll").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("EDGEROLL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }

    /// Reject configurations missing a rule identifier
    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("cloudflare.zone_id", &self.cloudflare.zone_id),
            ("cloudflare.ruleset_id", &self.cloudflare.ruleset_id),
            ("cloudflare.rule_id", &self.cloudflare.rule_id),
            ("cloudflare.header_name", &self.cloudflare.header_name),
            ("cloudflare.api_token_secret", &self.cloudflare.api_token_secret),
            ("listener.rule_arn", &self.listener.rule_arn),
            ("listener.header_name", &self.listener.header_name),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("{} must be set", key);
            }
        }
        if self.rotation.token_length == 0 {
            anyhow::bail!("rotation.token_length must be positive");
        }
        if self.rotation.call_timeout_secs == 0 {
            anyhow::bail!("rotation.call_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.rotation.call_timeout_secs)
    }

    pub fn rotation_settings(&self) -> RotationSettings {
        RotationSettings {
            token_length: self.rotation.token_length,
            exclude_punctuation: self.rotation.exclude_punctuation,
            call_timeout: self.call_timeout(),
        }
    }

    pub fn edge_rule(&self) -> EdgeRuleConfig {
        EdgeRuleConfig {
            api_base: self.cloudflare.api_base.clone(),
            zone_id: self.cloudflare.zone_id.clone(),
            ruleset_id: self.cloudflare.ruleset_id.clone(),
            rule_id: self.cloudflare.rule_id.clone(),
            header_name: self.cloudflare.header_name.clone(),
            expression: self.cloudflare.expression.clone(),
            description: self.cloudflare.description.clone(),
            api_token_secret: self.cloudflare.api_token_secret.clone(),
            timeout: self.call_timeout(),
        }
    }

    pub fn listener_rule(&self) -> ListenerRuleConfig {
        ListenerRuleConfig {
            rule_arn: self.listener.rule_arn.clone(),
            header_name: self.listener.header_name.clone(),
        }
    }
}
