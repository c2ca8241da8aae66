//! Cloudflare rulesets API client

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use edgeroll_core::{CallOutcome, ModifierError};

/// PATCH body for a `rewrite` rule that sets one request header
#[derive(Debug, Clone, Serialize)]
pub struct RulePatch {
    pub action: &'static str,
    pub expression: String,
    pub description: String,
    pub enabled: bool,
    pub action_parameters: ActionParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionParameters {
    pub headers: HashMap<String, HeaderOperation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderOperation {
    pub operation: &'static str,
    pub value: String,
}

impl RulePatch {
    /// Rewrite rule injecting `value` into `header` on every matching request
    pub fn set_header(
        header: &str,
        value: String,
        expression: &str,
        description: &str,
    ) -> Self {
        let mut headers = HashMap::new();
        headers.insert(
            header.to_string(),
            HeaderOperation {
                operation: "set",
                value,
            },
        );
        Self {
            action: "rewrite",
            expression: expression.to_string(),
            description: description.to_string(),
            enabled: true,
            action_parameters: ActionParameters { headers },
        }
    }
}

/// Error or informational message in a Cloudflare API envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    pub code: Option<i64>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

/// Client for the zone rulesets API
pub struct RulesetsClient {
    base_url: String,
    client: reqwest::Client,
}

impl RulesetsClient {
    /// Create a client against `base_url` (e.g. `https://api.cloudflare.com/client/v4`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ModifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModifierError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// PATCH a single rule and report the envelope's `success` flag
    pub async fn patch_rule(
        &self,
        api_token: &str,
        zone_id: &str,
        ruleset_id: &str,
        rule_id: &str,
        patch: &RulePatch,
    ) -> Result<CallOutcome, ModifierError> {
        let url = format!(
            "{}/zones/{}/rulesets/{}/rules/{}",
            self.base_url, zone_id, ruleset_id, rule_id
        );

        let response = self
            .client
            .patch(&url)
            .bearer_auth(api_token)
            .json(patch)
            .send()
            .await
            .map_err(|e| ModifierError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ModifierError::Transport(e.to_string()))?;

        let envelope: ApiEnvelope = serde_json::from_slice(&body).map_err(|e| {
            ModifierError::Response(format!("HTTP {} with unreadable body: {}", status, e))
        })?;

        let detail = envelope
            .errors
            .iter()
            .map(|e| match e.code {
                Some(code) => format!("{}: {}", code, e.message),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ");

        Ok(CallOutcome::from_flag(envelope.success, detail))
    }
}
