//! Edge rule modifier backed by a Cloudflare header transform rule

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use edgeroll_core::{
    AcceptedTokens, CallOutcome, ModifierError, RuleModifier, RuleTarget, SecretStore, Stage,
};

use crate::client::{RulePatch, RulesetsClient};

/// Identifies the transform rule and how it injects the token
#[derive(Debug, Clone)]
pub struct EdgeRuleConfig {
    pub api_base: String,
    pub zone_id: String,
    pub ruleset_id: String,
    pub rule_id: String,
    pub header_name: String,
    pub expression: String,
    pub description: String,
    /// Secret holding the Cloudflare API token (not the rotated token)
    pub api_token_secret: String,
    pub timeout: Duration,
}

/// Sets the token the edge injects into origin-bound requests
pub struct CloudflareEdgeModifier {
    config: EdgeRuleConfig,
    store: Arc<dyn SecretStore>,
    client: RulesetsClient,
}

impl CloudflareEdgeModifier {
    pub fn new(config: EdgeRuleConfig, store: Arc<dyn SecretStore>) -> Result<Self, ModifierError> {
        let client = RulesetsClient::new(config.api_base.clone(), config.timeout)?;
        Ok(Self {
            config,
            store,
            client,
        })
    }

    /// The API token is read on every call so a rotated credential is picked
    /// up immediately.
    async fn api_token(&self) -> Result<String, ModifierError> {
        let value = self
            .store
            .get_value(&self.config.api_token_secret, None, Some(Stage::Current))
            .await
            .map_err(ModifierError::Credential)?;
        Ok(value.secret_string)
    }

    pub fn rule_patch(&self, tokens: &AcceptedTokens) -> RulePatch {
        RulePatch::set_header(
            &self.config.header_name,
            tokens.as_slice().join(","),
            &self.config.expression,
            &self.config.description,
        )
    }
}

#[async_trait]
impl RuleModifier for CloudflareEdgeModifier {
    fn target(&self) -> RuleTarget {
        RuleTarget::Edge
    }

    async fn set_accepted_tokens(
        &self,
        tokens: &AcceptedTokens,
    ) -> Result<CallOutcome, ModifierError> {
        let api_token = self.api_token().await?;
        debug!(
            zone_id = %self.config.zone_id,
            rule_id = %self.config.rule_id,
            tokens = tokens.len(),
            "Patching Cloudflare transform rule"
        );

        let outcome = self
            .client
            .patch_rule(
                &api_token,
                &self.config.zone_id,
                &self.config.ruleset_id,
                &self.config.rule_id,
                &self.rule_patch(tokens),
            )
            .await?;

        info!(rule_id = %self.config.rule_id, outcome = %outcome, "Cloudflare rule updated");
        Ok(outcome)
    }
}
