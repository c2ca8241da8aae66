//! Listener rule modifier backed by ELBv2 ModifyRule

use async_trait::async_trait;
use aws_sdk_elasticloadbalancingv2::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_elasticloadbalancingv2::types::{HttpHeaderConditionConfig, RuleCondition};
use aws_sdk_elasticloadbalancingv2::Client;
use tracing::{debug, info};

use edgeroll_core::{AcceptedTokens, CallOutcome, ModifierError, RuleModifier, RuleTarget};

const HTTP_HEADER_FIELD: &str = "http-header";

/// Identifies the listener rule and the header it matches on
#[derive(Debug, Clone)]
pub struct ListenerRuleConfig {
    pub rule_arn: String,
    pub header_name: String,
}

/// `http-header` rule condition matching any of `values`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCondition {
    pub header_name: String,
    pub values: Vec<String>,
}

impl HeaderCondition {
    pub fn new(header_name: &str, tokens: &AcceptedTokens) -> Self {
        Self {
            header_name: header_name.to_string(),
            values: tokens.to_vec(),
        }
    }

    pub fn into_rule_condition(self) -> RuleCondition {
        RuleCondition::builder()
            .field(HTTP_HEADER_FIELD)
            .http_header_config(
                HttpHeaderConditionConfig::builder()
                    .http_header_name(self.header_name)
                    .set_values(Some(self.values))
                    .build(),
            )
            .build()
    }
}

/// Sets which header values the load balancer listener rule accepts
pub struct ElbListenerModifier {
    client: Client,
    config: ListenerRuleConfig,
}

impl ElbListenerModifier {
    pub fn new(client: Client, config: ListenerRuleConfig) -> Self {
        Self { client, config }
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig, config: ListenerRuleConfig) -> Self {
        Self::new(Client::new(sdk_config), config)
    }
}

#[async_trait]
impl RuleModifier for ElbListenerModifier {
    fn target(&self) -> RuleTarget {
        RuleTarget::Listener
    }

    /// ModifyRule replaces the rule's whole condition list; the header
    /// condition is the only one the rule carries.
    async fn set_accepted_tokens(
        &self,
        tokens: &AcceptedTokens,
    ) -> Result<CallOutcome, ModifierError> {
        let condition = HeaderCondition::new(&self.config.header_name, tokens);
        debug!(rule_arn = %self.config.rule_arn, tokens = tokens.len(), "ModifyRule");

        let result = self
            .client
            .modify_rule()
            .rule_arn(&self.config.rule_arn)
            .conditions(condition.into_rule_condition())
            .send()
            .await;

        let outcome = match result {
            Ok(_) => CallOutcome::from_status(200, ""),
            Err(err) => {
                // A service error carries the HTTP status the API answered with;
                // anything else never produced a usable response.
                let Some(service_error) = err.as_service_error() else {
                    return Err(ModifierError::Transport(DisplayErrorContext(&err).to_string()));
                };
                let status = err.raw_response().map_or(0, |r| r.status().as_u16());
                let detail = format!(
                    "{}: {}",
                    service_error.code().unwrap_or("Unknown"),
                    service_error.message().unwrap_or_default()
                );
                CallOutcome::from_status(status, detail)
            }
        };

        info!(rule_arn = %self.config.rule_arn, outcome = %outcome, "Listener rule updated");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::BehaviorVersion;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RULE_ARN: &str =
        "arn:aws:elasticloadbalancing:us-east-1:000000000000:listener-rule/app/lb/1/2/3";

    const MODIFY_RULE_OK: &str = r#"<ModifyRuleResponse xmlns="http://elasticloadbalancing.amazonaws.com/doc/2015-12-01/">
  <ModifyRuleResult>
    <Rules/>
  </ModifyRuleResult>
  <ResponseMetadata>
    <RequestId>8f3c5b1a-0000-0000-0000-000000000000</RequestId>
  </ResponseMetadata>
</ModifyRuleResponse>"#;

    const RULE_NOT_FOUND: &str = r#"<ErrorResponse xmlns="http://elasticloadbalancing.amazonaws.com/doc/2015-12-01/">
  <Error>
    <Type>Sender</Type>
    <Code>RuleNotFound</Code>
    <Message>One or more rules not found</Message>
  </Error>
  <RequestId>8f3c5b1a-0000-0000-0000-000000000001</RequestId>
</ErrorResponse>"#;

    async fn create_test_client(endpoint: String) -> Client {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .credentials_provider(aws_sdk_elasticloadbalancingv2::config::Credentials::new(
                "test", "test", None, None, "test",
            ))
            .region(aws_sdk_elasticloadbalancingv2::config::Region::new("us-east-1"))
            .load()
            .await;

        Client::new(&config)
    }

    fn rule_config() -> ListenerRuleConfig {
        ListenerRuleConfig {
            rule_arn: RULE_ARN.to_string(),
            header_name: "X-ALB-SECRET".to_string(),
        }
    }

    #[test]
    fn test_header_condition_keeps_token_order() {
        let tokens = AcceptedTokens::widen("old123", "new456").unwrap();
        let condition = HeaderCondition::new("X-ALB-SECRET", &tokens);

        assert_eq!(condition.header_name, "X-ALB-SECRET");
        assert_eq!(condition.values, vec!["old123".to_string(), "new456".to_string()]);
    }

    #[tokio::test]
    async fn test_modify_rule_success_is_status_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Action=ModifyRule"))
            .and(body_string_contains("HttpHeaderConfig.Values.member.1=old123"))
            .and(body_string_contains("HttpHeaderConfig.Values.member.2=new456"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(MODIFY_RULE_OK, "text/xml"))
            .expect(1)
            .mount(&server)
            .await;

        let modifier = ElbListenerModifier::new(create_test_client(server.uri()).await, rule_config());
        let outcome = modifier
            .set_accepted_tokens(&AcceptedTokens::widen("old123", "new456").unwrap())
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(modifier.target(), RuleTarget::Listener);
    }

    #[tokio::test]
    async fn test_service_error_is_unsuccessful_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_raw(RULE_NOT_FOUND, "text/xml"))
            .mount(&server)
            .await;

        let modifier = ElbListenerModifier::new(create_test_client(server.uri()).await, rule_config());
        let outcome = modifier
            .set_accepted_tokens(&AcceptedTokens::single("new456").unwrap())
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.to_string(), "status 400 (RuleNotFound: One or more rules not found)");
    }
}
