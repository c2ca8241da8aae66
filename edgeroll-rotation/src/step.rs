//! Rotation steps and trigger events

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use edgeroll_core::RotationError;

/// One step of the rotation state machine, in protocol order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationStep {
    CreateSecret,
    SetSecret,
    TestSecret,
    FinishSecret,
}

impl RotationStep {
    pub const ALL: [RotationStep; 4] = [
        Self::CreateSecret,
        Self::SetSecret,
        Self::TestSecret,
        Self::FinishSecret,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateSecret => "createSecret",
            Self::SetSecret => "setSecret",
            Self::TestSecret => "testSecret",
            Self::FinishSecret => "finishSecret",
        }
    }
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotationStep {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| RotationError::UnknownStep(s.to_string()))
    }
}

/// Step request delivered by the rotation trigger
///
/// `step` stays a string so an unrecognized value surfaces as
/// [`RotationError::UnknownStep`] rather than a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RotationEvent {
    pub secret_id: String,
    pub client_request_token: String,
    pub step: String,
}

impl RotationEvent {
    pub fn new(secret_id: impl Into<String>, token: impl Into<String>, step: RotationStep) -> Self {
        Self {
            secret_id: secret_id.into(),
            client_request_token: token.into(),
            step: step.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names_parse() {
        for step in RotationStep::ALL {
            assert_eq!(step.as_str().parse::<RotationStep>().unwrap(), step);
        }
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        let err = "rollbackSecret".parse::<RotationStep>().unwrap_err();
        assert!(matches!(err, RotationError::UnknownStep(ref s) if s == "rollbackSecret"));
        assert!("CreateSecret".parse::<RotationStep>().is_err());
    }

    #[test]
    fn test_event_uses_trigger_field_names() {
        let event: RotationEvent = serde_json::from_str(
            r#"{"SecretId": "arn:secret", "ClientRequestToken": "req1", "Step": "setSecret"}"#,
        )
        .unwrap();

        assert_eq!(event, RotationEvent::new("arn:secret", "req1", RotationStep::SetSecret));
    }
}
