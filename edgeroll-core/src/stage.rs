//! Secret version stage labels

use std::fmt;
use std::str::FromStr;

/// Stage label attached to a secret version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Pending,
    Current,
    Previous,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "AWSPENDING",
            Self::Current => "AWSCURRENT",
            Self::Previous => "AWSPREVIOUS",
        }
    }

    /// Whether `labels` (as reported by a store) carry this stage
    pub fn is_in<S: AsRef<str>>(&self, labels: &[S]) -> bool {
        labels.iter().any(|l| l.as_ref() == self.as_str())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWSPENDING" => Ok(Self::Pending),
            "AWSCURRENT" => Ok(Self::Current),
            "AWSPREVIOUS" => Ok(Self::Previous),
            other => Err(format!("Unknown version stage: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels_roundtrip() {
        for stage in [Stage::Pending, Stage::Current, Stage::Previous] {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
    }

    #[test]
    fn test_custom_labels_are_not_stages() {
        assert!("CUSTOM".parse::<Stage>().is_err());
        let labels = vec!["CUSTOM".to_string(), "AWSPREVIOUS".to_string()];
        assert!(Stage::Previous.is_in(&labels));
        assert!(!Stage::Current.is_in(&labels));
    }
}
