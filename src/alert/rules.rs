use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// When a failed iteration is reported to the chat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureAlertPolicy {
    #[default]
    Always,
    OnChange,
    Never,
}

impl FailureAlertPolicy {
    pub fn should_send(&self, text: &str, last_sent: Option<&str>) -> bool {
        match self {
            Self::Always => true,
            Self::OnChange => last_sent != Some(text),
            Self::Never => false,
        }
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::OnChange => "on_change",
            Self::Never => "never",
        }
    }
}

impl Display for FailureAlertPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown failure alert policy: {0}")]
pub struct FailureAlertPolicyParseError(pub String);

impl FromStr for FailureAlertPolicy {
    type Err = FailureAlertPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always" => Ok(Self::Always),
            "on_change" => Ok(Self::OnChange),
            "never" | "off" => Ok(Self::Never),
            _ => Err(FailureAlertPolicyParseError(s.to_string())),
        }
    }
}

pub fn failure_message(error: &impl Display) -> String {
    format!("Program failure: {error}")
}
