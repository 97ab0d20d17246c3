use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::error::PollError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewStatus {
    Approved,
    Reviewing,
    Rejected,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 3] = [
        ReviewStatus::Approved,
        ReviewStatus::Reviewing,
        ReviewStatus::Rejected,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Reviewing => "reviewing",
            Self::Rejected => "rejected",
        }
    }

    pub fn verdict(&self) -> &'static str {
        match self {
            Self::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            Self::Reviewing => "Работа взята на проверку ревьюером.",
            Self::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

impl Display for ReviewStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown review status: {0}")]
pub struct ReviewStatusParseError(pub String);

impl FromStr for ReviewStatus {
    type Err = ReviewStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "reviewing" => Ok(Self::Reviewing),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ReviewStatusParseError(s.to_string())),
        }
    }
}

/// One homework record reduced to the fields the bot cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Homework {
    pub name: String,
    pub status: ReviewStatus,
}

impl Homework {
    pub fn from_record(record: &Value) -> Result<Self, PollError> {
        let name = record
            .get("homework_name")
            .and_then(Value::as_str)
            .ok_or(PollError::MissingField("homework_name"))?;
        let status = record
            .get("status")
            .and_then(Value::as_str)
            .ok_or(PollError::MissingField("status"))?;
        let status = ReviewStatus::from_str(status)
            .map_err(|err| PollError::UnknownStatus(err.0))?;
        Ok(Self {
            name: name.to_string(),
            status,
        })
    }

    pub fn message(&self) -> String {
        format!(
            "Changed review status for \"{}\". {}",
            self.name,
            self.status.verdict()
        )
    }
}

pub fn extract_message(record: &Value) -> Result<String, PollError> {
    Homework::from_record(record).map(|homework| homework.message())
}
