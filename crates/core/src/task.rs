//! Task status lifecycle and field validation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Maximum length of a task title.
pub const MAX_TITLE_LEN: usize = 100;

/// Maximum length of a task description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Task workflow status.
///
/// New tasks always start in `New`; any status may be set on update. This is a
/// workflow label, not a state machine — the only real state machine is the
/// tombstone lifecycle in the store layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    New,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Parse a status from its wire/storage representation.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a task title: 1..=100 characters.
pub fn validate_title(title: &str) -> Result<()> {
    let len = title.chars().count();
    if len == 0 {
        return Err(Error::InvalidTitle("title must not be empty".to_string()));
    }
    if len > MAX_TITLE_LEN {
        return Err(Error::InvalidTitle(format!(
            "title exceeds {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a task description: at most 500 characters.
pub fn validate_description(description: &str) -> Result<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(Error::InvalidDescription(format!(
            "description exceeds {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [TaskStatus::New, TaskStatus::InProgress, TaskStatus::Done] {
            assert_eq!(TaskStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn status_rejects_unknown() {
        assert!(TaskStatus::parse("cancelled").is_err());
        assert!(TaskStatus::parse("").is_err());
    }

    #[test]
    fn status_serde_uses_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn title_bounds() {
        assert!(validate_title("a").is_ok());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn description_bounds() {
        assert!(validate_description("").is_ok());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_LEN)).is_ok());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_LEN + 1)).is_err());
    }
}
