use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStep {
    Login,
    Reminder,
    Quiz,
    Finished,
    Completed,
}

impl SessionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStep::Login => "login",
            SessionStep::Reminder => "reminder",
            SessionStep::Quiz => "quiz",
            SessionStep::Finished => "finished",
            SessionStep::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndedBy {
    Finished,
    Expired,
}

/// Summary kept for each test the candidate has left. Answers themselves are not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub test_id: String,
    pub answered: usize,
    pub flagged: usize,
    pub total_questions: usize,
    pub ended_by: EndedBy,
    pub ended_at: DateTime<Utc>,
}
