use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::candidate::Candidate;
use crate::models::question::Question;
use crate::models::session::{SessionStep, TestOutcome};
use crate::models::test::{CurrentTest, TestInfo};
use crate::session::SessionMachine;
use crate::timer::QuizTimer;
use crate::utils::time::format_clock;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(length(min = 1, max = 32))]
    pub identity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub step: SessionStep,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerRequest {
    pub question_index: usize,
    #[validate(length(min = 1))]
    pub option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub saved: bool,
    pub question_index: usize,
    pub option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagResponse {
    pub question_index: usize,
    pub flagged: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinishRequest {
    #[serde(default)]
    pub confirm_unanswered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub test_id: String,
    pub total_questions: usize,
    pub questions: Vec<Question>,
}

/// Everything a client needs to render the current step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub step: SessionStep,
    pub created_at: DateTime<Utc>,
    pub candidate: Option<Candidate>,
    pub tests: Vec<TestInfo>,
    pub current_test: Option<CurrentTest>,
    pub is_last_test: bool,
    pub questions: Vec<Question>,
    pub answers: BTreeMap<usize, String>,
    pub flags: BTreeMap<usize, bool>,
    pub unanswered: Vec<usize>,
    pub time_remaining_seconds: Option<u32>,
    pub time_remaining_display: Option<String>,
    pub outcomes: Vec<TestOutcome>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set when a background transition (timer expiry) failed.
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn capture(
        session_id: Uuid,
        created_at: DateTime<Utc>,
        machine: &SessionMachine,
        timer: Option<&QuizTimer>,
        last_error: Option<&str>,
    ) -> Self {
        let current_test = machine.current_test().cloned();
        let time_remaining_seconds = match (&current_test, timer) {
            (Some(_), Some(timer)) => Some(timer.remaining()),
            _ => None,
        };
        Self {
            session_id,
            step: machine.step(),
            created_at,
            candidate: machine.candidate().cloned(),
            tests: machine.tests().to_vec(),
            is_last_test: current_test.as_ref().map(|c| c.is_last()).unwrap_or(false),
            current_test,
            questions: machine.questions().to_vec(),
            answers: machine.sheet().answers().clone(),
            flags: machine.sheet().flags().clone(),
            unanswered: machine.unanswered(),
            time_remaining_display: time_remaining_seconds.map(format_clock),
            time_remaining_seconds,
            outcomes: machine.outcomes().to_vec(),
            completed_at: machine.completed_at(),
            last_error: last_error.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{demo_candidate, demo_tests};

    #[test]
    fn login_snapshot_is_empty() {
        let m = SessionMachine::new();
        let snap = SessionSnapshot::capture(Uuid::new_v4(), Utc::now(), &m, None, None);
        assert_eq!(snap.step, SessionStep::Login);
        assert!(snap.current_test.is_none());
        assert!(snap.time_remaining_seconds.is_none());
    }

    #[test]
    fn answers_serialize_with_index_keys() {
        let mut m = SessionMachine::new();
        m.verified(demo_candidate(), demo_tests());
        m.start(vec![Question {
            text: "Q1".into(),
            options: vec!["A".into(), "B".into()],
        }])
        .unwrap();
        m.answer(0, "B").unwrap();

        let snap = SessionSnapshot::capture(Uuid::new_v4(), Utc::now(), &m, None, None);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["answers"]["0"], "B");
        assert_eq!(json["step"], "quiz");
        assert_eq!(json["current_test"]["id"], "disc");
        assert_eq!(json["current_test"]["index"], 0);
    }

    #[test]
    fn identity_must_not_be_empty() {
        let req = VerifyRequest {
            identity: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
