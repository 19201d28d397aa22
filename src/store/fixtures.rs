use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::{CandidateStore, QuestionStore};
use crate::error::Result;
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::models::question::{
    BankQuestion, CaasOptions, DiscOptions, FastAccuracyOptions, Question, QuestionOptions,
};
use crate::models::test::TestInfo;

pub const DEMO_IDENTITY: &str = "1234567890";

async fn simulate_latency(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixtureCandidateStore {
    entries: Vec<(Candidate, Vec<TestInfo>)>,
    delay: Duration,
}

impl FixtureCandidateStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            entries: Vec::new(),
            delay,
        }
    }

    /// The demo candidate with the DISC, CAAS and Fast Accuracy tests.
    pub fn seeded(delay: Duration) -> Self {
        Self::new(delay).with_candidate(demo_candidate(), demo_tests())
    }

    pub fn with_candidate(mut self, candidate: Candidate, tests: Vec<TestInfo>) -> Self {
        self.entries.retain(|(c, _)| c.identity != candidate.identity);
        self.entries.push((candidate, tests));
        self
    }

    fn lookup(&self, identity: &str) -> Option<&(Candidate, Vec<TestInfo>)> {
        self.entries.iter().find(|(c, _)| c.identity == identity)
    }
}

#[async_trait]
impl CandidateStore for FixtureCandidateStore {
    async fn find_candidate(&self, identity: &str) -> Result<Option<Candidate>> {
        simulate_latency(self.delay).await;
        Ok(self.lookup(identity).map(|(c, _)| c.clone()))
    }

    async fn tests_for(&self, identity: &str) -> Result<Vec<TestInfo>> {
        simulate_latency(self.delay).await;
        Ok(self
            .lookup(identity)
            .map(|(_, tests)| tests.clone())
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixtureQuestionStore {
    bank: HashMap<String, Vec<BankQuestion>>,
    delay: Duration,
}

impl FixtureQuestionStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            bank: HashMap::new(),
            delay,
        }
    }

    pub fn seeded(delay: Duration) -> Self {
        Self::new(delay)
            .with_questions("disc", disc_questions(20))
            .with_questions("caas", caas_questions(15))
            .with_questions("fast", fast_accuracy_questions(10))
    }

    pub fn with_questions(mut self, test_id: impl Into<String>, questions: Vec<BankQuestion>) -> Self {
        self.bank.insert(test_id.into(), questions);
        self
    }
}

#[async_trait]
impl QuestionStore for FixtureQuestionStore {
    async fn questions_for(&self, test_id: &str) -> Result<Vec<Question>> {
        simulate_latency(self.delay).await;
        Ok(self
            .bank
            .get(test_id)
            .map(|qs| qs.iter().map(Question::from).collect())
            .unwrap_or_default())
    }
}

pub fn demo_candidate() -> Candidate {
    Candidate {
        identity: DEMO_IDENTITY.to_string(),
        name: "Test User".to_string(),
        email: "test@example.com".to_string(),
        position: "UI/UX Design".to_string(),
        phone: "0812345678".to_string(),
        status: CandidateStatus::Active,
    }
}

pub fn demo_tests() -> Vec<TestInfo> {
    vec![
        test_info("disc", "DISC Assessment", 20, 10),
        test_info("caas", "CAAS Evaluation", 15, 8),
        test_info("fast", "Fast Accuracy", 10, 5),
    ]
}

fn test_info(id: &str, name: &str, question_count: usize, duration_minutes: u32) -> TestInfo {
    TestInfo {
        id: id.to_string(),
        name: name.to_string(),
        question_count,
        duration_minutes,
    }
}

fn disc_questions(count: usize) -> Vec<BankQuestion> {
    (1..=count)
        .map(|n| BankQuestion {
            text: format!("DISC Statement {}", n),
            options: QuestionOptions::Disc(DiscOptions {
                d: "I take charge when things stall".to_string(),
                i: "I get people excited about ideas".to_string(),
                s: "I keep the team steady".to_string(),
                c: "I check the details twice".to_string(),
            }),
        })
        .collect()
}

fn caas_questions(count: usize) -> Vec<BankQuestion> {
    (1..=count)
        .map(|n| BankQuestion {
            text: format!("CAAS Question {}", n),
            options: QuestionOptions::Caas(CaasOptions {
                a: "Not strong".to_string(),
                b: "Somewhat strong".to_string(),
                c: "Strong".to_string(),
                d: "Very strong".to_string(),
                answer: None,
            }),
        })
        .collect()
}

fn fast_accuracy_questions(count: usize) -> Vec<BankQuestion> {
    (1..=count)
        .map(|n| BankQuestion {
            text: format!("Fast Question {}: {} + {} = {}", n, n, n, n * 2),
            options: QuestionOptions::FastAccuracy(FastAccuracyOptions {
                true_statement: "Correct".to_string(),
                false_statement: "Incorrect".to_string(),
                answer: Some(true),
            }),
        })
        .collect()
}
