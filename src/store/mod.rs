//! Read-only lookups behind which the session logic sits.
//!
//! The fixture implementations serve fixed in-memory data; a database-backed
//! store only has to implement these two traits.

pub mod fixtures;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::candidate::Candidate;
use crate::models::question::Question;
use crate::models::test::TestInfo;

pub use fixtures::{FixtureCandidateStore, FixtureQuestionStore};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// `None` when the identity is unknown.
    async fn find_candidate(&self, identity: &str) -> Result<Option<Candidate>>;

    /// Tests assigned to the identity, in the order they are taken. Empty when unknown.
    async fn tests_for(&self, identity: &str) -> Result<Vec<TestInfo>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Questions of a test in display order. Empty when the test id is unknown.
    async fn questions_for(&self, test_id: &str) -> Result<Vec<Question>>;
}
