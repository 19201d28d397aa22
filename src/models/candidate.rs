use serde::{Deserialize, Serialize};

use super::test::TestInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateStatus {
    Active,
    Inactive,
    Pending,
}

/// Candidate profile as entered by HR. Read-only for the duration of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub identity: String,
    pub name: String,
    pub email: String,
    pub position: String,
    pub phone: String,
    pub status: CandidateStatus,
}

/// What a successful identity verification hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedCandidate {
    pub candidate: Candidate,
    pub tests: Vec<TestInfo>,
}
