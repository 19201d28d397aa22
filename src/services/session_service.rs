use std::sync::Arc;

use crate::utils::time::now;

use crate::error::{Error, Result};
use crate::models::candidate::VerifiedCandidate;
use crate::models::question::Question;
use crate::models::session::{SessionStep, TestOutcome};
use crate::session::{Advance, SessionMachine};
use crate::store::{CandidateStore, QuestionStore};

/// Result of a transition that may (re)enter a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A test was entered; its timer should run for this many seconds.
    Quiz { epoch: u64, duration_secs: u32 },
    Completed,
    /// Time ran out but the following test failed to load. The attempt was
    /// closed and the session waits in `finished` for `next` to retry.
    Interrupted { reason: String },
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    Finished(TestOutcome),
    /// Unanswered questions remain and the candidate has not confirmed.
    NeedsConfirmation { unanswered: Vec<usize> },
}

/// Drives a [`SessionMachine`] against the candidate and question stores.
#[derive(Clone)]
pub struct SessionService {
    candidates: Arc<dyn CandidateStore>,
    questions: Arc<dyn QuestionStore>,
}

impl SessionService {
    pub fn new(candidates: Arc<dyn CandidateStore>, questions: Arc<dyn QuestionStore>) -> Self {
        Self {
            candidates,
            questions,
        }
    }

    pub async fn lookup(&self, identity: &str) -> Result<VerifiedCandidate> {
        let identity = identity.trim();
        let candidate = self
            .candidates
            .find_candidate(identity)
            .await?
            .ok_or_else(|| Error::NotRegistered(identity.to_string()))?;
        let tests = self.candidates.tests_for(identity).await?;
        Ok(VerifiedCandidate { candidate, tests })
    }

    /// On failure the machine is left untouched.
    pub async fn verify(
        &self,
        machine: &mut SessionMachine,
        identity: &str,
    ) -> Result<VerifiedCandidate> {
        let verified = match self.lookup(identity).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "Verification failed");
                return Err(e);
            }
        };
        machine.verified(verified.candidate.clone(), verified.tests.clone());
        tracing::info!(
            identity = %verified.candidate.identity,
            tests = verified.tests.len(),
            "Candidate verified"
        );
        Ok(verified)
    }

    pub async fn questions(&self, test_id: &str) -> Result<Vec<Question>> {
        self.questions.questions_for(test_id).await
    }

    pub async fn start(&self, machine: &mut SessionMachine) -> Result<Transition> {
        let first = machine.first_test()?.clone();
        let questions = self.questions(&first.id).await?;
        let duration_secs = machine.start(questions)?;
        tracing::info!(test_id = %first.id, duration_secs, "Test started");
        Ok(Transition::Quiz {
            epoch: machine.epoch(),
            duration_secs,
        })
    }

    pub fn finish(
        &self,
        machine: &mut SessionMachine,
        confirm_unanswered: bool,
    ) -> Result<FinishOutcome> {
        if machine.step() == SessionStep::Quiz && !confirm_unanswered {
            let unanswered = machine.unanswered();
            if !unanswered.is_empty() {
                return Ok(FinishOutcome::NeedsConfirmation { unanswered });
            }
        }
        let outcome = machine.finish(now())?;
        tracing::info!(
            test_id = %outcome.test_id,
            answered = outcome.answered,
            total = outcome.total_questions,
            "Test finished"
        );
        Ok(FinishOutcome::Finished(outcome))
    }

    pub async fn next(&self, machine: &mut SessionMachine) -> Result<Transition> {
        match machine.next_plan()? {
            Advance::Stay => Ok(Transition::Unchanged),
            Advance::Complete => {
                machine.complete(now())?;
                tracing::info!("Session completed");
                Ok(Transition::Completed)
            }
            Advance::Test { index, info } => {
                let questions = self.questions(&info.id).await?;
                let duration_secs = machine.enter_next(index, questions)?;
                tracing::info!(test_id = %info.id, index, duration_secs, "Next test started");
                Ok(Transition::Quiz {
                    epoch: machine.epoch(),
                    duration_secs,
                })
            }
        }
    }

    /// Timer expiry for attempt `epoch`. Stale expiries are ignored.
    pub async fn expire(&self, machine: &mut SessionMachine, epoch: u64) -> Result<Transition> {
        let Some(plan) = machine.expiry_plan(epoch) else {
            tracing::debug!(epoch, "Ignoring expiry of an inactive attempt");
            return Ok(Transition::Unchanged);
        };
        match plan {
            Advance::Stay => Ok(Transition::Unchanged),
            Advance::Complete => {
                machine.expire_into_completion(epoch, now())?;
                tracing::info!("Time ran out on the last test, session completed");
                Ok(Transition::Completed)
            }
            Advance::Test { index, info } => {
                let entered = match self.questions(&info.id).await {
                    Ok(questions) => machine.expire_into_next(epoch, index, questions, now()),
                    Err(e) => Err(e),
                };
                match entered {
                    Ok(duration_secs) => {
                        tracing::info!(test_id = %info.id, index, "Time ran out, moved to next test");
                        Ok(Transition::Quiz {
                            epoch: machine.epoch(),
                            duration_secs,
                        })
                    }
                    Err(e) => {
                        machine.expire_into_finished(epoch, now())?;
                        tracing::warn!(test_id = %info.id, error = %e, "Time ran out and the next test failed to load");
                        Ok(Transition::Interrupted {
                            reason: e.to_string(),
                        })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{demo_candidate, demo_tests, DEMO_IDENTITY};
    use crate::store::{
        FixtureCandidateStore, FixtureQuestionStore, MockCandidateStore, MockQuestionStore,
    };
    use std::time::Duration;

    fn fixture_service() -> SessionService {
        SessionService::new(
            Arc::new(FixtureCandidateStore::seeded(Duration::ZERO)),
            Arc::new(FixtureQuestionStore::seeded(Duration::ZERO)),
        )
    }

    fn answer_all(machine: &mut SessionMachine) {
        let labels: Vec<String> = machine
            .questions()
            .iter()
            .map(|q| q.options[0].clone())
            .collect();
        for (i, label) in labels.iter().enumerate() {
            machine.answer(i, label).unwrap();
        }
    }

    #[tokio::test]
    async fn happy_path_runs_all_three_tests() {
        let svc = fixture_service();
        let mut m = SessionMachine::new();

        let verified = svc.verify(&mut m, DEMO_IDENTITY).await.unwrap();
        let durations: Vec<u32> = verified.tests.iter().map(|t| t.duration_minutes).collect();
        assert_eq!(durations, vec![10, 8, 5]);

        let started = svc.start(&mut m).await.unwrap();
        assert!(matches!(started, Transition::Quiz { duration_secs: 600, .. }));

        for expected in [480u32, 300] {
            answer_all(&mut m);
            let finished = svc.finish(&mut m, false).unwrap();
            assert!(matches!(finished, FinishOutcome::Finished(_)));
            assert_eq!(m.step(), SessionStep::Finished);
            let next = svc.next(&mut m).await.unwrap();
            assert!(
                matches!(next, Transition::Quiz { duration_secs, .. } if duration_secs == expected)
            );
        }

        answer_all(&mut m);
        svc.finish(&mut m, false).unwrap();
        assert_eq!(svc.next(&mut m).await.unwrap(), Transition::Completed);
        assert_eq!(m.step(), SessionStep::Completed);
        assert_eq!(svc.next(&mut m).await.unwrap(), Transition::Unchanged);
        assert_eq!(m.step(), SessionStep::Completed);
    }

    #[tokio::test]
    async fn unknown_identity_stays_in_login() {
        let svc = fixture_service();
        let mut m = SessionMachine::new();
        let err = svc.verify(&mut m, "000000").await.unwrap_err();
        assert!(matches!(err, Error::NotRegistered(ref id) if id == "000000"));
        assert_eq!(m.step(), SessionStep::Login);
    }

    #[tokio::test]
    async fn unanswered_finish_needs_confirmation() {
        let svc = fixture_service();
        let mut m = SessionMachine::new();
        svc.verify(&mut m, DEMO_IDENTITY).await.unwrap();
        svc.start(&mut m).await.unwrap();
        m.answer(0, "D").unwrap();

        match svc.finish(&mut m, false).unwrap() {
            FinishOutcome::NeedsConfirmation { unanswered } => {
                assert_eq!(unanswered.len(), 19);
                assert_eq!(unanswered[0], 1);
            }
            other => panic!("expected confirmation, got {:?}", other),
        }
        assert_eq!(m.step(), SessionStep::Quiz);

        let confirmed = svc.finish(&mut m, true).unwrap();
        let FinishOutcome::Finished(outcome) = confirmed else {
            panic!("expected finished");
        };
        assert_eq!((outcome.answered, outcome.total_questions), (1, 20));
        assert_eq!(m.step(), SessionStep::Finished);
    }

    #[tokio::test]
    async fn finish_outside_quiz_is_invalid_even_with_gaps() {
        let svc = fixture_service();
        let mut m = SessionMachine::new();
        svc.verify(&mut m, DEMO_IDENTITY).await.unwrap();
        svc.start(&mut m).await.unwrap();
        svc.finish(&mut m, true).unwrap();
        assert!(matches!(
            svc.finish(&mut m, false),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn expiry_on_second_test_goes_straight_to_third() {
        let svc = fixture_service();
        let mut m = SessionMachine::new();
        svc.verify(&mut m, DEMO_IDENTITY).await.unwrap();
        svc.start(&mut m).await.unwrap();
        svc.finish(&mut m, true).unwrap();
        svc.next(&mut m).await.unwrap();
        assert_eq!(m.current_test().unwrap().index, 1);
        m.answer(0, "A").unwrap();

        let epoch = m.epoch();
        let t = svc.expire(&mut m, epoch).await.unwrap();
        assert!(matches!(t, Transition::Quiz { duration_secs: 300, .. }));
        assert_eq!(m.step(), SessionStep::Quiz);
        assert_eq!(m.current_test().unwrap().info.id, "fast");
        assert!(m.sheet().is_empty());

        assert_eq!(svc.expire(&mut m, epoch).await.unwrap(), Transition::Unchanged);
        assert_eq!(m.current_test().unwrap().info.id, "fast");

        let last = m.epoch();
        assert_eq!(svc.expire(&mut m, last).await.unwrap(), Transition::Completed);
        assert_eq!(m.step(), SessionStep::Completed);
    }

    #[tokio::test]
    async fn test_without_questions_fails_fast() {
        let svc = SessionService::new(
            Arc::new(FixtureCandidateStore::seeded(Duration::ZERO)),
            Arc::new(FixtureQuestionStore::new(Duration::ZERO)),
        );
        let mut m = SessionMachine::new();
        svc.verify(&mut m, DEMO_IDENTITY).await.unwrap();
        let err = svc.start(&mut m).await.unwrap_err();
        assert!(matches!(err, Error::EmptyQuestionSet(ref id) if id == "disc"));
        assert_eq!(m.step(), SessionStep::Reminder);
    }

    #[tokio::test]
    async fn failed_lookup_does_not_fetch_tests_or_questions() {
        let mut candidates = MockCandidateStore::new();
        candidates
            .expect_find_candidate()
            .times(1)
            .returning(|_| Ok(None));
        candidates.expect_tests_for().never();
        let mut questions = MockQuestionStore::new();
        questions.expect_questions_for().never();

        let svc = SessionService::new(Arc::new(candidates), Arc::new(questions));
        let mut m = SessionMachine::new();
        assert!(svc.verify(&mut m, "42").await.is_err());
        assert_eq!(m.step(), SessionStep::Login);
    }

    #[tokio::test]
    async fn store_failure_propagates_and_keeps_reminder() {
        let mut candidates = MockCandidateStore::new();
        candidates
            .expect_find_candidate()
            .returning(|_| Ok(Some(demo_candidate())));
        candidates
            .expect_tests_for()
            .returning(|_| Ok(demo_tests()));
        let mut questions = MockQuestionStore::new();
        questions
            .expect_questions_for()
            .times(1)
            .returning(|_| Err(Error::Internal("question store unavailable".into())));

        let svc = SessionService::new(Arc::new(candidates), Arc::new(questions));
        let mut m = SessionMachine::new();
        svc.verify(&mut m, DEMO_IDENTITY).await.unwrap();
        assert!(matches!(svc.start(&mut m).await, Err(Error::Internal(_))));
        assert_eq!(m.step(), SessionStep::Reminder);
    }

    #[tokio::test]
    async fn expiry_with_failing_next_load_ends_attempt_in_finished() {
        let mut questions = MockQuestionStore::new();
        questions.expect_questions_for().returning(|id| {
            if id == "disc" {
                Ok(vec![Question {
                    text: "Q1".into(),
                    options: vec!["D".into(), "I".into()],
                }])
            } else {
                Err(Error::Internal("question store unavailable".into()))
            }
        });
        let svc = SessionService::new(
            Arc::new(FixtureCandidateStore::seeded(Duration::ZERO)),
            Arc::new(questions),
        );
        let mut m = SessionMachine::new();
        svc.verify(&mut m, DEMO_IDENTITY).await.unwrap();
        svc.start(&mut m).await.unwrap();

        let epoch = m.epoch();
        let t = svc.expire(&mut m, epoch).await.unwrap();
        assert!(matches!(t, Transition::Interrupted { ref reason } if reason.contains("unavailable")));
        assert_eq!(m.step(), SessionStep::Finished);
        assert_eq!(m.outcomes().len(), 1);

        assert!(matches!(svc.next(&mut m).await, Err(Error::Internal(_))));
        assert_eq!(m.step(), SessionStep::Finished);
    }

    #[tokio::test]
    async fn identity_is_trimmed_before_lookup() {
        let svc = fixture_service();
        let verified = svc.lookup(" 1234567890 ").await.unwrap();
        assert_eq!(verified.candidate.identity, DEMO_IDENTITY);
    }
}
