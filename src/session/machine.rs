use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::answer::AnswerSheet;
use crate::models::candidate::Candidate;
use crate::models::question::Question;
use crate::models::session::{EndedBy, SessionStep, TestOutcome};
use crate::models::test::{CurrentTest, TestInfo};

/// Where the session goes after the current test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Test { index: usize, info: TestInfo },
    Complete,
    /// Already completed; nothing left to do.
    Stay,
}

/// State of one candidate's pass through verification, briefing, the
/// assigned tests and completion.
///
/// Transitions that need data (questions of the next test) are split in two:
/// a read-only plan (`first_test`, `next_plan`, `expiry_plan`) and a commit
/// that takes the loaded data. A commit validates everything before it
/// mutates, so a failed load leaves the session as it was.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    step: SessionStep,
    candidate: Option<Candidate>,
    tests: Vec<TestInfo>,
    current: Option<CurrentTest>,
    questions: Vec<Question>,
    sheet: AnswerSheet,
    epoch: u64,
    outcomes: Vec<TestOutcome>,
    completed_at: Option<DateTime<Utc>>,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            step: SessionStep::Login,
            candidate: None,
            tests: Vec::new(),
            current: None,
            questions: Vec::new(),
            sheet: AnswerSheet::new(),
            epoch: 0,
            outcomes: Vec::new(),
            completed_at: None,
        }
    }

    pub fn step(&self) -> SessionStep {
        self.step
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        self.candidate.as_ref()
    }

    pub fn tests(&self) -> &[TestInfo] {
        &self.tests
    }

    /// Present only in `quiz` and `finished`.
    pub fn current_test(&self) -> Option<&CurrentTest> {
        match self.step {
            SessionStep::Quiz | SessionStep::Finished => self.current.as_ref(),
            _ => None,
        }
    }

    pub fn questions(&self) -> &[Question] {
        match self.step {
            SessionStep::Quiz | SessionStep::Finished => &self.questions,
            _ => &[],
        }
    }

    pub fn sheet(&self) -> &AnswerSheet {
        &self.sheet
    }

    /// Identifies the current test attempt. Bumped every time a test is entered.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Question indices of the current test that have no answer yet.
    pub fn unanswered(&self) -> Vec<usize> {
        match self.step {
            SessionStep::Quiz | SessionStep::Finished => self.sheet.unanswered(self.questions.len()),
            _ => Vec::new(),
        }
    }

    /// Identity verified. Valid from any step: verifying again restarts the session.
    pub fn verified(&mut self, candidate: Candidate, tests: Vec<TestInfo>) {
        *self = Self {
            step: SessionStep::Reminder,
            candidate: Some(candidate),
            tests,
            epoch: self.epoch,
            ..Self::new()
        };
    }

    /// Back to `login` with everything cleared.
    pub fn reset(&mut self) {
        *self = Self {
            epoch: self.epoch,
            ..Self::new()
        };
    }

    /// The test `start` will load.
    pub fn first_test(&self) -> Result<&TestInfo> {
        self.require(SessionStep::Reminder, "start the tests")?;
        self.tests.first().ok_or(Error::NoTestsAssigned)
    }

    /// `reminder → quiz` with the first test's questions. Returns its duration in seconds.
    pub fn start(&mut self, questions: Vec<Question>) -> Result<u32> {
        self.first_test()?;
        self.enter_test(0, questions)
    }

    /// `quiz → finished`. Whether unanswered questions are acceptable is the caller's call.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<TestOutcome> {
        self.require(SessionStep::Quiz, "finish the test")?;
        let outcome = self.close_current(EndedBy::Finished, now);
        self.step = SessionStep::Finished;
        Ok(outcome)
    }

    /// What `next` does from here.
    pub fn next_plan(&self) -> Result<Advance> {
        match self.step {
            SessionStep::Completed => Ok(Advance::Stay),
            SessionStep::Finished => Ok(self.following()),
            from => Err(Error::InvalidTransition {
                from,
                action: "move to the next test",
            }),
        }
    }

    /// What a timer expiry for attempt `epoch` does, or `None` if that attempt is no longer active.
    pub fn expiry_plan(&self, epoch: u64) -> Option<Advance> {
        if self.step == SessionStep::Quiz && self.epoch == epoch {
            Some(self.following())
        } else {
            None
        }
    }

    /// `finished → quiz` for the test at `index`.
    pub fn enter_next(&mut self, index: usize, questions: Vec<Question>) -> Result<u32> {
        self.require(SessionStep::Finished, "move to the next test")?;
        self.require_following(index)?;
        self.enter_test(index, questions)
    }

    /// `finished → completed`. A no-op once completed.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.step == SessionStep::Completed {
            return Ok(());
        }
        self.require(SessionStep::Finished, "complete the session")?;
        self.require_last()?;
        self.mark_completed(now);
        Ok(())
    }

    /// Timer ran out: skip `finished` and go straight to the test at `index`.
    pub fn expire_into_next(
        &mut self,
        epoch: u64,
        index: usize,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Result<u32> {
        self.require_attempt(epoch)?;
        self.require_following(index)?;
        self.require_questions(index, &questions)?;
        self.close_current(EndedBy::Expired, now);
        self.enter_test(index, questions)
    }

    /// Timer ran out on the last test.
    pub fn expire_into_completion(&mut self, epoch: u64, now: DateTime<Utc>) -> Result<()> {
        self.require_attempt(epoch)?;
        self.require_last()?;
        self.close_current(EndedBy::Expired, now);
        self.mark_completed(now);
        Ok(())
    }

    /// Timer ran out but the following test could not be loaded: end the
    /// attempt in `finished` so `next` can retry the load.
    pub fn expire_into_finished(&mut self, epoch: u64, now: DateTime<Utc>) -> Result<TestOutcome> {
        self.require_attempt(epoch)?;
        let outcome = self.close_current(EndedBy::Expired, now);
        self.step = SessionStep::Finished;
        Ok(outcome)
    }

    pub fn answer(&mut self, index: usize, option: &str) -> Result<()> {
        self.require(SessionStep::Quiz, "answer a question")?;
        let question = self.question(index)?;
        if !question.has_option(option) {
            return Err(Error::BadRequest(format!(
                "Option {} is not available for question {}",
                option, index
            )));
        }
        self.sheet.record(index, option);
        Ok(())
    }

    /// Flips the review flag and returns its new value.
    pub fn toggle_flag(&mut self, index: usize) -> Result<bool> {
        self.require(SessionStep::Quiz, "flag a question")?;
        self.question(index)?;
        Ok(self.sheet.toggle_flag(index))
    }

    fn question(&self, index: usize) -> Result<&Question> {
        self.questions.get(index).ok_or_else(|| {
            Error::BadRequest(format!(
                "Question index {} is out of range (0..{})",
                index,
                self.questions.len()
            ))
        })
    }

    fn following(&self) -> Advance {
        let next = self.current.as_ref().map(|c| c.index + 1).unwrap_or(0);
        match self.tests.get(next) {
            Some(info) => Advance::Test {
                index: next,
                info: info.clone(),
            },
            None => Advance::Complete,
        }
    }

    fn require(&self, step: SessionStep, action: &'static str) -> Result<()> {
        if self.step == step {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.step,
                action,
            })
        }
    }

    fn require_attempt(&self, epoch: u64) -> Result<()> {
        self.require(SessionStep::Quiz, "expire the test")?;
        if self.epoch != epoch {
            return Err(Error::Internal(format!(
                "Expiry for attempt {} arrived during attempt {}",
                epoch, self.epoch
            )));
        }
        Ok(())
    }

    fn require_following(&self, index: usize) -> Result<()> {
        match self.following() {
            Advance::Test { index: expected, .. } if expected == index => Ok(()),
            _ => Err(Error::BadRequest(format!(
                "Test index {} does not follow the current test",
                index
            ))),
        }
    }

    fn require_last(&self) -> Result<()> {
        match self.following() {
            Advance::Complete => Ok(()),
            _ => Err(Error::BadRequest("Tests remain to be taken".to_string())),
        }
    }

    fn require_questions(&self, index: usize, questions: &[Question]) -> Result<()> {
        let info = self
            .tests
            .get(index)
            .ok_or_else(|| Error::BadRequest(format!("No test at index {}", index)))?;
        if questions.is_empty() {
            return Err(Error::EmptyQuestionSet(info.id.clone()));
        }
        Ok(())
    }

    fn enter_test(&mut self, index: usize, questions: Vec<Question>) -> Result<u32> {
        self.require_questions(index, &questions)?;
        let info = self.tests[index].clone();
        let duration = info.duration_secs();
        self.current = Some(CurrentTest {
            info,
            index,
            total: self.tests.len(),
        });
        self.questions = questions;
        self.sheet = AnswerSheet::new();
        self.epoch += 1;
        self.step = SessionStep::Quiz;
        Ok(duration)
    }

    fn close_current(&mut self, ended_by: EndedBy, now: DateTime<Utc>) -> TestOutcome {
        let outcome = TestOutcome {
            test_id: self
                .current
                .as_ref()
                .map(|c| c.info.id.clone())
                .unwrap_or_default(),
            answered: self.sheet.answered_count(),
            flagged: self.sheet.flagged_count(),
            total_questions: self.questions.len(),
            ended_by,
            ended_at: now,
        };
        self.outcomes.push(outcome.clone());
        outcome
    }

    fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.step = SessionStep::Completed;
        self.current = None;
        self.questions.clear();
        self.sheet = AnswerSheet::new();
        self.completed_at = Some(now);
    }
}
