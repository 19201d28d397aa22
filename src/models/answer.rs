use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Answers and review flags for the active test attempt only.
///
/// Keys are question indices within the current test. A sheet is replaced,
/// never merged, when the session moves to another test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSheet {
    answers: BTreeMap<usize, String>,
    flags: BTreeMap<usize, bool>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, index: usize, option: impl Into<String>) {
        self.answers.insert(index, option.into());
    }

    /// Flips the marked-for-review flag and returns its new value.
    pub fn toggle_flag(&mut self, index: usize) -> bool {
        let flag = self.flags.entry(index).or_insert(false);
        *flag = !*flag;
        *flag
    }

    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    pub fn is_flagged(&self, index: usize) -> bool {
        self.flags.get(&index).copied().unwrap_or(false)
    }

    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    pub fn flags(&self) -> &BTreeMap<usize, bool> {
        &self.flags
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn flagged_count(&self) -> usize {
        self.flags.values().filter(|f| **f).count()
    }

    /// Indices in `0..question_count` that have no recorded answer.
    pub fn unanswered(&self, question_count: usize) -> Vec<usize> {
        (0..question_count)
            .filter(|i| !self.answers.contains_key(i))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_answer_wins() {
        let mut sheet = AnswerSheet::new();
        sheet.record(2, "A");
        sheet.record(2, "C");
        assert_eq!(sheet.answer(2), Some("C"));
        assert_eq!(sheet.answered_count(), 1);
    }

    #[test]
    fn toggling_twice_clears_the_flag() {
        let mut sheet = AnswerSheet::new();
        assert!(sheet.toggle_flag(4));
        assert!(sheet.is_flagged(4));
        assert!(!sheet.toggle_flag(4));
        assert_eq!(sheet.flagged_count(), 0);
    }

    #[test]
    fn unanswered_lists_gaps_in_order() {
        let mut sheet = AnswerSheet::new();
        sheet.record(0, "A");
        sheet.record(3, "B");
        assert_eq!(sheet.unanswered(5), vec![1, 2, 4]);
    }
}
