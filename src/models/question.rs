use serde::{Deserialize, Serialize};

/// A question as delivered to the candidate: text plus ordered option labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
}

impl Question {
    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|o| o == label)
    }
}

/// A question as stored in the bank, with the option record of its test type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankQuestion {
    pub text: String,
    #[serde(flatten)]
    pub options: QuestionOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuestionOptions {
    #[serde(rename = "DISC")]
    Disc(DiscOptions),
    #[serde(rename = "CAAS")]
    Caas(CaasOptions),
    #[serde(rename = "Fast Accuracy")]
    FastAccuracy(FastAccuracyOptions),
}

/// One statement per DISC dimension; there is no correct answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct DiscOptions {
    pub d: String,
    pub i: String,
    pub s: String,
    pub c: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct CaasOptions {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
    #[serde(default, rename = "answer")]
    pub answer: Option<CaasChoice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaasChoice {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastAccuracyOptions {
    #[serde(rename = "True")]
    pub true_statement: String,
    #[serde(rename = "False")]
    pub false_statement: String,
    #[serde(default)]
    pub answer: Option<bool>,
}

impl QuestionOptions {
    /// Option labels in the order they are shown to the candidate.
    pub fn labels(&self) -> Vec<String> {
        let labels: &[&str] = match self {
            QuestionOptions::Disc(_) => &["D", "I", "S", "C"],
            QuestionOptions::Caas(_) => &["A", "B", "C", "D"],
            QuestionOptions::FastAccuracy(_) => &["True", "False"],
        };
        labels.iter().map(|l| l.to_string()).collect()
    }
}

impl From<&BankQuestion> for Question {
    fn from(q: &BankQuestion) -> Self {
        Question {
            text: q.text.clone(),
            options: q.options.labels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bank_question_reads_tagged_option_record() {
        let raw = json!({
            "text": "Pick the statement closest to you",
            "type": "CAAS",
            "A": "Plan ahead",
            "B": "Explore",
            "C": "Decide",
            "D": "Stay curious",
            "answer": "B"
        });
        let q: BankQuestion = serde_json::from_value(raw).unwrap();
        match &q.options {
            QuestionOptions::Caas(opts) => {
                assert_eq!(opts.b, "Explore");
                assert_eq!(opts.answer, Some(CaasChoice::B));
            }
            other => panic!("expected CAAS options, got {:?}", other),
        }
        assert_eq!(Question::from(&q).options, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn fast_accuracy_delivers_true_false_labels() {
        let q = BankQuestion {
            text: "7 x 8 = 56".into(),
            options: QuestionOptions::FastAccuracy(FastAccuracyOptions {
                true_statement: "Correct".into(),
                false_statement: "Incorrect".into(),
                answer: Some(true),
            }),
        };
        let delivered = Question::from(&q);
        assert!(delivered.has_option("True"));
        assert!(!delivered.has_option("A"));
    }
}
