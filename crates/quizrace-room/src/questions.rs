//! The question bank: a fixed, ordered list of multiple-choice questions.

use std::collections::HashSet;

use quizrace_protocol::Question;

/// Problems found while loading a question bank.
#[derive(Debug, thiserror::Error)]
pub enum QuestionError {
    /// The question file is not valid JSON or doesn't match the schema.
    #[error("invalid question file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A question needs at least two choices to be a choice.
    #[error("question {id} has {count} choice(s), need at least 2")]
    TooFewChoices { id: u32, count: usize },

    /// The correct-choice index points past the end of `choices`.
    #[error("question {id} answer {answer} is out of range for {count} choices")]
    AnswerOutOfRange { id: u32, answer: usize, count: usize },

    /// Two questions share an id.
    #[error("duplicate question id {0}")]
    DuplicateId(u32),
}

/// Immutable, ordered question content shared by every room.
///
/// Rooms hold it behind an `Arc` and only ever look questions up by
/// position.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Builds a bank from questions, checking each one.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if q.choices.len() < 2 {
                return Err(QuestionError::TooFewChoices {
                    id: q.id,
                    count: q.choices.len(),
                });
            }
            if q.answer >= q.choices.len() {
                return Err(QuestionError::AnswerOutOfRange {
                    id: q.id,
                    answer: q.answer,
                    count: q.choices.len(),
                });
            }
            if !seen.insert(q.id) {
                return Err(QuestionError::DuplicateId(q.id));
            }
        }
        Ok(Self { questions })
    }

    /// Parses a JSON array of questions:
    ///
    /// ```json
    /// [{ "id": 1, "prompt": "2 + 2?", "choices": ["3", "4"], "answer": 1 }]
    /// ```
    pub fn from_json(data: &[u8]) -> Result<Self, QuestionError> {
        let questions: Vec<Question> = serde_json::from_slice(data)?;
        Self::new(questions)
    }

    /// The bundled general-knowledge set.
    pub fn builtin() -> Self {
        let questions = vec![
            question(1, "Which planet is known as the Red Planet?", &["Venus", "Mars", "Jupiter", "Mercury"], 1),
            question(2, "What is the largest ocean on Earth?", &["Atlantic", "Indian", "Arctic", "Pacific"], 3),
            question(3, "How many sides does a hexagon have?", &["5", "6", "7", "8"], 1),
            question(4, "Which gas do plants absorb from the air?", &["Carbon dioxide", "Oxygen", "Nitrogen", "Helium"], 0),
            question(5, "What is the chemical symbol for gold?", &["Ag", "Gd", "Au", "Go"], 2),
            question(6, "Who painted the Mona Lisa?", &["Michelangelo", "Raphael", "Donatello", "Leonardo da Vinci"], 3),
            question(7, "What is the capital of Japan?", &["Kyoto", "Osaka", "Tokyo", "Sapporo"], 2),
            question(8, "How many minutes are in a full day?", &["1440", "1200", "960", "2400"], 0),
            question(9, "Which is the smallest prime number?", &["0", "1", "2", "3"], 2),
            question(10, "What is the hardest natural substance?", &["Quartz", "Diamond", "Granite", "Titanium"], 1),
        ];
        Self { questions }
    }

    /// The question at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Number of questions.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Returns `true` if the bank holds no questions.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Iterates over the questions in order.
    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}

fn question(id: u32, prompt: &str, choices: &[&str], answer: usize) -> Question {
    Question {
        id,
        prompt: prompt.to_string(),
        choices: choices.iter().map(|c| c.to_string()).collect(),
        answer,
    }
}
