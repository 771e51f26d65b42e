// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generated practice quizzes and their grading.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    ShortAnswer,
    /// Anything else the model invents; graded like a short answer.
    #[serde(other)]
    Other,
}

impl QuestionType {
    /// Choice questions need the exact option text.
    fn exact_match(self) -> bool {
        matches!(self, QuestionType::Mcq | QuestionType::TrueFalse)
    }
}

/// One question as the model returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub question: String,
    /// Only present for choice questions
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl QuizQuestion {
    pub fn is_correct(&self, given: &str) -> bool {
        if self.kind.exact_match() {
            given == self.answer
        } else {
            given.to_lowercase() == self.answer.to_lowercase()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedAnswer {
    pub question: String,
    pub given: String,
    pub expected: String,
    pub explanation: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResult {
    pub answers: Vec<GradedAnswer>,
    pub correct: usize,
    pub total: usize,
}

impl QuizResult {
    /// Rounded percentage of correct answers; 0 for an empty quiz.
    pub fn score_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.correct as f64 / self.total as f64 * 100.0).round() as u32
    }
}

/// Grade `answers` against `questions` position by position. A question
/// with no answer counts as wrong.
pub fn grade(questions: &[QuizQuestion], answers: &[String]) -> QuizResult {
    let answers: Vec<GradedAnswer> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let given = answers.get(i).cloned().unwrap_or_default();
            GradedAnswer {
                correct: q.is_correct(&given),
                question: q.question.clone(),
                expected: q.answer.clone(),
                explanation: q.explanation.clone(),
                given,
            }
        })
        .collect();

    QuizResult {
        correct: answers.iter().filter(|a| a.correct).count(),
        total: questions.len(),
        answers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(kind: QuestionType, answer: &str) -> QuizQuestion {
        QuizQuestion {
            kind,
            question: "q".to_string(),
            options: Vec::new(),
            answer: answer.to_string(),
            explanation: String::new(),
        }
    }

    #[test]
    fn test_choice_answers_are_exact() {
        let q = question(QuestionType::Mcq, "Photosynthesis");
        assert!(q.is_correct("Photosynthesis"));
        assert!(!q.is_correct("photosynthesis"));

        let q = question(QuestionType::TrueFalse, "True");
        assert!(!q.is_correct("true"));
    }

    #[test]
    fn test_short_answers_ignore_case() {
        let q = question(QuestionType::ShortAnswer, "Paris");
        assert!(q.is_correct("PARIS"));
        assert!(!q.is_correct("Lyon"));
    }

    #[test]
    fn test_grade_counts_and_rounds() {
        let questions = vec![
            question(QuestionType::Mcq, "4"),
            question(QuestionType::ShortAnswer, "Paris"),
            question(QuestionType::TrueFalse, "False"),
        ];
        let answers = vec!["4".to_string(), "paris".to_string()];

        let result = grade(&questions, &answers);
        assert_eq!(result.total, 3);
        assert_eq!(result.correct, 2);
        assert_eq!(result.score_percent(), 67);
        assert_eq!(result.answers[2].given, "");
        assert!(!result.answers[2].correct);
    }

    #[test]
    fn test_empty_quiz_scores_zero() {
        assert_eq!(grade(&[], &[]).score_percent(), 0);
    }

    #[test]
    fn test_unknown_type_graded_loosely() {
        let q: QuizQuestion =
            serde_json::from_str(r#"{"type":"fill_blank","question":"q","answer":"Mitochondria"}"#).unwrap();
        assert_eq!(q.kind, QuestionType::Other);
        assert!(q.is_correct("mitochondria"));
    }
}
