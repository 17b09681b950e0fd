//! Quiz scoring.
//!
//! Pure functions only: the same quiz and answers always produce the same
//! result, and nothing here touches storage.

use serde::{Deserialize, Serialize};

use crate::model::{Answers, QuestionId, Quiz};

/// Outcome of scoring one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    /// Percentage of questions answered correctly, 0-100.
    pub score: u8,
    pub passed: bool,
    pub correct: usize,
    pub total: usize,
}

/// `round(100 * part / whole)` with halves rounded up, in integer arithmetic.
///
/// Returns 0 when `whole` is 0. `part` is clamped to `whole`.
#[must_use]
pub fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u128;
    let whole = whole as u128;
    let rounded = (200 * part + whole) / (2 * whole);
    // part <= whole, so rounded <= 100
    rounded as u8
}

/// Score `answers` against `quiz`.
///
/// A question counts as correct when the submitted option id equals its
/// `correct_answer`. Missing answers simply count as wrong; callers that need
/// a complete submission check [`unanswered`] first.
#[must_use]
pub fn score_quiz(quiz: &Quiz, answers: &Answers) -> QuizScore {
    let total = quiz.questions.len();
    let correct = quiz
        .questions
        .iter()
        .filter(|question| answers.get(&question.id) == Some(&question.correct_answer))
        .count();
    let score = percentage(correct, total);

    QuizScore {
        score,
        passed: is_passing(score, quiz.passing_score),
        correct,
        total,
    }
}

/// `score >= passing_score`.
#[must_use]
pub fn is_passing(score: u8, passing_score: u8) -> bool {
    score >= passing_score
}

/// Questions of `quiz` that have no entry in `answers`, in quiz order.
#[must_use]
pub fn unanswered<'a>(quiz: &'a Quiz, answers: &Answers) -> Vec<&'a QuestionId> {
    quiz.questions
        .iter()
        .map(|question| &question.id)
        .filter(|id| !answers.contains_key(*id))
        .collect()
}
