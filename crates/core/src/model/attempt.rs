use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{AttemptId, ModuleId, OptionId, QuestionId, UserId};

/// Submitted choice per question.
pub type Answers = BTreeMap<QuestionId, OptionId>;

/// One quiz submission. Attempts are appended and never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: AttemptId,
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub answers: Answers,
    pub score: u8,
    pub passed: bool,
    pub attempted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn answers_serialize_as_object() {
        let mut answers = Answers::new();
        answers.insert(QuestionId::new("q1"), OptionId::new("b"));
        let attempt = QuizAttempt {
            id: AttemptId::new(1),
            user_id: UserId::new(1),
            module_id: ModuleId::new(3),
            answers,
            score: 100,
            passed: true,
            attempted_at: fixed_now(),
        };
        let value = serde_json::to_value(&attempt).unwrap();
        assert_eq!(value["answers"]["q1"], "b");
        assert_eq!(value["attemptedAt"], "2023-11-14T22:13:20Z");
    }
}
