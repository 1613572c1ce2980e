// src/services/scoring.rs

use std::collections::HashMap;

use crate::models::{
    question::CatalogQuestion,
    submission::{Answer, AnswerResult},
};

/// Outcome of scoring one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSheet {
    pub total_score: i64,
    /// One entry per answered question, in question order.
    pub answers: Vec<AnswerResult>,
}

/// Scores an attempt: the sum of marks over correctly answered questions.
///
/// Correctness was fixed when each answer was written, so this never looks at
/// option flags except to report the correct option. Unanswered questions and
/// answers to questions outside `questions` contribute nothing.
pub fn score(questions: &[CatalogQuestion], answers: &[Answer]) -> ScoreSheet {
    let by_question: HashMap<i64, &Answer> = answers.iter().map(|a| (a.question_id, a)).collect();

    let mut total_score = 0;
    let mut results = Vec::with_capacity(answers.len());

    for question in questions {
        let Some(answer) = by_question.get(&question.id) else {
            continue;
        };

        // A cleared selection is never correct, whatever the stored flag says.
        let is_correct = answer.is_correct && answer.selected_option_id.is_some();
        if is_correct {
            total_score += question.marks;
        }

        results.push(AnswerResult {
            question_id: question.id,
            selected_option_id: answer.selected_option_id,
            correct_option_id: question.correct_option_id(),
            is_correct,
        });
    }

    ScoreSheet {
        total_score,
        answers: results,
    }
}
