//! Deterministic grading of submitted answers.
//!
//! Scoring is total: every input produces a scorecard. An empty question
//! set scores zero rather than failing.

use crate::model::{
    AnswerStatus, AnswerSubmission, CompletionMetrics, PerformanceLevel, Question,
    QuestionBreakdown, Scorecard,
};

/// Grade `answers` against `questions`.
///
/// Each question is graded against its own current `correct_answer_index`,
/// so shuffled questions grade correctly as long as the shuffled copy is
/// what gets submitted.
pub fn score(
    questions: &[Question],
    answers: &AnswerSubmission,
    time_taken_seconds: u64,
) -> Scorecard {
    let mut correct_count = 0;
    let mut incorrect_count = 0;
    let mut unanswered_count = 0;
    let mut breakdown = Vec::with_capacity(questions.len());

    for (index, question) in questions.iter().enumerate() {
        let user_answer = answers.answer_for(index, question);

        // Out-of-range or negative choices never equal a valid index.
        let status = match user_answer {
            None => AnswerStatus::Unanswered,
            Some(choice) if choice == question.correct_answer_index as i64 => {
                AnswerStatus::Correct
            }
            Some(_) => AnswerStatus::Incorrect,
        };

        match status {
            AnswerStatus::Correct => correct_count += 1,
            AnswerStatus::Incorrect => incorrect_count += 1,
            AnswerStatus::Unanswered => unanswered_count += 1,
        }

        breakdown.push(QuestionBreakdown {
            question_number: index + 1,
            question_text: question.text.clone(),
            options: question.options.clone(),
            correct_answer: question.correct_answer_index,
            user_answer,
            status,
            explanation: question.explanation.clone(),
        });
    }

    let total_questions = questions.len();
    let questions_answered = total_questions - unanswered_count;
    let score_percent = percentage(correct_count, total_questions);

    Scorecard {
        score_percent,
        total_questions,
        correct_count,
        incorrect_count,
        unanswered_count,
        time_taken_seconds,
        performance_level: PerformanceLevel::from_score(score_percent),
        completion_metrics: CompletionMetrics {
            questions_answered,
            total_questions,
            completion_percentage: percentage(questions_answered, total_questions),
            time_taken_minutes: minutes(time_taken_seconds),
            is_fully_completed: unanswered_count == 0,
        },
        breakdown,
    }
}

/// `round(part / total * 100)` with ties to even, 0 when `total` is 0.
fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round_ties_even() as u32
}

fn minutes(seconds: u64) -> u64 {
    if seconds == 0 {
        return 0;
    }
    (seconds as f64 / 60.0).round_ties_even() as u64
}
