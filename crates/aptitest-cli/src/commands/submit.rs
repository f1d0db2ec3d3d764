//! The `aptitest submit` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use aptitest_core::model::{AnswerSubmission, AssessmentResult};

use super::{build_service, load_config, read_json, QuizFile};

pub async fn execute(
    quiz_path: PathBuf,
    answers_path: PathBuf,
    user: String,
    time_taken: u64,
    json: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let quiz: QuizFile = read_json(&quiz_path)?;
    let answers: AnswerSubmission = read_json(&answers_path)?;

    let service = build_service(&config, None, None)?;
    let result = service
        .submit(&user, &quiz.topic, &quiz.questions, &answers, time_taken)
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

fn print_result(result: &AssessmentResult) {
    let card = &result.scorecard;
    println!(
        "Score: {}% ({})  correct {} / incorrect {} / unanswered {}",
        card.score_percent,
        card.performance_level,
        card.correct_count,
        card.incorrect_count,
        card.unanswered_count,
    );
    println!(
        "Completed {}/{} ({}%) in {} min",
        card.completion_metrics.questions_answered,
        card.completion_metrics.total_questions,
        card.completion_metrics.completion_percentage,
        card.completion_metrics.time_taken_minutes,
    );

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct answer", "Status"]);
    for row in &card.breakdown {
        table.add_row(vec![
            Cell::new(row.question_number),
            Cell::new(truncate(&row.question_text, 60)),
            Cell::new(answer_label(row.user_answer, &row.options)),
            Cell::new(answer_label(Some(row.correct_answer as i64), &row.options)),
            Cell::new(row.status),
        ]);
    }
    println!("{table}");
    println!("Result id: {}", result.id);
}

/// `B) 42` for an in-range index, the raw index otherwise, `-` when unanswered.
fn answer_label(index: Option<i64>, options: &[String]) -> String {
    let Some(index) = index else {
        return "-".to_string();
    };
    match usize::try_from(index).ok().and_then(|i| options.get(i).map(|o| (i, o))) {
        Some((i, option)) => {
            let letter = (b'A' + (i % 26) as u8) as char;
            format!("{letter}) {}", truncate(option, 30))
        }
        None => format!("{index} (invalid)"),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
