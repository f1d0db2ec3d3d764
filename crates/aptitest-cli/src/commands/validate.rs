//! The `aptitest validate` command.

use std::path::PathBuf;

use anyhow::Result;

use aptitest_core::bank::{load_bank_directory, parse_bank_file, validate_bank};

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let banks = if bank_path.is_dir() {
        load_bank_directory(&bank_path)?
    } else {
        let topic = bank_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.trim_end_matches(".json").trim_end_matches("_questions"))
            .unwrap_or("bank")
            .to_string();
        vec![(topic, parse_bank_file(&bank_path)?)]
    };

    let mut total_warnings = 0;

    for (topic, questions) in &banks {
        println!("Bank: {topic} ({} questions)", questions.len());

        let warnings = validate_bank(questions);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .filter(|id| !id.is_empty())
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
