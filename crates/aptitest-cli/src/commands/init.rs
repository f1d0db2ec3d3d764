//! The `aptitest init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("aptitest.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("data")?;
    write_if_missing(Path::new("data/sample_questions.json"), SAMPLE_BANK)?;

    println!("\nNext steps:");
    println!("  1. Set GEMINI_API_KEY (or edit aptitest.toml)");
    println!("  2. Run: aptitest validate --bank data");
    println!("  3. Run: aptitest quiz --topic sample --output quiz.json");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# aptitest configuration

default_provider = "gemini"
default_model = "gemini-2.0-flash-exp"
default_temperature = 0.7
# system_prompt = "You write aptitude test questions."
max_retries = 3
backoff_unit_ms = 1000
max_output_tokens = 2000
required_ai_questions = 3
parallelism = 4
bank_dir = "./data"
results_dir = "./aptitest-results"

[providers.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"
"#;

const SAMPLE_BANK: &str = r#"[
  {
    "id": "1",
    "question": "What is 15% of 200?",
    "options": ["15", "30", "45", "20"],
    "correctAnswer": 1,
    "explanation": "15/100 * 200 = 30"
  },
  {
    "id": "2",
    "question": "A train travels 120 km in 2 hours. What is its average speed?",
    "options": ["40 km/h", "50 km/h", "60 km/h", "80 km/h"],
    "correctAnswer": 2,
    "explanation": "Speed = distance / time = 120 / 2 = 60 km/h"
  },
  {
    "id": "3",
    "question": "Which number comes next: 2, 6, 12, 20, 30, ?",
    "options": ["40", "42", "44", "36"],
    "correctAnswer": 1,
    "explanation": "Differences grow by 2: 4, 6, 8, 10, 12"
  }
]
"#;
