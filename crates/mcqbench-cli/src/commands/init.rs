//! The `mcqbench init` command.

use std::path::Path;

use anyhow::Result;

fn write_if_missing(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content)?;
        println!("Created {path}");
    }
    Ok(())
}

pub fn execute() -> Result<()> {
    write_if_missing("mcqbench.toml", SAMPLE_CONFIG)?;
    write_if_missing("test_set.csv", SAMPLE_DATASET)?;

    println!("\nNext steps:");
    println!("  1. Start your local server, or set ANTHROPIC_API_KEY / GEMINI_API_KEY");
    println!("  2. Run: mcqbench validate --dataset test_set.csv");
    println!("  3. Run: mcqbench run --dataset test_set.csv");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mcqbench configuration

backend = "local"               # local | anthropic | gemini
dataset = "test_set.csv"
output_dir = "."
request_delay_ms = 1000

[retry]
max_attempts = 3
backoff_ms = 2000
rate_limit_backoff_ms = 10000
max_rate_limit_backoff_ms = 120000

[backends.local]
type = "local"
base_url = "http://localhost:1234/v1"
temperature = 0.1
max_tokens = 512

[backends.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"
model = "claude-opus-4-1-20250805"
max_tokens = 10
temperature = 0.0

[backends.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"
model = "gemini-1.5-flash"
"#;

const SAMPLE_DATASET: &str = "\
Question,Option 1,Option 2,Option 3,Option 4,Answer
What is 7 x 8?,54,56,58,64,2
Which planet is known as the Red Planet?,Venus,Jupiter,Mars,Saturn,3
What is the chemical symbol for gold?,Ag,Gd,Go,Au,4
Which data structure uses first-in first-out order?,Queue,Stack,Tree,Graph,1
\"In which year did the Second World War end?\",1943,1944,1945,1946,3
";
