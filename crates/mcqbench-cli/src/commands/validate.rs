//! The `mcqbench validate` command.

use std::path::PathBuf;

use anyhow::Result;

use mcqbench_core::dataset::{load_dataset, validate_dataset};

pub fn execute(dataset_path: PathBuf) -> Result<()> {
    let dataset = load_dataset(&dataset_path)?;

    println!("Dataset: {} ({} questions)", dataset.source, dataset.len());
    if dataset.has_ground_truth() {
        println!("Answer column: present");
    }

    let warnings = validate_dataset(&dataset);
    for w in &warnings {
        let prefix = w
            .row
            .map(|row| format!("  [row {row}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Dataset valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
