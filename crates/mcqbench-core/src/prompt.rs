//! Prompt construction for multiple-choice questions.

use crate::model::QuestionRecord;

/// First line of every prompt. The answer parser relies on replies that lead
/// with a digit, so keep the "digit only" demand explicit.
pub const INSTRUCTION: &str = "Choose the single best answer to the following question. \
Reply with only one digit (1, 2, 3, or 4) and no explanation.";

/// Render a record as a prompt: the instruction, a blank line, the question,
/// then one `"{i}. {option}"` line per option.
pub fn build_prompt(record: &QuestionRecord) -> String {
    let mut prompt = String::with_capacity(
        INSTRUCTION.len()
            + record.question.len()
            + record.options.iter().map(|o| o.len() + 4).sum::<usize>()
            + 16,
    );
    prompt.push_str(INSTRUCTION);
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(&record.question);
    for (i, option) in record.options.iter().enumerate() {
        prompt.push_str(&format!("\n{}. {}", i + 1, option));
    }
    prompt
}
