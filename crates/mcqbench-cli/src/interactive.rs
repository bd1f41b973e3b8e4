//! Line-oriented operator input.

use std::io::{self, BufRead, Write};

use anyhow::Result;

/// Reserved input that ends an interactive session.
pub const QUIT_TOKEN: &str = "quit";

/// Print `prompt` and read one trimmed line. `None` at end of input.
pub fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub fn is_quit(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(QUIT_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_is_case_insensitive() {
        assert!(is_quit("quit"));
        assert!(is_quit("QUIT"));
        assert!(is_quit("  Quit \n"));
        assert!(!is_quit("quit now"));
        assert!(!is_quit(""));
    }
}
