//! Extract a single choice from a free-form model reply.

use crate::model::{Choice, ModelAnswer};

/// Scan left to right for the first `1`-`4` digit.
///
/// First match wins, so `"between option 2 and 4"` parses as 2. Replies such
/// as `"1."`, `" 3"` or `"Answer: 3"` all parse; a reply without any of the
/// four digits is `Unparseable`.
pub fn parse_answer(raw: &str) -> ModelAnswer {
    raw.bytes()
        .find(|b| matches!(b, b'1'..=b'4'))
        .and_then(|b| Choice::new(b - b'0'))
        .map_or(ModelAnswer::Unparseable, ModelAnswer::Choice)
}
