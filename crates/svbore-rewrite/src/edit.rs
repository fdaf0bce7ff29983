//! Span-based text edits
//!
//! Rewriting works on the original text through a list of edits: insertions
//! (empty span) and replacements. Untouched byte ranges are copied through
//! verbatim, which is what makes round-tripping of unchanged tokens,
//! whitespace, and comments exact.

use crate::error::RewriteError;

/// One edit against a source text. `start == end` inserts before `start`.
#[derive(Debug, Clone)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextEdit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        TextEdit {
            start: at,
            end: at,
            text: text.into(),
        }
    }

    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        TextEdit {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Apply edits to `src`, producing the rewritten text.
///
/// Edits are ordered by position; insertions at the same offset keep their
/// submission order. Overlapping replacements are a planner bug and fail
/// loudly rather than corrupting output.
pub fn apply_edits(src: &str, mut edits: Vec<TextEdit>) -> Result<String, RewriteError> {
    edits.sort_by_key(|e| (e.start, e.end));

    let mut out = String::with_capacity(src.len() + edits.iter().map(|e| e.text.len()).sum::<usize>());
    let mut cursor = 0usize;
    for edit in &edits {
        if edit.start < cursor || edit.end > src.len() {
            return Err(RewriteError::OverlappingEdits {
                start: edit.start,
                end: edit.end,
            });
        }
        out.push_str(&src[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&src[cursor..]);
    Ok(out)
}
