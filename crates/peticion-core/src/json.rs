//! Tolerant JSON extraction from free-text model output.
//!
//! Models asked for "only JSON" still wrap it in prose or markdown fences.
//! [`extract_json_block`] finds the first `{...}` or `[...]` span that parses
//! strictly, so callers never see partial or invalid JSON.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Return the first balanced `{...}` / `[...]` span of `text` that parses as JSON.
///
/// Candidates are tried in order of their opening bracket. Returns `""` when
/// no candidate parses, including for empty input.
pub fn extract_json_block(text: &str) -> &str {
    let bytes = text.as_bytes();
    for (start, &b) in bytes.iter().enumerate() {
        if b != b'{' && b != b'[' {
            continue;
        }
        let Some(end) = balanced_end(bytes, start) else {
            continue;
        };
        // Brackets are ASCII, so both ends sit on char boundaries.
        let candidate = &text[start..end];
        if serde_json::from_str::<Value>(candidate).is_ok() {
            return candidate;
        }
    }
    ""
}

/// Strictly parse `text`, returning `fallback` unchanged on any error.
pub fn safe_parse(text: &str, fallback: Value) -> Value {
    serde_json::from_str(text).unwrap_or(fallback)
}

/// Extract the first JSON block and decode it as `T`.
pub fn parse_block<T: DeserializeOwned>(text: &str) -> Option<T> {
    let block = extract_json_block(text);
    if block.is_empty() {
        return None;
    }
    serde_json::from_str(block).ok()
}

/// Find the exclusive end of the bracket span opened at `start`.
///
/// Tracks nesting with a stack and skips brackets inside string literals.
/// Returns `None` on a mismatched closer or when the text ends first.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
