use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::QuoteError;

/// Characters of the raw reply echoed back when no JSON object is present.
const NO_JSON_PREVIEW_CHARS: usize = 200;

/// Characters shown on each side of a parse failure.
const EXCERPT_RADIUS_CHARS: usize = 80;

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(?:json|JSON)?[ \t]*\r?\n?").unwrap());
static CLOSING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n?```\s*$").unwrap());
static NOISY_CONFIDENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""confidence"\s*:\s*-?[\d.]+\s*,?\s*"#).unwrap());
static NOISY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""pattern"\s*:\s*"(?:[^"\\]|\\.)*"\s*,?\s*"#).unwrap());

/// A pure text transform applied during the repair pass.
type RepairStep = fn(&str) -> String;

/// Repair transforms, in application order.
const REPAIR_STEPS: &[(&str, RepairStep)] = &[
    ("strip_noisy_properties", strip_noisy_properties),
    ("strip_trailing_commas", strip_trailing_commas),
    ("balance_braces", balance_braces),
];

/// Parse the mapping collaborator's free-form reply into a JSON object.
///
/// Tolerates prose around the object, markdown fences, `//` comments,
/// trailing commas, noisy annotation properties and truncated closing braces.
/// Never returns partial data: if the repaired text still does not parse the
/// strict parser's error is reported with an excerpt around the failure.
pub fn parse_mapping_response(response: &str) -> Result<Value, QuoteError> {
    let unfenced = strip_code_fence(response);
    let object = isolate_json_object(&unfenced).ok_or_else(|| {
        QuoteError::NoJsonFound(response.chars().take(NO_JSON_PREVIEW_CHARS).collect())
    })?;
    let cleaned = strip_trailing_commas(&strip_line_comments(object));

    let strict_error = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let excerpt = excerpt_around(&cleaned, error_offset(&cleaned, &strict_error));
    tracing::warn!(
        error = %strict_error,
        response_len = response.len(),
        "Malformed mapping JSON, attempting repair"
    );
    tracing::debug!(excerpt = %excerpt, "Malformed mapping JSON excerpt");

    let mut repaired = cleaned.clone();
    for (name, step) in REPAIR_STEPS {
        let next = step(&repaired);
        if next != repaired {
            tracing::debug!(step = name, "Repair step changed response text");
        }
        repaired = next;
    }

    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => {
            tracing::info!("Mapping JSON repair succeeded");
            Ok(value)
        }
        Err(repair_error) => {
            tracing::error!(error = %repair_error, "Mapping JSON repair failed");
            Err(QuoteError::MalformedAiResponse {
                message: strict_error.to_string(),
                excerpt,
            })
        }
    }
}

/// Remove a leading markdown fence (optionally tagged `json`) and its closing fence.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let without_open = OPENING_FENCE.replace(trimmed, "");
    CLOSING_FENCE.replace(&without_open, "").into_owned()
}

/// Slice from the first `{` to the last `}` inclusive.
pub fn isolate_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Drop `//` comments running to end of line. Text inside string literals is kept.
pub fn strip_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut scanner = StringScanner::default();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if !scanner.in_string && c == '/' && chars.peek() == Some(&'/') {
            for skipped in chars.by_ref() {
                if skipped == '\n' {
                    out.push('\n');
                    break;
                }
            }
            continue;
        }
        scanner.advance(c);
        out.push(c);
    }
    out
}

/// Drop commas that directly precede (modulo whitespace) a `}` or `]`.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut scanner = StringScanner::default();

    for (i, &c) in chars.iter().enumerate() {
        if !scanner.in_string && c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        scanner.advance(c);
        out.push(c);
    }
    out
}

/// Remove annotation properties the model sometimes attaches to entries.
pub fn strip_noisy_properties(text: &str) -> String {
    let without_confidence = NOISY_CONFIDENCE.replace_all(text, "");
    NOISY_PATTERN.replace_all(&without_confidence, "").into_owned()
}

/// Append `}` until opening and closing braces (outside strings) balance.
pub fn balance_braces(text: &str) -> String {
    let mut scanner = StringScanner::default();
    let mut open = 0usize;
    let mut close = 0usize;
    for c in text.chars() {
        if !scanner.in_string {
            match c {
                '{' => open += 1,
                '}' => close += 1,
                _ => {}
            }
        }
        scanner.advance(c);
    }

    let mut out = text.to_string();
    if open > close {
        out.push_str(&"}".repeat(open - close));
    }
    out
}

/// Tracks whether the scan position is inside a JSON string literal.
#[derive(Default)]
struct StringScanner {
    in_string: bool,
    escaped: bool,
}

impl StringScanner {
    fn advance(&mut self, c: char) {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
        } else if c == '"' {
            self.in_string = true;
        }
    }
}

/// Byte offset of a serde_json error (1-based line/column) within `text`.
fn error_offset(text: &str, error: &serde_json::Error) -> usize {
    let line = error.line().max(1);
    let preceding: usize = text.split_inclusive('\n').take(line - 1).map(str::len).sum();
    let mut offset = (preceding + error.column().saturating_sub(1)).min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn excerpt_around(text: &str, byte_offset: usize) -> String {
    let char_index = text[..byte_offset].chars().count();
    text.chars()
        .skip(char_index.saturating_sub(EXCERPT_RADIUS_CHARS))
        .take(EXCERPT_RADIUS_CHARS * 2)
        .collect()
}
