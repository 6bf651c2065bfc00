//! Response decoding: raw model text to a JSON document.
//!
//! Models wrap their JSON in prose or code fences. The decoder isolates
//! balanced top-level `{...}` spans and accepts the text only when exactly
//! one of them parses. It never repairs JSON.

use serde_json::Value;
use std::ops::Range;
use thiserror::Error;

use crate::config::ValidationOptions;
use crate::types::Profile;

/// Errors from decoding model output. All are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Model output is empty")]
    Empty,

    #[error("Model output is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("JSON nesting exceeds depth {limit} at byte {offset}")]
    NestingTooDeep { limit: usize, offset: usize },

    #[error("No JSON object found in model output")]
    NoJsonObject,

    #[error("Found {count} JSON objects in model output, expected exactly one")]
    MultipleObjects { count: usize },

    #[error("Malformed JSON object: {0}")]
    Malformed(String),
}

/// A candidate document isolated from model output.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDocument {
    /// Contract the caller asked for
    pub profile: Profile,

    /// The parsed JSON object
    pub value: Value,

    /// Byte range of the object within the raw text
    pub span: Range<usize>,

    /// Whether non-whitespace text surrounded the object
    pub unwrapped: bool,
}

/// Decode raw model output into a single JSON object.
pub fn decode(
    raw: &str,
    profile: Profile,
    options: &ValidationOptions,
) -> Result<DecodedDocument, DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    if raw.len() > options.max_document_bytes {
        return Err(DecodeError::TooLarge {
            size: raw.len(),
            limit: options.max_document_bytes,
        });
    }

    let spans = object_spans(raw, options.max_nesting_depth)?;

    let mut parsed = Vec::new();
    let mut first_error: Option<String> = None;
    for span in spans {
        match serde_json::from_str::<Value>(&raw[span.clone()]) {
            Ok(value) => parsed.push((span, value)),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e.to_string());
                }
            }
        }
    }

    if parsed.len() > 1 {
        return Err(DecodeError::MultipleObjects {
            count: parsed.len(),
        });
    }

    let Some((span, value)) = parsed.pop() else {
        return Err(match first_error {
            Some(e) => DecodeError::Malformed(e),
            None => DecodeError::NoJsonObject,
        });
    };

    let unwrapped =
        !raw[..span.start].trim().is_empty() || !raw[span.end..].trim().is_empty();

    tracing::debug!(
        profile = %profile,
        bytes = raw.len(),
        unwrapped,
        "Decoded model output"
    );

    Ok(DecodedDocument {
        profile,
        value,
        span,
        unwrapped,
    })
}

/// Find balanced top-level `{...}` spans.
///
/// Scanning restarts after every span, so quotes in surrounding prose cannot
/// desynchronize it. A `{` in prose that never closes is skipped and the scan
/// resumes at the next byte. An opening that looks like JSON (`{"` or `{}`)
/// and never closes is reported as malformed, so truncated output is never
/// mined for an inner object. Objects nested in a top-level JSON array are
/// not candidates.
fn object_spans(text: &str, max_depth: usize) -> Result<Vec<Range<usize>>, DecodeError> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        match bytes[offset] {
            b'{' => match balanced_end(bytes, offset, max_depth)? {
                Some(end) => {
                    spans.push(offset..end);
                    offset = end;
                }
                None if looks_like_json(bytes, offset) => {
                    return Err(DecodeError::Malformed(format!(
                        "unterminated JSON object starting at byte {}",
                        offset
                    )));
                }
                None => offset += 1,
            },
            b'[' => match balanced_end(bytes, offset, max_depth)? {
                Some(end) if serde_json::from_str::<Value>(&text[offset..end]).is_ok() => {
                    tracing::debug!(offset, "Skipping top-level JSON array");
                    offset = end;
                }
                _ => offset += 1,
            },
            _ => offset += 1,
        }
    }

    Ok(spans)
}

/// End (exclusive) of the bracketed value opening at `start`.
///
/// Returns `None` when the value never closes or a closer does not match its
/// opener. String literals and escapes are honoured.
fn balanced_end(bytes: &[u8], start: usize, max_depth: usize) -> Result<Option<usize>, DecodeError> {
    let mut closers: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                closers.push(if byte == b'{' { b'}' } else { b']' });
                if closers.len() > max_depth {
                    return Err(DecodeError::NestingTooDeep {
                        limit: max_depth,
                        offset,
                    });
                }
            }
            b'}' | b']' => {
                if closers.pop() != Some(byte) {
                    return Ok(None);
                }
                if closers.is_empty() {
                    return Ok(Some(offset + 1));
                }
            }
            _ => {}
        }
    }

    Ok(None)
}

/// Whether the `{` at `start` is followed by a key or an immediate close.
fn looks_like_json(bytes: &[u8], start: usize) -> bool {
    bytes[start + 1..]
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'"' || *b == b'}')
}
