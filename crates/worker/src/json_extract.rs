// SPDX-License-Identifier: MIT

//! Mining a Node-shaped JSON object out of an analyzer's free-text assistant
//! message. Extraction tries, in order: a fenced ```json block, a fenced
//! unlabelled block, then the longest balanced JSON object in the text.
//! The schema check is the contract the rest of the pipeline trusts.

use serde_json::Value;

const REQUIRED_TOP_LEVEL: &[&str] = &[
    "classification",
    "content",
    "lessons",
    "observations",
    "semantic",
    "daemonMeta",
];

/// Extract and validate a Node-shaped JSON object from analyzer output text.
/// Returns `Err` with a human-readable reason (fed to the error classifier
/// as a "schema validation failed" message) on failure.
pub fn extract_node_json(text: &str) -> Result<Value, String> {
    let candidate = extract_candidate(text).ok_or_else(|| {
        "schema validation failed: no JSON object found in analyzer output".to_string()
    })?;
    validate_schema(&candidate)?;
    Ok(candidate)
}

fn extract_candidate(text: &str) -> Option<Value> {
    fenced_block(text, "```json")
        .or_else(|| fenced_block(text, "```"))
        .and_then(|s| serde_json::from_str(&s).ok())
        .or_else(|| longest_balanced_object(text))
}

fn fenced_block(text: &str, opener: &str) -> Option<String> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

/// Scan for every top-level `{...}` span (brace-depth tracking, string-aware)
/// and return the longest one that parses as JSON.
fn longest_balanced_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut best: Option<(usize, usize)> = None;
    let mut depth = 0i32;
    let mut start = None;
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                // A stray closing brace with no matching open (free text like
                // "see x[0]}") must not push depth negative, or every brace
                // pair after it would need one extra close to reach 0 again.
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start {
                            let span = (s, i + 1);
                            let is_longer =
                                best.map(|(bs, be)| (span.1 - span.0) > (be - bs)).unwrap_or(true);
                            if is_longer {
                                best = Some(span);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let (s, e) = best?;
    serde_json::from_str(&text[s..e]).ok()
}

fn validate_schema(value: &Value) -> Result<(), String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "schema validation failed: not a JSON object".to_string())?;

    for key in REQUIRED_TOP_LEVEL {
        if !obj.contains_key(*key) {
            return Err(format!("schema validation failed: missing field {key}"));
        }
    }

    let classification = obj.get("classification").and_then(Value::as_object);
    if !classification.is_some_and(|c| c.contains_key("type") && c.contains_key("project")) {
        return Err(
            "schema validation failed: classification missing type/project".to_string(),
        );
    }

    let content = obj.get("content").and_then(Value::as_object);
    if !content.is_some_and(|c| c.contains_key("summary") && c.contains_key("outcome")) {
        return Err("schema validation failed: content missing summary/outcome".to_string());
    }

    Ok(())
}
