// SPDX-License-Identifier: MIT

//! Error classification: map a raw error message to a retry category.

use crate::error::ErrorCategory;

/// One row of the classification table: substrings matched case-insensitively,
/// in declaration order, first match wins.
struct Pattern {
    substrings: &'static [&'static str],
    category: ErrorCategory,
    max_retries: Option<u32>,
    reason: &'static str,
}

/// The classification table (contract, §4.4): order matters.
const PATTERNS: &[Pattern] = &[
    Pattern {
        substrings: &[
            "enoent",
            "file not found",
            "no such file",
            "prompt file not found",
            "session file not found",
        ],
        category: ErrorCategory::Permanent,
        max_retries: None,
        reason: "Required file not found",
    },
    Pattern {
        substrings: &["invalid session header", "malformed session", "invalid jsonl"],
        category: ErrorCategory::Permanent,
        max_retries: None,
        reason: "Malformed session file",
    },
    Pattern {
        substrings: &["empty session", "no entries"],
        category: ErrorCategory::Permanent,
        max_retries: None,
        reason: "Empty session file",
    },
    Pattern {
        substrings: &["schema validation", "invalid node output"],
        category: ErrorCategory::Permanent,
        max_retries: None,
        reason: "Output validation failed",
    },
    Pattern {
        substrings: &["missing required skills"],
        category: ErrorCategory::Permanent,
        max_retries: None,
        reason: "Required skills not installed",
    },
    Pattern {
        substrings: &["timeout", "etimedout", "timed out"],
        category: ErrorCategory::Transient,
        max_retries: Some(3),
        reason: "Analysis timed out",
    },
    Pattern {
        substrings: &["rate limit", "429", "too many requests"],
        category: ErrorCategory::Transient,
        max_retries: Some(5),
        reason: "Rate limited by API",
    },
    Pattern {
        substrings: &[
            "econnrefused",
            "connection refused",
            "econnreset",
            "connection reset",
            "enetunreach",
            "network unreachable",
        ],
        category: ErrorCategory::Transient,
        max_retries: Some(3),
        reason: "Network connection failed",
    },
    Pattern {
        substrings: &["overloaded", "capacity", "503", "service unavailable"],
        category: ErrorCategory::Transient,
        max_retries: Some(5),
        reason: "Model service overloaded",
    },
    Pattern {
        substrings: &["500", "internal server error", "502", "bad gateway"],
        category: ErrorCategory::Transient,
        max_retries: Some(3),
        reason: "Server error",
    },
    Pattern {
        substrings: &["failed to spawn", "enoent.*pi", "command not found"],
        category: ErrorCategory::Transient,
        max_retries: Some(2),
        reason: "Failed to spawn pi process",
    },
    Pattern {
        substrings: &["sqlite.*busy", "database is locked"],
        category: ErrorCategory::Transient,
        max_retries: Some(5),
        reason: "Database temporarily locked",
    },
    Pattern {
        substrings: &["enospc", "no space left", "disk full"],
        category: ErrorCategory::Transient,
        max_retries: Some(2),
        reason: "Disk space issue",
    },
];

const UNKNOWN_MAX_RETRIES: u32 = 2;
const UNKNOWN_REASON_LEN: usize = 200;

/// Outcome of classifying a raw error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: ErrorCategory,
    pub retryable: bool,
    pub reason: String,
    pub max_retries: u32,
}

/// Classify a raw error message against the static pattern table.
///
/// Patterns containing `.*` are matched as a literal substring check against
/// both halves joined by any characters in between (simple glob, not full regex) —
/// mirroring the two entries in the table that use it (`enoent.*pi`, `sqlite.*busy`).
pub fn classify_error(message: &str) -> Classification {
    let lower = message.to_lowercase();

    for pattern in PATTERNS {
        if pattern.substrings.iter().any(|p| matches_pattern(&lower, p)) {
            return Classification {
                category: pattern.category,
                retryable: pattern.category == ErrorCategory::Transient,
                reason: pattern.reason.to_string(),
                max_retries: pattern.max_retries.unwrap_or(UNKNOWN_MAX_RETRIES),
            };
        }
    }

    Classification {
        category: ErrorCategory::Unknown,
        retryable: true,
        reason: truncate_chars(message, UNKNOWN_REASON_LEN),
        max_retries: UNKNOWN_MAX_RETRIES,
    }
}

fn matches_pattern(haystack: &str, pattern: &str) -> bool {
    match pattern.split_once(".*") {
        Some((prefix, suffix)) => {
            if let Some(prefix_at) = haystack.find(prefix) {
                let rest = &haystack[prefix_at + prefix.len()..];
                rest.contains(suffix)
            } else {
                false
            }
        }
        None => haystack.contains(pattern),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Policy parameters for the classifier's own backoff formula (distinct from
/// the queue's `2^retryCount` minutes formula — see `Queue::fail`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_seconds: f64,
    pub max_delay_seconds: f64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_seconds: 60.0,
            max_delay_seconds: 3600.0,
            backoff_multiplier: 2.0,
        }
    }
}

/// `calculateRetryDelay`: `min(base * multiplier^retryCount, maxDelay)`, seconds.
pub fn calculate_retry_delay(retry_count: u32, policy: &RetryPolicy) -> f64 {
    let raw = policy.base_delay_seconds * policy.backoff_multiplier.powi(retry_count as i32);
    raw.min(policy.max_delay_seconds)
}

/// `calculateRetryDelayMinutes`: the seconds delay, rounded up to whole minutes.
pub fn calculate_retry_delay_minutes(retry_count: u32, policy: &RetryPolicy) -> u64 {
    let seconds = calculate_retry_delay(retry_count, policy);
    (seconds / 60.0).ceil() as u64
}

/// Outcome of `classifyErrorWithContext`: whether to retry and for how long to wait.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationWithContext {
    pub should_retry: bool,
    pub retry_delay_seconds: f64,
    pub description: String,
}

/// `classifyErrorWithContext(err, retryCount, jobMaxRetries, policy)`.
pub fn classify_error_with_context(
    message: &str,
    retry_count: u32,
    job_max_retries: u32,
    policy: &RetryPolicy,
) -> ClassificationWithContext {
    let classification = classify_error(message);
    let effective_max = classification.max_retries.min(job_max_retries);
    let should_retry = classification.retryable && retry_count < effective_max;

    ClassificationWithContext {
        should_retry,
        retry_delay_seconds: calculate_retry_delay(retry_count, policy),
        description: classification.reason,
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
