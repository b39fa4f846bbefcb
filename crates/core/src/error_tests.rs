use super::*;

#[test]
fn format_then_parse_preserves_type_reason_and_message() {
    let record = ErrorRecord::new(
        Utc::now(),
        ErrorCategory::Transient,
        "Analysis timed out",
        "ETIMEDOUT while waiting for analyzer",
        None,
    );
    let raw = record.format_for_storage().expect("serializes");
    let parsed = ErrorRecord::parse_stored(&raw).expect("deserializes");
    assert_eq!(parsed.category, record.category);
    assert_eq!(parsed.reason, record.reason);
    assert_eq!(parsed.message, record.message);
}

#[test]
fn message_truncated_to_one_thousand_chars() {
    let long = "x".repeat(5000);
    let record = ErrorRecord::new(Utc::now(), ErrorCategory::Unknown, "reason", long, None);
    assert_eq!(record.message.chars().count(), 1000);
}

#[test]
fn stack_truncated_to_two_thousand_chars() {
    let long = "y".repeat(5000);
    let record = ErrorRecord::new(Utc::now(), ErrorCategory::Unknown, "reason", "msg", Some(long));
    assert_eq!(record.stack.expect("stack present").chars().count(), 2000);
}
