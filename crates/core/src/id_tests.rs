use super::*;

crate::define_id! {
    /// Test-only id newtype.
    pub struct TestId;
}

#[test]
fn generated_id_is_sixteen_hex_chars() {
    let id = TestId::new();
    assert_eq!(id.as_str().len(), HEX_ID_LEN);
    assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn two_generated_ids_differ() {
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn from_string_round_trips() {
    let id = TestId::from_string("abcdef0123456789");
    assert_eq!(id.as_str(), "abcdef0123456789");
    assert_eq!(id.to_string(), "abcdef0123456789");
}

#[test]
fn from_string_pads_short_fixtures() {
    let id = TestId::from_string("job1");
    assert_eq!(id.as_str().len(), HEX_ID_LEN);
    assert!(id.as_str().starts_with("job1"));
}

#[test]
fn deref_allows_str_methods() {
    let id = TestId::from_string("abcdef0123456789");
    assert!(id.starts_with("abcd"));
}
