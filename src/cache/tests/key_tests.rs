use serde_json::json;

use crate::cache::cache_key;

#[test]
fn test_key_is_stable_across_field_order() {
    let a = cache_key("summarize", &json!({"text": "abc", "style": {"tone": "dry", "len": 3}}));
    let b = cache_key("summarize", &json!({"style": {"len": 3, "tone": "dry"}, "text": "abc"}));
    assert_eq!(a, b);
}

#[test]
fn test_key_depends_on_operation_and_arguments() {
    let args = json!({"text": "abc"});
    assert_ne!(cache_key("summarize", &args), cache_key("translate", &args));
    assert_ne!(
        cache_key("summarize", &args),
        cache_key("summarize", &json!({"text": "abd"}))
    );
}

#[test]
fn test_key_is_hex_sha256() {
    let key = cache_key("op", &json!(null));
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
}
