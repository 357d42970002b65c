use redis_trib::core::slot::{NUM_SLOTS, key_to_slot};

#[tokio::test]
async fn test_known_slot_values() {
    // CRC16/XMODEM check value: CRC16("123456789") = 0x31C3 = 12739.
    assert_eq!(key_to_slot(b"123456789"), 12739);
    // The value CLUSTER KEYSLOT reports for "foo".
    assert_eq!(key_to_slot(b"foo"), 12182);
}

#[tokio::test]
async fn test_slot_always_in_range() {
    for key in [&b""[..], b"a", b"some:key", b"\x00\xff\x10"] {
        assert!((key_to_slot(key) as usize) < NUM_SLOTS);
    }
}

#[tokio::test]
async fn test_hash_tag_groups_keys() {
    let a = key_to_slot(b"{user1000}.following");
    let b = key_to_slot(b"{user1000}.followers");
    assert_eq!(a, b);
    assert_eq!(a, key_to_slot(b"user1000"));
}

#[tokio::test]
async fn test_empty_hash_tag_hashes_whole_key() {
    // "foo{}{bar}": the first tag is empty, so the whole key is hashed.
    assert_ne!(key_to_slot(b"foo{}{bar}"), key_to_slot(b"bar"));
}

#[tokio::test]
async fn test_nested_braces_use_first_closing() {
    // "foo{{bar}}zap" hashes "{bar", per the tag rule.
    assert_eq!(key_to_slot(b"foo{{bar}}zap"), key_to_slot(b"{{bar}"));
}

#[tokio::test]
async fn test_unclosed_brace_hashes_whole_key() {
    assert_ne!(key_to_slot(b"foo{bar"), key_to_slot(b"bar"));
}
