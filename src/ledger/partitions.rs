/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `keys`: key:{key_text} -> KeyRecord (JSON)
/// - `metadata`: meta:{name} -> value (string)

/// Encode a key record key: key:{key_text}
pub fn encode_record_key(key_text: &str) -> Vec<u8> {
    format!("key:{}", key_text).into_bytes()
}

/// Decode a key record key: key:{key_text} -> key_text
pub fn decode_record_key(key: &[u8]) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("key:").map(String::from)
}

/// Encode a metadata key: meta:{name}
pub fn encode_meta_key(name: &str) -> Vec<u8> {
    format!("meta:{}", name).into_bytes()
}
