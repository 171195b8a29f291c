//! Hex encoding, MD5 digests and multipart boundary tokens.

use std::time::{SystemTime, UNIX_EPOCH};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Lowercase, zero-padded hex. Output is always `2 * data.len()` characters.
pub fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
        out.push(HEX_DIGITS[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Hex encoded MD5 of `data`.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Milliseconds since the epoch as 8 little-endian bytes (lowest octet first).
pub fn timestamp_bytes() -> [u8; 8] {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    millis.to_le_bytes()
}

/// A fresh multipart boundary derived from the current timestamp.
pub fn new_boundary() -> String {
    let boundary = md5_hex(&timestamp_bytes());
    tracing::debug!(boundary = %boundary, "Generated multipart boundary");
    boundary
}
