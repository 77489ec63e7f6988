//! Small helpers shared across the agent selector, record grammar and
//! variation host: MD5 digesting of long context names, and hex
//! encode/decode for the `x`-suffixed record tag convention.

/// Hex digest of `name`, used when a context/community name exceeds the
/// 32-byte `snmpCommunityIndex` limit.
pub fn md5_hex(name: &str) -> String {
    let digest = md5::compute(name.as_bytes());
    format!("{:x}", digest)
}

/// Replace `name` with its MD5 hex digest when longer than 32 bytes,
/// otherwise return it unchanged. Shared by both the v2c and v3 selection
/// paths.
pub fn hash_if_long(name: &str) -> String {
    if name.len() > 32 {
        md5_hex(name)
    } else {
        name.to_string()
    }
}

/// Encode bytes as lowercase hex, matching the `.snmprec` `x`-tag-suffix
/// convention.
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

/// Decode a lowercase (or uppercase) hex string into bytes.
pub fn hex_decode(s: &str) -> Result<Vec<u8>, HexDecodeError> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err(HexDecodeError(s.to_string()));
    }

    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for chunk in bytes.chunks(2) {
        let hi = (chunk[0] as char).to_digit(16).ok_or_else(|| HexDecodeError(s.to_string()))?;
        let lo = (chunk[1] as char).to_digit(16).ok_or_else(|| HexDecodeError(s.to_string()))?;
        out.push(((hi << 4) | lo) as u8);
    }
    Ok(out)
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed hex string: {0:?}")]
pub struct HexDecodeError(pub String);
