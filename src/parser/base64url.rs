//! URL-safe base64 as used by the Gmail API (`body.data`, `raw`, attachment bodies).
//!
//! Gmail omits the trailing `=` padding, so the deficit is restored before
//! decoding. Malformed input yields an empty buffer: one corrupt part must
//! not abort the rest of the message.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use tracing::warn;

/// Decode URL-safe base64 that may be missing its `=` padding.
///
/// The standard alphabet (`+`, `/`) is accepted as well and ASCII whitespace
/// is ignored. Returns an empty vector when the input cannot be decoded.
pub fn decode_url_safe_base64(input: impl AsRef<[u8]>) -> Vec<u8> {
    let input = input.as_ref();
    if input.is_empty() {
        return Vec::new();
    }

    let mut buf: Vec<u8> = input
        .iter()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|&b| match b {
            b'+' => b'-',
            b'/' => b'_',
            other => other,
        })
        .collect();

    let deficit = (4 - buf.len() % 4) % 4;
    buf.extend(std::iter::repeat(b'=').take(deficit));

    match URL_SAFE.decode(&buf) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, len = input.len(), "Malformed base64 payload, using empty bytes");
            Vec::new()
        }
    }
}

/// Encode bytes as URL-safe base64 without padding (the form Gmail emits).
pub fn encode_url_safe_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
