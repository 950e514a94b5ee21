//! Charset resolution and tolerant byte-to-text decoding.

use encoding_rs::Encoding;
use tracing::{debug, warn};

/// Extract the `charset=` parameter from a Content-Type value.
///
/// Matching is case-insensitive and permissive: the value may be quoted or
/// bare, and the parameter may appear anywhere in the string.
///
/// # Examples
/// - `"text/plain; charset=\"UTF-8\""` → `Some("UTF-8")`
/// - `"text/html;CHARSET=iso-8859-1; format=flowed"` → `Some("iso-8859-1")`
pub fn extract_charset(content_type: &str) -> Option<String> {
    if content_type.is_empty() {
        return None;
    }

    let lower = content_type.to_ascii_lowercase();
    let mut search_from = 0;
    while let Some(found) = lower[search_from..].find("charset=") {
        let value_start = search_from + found + "charset=".len();
        let rest = &content_type[value_start..];
        let rest = rest.strip_prefix('"').unwrap_or(rest);
        let value: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
            .collect();
        if !value.is_empty() {
            return Some(value);
        }
        search_from = value_start;
    }
    None
}

/// Decode `bytes` with a single charset label, replacing invalid sequences.
///
/// Returns `None` only when `encoding_rs` does not know the label.
pub fn decode_with_label(bytes: &[u8], label: &str) -> Option<String> {
    let encoding = Encoding::for_label(label.trim().as_bytes())?;
    // No BOM sniffing: the declared label decides.
    let (decoded, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        debug!(charset = encoding.name(), "Replaced malformed bytes while decoding");
    }
    Some(decoded.into_owned())
}

/// Charsets tried after the declared one.
const FALLBACK_LABELS: [&str; 2] = ["utf-8", "latin1"];

/// Decode a body payload into text.
///
/// Tries the declared charset, then UTF-8, then Latin-1; every step replaces
/// invalid bytes rather than failing, so the first *known* label wins. An
/// unknown declared label falls through to the next step, and lossy UTF-8 is
/// the unconditional last resort.
pub fn decode_bytes_to_text(bytes: &[u8], declared: Option<&str>) -> String {
    let declared = declared.map(str::trim).filter(|c| !c.is_empty());

    for label in declared.into_iter().chain(FALLBACK_LABELS) {
        if let Some(text) = decode_with_label(bytes, label) {
            return text;
        }
        warn!(charset = label, "Unknown charset, trying next fallback");
    }

    String::from_utf8_lossy(bytes).into_owned()
}
