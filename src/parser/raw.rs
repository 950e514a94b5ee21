//! Raw-input walker: RFC 822 bytes parsed by `mail-parser`, then classified
//! and decoded with the same rules as the structured walker.

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::{debug, warn};

use crate::model::attachment::Attachment;
use crate::parser::base64url::decode_url_safe_base64;
use crate::parser::body::Walk;
use crate::parser::charset::decode_bytes_to_text;
use crate::parser::classify::{classify, PartClass, PartMeta};
use crate::parser::header::{decode_header_bytes, decode_header_text, strip_angle_brackets, unfold_headers};

/// Maximum nesting of embedded `message/rfc822` parts we descend into
/// (to prevent stack overflow on adversarial input).
const MAX_DEPTH: usize = 10;

/// Implicit content type of a part without a Content-Type header (RFC 2045 §5.2).
const IMPLICIT_MIME_TYPE: &str = "text/plain";

/// Result of walking a raw message.
#[derive(Debug, Clone, Default)]
pub struct RawWalk {
    /// Top-level headers as `(lowercase_name, raw_value)`, unfolded, in order.
    pub headers: Vec<(String, String)>,
    /// Body candidates and attachments.
    pub walk: Walk,
}

/// Walk a complete raw message.
///
/// Transfer encodings are undone by `mail-parser`; classification and text
/// decoding follow the same policy as [`crate::parser::tree::walk_payload`].
/// Input `mail-parser` rejects outright degrades to a single plain-text
/// candidate made of everything after the header block.
pub fn walk_raw(raw: &[u8]) -> RawWalk {
    let message_bytes = skip_from_line(raw);
    let (header_bytes, body_bytes) = split_header_body(message_bytes);
    let headers = unfold_headers(&decode_header_bytes(header_bytes));

    let mut walk = Walk::default();
    match MessageParser::default().parse(message_bytes) {
        Some(msg) => walk_message(&msg, &mut walk, 0),
        None => {
            warn!(len = raw.len(), "mail-parser rejected message, using body fallback");
            walk.texts.push(decode_bytes_to_text(body_bytes, None));
        }
    }

    RawWalk { headers, walk }
}

fn walk_message(msg: &Message<'_>, walk: &mut Walk, depth: usize) {
    for part in &msg.parts {
        match &part.body {
            PartType::Multipart(_) => {}
            PartType::Message(nested) => {
                if depth < MAX_DEPTH {
                    walk_message(nested, walk, depth + 1);
                } else {
                    warn!(depth, "Embedded message nesting too deep, skipping");
                }
            }
            _ => visit_leaf(msg, part, walk),
        }
    }
}

fn visit_leaf(msg: &Message<'_>, part: &MessagePart<'_>, walk: &mut Walk) {
    let mime = mime_type_of(part);
    let filename = part.attachment_name().unwrap_or_default();
    let disposition = part
        .content_disposition()
        .map(|d| d.ctype())
        .unwrap_or_default();

    // mail-parser has already converted text parts to UTF-8; everything else
    // still carries the declared charset.
    let (payload, charset): (&[u8], Option<&str>) = match &part.body {
        PartType::Text(text) | PartType::Html(text) => (text.as_bytes(), Some("utf-8")),
        _ => (
            part.contents(),
            part.content_type().and_then(|ct| ct.attribute("charset")),
        ),
    };

    let class = classify(&PartMeta {
        mime_type: &mime,
        filename,
        disposition,
        has_remote_ref: false,
    });
    debug!(mime_type = %mime, class = ?class, bytes = payload.len(), "Classified raw part");

    match class {
        PartClass::Attachment => {
            let data = match &part.body {
                PartType::Text(_) | PartType::Html(_) => {
                    original_bytes(msg, part).unwrap_or_else(|| payload.to_vec())
                }
                _ => payload.to_vec(),
            };
            walk.attachments.push(Attachment {
                filename: decode_header_text(filename),
                mime_type: mime,
                content_id: part.content_id().and_then(strip_angle_brackets),
                size: (!data.is_empty()).then_some(data.len() as u64),
                data: Some(data),
                attachment_id: None,
            });
        }
        PartClass::Text => walk.texts.push(decode_bytes_to_text(payload, charset)),
        PartClass::Html => walk.htmls.push(decode_bytes_to_text(payload, charset)),
        PartClass::Ignored => {}
    }
}

/// Bytes of a text part as sent, with only the transfer encoding undone.
///
/// `mail-parser` hands text parts back converted to UTF-8; an attached text
/// file must keep its own charset.
fn original_bytes(msg: &Message<'_>, part: &MessagePart<'_>) -> Option<Vec<u8>> {
    let encoded = msg
        .raw_message
        .get(part.offset_body as usize..part.offset_end as usize)?;
    let encoding = part.content_transfer_encoding().unwrap_or_default();
    if encoding.eq_ignore_ascii_case("base64") {
        let decoded = decode_url_safe_base64(encoded);
        (!decoded.is_empty() || encoded.iter().all(u8::is_ascii_whitespace)).then_some(decoded)
    } else if encoding.eq_ignore_ascii_case("quoted-printable") {
        Some(decode_quoted_printable(encoded))
    } else {
        Some(encoded.to_vec())
    }
}

/// Quoted-printable body decoding (RFC 2045 §6.7). Invalid escapes are kept as-is.
fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] != b'=' {
            out.push(input[i]);
            i += 1;
            continue;
        }
        let rest = &input[i + 1..];
        if rest.starts_with(b"\r\n") {
            i += 3;
        } else if rest.starts_with(b"\n") {
            i += 2;
        } else if let Some(byte) = rest.get(..2).and_then(hex_byte) {
            out.push(byte);
            i += 3;
        } else {
            out.push(b'=');
            i += 1;
        }
    }
    out
}

fn hex_byte(pair: &[u8]) -> Option<u8> {
    if !pair.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u8::from_str_radix(std::str::from_utf8(pair).ok()?, 16).ok()
}

/// `type/subtype` of a part, lower-cased, with the RFC 2045 default.
fn mime_type_of(part: &MessagePart<'_>) -> String {
    part.content_type()
        .map(|ct| match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub),
            None => ct.ctype().to_string(),
        })
        .map(|m| m.to_lowercase())
        .unwrap_or_else(|| IMPLICIT_MIME_TYPE.to_string())
}

/// Skip an mbox `From ` separator line (and a UTF-8 BOM) at the start of a message.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Split a message at its first blank line into header block and body.
///
/// A message without a blank line is all headers.
fn split_header_body(data: &[u8]) -> (&[u8], &[u8]) {
    for i in 0..data.len() {
        if data[i..].starts_with(b"\r\n\r\n") {
            return (&data[..i], &data[i + 4..]);
        }
        if data[i..].starts_with(b"\n\n") {
            return (&data[..i], &data[i + 2..]);
        }
    }
    (data, &[])
}
