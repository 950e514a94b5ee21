//! Message normalization: envelope in, [`CanonicalMessage`] out.
//!
//! The structured and raw inputs go through different walkers but meet in
//! [`assemble`], so the output shape never reveals which one was used.

use tracing::debug;

use crate::error::{NormalizeError, Result};
use crate::model::envelope::{InputFormat, MessageEnvelope};
use crate::model::message::CanonicalMessage;
use crate::parser::base64url::decode_url_safe_base64;
use crate::parser::body::Walk;
use crate::parser::header::{decode_address_list, find_header, header_map, normalize_date};
use crate::parser::{raw, tree};

/// The concrete input path chosen for an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Structured,
    Raw,
}

/// Normalize one message envelope.
///
/// Content problems never fail the call; only an envelope without an `id`,
/// or with neither `payload` nor `raw`, is rejected.
pub fn normalize(envelope: &MessageEnvelope, format: InputFormat) -> Result<CanonicalMessage> {
    let message_id = envelope
        .id
        .clone()
        .ok_or(NormalizeError::MissingField("id"))?;
    let thread_id = envelope.thread_id.clone().unwrap_or_default();

    let source = pick_source(envelope, format)?;
    debug!(message_id = %message_id, requested = %format, source = ?source, "Normalizing message");

    let (headers, walk) = match source {
        Source::Raw => {
            let bytes = decode_url_safe_base64(envelope.raw.as_deref().unwrap_or_default());
            let raw::RawWalk { headers, walk } = raw::walk_raw(&bytes);
            (headers, walk)
        }
        Source::Structured => {
            let payload = envelope
                .payload
                .as_ref()
                .ok_or(NormalizeError::MissingField("payload"))?;
            let headers = payload
                .header_pairs()
                .map(|(name, value)| (name.trim().to_lowercase(), value.to_string()))
                .collect();
            (headers, tree::walk_payload(payload))
        }
    };

    Ok(assemble(message_id, thread_id, &headers, walk))
}

/// Normalize an envelope given as JSON text.
pub fn normalize_json(text: &str, format: InputFormat) -> Result<CanonicalMessage> {
    normalize(&MessageEnvelope::from_json(text)?, format)
}

/// Normalize a bare RFC 822 message (e.g. an `.eml` file).
pub fn normalize_raw_bytes(
    message_id: &str,
    thread_id: &str,
    raw: &[u8],
) -> Result<CanonicalMessage> {
    let envelope = MessageEnvelope::from_raw_bytes(message_id, thread_id, raw);
    normalize(&envelope, InputFormat::Raw)
}

fn pick_source(envelope: &MessageEnvelope, format: InputFormat) -> Result<Source> {
    let has_raw = envelope.raw.is_some();
    let has_payload = envelope.payload.is_some();

    let preference: [Source; 2] = match format {
        InputFormat::Raw => [Source::Raw, Source::Structured],
        InputFormat::Full => [Source::Structured, Source::Raw],
        InputFormat::Auto if has_payload => [Source::Structured, Source::Raw],
        InputFormat::Auto => [Source::Raw, Source::Structured],
    };

    preference
        .into_iter()
        .find(|s| match s {
            Source::Raw => has_raw,
            Source::Structured => has_payload,
        })
        .ok_or(NormalizeError::MissingField("payload"))
}

/// Build the canonical record from top-level headers and a finished walk.
fn assemble(
    message_id: String,
    thread_id: String,
    headers: &[(String, String)],
    walk: Walk,
) -> CanonicalMessage {
    let decoded = header_map(headers.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let decoded_value = |name: &str| decoded.get(name).cloned().unwrap_or_default();
    let addresses = |name: &str| {
        find_header(headers, name)
            .map(decode_address_list)
            .unwrap_or_default()
    };

    let text = walk.best_text();
    let html = walk.best_html();

    CanonicalMessage {
        message_id,
        thread_id,
        subject: decoded_value("subject"),
        from: decoded_value("from"),
        to: addresses("to"),
        cc: addresses("cc"),
        bcc: addresses("bcc"),
        date: decoded.get("date").and_then(|d| normalize_date(d)),
        text,
        html,
        attachments: walk.attachments,
        headers: decoded,
    }
}
