//! Attachment and inline-part records.
//!
//! On the structured (Gmail API) path large attachments arrive without
//! bytes; only `attachment_id` is known and the payload is fetched later
//! through [`crate::source::AttachmentSource`].

/// An attachment or inline part discovered while walking a message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Decoded filename (may be empty).
    pub filename: String,

    /// MIME content type (e.g. `"image/png"`). Defaults to
    /// [`DEFAULT_MIME_TYPE`] when the part declares none.
    pub mime_type: String,

    /// Content-ID without angle brackets, for `cid:` references from HTML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,

    /// Size as reported by the source; not verified against `data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Payload bytes, present when they were inlined with the part.
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,

    /// Remote reference for bytes that must be fetched separately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
}

/// Fallback content type for parts that declare none.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

impl Attachment {
    /// `true` if the bytes still have to be fetched by `attachment_id`.
    pub fn needs_fetch(&self) -> bool {
        self.data.is_none() && self.attachment_id.is_some()
    }
}

/// Serialize `data` as unpadded URL-safe base64, the encoding the Gmail API
/// uses for every payload.
mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::parser::base64url::{decode_url_safe_base64, encode_url_safe_base64};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => s.serialize_some(&encode_url_safe_base64(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        Ok(encoded.map(|e| decode_url_safe_base64(e.as_bytes())))
    }
}
