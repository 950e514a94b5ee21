//! Input envelopes in the shape returned by the Gmail API
//! (`users.messages.get` with `format=full` or `format=raw`).

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NormalizeError, Result};
use crate::parser::base64url::encode_url_safe_base64;

/// A message as delivered by a message source.
///
/// Exactly one of `payload` (structured MIME tree) or `raw` (URL-safe base64
/// of the full RFC 822 message) is normally present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub payload: Option<PayloadPart>,
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Milliseconds since the epoch, as a decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_date: Option<String>,
}

/// One node of the structured MIME tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub headers: Option<Vec<PartHeader>>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Option<Vec<PayloadPart>>,
}

/// A `{name, value}` header pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartHeader {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Body of a part: inline `data`, or an `attachmentId` to fetch later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl PayloadPart {
    /// Child parts (empty for leaves).
    pub fn children(&self) -> &[PayloadPart] {
        self.parts.as_deref().unwrap_or_default()
    }

    /// `(name, value)` header pairs, with missing fields read as empty.
    pub fn header_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().flatten().map(|h| {
            (
                h.name.as_deref().unwrap_or_default(),
                h.value.as_deref().unwrap_or_default(),
            )
        })
    }

    /// Declared MIME type, empty if absent.
    pub fn mime_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or_default()
    }
}

impl MessageEnvelope {
    /// Parse an envelope from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read an envelope from a `.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| NormalizeError::io(path, e))?;
        Self::from_json(&text)
    }

    /// Wrap a raw RFC 822 message (e.g. an `.eml` file) in a raw-format envelope.
    pub fn from_raw_bytes(id: impl Into<String>, thread_id: impl Into<String>, raw: &[u8]) -> Self {
        Self {
            id: Some(id.into()),
            thread_id: Some(thread_id.into()),
            raw: Some(encode_url_safe_base64(raw)),
            ..Self::default()
        }
    }

    /// Whether the envelope carries the given label id.
    pub fn has_label(&self, label: &str) -> bool {
        self.label_ids.iter().flatten().any(|l| l == label)
    }

    /// `internalDate` as milliseconds, if present and numeric.
    pub fn internal_date_millis(&self) -> Option<i64> {
        self.internal_date.as_deref()?.trim().parse().ok()
    }
}

/// Which input contract to normalize from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Raw when only `raw` is present, structured otherwise.
    #[default]
    Auto,
    /// Structured `payload` tree (Gmail `format=full`).
    Full,
    /// Raw RFC 822 bytes (Gmail `format=raw`); falls back to the payload
    /// when the envelope has no `raw` field.
    Raw,
}

impl InputFormat {
    /// Name as used by the Gmail API and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Full => "full",
            Self::Raw => "raw",
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "full" => Ok(Self::Full),
            "raw" => Ok(Self::Raw),
            other => Err(format!(
                "unknown message format '{other}' (expected auto, full or raw)"
            )),
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
