//! The canonical message record produced by normalization.

use std::collections::BTreeMap;

use super::attachment::Attachment;

/// Unified view of a message, independent of the input format it came from.
///
/// Built once by [`crate::normalize::normalize`]; nothing in this crate
/// mutates it afterwards except [`crate::source::resolve_attachments`],
/// which fills in lazily fetched attachment bytes on the caller's behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanonicalMessage {
    /// Opaque message identifier from the envelope.
    pub message_id: String,

    /// Opaque thread identifier from the envelope.
    pub thread_id: String,

    /// Decoded `Subject:` (empty if absent).
    pub subject: String,

    /// Decoded `From:` (empty if absent).
    pub from: String,

    /// `To:` recipients as `"Name <addr>"` strings.
    pub to: Vec<String>,

    /// `Cc:` recipients.
    pub cc: Vec<String>,

    /// `Bcc:` recipients.
    pub bcc: Vec<String>,

    /// RFC 3339 date, or the raw `Date:` value when it did not parse.
    pub date: Option<String>,

    /// Best plain-text body (empty if none).
    pub text: String,

    /// Best HTML body (empty if none).
    pub html: String,

    /// Top-level headers, lower-cased names, decoded values. Last write wins.
    pub headers: BTreeMap<String, String>,

    /// Attachments and inline parts in discovery order.
    pub attachments: Vec<Attachment>,
}

impl CanonicalMessage {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Attachments whose bytes still need to be fetched remotely.
    pub fn pending_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.needs_fetch())
    }
}
