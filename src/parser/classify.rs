//! Part classification: attachment, body candidate, or neither.

/// What a single MIME part contributes to the canonical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartClass {
    /// Recorded in `attachments`.
    Attachment,
    /// A `text/plain` body candidate.
    Text,
    /// A `text/html` body candidate.
    Html,
    /// Containers and unrecognized leaves.
    Ignored,
}

/// The metadata classification looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartMeta<'a> {
    pub mime_type: &'a str,
    pub filename: &'a str,
    pub disposition: &'a str,
    /// The bytes live elsewhere (structured path `body.attachmentId`).
    pub has_remote_ref: bool,
}

/// Classify one part.
///
/// Attachment rules are checked first, so a `text/html` part with a filename
/// never becomes a body candidate. An inline `text/plain` part without a
/// filename stays a text candidate even when it carries a Content-ID.
pub fn classify(meta: &PartMeta<'_>) -> PartClass {
    if !meta.filename.trim().is_empty()
        || meta.disposition.to_ascii_lowercase().contains("attachment")
        || meta.has_remote_ref
    {
        return PartClass::Attachment;
    }

    let mime = meta.mime_type.trim().to_ascii_lowercase();
    if mime.starts_with("text/plain") {
        PartClass::Text
    } else if mime.starts_with("text/html") {
        PartClass::Html
    } else {
        PartClass::Ignored
    }
}
