//! Message and attachment sources.
//!
//! Normalization itself is pure; these traits are the seams through which
//! envelopes and lazily fetched attachment bytes come in.

pub mod directory;
pub mod session;

pub use directory::DirectorySource;
pub use session::{CredentialRefresher, RefreshedToken, Session};

use tracing::{debug, warn};

use crate::error::Result;
use crate::model::envelope::{InputFormat, MessageEnvelope};
use crate::model::message::CanonicalMessage;

/// Lists and fetches message envelopes.
pub trait MessageSource {
    /// Ids of the most recent messages, newest first.
    ///
    /// When `labels` is non-empty only messages carrying all of them are listed.
    fn list_message_ids(
        &self,
        session: &Session,
        max_results: usize,
        labels: &[String],
    ) -> Result<Vec<String>>;

    /// Fetch one envelope in the requested format.
    fn fetch_message(
        &self,
        session: &Session,
        id: &str,
        format: InputFormat,
    ) -> Result<MessageEnvelope>;
}

/// Fetches attachment bytes that were not inlined in the message.
pub trait AttachmentSource {
    fn fetch_attachment(
        &self,
        session: &Session,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>>;
}

/// Outcome of [`resolve_attachments`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Attachments whose bytes were fetched.
    pub resolved: usize,
    /// `attachment_id`s that could not be fetched.
    pub failed: Vec<String>,
}

impl ResolveReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetch the bytes of every attachment that only carries an `attachment_id`.
///
/// A failed fetch leaves that attachment untouched and moves on.
pub fn resolve_attachments(
    message: &mut CanonicalMessage,
    session: &Session,
    source: &dyn AttachmentSource,
) -> ResolveReport {
    let mut report = ResolveReport::default();
    let message_id = message.message_id.clone();

    for attachment in message.attachments.iter_mut().filter(|a| a.needs_fetch()) {
        let Some(attachment_id) = attachment.attachment_id.clone() else {
            continue;
        };
        match source.fetch_attachment(session, &message_id, &attachment_id) {
            Ok(bytes) => {
                debug!(
                    message_id = %message_id,
                    attachment_id = %attachment_id,
                    bytes = bytes.len(),
                    "Fetched attachment"
                );
                attachment.size.get_or_insert(bytes.len() as u64);
                attachment.data = Some(bytes);
                report.resolved += 1;
            }
            Err(e) => {
                warn!(
                    message_id = %message_id,
                    attachment_id = %attachment_id,
                    filename = %attachment.filename,
                    error = %e,
                    "Failed to fetch attachment"
                );
                report.failed.push(attachment_id);
            }
        }
    }

    report
}
