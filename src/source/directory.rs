//! File-backed message source.
//!
//! Layout:
//!
//! ```text
//! <root>/<message_id>.json                                  envelope
//! <root>/attachments/<message_id>/<attachment_id>.json      {"data": "...", "size": N}
//! ```
//!
//! Both files hold exactly what the Gmail API returns for
//! `users.messages.get` and `users.messages.attachments.get`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{NormalizeError, Result};
use crate::model::envelope::{InputFormat, MessageEnvelope};
use crate::parser::base64url::decode_url_safe_base64;

use super::{AttachmentSource, MessageSource, Session};

/// Sub-directory holding fetched attachment bodies.
const ATTACHMENTS_DIR: &str = "attachments";

/// Body of an attachment file. `size` is informational and not read.
#[derive(Debug, Deserialize)]
struct AttachmentBody {
    #[serde(default)]
    data: Option<String>,
}

/// Reads envelopes and attachments from a directory of JSON files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Open a source rooted at `root`, which must be an existing directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(NormalizeError::FileNotFound(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn message_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.root.join(format!("{}.json", checked_id(id)?)))
    }

    fn attachment_path(&self, message_id: &str, attachment_id: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join(ATTACHMENTS_DIR)
            .join(checked_id(message_id)?)
            .join(format!("{}.json", checked_id(attachment_id)?)))
    }

    /// Every readable envelope in the directory, keyed by file stem (the id
    /// [`MessageSource::fetch_message`] takes). Unreadable files are skipped.
    fn load_envelopes(&self) -> Result<Vec<(String, MessageEnvelope)>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| NormalizeError::io(&self.root, e))?;
        let mut envelopes = Vec::new();

        for entry in entries {
            let path = entry.map_err(|e| NormalizeError::io(&self.root, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") || !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if checked_id(stem).is_err() {
                debug!(path = %path.display(), "Skipping file with unusable name");
                continue;
            }
            match MessageEnvelope::from_path(&path) {
                Ok(envelope) => envelopes.push((stem.to_string(), envelope)),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable envelope"),
            }
        }

        Ok(envelopes)
    }
}

impl MessageSource for DirectorySource {
    fn list_message_ids(
        &self,
        session: &Session,
        max_results: usize,
        labels: &[String],
    ) -> Result<Vec<String>> {
        session.access_token()?;
        let mut envelopes: Vec<(String, MessageEnvelope)> = self
            .load_envelopes()?
            .into_iter()
            .filter(|(_, env)| labels.iter().all(|l| env.has_label(l)))
            .collect();

        // Newest first; undated envelopes last, then by file name for a stable order.
        envelopes.sort_by(|(a_id, a), (b_id, b)| {
            b.internal_date_millis()
                .cmp(&a.internal_date_millis())
                .then_with(|| a_id.cmp(b_id))
        });

        let ids: Vec<String> = envelopes
            .into_iter()
            .map(|(id, _)| id)
            .take(max_results)
            .collect();
        debug!(root = %self.root.display(), count = ids.len(), "Listed messages");
        Ok(ids)
    }

    fn fetch_message(
        &self,
        session: &Session,
        id: &str,
        format: InputFormat,
    ) -> Result<MessageEnvelope> {
        session.access_token()?;
        let mut envelope = MessageEnvelope::from_path(self.message_path(id)?)?;
        if envelope.id.is_none() {
            envelope.id = Some(id.to_string());
        }

        // Serve only the representation that was asked for, when the file has it.
        match format {
            InputFormat::Full if envelope.payload.is_some() => envelope.raw = None,
            InputFormat::Raw if envelope.raw.is_some() => envelope.payload = None,
            _ => {}
        }
        Ok(envelope)
    }
}

impl AttachmentSource for DirectorySource {
    fn fetch_attachment(
        &self,
        session: &Session,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>> {
        session.access_token()?;
        let not_found = || NormalizeError::AttachmentNotFound {
            message_id: message_id.to_string(),
            attachment_id: attachment_id.to_string(),
        };

        let path = self.attachment_path(message_id, attachment_id)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(NormalizeError::io(&path, e)),
        };
        let body: AttachmentBody = serde_json::from_str(&text)?;
        let data = body.data.ok_or_else(not_found)?;
        Ok(decode_url_safe_base64(data))
    }
}

/// Reject ids that would escape the source directory.
fn checked_id(id: &str) -> Result<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(['/', '\\'])
    {
        return Err(NormalizeError::Source(format!("invalid id '{id}'")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "old.json",
            r#"{"id":"old","threadId":"t","labelIds":["INBOX"],"internalDate":"1000","raw":"U3ViamVjdDogT2xkDQoNCmJvZHk"}"#,
        );
        write(
            dir.path(),
            "new.json",
            r#"{"id":"new","threadId":"t","labelIds":["INBOX","IMPORTANT"],"internalDate":"2000","payload":{"mimeType":"text/plain"},"raw":"eA"}"#,
        );
        write(dir.path(), "junk.json", "not json");
        write(dir.path(), "notes.txt", "ignored");
        dir
    }

    #[test]
    fn test_list_newest_first() {
        let dir = fixture();
        let src = DirectorySource::open(dir.path()).unwrap();
        let ids = src.list_message_ids(&Session::new("me", ""), 10, &[]).unwrap();
        assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
    }

    #[test]
    fn test_list_label_filter_and_limit() {
        let dir = fixture();
        let src = DirectorySource::open(dir.path()).unwrap();
        let session = Session::new("me", "");
        let important = src
            .list_message_ids(&session, 10, &["IMPORTANT".to_string()])
            .unwrap();
        assert_eq!(important, vec!["new".to_string()]);
        assert_eq!(src.list_message_ids(&session, 1, &[]).unwrap().len(), 1);
    }

    #[test]
    fn test_listed_ids_are_fetchable_file_names() {
        let dir = fixture();
        write(
            dir.path(),
            "renamed.json",
            r#"{"id":"original-id","threadId":"t","internalDate":"3000","raw":"eA"}"#,
        );
        write(dir.path(), ".hidden.json", r#"{"id":"h","raw":"eA"}"#);
        let src = DirectorySource::open(dir.path()).unwrap();
        let session = Session::new("me", "");

        let ids = src.list_message_ids(&session, 10, &[]).unwrap();
        assert_eq!(ids, vec!["renamed".to_string(), "new".to_string(), "old".to_string()]);
        for id in &ids {
            assert!(src.fetch_message(&session, id, InputFormat::Auto).is_ok(), "{id}");
        }
        let renamed = src.fetch_message(&session, "renamed", InputFormat::Auto).unwrap();
        assert_eq!(renamed.id.as_deref(), Some("original-id"));
    }

    #[test]
    fn test_fetch_respects_format() {
        let dir = fixture();
        let src = DirectorySource::open(dir.path()).unwrap();
        let session = Session::new("me", "");
        let full = src.fetch_message(&session, "new", InputFormat::Full).unwrap();
        assert!(full.payload.is_some() && full.raw.is_none());
        let raw = src.fetch_message(&session, "new", InputFormat::Raw).unwrap();
        assert!(raw.payload.is_none() && raw.raw.is_some());
    }

    #[test]
    fn test_fetch_missing_message() {
        let dir = fixture();
        let src = DirectorySource::open(dir.path()).unwrap();
        let err = src
            .fetch_message(&Session::new("me", ""), "nope", InputFormat::Auto)
            .unwrap_err();
        assert!(matches!(err, NormalizeError::FileNotFound(_)));
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = fixture();
        let src = DirectorySource::open(dir.path()).unwrap();
        let err = src
            .fetch_message(&Session::new("me", ""), "../etc/passwd", InputFormat::Auto)
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Source(_)));
    }

    #[test]
    fn test_fetch_attachment() {
        let dir = fixture();
        let att_dir = dir.path().join("attachments").join("new");
        std::fs::create_dir_all(&att_dir).unwrap();
        write(&att_dir, "A1.json", r#"{"data":"aGVsbG8","size":5}"#);

        let src = DirectorySource::open(dir.path()).unwrap();
        let session = Session::new("me", "");
        assert_eq!(src.fetch_attachment(&session, "new", "A1").unwrap(), b"hello");
        assert!(matches!(
            src.fetch_attachment(&session, "new", "A2"),
            Err(NormalizeError::AttachmentNotFound { .. })
        ));
    }

    #[test]
    fn test_open_missing_dir() {
        assert!(matches!(
            DirectorySource::open("/definitely/not/here"),
            Err(NormalizeError::FileNotFound(_))
        ));
    }
}
