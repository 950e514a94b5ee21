//! Write attachment bytes to disk.

use std::path::{Path, PathBuf};

use crate::model::attachment::Attachment;
use crate::model::message::CanonicalMessage;

/// Longest filename stem we write.
const MAX_FILENAME_LEN: usize = 150;

/// Write a single attachment into `output_dir`.
///
/// Returns `Ok(None)` when the attachment has no bytes yet (still needs
/// fetching by `attachment_id`).
pub fn save_attachment(attachment: &Attachment, output_dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    let Some(data) = attachment.data.as_deref() else {
        return Ok(None);
    };

    let name = match (attachment.filename.trim(), attachment.content_id.as_deref()) {
        ("", Some(cid)) => cid,
        ("", None) => "attachment",
        (name, _) => name,
    };
    let filename = sanitize_filename_part(name, MAX_FILENAME_LEN);

    // Avoid overwriting — append a counter if needed
    let path = unique_path(&output_dir.join(filename));
    std::fs::write(&path, data)?;
    Ok(Some(path))
}

/// Write every attachment of `message` that has bytes into `output_dir`.
///
/// Attachments that were never fetched are skipped with a warning; a write
/// failure on one attachment does not stop the others.
pub fn save_attachments(message: &CanonicalMessage, output_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut paths = Vec::new();

    for att in &message.attachments {
        match save_attachment(att, output_dir) {
            Ok(Some(path)) => paths.push(path),
            Ok(None) => {
                tracing::warn!(
                    message_id = %message.message_id,
                    filename = %att.filename,
                    attachment_id = att.attachment_id.as_deref().unwrap_or(""),
                    "Attachment has no bytes, skipping"
                );
            }
            Err(e) => {
                tracing::warn!(
                    filename = %att.filename,
                    error = %e,
                    "Failed to save attachment"
                );
            }
        }
    }

    Ok(paths)
}

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    // Leading dots would make hidden files (or `..`)
    let sanitized = sanitized.trim_start_matches('.');
    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized.to_string()
    }
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    // Fallback — very unlikely
    parent.join(format!("{stem}_dup.{ext}"))
}
