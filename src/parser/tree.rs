//! Structured-input walker: flattens a Gmail `payload` tree and classifies
//! every node.

use tracing::debug;

use crate::model::attachment::{Attachment, DEFAULT_MIME_TYPE};
use crate::model::envelope::PayloadPart;
use crate::parser::base64url::decode_url_safe_base64;
use crate::parser::body::Walk;
use crate::parser::charset::{decode_bytes_to_text, extract_charset};
use crate::parser::classify::{classify, PartClass, PartMeta};
use crate::parser::header::{decode_header_text, find_header, strip_angle_brackets};

/// Flatten a part tree depth-first (pre-order), root included.
///
/// Siblings come out in document order, so attachments are reported in the
/// order a reader of the message would meet them.
pub fn flatten_parts(root: &PayloadPart) -> Vec<&PayloadPart> {
    let mut stack = vec![root];
    let mut out = Vec::new();
    while let Some(part) = stack.pop() {
        out.push(part);
        stack.extend(part.children().iter().rev());
    }
    out
}

/// Walk a structured payload and collect body candidates and attachments.
pub fn walk_payload(root: &PayloadPart) -> Walk {
    let mut walk = Walk::default();
    for part in flatten_parts(root) {
        visit_part(part, &mut walk);
    }
    walk
}

fn visit_part(part: &PayloadPart, walk: &mut Walk) {
    let headers: Vec<(String, String)> = part
        .header_pairs()
        .map(|(name, value)| (name.trim().to_lowercase(), value.to_string()))
        .collect();

    let mime = part.mime_type();
    let filename = part.filename.as_deref().unwrap_or_default();
    let disposition = find_header(&headers, "content-disposition").unwrap_or_default();
    let content_type = find_header(&headers, "content-type")
        .filter(|ct| !ct.trim().is_empty())
        .unwrap_or(mime);

    let body = part.body.as_ref();
    let data = body
        .and_then(|b| b.data.as_deref())
        .map(|d| decode_url_safe_base64(d))
        .unwrap_or_default();
    let attachment_id = body
        .and_then(|b| b.attachment_id.as_deref())
        .filter(|id| !id.trim().is_empty());

    let class = classify(&PartMeta {
        mime_type: mime,
        filename,
        disposition,
        has_remote_ref: attachment_id.is_some(),
    });
    debug!(
        part_id = part.part_id.as_deref().unwrap_or(""),
        mime_type = mime,
        class = ?class,
        bytes = data.len(),
        "Classified structured part"
    );

    match class {
        PartClass::Attachment => {
            let mime_type = [mime, content_type]
                .into_iter()
                .map(|m| m.split(';').next().unwrap_or_default().trim())
                .find(|m| !m.is_empty())
                .unwrap_or(DEFAULT_MIME_TYPE);

            // Inline bytes win; otherwise the remote reference stands in for them.
            let (data, attachment_id) = match attachment_id {
                Some(id) if data.is_empty() => (None, Some(id.to_string())),
                _ => (Some(data), None),
            };

            walk.attachments.push(Attachment {
                filename: decode_header_text(filename),
                mime_type: mime_type.to_string(),
                content_id: find_header(&headers, "content-id").and_then(strip_angle_brackets),
                size: body.and_then(|b| b.size),
                data,
                attachment_id,
            });
        }
        PartClass::Text => {
            let charset = extract_charset(content_type);
            walk.texts.push(decode_bytes_to_text(&data, charset.as_deref()));
        }
        PartClass::Html => {
            let charset = extract_charset(content_type);
            walk.htmls.push(decode_bytes_to_text(&data, charset.as_deref()));
        }
        PartClass::Ignored => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::envelope::{PartBody, PartHeader};
    use crate::parser::base64url::encode_url_safe_base64;

    fn leaf(mime: &str, body: &[u8]) -> PayloadPart {
        PayloadPart {
            mime_type: Some(mime.to_string()),
            body: Some(PartBody {
                data: Some(encode_url_safe_base64(body)),
                size: Some(body.len() as u64),
                ..PartBody::default()
            }),
            ..PayloadPart::default()
        }
    }

    fn container(mime: &str, parts: Vec<PayloadPart>) -> PayloadPart {
        PayloadPart {
            mime_type: Some(mime.to_string()),
            parts: Some(parts),
            ..PayloadPart::default()
        }
    }

    fn with_header(mut part: PayloadPart, name: &str, value: &str) -> PayloadPart {
        part.headers.get_or_insert_with(Vec::new).push(PartHeader {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
        });
        part
    }

    #[test]
    fn test_flatten_preorder_document_order() {
        let tree = container(
            "multipart/mixed",
            vec![
                container("multipart/alternative", vec![leaf("text/plain", b"a"), leaf("text/html", b"b")]),
                leaf("image/png", b"c"),
            ],
        );
        let mimes: Vec<&str> = flatten_parts(&tree).into_iter().map(|p| p.mime_type()).collect();
        assert_eq!(
            mimes,
            vec![
                "multipart/mixed",
                "multipart/alternative",
                "text/plain",
                "text/html",
                "image/png"
            ]
        );
    }

    #[test]
    fn test_walk_collects_nested_candidates() {
        let tree = container(
            "multipart/mixed",
            vec![
                container(
                    "multipart/alternative",
                    vec![leaf("text/plain", b"short"), leaf("text/html", b"<p>html</p>")],
                ),
                leaf("text/plain", b"a much longer plain text part"),
            ],
        );
        let walk = walk_payload(&tree);
        assert_eq!(walk.texts.len(), 2);
        assert_eq!(walk.best_text(), "a much longer plain text part");
        assert_eq!(walk.best_html(), "<p>html</p>");
        assert!(walk.attachments.is_empty());
    }

    #[test]
    fn test_charset_from_part_header() {
        let part = with_header(
            leaf("text/plain", b"caf\xe9"),
            "Content-Type",
            "text/plain; charset=\"ISO-8859-1\"",
        );
        let walk = walk_payload(&part);
        assert_eq!(walk.texts, vec!["café".to_string()]);
    }

    #[test]
    fn test_html_with_filename_is_attachment_not_body() {
        let mut part = leaf("text/html", b"<p>report</p>");
        part.filename = Some("report.html".to_string());
        let walk = walk_payload(&part);
        assert!(walk.htmls.is_empty());
        assert_eq!(walk.attachments.len(), 1);
        assert_eq!(walk.attachments[0].data.as_deref(), Some(&b"<p>report</p>"[..]));
        assert_eq!(walk.attachments[0].attachment_id, None);
    }

    #[test]
    fn test_remote_attachment() {
        let part = with_header(
            PayloadPart {
                mime_type: Some("application/pdf".to_string()),
                filename: Some("contract.pdf".to_string()),
                body: Some(PartBody {
                    attachment_id: Some("ATTACH123".to_string()),
                    size: Some(1234),
                    ..PartBody::default()
                }),
                ..PayloadPart::default()
            },
            "Content-Disposition",
            "attachment; filename=\"contract.pdf\"",
        );
        let walk = walk_payload(&part);
        let att = &walk.attachments[0];
        assert_eq!(att.filename, "contract.pdf");
        assert_eq!(att.attachment_id.as_deref(), Some("ATTACH123"));
        assert_eq!(att.size, Some(1234));
        assert!(att.data.is_none());
    }

    #[test]
    fn test_inline_image_content_id_and_encoded_filename() {
        let mut part = with_header(leaf("image/png", b"\x89PNG"), "Content-ID", "<logo@corp>");
        part.filename = Some("=?UTF-8?Q?log=C3=B3.png?=".to_string());
        let walk = walk_payload(&part);
        let att = &walk.attachments[0];
        assert_eq!(att.filename, "logó.png");
        assert_eq!(att.content_id.as_deref(), Some("logo@corp"));
        assert_eq!(att.mime_type, "image/png");
    }

    #[test]
    fn test_attachment_without_type_gets_default() {
        let mut part = leaf("", b"bytes");
        part.filename = Some("blob".to_string());
        let walk = walk_payload(&part);
        assert_eq!(walk.attachments[0].mime_type, DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_attachment_with_no_bytes_keeps_empty_data() {
        let part = PayloadPart {
            mime_type: Some("text/plain".to_string()),
            filename: Some("empty.txt".to_string()),
            ..PayloadPart::default()
        };
        let walk = walk_payload(&part);
        assert_eq!(walk.attachments[0].data.as_deref(), Some(&[][..]));
        assert_eq!(walk.attachments[0].attachment_id, None);
    }

    #[test]
    fn test_corrupt_part_does_not_blank_others() {
        let mut broken = leaf("text/plain", b"");
        broken.body = Some(PartBody {
            data: Some("***".to_string()),
            ..PartBody::default()
        });
        let tree = container(
            "multipart/alternative",
            vec![broken, leaf("text/html", b"<b>still here</b>")],
        );
        let walk = walk_payload(&tree);
        assert_eq!(walk.best_text(), "");
        assert_eq!(walk.best_html(), "<b>still here</b>");
    }
}
