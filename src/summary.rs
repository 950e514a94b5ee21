//! Compact summaries of normalized messages for downstream tools.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::envelope::{InputFormat, MessageEnvelope};
use crate::model::message::CanonicalMessage;
use crate::normalize::normalize;

/// The handful of fields most consumers need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub body: String,
}

/// Options for [`summarize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryOptions {
    /// Convert an HTML fallback body to plain text instead of returning markup.
    pub strip_html: bool,
}

/// Reduce a message to a [`Summary`].
///
/// The body prefers the plain-text part and falls back to HTML when there
/// is no usable text.
pub fn summarize(message: &CanonicalMessage, options: &SummaryOptions) -> Summary {
    Summary {
        subject: message.subject.clone(),
        from: message.from.clone(),
        to: message.to.clone(),
        cc: message.cc.clone(),
        body: body_text(message, options),
    }
}

/// Normalize an envelope and summarize it in one step.
pub fn summarize_envelope(
    envelope: &MessageEnvelope,
    format: InputFormat,
    options: &SummaryOptions,
) -> Result<Summary> {
    Ok(summarize(&normalize(envelope, format)?, options))
}

fn body_text(message: &CanonicalMessage, options: &SummaryOptions) -> String {
    let text = message.text.trim();
    if !text.is_empty() {
        return text.to_string();
    }
    let html = message.html.trim();
    if html.is_empty() {
        return String::new();
    }
    if options.strip_html {
        html_to_text(html)
    } else {
        html.to_string()
    }
}

/// Tags that end a line of text.
const BREAK_TAGS: [&str; 11] = ["br", "p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Tags dropped together with their content.
const SKIPPED_TAGS: [&str; 2] = ["script", "style"];

const ENTITIES: [(&str, char); 8] = [
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("#39", '\''),
    ("apos", '\''),
    ("nbsp", ' '),
    ("#160", ' '),
    ("amp", '&'),
];

/// Render an HTML body as plain text for a summary.
///
/// Block tags become line breaks, `<script>`/`<style>` content is dropped
/// and the common entities are decoded in a single pass.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(pos) = rest.find(['<', '&']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        rest = if rest.starts_with('&') {
            push_entity(&mut out, rest)
        } else {
            consume_tag(&mut out, rest)
        };
    }
    out.push_str(rest);
    collapse_blank_lines(&out)
}

/// `s` starts with `&`. Unknown entities are kept literally.
fn push_entity<'a>(out: &mut String, s: &'a str) -> &'a str {
    let known = s[1..].find(';').and_then(|end| {
        let name = &s[1..=end];
        ENTITIES
            .iter()
            .find(|(entity, _)| *entity == name)
            .map(|(_, ch)| (*ch, end + 2))
    });
    match known {
        Some((ch, len)) => {
            out.push(ch);
            &s[len..]
        }
        None => {
            out.push('&');
            &s[1..]
        }
    }
}

/// `s` starts with `<`. An unterminated tag swallows the rest of the input.
fn consume_tag<'a>(out: &mut String, s: &'a str) -> &'a str {
    let Some(end) = s.find('>') else {
        return "";
    };
    let inner = &s[1..end];
    let closing = inner.starts_with('/');
    let name = inner
        .trim_start_matches('/')
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    let rest = &s[end + 1..];

    if !closing && SKIPPED_TAGS.contains(&name.as_str()) {
        // ASCII lowercasing keeps byte offsets, so `at` indexes `rest`.
        let Some(at) = rest.to_ascii_lowercase().find(&format!("</{name}")) else {
            return "";
        };
        let after = &rest[at..];
        return after.find('>').map_or("", |gt| &after[gt + 1..]);
    }
    if BREAK_TAGS.contains(&name.as_str()) {
        out.push('\n');
    }
    rest
}

/// Trim every line and keep at most one blank line in a row.
fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && matches!(lines.last(), None | Some(&"")) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}
