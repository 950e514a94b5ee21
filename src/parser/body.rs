//! Body candidate collection and multipart/alternative resolution.

use crate::model::attachment::Attachment;

/// Pick the richest body among alternative renderings.
///
/// Empty and whitespace-only candidates are dropped; the longest remaining
/// one wins (first seen on ties). Returns an empty string when nothing is left.
pub fn select_best(candidates: &[String]) -> String {
    candidates
        .iter()
        .filter(|c| !c.trim().is_empty())
        .map(|c| (c.chars().count(), c))
        .fold(None::<(usize, &String)>, |best, cur| match best {
            Some(b) if b.0 >= cur.0 => Some(b),
            _ => Some(cur),
        })
        .map(|(_, c)| c.clone())
        .unwrap_or_default()
}

/// What a walker collected from one message, before body selection.
///
/// Both the structured and the raw walker fill the same accumulator so the
/// two input formats cannot diverge in what they report.
#[derive(Debug, Clone, Default)]
pub struct Walk {
    pub texts: Vec<String>,
    pub htmls: Vec<String>,
    pub attachments: Vec<Attachment>,
}

impl Walk {
    /// Best text body.
    pub fn best_text(&self) -> String {
        select_best(&self.texts)
    }

    /// Best HTML body.
    pub fn best_html(&self) -> String {
        select_best(&self.htmls)
    }
}
