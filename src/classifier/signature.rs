use crate::core::NodeId;
use serde::Serialize;

/// An element under evaluation together with the text it was judged on.
/// Recomputed on every pass, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateElement {
    pub node: NodeId,
    pub signature: String,
}

/// Lowercases and collapses runs of whitespace to single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Builds a signature from several text sources, skipping empty ones.
pub fn compose<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = parts
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    normalize(&joined)
}

pub fn contains_any<S: AsRef<str>>(signature: &str, keywords: &[S]) -> bool {
    keywords
        .iter()
        .any(|keyword| signature.contains(keyword.as_ref()))
}

/// First `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
