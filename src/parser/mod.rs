//! Message decoding: base64url payloads, headers and encoded words, charsets,
//! part classification, and the structured and raw MIME walkers.

pub mod base64url;
pub mod body;
pub mod charset;
pub mod classify;
pub mod header;
pub mod raw;
pub mod tree;
