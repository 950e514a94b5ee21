//! `mailnorm` — normalize Gmail API messages into one canonical record.
//!
//! A message arrives either as a structured MIME tree (`format=full`) or as
//! URL-safe base64 of the raw RFC 822 bytes (`format=raw`). Both become the
//! same [`CanonicalMessage`]: decoded headers, address lists, the best
//! plain-text and HTML bodies, and attachment metadata.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod source;
pub mod summary;

pub use error::{NormalizeError, Result};
pub use model::attachment::Attachment;
pub use model::envelope::{InputFormat, MessageEnvelope};
pub use model::message::CanonicalMessage;
pub use normalize::{normalize, normalize_json, normalize_raw_bytes};
