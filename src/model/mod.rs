//! Core data model: input envelopes, canonical messages, addresses and attachments.

pub mod address;
pub mod attachment;
pub mod envelope;
pub mod message;
