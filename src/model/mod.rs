//! Core data model types for fetched messages, their parts, and saved attachments.

pub mod attachment;
pub mod mail;
