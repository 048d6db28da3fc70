//! `mailreader` — read an IMAP mailbox in one pass.
//!
//! Each message matching the search criteria is fetched, its plain-text body
//! is logged, and its attachments are saved under
//! `<path_attachments>/<sanitized subject>/<filename>`.

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod search;
