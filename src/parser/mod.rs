//! Email parsing: header decoding and MIME part extraction.

pub mod header;
pub mod mime;
