//! Writing message content to disk.

pub mod attachment;
