//! Saved attachment record.

use std::path::PathBuf;

/// An attachment written to disk.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SavedAttachment {
    /// Full path of the written file: `<root>/<clean subject>/<filename>`.
    pub path: PathBuf,

    /// Number of payload bytes written.
    pub size: u64,
}
