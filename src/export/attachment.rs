//! Save attachments to disk under a per-subject folder.

use std::path::Path;

use crate::error::{ReaderError, Result};
use crate::model::attachment::SavedAttachment;
use crate::model::mail::MailPart;

/// Turn a subject into a folder name.
///
/// Every character that is not alphanumeric becomes `_`, one for one, so the
/// output has the same number of characters as the input.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Write an attachment part to `<root>/<clean_text(subject)>/<filename>`.
///
/// Returns `Ok(None)` when the part has no usable filename. Both directories
/// are created when missing; an existing file with the same name is overwritten.
pub fn save_attachment(
    root: &Path,
    subject: &str,
    part: &MailPart,
) -> Result<Option<SavedAttachment>> {
    let Some(filename) = part.filename.as_deref() else {
        return Ok(None);
    };
    // Only the last path component is used, so the file stays in its folder
    let Some(filename) = Path::new(filename).file_name() else {
        tracing::warn!(filename, "Attachment filename has no file component, skipping");
        return Ok(None);
    };

    let folder = root.join(clean_text(subject));
    if !folder.is_dir() {
        std::fs::create_dir_all(&folder).map_err(|e| ReaderError::io(&folder, e))?;
    }

    let path = folder.join(filename);
    std::fs::write(&path, &part.payload).map_err(|e| ReaderError::io(&path, e))?;

    tracing::debug!(path = %path.display(), bytes = part.payload.len(), "Saved attachment");

    Ok(Some(SavedAttachment {
        path,
        size: part.payload.len() as u64,
    }))
}
