//! Parsed message and part types.

use super::attachment::SavedAttachment;

/// A message fetched from the server, parsed for dispatch.
///
/// Lives only for one iteration of the fetch loop.
#[derive(Debug, Clone)]
pub struct MailMessage {
    /// Decoded `Subject:` header (RFC 2047 encoded-words resolved).
    pub subject: String,

    /// Decoded `From:` header.
    pub from: String,

    /// Whether the top-level content type is `multipart/*`.
    pub multipart: bool,

    /// Every MIME part, depth-first in document order.
    /// The first entry is the message itself.
    pub parts: Vec<MailPart>,
}

/// One MIME body segment.
#[derive(Debug, Clone)]
pub struct MailPart {
    /// Lowercase `type/subtype` (e.g. `"text/plain"`).
    pub content_type: String,

    /// Raw `Content-Disposition` header value; empty when absent.
    pub disposition: String,

    /// Filename from `Content-Disposition` or the `Content-Type` name parameter.
    pub filename: Option<String>,

    /// Payload with the transfer encoding removed.
    pub payload: Vec<u8>,

    /// Charset-decoded text, for text parts that decoded cleanly.
    pub text: Option<String>,
}

impl MailPart {
    /// `true` if the disposition header mentions `attachment`.
    pub fn is_attachment(&self) -> bool {
        self.disposition.to_ascii_lowercase().contains("attachment")
    }

    /// `true` for `text/plain` parts.
    pub fn is_plain_text(&self) -> bool {
        self.content_type == "text/plain"
    }

    /// Text of the part, or `None` when its payload did not decode cleanly
    /// in the declared charset.
    pub fn decode_text(&self) -> Option<String> {
        self.text.clone()
    }
}

/// What processing a single part did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartOutcome {
    /// A plain-text body was handed to the sink.
    Logged,
    /// An attachment was written to disk.
    Saved(SavedAttachment),
    /// Nothing happened (HTML, inline non-text, undecodable text, no filename).
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(content_type: &str, disposition: &str, payload: &[u8]) -> MailPart {
        MailPart {
            content_type: content_type.into(),
            disposition: disposition.into(),
            filename: None,
            payload: payload.to_vec(),
            text: None,
        }
    }

    #[test]
    fn test_attachment_detection_is_substring_match() {
        assert!(part("application/pdf", "attachment; filename=\"a.pdf\"", b"").is_attachment());
        assert!(part("image/png", "Attachment", b"").is_attachment());
        assert!(!part("image/png", "inline", b"").is_attachment());
        assert!(!part("text/plain", "", b"").is_attachment());
    }

    #[test]
    fn test_decode_text_never_reinterprets_payload() {
        let undecoded = part("text/plain", "", b"Hello world");
        assert_eq!(undecoded.decode_text(), None);

        let decoded = MailPart {
            text: Some("Hello world".into()),
            ..undecoded
        };
        assert_eq!(decoded.decode_text().as_deref(), Some("Hello world"));
    }
}
