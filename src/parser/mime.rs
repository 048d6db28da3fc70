//! MIME message parsing: header fields and a flat, document-ordered part list.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use mail_parser::{MessageParser, MessagePart, MimeHeaders, PartType};
use quoted_printable::ParseMode;

use crate::error::{ReaderError, Result};
use crate::model::mail::{MailMessage, MailPart};
use crate::parser::header;

/// Content type assumed when a part declares none.
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Parse a complete raw message (headers + body) as fetched with `RFC822`.
///
/// Parts are listed depth-first in document order, starting with the message
/// itself, so a multipart message yields its container before its children.
/// Attached `message/rfc822` parts are listed once and not descended into.
pub fn parse_message(raw: &[u8]) -> Result<MailMessage> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| ReaderError::Mime("message could not be parsed".into()))?;

    let root_headers = header_block(raw);
    let subject = header::decoded_header(root_headers, "subject");
    let from = header::decoded_header(root_headers, "from");

    let multipart = matches!(
        parsed.parts.first().map(|p| &p.body),
        Some(PartType::Multipart(_))
    );

    let parts = parsed
        .parts
        .iter()
        .map(|part| build_part(raw, part))
        .collect();

    Ok(MailMessage {
        subject,
        from,
        multipart,
        parts,
    })
}

fn build_part(raw: &[u8], part: &MessagePart<'_>) -> MailPart {
    let content_type = part
        .content_type()
        .map(|ct| match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub),
            None => ct.ctype().to_string(),
        })
        .map(|ct| ct.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let start = part.raw_header_offset().min(raw.len());
    let end = part.raw_body_offset().clamp(start, raw.len());
    let disposition = {
        let text = header::decode_header_bytes(&raw[start..end]);
        let headers = header::unfold_headers(&text);
        header::get_header(&headers, "content-disposition").unwrap_or_default()
    };

    // mail-parser hands text parts back charset-converted, so their bytes
    // are rebuilt from the raw body.
    let (payload, text) = match &part.body {
        PartType::Text(_) | PartType::Html(_) => {
            let payload = transfer_decoded(raw, part);
            let text = if part.is_encoding_problem {
                None
            } else {
                let charset = part.content_type().and_then(|ct| ct.attribute("charset"));
                header::decode_body_strict(charset, &payload)
            };
            (payload, text)
        }
        _ => (part.contents().to_vec(), None),
    };

    MailPart {
        content_type,
        disposition,
        filename: part.attachment_name().map(String::from),
        payload,
        text,
    }
}

/// Raw body bytes of `part` with only the Content-Transfer-Encoding undone.
///
/// A body that fails to decode is returned as-is.
fn transfer_decoded(raw: &[u8], part: &MessagePart<'_>) -> Vec<u8> {
    let start = part.raw_body_offset().min(raw.len());
    let end = part.raw_end_offset().clamp(start, raw.len());
    let body = &raw[start..end];

    let encoding = part
        .content_transfer_encoding()
        .map(|e| e.trim().to_ascii_lowercase());
    match encoding.as_deref() {
        Some("base64") => {
            let compact: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(&compact)
                .or_else(|_| STANDARD_NO_PAD.decode(&compact))
                .unwrap_or_else(|_| body.to_vec())
        }
        Some("quoted-printable") => {
            quoted_printable::decode(body, ParseMode::Robust).unwrap_or_else(|_| body.to_vec())
        }
        _ => body.to_vec(),
    }
}

/// Slice of `data` holding the top-level headers (everything before the first blank line).
fn header_block(data: &[u8]) -> &[u8] {
    &data[..find_header_end(data).unwrap_or(data.len())]
}

/// Find the byte offset where headers end (position of the first blank line).
fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if data[i..].starts_with(b"\r\n\r\n") {
            return Some(i);
        }
    }
    None
}
