//! Where processed message content goes.

use humansize::{format_size, BINARY};

use crate::model::attachment::SavedAttachment;

/// Line printed after every processed message.
pub const SEPARATOR: &str = "====================================================================================================";

/// Receives the visible output of a reading pass.
pub trait MessageSink {
    /// Decoded subject and sender of a message.
    fn header(&mut self, subject: &str, from: &str);

    /// A plain-text body.
    fn body(&mut self, text: &str);

    /// An attachment was written to disk.
    fn attachment(&mut self, _saved: &SavedAttachment) {}

    /// End of a message.
    fn separator(&mut self);
}

/// Default sink: everything goes through `tracing` at info level, the
/// separator goes to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn header(&mut self, subject: &str, from: &str) {
        tracing::info!("Subject: {subject}");
        tracing::info!("From: {from}");
    }

    fn body(&mut self, text: &str) {
        tracing::info!("{text}");
    }

    fn attachment(&mut self, saved: &SavedAttachment) {
        tracing::info!(
            path = %saved.path.display(),
            size = %format_size(saved.size, BINARY),
            "Saved attachment"
        );
    }

    fn separator(&mut self) {
        println!("{SEPARATOR}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_is_one_hundred_equals() {
        assert_eq!(SEPARATOR.len(), 100);
        assert!(SEPARATOR.chars().all(|c| c == '='));
    }
}
