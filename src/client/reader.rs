//! The reading pass: search, fetch, parse, and dispatch each part.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::error::{ReaderError, Result};
use crate::export::attachment::save_attachment;
use crate::model::mail::{MailPart, PartOutcome};
use crate::parser::mime;

use super::session::{self, ImapConnection, MailSession, ScopedSession};
use super::sink::{MessageSink, TracingSink};

/// Counters for one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Messages fetched and processed.
    pub messages: usize,
    /// Plain-text bodies handed to the sink.
    pub bodies_logged: usize,
    /// Attachments written to disk.
    pub attachments_saved: usize,
    /// Total attachment bytes written.
    pub bytes_saved: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &PartOutcome) {
        match outcome {
            PartOutcome::Logged => self.bodies_logged += 1,
            PartOutcome::Saved(saved) => {
                self.attachments_saved += 1;
                self.bytes_saved += saved.size;
            }
            PartOutcome::Skipped => {}
        }
    }
}

/// Reads one mailbox: logs plain-text bodies and saves attachments.
pub struct MailReader<K: MessageSink = TracingSink> {
    config: ReaderConfig,
    sink: K,
}

impl MailReader<TracingSink> {
    /// Create a reader that logs through `tracing`.
    ///
    /// Fails with [`ReaderError::Config`] when both user and password are
    /// missing or empty.
    pub fn new(config: ReaderConfig) -> Result<Self> {
        Self::with_sink(config, TracingSink)
    }
}

impl<K: MessageSink> MailReader<K> {
    /// Create a reader that sends its output to `sink`.
    pub fn with_sink(config: ReaderConfig, sink: K) -> Result<Self> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !present(&config.user) && !present(&config.password) {
            return Err(ReaderError::Config("User and password are required".into()));
        }
        Ok(Self { config, sink })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Open a session to the configured server and log in.
    pub fn connect_and_authenticate(&self) -> Result<ImapConnection> {
        let cfg = &self.config;
        let tls = cfg.use_tls();
        info!(
            host = %cfg.host,
            port = cfg.port,
            tls,
            mail = cfg.mail.as_deref().unwrap_or(""),
            "Connecting"
        );
        session::connect(
            &cfg.host,
            cfg.port,
            tls,
            cfg.user.as_deref().unwrap_or_default(),
            cfg.password.as_deref().unwrap_or_default(),
        )
    }

    /// Search the selected mailbox.
    ///
    /// A `NO` or `BAD` answer is not an error: it is logged and yields no ids.
    pub fn search<S: MailSession>(&self, session: &mut S, criteria: &str) -> Result<Vec<u32>> {
        match session.search(criteria) {
            Ok(ids) => {
                debug!(criteria, count = ids.len(), "Search finished");
                Ok(ids)
            }
            Err(e) if e.is_rejection() => {
                warn!(criteria, error = %e, "No messages found!");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Run a full pass against the configured server.
    pub fn process(&mut self) -> Result<RunSummary> {
        let connection = self.connect_and_authenticate()?;
        self.process_session(connection)
    }

    /// Run a full pass over an already authenticated session.
    ///
    /// The session is closed and logged out whether or not the pass succeeds.
    pub fn process_session<S: MailSession>(&mut self, session: S) -> Result<RunSummary> {
        let mut scoped = ScopedSession::new(session);
        scoped.select(&self.config.mailbox)?;

        let criteria = self.config.search.clone();
        let ids = self.search(scoped.session_mut(), &criteria)?;
        info!(mailbox = %self.config.mailbox, count = ids.len(), "Processing messages");

        let mut summary = RunSummary::default();
        for id in ids {
            let Some(raw) = scoped.session_mut().fetch_rfc822(id)? else {
                warn!(id, "Server returned no body for message, skipping");
                continue;
            };
            for outcome in self.process_message(&raw)? {
                summary.record(&outcome);
            }
            summary.messages += 1;
        }

        scoped.release()?;
        Ok(summary)
    }

    /// Process one raw `RFC822` message and report what each part did.
    pub fn process_message(&mut self, raw: &[u8]) -> Result<Vec<PartOutcome>> {
        let message = mime::parse_message(raw)?;
        self.sink.header(&message.subject, &message.from);

        let outcomes = if message.multipart {
            message
                .parts
                .iter()
                .map(|part| self.process_part(part, &message.subject))
                .collect::<Result<Vec<_>>>()?
        } else {
            message
                .parts
                .first()
                .map(|body| self.process_body(body))
                .into_iter()
                .collect()
        };

        self.sink.separator();
        Ok(outcomes)
    }

    /// Apply the part rule to one part of a multipart message.
    ///
    /// - `text/plain` without an attachment disposition is logged
    /// - anything with an attachment disposition is saved
    /// - everything else is ignored
    pub fn process_part(&mut self, part: &MailPart, subject: &str) -> Result<PartOutcome> {
        if part.is_plain_text() && !part.is_attachment() {
            Ok(self.log_text(part))
        } else if part.is_attachment() {
            self.download_attachment(part, subject)
        } else {
            Ok(PartOutcome::Skipped)
        }
    }

    /// Apply the body rule to a single-part message: only `text/plain` is logged.
    pub fn process_body(&mut self, body: &MailPart) -> PartOutcome {
        if body.is_plain_text() {
            self.log_text(body)
        } else {
            PartOutcome::Skipped
        }
    }

    fn download_attachment(&mut self, part: &MailPart, subject: &str) -> Result<PartOutcome> {
        match save_attachment(&self.config.path_attachments, subject, part)? {
            Some(saved) => {
                self.sink.attachment(&saved);
                Ok(PartOutcome::Saved(saved))
            }
            None => Ok(PartOutcome::Skipped),
        }
    }

    fn log_text(&mut self, part: &MailPart) -> PartOutcome {
        match part.decode_text() {
            Some(text) => {
                self.sink.body(&text);
                PartOutcome::Logged
            }
            None => {
                debug!(content_type = %part.content_type, "Body is not decodable text, skipping");
                PartOutcome::Skipped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attachment::SavedAttachment;

    #[derive(Default)]
    struct Recorder {
        headers: Vec<(String, String)>,
        bodies: Vec<String>,
        saved: Vec<SavedAttachment>,
        separators: usize,
    }

    impl MessageSink for Recorder {
        fn header(&mut self, subject: &str, from: &str) {
            self.headers.push((subject.into(), from.into()));
        }
        fn body(&mut self, text: &str) {
            self.bodies.push(text.into());
        }
        fn attachment(&mut self, saved: &SavedAttachment) {
            self.saved.push(saved.clone());
        }
        fn separator(&mut self) {
            self.separators += 1;
        }
    }

    fn config(user: Option<&str>, password: Option<&str>) -> ReaderConfig {
        ReaderConfig {
            user: user.map(String::from),
            password: password.map(String::from),
            ..ReaderConfig::default()
        }
    }

    fn text_part(content_type: &str, disposition: &str, body: &[u8]) -> MailPart {
        MailPart {
            content_type: content_type.into(),
            disposition: disposition.into(),
            filename: None,
            payload: body.to_vec(),
            text: std::str::from_utf8(body).ok().map(String::from),
        }
    }

    #[test]
    fn test_missing_credentials_rejected() {
        for (u, p) in [(None, None), (Some(""), None), (None, Some("")), (Some(""), Some(""))] {
            let err = MailReader::new(config(u, p)).err().expect("should fail");
            assert!(matches!(err, ReaderError::Config(_)));
        }
    }

    #[test]
    fn test_either_credential_is_enough() {
        assert!(MailReader::new(config(Some("alice"), None)).is_ok());
        assert!(MailReader::new(config(None, Some("secret"))).is_ok());
        assert!(MailReader::new(config(Some("alice"), Some("secret"))).is_ok());
    }

    #[test]
    fn test_plain_text_part_is_logged_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ReaderConfig {
            path_attachments: tmp.path().join("out"),
            ..config(Some("u"), Some("p"))
        };
        let mut reader = MailReader::with_sink(cfg, Recorder::default()).unwrap();

        let outcome = reader
            .process_part(&text_part("text/plain", "", b"Hello world"), "Subject")
            .unwrap();
        assert_eq!(outcome, PartOutcome::Logged);
        assert_eq!(reader.sink().bodies, ["Hello world"]);
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_undecodable_text_is_skipped_silently() {
        let mut reader =
            MailReader::with_sink(config(Some("u"), None), Recorder::default()).unwrap();
        let outcome = reader
            .process_part(&text_part("text/plain", "", &[0xc3, 0x28]), "s")
            .unwrap();
        assert_eq!(outcome, PartOutcome::Skipped);
        assert!(reader.sink().bodies.is_empty());
    }

    #[test]
    fn test_html_and_inline_parts_are_ignored() {
        let mut reader =
            MailReader::with_sink(config(Some("u"), None), Recorder::default()).unwrap();
        let html = text_part("text/html", "", b"<p>Hi</p>");
        let inline_image = text_part("image/png", "inline", b"\x89PNG");
        assert_eq!(reader.process_part(&html, "s").unwrap(), PartOutcome::Skipped);
        assert_eq!(reader.process_part(&inline_image, "s").unwrap(), PartOutcome::Skipped);
        assert!(reader.sink().bodies.is_empty());
    }

    #[test]
    fn test_text_attachment_is_saved_not_logged() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ReaderConfig {
            path_attachments: tmp.path().to_path_buf(),
            ..config(Some("u"), None)
        };
        let mut reader = MailReader::with_sink(cfg, Recorder::default()).unwrap();
        let part = MailPart {
            filename: Some("notes.txt".into()),
            ..text_part("text/plain", "attachment; filename=\"notes.txt\"", b"notes")
        };

        let outcome = reader.process_part(&part, "Minutes").unwrap();
        assert!(matches!(outcome, PartOutcome::Saved(_)));
        assert!(reader.sink().bodies.is_empty());
        assert_eq!(reader.sink().saved.len(), 1);
        assert_eq!(
            std::fs::read(tmp.path().join("Minutes").join("notes.txt")).unwrap(),
            b"notes"
        );
    }

    #[test]
    fn test_single_body_only_logs_plain_text() {
        let mut reader =
            MailReader::with_sink(config(Some("u"), None), Recorder::default()).unwrap();
        assert_eq!(
            reader.process_body(&text_part("text/plain", "", b"plain")),
            PartOutcome::Logged
        );
        assert_eq!(
            reader.process_body(&text_part("text/html", "", b"<b>x</b>")),
            PartOutcome::Skipped
        );
        assert_eq!(reader.sink().bodies, ["plain"]);
    }

    #[test]
    fn test_process_message_emits_header_and_separator() {
        let mut reader =
            MailReader::with_sink(config(Some("u"), None), Recorder::default()).unwrap();
        let raw = b"From: =?UTF-8?B?Sm9zw6k=?= <jose@example.com>\r\n\
Subject: =?UTF-8?Q?Caf=C3=A9?=\r\n\
\r\n\
Body text\r\n";
        let outcomes = reader.process_message(raw).unwrap();
        assert_eq!(outcomes, [PartOutcome::Logged]);

        let sink = reader.into_sink();
        assert_eq!(
            sink.headers,
            [("Café".to_string(), "José <jose@example.com>".to_string())]
        );
        assert_eq!(sink.separators, 1);
        assert_eq!(sink.bodies.len(), 1);
        assert!(sink.bodies[0].starts_with("Body text"));
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut summary = RunSummary::default();
        summary.record(&PartOutcome::Logged);
        summary.record(&PartOutcome::Skipped);
        summary.record(&PartOutcome::Saved(SavedAttachment {
            path: "a/b".into(),
            size: 10,
        }));
        assert_eq!(summary.bodies_logged, 1);
        assert_eq!(summary.attachments_saved, 1);
        assert_eq!(summary.bytes_saved, 10);
    }
}
