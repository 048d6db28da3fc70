//! IMAP session access.
//!
//! [`MailSession`] is the small set of commands a reading pass needs. It is
//! implemented for `imap::Session` over any stream, and for [`ImapConnection`],
//! which is what [`connect`] hands back.

use std::io::{Read, Write};
use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};

use crate::error::{ReaderError, Result};

/// Commands issued against one authenticated IMAP session.
pub trait MailSession {
    /// Select a mailbox for the following commands.
    fn select(&mut self, mailbox: &str) -> Result<()>;

    /// Run `SEARCH` and return the matching sequence numbers in ascending order.
    fn search(&mut self, criteria: &str) -> Result<Vec<u32>>;

    /// Fetch the full raw message (`RFC822`). `None` if the server sent no body.
    fn fetch_rfc822(&mut self, id: u32) -> Result<Option<Vec<u8>>>;

    /// Close the selected mailbox.
    fn close(&mut self) -> Result<()>;

    /// End the session.
    fn logout(&mut self) -> Result<()>;
}

/// Map an IMAP error, keeping `NO`/`BAD` answers apart from transport failures.
fn imap_error(command: &str, err: imap::error::Error) -> ReaderError {
    match err {
        imap::error::Error::No(reason) | imap::error::Error::Bad(reason) => {
            ReaderError::Rejected {
                command: command.to_string(),
                reason,
            }
        }
        other => ReaderError::Imap(format!("{command}: {other}")),
    }
}

impl<T: Read + Write> MailSession for imap::Session<T> {
    fn select(&mut self, mailbox: &str) -> Result<()> {
        imap::Session::select(self, mailbox)
            .map(|_| ())
            .map_err(|e| imap_error("SELECT", e))
    }

    fn search(&mut self, criteria: &str) -> Result<Vec<u32>> {
        let found = imap::Session::search(self, criteria).map_err(|e| imap_error("SEARCH", e))?;
        let mut ids: Vec<u32> = found.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch_rfc822(&mut self, id: u32) -> Result<Option<Vec<u8>>> {
        let fetches =
            imap::Session::fetch(self, id.to_string(), "RFC822").map_err(|e| imap_error("FETCH", e))?;
        Ok(fetches.iter().find_map(|f| f.body().map(<[u8]>::to_vec)))
    }

    fn close(&mut self) -> Result<()> {
        imap::Session::close(self).map_err(|e| imap_error("CLOSE", e))
    }

    fn logout(&mut self) -> Result<()> {
        imap::Session::logout(self).map_err(|e| imap_error("LOGOUT", e))
    }
}

/// An authenticated session, encrypted or not.
pub enum ImapConnection {
    Tls(imap::Session<TlsStream<TcpStream>>),
    Plain(imap::Session<TcpStream>),
}

impl MailSession for ImapConnection {
    fn select(&mut self, mailbox: &str) -> Result<()> {
        match self {
            Self::Tls(s) => MailSession::select(s, mailbox),
            Self::Plain(s) => MailSession::select(s, mailbox),
        }
    }

    fn search(&mut self, criteria: &str) -> Result<Vec<u32>> {
        match self {
            Self::Tls(s) => MailSession::search(s, criteria),
            Self::Plain(s) => MailSession::search(s, criteria),
        }
    }

    fn fetch_rfc822(&mut self, id: u32) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Tls(s) => s.fetch_rfc822(id),
            Self::Plain(s) => s.fetch_rfc822(id),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Tls(s) => MailSession::close(s),
            Self::Plain(s) => MailSession::close(s),
        }
    }

    fn logout(&mut self) -> Result<()> {
        match self {
            Self::Tls(s) => MailSession::logout(s),
            Self::Plain(s) => MailSession::logout(s),
        }
    }
}

/// Open a session to `host:port` and log in.
///
/// With `tls` the connection uses implicit TLS (usually port 993), otherwise
/// plain TCP (usually port 143).
pub fn connect(host: &str, port: u16, tls: bool, user: &str, password: &str) -> Result<ImapConnection> {
    let connect_err = |reason: String| ReaderError::Connect {
        host: host.to_string(),
        port,
        reason,
    };
    let auth_err = |err: imap::error::Error| ReaderError::Auth {
        user: user.to_string(),
        reason: err.to_string(),
    };

    if tls {
        let connector = TlsConnector::builder()
            .build()
            .map_err(|e| connect_err(format!("TLS setup failed: {e}")))?;
        let client = imap::connect((host, port), host, &connector)
            .map_err(|e| connect_err(e.to_string()))?;
        let session = client.login(user, password).map_err(|(e, _)| auth_err(e))?;
        Ok(ImapConnection::Tls(session))
    } else {
        let stream = TcpStream::connect((host, port)).map_err(|e| connect_err(e.to_string()))?;
        let mut client = imap::Client::new(stream);
        client
            .read_greeting()
            .map_err(|e| connect_err(e.to_string()))?;
        let session = client.login(user, password).map_err(|(e, _)| auth_err(e))?;
        Ok(ImapConnection::Plain(session))
    }
}

/// Owns a session for the length of a pass and releases it on every exit path.
///
/// Release closes the mailbox if one was selected, then logs out. Call
/// [`ScopedSession::release`] to observe release errors; on drop they are
/// only logged.
pub struct ScopedSession<S: MailSession> {
    session: S,
    selected: bool,
    released: bool,
}

impl<S: MailSession> ScopedSession<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            selected: false,
            released: false,
        }
    }

    /// Select `mailbox`, remembering to close it on release.
    pub fn select(&mut self, mailbox: &str) -> Result<()> {
        self.session.select(mailbox)?;
        self.selected = true;
        Ok(())
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Close the mailbox and log out. Later calls are no-ops.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let closed = if self.selected {
            self.session.close()
        } else {
            Ok(())
        };
        let logged_out = self.session.logout();
        closed.and(logged_out)
    }
}

impl<S: MailSession> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "Failed to release IMAP session");
        }
    }
}
