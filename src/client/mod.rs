//! IMAP client: session access, output sinks, and the reading pass.

pub mod reader;
pub mod session;
pub mod sink;

pub use reader::{MailReader, RunSummary};
pub use session::{ImapConnection, MailSession, ScopedSession};
pub use sink::{MessageSink, TracingSink};
