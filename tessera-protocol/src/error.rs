//! Protocol error taxonomy.

use thiserror::Error;

/// An error that can occur while decoding or encoding messages.
///
/// Every variant is fatal to the connection it occurred on; quota
/// violations are not errors and never reach this type.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The peer sent a command this server does not know.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    /// A length prefix exceeded its bound.
    #[error("command of {0} bytes exceeds the maximum length")]
    CommandTooLong(usize),
    /// A string was not valid UTF-8.
    #[error("malformed string payload: {0}")]
    MalformedString(String),
    /// The underlying socket failed or closed mid-message.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
