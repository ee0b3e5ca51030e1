use std::io::{self, Write};
use thiserror::Error;

/// A logged-in connection to a remote file server
///
/// All paths are interpreted relative to the current remote directory, like a shell session.
pub trait Session {
    /// List the names in the current directory
    fn list(&mut self) -> Result<Vec<String>, SessionError>;

    /// Change into a directory (relative or absolute)
    ///
    /// Fails with a permanent error when `dir` is not a directory.
    fn enter(&mut self, dir: &str) -> Result<(), SessionError>;

    /// Change into the parent directory
    fn leave(&mut self) -> Result<(), SessionError>;

    /// The size of a file in bytes
    fn size(&mut self, file: &str) -> Result<u64, SessionError>;

    /// Download a file into `sink`, skipping the first `offset` bytes
    ///
    /// Returns the number of bytes written.
    fn retrieve(&mut self, file: &str, offset: u64, sink: &mut dyn Write)
    -> Result<u64, SessionError>;
}

/// Opens new [`Session`]s
///
/// Parallel downloads each get their own session, which is why connectors are shared between
/// threads.
pub trait Connector: Sync {
    /// The kind of session this connector opens
    type Session: Session;

    /// Connect and log in
    fn connect(&self) -> Result<Self::Session, SessionError>;
}

/// Errors reported by a [`Session`]
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server answered a command with an error reply
    #[error("Server replied {code}: {message}")]
    Rejected { code: u32, message: String },

    /// The connection itself failed
    #[error("Connection failed")]
    Io(#[from] io::Error),

    /// Any other protocol failure
    #[error("{0}")]
    Protocol(String),
}

impl SessionError {
    /// The reply code, if the server sent one
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Is this a permanent (5xx) rejection, which retrying will not fix?
    pub fn is_permanent(&self) -> bool {
        self.code().is_some_and(|code| (500..600).contains(&code))
    }

    /// Did the server turn us away because too many clients are connected?
    pub fn is_connection_limit(&self) -> bool {
        match self {
            Self::Rejected { code: 530, message } => {
                message.contains("maximum number of clients")
            }
            _ => false,
        }
    }
}
