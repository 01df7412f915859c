use std::error::Error;
use std::fmt;
use std::io;

/// Errors that abort an in-progress session (handshake failures, transport
/// loss). Recoverable protocol/authorization conditions never become one of
/// these -- they are turned into a reply string by the dispatcher and the
/// session continues.
#[derive(Debug)]
pub enum SessionError {
    /// The peer closed the socket (zero-length read) before completing the
    /// handshake.
    PeerClosed { addr: String },
    /// `/login` was attempted against an unknown login or with the wrong
    /// password; this ends the session.
    LoginRejected { addr: String, reason: &'static str },
    /// A socket read or write failed.
    Io(io::Error),
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::PeerClosed { addr } => {
                write!(f, "connection with {} reset before handshake completed", addr)
            }
            SessionError::LoginRejected { addr, reason } => {
                write!(f, "login rejected for {}: {}", addr, reason)
            }
            SessionError::Io(e) => write!(f, "transport error: {}", e),
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        SessionError::Io(e)
    }
}

/// Fatal errors that must reach the process entry point.
#[derive(Debug)]
pub struct ServeError {
    pub addr: String,
    pub source: io::Error,
}

impl Error for ServeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not bind listener on {}: {}", self.addr, self.source)
    }
}
