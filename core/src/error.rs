//! Error types for the fetch client.
//!
//! # Design
//! Every failure is collapsed into one of four `ErrorKind`s so callers can
//! branch on the category without matching transport internals. The
//! original transport error is kept as the `source` of a `FetchError`, and
//! `report()` flattens the whole chain into one diagnostic string.
//!
//! Text-returning entry points embed errors in the same channel as bodies.
//! All tags start with `ERROR_TEXT_PREFIX` so the two stay distinguishable.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

/// Prefix shared by every error tag rendered into a text result.
pub const ERROR_TEXT_PREFIX: &str = "[HTTP_ERROR:";

/// Category of a fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A connect, read or body timeout elapsed.
    SocketTimeout,

    /// The TCP or TLS session could not be established.
    ConnectFail,

    /// Any other I/O failure, including malformed URLs.
    Io,

    /// Everything else: invalid header names, unsupported schemes, protocol
    /// violations.
    Generic,
}

impl ErrorKind {
    /// Fixed text tag used when an error is rendered into a text result.
    pub fn tag(self) -> &'static str {
        match self {
            ErrorKind::SocketTimeout => "[HTTP_ERROR:SOCKET_TIMEOUT]",
            ErrorKind::ConnectFail => "[HTTP_ERROR:CONNECT_FAIL]",
            ErrorKind::Io => "[HTTP_ERROR:IO]",
            ErrorKind::Generic => "[HTTP_ERROR:ERROR]",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::SocketTimeout => write!(f, "socket timeout"),
            ErrorKind::ConnectFail => write!(f, "connect failed"),
            ErrorKind::Io => write!(f, "i/o failure"),
            ErrorKind::Generic => write!(f, "error"),
        }
    }
}

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A classified fetch failure.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl FetchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The error followed by every link of its source chain. A link whose
    /// text only repeats the line before it is left out.
    pub fn report(&self) -> String {
        let mut out = self.to_string();
        let mut previous = self.message.clone();
        let mut cause = self.source();
        while let Some(err) = cause {
            let text = err.to_string();
            if text != previous {
                out.push_str("\ncaused by: ");
                out.push_str(&text);
            }
            previous = text;
            cause = err.source();
        }
        out
    }

    /// Render as `{tag}{{report}}` for the text result channel.
    pub fn to_text(&self) -> String {
        format!("{}{{{}}}", self.kind.tag(), self.report())
    }
}

/// Whether a text result carries an error rather than a body.
pub fn is_error_text(text: &str) -> bool {
    text.starts_with(ERROR_TEXT_PREFIX)
}

fn ureq_kind(err: &ureq::Error) -> ErrorKind {
    match err {
        ureq::Error::Timeout(_) => ErrorKind::SocketTimeout,
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => ErrorKind::ConnectFail,
        ureq::Error::Io(e) => io_kind(e),
        ureq::Error::BadUri(_) => ErrorKind::Io,
        _ => ErrorKind::Generic,
    }
}

fn io_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::SocketTimeout,
        io::ErrorKind::ConnectionRefused => ErrorKind::ConnectFail,
        _ => match err.get_ref().and_then(|inner| inner.downcast_ref::<ureq::Error>()) {
            Some(inner) => ureq_kind(inner),
            None => ErrorKind::Io,
        },
    }
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        FetchError::new(ureq_kind(&err), err.to_string()).with_source(err)
    }
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> Self {
        FetchError::new(io_kind(&err), err.to_string()).with_source(err)
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::new(ErrorKind::Io, format!("malformed url: {err}")).with_source(err)
    }
}

impl From<ureq::http::Error> for FetchError {
    fn from(err: ureq::http::Error) -> Self {
        FetchError::new(ErrorKind::Generic, format!("invalid request: {err}")).with_source(err)
    }
}
