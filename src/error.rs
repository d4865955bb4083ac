use std::io;

/// Errors produced while building, sending or reading an HTTP request.
///
/// Everything that is not a successful `200` response ends up here, so
/// callers only have to distinguish "got a response" from "network error".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connecting, reading or writing failed, including timeouts.
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),

    /// The TLS handshake or record layer failed.
    #[error("tls failure: {0}")]
    Tls(#[from] rustls::Error),

    /// The request URL (or a redirect's `Location`) could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The URL is neither `http` nor `https`.
    #[error("unsupported url scheme `{0}`")]
    UnsupportedScheme(String),

    /// The server answered with something other than `200` (or a redirect
    /// that the policy did not follow).
    #[error("http status {code}{}", status_suffix(.body))]
    Status {
        /// The status code.
        code: u16,
        /// The error body as text, `None` when it was empty.
        body: Option<String>,
    },

    /// A redirect to be followed carried no `Location`.
    #[error("redirect response without a Location header")]
    MissingLocation,

    /// The redirect policy limit was reached.
    #[error("gave up after {0} redirects")]
    TooManyRedirects(usize),

    /// A streamed body was needed a second time.
    #[error("request body was streamed and cannot be sent again")]
    BodyNotReplayable,

    /// The charset label is unknown or cannot be encoded into.
    #[error("unsupported charset `{0}`")]
    UnsupportedCharset(String),

    /// The response head or framing could not be parsed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A header name or value would corrupt the request head.
    #[error("invalid header `{0}`")]
    InvalidHeader(String),

    /// The call was cancelled through its `PendingCall`.
    #[error("call was cancelled")]
    Cancelled,

    /// The executor would not accept the call.
    #[error("executor rejected the call: {0}")]
    Rejected(#[from] ExecutorError),
}

impl Error {
    /// The HTTP status code, when this error came from a non-`200` response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedResponse(reason.into())
    }
}

fn status_suffix(body: &Option<String>) -> String {
    match body {
        Some(body) => format!(": {body}"),
        None => String::new(),
    }
}

/// A task could not be handed to an [`Executor`](crate::executor::Executor).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    /// The queue is at capacity.
    #[error("task queue is full")]
    Rejected,
    /// The executor has shut down and no longer accepts work.
    #[error("executor is shut down")]
    Shutdown,
}
