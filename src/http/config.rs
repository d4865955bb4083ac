use std::time::Duration;

/// Connect timeout used unless configured otherwise.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Read timeout used unless configured otherwise.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(20);
/// Redirect limit of the default [`RedirectPolicy`].
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// What to do with a `301`/`302` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Reissue the request against the `Location` target as a body-less
    /// `GET`, at most `max` times.
    Follow {
        /// Number of redirects followed before giving up.
        max: usize,
    },
    /// Reissue the original request unchanged, at most `max` times. The
    /// `Location` header is ignored.
    RetryOriginal {
        /// Number of retries before giving up.
        max: usize,
    },
    /// Report redirects as failures.
    None,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        RedirectPolicy::Follow {
            max: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Connection settings shared by every call made through one client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    connect_timeout: Duration,
    read_timeout: Duration,
    redirect: RedirectPolicy,
    user_agent: Option<String>,
}

impl HttpConfig {
    /// Default timeouts, the default redirect policy and no user agent.
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            redirect: RedirectPolicy::default(),
            user_agent: None,
        }
    }

    /// Timeout for establishing the TCP connection.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Timeout for each read (and write) on an established connection.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// How `301`/`302` responses are handled.
    pub fn with_redirect_policy(mut self, redirect: RedirectPolicy) -> Self {
        self.redirect = redirect;
        self
    }

    /// Sent as `User-Agent` unless a request sets its own.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// The TCP connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// The per-operation read and write timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// The redirect policy.
    pub fn redirect_policy(&self) -> RedirectPolicy {
        self.redirect
    }

    /// The default `User-Agent`, if any.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new()
    }
}
