use super::body::RequestBody;
use super::headers::{self, Headers};
use crate::error::Error;
use url::Url;

/// Method used on the wire, derived from whether a body is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// No body.
    Get,
    /// A body is attached.
    Post,
}

impl Method {
    /// The method name as sent in the request line.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A single HTTP request: target, headers and an optional body.
///
/// A request is consumed by the call that sends it.
#[derive(Debug)]
pub struct Request {
    url: Url,
    headers: Headers,
    body: Option<RequestBody>,
}

impl Request {
    /// Starts building a request for `url`.
    ///
    /// ```rust
    /// use android_app_utils::http::Request;
    ///
    /// let request = Request::builder("https://example.com/search")
    ///     .header("Accept", "application/json")
    ///     .form([("q", "rust")], "UTF-8")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.method().as_str(), "POST");
    /// ```
    pub fn builder(url: &str) -> RequestBuilder {
        RequestBuilder {
            inner: Url::parse(url).map_err(Error::from).map(|url| Request {
                url,
                headers: Headers::new(),
                body: None,
            }),
        }
    }

    /// A body-less `GET` request for `url`.
    pub fn get(url: &str) -> Result<Self, Error> {
        Self::builder(url).build()
    }

    /// The target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Headers set on this request.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The attached body, if any.
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// `POST` when a body is attached, `GET` otherwise.
    pub fn method(&self) -> Method {
        if self.body.is_some() {
            Method::Post
        } else {
            Method::Get
        }
    }

    /// Sets `name`, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        headers::validate(name, value)?;
        self.headers.set(name, value);
        Ok(())
    }

    /// Removes every value of `name`.
    pub fn remove_header(&mut self, name: &str) -> Option<Vec<String>> {
        self.headers.remove(name)
    }

    /// Attaches `body`, making this a `POST`.
    pub fn set_body(&mut self, body: RequestBody) {
        self.body = Some(body);
    }

    /// Detaches the body, making this a `GET`.
    pub fn take_body(&mut self) -> Option<RequestBody> {
        self.body.take()
    }

    pub(crate) fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    pub(crate) fn body_mut(&mut self) -> Option<&mut RequestBody> {
        self.body.as_mut()
    }

    pub(crate) fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }
}

/// Builder for [`Request`]. The first error encountered is kept and returned
/// from [`build`](RequestBuilder::build).
#[derive(Debug)]
#[must_use = "a request builder does nothing until `build` is called"]
pub struct RequestBuilder {
    inner: Result<Request, Error>,
}

impl RequestBuilder {
    /// Sets a header. A later call with the same name (any case) wins.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let Ok(request) = &mut self.inner {
            if let Err(e) = request.set_header(name, value) {
                self.inner = Err(e);
            }
        }
        self
    }

    /// Attaches `body`.
    pub fn body(mut self, body: RequestBody) -> Self {
        if let Ok(request) = &mut self.inner {
            request.set_body(body);
        }
        self
    }

    /// Attaches raw bytes with `media_type`.
    pub fn bytes(self, media_type: &str, data: impl Into<Vec<u8>>) -> Self {
        self.body(RequestBody::bytes(media_type, data))
    }

    /// Attaches a form body, see [`RequestBody::form`].
    pub fn form<I, K, V>(self, pairs: I, charset: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.try_body(RequestBody::form(pairs, charset))
    }

    /// Attaches a JSON body, see [`RequestBody::json`].
    pub fn json(self, json: impl AsRef<str>, charset: &str) -> Self {
        self.try_body(RequestBody::json(json, charset))
    }

    /// The request, or the first error met while building it.
    pub fn build(self) -> Result<Request, Error> {
        let request = self.inner?;
        match request.url.scheme() {
            "http" | "https" => Ok(request),
            other => Err(Error::UnsupportedScheme(other.to_owned())),
        }
    }

    fn try_body(mut self, body: Result<RequestBody, Error>) -> Self {
        match body {
            Ok(body) => self.body(body),
            Err(e) => {
                self.inner = Err(e);
                self
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_follows_body() {
        let mut request = Request::get("http://localhost/").unwrap();
        assert_eq!(request.method(), Method::Get);

        request.set_body(RequestBody::bytes("text/plain", "x"));
        assert_eq!(request.method(), Method::Post);
    }

    #[test]
    fn last_header_write_wins() {
        let request = Request::builder("http://localhost/")
            .header("X-Mode", "a")
            .header("x-mode", "b")
            .build()
            .unwrap();
        assert_eq!(request.headers().get_all("X-Mode"), ["b"]);
    }

    #[test]
    fn first_error_is_reported() {
        let err = Request::builder("http://localhost/")
            .json("{}", "no-such-charset")
            .header("Bad\nName", "v")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedCharset(_)));

        assert!(matches!(
            Request::get("ftp://localhost/file"),
            Err(Error::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(Request::get("not a url"), Err(Error::InvalidUrl(_))));
    }
}
