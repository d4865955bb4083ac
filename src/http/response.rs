use super::body::lookup_charset;
use super::headers::Headers;
use super::wire::{ChunkedReader, Framing, LengthReader, ResponseHead};
use crate::error::Error;
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, Read};
use std::path::Path;
use url::Url;

/// At most this much of an error response is kept in [`Error::Status`].
const ERROR_BODY_LIMIT: u64 = 64 * 1024;

/// A response whose head has been read and whose body is still on the wire.
///
/// The body stream owns the connection. Read it to the end, or drop/close the
/// response, to release the connection.
pub struct Response {
    status: u16,
    reason: String,
    headers: Headers,
    url: Url,
    body: ResponseBody,
}

impl Response {
    pub(crate) fn new(head: ResponseHead, url: Url, body: ResponseBody) -> Self {
        Self {
            status: head.status,
            reason: head.reason,
            headers: head.headers,
            url,
            body,
        }
    }

    /// The status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The reason phrase.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Response headers in arrival order.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The URL that produced this response, after any redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type")
    }

    /// The `Content-Length` header, when present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("Content-Length")
            .and_then(|value| value.trim().parse().ok())
    }

    /// The `charset` parameter of `Content-Type`, if any.
    pub fn charset(&self) -> Option<&str> {
        self.content_type()?.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"'))
        })
    }

    /// The unread body.
    pub fn body(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    /// Takes the body, dropping the head.
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Reads the whole body.
    pub fn bytes(mut self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Reads the body and decodes it with the response charset (UTF-8 when
    /// none is declared). Failures are logged and yield `None`.
    pub fn text(self) -> Option<String> {
        let charset = self.charset().unwrap_or("UTF-8").to_owned();
        let encoding = match lookup_charset(&charset) {
            Ok(encoding) => encoding,
            Err(e) => {
                log::warn!("cannot decode response from {}: {e}", self.url);
                return None;
            }
        };
        let url = self.url.clone();
        let bytes = match self.bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("failed to read response from {url}: {e}");
                return None;
            }
        };

        let (text, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            log::debug!("response from {url} is not valid {charset}, replaced bad sequences");
        }
        Some(text.into_owned())
    }

    /// Decodes the body as JSON. Failures are logged and yield `None`.
    pub fn json<T: DeserializeOwned>(self) -> Option<T> {
        let url = self.url.clone();
        let text = self.text()?;
        serde_json::from_str(&text)
            .map_err(|e| log::warn!("response from {url} is not the expected json: {e}"))
            .ok()
    }

    /// Streams the body into `path`, creating parent directories as needed.
    /// Failures are logged and yield `false`.
    pub fn save_to(mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let result = (|| -> io::Result<u64> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let mut file = File::create(path)?;
            let written = io::copy(&mut self.body, &mut file)?;
            file.sync_all()?;
            Ok(written)
        })();

        match result {
            Ok(written) => {
                log::debug!("saved {written} bytes from {} to {}", self.url, path.display());
                true
            }
            Err(e) => {
                log::warn!("failed to save {} to {}: {e}", self.url, path.display());
                false
            }
        }
    }

    /// Releases the connection without reading the rest of the body.
    pub fn close(self) {}

    /// Turns a non-success response into [`Error::Status`], keeping up to
    /// [`ERROR_BODY_LIMIT`] bytes of the error body as text.
    pub(crate) fn into_status_error(self) -> Error {
        let code = self.status;
        let mut buf = Vec::new();
        if let Err(e) = (&mut self.into_body()).take(ERROR_BODY_LIMIT).read_to_end(&mut buf) {
            log::debug!("could not read error body of {code} response: {e}");
        }
        let text = String::from_utf8_lossy(&buf).trim().to_owned();
        Error::Status {
            code,
            body: (!text.is_empty()).then_some(text),
        }
    }
}

impl Read for Response {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read(buf)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// The body of a [`Response`], decoded from its transfer framing.
pub struct ResponseBody {
    kind: BodyKind,
}

enum BodyKind {
    Empty,
    Length(LengthReader<Box<dyn BufRead + Send>>),
    Chunked(ChunkedReader<Box<dyn BufRead + Send>>),
    Close(Box<dyn BufRead + Send>),
}

impl ResponseBody {
    pub(crate) fn new(framing: Framing, reader: Box<dyn BufRead + Send>) -> Self {
        let kind = match framing {
            Framing::Empty => BodyKind::Empty,
            Framing::Length(length) => BodyKind::Length(LengthReader::new(reader, length)),
            Framing::Chunked => BodyKind::Chunked(ChunkedReader::new(reader)),
            Framing::Close => BodyKind::Close(reader),
        };
        Self { kind }
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.kind {
            BodyKind::Empty => Ok(0),
            BodyKind::Length(reader) => reader.read(buf),
            BodyKind::Chunked(reader) => reader.read(buf),
            BodyKind::Close(reader) => reader.read(buf),
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            BodyKind::Empty => "empty",
            BodyKind::Length(_) => "length",
            BodyKind::Chunked(_) => "chunked",
            BodyKind::Close(_) => "close",
        };
        f.debug_struct("ResponseBody").field("framing", &kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::wire::read_head;
    use std::io::Cursor;

    fn response(raw: &'static [u8]) -> Response {
        let mut reader: Box<dyn BufRead + Send> = Box::new(Cursor::new(raw));
        let head = read_head(&mut reader).unwrap();
        let framing = crate::http::wire::framing(head.status, &head.headers).unwrap();
        Response::new(
            head,
            Url::parse("http://localhost/").unwrap(),
            ResponseBody::new(framing, reader),
        )
    }

    #[test]
    fn text_uses_declared_charset() {
        let response = response(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=\"ISO-8859-1\"\r\nContent-Length: 4\r\n\r\ncaf\xe9",
        );
        assert_eq!(response.charset(), Some("ISO-8859-1"));
        assert_eq!(response.text().as_deref(), Some("café"));
    }

    #[test]
    fn unknown_charset_yields_none() {
        let response =
            response(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain;charset=x-nope\r\n\r\nabc");
        assert_eq!(response.text(), None);
    }

    #[test]
    fn json_failure_yields_none() {
        let ok = response(b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\n{\"a\":[1]}");
        let value: serde_json::Value = ok.json().unwrap();
        assert_eq!(value["a"][0], 1);

        let bad = response(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\n{no");
        assert!(bad.json::<serde_json::Value>().is_none());
    }

    #[test]
    fn save_to_reports_failure_as_false() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out.bin");
        let ok = response(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n");
        assert!(ok.save_to(&target));
        assert_eq!(fs::read(&target).unwrap(), b"abc");

        let truncated = response(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc");
        assert!(!truncated.save_to(dir.path().join("short.bin")));

        // A directory cannot be opened as a file.
        let dir_target = response(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        assert!(!dir_target.save_to(dir.path()));
    }

    #[test]
    fn status_error_keeps_body_text() {
        let err = response(b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\nno such x").into_status_error();
        assert_eq!(err.status_code(), Some(404));
        assert!(matches!(err, Error::Status { body: Some(ref b), .. } if b == "no such x"));

        let err = response(b"HTTP/1.1 500 Oops\r\nContent-Length: 0\r\n\r\n").into_status_error();
        assert!(matches!(err, Error::Status { code: 500, body: None }));
    }
}
