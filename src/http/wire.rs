//! HTTP/1.1 framing: the request head we send and the response head and body
//! framing we read back.

use super::config::HttpConfig;
use super::headers::Headers;
use super::request::Request;
use crate::error::Error;
use std::io::{self, BufRead, Read, Write};

/// Upper bound on the size of a response head (status line plus headers).
const MAX_HEAD_BYTES: u64 = 64 * 1024;

/// Upper bound on a chunk-size or trailer line.
const MAX_LINE_BYTES: u64 = 8 * 1024;

/// Headers derived from the body; caller-provided values are ignored when a
/// body is attached.
const BODY_HEADERS: &[&str] = &["Content-Type", "Content-Length", "Transfer-Encoding"];

/// Writes the request line and headers, up to and including the blank line.
pub(crate) fn write_head(
    out: &mut dyn Write,
    request: &Request,
    config: &HttpConfig,
) -> Result<(), Error> {
    let url = request.url();
    let target = &url[url::Position::BeforePath..url::Position::AfterQuery];
    let target = if target.is_empty() { "/" } else { target };

    let mut head = format!("{} {} HTTP/1.1\r\n", request.method().as_str(), target);

    let headers = request.headers();
    if !headers.contains("Host") {
        let host = &url[url::Position::BeforeHost..url::Position::AfterPort];
        head.push_str(&format!("Host: {host}\r\n"));
    }
    if let Some(user_agent) = config.user_agent() {
        if !headers.contains("User-Agent") {
            head.push_str(&format!("User-Agent: {user_agent}\r\n"));
        }
    }
    if !headers.contains("Connection") {
        head.push_str("Connection: close\r\n");
    }

    let body = request.body();
    for (name, values) in headers.iter() {
        if body.is_some() && BODY_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
            continue;
        }
        for value in values {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
    }

    if let Some(body) = body {
        head.push_str(&format!("Content-Type: {}\r\n", body.media_type()));
        match body.length() {
            Some(length) => head.push_str(&format!("Content-Length: {length}\r\n")),
            None => head.push_str("Transfer-Encoding: chunked\r\n"),
        }
    }
    head.push_str("\r\n");

    out.write_all(head.as_bytes())?;
    Ok(())
}

/// Status line and headers of a response.
#[derive(Debug)]
pub(crate) struct ResponseHead {
    pub(crate) status: u16,
    pub(crate) reason: String,
    pub(crate) headers: Headers,
}

/// Reads a response head, skipping interim `1xx` responses.
pub(crate) fn read_head(reader: &mut dyn BufRead) -> Result<ResponseHead, Error> {
    loop {
        let head = read_one_head(reader)?;
        if (100..200).contains(&head.status) && head.status != 101 {
            log::debug!("skipping interim response {}", head.status);
            continue;
        }
        return Ok(head);
    }
}

fn read_one_head(reader: &mut dyn BufRead) -> Result<ResponseHead, Error> {
    let mut budget = MAX_HEAD_BYTES;

    let status_line = read_line(reader, &mut budget)?
        .ok_or_else(|| Error::malformed("connection closed before the status line"))?;
    let (status, reason) = parse_status_line(&status_line)?;

    let mut headers = Headers::new();
    loop {
        let line = read_line(reader, &mut budget)?
            .ok_or_else(|| Error::malformed("connection closed inside the response head"))?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::malformed(format!("header line without a colon: {line:?}")))?;
        if name.is_empty() || name.ends_with(char::is_whitespace) {
            return Err(Error::malformed(format!("invalid header name {name:?}")));
        }
        headers.append(name, value.trim());
    }

    Ok(ResponseHead {
        status,
        reason,
        headers,
    })
}

fn parse_status_line(line: &str) -> Result<(u16, String), Error> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    let code = parts.next().unwrap_or_default();
    let reason = parts.next().unwrap_or_default().trim();

    if !version.starts_with("HTTP/1.") {
        return Err(Error::malformed(format!("unexpected status line {line:?}")));
    }
    if code.len() != 3 {
        return Err(Error::malformed(format!("invalid status code {code:?}")));
    }
    let status = code
        .parse::<u16>()
        .map_err(|_| Error::malformed(format!("invalid status code {code:?}")))?;

    Ok((status, reason.to_owned()))
}

// Reads one CRLF (or bare LF) terminated line, charging it against `budget`.
// `None` means the peer closed the connection before sending anything.
fn read_line(reader: &mut dyn BufRead, budget: &mut u64) -> Result<Option<String>, Error> {
    let mut line = Vec::new();
    let read = (&mut *reader).take(*budget).read_until(b'\n', &mut line)?;
    if read == 0 {
        return Ok(None);
    }
    *budget -= read as u64;
    if line.last() != Some(&b'\n') {
        return Err(if *budget == 0 {
            Error::malformed("response head is too large")
        } else {
            Error::malformed("connection closed inside the response head")
        });
    }
    trim_line_ending(&mut line);
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

fn trim_line_ending(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}

/// How the response body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    Empty,
    Length(u64),
    Chunked,
    Close,
}

pub(crate) fn framing(status: u16, headers: &Headers) -> Result<Framing, Error> {
    if status == 204 || status == 304 || (100..200).contains(&status) {
        return Ok(Framing::Empty);
    }

    let codings: Vec<&str> = headers
        .get_all("Transfer-Encoding")
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|coding| !coding.is_empty())
        .collect();
    if let Some(last) = codings.last() {
        return Ok(if last.eq_ignore_ascii_case("chunked") {
            Framing::Chunked
        } else {
            Framing::Close
        });
    }

    match headers.get("Content-Length") {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Framing::Length)
            .map_err(|_| Error::malformed(format!("invalid Content-Length {value:?}"))),
        None => Ok(Framing::Close),
    }
}

/// A body whose length is given by `Content-Length`. Ending early is an error.
pub(crate) struct LengthReader<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> LengthReader<R> {
    pub(crate) fn new(inner: R, length: u64) -> Self {
        Self {
            inner,
            remaining: length,
        }
    }
}

impl<R: Read> Read for LengthReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = self.remaining.min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("body ended {} bytes short", self.remaining),
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

enum ChunkState {
    Size,
    Data(u64),
    Done,
}

/// Decodes the chunked transfer coding. Chunk extensions and trailers are
/// read and discarded.
pub(crate) struct ChunkedReader<R> {
    inner: R,
    state: ChunkState,
}

impl<R: BufRead> ChunkedReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            state: ChunkState::Size,
        }
    }

    fn read_chunk_line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        (&mut self.inner)
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', &mut line)?;
        if line.last() != Some(&b'\n') {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "chunked body ended inside a framing line",
            ));
        }
        trim_line_ending(&mut line);
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

impl<R: BufRead> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.state {
                ChunkState::Done => return Ok(0),
                ChunkState::Size => {
                    let line = self.read_chunk_line()?;
                    let size = line.split(';').next().unwrap_or_default().trim();
                    let size = u64::from_str_radix(size, 16).map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("invalid chunk size {line:?}"),
                        )
                    })?;
                    if size == 0 {
                        while !self.read_chunk_line()?.is_empty() {}
                        self.state = ChunkState::Done;
                        return Ok(0);
                    }
                    self.state = ChunkState::Data(size);
                }
                ChunkState::Data(remaining) => {
                    if buf.is_empty() {
                        return Ok(0);
                    }
                    let max = remaining.min(buf.len() as u64) as usize;
                    let n = self.inner.read(&mut buf[..max])?;
                    if n == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "chunked body ended inside a chunk",
                        ));
                    }
                    let remaining = remaining - n as u64;
                    if remaining == 0 {
                        if !self.read_chunk_line()?.is_empty() {
                            return Err(io::Error::new(
                                io::ErrorKind::InvalidData,
                                "chunk data not followed by CRLF",
                            ));
                        }
                        self.state = ChunkState::Size;
                    } else {
                        self.state = ChunkState::Data(remaining);
                    }
                    return Ok(n);
                }
            }
        }
    }
}
