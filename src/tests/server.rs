//! A threaded HTTP/1.1 server on localhost that records every request it
//! receives and answers with whatever the test's handler returns.

use super::{provider, TestCert};
use rustls::{ServerConfig, ServerConnection, StreamOwned, SupportedProtocolVersion};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

type Handler = Arc<dyn Fn(&RecordedRequest) -> TestResponse + Send + Sync>;

/// A request as it arrived on the wire.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) method: String,
    pub(crate) target: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
}

impl RecordedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// How the server delimits the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    Length,
    Chunked,
    Close,
}

#[derive(Debug, Clone)]
pub(crate) struct TestResponse {
    pub(crate) status: u16,
    pub(crate) reason: &'static str,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) framing: Framing,
}

impl TestResponse {
    pub(crate) fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::status(200, "OK", body)
    }

    pub(crate) fn redirect(status: u16, location: &str) -> Self {
        Self::status(status, "Redirect", Vec::new()).header("Location", location)
    }

    pub(crate) fn status(status: u16, reason: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason,
            headers: Vec::new(),
            body: body.into(),
            framing: Framing::Length,
        }
    }

    pub(crate) fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub(crate) fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    fn render(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason);
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        match self.framing {
            Framing::Length => head.push_str(&format!("Content-Length: {}\r\n", self.body.len())),
            Framing::Chunked => head.push_str("Transfer-Encoding: chunked\r\n"),
            Framing::Close => {}
        }
        head.push_str("Connection: close\r\n\r\n");

        let mut out = head.into_bytes();
        match self.framing {
            Framing::Chunked => {
                for chunk in self.body.chunks(7) {
                    out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                    out.extend_from_slice(chunk);
                    out.extend_from_slice(b"\r\n");
                }
                out.extend_from_slice(b"0\r\n\r\n");
            }
            Framing::Length | Framing::Close => out.extend_from_slice(&self.body),
        }
        out
    }
}

pub(crate) struct TestServer {
    addr: SocketAddr,
    scheme: &'static str,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    running: Arc<AtomicBool>,
    accept_loop: Option<JoinHandle<()>>,
}

impl TestServer {
    pub(crate) fn http<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> TestResponse + Send + Sync + 'static,
    {
        Self::start(Arc::new(handler), None)
    }

    pub(crate) fn https<F>(cert: &TestCert, handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> TestResponse + Send + Sync + 'static,
    {
        Self::https_with_versions(cert, rustls::DEFAULT_VERSIONS, handler)
    }

    /// An HTTPS server that only negotiates the given protocol versions.
    pub(crate) fn https_with_versions<F>(
        cert: &TestCert,
        versions: &[&'static SupportedProtocolVersion],
        handler: F,
    ) -> Self
    where
        F: Fn(&RecordedRequest) -> TestResponse + Send + Sync + 'static,
    {
        let config = ServerConfig::builder_with_provider(provider())
            .with_protocol_versions(versions)
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(cert.chain.clone(), cert.key.clone_key())
            .unwrap();
        Self::start(Arc::new(handler), Some(Arc::new(config)))
    }

    fn start(handler: Handler, tls: Option<Arc<ServerConfig>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let scheme = if tls.is_some() { "https" } else { "http" };
        let requests = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        let accept_loop = {
            let requests = Arc::clone(&requests);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    if !running.load(Ordering::Acquire) {
                        break;
                    }
                    let Ok(stream) = stream else { continue };
                    let handler = Arc::clone(&handler);
                    let requests = Arc::clone(&requests);
                    let tls = tls.clone();
                    thread::spawn(move || {
                        if let Err(e) = serve(stream, tls, &handler, &requests) {
                            log::debug!("test server connection failed: {e}");
                        }
                    });
                }
            })
        };

        Self {
            addr,
            scheme,
            requests,
            running,
            accept_loop: Some(accept_loop),
        }
    }

    /// A URL on this server addressed by IP.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}://{}{path}", self.scheme, self.addr)
    }

    /// A URL on this server addressed as `localhost`, matching the test
    /// certificates.
    pub(crate) fn localhost_url(&self, path: &str) -> String {
        format!("{}://localhost:{}{path}", self.scheme, self.addr.port())
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        // Wake the accept loop so it sees the flag.
        let _ = TcpStream::connect(self.addr);
        if let Some(accept_loop) = self.accept_loop.take() {
            let _ = accept_loop.join();
        }
    }
}

fn serve(
    stream: TcpStream,
    tls: Option<Arc<ServerConfig>>,
    handler: &Handler,
    requests: &Mutex<Vec<RecordedRequest>>,
) -> io::Result<()> {
    match tls {
        Some(config) => {
            let conn = ServerConnection::new(config)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let mut tls = StreamOwned::new(conn, stream);
            exchange(&mut tls, handler, requests)?;
            tls.conn.send_close_notify();
            tls.flush()
        }
        None => {
            let mut stream = stream;
            exchange(&mut stream, handler, requests)
        }
    }
}

fn exchange(
    stream: &mut (impl Read + Write),
    handler: &Handler,
    requests: &Mutex<Vec<RecordedRequest>>,
) -> io::Result<()> {
    let request = {
        let mut reader = BufReader::new(&mut *stream);
        read_request(&mut reader)?
    };
    requests.lock().unwrap().push(request.clone());

    let response = handler(&request);
    stream.write_all(&response.render())?;
    stream.flush()
}

fn read_request(reader: &mut impl BufRead) -> io::Result<RecordedRequest> {
    let request_line = read_line(reader)?;
    let mut parts = request_line.split(' ');
    let method = parts.next().unwrap_or_default().to_owned();
    let target = parts.next().unwrap_or_default().to_owned();

    let mut headers = Vec::new();
    loop {
        let line = read_line(reader)?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, line.clone()))?;
        headers.push((name.to_owned(), value.trim().to_owned()));
    }

    let mut request = RecordedRequest {
        method,
        target,
        headers,
        body: Vec::new(),
    };
    if request
        .header("Transfer-Encoding")
        .is_some_and(|te| te.eq_ignore_ascii_case("chunked"))
    {
        loop {
            let size = usize::from_str_radix(read_line(reader)?.trim(), 16)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if size == 0 {
                read_line(reader)?;
                break;
            }
            let mut chunk = vec![0; size];
            reader.read_exact(&mut chunk)?;
            request.body.extend_from_slice(&chunk);
            read_line(reader)?;
        }
    } else if let Some(length) = request.header("Content-Length") {
        let length = length
            .parse::<usize>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut body = vec![0; length];
        reader.read_exact(&mut body)?;
        request.body = body;
    }
    Ok(request)
}

fn read_line(reader: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
