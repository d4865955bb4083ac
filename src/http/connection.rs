use super::config::HttpConfig;
use crate::error::Error;
use crate::trust::TrustConfig;
use rustls::pki_types::ServerName;
use rustls::{ClientConnection, StreamOwned};
use std::io::{self, Read, Write};
use std::net::{IpAddr, Shutdown, TcpStream};
use url::{Host, Url};

/// An open connection to the server, plain or TLS.
///
/// Dropping it sends a TLS `close_notify` where applicable and shuts the
/// socket down. Every exit path of a call releases the connection this way.
pub(crate) enum Transport {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Transport {
    fn socket(&self) -> &TcpStream {
        match self {
            Transport::Plain(sock) => sock,
            Transport::Tls(tls) => &tls.sock,
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(sock) => sock.read(buf),
            Transport::Tls(tls) => tls.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(sock) => sock.write(buf),
            Transport::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(sock) => sock.flush(),
            Transport::Tls(tls) => tls.flush(),
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Transport::Tls(tls) = self {
            tls.conn.send_close_notify();
            let _ = tls.conn.write_tls(&mut tls.sock);
        }
        let _ = self.socket().shutdown(Shutdown::Both);
    }
}

/// Connects to the origin of `url`, wrapping the socket in TLS for `https`.
pub(crate) fn open(
    url: &Url,
    config: &HttpConfig,
    trust: &TrustConfig,
) -> Result<Transport, Error> {
    let tls = match url.scheme() {
        "http" => false,
        "https" => true,
        other => return Err(Error::UnsupportedScheme(other.to_owned())),
    };

    let addrs = url.socket_addrs(|| None)?;
    let mut last_error = None;
    let mut connected = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, config.connect_timeout()) {
            Ok(sock) => {
                connected = Some(sock);
                break;
            }
            Err(e) => {
                log::debug!("connect to {addr} failed: {e}");
                last_error = Some(e);
            }
        }
    }
    let sock = match connected {
        Some(sock) => sock,
        None => {
            return Err(last_error
                .unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
                })
                .into())
        }
    };

    sock.set_read_timeout(Some(config.read_timeout()))?;
    sock.set_write_timeout(Some(config.read_timeout()))?;
    sock.set_nodelay(true)?;

    if !tls {
        return Ok(Transport::Plain(sock));
    }

    let server_name = server_name(url)?;
    let conn = ClientConnection::new(trust.client_config()?, server_name)?;
    Ok(Transport::Tls(Box::new(StreamOwned::new(conn, sock))))
}

fn server_name(url: &Url) -> Result<ServerName<'static>, Error> {
    match url.host() {
        Some(Host::Domain(domain)) => ServerName::try_from(domain.to_owned()).map_err(|e| {
            Error::Tls(rustls::Error::General(format!(
                "invalid server name {domain:?}: {e}"
            )))
        }),
        Some(Host::Ipv4(ip)) => Ok(ServerName::from(IpAddr::V4(ip))),
        Some(Host::Ipv6(ip)) => Ok(ServerName::from(IpAddr::V6(ip))),
        None => Err(Error::InvalidUrl(url::ParseError::EmptyHost)),
    }
}

/// Pulls a rustls failure out of the `io::Error` it was wrapped in, so TLS
/// problems are reported as [`Error::Tls`].
pub(crate) fn surface_tls(error: Error) -> Error {
    match error {
        Error::Io(io) => {
            let tls = io
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<rustls::Error>())
                .cloned();
            match tls {
                Some(tls) => Error::Tls(tls),
                None => Error::Io(io),
            }
        }
        other => other,
    }
}
