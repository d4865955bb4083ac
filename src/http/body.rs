use crate::error::Error;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use std::fmt;
use std::io::{self, Read, Write};
use url::form_urlencoded;

/// Media type of [`RequestBody::form`] bodies.
pub const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";
/// Media type of [`RequestBody::json`] bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A request payload: a media type, an optional length and the bytes.
///
/// In-memory bodies can be written any number of times. A streamed body is
/// consumed by the first write.
pub struct RequestBody {
    media_type: String,
    length: Option<u64>,
    source: BodySource,
}

enum BodySource {
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
    Consumed,
}

impl RequestBody {
    /// A body made of raw bytes with a caller-chosen media type.
    pub fn bytes(media_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        Self {
            media_type: media_type.into(),
            length: Some(data.len() as u64),
            source: BodySource::Bytes(data),
        }
    }

    /// A streamed body. `length` is `None` when unknown, in which case the
    /// body is sent with chunked transfer coding.
    pub fn reader(
        media_type: impl Into<String>,
        reader: impl Read + Send + 'static,
        length: Option<u64>,
    ) -> Self {
        Self {
            media_type: media_type.into(),
            length,
            source: BodySource::Reader(Box::new(reader)),
        }
    }

    /// Form-encodes `pairs` with percent escapes in `charset`.
    ///
    /// ```rust
    /// use android_app_utils::http::RequestBody;
    ///
    /// let body = RequestBody::form([("q", "a b"), ("lang", "en")], "UTF-8").unwrap();
    /// assert_eq!(body.media_type(), "application/x-www-form-urlencoded;charset=UTF-8");
    /// assert_eq!(body.as_bytes(), Some(&b"q=a+b&lang=en"[..]));
    /// ```
    pub fn form<I, K, V>(pairs: I, charset: &str) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoder = TextEncoder::for_charset(charset)?;
        let escape = |s: &str| -> String {
            form_urlencoded::byte_serialize(&encoder.encode(s).0).collect()
        };

        let mut encoded = String::new();
        for (key, value) in pairs {
            if !encoded.is_empty() {
                encoded.push('&');
            }
            encoded.push_str(&escape(key.as_ref()));
            encoded.push('=');
            encoded.push_str(&escape(value.as_ref()));
        }

        Ok(Self::bytes(
            format!("{FORM_MEDIA_TYPE};charset={charset}"),
            encoded.into_bytes(),
        ))
    }

    /// A JSON document re-encoded into `charset`.
    pub fn json(json: impl AsRef<str>, charset: &str) -> Result<Self, Error> {
        let (bytes, unmappable) = TextEncoder::for_charset(charset)?.encode(json.as_ref());
        if unmappable {
            log::warn!("json body has characters {charset} cannot represent");
        }

        Ok(Self::bytes(format!("{JSON_MEDIA_TYPE};charset={charset}"), bytes))
    }

    /// The `Content-Type` sent with this body.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Byte length, `None` when the body is streamed without a known size.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// The payload, for in-memory bodies.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.source {
            BodySource::Bytes(data) => Some(data),
            _ => None,
        }
    }

    /// Whether the body can still be written.
    pub fn is_replayable(&self) -> bool {
        !matches!(self.source, BodySource::Consumed)
    }

    /// Writes the body to `out`, chunk-encoding it when the length is
    /// unknown. Returns the number of payload bytes written.
    pub(crate) fn write_to(&mut self, out: &mut dyn Write) -> Result<u64, Error> {
        match std::mem::replace(&mut self.source, BodySource::Consumed) {
            BodySource::Bytes(data) => {
                let written = if self.length.is_some() {
                    out.write_all(&data)?;
                    data.len() as u64
                } else {
                    copy_chunked(&mut data.as_slice(), out)?
                };
                self.source = BodySource::Bytes(data);
                Ok(written)
            }
            BodySource::Reader(mut reader) => match self.length {
                Some(length) => {
                    let copied = io::copy(&mut (&mut reader).take(length), out)?;
                    if copied != length {
                        return Err(Error::Io(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("body declared {length} bytes but produced {copied}"),
                        )));
                    }
                    Ok(copied)
                }
                None => copy_chunked(&mut reader, out),
            },
            BodySource::Consumed => Err(Error::BodyNotReplayable),
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            BodySource::Bytes(_) => "bytes",
            BodySource::Reader(_) => "reader",
            BodySource::Consumed => "consumed",
        };
        f.debug_struct("RequestBody")
            .field("media_type", &self.media_type)
            .field("length", &self.length)
            .field("source", &source)
            .finish()
    }
}

pub(crate) fn lookup_charset(charset: &str) -> Result<&'static Encoding, Error> {
    Encoding::for_label(charset.trim().as_bytes())
        .ok_or_else(|| Error::UnsupportedCharset(charset.to_owned()))
}

/// Turns text into bytes of a request charset.
///
/// `encoding_rs` only encodes into ASCII-compatible charsets, so UTF-16 is
/// written here. The bare `UTF-16` and `Unicode` labels produce big-endian
/// units after a byte order mark. Labels that decode to the replacement
/// encoding have no encoder and are rejected.
#[derive(Debug, Clone, Copy)]
enum TextEncoder {
    Encoding(&'static Encoding),
    Utf16 { big_endian: bool, bom: bool },
}

impl TextEncoder {
    fn for_charset(charset: &str) -> Result<Self, Error> {
        let encoding = lookup_charset(charset)?;
        if encoding == UTF_16BE || encoding == UTF_16LE {
            let label = charset.trim();
            let bom =
                label.eq_ignore_ascii_case("utf-16") || label.eq_ignore_ascii_case("unicode");
            return Ok(TextEncoder::Utf16 {
                big_endian: bom || encoding == UTF_16BE,
                bom,
            });
        }
        if encoding.output_encoding() != encoding {
            return Err(Error::UnsupportedCharset(charset.to_owned()));
        }
        Ok(TextEncoder::Encoding(encoding))
    }

    /// The encoded bytes, and whether any character had to be substituted.
    fn encode(self, text: &str) -> (Vec<u8>, bool) {
        match self {
            TextEncoder::Encoding(encoding) => {
                let (bytes, _, unmappable) = encoding.encode(text);
                (bytes.into_owned(), unmappable)
            }
            TextEncoder::Utf16 { big_endian, bom } => {
                let units = bom.then_some(0xFEFF).into_iter().chain(text.encode_utf16());
                let bytes = units
                    .flat_map(|unit| {
                        if big_endian {
                            unit.to_be_bytes()
                        } else {
                            unit.to_le_bytes()
                        }
                    })
                    .collect();
                (bytes, false)
            }
        }
    }
}

fn copy_chunked(reader: &mut dyn Read, out: &mut dyn Write) -> Result<u64, Error> {
    let mut buf = [0u8; 8 * 1024];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        write!(out, "{n:X}\r\n")?;
        out.write_all(&buf[..n])?;
        out.write_all(b"\r\n")?;
        total += n as u64;
    }
    out.write_all(b"0\r\n\r\n")?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_uses_requested_charset() {
        let body = RequestBody::form([("name", "é")], "ISO-8859-1").unwrap();
        assert_eq!(
            body.media_type(),
            "application/x-www-form-urlencoded;charset=ISO-8859-1"
        );
        assert_eq!(body.as_bytes(), Some(&b"name=%E9"[..]));
        assert_eq!(body.length(), Some(8));
    }

    #[test]
    fn json_reports_length() {
        let body = RequestBody::json(r#"{"a":1}"#, "utf-8").unwrap();
        assert_eq!(body.media_type(), "application/json;charset=utf-8");
        assert_eq!(body.length(), Some(7));
    }

    #[test]
    fn unknown_charset_is_rejected() {
        let err = RequestBody::json("{}", "klingon").unwrap_err();
        assert!(matches!(err, Error::UnsupportedCharset(cs) if cs == "klingon"));
    }

    #[test]
    fn json_is_written_in_utf16() {
        let body = RequestBody::json("{}", "UTF-16").unwrap();
        assert_eq!(body.media_type(), "application/json;charset=UTF-16");
        assert_eq!(body.as_bytes(), Some(&[0xFE, 0xFF, 0, b'{', 0, b'}'][..]));

        let body = RequestBody::json("{}", "utf-16le").unwrap();
        assert_eq!(body.as_bytes(), Some(&[b'{', 0, b'}', 0][..]));
    }

    #[test]
    fn form_escapes_utf16_units() {
        let body = RequestBody::form([("a", "é")], "UTF-16BE").unwrap();
        assert_eq!(body.as_bytes(), Some(&b"%00a=%00%E9"[..]));
    }

    #[test]
    fn charset_without_encoder_is_rejected() {
        // Decodes to the replacement encoding, which cannot encode.
        let err = RequestBody::json("{}", "ISO-2022-KR").unwrap_err();
        assert!(matches!(err, Error::UnsupportedCharset(cs) if cs == "ISO-2022-KR"));
    }

    #[test]
    fn streamed_body_of_unknown_length_is_chunked() {
        let mut body = RequestBody::reader("text/plain", &b"hello world"[..], None);
        let mut out = Vec::new();
        assert_eq!(body.write_to(&mut out).unwrap(), 11);
        assert_eq!(out, b"B\r\nhello world\r\n0\r\n\r\n");

        assert!(!body.is_replayable());
        assert!(matches!(
            body.write_to(&mut Vec::new()),
            Err(Error::BodyNotReplayable)
        ));
    }

    #[test]
    fn short_stream_is_an_error() {
        let mut body = RequestBody::reader("text/plain", &b"abc"[..], Some(10));
        assert!(matches!(body.write_to(&mut Vec::new()), Err(Error::Io(_))));
    }

    #[test]
    fn byte_bodies_can_be_written_twice() {
        let mut body = RequestBody::bytes("text/plain", "again");
        let mut first = Vec::new();
        let mut second = Vec::new();
        body.write_to(&mut first).unwrap();
        body.write_to(&mut second).unwrap();
        assert_eq!(first, second);
        assert!(body.is_replayable());
    }
}
