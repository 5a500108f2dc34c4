//! Minimal HTTP/1.1 GET over a raw socket.
//!
//! One request per connection (`Connection: close`). Plain TCP for `http`,
//! rustls over TCP for `https`. Only HTML bodies are ever read.

use crate::FetchError;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::{Position, Url};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const USER_AGENT: &str = concat!("wordex/", env!("CARGO_PKG_VERSION"));

// Upper bound on the status line plus headers.
const MAX_HEAD_BYTES: usize = 64 * 1024;
// Chunk-size lines inside a chunked body.
const MAX_LINE_BYTES: usize = 8 * 1024;

/// Status line and headers of one response. Header names are lowercased;
/// repeated headers keep every value in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: HashMap<String, Vec<String>>,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn is_redirect(&self) -> bool { (300..400).contains(&self.status) }

    pub fn is_html(&self) -> bool {
        self.header("content-type")
            .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/html"))
            .unwrap_or(false)
    }

    fn is_chunked(&self) -> bool {
        self.headers
            .get("transfer-encoding")
            .map(|values| values.iter().any(|v| v.to_ascii_lowercase().contains("chunked")))
            .unwrap_or(false)
    }

    fn content_length(&self) -> Option<u64> {
        self.header("content-length").and_then(|v| v.trim().parse().ok())
    }
}

enum Connection {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.read(buf),
            Connection::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.write(buf),
            Connection::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Plain(s) => s.flush(),
            Connection::Tls(s) => s.flush(),
        }
    }
}

/// Stateless, non-caching HTML fetcher. Cheap to clone and safe to share
/// across worker threads.
#[derive(Clone)]
pub struct HtmlFetcher {
    tls: Arc<ClientConfig>,
    timeout: Duration,
}

impl HtmlFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let roots = RootCertStore { roots: webpki_roots::TLS_SERVER_ROOTS.to_vec() };
        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
        Ok(Self { tls: Arc::new(config), timeout: DEFAULT_TIMEOUT })
    }

    /// Connect, read and write timeout applied to every socket.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration { self.timeout }

    /// Body of `url` if it is HTML, following at most `redirects` redirects.
    /// Every failure collapses to `None`.
    pub fn fetch(&self, url: &Url, redirects: usize) -> Option<String> {
        match self.try_fetch(url, redirects) {
            Ok(body) => Some(body),
            Err(e) => {
                debug!(url = %url, error = %e, "fetch failed");
                None
            }
        }
    }

    /// Same as [`fetch`](Self::fetch) but says why nothing came back.
    pub fn try_fetch(&self, url: &Url, redirects: usize) -> Result<String, FetchError> {
        let mut reader = BufReader::new(self.connect(url)?);
        write_request(reader.get_mut(), url)?;
        let head = read_head(&mut reader)?;
        debug!(url = %url, status = head.status, "response");

        if head.status == 404 {
            return Err(FetchError::NotFound);
        }
        if head.is_redirect() {
            if let Some(location) = head.header("location") {
                if redirects == 0 {
                    return Err(FetchError::TooManyRedirects(url.to_string()));
                }
                let target = url
                    .join(location.trim())
                    .map_err(|_| FetchError::InvalidRedirect(location.to_string()))?;
                drop(reader);
                return self.try_fetch(&target, redirects - 1);
            }
        }
        if !head.is_html() {
            return Err(FetchError::NotHtml(head.header("content-type").map(str::to_string)));
        }

        let body = read_body(&mut reader, &head)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn connect(&self, url: &Url) -> Result<Connection, FetchError> {
        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            _ => return Err(FetchError::UnsupportedUrl(url.to_string())),
        };
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::UnsupportedUrl(url.to_string()))?;

        let mut last_err = None;
        let mut stream = None;
        for addr in url.socket_addrs(|| None)? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        let stream = match (stream, last_err) {
            (Some(s), _) => s,
            (None, Some(e)) => return Err(e.into()),
            (None, None) => {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no addresses").into())
            }
        };
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        if !tls {
            return Ok(Connection::Plain(stream));
        }
        let name = ServerName::try_from(host.trim_matches(|c| c == '[' || c == ']').to_string())
            .map_err(|_| FetchError::UnsupportedUrl(url.to_string()))?;
        let session = ClientConnection::new(Arc::clone(&self.tls), name)?;
        Ok(Connection::Tls(Box::new(StreamOwned::new(session, stream))))
    }
}

fn write_request<W: Write>(out: &mut W, url: &Url) -> io::Result<()> {
    let target = &url[Position::BeforePath..Position::AfterQuery];
    let target = if target.is_empty() { "/" } else { target };
    let host = url.host_str().unwrap_or_default();
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    write!(
        out,
        "GET {target} HTTP/1.1\r\nHost: {host}\r\nUser-Agent: {USER_AGENT}\r\n\
         Accept: text/html\r\nConnection: close\r\n\r\n"
    )?;
    out.flush()
}

fn next_line<R: BufRead>(reader: &mut R, budget: &mut usize) -> Result<Option<String>, FetchError> {
    let mut raw = Vec::new();
    // one byte past the budget is enough to tell an oversized line apart
    let limit = (*budget as u64).saturating_add(1);
    let n = Read::take(&mut *reader, limit).read_until(b'\n', &mut raw)?;
    if n == 0 {
        return Ok(None);
    }
    if n > *budget {
        return Err(FetchError::Malformed("line too long".into()));
    }
    *budget -= n;
    let line = String::from_utf8_lossy(&raw);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Parses the status line and headers, leaving `reader` at the first body byte.
pub fn read_head<R: BufRead>(reader: &mut R) -> Result<ResponseHead, FetchError> {
    let mut budget = MAX_HEAD_BYTES;
    let status_line = next_line(reader, &mut budget)?
        .ok_or_else(|| FetchError::Malformed("empty response".into()))?;
    let mut parts = status_line.split_whitespace();
    let status = match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => code
            .parse::<u16>()
            .map_err(|_| FetchError::Malformed(format!("bad status line {status_line:?}")))?,
        _ => return Err(FetchError::Malformed(format!("bad status line {status_line:?}"))),
    };

    let mut headers: HashMap<String, Vec<String>> = HashMap::new();
    loop {
        let line = next_line(reader, &mut budget)?
            .ok_or_else(|| FetchError::Malformed("headers cut short".into()))?;
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(FetchError::Malformed(format!("bad header {line:?}")));
        };
        headers
            .entry(name.trim().to_ascii_lowercase())
            .or_default()
            .push(value.trim().to_string());
    }
    Ok(ResponseHead { status, headers })
}

/// Reads the body framed by `head`: chunked, sized, or until the peer closes.
pub fn read_body<R: BufRead>(reader: &mut R, head: &ResponseHead) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    if head.is_chunked() {
        read_chunked(reader, &mut body)?;
    } else if let Some(len) = head.content_length() {
        read_until_close(&mut Read::take(&mut *reader, len), &mut body)?;
    } else {
        read_until_close(reader, &mut body)?;
    }
    Ok(body)
}

// TLS peers that skip close_notify surface as UnexpectedEof; treat it as end of body.
fn read_until_close<R: Read>(reader: &mut R, body: &mut Vec<u8>) -> Result<(), FetchError> {
    match reader.read_to_end(body) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn read_chunked<R: BufRead>(reader: &mut R, body: &mut Vec<u8>) -> Result<(), FetchError> {
    loop {
        let mut budget = MAX_LINE_BYTES;
        let line = next_line(reader, &mut budget)?
            .ok_or_else(|| FetchError::Malformed("chunked body cut short".into()))?;
        let size_field = line.split(';').next().unwrap_or_default().trim();
        let size = u64::from_str_radix(size_field, 16)
            .map_err(|_| FetchError::Malformed(format!("bad chunk size {line:?}")))?;
        if size == 0 {
            // trailers
            let mut budget = MAX_HEAD_BYTES;
            while let Some(trailer) = next_line(reader, &mut budget)? {
                if trailer.is_empty() {
                    break;
                }
            }
            return Ok(());
        }
        // grow only as bytes arrive; the advertised size is not trusted
        let read = Read::take(&mut *reader, size).read_to_end(body)?;
        if (read as u64) < size {
            return Err(FetchError::Malformed("chunk cut short".into()));
        }
        let mut budget = MAX_LINE_BYTES;
        next_line(reader, &mut budget)?;
    }
}
