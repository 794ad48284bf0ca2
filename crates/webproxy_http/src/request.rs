use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{debug, instrument};

use crate::rio::LineReader;

/// Upper bound on request line + header block.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("client closed the connection before sending a request")]
    Empty,

    #[error("client closed the connection inside the header block")]
    Truncated,

    #[error("malformed request line: {0}")]
    MalformedRequestLine(String),

    #[error("request head exceeds the header size limit")]
    HeadTooLarge,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Request line plus the raw header lines, exactly as the client sent them.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub uri: String,
    pub version: String,
    /// Each line keeps its original terminator.
    pub headers: Vec<Bytes>,
}

impl RequestHead {
    /// First header value whose name matches `name` (ASCII case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (key, value) = split_header_line(line)?;
            key.eq_ignore_ascii_case(name).then_some(value)
        })
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Splits a raw header line into trimmed name and value.
pub fn split_header_line(line: &[u8]) -> Option<(&str, &str)> {
    let line = std::str::from_utf8(line).ok()?;
    let (name, value) = line.split_once(':')?;
    Some((name.trim(), value.trim()))
}

fn is_blank_line(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

/// Reads the request line and header block up to (and consuming) the blank
/// line that ends it.
#[instrument(skip(rio), level = "debug")]
pub async fn read_request_head<S>(rio: &mut LineReader<S>) -> Result<RequestHead, RequestError>
where
    S: AsyncRead + Unpin,
{
    let line = rio.read_line().await?;
    if line.is_empty() {
        return Err(RequestError::Empty);
    }
    if line.last() != Some(&b'\n') {
        return Err(RequestError::Truncated);
    }

    let (method, uri, version) = parse_request_line(&line)?;
    let mut total = line.len();
    let mut headers = Vec::new();

    loop {
        let line = rio.read_line().await?;
        if line.is_empty() || line.last() != Some(&b'\n') {
            return Err(RequestError::Truncated);
        }
        if is_blank_line(&line) {
            break;
        }
        total += line.len();
        if total > MAX_HEAD_BYTES {
            return Err(RequestError::HeadTooLarge);
        }
        headers.push(line);
    }

    debug!(
        target: "webproxy::http",
        %method,
        %uri,
        %version,
        header_count = headers.len(),
        "Parsed request head"
    );

    Ok(RequestHead {
        method,
        uri,
        version,
        headers,
    })
}

fn parse_request_line(line: &[u8]) -> Result<(String, String, String), RequestError> {
    let malformed = || RequestError::MalformedRequestLine(String::from_utf8_lossy(line).trim().to_string());

    // The request line alone, terminated like an empty header block.
    let mut head = line.to_vec();
    head.extend_from_slice(b"\r\n");

    let mut no_headers: [httparse::Header<'_>; 0] = [];
    let mut req = httparse::Request::new(&mut no_headers);
    match req.parse(&head) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) | Err(_) => return Err(malformed()),
    }

    let method = req.method.ok_or_else(malformed)?.to_string();
    let uri = req.path.ok_or_else(malformed)?.to_string();
    let version = match req.version.ok_or_else(malformed)? {
        0 => "HTTP/1.0",
        _ => "HTTP/1.1",
    }
    .to_string();

    Ok((method, uri, version))
}
