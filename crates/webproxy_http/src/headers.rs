//! =======================================================
//! ORIGIN REQUEST (proxy semantics)
//! =======================================================
//!
//! Output order:
//! - `GET <path> HTTP/1.0`
//! - `Host` (client's value when usable, else the target host)
//! - fixed `User-Agent`
//! - `Connection: close` / `Proxy-Connection: close`
//! - every other client header line, byte for byte
//! - blank line
use bytes::{BufMut, Bytes, BytesMut};

use crate::request::split_header_line;
use crate::uri::Target;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3";

/// Headers the proxy writes itself; client copies are dropped.
const REWRITTEN: [&str; 4] = ["host", "connection", "proxy-connection", "user-agent"];

pub fn build_origin_request(target: &Target, client_headers: &[Bytes]) -> Bytes {
    let host = client_host(client_headers).unwrap_or(target.host.as_str());

    let mut out = BytesMut::with_capacity(256);
    out.put_slice(format!("GET {} HTTP/1.0\r\n", target.path).as_bytes());
    out.put_slice(format!("Host: {host}\r\n").as_bytes());
    out.put_slice(format!("User-Agent: {USER_AGENT}\r\n").as_bytes());
    out.put_slice(b"Connection: close\r\n");
    out.put_slice(b"Proxy-Connection: close\r\n");

    for line in client_headers {
        if is_rewritten(line) {
            continue;
        }
        out.put_slice(line);
    }

    out.put_slice(b"\r\n");
    out.freeze()
}

fn header_name(line: &[u8]) -> Option<&[u8]> {
    let colon = line.iter().position(|b| *b == b':')?;
    Some(line[..colon].trim_ascii())
}

fn is_rewritten(line: &[u8]) -> bool {
    header_name(line).is_some_and(|name| {
        REWRITTEN
            .iter()
            .any(|known| name.eq_ignore_ascii_case(known.as_bytes()))
    })
}

/// Client `Host` value, if it is a single non-empty token.
fn client_host(headers: &[Bytes]) -> Option<&str> {
    headers.iter().find_map(|line| {
        let (name, value) = split_header_line(line)?;
        if !name.eq_ignore_ascii_case("host") {
            return None;
        }
        let well_formed = !value.is_empty()
            && value
                .bytes()
                .all(|b| b.is_ascii_graphic() || !b.is_ascii());
        well_formed.then_some(value)
    })
}
