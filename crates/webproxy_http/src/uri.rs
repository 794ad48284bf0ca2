//! =======================================================
//! ABSOLUTE URI PARSER
//! =======================================================
//!
//! `http://host[:port][/path]` -> (host, port, path)
//!
//! - scheme must be literally `http://` (any case)
//! - first `/` after the scheme starts the path, missing => "/"
//! - first `:` in the host part starts the port, missing => 80
//!
//! No percent-decoding, no `[v6]` literals, no host validation.
//! An empty host is accepted here and fails at connect time.
use std::fmt;

use thiserror::Error;

pub const SCHEME: &str = "http://";
pub const DEFAULT_PORT: u16 = 80;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriError {
    #[error("uri does not start with http://: {0}")]
    MissingScheme(String),

    #[error("invalid port '{port}' in uri {uri}")]
    InvalidPort { uri: String, port: String },
}

/// Origin addressed by an absolute URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Target {
    /// "host:port", as handed to the resolver.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.host, self.port, self.path)
    }
}

/// Some clients send `/http://host/...`; drop that single leading slash.
pub fn strip_leading_slash(uri: &str) -> &str {
    match uri.strip_prefix('/') {
        Some(rest) if has_scheme(rest) => rest,
        _ => uri,
    }
}

fn has_scheme(uri: &str) -> bool {
    uri.get(..SCHEME.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SCHEME))
}

pub fn parse(uri: &str) -> Result<Target, UriError> {
    if !has_scheme(uri) {
        return Err(UriError::MissingScheme(uri.to_string()));
    }
    let rest = &uri[SCHEME.len()..];

    let (host_spec, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };

    let (host, port) = match host_spec.split_once(':') {
        Some((host, port_str)) => {
            let port = port_str.parse::<u16>().map_err(|_| UriError::InvalidPort {
                uri: uri.to_string(),
                port: port_str.to_string(),
            })?;
            (host, port)
        }
        None => (host_spec, DEFAULT_PORT),
    };

    Ok(Target {
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}
