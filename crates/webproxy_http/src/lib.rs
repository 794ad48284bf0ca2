//! HTTP/1.0 building blocks for the forwarding proxy.

pub mod headers;
pub mod request;
pub mod rio;
pub mod uri;

pub use headers::build_origin_request;
pub use request::{RequestError, RequestHead, read_request_head};
pub use rio::LineReader;
pub use uri::{Target, UriError};
