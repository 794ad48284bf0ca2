pub mod connector;
pub mod master;
pub mod proxy;
pub mod worker;

pub use connector::{Connect, TcpConnector};
pub use master::Master;
pub use proxy::Proxy;
pub use worker::{ConnOutcome, DropReason, handle_connection};
