//! Rate sources and the I/O capabilities used to reach them

pub mod bangkok_bank;
pub mod exchange_api;
pub mod fallback;
pub mod probe;
pub mod transport;

pub use probe::{ReachabilityProbe, TcpProbe};
pub use transport::{DirectTransport, FetchRequest, FetchResponse, ProxyTransport, Transport};
