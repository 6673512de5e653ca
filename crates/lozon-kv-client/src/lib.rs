//! TCP client for the lozon hash store
//!
//! One connection per request: connect, send one line, read the reply until
//! the server closes. Speaks either the coordinator or the bucket dialect.

mod client;

pub use client::{exchange, ClientError, KvClient, DEFAULT_TIMEOUT};
pub use lozon_kv::protocol::{Dialect, ProtocolError, Request, Response};
