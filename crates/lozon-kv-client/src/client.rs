//! KV Client implementation

use lozon_kv::protocol::{read_response, Dialect, ProtocolError, Request, Response};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Default bound on one exchange
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server rejected the request")]
    Rejected,

    #[error("Unexpected response: {0:?}")]
    UnexpectedResponse(Response),
}

/// Send `request` on an open stream and read the full reply
pub async fn exchange<S>(
    stream: &mut S,
    request: &Request,
    dialect: Dialect,
) -> Result<Response, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request.encode(dialect).as_bytes()).await?;
    stream.flush().await?;

    let text = read_response(stream).await?;
    Ok(Response::decode_for(request, &text)?)
}

/// One-shot KV client
#[derive(Debug, Clone)]
pub struct KvClient {
    addr: SocketAddr,
    dialect: Dialect,
    timeout: Duration,
}

impl KvClient {
    /// Create a client for `addr` speaking `dialect`
    pub fn new(addr: SocketAddr, dialect: Dialect) -> Self {
        Self {
            addr,
            dialect,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Client for a bucket server
    pub fn bucket(addr: SocketAddr) -> Self {
        Self::new(addr, Dialect::Bucket)
    }

    /// Client for the coordinator
    pub fn coordinator(addr: SocketAddr) -> Self {
        Self::new(addr, Dialect::Coordinator)
    }

    /// Set the per-request timeout (connect + send + receive)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Server address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send a request and read the response
    pub async fn request(&self, request: &Request) -> Result<Response, ClientError> {
        match tokio::time::timeout(self.timeout, self.request_inner(request)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(self.timeout)),
        }
    }

    async fn request_inner(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = TcpStream::connect(self.addr).await?;
        // Disable Nagle's algorithm for lower latency
        stream.set_nodelay(true)?;

        let response = exchange(&mut stream, request, self.dialect).await?;
        debug!("{} -> {:?}", self.addr, response);
        Ok(response)
    }

    /// Insert or overwrite a value
    pub async fn put(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let request = Request::Put {
            key: key.to_string(),
            value: value.to_string(),
        };
        match self.request(&request).await? {
            Response::Ok => Ok(()),
            Response::Error => Err(ClientError::Rejected),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Get a value by key
    pub async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let request = Request::Get {
            key: key.to_string(),
        };
        match self.request(&request).await? {
            Response::Value(value) => Ok(Some(value)),
            Response::NotFound => Ok(None),
            Response::Error => Err(ClientError::Rejected),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Delete a key, returns whether it existed
    pub async fn delete(&self, key: &str) -> Result<bool, ClientError> {
        let request = Request::Del {
            key: key.to_string(),
        };
        match self.request(&request).await? {
            Response::Ok => Ok(true),
            Response::NotFound => Ok(false),
            Response::Error => Err(ClientError::Rejected),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// All pairs with `low <= key <= high`, as returned by the server
    pub async fn range(&self, low: &str, high: &str) -> Result<Vec<(String, String)>, ClientError> {
        let request = Request::Range {
            low: low.to_string(),
            high: high.to_string(),
        };
        match self.request(&request).await? {
            Response::Range(pairs) => Ok(pairs),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }
}
