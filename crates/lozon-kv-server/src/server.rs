//! TCP server implementation
//!
//! Every accepted connection runs in its own task, but only after a permit
//! is taken from a semaphore sized by `max_connections`; once the limit is
//! reached new connections wait in the accept loop.

use async_trait::async_trait;
use lozon_kv::protocol::{read_request_line, Dialect, ProtocolError, Request, Response};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request handler behind a server
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Verb set this service accepts
    fn dialect(&self) -> Dialect;

    /// Answer one parsed request
    async fn handle(&self, request: Request) -> Response;
}

/// Connection loop for a `Service`
pub struct KvServer<S: Service> {
    service: Arc<S>,
    max_connections: usize,
}

impl<S: Service> KvServer<S> {
    /// Create a new server
    pub fn new(service: Arc<S>, max_connections: usize) -> Self {
        Self {
            service,
            max_connections: max_connections.max(1),
        }
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!(
            "Server listening on {} (max {} connections)",
            listener.local_addr()?,
            self.max_connections
        );
        let permits = Arc::new(Semaphore::new(self.max_connections));

        loop {
            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed
                Err(_) => return Ok(()),
            };

            let (socket, peer_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };
            let service = self.service.clone();

            tokio::spawn(async move {
                let _permit = permit;
                debug!("New connection from {}", peer_addr);
                if let Err(e) = socket.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
                }
                if let Err(e) = handle_connection(socket, service.as_ref()).await {
                    warn!("Connection error from {}: {}", peer_addr, e);
                }
                debug!("Connection closed: {}", peer_addr);
            });
        }
    }
}

/// Run one request/response exchange on `socket`
pub async fn handle_connection<T, S>(mut socket: T, service: &S) -> Result<(), ServerError>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: Service + ?Sized,
{
    let response = match read_request_line(&mut socket).await {
        Ok(Some(line)) => match Request::parse(&line, service.dialect()) {
            Ok(request) => service.handle(request).await,
            Err(e) => {
                debug!("Rejected request {:?}: {}", line.trim_end(), e);
                Response::Error
            }
        },
        // Peer closed without sending anything
        Ok(None) => return Ok(()),
        Err(ProtocolError::Io(e)) => return Err(e.into()),
        Err(e) => {
            debug!("Unreadable request: {}", e);
            Response::Error
        }
    };

    socket.write_all(response.encode().as_bytes()).await?;
    socket.shutdown().await?;
    Ok(())
}
