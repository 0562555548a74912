//! Line-oriented TCP transport.
//!
//! Each connection carries newline-delimited JSON requests of the form
//! `{"type": "<command>", "params": {...}}` and gets exactly one JSON
//! response line back per request, in order.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::error::AppError;
use crate::registry::CommandRegistry;
use crate::response::Response;
use crate::state::AppState;

pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
    registry: Arc<CommandRegistry>,
}

impl Server {
    pub async fn bind(
        addr: SocketAddr,
        state: Arc<AppState>,
        registry: Arc<CommandRegistry>,
    ) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| AppError::IoError {
            message: format!("Failed to bind {addr}: {e}"),
        })?;
        Ok(Self {
            listener,
            state,
            registry,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> Result<(), AppError> {
        self.serve_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await
    }

    /// Accept connections until `shutdown` resolves. Connections already open
    /// keep running on their own tasks.
    pub async fn serve_until<F>(self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        tracing::info!(%addr, commands = self.registry.len(), "listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = Arc::clone(&self.state);
                        let registry = Arc::clone(&self.registry);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, state, registry).await {
                                tracing::warn!(%peer, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<AppState>,
    registry: Arc<CommandRegistry>,
) -> Result<(), AppError> {
    let peer = stream.peer_addr()?;
    tracing::debug!(%peer, "client connected");
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = dispatch_line(&state, &registry, line).await;
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }

    tracing::debug!(%peer, "client disconnected");
    Ok(())
}

/// Dispatch off the async runtime; handlers block on the owner thread and
/// on script processes.
async fn dispatch_line(
    state: &Arc<AppState>,
    registry: &Arc<CommandRegistry>,
    line: String,
) -> Response {
    let state = Arc::clone(state);
    let registry = Arc::clone(registry);
    match tokio::task::spawn_blocking(move || registry.dispatch_str(&state, &line)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "dispatch task failed");
            Response::error(format!("Internal error: {e}"))
        }
    }
}
