//! The PUB socket: a single publisher broadcasting `(topic, payload)`
//! frames to every connected subscriber . Subscribers never
//! send anything meaningful back; the socket ignores inbound bytes.

use crate::error::TransportError;
use crate::frame::write_frame;
use crate::paths::{bind_socket, ensure_socket_dir, unlink_socket};
use carapace_events::EventBus;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing::{debug, info, warn};

/// Owns the PUB socket's accept loop, fanning out [`EventBus`] events to
/// every connected client.
pub struct PubServer {
    path: PathBuf,
    listener: UnixListener,
}

impl PubServer {
    /// Bind the PUB socket, creating the socket directory first.
    pub async fn bind(socket_dir: &Path, path: PathBuf) -> Result<Self, TransportError> {
        ensure_socket_dir(socket_dir)?;
        let listener = bind_socket(&path).await?;
        info!(path = %path.display(), "PUB socket listening");
        Ok(Self { path, listener })
    }

    /// Run the accept loop, subscribing each new connection to the bus.
    pub async fn serve(self, bus: Arc<EventBus>) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let bus = Arc::clone(&bus);
                    tokio::spawn(async move {
                        serve_subscriber(stream, bus).await;
                    });
                },
                Err(err) => {
                    warn!(error = %err, "PUB accept failed");
                },
            }
        }
    }

    /// Path this server is bound to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PubServer {
    fn drop(&mut self) {
        unlink_socket(self.path());
    }
}

async fn serve_subscriber(stream: tokio::net::UnixStream, bus: Arc<EventBus>) {
    let mut receiver = bus.subscribe();
    let (_read_half, mut write_half) = stream.into_split();

    while let Some(event) = receiver.recv().await {
        let Ok(bytes) = serde_json::to_vec(event.as_ref()) else { continue };
        if let Err(err) = write_frame(&mut write_half, &bytes).await {
            debug!(error = %err, "PUB subscriber disconnected");
            break;
        }
    }
}
