//! The ROUTER socket: request/response frames addressed by connection
//! identity .
//!
//! Each accepted connection owns a reader half and a writer half. The
//! reader decodes one frame at a time and spawns an independent task
//! per frame (frames from the same connection may therefore complete
//! out of order); completed response envelopes are sent to a
//! per-connection channel so a single writer task serializes them onto
//! the stream without interleaving.

use crate::error::TransportError;
use crate::frame::{read_frame, write_frame, FrameError};
use crate::handler::RequestHandler;
use crate::identity::{ConnectionIdentity, IdentityAllocator};
use crate::paths::{bind_socket, ensure_socket_dir, unlink_socket};
use carapace_core::envelope::{spoofed_identity_field, Envelope, WireMessage};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// Owns the ROUTER socket's accept loop.
pub struct RouterServer {
    path: PathBuf,
    listener: UnixListener,
    identities: Arc<IdentityAllocator>,
}

impl RouterServer {
    /// Bind the ROUTER socket, creating the socket directory first.
    pub async fn bind(socket_dir: &Path, path: PathBuf) -> Result<Self, TransportError> {
        ensure_socket_dir(socket_dir)?;
        let listener = bind_socket(&path).await?;
        info!(path = %path.display(), "ROUTER socket listening");
        Ok(Self { path, listener, identities: Arc::new(IdentityAllocator::new()) })
    }

    /// Run the accept loop until the listener errors out. Each accepted
    /// connection is driven on its own task and never blocks another.
    pub async fn serve(self, handler: Arc<dyn RequestHandler>) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let identity = self.identities.allocate();
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        serve_connection(stream, identity, handler).await;
                    });
                },
                Err(err) => {
                    warn!(error = %err, "ROUTER accept failed");
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

impl Drop for RouterServer {
    fn drop(&mut self) {
        unlink_socket(self.path());
    }
}

async fn serve_connection(    stream: tokio::net::UnixStream,
    identity: ConnectionIdentity,
    handler: Arc<dyn RequestHandler>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::channel::<Envelope>(OUTBOUND_CHANNEL_CAPACITY);

    let writer_task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let correlation = envelope.correlation;
            let Ok(bytes) = serde_json::to_vec(&envelope) else { continue };
            if let Err(err) = write_frame(&mut write_half, &bytes).await {
                warn!(?correlation, error = %err, "send-back failed, dropping");
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    loop {
        match read_frame(&mut read_half).await {
            Ok(Some(bytes)) => {
                let tx = tx.clone();
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    handle_frame(identity, &bytes, handler, tx).await;
                });
            },
            Ok(None) => break,
            Err(FrameError::TooLarge(len)) => {
                debug!(%identity, len, "oversized frame dropped");
            },
            Err(FrameError::Io(err)) => {
                debug!(%identity, error = %err, "connection read error");
                break;
            },
        }
    }

    handler.on_disconnect(identity).await;
    drop(tx);
    let _ = writer_task.await;
}

async fn handle_frame(    identity: ConnectionIdentity,
    bytes: &[u8],
    handler: Arc<dyn RequestHandler>,
    tx: mpsc::Sender<Envelope>,
) {
    let raw: Value = match serde_json::from_slice(bytes) {
        Ok(v) => v,
        Err(err) => {
            debug!(%identity, error = %err, "malformed frame (invalid JSON), dropped");
            return;
        },
    };

    if let Some(field) = spoofed_identity_field(&raw) {
        debug!(%identity, field, "malformed frame (spoofed identity field), dropped");
        return;
    }

    let wire: WireMessage = match serde_json::from_value(raw) {
        Ok(w) => w,
        Err(err) => {
            debug!(%identity, error = %err, "malformed frame (wrong shape), dropped");
            return;
        },
    };

    if let Some(envelope) = handler.handle(identity, wire).await {
        if tx.send(envelope).await.is_err() {
            debug!(%identity, "connection closed before response could be queued");
        }
    }
}
