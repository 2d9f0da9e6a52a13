//! Length-prefixed frame codec shared by the ROUTER and PUB sockets
//! (: "4-byte length prefix, then JSON payload" — carried over from
//! the kernel's original single-socket IPC framing).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum size of a single frame's JSON payload. Distinct from the
/// container-output reader's own 1 MiB NDJSON-line cap.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Error reading or writing a frame.
#[derive(Debug)]
pub enum FrameError {
    /// The connection was closed or errored mid-read/write.
    Io(std::io::Error),
    /// The declared frame length exceeded [`MAX_FRAME_BYTES`].
    TooLarge(usize),
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "frame io error: {err}"),
            Self::TooLarge(len) => write!(f, "frame of {len} bytes exceeds the {MAX_FRAME_BYTES} byte cap"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Read one length-prefixed frame. Returns `Ok(None)` on clean EOF
/// before any bytes of a new frame arrive.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {},
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Write one length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    if payload.len() > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge(payload.len()));
    }
    #[allow(clippy::cast_possible_truncation)]
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_frame() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        write_frame(&mut client, b"hello").await.unwrap();
        let frame = read_frame(&mut server).await.unwrap().unwrap();
        assert_eq!(frame, b"hello");
    }

    #[tokio::test]
    async fn rejects_oversized_frame() {
        let (mut client, mut server) = tokio::io::duplex(8);
        let len = (MAX_FRAME_BYTES as u32 + 1).to_be_bytes();
        let _ = tokio::io::AsyncWriteExt::write_all(&mut client, &len).await;
        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge(_)));
    }

    #[tokio::test]
    async fn clean_eof_returns_none() {
        let (client, mut server) = tokio::io::duplex(8);
        drop(client);
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }
}
