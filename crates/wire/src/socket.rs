// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Length-prefixed JSON framing for the local Unix socket.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame the daemon will accept, to bound memory from a
/// misbehaving client (16 MiB).
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame length {0} exceeds maximum {MAX_FRAME_LEN}")]
    FrameTooLarge(u32),
    #[error("connection closed while reading frame")]
    ConnectionClosed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize `value` to its length-prefixed wire form.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let body = serde_json::to_vec(value)?;
    let len = u32::try_from(body.len()).map_err(|_| ProtocolError::FrameTooLarge(u32::MAX))?;
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Parse a length-prefixed JSON buffer already read in full (used by tests
/// and by callers that already have the frame bytes).
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(frame)?)
}

/// Read one length-prefixed JSON message from an async stream.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    decode(&body)
}

/// Write one length-prefixed JSON message to an async stream.
pub async fn write_message<W, T>(writer: &mut W, value: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode(value)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Ping {
        n: u32,
    }

    #[tokio::test]
    async fn round_trips_over_a_duplex_stream() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_message(&mut a, &Ping { n: 7 }).await.expect("write");
        let got: Ping = read_message(&mut b).await.expect("read");
        assert_eq!(got, Ping { n: 7 });
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(16);
        let len = (MAX_FRAME_LEN + 1).to_be_bytes();
        a.write_all(&len).await.expect("write length");
        let err: Result<Ping, _> = read_message(&mut b).await;
        assert!(matches!(err, Err(ProtocolError::FrameTooLarge(_))));
    }

    #[tokio::test]
    async fn eof_before_a_frame_is_connection_closed() {
        let (a, mut b) = tokio::io::duplex(16);
        drop(a);
        let err: Result<Ping, _> = read_message(&mut b).await;
        assert!(matches!(err, Err(ProtocolError::ConnectionClosed)));
    }
}
