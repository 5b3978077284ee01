//! Length-delimited JSON frames over an async byte stream.
//!
//! One frame is a 4-byte big-endian length followed by that many bytes of
//! JSON. Frames larger than [`MAX_FRAME_SIZE`] are refused on both the write
//! and the read side, so a corrupt length prefix cannot trigger a huge
//! allocation.

use derive_more::{Display, Error};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted in a single frame (64 KiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Errors produced while reading or writing frames.
#[derive(Debug, Display, Error)]
pub enum FrameError {
    /// The underlying stream failed or closed.
    #[display("I/O error: {_0}")]
    Io(#[error(source)] std::io::Error),
    /// The payload could not be serialized.
    #[display("encode error: {_0}")]
    Encode(#[error(source)] serde_json::Error),
    /// The payload could not be deserialized.
    #[display("decode error: {_0}")]
    Decode(#[error(source)] serde_json::Error),
    /// The frame exceeds [`MAX_FRAME_SIZE`].
    #[display("frame too large: {len} bytes")]
    TooLarge {
        /// Declared or actual payload length.
        len: usize,
    },
}

impl FrameError {
    /// Whether the peer closed the stream cleanly between frames.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Serializes `message` to JSON and writes it as one frame, then flushes.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message).map_err(FrameError::Encode)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge { len: payload.len() });
    }
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        len: payload.len(),
    })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame and deserializes its JSON payload.
///
/// A stream that closes before or inside a frame yields
/// [`FrameError::Io`] with kind `UnexpectedEof`.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge { len });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    serde_json::from_slice(&payload).map_err(FrameError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinate, Move};

    fn sample_move(from: (u8, u8), to: (u8, u8)) -> Move {
        Move::new(
            Coordinate::new(from.0, from.1).expect("square on board"),
            Coordinate::new(to.0, to.1).expect("square on board"),
        )
    }

    #[tokio::test]
    async fn frames_keep_order_on_one_stream() {
        let moves = [
            sample_move((4, 1), (4, 3)),
            sample_move((4, 6), (4, 4)),
            sample_move((6, 0), (5, 2)),
        ];
        let mut buf = Vec::new();
        for mv in &moves {
            write_frame(&mut buf, mv).await.expect("frame written");
        }

        let mut reader = buf.as_slice();
        for expected in &moves {
            let got: Move = read_frame(&mut reader).await.expect("frame read");
            assert_eq!(&got, expected);
        }
    }

    #[tokio::test]
    async fn wire_payload_is_plain_json() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &sample_move((0, 1), (0, 2)))
            .await
            .expect("frame written");

        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(len, buf.len() - 4);
        let json: serde_json::Value = serde_json::from_slice(&buf[4..]).expect("payload is JSON");
        assert_eq!(json["origin"]["column"], 0);
        assert_eq!(json["destination"]["row"], 2);
    }

    #[tokio::test]
    async fn rejects_oversized_length_prefix() {
        let fake_len = (MAX_FRAME_SIZE as u32 + 1).to_be_bytes();
        let mut reader = &fake_len[..];
        let err = read_frame::<_, Move>(&mut reader).await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn truncated_stream_is_eof() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&100u32.to_be_bytes());
        buf.extend_from_slice(&[b'{'; 10]);

        let mut reader = buf.as_slice();
        let err = read_frame::<_, Move>(&mut reader).await.unwrap_err();
        assert!(err.is_eof());
    }

    #[tokio::test]
    async fn garbage_payload_is_decode_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&3u32.to_be_bytes());
        buf.extend_from_slice(b"???");

        let mut reader = buf.as_slice();
        let err = read_frame::<_, Move>(&mut reader).await.unwrap_err();
        assert!(matches!(err, FrameError::Decode(_)));
    }
}
