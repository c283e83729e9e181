//! Client → server messages.

use tessera_utils::ChunkPos;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ProtocolError;

/// Longest command string a client may send. Commands are short
/// keywords; anything larger is garbage.
const MAX_COMMAND_LEN: usize = 64;

/// A decoded client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Handshake request.
    Login,
    /// Fetch one chunk.
    GetChunk(ChunkPos),
    /// Fetch server counters.
    GetStats,
    /// Orderly goodbye.
    Disconnect,
}

/// Decoder: client → server. Reads one command at a time from the
/// connection's read half.
pub struct RequestDecoder<R: AsyncRead + Unpin> {
    reader: R,
}

impl<R: AsyncRead + Unpin> RequestDecoder<R> {
    /// Creates a new `RequestDecoder`.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next request from the stream.
    ///
    /// # Errors
    /// - If the socket fails or closes mid-message.
    /// - If the command string is oversized, malformed, or unknown.
    pub async fn next_request(&mut self) -> Result<Request, ProtocolError> {
        let command = self.read_string().await?;
        match command.as_str() {
            "LOGIN" => Ok(Request::Login),
            "GET_CHUNK" => {
                let cx = self.reader.read_i32().await?;
                let cy = self.reader.read_i32().await?;
                Ok(Request::GetChunk(ChunkPos::new(cx, cy)))
            }
            "GET_STATS" => Ok(Request::GetStats),
            "DISCONNECT" => Ok(Request::Disconnect),
            _ => Err(ProtocolError::UnknownCommand(command)),
        }
    }

    async fn read_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.reader.read_u16().await? as usize;
        if len > MAX_COMMAND_LEN {
            return Err(ProtocolError::CommandTooLong(len));
        }
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).await?;
        String::from_utf8(buf).map_err(|e| ProtocolError::MalformedString(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn frame(command: &str, scalars: &[i32]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes
            .write_all(&(command.len() as u16).to_be_bytes())
            .expect("write");
        bytes.write_all(command.as_bytes()).expect("write");
        for scalar in scalars {
            bytes.write_all(&scalar.to_be_bytes()).expect("write");
        }
        bytes
    }

    #[tokio::test]
    async fn decodes_every_command() {
        let mut bytes = frame("LOGIN", &[]);
        bytes.extend(frame("GET_CHUNK", &[3, -9]));
        bytes.extend(frame("GET_STATS", &[]));
        bytes.extend(frame("DISCONNECT", &[]));

        let mut decoder = RequestDecoder::new(bytes.as_slice());
        assert_eq!(decoder.next_request().await.expect("login"), Request::Login);
        assert_eq!(
            decoder.next_request().await.expect("chunk"),
            Request::GetChunk(ChunkPos::new(3, -9))
        );
        assert_eq!(
            decoder.next_request().await.expect("stats"),
            Request::GetStats
        );
        assert_eq!(
            decoder.next_request().await.expect("bye"),
            Request::Disconnect
        );
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let bytes = frame("EXPLODE", &[]);
        let mut decoder = RequestDecoder::new(bytes.as_slice());
        assert!(matches!(
            decoder.next_request().await,
            Err(ProtocolError::UnknownCommand(c)) if c == "EXPLODE"
        ));
    }

    #[tokio::test]
    async fn oversized_command_is_rejected() {
        let bytes = frame(&"X".repeat(65), &[]);
        let mut decoder = RequestDecoder::new(bytes.as_slice());
        assert!(matches!(
            decoder.next_request().await,
            Err(ProtocolError::CommandTooLong(65))
        ));
    }

    #[tokio::test]
    async fn truncated_message_is_an_io_error() {
        // GET_CHUNK with only one of its two coordinates.
        let mut bytes = frame("GET_CHUNK", &[]);
        bytes.extend(7i32.to_be_bytes());
        let mut decoder = RequestDecoder::new(bytes.as_slice());
        assert!(matches!(
            decoder.next_request().await,
            Err(ProtocolError::Io(_))
        ));
    }

    #[tokio::test]
    async fn invalid_utf8_is_rejected() {
        let bytes: Vec<u8> = vec![0, 2, 0xFF, 0xFE];
        let mut decoder = RequestDecoder::new(bytes.as_slice());
        assert!(matches!(
            decoder.next_request().await,
            Err(ProtocolError::MalformedString(_))
        ));
    }
}
