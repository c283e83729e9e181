//! Server → client messages.
//!
//! Responses are encoded into a buffer first and written to the socket
//! whole, under the connection's writer lock, so frames from parallel
//! chunk workers never interleave.

use std::io;

use tessera_utils::serial::WriteTo;
use tessera_utils::ChunkPos;

/// A reply to a client request. Chunk replies carry the coordinates in
/// every variant so pipelined clients can match them to requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Handshake accept carrying the world seed.
    LoginOk {
        /// The world seed the client needs for local regeneration.
        seed: i64,
    },
    /// A full chunk frame, sent for modified chunks.
    ChunkData {
        /// The encoded chunk frame.
        bytes: Vec<u8>,
    },
    /// A regenerate-locally hint, sent for unmodified chunks. Costs a
    /// few bytes instead of a frame.
    ChunkProcedural {
        /// The chunk to regenerate.
        pos: ChunkPos,
    },
    /// Server counters.
    StatsData {
        /// Resident bytes of the server process.
        used_memory_bytes: i64,
        /// Total bytes of system memory.
        total_memory_bytes: i64,
        /// Chunk worker tasks currently in flight.
        active_threads: i32,
        /// Chunks held in the server cache.
        loaded_chunks: i32,
    },
}

impl Response {
    const LOGIN_OK: &'static str = "LOGIN_OK";
    const CHUNK_DATA: &'static str = "CHUNK_DATA";
    const CHUNK_PROCEDURAL: &'static str = "CHUNK_PROCEDURAL";
    const STATS_DATA: &'static str = "STATS_DATA";

    /// Encodes the response into one contiguous frame.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::LoginOk { seed } => {
                Self::LOGIN_OK.write(&mut buf)?;
                seed.write(&mut buf)?;
            }
            Self::ChunkData { bytes } => {
                Self::CHUNK_DATA.write(&mut buf)?;
                (bytes.len() as i32).write(&mut buf)?;
                buf.extend_from_slice(bytes);
            }
            Self::ChunkProcedural { pos } => {
                Self::CHUNK_PROCEDURAL.write(&mut buf)?;
                pos.x.write(&mut buf)?;
                pos.y.write(&mut buf)?;
            }
            Self::StatsData {
                used_memory_bytes,
                total_memory_bytes,
                active_threads,
                loaded_chunks,
            } => {
                Self::STATS_DATA.write(&mut buf)?;
                used_memory_bytes.write(&mut buf)?;
                total_memory_bytes.write(&mut buf)?;
                active_threads.write(&mut buf)?;
                loaded_chunks.write(&mut buf)?;
            }
        }
        Ok(buf)
    }
}
