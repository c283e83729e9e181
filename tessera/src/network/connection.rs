//! One accepted client connection.
//!
//! A single reader task decodes requests; `GET_CHUNK` work runs on a
//! bounded pool of worker tasks whose responses are written whole
//! under the connection's writer lock, so frames never interleave but
//! may be reordered relative to requests.

use std::net::SocketAddr;
use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::select;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use tessera_core::chunk::codec;
use tessera_core::World;
use tessera_protocol::{ProtocolError, Request, RequestDecoder, Response};
use tessera_utils::ChunkPos;

use crate::config::Config;

/// Chunk workers per connection.
const CHUNK_WORKERS: usize = 4;

/// Where the connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Nothing but `LOGIN` is acceptable.
    AwaitingLogin,
    /// Requests are served.
    Active,
    /// Torn down; all requests are ignored.
    Closed,
}

/// An accepted client connection.
pub struct Connection {
    /// The unique ID of the client.
    pub id: u64,
    /// The client's address.
    pub address: SocketAddr,
    state: AtomicCell<SessionState>,
    cancel_token: CancellationToken,
    writer: Arc<Mutex<BufWriter<OwnedWriteHalf>>>,
    world: Arc<World>,
    config: Arc<Config>,
    chunk_permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl Connection {
    /// Splits the stream and starts the connection's reader task on
    /// the tracker.
    pub fn spawn(
        stream: TcpStream,
        address: SocketAddr,
        id: u64,
        cancel_token: CancellationToken,
        world: Arc<World>,
        config: Arc<Config>,
        tracker: TaskTracker,
    ) {
        let (read, write) = stream.into_split();
        let connection = Arc::new(Self {
            id,
            address,
            state: AtomicCell::new(SessionState::AwaitingLogin),
            cancel_token,
            writer: Arc::new(Mutex::new(BufWriter::new(write))),
            world,
            config,
            chunk_permits: Arc::new(Semaphore::new(CHUNK_WORKERS)),
            tracker: tracker.clone(),
        });
        let decoder = RequestDecoder::new(BufReader::new(read));
        tracker.spawn(connection.run(decoder));
    }

    /// Tears the connection down; in-flight frames are dropped.
    pub fn close(&self) {
        self.state.store(SessionState::Closed);
        self.cancel_token.cancel();
    }

    async fn run(self: Arc<Self>, mut decoder: RequestDecoder<BufReader<OwnedReadHalf>>) {
        let mut limiter = crate::network::RateLimiter::new(self.config.max_requests_per_second);
        loop {
            select! {
                () = self.cancel_token.cancelled() => break,
                request = decoder.next_request() => match request {
                    Ok(request) => self.handle_request(request, &mut limiter).await,
                    Err(ProtocolError::Io(e))
                        if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                    {
                        log::info!("client {} hung up", self.id);
                        break;
                    }
                    Err(e) => {
                        log::warn!("client {}: {e}, closing", self.id);
                        break;
                    }
                }
            }
            if self.state.load() == SessionState::Closed {
                break;
            }
        }
        self.close();
    }

    async fn handle_request(
        self: &Arc<Self>,
        request: Request,
        limiter: &mut crate::network::RateLimiter,
    ) {
        match request {
            Request::Login => self.handle_login().await,
            Request::GetChunk(pos) => self.handle_get_chunk(pos, limiter),
            Request::GetStats => self.handle_get_stats().await,
            Request::Disconnect => {
                log::info!("client {} disconnected", self.id);
                self.close();
            }
        }
    }

    async fn handle_login(&self) {
        match self.state.load() {
            SessionState::AwaitingLogin => {
                self.state.store(SessionState::Active);
                log::info!("client {} logged in", self.id);
                self.send(&Response::LoginOk {
                    seed: self.world.seed(),
                })
                .await;
            }
            // A repeated handshake is harmless; confirm it again.
            SessionState::Active => {
                self.send(&Response::LoginOk {
                    seed: self.world.seed(),
                })
                .await;
            }
            SessionState::Closed => {}
        }
    }

    fn handle_get_chunk(self: &Arc<Self>, pos: ChunkPos, limiter: &mut crate::network::RateLimiter) {
        if self.state.load() != SessionState::Active {
            log::warn!("client {}: chunk request before login", self.id);
            self.close();
            return;
        }
        if !pos.within_bound(self.config.max_coordinate) {
            log::debug!("client {}: chunk {pos} out of bounds, dropped", self.id);
            return;
        }
        if !limiter.allow() {
            return;
        }

        let connection = self.clone();
        self.tracker.spawn(async move {
            let Ok(_permit) = connection.chunk_permits.clone().acquire_owned().await else {
                return;
            };
            connection.world.worker_started();
            connection.serve_chunk(pos).await;
            connection.world.worker_finished();
        });
    }

    async fn serve_chunk(&self, pos: ChunkPos) {
        let handle = match self.world.get_chunk(pos).await {
            Ok(handle) => handle,
            Err(e) => {
                // Fatal to this request only.
                log::warn!("client {}: chunk {pos} failed: {e}", self.id);
                return;
            }
        };

        // Unmodified chunks ship as a regenerate hint; only edited
        // chunks cost a full frame. The guard must not be held across
        // the socket write.
        let response = {
            let chunk = handle.read();
            if chunk.modified() {
                match codec::encode(&chunk) {
                    Ok(bytes) => Response::ChunkData { bytes },
                    Err(e) => {
                        log::warn!("client {}: encoding chunk {pos} failed: {e}", self.id);
                        return;
                    }
                }
            } else {
                Response::ChunkProcedural { pos }
            }
        };
        self.send(&response).await;
    }

    async fn handle_get_stats(&self) {
        if self.state.load() != SessionState::Active {
            log::warn!("client {}: stats request before login", self.id);
            self.close();
            return;
        }
        let stats = self.world.stats();
        self.send(&Response::StatsData {
            used_memory_bytes: stats.used_memory_bytes as i64,
            total_memory_bytes: stats.total_memory_bytes as i64,
            active_threads: stats.active_workers,
            loaded_chunks: stats.loaded_chunks,
        })
        .await;
    }

    /// Encodes and writes one frame under the writer lock. A broken
    /// write closes the connection.
    async fn send(&self, response: &Response) {
        let bytes = match response.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("client {}: response encoding failed: {e}", self.id);
                return;
            }
        };

        let mut writer = self.writer.lock().await;
        let result = async {
            writer.write_all(&bytes).await?;
            writer.flush().await
        }
        .await;
        drop(writer);

        if let Err(e) = result {
            if !self.cancel_token.is_cancelled() {
                log::warn!("client {}: write failed: {e}", self.id);
            }
            self.close();
        }
    }
}
