//! The chunk service: resolves chunk requests as cache → disk →
//! generator, persists new chunks write-through, and runs the
//! autosave loop.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio_util::sync::CancellationToken;

use tessera_utils::ChunkPos;
use tessera_world::TerrainPipeline;

use crate::chunk::chunk_map::{ChunkHandle, ChunkMap};
use crate::chunk::{codec, Chunk};
use crate::chunk_saver::RegionManager;

pub mod memory;

pub use memory::{MemoryUsage, MemoryWatchdog};

/// Eviction radius applied under memory pressure, in chunks around the
/// world origin.
const EMERGENCY_EVICTION_RADIUS: i32 = 100;

/// A snapshot of the counters shipped in a stats reply.
#[derive(Debug, Clone, Copy)]
pub struct WorldStats {
    /// Resident bytes of this process.
    pub used_memory_bytes: u64,
    /// Total bytes of system memory.
    pub total_memory_bytes: u64,
    /// Chunk worker tasks currently in flight.
    pub active_workers: i32,
    /// Chunks held in the in-memory map.
    pub loaded_chunks: i32,
}

/// The world service. Owns the chunk map, the storage engine and the
/// terrain pipeline; everything else reaches chunks through it.
pub struct World {
    seed: i64,
    chunks: ChunkMap,
    storage: RegionManager,
    pipeline: TerrainPipeline,
    watchdog: MemoryWatchdog,
    emergency_threshold: f64,
    max_cached_chunks: usize,
    active_workers: AtomicI32,
}

impl World {
    /// Opens the world rooted at `regions_dir`. Storage failure here
    /// refuses server startup.
    pub fn open(
        regions_dir: &Path,
        seed: i64,
        emergency_threshold: f64,
        max_cached_chunks: usize,
    ) -> io::Result<Arc<Self>> {
        let storage = RegionManager::new(regions_dir)?;
        tracing::info!(
            seed,
            max_cached_chunks,
            "world opened at {}",
            regions_dir.display()
        );
        Ok(Arc::new(Self {
            seed,
            chunks: ChunkMap::new(),
            storage,
            pipeline: TerrainPipeline::new(seed),
            watchdog: MemoryWatchdog::new(),
            emergency_threshold,
            max_cached_chunks,
            active_workers: AtomicI32::new(0),
        }))
    }

    /// The world seed, as confirmed to clients at login.
    #[must_use]
    pub const fn seed(&self) -> i64 {
        self.seed
    }

    /// Resolves a chunk: cached, loaded from disk, or freshly
    /// generated (and then persisted). The blocking work runs on the
    /// blocking pool.
    pub async fn get_chunk(self: &Arc<Self>, pos: ChunkPos) -> io::Result<ChunkHandle> {
        self.check_memory_pressure();

        if let Some(handle) = self.chunks.get(pos) {
            if handle.read().generated() {
                return Ok(handle);
            }
        }

        let world = self.clone();
        tokio::task::spawn_blocking(move || world.load_or_generate(pos))
            .await
            .map_err(io::Error::other)?
    }

    /// The synchronous resolution path: disk, then the generator.
    fn load_or_generate(&self, pos: ChunkPos) -> io::Result<ChunkHandle> {
        match self.storage.read_chunk(pos) {
            Ok(Some(bytes)) => match codec::decode(&bytes) {
                Ok(chunk) if chunk.generated() => {
                    let handle = self.chunks.get_or_create(pos);
                    *handle.write() = chunk;
                    return Ok(handle);
                }
                Ok(_) => {
                    tracing::debug!(%pos, "stored chunk incomplete, regenerating");
                }
                Err(e) => {
                    tracing::warn!(%pos, "stored chunk frame undecodable, regenerating: {e}");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%pos, "region read failed, falling back to generation: {e}");
            }
        }

        let chunk = Chunk::generate(&self.pipeline, pos);
        let bytes = codec::encode(&chunk)?;
        let handle = self.chunks.get_or_create(pos);
        *handle.write() = chunk;

        // The in-memory chunk stays authoritative if the write fails;
        // the next autosave retries.
        if let Err(e) = self.storage.write_chunk(pos, &bytes) {
            tracing::warn!(%pos, "failed to persist generated chunk: {e}");
        }
        Ok(handle)
    }

    /// Encodes and writes every generated chunk in the map. Returns
    /// the number written.
    pub fn save_all(&self) -> usize {
        let mut saved = 0;
        for (pos, handle) in self.chunks.snapshot() {
            let encoded = {
                let chunk = handle.read();
                if !chunk.generated() {
                    continue;
                }
                codec::encode(&chunk)
            };
            match encoded.and_then(|bytes| self.storage.write_chunk(pos, &bytes)) {
                Ok(()) => saved += 1,
                Err(e) => tracing::warn!(%pos, "autosave write failed: {e}"),
            }
        }
        saved
    }

    /// Starts the periodic autosave task; it stops with the token.
    pub fn spawn_autosave(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let world = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; nothing to save yet.
            ticker.tick().await;
            loop {
                select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let world = world.clone();
                        let saved =
                            tokio::task::spawn_blocking(move || world.save_all())
                                .await
                                .unwrap_or(0);
                        tracing::info!("autosave wrote {saved} chunks");
                    }
                }
            }
        });
    }

    /// Materializes every chunk in `[-radius, radius]²` around the
    /// origin so the world root exists deterministically at boot.
    pub fn warm_spawn(&self, radius: i32) -> io::Result<usize> {
        let mut warmed = 0;
        for cx in -radius..=radius {
            for cy in -radius..=radius {
                self.load_or_generate(ChunkPos::new(cx, cy))?;
                warmed += 1;
            }
        }
        tracing::info!("spawn warmup materialized {warmed} chunks (radius {radius})");
        Ok(warmed)
    }

    /// Flushes and closes every open region file.
    pub fn close_storage(&self) -> io::Result<()> {
        self.storage.close_all()
    }

    fn check_memory_pressure(&self) {
        let usage = self.watchdog.usage();
        if usage.ratio() > self.emergency_threshold {
            let evicted = self
                .chunks
                .evict_outside(ChunkPos::new(0, 0), EMERGENCY_EVICTION_RADIUS);
            tracing::warn!(
                used = usage.used_bytes,
                total = usage.total_bytes,
                cached = self.chunks.len(),
                ceiling = self.max_cached_chunks,
                "memory pressure: evicted {evicted} distant chunks"
            );
        }
    }

    /// Marks a chunk worker as started; pairs with
    /// [`Self::worker_finished`].
    pub fn worker_started(&self) {
        self.active_workers.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks a chunk worker as finished.
    pub fn worker_finished(&self) {
        self.active_workers.fetch_sub(1, Ordering::Relaxed);
    }

    /// Counters for a stats reply.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        let usage = self.watchdog.usage();
        WorldStats {
            used_memory_bytes: usage.used_bytes,
            total_memory_bytes: usage.total_bytes,
            active_workers: self.active_workers.load(Ordering::Relaxed),
            loaded_chunks: self.chunks.len() as i32,
        }
    }

    /// The number of chunks currently cached.
    #[must_use]
    pub fn cached_chunks(&self) -> usize {
        self.chunks.len()
    }
}
