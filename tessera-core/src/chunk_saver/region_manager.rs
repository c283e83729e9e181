//! Region file manager with a bounded LRU of open handles.
//!
//! Region files are kept open while nearby chunks are being served,
//! avoiding a reopen for every chunk operation. The table holds at
//! most [`MAX_OPEN_REGIONS`] handles; opening one more evicts the
//! least-recently-used handle, which is flushed after its table slot
//! is released.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tessera_utils::{ChunkPos, RegionPos};

use super::region_file::RegionFile;
use super::MAX_OPEN_REGIONS;

/// Manages region files for one world.
pub struct RegionManager {
    /// Directory holding the region files (`worlds/<name>/regions`).
    base_path: PathBuf,
    open: Mutex<OpenRegions>,
}

struct OpenRegions {
    handles: FxHashMap<RegionPos, Arc<RegionFile>>,
    /// Recency order, least-recently-used at the front.
    lru: VecDeque<RegionPos>,
}

impl OpenRegions {
    fn touch(&mut self, pos: RegionPos) {
        if let Some(i) = self.lru.iter().position(|p| *p == pos) {
            self.lru.remove(i);
        }
        self.lru.push_back(pos);
    }
}

impl RegionManager {
    /// Creates the manager and its on-disk directory. Failure here is
    /// fatal to server startup.
    pub fn new(base_path: impl Into<PathBuf>) -> io::Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            open: Mutex::new(OpenRegions {
                handles: FxHashMap::default(),
                lru: VecDeque::new(),
            }),
        })
    }

    fn region_path(&self, pos: RegionPos) -> PathBuf {
        self.base_path.join(pos.filename())
    }

    /// Returns the open handle for a region, opening it if necessary.
    /// With `create` false, a region with no file yields `None`.
    fn handle(&self, pos: RegionPos, create: bool) -> io::Result<Option<Arc<RegionFile>>> {
        let evicted;
        let handle;
        {
            let mut open = self.open.lock();
            if let Some(existing) = open.handles.get(&pos) {
                let existing = existing.clone();
                open.touch(pos);
                return Ok(Some(existing));
            }

            let path = self.region_path(pos);
            if !create && !path.exists() {
                return Ok(None);
            }

            handle = Arc::new(RegionFile::open(&path, pos)?);
            open.handles.insert(pos, handle.clone());
            open.touch(pos);

            evicted = if open.handles.len() > MAX_OPEN_REGIONS {
                open.lru
                    .pop_front()
                    .and_then(|oldest| open.handles.remove(&oldest))
            } else {
                None
            };
        }

        // Flush the evicted handle outside the table lock; its own
        // lock must be free before the Arc can be dropped.
        if let Some(old) = evicted {
            if let Err(e) = old.sync() {
                tracing::warn!(region = ?old.pos(), "flush on eviction failed: {e}");
            }
        }
        Ok(Some(handle))
    }

    /// Whether a chunk frame exists on disk.
    pub fn chunk_exists(&self, pos: ChunkPos) -> io::Result<bool> {
        let region = RegionPos::from_chunk(pos);
        let (lx, ly) = RegionPos::local_chunk_pos(pos);
        Ok(self
            .handle(region, false)?
            .is_some_and(|file| file.has(lx, ly)))
    }

    /// Reads a chunk frame. Missing regions and missing or corrupt
    /// slots all read as `None`.
    pub fn read_chunk(&self, pos: ChunkPos) -> io::Result<Option<Vec<u8>>> {
        let region = RegionPos::from_chunk(pos);
        let (lx, ly) = RegionPos::local_chunk_pos(pos);
        match self.handle(region, false)? {
            Some(file) => file.read(lx, ly),
            None => Ok(None),
        }
    }

    /// Writes a chunk frame, creating the region file on first write.
    pub fn write_chunk(&self, pos: ChunkPos, bytes: &[u8]) -> io::Result<()> {
        let region = RegionPos::from_chunk(pos);
        let (lx, ly) = RegionPos::local_chunk_pos(pos);
        let file = self
            .handle(region, true)?
            .expect("create-mode handle is always present");
        file.write(lx, ly, bytes)
    }

    /// Flushes every open region file.
    pub fn flush_all(&self) -> io::Result<()> {
        let handles: Vec<_> = {
            let open = self.open.lock();
            open.handles.values().cloned().collect()
        };
        for file in handles {
            file.sync()?;
        }
        Ok(())
    }

    /// Flushes and drops every open handle. Called on shutdown.
    pub fn close_all(&self) -> io::Result<()> {
        let handles: Vec<_> = {
            let mut open = self.open.lock();
            open.lru.clear();
            open.handles.drain().map(|(_, file)| file).collect()
        };
        for file in handles {
            file.sync()?;
        }
        Ok(())
    }

    /// The number of currently open region files.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.lock().handles.len()
    }
}
