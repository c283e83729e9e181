//! A single open region file.
//!
//! Sector 0 holds the directory: 1024 big-endian i32 entries indexed
//! by `lx + ly * 32`, each encoding `(offset_sectors << 8) |
//! (sector_count & 0xFF)`; zero means absent. A chunk frame starts at
//! `offset_sectors * 4096` with an i32 payload length followed by the
//! payload, zero-padded to its sector allocation.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;
use tessera_utils::RegionPos;

use super::{DIRECTORY_ENTRIES, SECTOR_SIZE};

/// Largest sector count a directory entry can carry.
const MAX_SECTORS_PER_CHUNK: u32 = 0xFF;

/// An open region file. All operations are serialized by the handle's
/// internal lock; the manager owns the handle and drops it on eviction
/// or shutdown.
pub struct RegionFile {
    pos: RegionPos,
    inner: Mutex<Inner>,
}

struct Inner {
    file: File,
    directory: [u32; DIRECTORY_ENTRIES],
}

impl RegionFile {
    /// Opens (or creates) the region file at `path`. A new file gets a
    /// zeroed directory sector; an existing one has its directory read
    /// into memory.
    pub fn open(path: &Path, pos: RegionPos) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut directory = [0u32; DIRECTORY_ENTRIES];
        if file.metadata()?.len() < SECTOR_SIZE as u64 {
            // Fresh file: reserve the directory sector.
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&[0u8; SECTOR_SIZE])?;
        } else {
            let mut header = [0u8; SECTOR_SIZE];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut header)?;
            for (i, entry) in directory.iter_mut().enumerate() {
                let bytes: [u8; 4] = header[i * 4..i * 4 + 4]
                    .try_into()
                    .expect("slice is 4 bytes");
                *entry = u32::from_be_bytes(bytes);
            }
        }

        Ok(Self {
            pos,
            inner: Mutex::new(Inner { file, directory }),
        })
    }

    /// The region this file stores.
    #[must_use]
    pub const fn pos(&self) -> RegionPos {
        self.pos
    }

    /// Whether the directory has an entry for the local chunk slot.
    #[must_use]
    pub fn has(&self, local_x: usize, local_y: usize) -> bool {
        let idx = RegionPos::chunk_index(local_x, local_y);
        self.inner.lock().directory[idx] != 0
    }

    /// Reads the chunk frame for the slot. A zero entry, an
    /// implausible length, or a short payload all read as absent;
    /// neighbors are unaffected.
    pub fn read(&self, local_x: usize, local_y: usize) -> io::Result<Option<Vec<u8>>> {
        let idx = RegionPos::chunk_index(local_x, local_y);
        let mut inner = self.inner.lock();

        let entry = inner.directory[idx];
        if entry == 0 {
            return Ok(None);
        }
        let offset_sectors = u64::from(entry >> 8);
        let sector_count = entry & 0xFF;

        inner
            .file
            .seek(SeekFrom::Start(offset_sectors * SECTOR_SIZE as u64))?;
        let mut len_bytes = [0u8; 4];
        if inner.file.read_exact(&mut len_bytes).is_err() {
            tracing::warn!(region = ?self.pos, slot = idx, "truncated chunk slot");
            return Ok(None);
        }
        let length = i32::from_be_bytes(len_bytes);
        if length <= 0 || length as u64 > u64::from(sector_count) * SECTOR_SIZE as u64 {
            tracing::warn!(
                region = ?self.pos,
                slot = idx,
                length,
                "implausible chunk length, treating slot as empty"
            );
            return Ok(None);
        }

        let mut payload = vec![0u8; length as usize];
        if inner.file.read_exact(&mut payload).is_err() {
            tracing::warn!(region = ?self.pos, slot = idx, "short chunk payload");
            return Ok(None);
        }
        Ok(Some(payload))
    }

    /// Writes a chunk frame into the slot. The frame is rewritten in
    /// place when it still fits its old allocation, otherwise appended
    /// at the end of the file; the abandoned sectors are leaked (an
    /// offline compactor can reclaim them from the directory).
    pub fn write(&self, local_x: usize, local_y: usize, bytes: &[u8]) -> io::Result<()> {
        let idx = RegionPos::chunk_index(local_x, local_y);
        let needed = ((bytes.len() + 4).div_ceil(SECTOR_SIZE)) as u32;
        if needed > MAX_SECTORS_PER_CHUNK {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("chunk frame of {} bytes exceeds the sector budget", bytes.len()),
            ));
        }

        let mut inner = self.inner.lock();

        let entry = inner.directory[idx];
        let (offset_sectors, alloc_sectors) = if entry != 0 && needed <= (entry & 0xFF) {
            (u64::from(entry >> 8), entry & 0xFF)
        } else {
            let file_len = inner.file.metadata()?.len();
            // Never land on the directory sector, even for an empty file.
            let offset = (file_len.div_ceil(SECTOR_SIZE as u64)).max(1);
            (offset, needed)
        };

        inner
            .file
            .seek(SeekFrom::Start(offset_sectors * SECTOR_SIZE as u64))?;
        inner.file.write_all(&(bytes.len() as i32).to_be_bytes())?;
        inner.file.write_all(bytes)?;
        let padding = alloc_sectors as usize * SECTOR_SIZE - 4 - bytes.len();
        inner.file.write_all(&vec![0u8; padding])?;

        let new_entry = ((offset_sectors as u32) << 8) | (alloc_sectors & 0xFF);
        inner.directory[idx] = new_entry;
        inner.file.seek(SeekFrom::Start(idx as u64 * 4))?;
        inner.file.write_all(&new_entry.to_be_bytes())?;
        inner.file.flush()
    }

    /// Flushes buffered writes to the OS.
    pub fn sync(&self) -> io::Result<()> {
        self.inner.lock().file.sync_all()
    }
}
