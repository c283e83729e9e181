//! The chunk codec: the single source of truth for chunk bytes, both
//! on disk and on the wire.
//!
//! A frame is a gzip stream of: i32 cx, i32 cy, bool generated, bool
//! modified, then 256 cells in row-major order (lx outer, ly inner),
//! each a presence flag followed by the tile fields when present. All
//! scalars are big-endian.

use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use tessera_utils::serial::{ReadFrom, WriteTo};
use tessera_utils::{ChunkPos, CHUNK_SIZE};
use tessera_world::TerrainKind;

use super::{Chunk, Tile};

/// Encodes a chunk into a compressed frame.
pub fn encode(chunk: &Chunk) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());

    chunk.pos().x.write(&mut encoder)?;
    chunk.pos().y.write(&mut encoder)?;
    chunk.generated().write(&mut encoder)?;
    chunk.modified().write(&mut encoder)?;

    for lx in 0..CHUNK_SIZE as usize {
        for ly in 0..CHUNK_SIZE as usize {
            match chunk.tile(lx, ly) {
                Some(tile) => {
                    true.write(&mut encoder)?;
                    write_tile(tile, &mut encoder)?;
                }
                None => false.write(&mut encoder)?,
            }
        }
    }

    encoder.finish()
}

/// Decodes a frame produced by [`encode`]. Unknown terrain ordinals
/// fall back to the ocean sentinel; truncated streams are an error.
pub fn decode(bytes: &[u8]) -> io::Result<Chunk> {
    let mut decoder = GzDecoder::new(bytes);

    let cx = i32::read(&mut decoder)?;
    let cy = i32::read(&mut decoder)?;
    let generated = bool::read(&mut decoder)?;
    let modified = bool::read(&mut decoder)?;

    let mut chunk = Chunk::new(ChunkPos::new(cx, cy));
    for lx in 0..CHUNK_SIZE as usize {
        for ly in 0..CHUNK_SIZE as usize {
            if bool::read(&mut decoder)? {
                chunk.set_tile(lx, ly, read_tile(&mut decoder)?);
            }
        }
    }
    chunk.set_generated(generated);
    chunk.set_modified(modified);
    Ok(chunk)
}

fn write_tile(tile: &Tile, writer: &mut impl Write) -> io::Result<()> {
    tile.terrain.ordinal().write(writer)?;
    tile.height.write(writer)?;
    tile.temperature.write(writer)?;
    tile.moisture.write(writer)?;
    tile.owner_id.write(writer)?;
    tile.structure_id.write(writer)?;
    tile.content_amount.write(writer)?;
    tile.rotation.write(writer)
}

fn read_tile(reader: &mut impl Read) -> io::Result<Tile> {
    Ok(Tile {
        terrain: TerrainKind::from_ordinal(u8::read(reader)?),
        height: f32::read(reader)?,
        temperature: f32::read(reader)?,
        moisture: f32::read(reader)?,
        owner_id: i64::read(reader)?,
        structure_id: i32::read(reader)?,
        content_amount: i32::read(reader)?,
        rotation: i8::read(reader)?,
    })
}
