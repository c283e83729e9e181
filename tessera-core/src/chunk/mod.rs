//! The chunk model: a 16×16 tile grid with generation and dirty flags.

use tessera_utils::{ChunkPos, CHUNK_SIZE};
use tessera_world::{TerrainKind, TerrainPipeline, TileSample};

pub mod chunk_map;
pub mod codec;

pub use chunk_map::ChunkMap;

/// Cells per chunk (16×16).
pub const CELLS_PER_CHUNK: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// One world tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    /// Terrain classification.
    pub terrain: TerrainKind,
    /// Surface height in `[0, 1]`.
    pub height: f32,
    /// Temperature in `[0, 1]`.
    pub temperature: f32,
    /// Moisture in `[0, 1]`.
    pub moisture: f32,
    /// Owning player id; `-1` means unclaimed.
    pub owner_id: i64,
    /// Structure id; `0` means none.
    pub structure_id: i32,
    /// Amount of whatever the structure holds.
    pub content_amount: i32,
    /// Structure rotation.
    pub rotation: i8,
}

impl Tile {
    /// Builds a freshly generated tile from a pipeline sample. Owner
    /// and structure start out unclaimed/empty.
    #[must_use]
    pub fn from_sample(sample: &TileSample) -> Self {
        Self {
            terrain: sample.kind,
            height: sample.height as f32,
            temperature: sample.temperature as f32,
            moisture: sample.moisture as f32,
            owner_id: -1,
            structure_id: 0,
            content_amount: 0,
            rotation: 0,
        }
    }
}

/// A 16×16 grid of tiles plus its header flags.
///
/// `generated` guarantees every cell is populated. `modified` tracks
/// client edits only; generation never sets it, and it alone decides
/// whether the chunk ships as bytes or as a regenerate hint.
#[derive(Debug, Clone)]
pub struct Chunk {
    pos: ChunkPos,
    generated: bool,
    modified: bool,
    tiles: Box<[Option<Tile>; CELLS_PER_CHUNK]>,
}

impl Chunk {
    /// Creates an empty, ungenerated chunk.
    #[must_use]
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            generated: false,
            modified: false,
            tiles: Box::new([None; CELLS_PER_CHUNK]),
        }
    }

    /// Generates the chunk from the pipeline. Pure in `(seed, pos)`;
    /// surrounding chunks are never consulted.
    #[must_use]
    pub fn generate(pipeline: &TerrainPipeline, pos: ChunkPos) -> Self {
        let mut chunk = Self::new(pos);
        let base_x = pos.world_x();
        let base_y = pos.world_y();
        for lx in 0..CHUNK_SIZE {
            for ly in 0..CHUNK_SIZE {
                let sample = pipeline.sample(
                    (base_x + i64::from(lx)) as f64,
                    (base_y + i64::from(ly)) as f64,
                );
                chunk.set_tile(lx as usize, ly as usize, Tile::from_sample(&sample));
            }
        }
        chunk.generated = true;
        chunk.modified = false;
        chunk
    }

    #[inline]
    fn index(lx: usize, ly: usize) -> usize {
        debug_assert!(lx < CHUNK_SIZE as usize);
        debug_assert!(ly < CHUNK_SIZE as usize);
        lx * CHUNK_SIZE as usize + ly
    }

    /// The chunk position.
    #[must_use]
    pub const fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Whether every cell has been populated by the generator or a
    /// full decode.
    #[must_use]
    pub const fn generated(&self) -> bool {
        self.generated
    }

    /// Whether a client edit has touched this chunk.
    #[must_use]
    pub const fn modified(&self) -> bool {
        self.modified
    }

    /// Returns the tile at local coordinates, if populated.
    #[must_use]
    pub fn tile(&self, lx: usize, ly: usize) -> Option<&Tile> {
        self.tiles[Self::index(lx, ly)].as_ref()
    }

    /// Sets the tile at local coordinates.
    pub fn set_tile(&mut self, lx: usize, ly: usize, tile: Tile) {
        self.tiles[Self::index(lx, ly)] = Some(tile);
    }

    /// Marks the chunk as fully generated.
    pub fn set_generated(&mut self, generated: bool) {
        self.generated = generated;
    }

    /// Marks the chunk as edited by a client.
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }
}
