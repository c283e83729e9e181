//! The tessera server core: chunk model and codec, the in-memory chunk
//! map, the region-file storage engine, and the chunk service tying
//! them together.

pub mod chunk;
pub mod chunk_saver;
pub mod world;

pub use chunk::{Chunk, Tile};
pub use world::World;
