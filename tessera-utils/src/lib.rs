//! Shared leaf types for the tessera workspace: coordinates, the
//! big-endian serial traits, and the seeded PRNG behind world
//! generation.

pub mod random;
pub mod serial;
pub mod types;

pub use types::ChunkPos;
pub use types::RegionPos;
pub use types::CHUNK_SIZE;
pub use types::REGION_SIZE;
