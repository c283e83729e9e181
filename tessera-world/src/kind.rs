//! The closed set of terrain kinds and the classification rules that
//! assign one to every generated tile.

/// A terrain kind. Ordinals are part of the on-disk and on-wire chunk
/// format and must never be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TerrainKind {
    /// Open water below the deep band.
    DeepOcean = 0,
    /// Open water. Also the sentinel for unknown ordinals.
    Ocean = 1,
    /// Coastal water just below sea level.
    Shallows = 2,
    /// Carved river channel.
    River = 3,
    /// Open grassland.
    Grassland = 4,
    /// Dry scrub.
    Shrubland = 5,
    /// Light forest.
    Woodland = 6,
    /// Dense mid-latitude forest.
    TemperateForest = 7,
    /// Cold conifer forest.
    Taiga = 8,
    /// Frozen plain.
    Tundra = 9,
    /// Rolling highland.
    Hills = 10,
    /// Bare rock.
    Mountain = 11,
    /// Snow-capped peak.
    SnowMountain = 12,
    /// Hot sand.
    Desert = 13,
    /// Dry tropical grassland.
    Savanna = 14,
    /// Humid tropical forest.
    TropicalForest = 15,
    /// Very hot, very wet forest.
    Rainforest = 16,
    /// Waterlogged lowland.
    Swamp = 17,
    /// Dry temperate plain.
    Steppe = 18,
}

impl TerrainKind {
    /// Stable wire/disk ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Decodes an ordinal; unknown values fall back to [`Self::Ocean`].
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            0 => Self::DeepOcean,
            1 => Self::Ocean,
            2 => Self::Shallows,
            3 => Self::River,
            4 => Self::Grassland,
            5 => Self::Shrubland,
            6 => Self::Woodland,
            7 => Self::TemperateForest,
            8 => Self::Taiga,
            9 => Self::Tundra,
            10 => Self::Hills,
            11 => Self::Mountain,
            12 => Self::SnowMountain,
            13 => Self::Desert,
            14 => Self::Savanna,
            15 => Self::TropicalForest,
            16 => Self::Rainforest,
            17 => Self::Swamp,
            18 => Self::Steppe,
            _ => Self::Ocean,
        }
    }

    /// Classifies a tile from its generated scalars. The rules are
    /// ordered; the first match wins, and the final arm guarantees a
    /// result for every input.
    #[must_use]
    pub fn classify(height: f64, temperature: f64, moisture: f64, river: bool) -> Self {
        let h = height;
        let t = temperature;
        let m = moisture;

        if river && h > 0.4 && h < 0.92 {
            return Self::River;
        }
        if h < 0.3 {
            return Self::DeepOcean;
        }
        if h < 0.38 {
            return Self::Ocean;
        }
        if h < 0.42 {
            return Self::Shallows;
        }
        if h > 0.92 {
            return Self::SnowMountain;
        }
        if h > 0.85 {
            return if t < 0.25 { Self::SnowMountain } else { Self::Mountain };
        }
        if h > 0.75 {
            if t < 0.3 {
                return Self::Mountain;
            }
            return if m < 0.3 { Self::Shrubland } else { Self::Woodland };
        }
        if h > 0.65 {
            return Self::Hills;
        }
        if h > 0.55 {
            return if m < 0.35 { Self::Shrubland } else { Self::Woodland };
        }
        if t < 0.15 && h > 0.5 {
            return Self::Tundra;
        }
        if t < 0.3 {
            return if m > 0.4 { Self::Taiga } else { Self::Grassland };
        }
        // Hot and wet belongs to the rainforest arm below.
        if h > 0.4 && h < 0.5 && m > 0.7 && t <= 0.7 {
            return Self::Swamp;
        }
        if h > 0.5 && h < 0.6 && m < 0.3 && t > 0.4 {
            return Self::Steppe;
        }
        if t < 0.6 {
            return if m < 0.3 { Self::Grassland } else { Self::TemperateForest };
        }
        if t > 0.7 && m > 0.7 {
            return Self::Rainforest;
        }
        if m < 0.25 {
            return Self::Desert;
        }
        if m < 0.5 {
            return Self::Savanna;
        }
        Self::TropicalForest
    }
}
