//! The deterministic terrain pipeline.
//!
//! Nine independently seeded noise fields are combined into height,
//! temperature, moisture and a terrain kind for any world tile. The
//! whole computation is a pure function of `(seed, wx, wy)`; no
//! cross-chunk state exists, so chunks can be generated in any order.

use crate::biome::{BiomeShaping, BiomeStrategy, DesertShaping, StandardShaping};
use crate::kind::TerrainKind;
use crate::noise::NoiseField;

/// Continental value separating ocean from land.
pub const SEA_LEVEL: f64 = 0.42;

const CONTINENT_SCALE: f64 = 0.0004;
const MACRO_CLIMATE_SCALE: f64 = 0.000_08;
const RIVER_SCALE: f64 = 0.001;
const MOUNTAIN_CONTROL_SCALE: f64 = 0.0003;
const LOCAL_CLIMATE_SCALE: f64 = 0.01;

const WARP_SCALE: f64 = 0.0001;
const WARP_AMPLITUDE: f64 = 200.0;

const RIVER_THRESHOLD: f64 = 0.985;
const RIVER_DEPTH: f64 = 0.06;
const RIVER_FLOOR: f64 = 0.2;

/// Everything the pipeline knows about one world tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSample {
    /// Surface height in `[0, 1]`.
    pub height: f64,
    /// Temperature in `[0, 1]`.
    pub temperature: f64,
    /// Moisture in `[0, 1]`.
    pub moisture: f64,
    /// Whether a river runs through the tile.
    pub river: bool,
    /// The classified terrain kind.
    pub kind: TerrainKind,
}

/// The seeded terrain pipeline.
pub struct TerrainPipeline {
    continental: NoiseField,
    mountains: NoiseField,
    local_height: NoiseField,
    rivers: NoiseField,
    mountain_control: NoiseField,
    macro_temperature: NoiseField,
    macro_moisture: NoiseField,
    local_temperature: NoiseField,
    local_moisture: NoiseField,
    standard: BiomeStrategy,
    desert: BiomeStrategy,
}

impl TerrainPipeline {
    /// Builds every noise field from the world seed. Field seeds are
    /// fixed offsets from the world seed; changing them changes every
    /// world ever generated.
    #[must_use]
    pub fn new(seed: i64) -> Self {
        Self {
            continental: NoiseField::new(seed),
            mountains: NoiseField::new(seed.wrapping_add(1)),
            local_height: NoiseField::new(seed.wrapping_add(2)),
            rivers: NoiseField::new(seed.wrapping_add(5)),
            mountain_control: NoiseField::new(seed.wrapping_add(7)),
            macro_temperature: NoiseField::new(seed.wrapping_add(10)),
            macro_moisture: NoiseField::new(seed.wrapping_add(20)),
            local_temperature: NoiseField::new(seed.wrapping_add(40)),
            local_moisture: NoiseField::new(seed.wrapping_add(50)),
            standard: BiomeStrategy::Standard(StandardShaping),
            desert: BiomeStrategy::Desert(DesertShaping),
        }
    }

    /// Computes the sample for world tile `(wx, wy)`.
    #[must_use]
    pub fn sample(&self, wx: f64, wy: f64) -> TileSample {
        // The continent field is sampled twice: once for the domain
        // warp, once (warped) for the shape itself.
        let warp = self.continental.sample(wx * WARP_SCALE, wy * WARP_SCALE) * WARP_AMPLITUDE;
        let continental =
            self.continental
                .octave(wx + warp, wy + warp, 4, 0.5, CONTINENT_SCALE);

        let macro_temp = self
            .macro_temperature
            .octave(wx, wy, 2, 0.5, MACRO_CLIMATE_SCALE);
        let macro_moist = self
            .macro_moisture
            .octave(wx, wy, 2, 0.5, MACRO_CLIMATE_SCALE);

        let is_land = continental > SEA_LEVEL;

        let (mut height, desert_score) = if is_land {
            self.land_height(wx, wy, continental, macro_temp, macro_moist)
        } else {
            (self.ocean_height(wx, wy, continental), 0.0)
        };

        let local_t = self
            .local_temperature
            .sample(wx * LOCAL_CLIMATE_SCALE, wy * LOCAL_CLIMATE_SCALE);
        let temperature =
            (macro_temp + 0.05 * local_t - 0.4 * (height - 0.5).max(0.0)).clamp(0.0, 1.0);

        let local_m = self
            .local_moisture
            .sample(wx * LOCAL_CLIMATE_SCALE, wy * LOCAL_CLIMATE_SCALE);
        let mut moisture = macro_moist + 0.05 * local_m;
        if macro_moist < 0.3 {
            moisture = moisture.min(0.42);
        }
        let moisture = moisture.clamp(0.0, 1.0);

        let river = self.carve_river(wx, wy, macro_moist, desert_score, &mut height);
        let height = height.clamp(0.0, 1.0);

        TileSample {
            height,
            temperature,
            moisture,
            river,
            kind: TerrainKind::classify(height, temperature, moisture, river),
        }
    }

    fn ocean_height(&self, wx: f64, wy: f64, continental: f64) -> f64 {
        let factor = continental / SEA_LEVEL;
        let base = 0.1 + 0.28 * factor;
        let ripple = 0.02 * self.local_height.octave(wx, wy, 2, 0.5, 0.02);
        (base + ripple).min(0.39)
    }

    fn land_height(
        &self,
        wx: f64,
        wy: f64,
        continental: f64,
        macro_temp: f64,
        macro_moist: f64,
    ) -> (f64, f64) {
        let land_factor = (continental - SEA_LEVEL) / (1.0 - SEA_LEVEL);

        let desert_score = if macro_temp > 0.55 && macro_moist < 0.45 {
            (1.5 * ((0.45 - macro_moist) / 0.45 + (macro_temp - 0.55) / 0.45) / 2.0).min(1.0)
        } else {
            0.0
        };

        let control = self
            .mountain_control
            .octave(wx, wy, 2, 0.5, MOUNTAIN_CONTROL_SCALE);
        // Suppress peaks on the immediate coastline.
        let mountain_mask = ((control - 0.20) / 0.80).max(0.0).min(land_factor * 5.0);

        let base_land = SEA_LEVEL + 0.02 + 0.1 * land_factor;

        let standard = self.standard.height(
            wx,
            wy,
            base_land,
            mountain_mask,
            &self.local_height,
            &self.mountains,
        );
        let desert = self.desert.height(
            wx,
            wy,
            base_land,
            mountain_mask,
            &self.local_height,
            &self.mountains,
        );

        (
            standard * (1.0 - desert_score) + desert * desert_score,
            desert_score,
        )
    }

    fn carve_river(
        &self,
        wx: f64,
        wy: f64,
        macro_moist: f64,
        desert_score: f64,
        height: &mut f64,
    ) -> bool {
        let shaper = if desert_score > 0.5 {
            &self.desert
        } else {
            &self.standard
        };
        if !shaper.allows_rivers() {
            return false;
        }

        let mut threshold = RIVER_THRESHOLD;
        if macro_moist < 0.35 {
            threshold += 0.1 * (0.35 - macro_moist) / 0.15;
        }
        if threshold >= 1.0 {
            return false;
        }

        let ridge = 1.0 - (self.rivers.octave(wx, wy, 4, 0.5, RIVER_SCALE) - 0.5).abs() * 2.0;
        if ridge < threshold || *height < SEA_LEVEL - 0.02 {
            return false;
        }

        let strength = (ridge - threshold) / (1.0 - threshold);
        *height = (*height - RIVER_DEPTH * strength).max(RIVER_FLOOR);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<(f64, f64)> {
        let mut points = Vec::new();
        for i in -20..20 {
            for j in -20..20 {
                points.push((f64::from(i) * 137.0, f64::from(j) * 113.0));
            }
        }
        points
    }

    #[test]
    fn samples_are_bit_identical_across_instances() {
        let a = TerrainPipeline::new(123_456);
        let b = TerrainPipeline::new(123_456);
        for (x, y) in grid() {
            let sa = a.sample(x, y);
            let sb = b.sample(x, y);
            assert_eq!(sa.height.to_bits(), sb.height.to_bits());
            assert_eq!(sa.temperature.to_bits(), sb.temperature.to_bits());
            assert_eq!(sa.moisture.to_bits(), sb.moisture.to_bits());
            assert_eq!(sa.river, sb.river);
            assert_eq!(sa.kind, sb.kind);
        }
    }

    #[test]
    fn scalars_stay_in_unit_interval() {
        let pipeline = TerrainPipeline::new(-42);
        for (x, y) in grid() {
            let s = pipeline.sample(x, y);
            assert!((0.0..=1.0).contains(&s.height), "height {} at ({x}, {y})", s.height);
            assert!((0.0..=1.0).contains(&s.temperature));
            assert!((0.0..=1.0).contains(&s.moisture));
        }
    }

    #[test]
    fn seeds_produce_distinct_worlds() {
        let a = TerrainPipeline::new(1);
        let b = TerrainPipeline::new(2);
        let mut differs = false;
        for (x, y) in grid() {
            if a.sample(x, y).height.to_bits() != b.sample(x, y).height.to_bits() {
                differs = true;
                break;
            }
        }
        assert!(differs);
    }

    #[test]
    fn ocean_tiles_sit_below_sea_level() {
        let pipeline = TerrainPipeline::new(777);
        for (x, y) in grid() {
            let s = pipeline.sample(x, y);
            if matches!(s.kind, TerrainKind::DeepOcean | TerrainKind::Ocean) {
                assert!(s.height < SEA_LEVEL, "{:?} at height {}", s.kind, s.height);
            }
        }
    }

    #[test]
    fn rivers_never_flood_carved_floor() {
        let pipeline = TerrainPipeline::new(2024);
        for (x, y) in grid() {
            let s = pipeline.sample(x, y);
            if s.river {
                assert!(s.height >= RIVER_FLOOR);
            }
        }
    }

    #[test]
    fn sample_order_is_irrelevant() {
        // The pipeline is stateless; interleaving queries must not
        // change any result.
        let pipeline = TerrainPipeline::new(9);
        let forward: Vec<_> = grid().iter().map(|&(x, y)| pipeline.sample(x, y)).collect();
        let backward: Vec<_> = grid()
            .iter()
            .rev()
            .map(|&(x, y)| pipeline.sample(x, y))
            .collect();
        for (a, b) in forward.iter().zip(backward.iter().rev()) {
            assert_eq!(a, b);
        }
    }
}
