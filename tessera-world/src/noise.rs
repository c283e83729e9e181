//! Seeded gradient noise.

use tessera_utils::random::LegacyRandom;

/// Inverse square root of two; the diagonal gradients are unit length.
const DIAG: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// The eight unit gradient vectors, selected by the low bits of the
/// hashed lattice corner.
const GRADIENTS: [(f64, f64); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (DIAG, DIAG),
    (-DIAG, DIAG),
    (DIAG, -DIAG),
    (-DIAG, -DIAG),
];

/// A deterministic 2D gradient-noise field.
///
/// The permutation table is a Fisher–Yates shuffle of `0..256` driven
/// by [`LegacyRandom`], duplicated to 512 entries so corner hashing
/// never wraps.
pub struct NoiseField {
    perm: [u8; 512],
}

impl NoiseField {
    /// Builds the field for the given seed.
    #[must_use]
    pub fn new(seed: i64) -> Self {
        let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut rng = LegacyRandom::from_seed(seed as u64);
        for i in (1..256usize).rev() {
            let j = rng.next_i32_bounded(i as i32 + 1) as usize;
            table.swap(i, j);
        }

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i & 255];
        }
        Self { perm }
    }

    #[inline]
    fn gradient(&self, hash: u8, dx: f64, dy: f64) -> f64 {
        let (gx, gy) = GRADIENTS[(hash & 7) as usize];
        gx * dx + gy * dy
    }

    /// The quintic fade `6t^5 - 15t^4 + 10t^3`.
    #[inline]
    fn fade(t: f64) -> f64 {
        t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
    }

    #[inline]
    fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + t * (b - a)
    }

    /// Evaluates the field at `(x, y)`. Deterministic in (seed, x, y);
    /// the result lies in `[-1, 1]`.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let xf = x.floor();
        let yf = y.floor();
        let xi = (xf as i64 & 255) as usize;
        let yi = (yf as i64 & 255) as usize;
        let dx = x - xf;
        let dy = y - yf;

        let u = Self::fade(dx);
        let v = Self::fade(dy);

        let a = self.perm[xi] as usize + yi;
        let b = self.perm[xi + 1] as usize + yi;

        let aa = self.perm[a];
        let ab = self.perm[a + 1];
        let ba = self.perm[b];
        let bb = self.perm[b + 1];

        let x1 = Self::lerp(
            self.gradient(aa, dx, dy),
            self.gradient(ba, dx - 1.0, dy),
            u,
        );
        let x2 = Self::lerp(
            self.gradient(ab, dx, dy - 1.0),
            self.gradient(bb, dx - 1.0, dy - 1.0),
            u,
        );
        Self::lerp(x1, x2, v)
    }

    /// Sums `octaves` frequencies starting at `scale`, doubling the
    /// frequency and multiplying the amplitude by `persistence` each
    /// step, normalized by the amplitude sum and mapped to `[0, 1]`.
    #[must_use]
    pub fn octave(&self, x: f64, y: f64, octaves: u32, persistence: f64, scale: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = scale;
        let mut amplitude_sum = 0.0;

        for _ in 0..octaves {
            total += self.sample(x * frequency, y * frequency) * amplitude;
            amplitude_sum += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        ((total / amplitude_sum + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}
