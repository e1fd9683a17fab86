use fastnoise_lite::{FastNoiseLite, NoiseType};

use crate::config::Height;

/// Height oracle sampled by the patch mesher.
///
/// Implementations must be deterministic: neighboring patches sample the same
/// world coordinates and rely on getting identical heights back.
pub trait ElevationSource: Send + Sync {
    fn elevation(&self, x: f32, z: f32) -> f32;
}

impl<F> ElevationSource for F
where
    F: Fn(f32, f32) -> f32 + Send + Sync,
{
    #[inline]
    fn elevation(&self, x: f32, z: f32) -> f32 {
        self(x, z)
    }
}

/// Default elevation: OpenSimplex2 octaves summed into fractal noise.
pub struct NoiseElevation {
    terrain: FastNoiseLite,
    params: Height,
}

impl NoiseElevation {
    pub fn new(params: &Height) -> Self {
        let mut terrain = FastNoiseLite::with_seed(params.seed);
        terrain.set_noise_type(Some(NoiseType::OpenSimplex2));
        terrain.set_frequency(Some(params.frequency));
        Self {
            terrain,
            params: params.clone(),
        }
    }

    pub fn params(&self) -> &Height {
        &self.params
    }
}

impl Default for NoiseElevation {
    fn default() -> Self {
        Self::new(&Height::default())
    }
}

impl ElevationSource for NoiseElevation {
    fn elevation(&self, x: f32, z: f32) -> f32 {
        let p = &self.params;
        let mut sum = 0.0f32;
        let mut amp = 1.0f32;
        let mut freq = 1.0f32;
        let mut norm = 0.0f32;
        for _ in 0..p.octaves.max(1) {
            sum += self.terrain.get_noise_2d(x * freq, z * freq) * amp;
            norm += amp;
            amp *= p.persistence;
            freq *= p.lacunarity;
        }
        let n = if norm > 0.0 { sum / norm } else { 0.0 };
        p.base + n * p.amplitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_sources() {
        let ramp = |x: f32, z: f32| x + 2.0 * z;
        assert_eq!(ramp.elevation(1.0, 3.0), 7.0);
    }

    #[test]
    fn noise_is_deterministic() {
        let a = NoiseElevation::default();
        let b = NoiseElevation::default();
        for i in 0..32 {
            let x = i as f32 * 0.37 - 5.0;
            let z = i as f32 * -1.13 + 2.0;
            assert_eq!(a.elevation(x, z), b.elevation(x, z));
            assert_eq!(a.elevation(x, z), a.elevation(x, z));
        }
    }

    #[test]
    fn noise_stays_within_amplitude() {
        let params = Height {
            base: 10.0,
            amplitude: 3.0,
            ..Height::default()
        };
        let src = NoiseElevation::new(&params);
        for i in 0..64 {
            let h = src.elevation(i as f32 * 1.7, i as f32 * -0.9);
            assert!(h.is_finite());
            assert!((h - 10.0).abs() <= 3.0 + 1e-3, "h={h}");
        }
    }

    #[test]
    fn seed_changes_the_field() {
        let a = NoiseElevation::default();
        let b = NoiseElevation::new(&Height {
            seed: 99,
            ..Height::default()
        });
        let differs = (0..16).any(|i| {
            let x = i as f32 * 3.1;
            a.elevation(x, -x) != b.elevation(x, -x)
        });
        assert!(differs);
    }
}
