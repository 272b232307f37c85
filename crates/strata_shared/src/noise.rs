use ::noise::{NoiseFn, Perlin};

use crate::settings::TerrainSettings;

/// Octave Perlin sampler bound to one set of terrain settings.
///
/// Holds no mutable state, so one instance can be shared by reference across
/// workers or built per work item; both give identical samples.
#[derive(Clone)]
pub struct HeightSampler {
    perlin: Perlin,
    settings: TerrainSettings,
}

impl HeightSampler {
    pub fn new(settings: &TerrainSettings) -> Self {
        Self {
            perlin: Perlin::new(settings.seed),
            settings: *settings,
        }
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /// Height at world column `(x, z)`, always within `[low, high]`.
    ///
    /// Octave `k` is weighted by `persistance^k` and sampled at frequency
    /// `2^k / scale`. The weighted sum is normalized by the total weight
    /// before being remapped from `[-1, 1]` into `[low, high]`.
    pub fn sample(&self, x: i32, z: i32) -> f32 {
        let settings = &self.settings;
        let mut total = 0.0f64;
        let mut amplitude = 1.0f64;
        let mut amplitude_sum = 0.0f64;
        let mut frequency = 1.0 / f64::from(settings.scale);

        for _ in 0..settings.iterations {
            let value = self
                .perlin
                .get([f64::from(x) * frequency, f64::from(z) * frequency]);
            total += value * amplitude;
            amplitude_sum += amplitude;
            amplitude *= f64::from(settings.persistance);
            frequency *= 2.0;
        }

        if amplitude_sum == 0.0 {
            return settings.low;
        }

        let normalized = (total / amplitude_sum).clamp(-1.0, 1.0);
        let t = (normalized + 1.0) * 0.5;
        let low = f64::from(settings.low);
        let high = f64::from(settings.high);
        (low + t * (high - low)) as f32
    }
}

/// One-shot form of [`HeightSampler::sample`].
pub fn height(x: i32, z: i32, settings: &TerrainSettings) -> f32 {
    HeightSampler::new(settings).sample(x, z)
}

#[cfg(test)]
mod tests {
    use super::{height, HeightSampler};
    use crate::settings::TerrainSettings;

    fn single_octave() -> TerrainSettings {
        TerrainSettings {
            iterations: 1,
            persistance: 0.5,
            scale: 50.0,
            low: 0.0,
            high: 10.0,
            seed: 0,
        }
    }

    #[test]
    fn identical_inputs_give_identical_heights() {
        let settings = TerrainSettings::default();
        let sampler = HeightSampler::new(&settings);
        for (x, z) in [(0, 0), (17, -3), (-250, 999), (4096, 4096)] {
            let a = sampler.sample(x, z);
            let b = height(x, z, &settings);
            assert_eq!(a.to_bits(), b.to_bits(), "({x}, {z})");
        }
    }

    #[test]
    fn origin_sample_is_the_midpoint_of_the_range() {
        // Perlin noise is zero on lattice points, so (0, 0) remaps to the middle.
        let value = height(0, 0, &single_octave());
        assert!((value - 5.0).abs() < 1e-4, "got {value}");
        assert_eq!(value.floor() as u16, 5);
    }

    #[test]
    fn samples_stay_within_low_and_high() {
        let settings = TerrainSettings {
            iterations: 6,
            low: 12.0,
            high: 40.0,
            ..TerrainSettings::default()
        };
        let sampler = HeightSampler::new(&settings);
        for x in (-512..512).step_by(7) {
            for z in (-512..512).step_by(11) {
                let value = sampler.sample(x, z);
                assert!((12.0..=40.0).contains(&value), "({x}, {z}) -> {value}");
            }
        }
    }

    #[test]
    fn collapsed_range_is_flat() {
        let settings = TerrainSettings {
            low: 0.0,
            high: 0.0,
            ..single_octave()
        };
        for x in -40..40 {
            assert_eq!(height(x, x * 3, &settings), 0.0);
        }
    }

    #[test]
    fn terrain_is_not_constant() {
        let sampler = HeightSampler::new(&TerrainSettings::default());
        let first = sampler.sample(13, 29);
        let varied = (0..200).any(|step| (sampler.sample(13 + step * 5, 29) - first).abs() > 0.5);
        assert!(varied);
    }

    #[test]
    fn seed_changes_the_terrain() {
        let a = HeightSampler::new(&TerrainSettings::default());
        let b = HeightSampler::new(&TerrainSettings {
            seed: 1234,
            ..TerrainSettings::default()
        });
        let differs = (0..100).any(|i| a.sample(i * 7 + 3, i * 5 + 1) != b.sample(i * 7 + 3, i * 5 + 1));
        assert!(differs);
    }
}
