use std::ops::Range;

use glam::IVec2;

use crate::coords::{index_to_cell, region_origin, CELL_SIZE_Y, REGION_AREA};
use crate::noise::HeightSampler;

/// Per-cell terrain heights of one region, indexed by
/// [`cell_to_index`](crate::coords::cell_to_index).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeightField {
    heights: Box<[u16; REGION_AREA]>,
}

impl HeightField {
    pub fn new_flat(height: u16) -> Self {
        Self {
            heights: Box::new([height; REGION_AREA]),
        }
    }

    pub fn get(&self, index: usize) -> u16 {
        self.heights[index]
    }

    pub fn as_slice(&self) -> &[u16] {
        self.heights.as_slice()
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn max_height(&self) -> u16 {
        self.heights.iter().copied().max().unwrap_or(0)
    }
}

/// Samples every cell of `region` and returns the field with its highest value.
///
/// Samples are floored and stored as `u16`; `as` saturates, so a sample outside
/// the `u16` range cannot wrap.
pub fn build_height_map(region: IVec2, sampler: &HeightSampler) -> (HeightField, u16) {
    let origin = region_origin(region);
    let mut field = HeightField::new_flat(0);
    let mut highest = 0u16;

    for (index, slot) in field.heights.iter_mut().enumerate() {
        let world = origin + index_to_cell(index);
        let value = sampler.sample(world.x, world.y).floor() as u16;
        *slot = value;
        highest = highest.max(value);
    }

    (field, highest)
}

/// Vertical chunk layers needed to hold terrain up to `max_height`.
///
/// Empty for a flat region at height zero; otherwise `0..=max_height / CELL_SIZE_Y`.
pub fn chunk_layers(max_height: u16) -> Range<i32> {
    if max_height == 0 {
        return 0..0;
    }
    0..i32::from(max_height) / CELL_SIZE_Y + 1
}

#[cfg(test)]
mod tests {
    use glam::IVec2;

    use super::{build_height_map, chunk_layers};
    use crate::coords::{index_to_cell, region_origin, CELL_SIZE_Y, REGION_AREA};
    use crate::noise::{height, HeightSampler};
    use crate::settings::TerrainSettings;

    #[test]
    fn every_cell_matches_the_floored_noise_sample() {
        let settings = TerrainSettings {
            iterations: 3,
            high: 90.0,
            ..TerrainSettings::default()
        };
        let region = IVec2::new(-3, 5);
        let (field, highest) = build_height_map(region, &HeightSampler::new(&settings));

        assert_eq!(field.len(), REGION_AREA);
        let origin = region_origin(region);
        for index in 0..REGION_AREA {
            let world = origin + index_to_cell(index);
            let expected = height(world.x, world.y, &settings).floor() as u16;
            assert_eq!(field.get(index), expected, "cell {index}");
        }
        assert_eq!(highest, field.max_height());
    }

    #[test]
    fn flat_settings_give_an_all_zero_field() {
        let settings = TerrainSettings {
            iterations: 1,
            low: 0.0,
            high: 0.0,
            ..TerrainSettings::default()
        };
        let (field, highest) = build_height_map(IVec2::ZERO, &HeightSampler::new(&settings));

        assert_eq!(highest, 0);
        assert_eq!(field.as_slice(), &[0u16; REGION_AREA][..]);
        assert!(chunk_layers(highest).is_empty());
    }

    #[test]
    fn origin_region_single_octave_scenario() {
        let settings = TerrainSettings {
            iterations: 1,
            persistance: 0.5,
            scale: 50.0,
            low: 0.0,
            high: 10.0,
            seed: 0,
        };
        let (field, highest) = build_height_map(IVec2::ZERO, &HeightSampler::new(&settings));

        assert_eq!(field.get(0), 5);
        assert!(highest <= 10);
        // Any max below one layer's height needs exactly the ground layer.
        assert_eq!(chunk_layers(highest), 0..1);
    }

    #[test]
    fn layer_count_is_max_over_cell_size_plus_one() {
        assert!(chunk_layers(0).is_empty());
        assert_eq!(chunk_layers(1), 0..1);
        assert_eq!(chunk_layers(7), 0..1);
        assert_eq!(chunk_layers(CELL_SIZE_Y as u16 - 1), 0..1);
        assert_eq!(chunk_layers(CELL_SIZE_Y as u16), 0..2);
        assert_eq!(chunk_layers(100).len(), 100 / CELL_SIZE_Y as usize + 1);
        assert_eq!(chunk_layers(u16::MAX).end, i32::from(u16::MAX) / CELL_SIZE_Y + 1);
    }

    #[test]
    fn neighbouring_regions_sample_disjoint_world_columns() {
        let settings = TerrainSettings::default();
        let sampler = HeightSampler::new(&settings);
        let (left, _) = build_height_map(IVec2::new(0, 0), &sampler);
        let (right, _) = build_height_map(IVec2::new(1, 0), &sampler);

        // Column x = 16 is the first column of the right region.
        let expected = height(16, 0, &settings).floor() as u16;
        assert_eq!(right.get(0), expected);
        assert_ne!(left.as_slice(), right.as_slice());
    }
}
