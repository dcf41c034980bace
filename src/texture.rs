use std::collections::HashMap;

use crate::error::{GeometryError, Result};

/// Default border trimmed off every region so mip filtering does not bleed
/// neighbouring tiles into each other.
pub const DEFAULT_REGION_INSET: f32 = 0.01;

pub const REGION_LAVA: &str = "lava";
pub const REGION_SCALES: &str = "scales";
pub const REGION_RASPBERRY_SCALES: &str = "raspberry_scales";
pub const REGION_BLACK: &str = "black";
pub const REGION_BARK: &str = "bark";
pub const REGION_GRASS: &str = "grass";

// (name, min corner, max corner), measured from the top left of the image.
const DEFAULT_REGIONS: &[(&str, [f32; 2], [f32; 2])] = &[
    (REGION_LAVA, [0.0, 0.0], [0.5, 0.5]),
    (REGION_SCALES, [0.0, 0.5], [0.125, 0.625]),
    (REGION_RASPBERRY_SCALES, [0.5, 0.5], [1.0, 1.0]),
    (REGION_BLACK, [0.25, 0.75], [0.25, 0.75]),
    (REGION_BARK, [0.5, 0.0], [1.0, 0.5]),
    (REGION_GRASS, [0.25, 0.5], [0.5, 0.75]),
];

/// A named rectangle of the shared atlas image, already shrunk by the inset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasRegion {
    min: [f32; 2],
    max: [f32; 2],
}

impl AtlasRegion {
    pub fn new(min: [f32; 2], max: [f32; 2], inset: f32) -> Self {
        let mut region = Self { min, max };
        for axis in 0..2 {
            if max[axis] - min[axis] > 2.0 * inset {
                region.min[axis] = min[axis] + inset;
                region.max[axis] = max[axis] - inset;
            } else {
                // too thin to trim, sample its centre line
                let mid = (min[axis] + max[axis]) * 0.5;
                region.min[axis] = mid;
                region.max[axis] = mid;
            }
        }
        region
    }

    /// Maps a region-local coordinate into atlas space. Components past 1
    /// wrap around before mapping.
    pub fn map(&self, local: [f32; 2]) -> [f32; 2] {
        let wrap = |c: f32| if c > 1.0 { c % 1.0 } else { c };
        let u = wrap(local[0]);
        let v = wrap(local[1]);
        [
            self.min[0] + u * (self.max[0] - self.min[0]),
            self.min[1] + v * (self.max[1] - self.min[1]),
        ]
    }

    pub fn min(&self) -> [f32; 2] {
        self.min
    }

    pub fn max(&self) -> [f32; 2] {
        self.max
    }
}

/// Configuration table of named atlas regions.
#[derive(Clone, Debug)]
pub struct TextureAtlas {
    regions: HashMap<String, AtlasRegion>,
    inset: f32,
}

impl TextureAtlas {
    pub fn new(inset: f32) -> Self {
        Self {
            regions: HashMap::new(),
            inset,
        }
    }

    pub fn with_default_regions(inset: f32) -> Self {
        let mut atlas = Self::new(inset);
        for (name, min, max) in DEFAULT_REGIONS {
            atlas.insert(name, *min, *max);
        }
        atlas
    }

    pub fn insert(&mut self, name: &str, min: [f32; 2], max: [f32; 2]) {
        self.regions
            .insert(name.to_owned(), AtlasRegion::new(min, max, self.inset));
    }

    pub fn region(&self, name: &str) -> Result<AtlasRegion> {
        self.regions
            .get(name)
            .copied()
            .ok_or_else(|| GeometryError::UnknownRegion(name.to_owned()))
    }

    pub fn texcoord(&self, name: &str, local: [f32; 2]) -> Result<[f32; 2]> {
        Ok(self.region(name)?.map(local))
    }
}

impl Default for TextureAtlas {
    fn default() -> Self {
        Self::with_default_regions(DEFAULT_REGION_INSET)
    }
}
