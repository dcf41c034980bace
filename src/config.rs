use anyhow::{bail, Result};

use crate::texture::DEFAULT_REGION_INSET;

pub const DEFAULT_SEED: u64 = 0x5EED_D7A6;

/// Quads per chunk side.
pub const CHUNK_DIVISIONS: usize = 5;
/// Side of the square of chunks drawn around the viewer.
pub const ACTIVE_WINDOW: i32 = 12;
/// How far (in chunks) the window is pushed along the direction of travel.
pub const CHUNK_LEAD: f32 = 5.0;
pub const MAX_TREES_PER_CHUNK: usize = 3;

pub const DRAGON_SCALE: f32 = 0.007;
pub const CAMERA_DISTANCE: f32 = 0.15;

/// Milliseconds per radian of animation phase at unit frequency.
pub const PHASE_TIME_DIVISOR: f64 = 500.0;
/// Tail wag/gait phase speed relative to wall time.
pub const TAIL_FREQUENCY: f64 = 1.0;
pub const INITIAL_FLAP_FREQUENCY: f64 = 2.0;

pub const FOV_Y_DEGREES: f32 = 80.0;
pub const Z_NEAR: f32 = 0.001;
pub const Z_FAR: f32 = 100.0;
pub const VIEWPORT: (u32, u32) = (1280, 720);

#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub seed: u64,
    pub chunk_divisions: usize,
    pub active_window: i32,
    pub chunk_lead: f32,
    /// Chunks further than this from the window centre are dropped from
    /// the cache. `None` keeps every chunk for the whole session.
    pub cache_retain_radius: Option<i32>,
    pub max_trees_per_chunk: usize,
    pub dragon_scale: f32,
    pub camera_distance: f32,
    pub texture_inset: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            chunk_divisions: CHUNK_DIVISIONS,
            active_window: ACTIVE_WINDOW,
            chunk_lead: CHUNK_LEAD,
            cache_retain_radius: None,
            max_trees_per_chunk: MAX_TREES_PER_CHUNK,
            dragon_scale: DRAGON_SCALE,
            camera_distance: CAMERA_DISTANCE,
            texture_inset: DEFAULT_REGION_INSET,
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_divisions == 0 {
            bail!("chunk_divisions must be at least 1");
        }
        if self.active_window <= 0 {
            bail!("active_window must be positive, got {}", self.active_window);
        }
        if !(self.chunk_lead >= 0.0) {
            bail!("chunk_lead must be non-negative, got {}", self.chunk_lead);
        }
        if let Some(radius) = self.cache_retain_radius {
            // the window itself must survive eviction
            let needed = self.active_window / 2;
            if radius < needed {
                bail!("cache_retain_radius {radius} is smaller than the active window reach {needed}");
            }
        }
        if !(self.dragon_scale > 0.0) {
            bail!("dragon_scale must be positive, got {}", self.dragon_scale);
        }
        if !(self.camera_distance > 0.0) {
            bail!("camera_distance must be positive, got {}", self.camera_distance);
        }
        if !(0.0..0.25).contains(&self.texture_inset) {
            bail!("texture_inset must be in [0, 0.25), got {}", self.texture_inset);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SceneConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            SceneConfig {
                chunk_divisions: 0,
                ..SceneConfig::default()
            },
            SceneConfig {
                active_window: 0,
                ..SceneConfig::default()
            },
            SceneConfig {
                chunk_lead: -1.0,
                ..SceneConfig::default()
            },
            SceneConfig {
                dragon_scale: 0.0,
                ..SceneConfig::default()
            },
            SceneConfig {
                cache_retain_radius: Some(2),
                ..SceneConfig::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn retain_radius_covering_the_window_is_accepted() {
        let config = SceneConfig {
            cache_retain_radius: Some(6),
            ..SceneConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
