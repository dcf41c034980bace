use std::f64::consts::TAU;
use std::sync::Arc;

use anyhow::Context;
use cgmath::Vector3;

use crate::chunk::ChunkCache;
use crate::config::{
    SceneConfig, FOV_Y_DEGREES, INITIAL_FLAP_FREQUENCY, PHASE_TIME_DIVISOR, TAIL_FREQUENCY,
    VIEWPORT, Z_FAR, Z_NEAR,
};
use crate::dragon::{form_dragon, DragonPose};
use crate::error::GeometryError;
use crate::flight::{Flight, Projection};
use crate::math;
use crate::profiler::{self, Profiler};
use crate::renderer::{DrawTarget, LIGHT_DIRECTION};
use crate::terrain::Terrain;
use crate::texture::TextureAtlas;

/// Phase accumulators for the tail and the wings.
///
/// Phases advance by `frequency * dt_ms / 500` and stay in `[0, 2pi)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationClock {
    tail_phase: f64,
    flap_phase: f64,
    flap_frequency: f64,
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self {
            tail_phase: 0.0,
            flap_phase: 0.0,
            flap_frequency: INITIAL_FLAP_FREQUENCY,
        }
    }
}

impl AnimationClock {
    pub fn advance(&mut self, dt_ms: f64) {
        let step = dt_ms / PHASE_TIME_DIVISOR;
        self.tail_phase = (self.tail_phase + TAIL_FREQUENCY * step).rem_euclid(TAU);
        self.flap_phase = (self.flap_phase + self.flap_frequency * step).rem_euclid(TAU);
    }

    /// Takes effect from the next `advance`; the current phase is kept so
    /// the wings never jump.
    pub fn set_flap_frequency(&mut self, frequency: f64) {
        self.flap_frequency = frequency;
    }

    pub fn flap_frequency(&self) -> f64 {
        self.flap_frequency
    }

    pub fn pose(&self) -> DragonPose {
        DragonPose {
            tail_phase: self.tail_phase as f32,
            flap_phase: self.flap_phase as f32,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// The timestamp did not move forward.
    NonMonotonicTime { dt_ms: f64 },
    /// No usable camera this frame.
    Camera(GeometryError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameSummary {
    pub dt_ms: f64,
    pub chunks_drawn: usize,
    pub terrain_triangles: usize,
    /// Zero when the dragon failed to build this frame.
    pub dragon_triangles: usize,
    pub cached_chunks: usize,
    pub position: Vector3<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// First call: only the clock was started.
    Primed,
    Skipped(SkipReason),
    Rendered(FrameSummary),
}

/// Everything one flight session mutates, advanced only through [`Scene::tick`].
pub struct Scene {
    config: SceneConfig,
    atlas: Arc<TextureAtlas>,
    chunks: ChunkCache,
    flight: Flight,
    clock: AnimationClock,
    projection: Projection,
    last_time_ms: Option<f64>,
    profiler: Option<Profiler>,
}

impl Scene {
    pub fn new(config: SceneConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid scene configuration")?;
        let atlas = Arc::new(TextureAtlas::with_default_regions(config.texture_inset));
        let terrain = Terrain::new(config.seed, config.chunk_divisions, config.max_trees_per_chunk);
        let chunks = ChunkCache::new(terrain, atlas.clone(), config.active_window, config.chunk_lead)
            .with_retain_radius(config.cache_retain_radius);
        let flight = Flight::new(config.seed.rotate_left(17));
        let projection = Projection::new(VIEWPORT.0, VIEWPORT.1, FOV_Y_DEGREES.to_radians(), Z_NEAR, Z_FAR);
        log::info!(
            "scene ready: seed {:#x}, {}x{} chunk window",
            config.seed,
            config.active_window,
            config.active_window
        );
        Ok(Self {
            config,
            atlas,
            chunks,
            flight,
            clock: AnimationClock::default(),
            projection,
            last_time_ms: None,
            profiler: None,
        })
    }

    pub fn with_profiler(mut self, profiler: Profiler) -> Self {
        self.profiler = Some(profiler);
        self
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn flight(&self) -> &Flight {
        &self.flight
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn chunk_cache(&self) -> &ChunkCache {
        &self.chunks
    }

    /// Advances the simulation to `time_ms` and draws the frame.
    ///
    /// Geometry failures are logged and drop the affected mesh only.
    pub fn tick(&mut self, time_ms: f64, target: &mut dyn DrawTarget) -> TickOutcome {
        let Some(last) = self.last_time_ms else {
            self.last_time_ms = Some(time_ms);
            return TickOutcome::Primed;
        };
        let dt_ms = time_ms - last;
        if !(dt_ms > 0.0) {
            log::warn!("skipping tick: time moved by {dt_ms} ms");
            return TickOutcome::Skipped(SkipReason::NonMonotonicTime { dt_ms });
        }
        self.last_time_ms = Some(time_ms);

        let frame = self.profiler.as_ref().map(Profiler::begin_frame);
        let dt = (dt_ms / 1000.0) as f32;

        let flap_frequency = profiler::scope(&frame, "flight", || {
            self.flight.update(time_ms, dt, self.chunks.terrain())
        });
        self.clock.set_flap_frequency(f64::from(flap_frequency));
        self.clock.advance(dt_ms);

        let view = match self.flight.view_matrix(self.config.camera_distance) {
            Ok(view) => view,
            Err(err) => {
                log::warn!("skipping tick: {err}");
                return TickOutcome::Skipped(SkipReason::Camera(err));
            }
        };
        let world = math::multiply(&self.projection.build_matrix(), &view);
        target.begin_frame(&world, LIGHT_DIRECTION);

        let position = self.flight.position;
        let active = profiler::scope(&frame, "terrain", || {
            self.chunks.get_active_chunks(position, self.flight.yaw)
        });
        let mut terrain_triangles = 0;
        for chunk in &active {
            terrain_triangles += chunk.triangle_count();
            target.draw("terrain", &chunk.facets);
        }

        let tilt = self.flight.tilt();
        let model = self.flight.model_matrix(self.config.dragon_scale);
        let pose = self.clock.pose();
        let dragon = profiler::scope(&frame, "dragon", || {
            form_dragon(&pose, &tilt, &self.atlas).and_then(|local| local.transformed(&model, &tilt))
        });
        let dragon_triangles = match dragon {
            Ok(facets) => {
                target.draw("dragon", &facets);
                facets.triangle_count()
            }
            Err(err) => {
                log::warn!("dragon not drawn this frame: {err}");
                0
            }
        };

        TickOutcome::Rendered(FrameSummary {
            dt_ms,
            chunks_drawn: active.len(),
            terrain_triangles,
            dragon_triangles,
            cached_chunks: self.chunks.len(),
            position,
        })
    }

    pub fn finish(&self) {
        if let Some(profiler) = &self.profiler {
            profiler.flush();
        }
        log::info!("scene finished with {} cached chunks", self.chunks.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::FrameRecorder;

    #[test]
    fn clock_wraps_phases() {
        let mut clock = AnimationClock::default();
        clock.advance(500.0 * 7.0);
        let pose = clock.pose();
        assert!((pose.tail_phase as f64 - (7.0 - TAU)).abs() < 1e-5);
        assert!((pose.flap_phase as f64 - (14.0 - 2.0 * TAU)).abs() < 1e-5);
    }

    #[test]
    fn changing_flap_frequency_keeps_phase() {
        let mut clock = AnimationClock::default();
        clock.advance(250.0);
        let before = clock.pose().flap_phase;
        clock.set_flap_frequency(8.0);
        assert_eq!(clock.pose().flap_phase, before);
        clock.advance(50.0);
        assert!((clock.pose().flap_phase - (before + 0.8)).abs() < 1e-5);
    }

    #[test]
    fn first_tick_only_primes() {
        let mut scene = Scene::new(SceneConfig {
            active_window: 2,
            ..SceneConfig::default()
        })
        .unwrap();
        let mut recorder = FrameRecorder::new();
        assert_eq!(scene.tick(1000.0, &mut recorder), TickOutcome::Primed);
        assert_eq!(recorder.frames(), 0);
        assert!(matches!(
            scene.tick(1000.0, &mut recorder),
            TickOutcome::Skipped(SkipReason::NonMonotonicTime { .. })
        ));
        assert!(matches!(scene.tick(1016.0, &mut recorder), TickOutcome::Rendered(_)));
        assert_eq!(recorder.frames(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SceneConfig {
            chunk_divisions: 0,
            ..SceneConfig::default()
        };
        assert!(Scene::new(config).is_err());
    }
}
