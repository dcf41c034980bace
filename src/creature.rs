//! Articulated creatures assembled from tube parts.
//!
//! A part is one tube plus its placement. Dependent parts (legs, wings)
//! get their translation by sampling a position along an earlier part, so
//! the reference part has to be defined first.

use std::fmt;
use std::sync::Arc;

use cgmath::Vector3;

use crate::error::{GeometryError, Result};
use crate::geometry::Facets;
use crate::math::{self, Mat4};
use crate::texture::{AtlasRegion, TextureAtlas};
use crate::tube::{self, CrossSection, TubeStep};

pub type StepGenerator = Arc<dyn Fn(f32) -> Vec<TubeStep> + Send + Sync>;

/// Either a fixed step list or a function of the animation phase.
#[derive(Clone)]
pub enum StepSource {
    Static(Vec<TubeStep>),
    Generated(StepGenerator),
}

impl StepSource {
    pub fn generated<F>(generator: F) -> Self
    where
        F: Fn(f32) -> Vec<TubeStep> + Send + Sync + 'static,
    {
        StepSource::Generated(Arc::new(generator))
    }

    pub fn resolve(&self, phase: f32) -> Vec<TubeStep> {
        match self {
            StepSource::Static(steps) => steps.clone(),
            StepSource::Generated(generator) => generator(phase),
        }
    }
}

impl fmt::Debug for StepSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepSource::Static(steps) => f.debug_tuple("Static").field(&steps.len()).finish(),
            StepSource::Generated(_) => f.write_str("Generated(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Part {
    pub name: &'static str,
    pub cross_section: CrossSection,
    pub steps: StepSource,
    /// Negate local x, turning a left limb into a right one.
    pub mirror: bool,
    /// (rx, ry, rz) applied twist, pitch, yaw.
    pub orientation: Vector3<f32>,
    pub translation: Vector3<f32>,
    pub region: &'static str,
}

impl Part {
    pub fn new(
        name: &'static str,
        cross_section: CrossSection,
        steps: StepSource,
        region: &'static str,
    ) -> Self {
        Self {
            name,
            cross_section,
            steps,
            mirror: false,
            orientation: Vector3::new(0.0, 0.0, 0.0),
            translation: Vector3::new(0.0, 0.0, 0.0),
            region,
        }
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_orientation(mut self, orientation: [f32; 3]) -> Self {
        self.orientation = Vector3::from(orientation);
        self
    }

    pub fn with_translation(mut self, translation: Vector3<f32>) -> Self {
        self.translation = translation;
        self
    }

    pub fn placement_rotation(&self) -> Mat4 {
        math::rotation_twist_pitch_yaw(self.orientation) * math::mirror_x(self.mirror)
    }

    pub fn placement(&self) -> Mat4 {
        math::translation(self.translation) * self.placement_rotation()
    }
}

/// Position `fraction` of the way along `part`, in creature space.
///
/// Integrates the first `floor(fraction * step_count)` steps with the same
/// frame integrator the extrusion uses, then applies the part placement.
pub fn sample_position_along_part(
    part: &Part,
    fraction: f32,
    phase: f32,
    frame_override: Option<&Mat4>,
) -> Result<Vector3<f32>> {
    let steps = part.steps.resolve(phase);
    let count = ((fraction.max(0.0) * steps.len() as f32).floor() as usize).min(steps.len());
    let local = tube::position_after(&steps, count, frame_override)?;
    Ok(part.translation + math::apply_direction(&part.placement_rotation(), local))
}

/// Per-frame assembly state: the shared "down" frame and the phase every
/// generator sees this frame.
#[derive(Clone, Debug)]
pub struct Assembly {
    down: Mat4,
    phase: f32,
}

impl Assembly {
    /// `tilt` is the creature's world rotation; default-frame steps cancel
    /// it so they always start pointing straight down in the world.
    pub fn new(tilt: &Mat4, phase: f32) -> Result<Self> {
        let down = math::inverse(tilt)? * math::rotation_x(std::f32::consts::FRAC_PI_2);
        Ok(Self { down, phase })
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn frame_override(&self, part: &Part) -> Result<Mat4> {
        Ok(math::inverse(&part.placement_rotation())? * self.down)
    }

    pub fn sample_position_along_part(&self, part: &Part, fraction: f32) -> Result<Vector3<f32>> {
        let frame = self.frame_override(part)?;
        sample_position_along_part(part, fraction, self.phase, Some(&frame))
    }

    /// Extrudes the part and moves it into creature space.
    pub fn extrude_part(&self, part: &Part, atlas: &TextureAtlas) -> Result<Facets> {
        let frame = self.frame_override(part)?;
        let region = atlas.region(part.region)?;
        let steps = part.steps.resolve(self.phase);
        let local = tube::extrude(&part.cross_section, &steps, Some(&frame), &region)?;
        let mut placed = local.transformed(&part.placement(), &part.placement_rotation())?;
        if part.mirror {
            placed.flip_winding();
        }
        Ok(placed)
    }

    /// Triangle fan from the root of `part` to `samples` points along it.
    pub fn membrane_fan(&self, part: &Part, samples: usize, region: &AtlasRegion) -> Result<Facets> {
        let mut facets = Facets::with_capacity(samples * 3);
        let root: [f32; 3] = self.sample_position_along_part(part, 0.0)?.into();
        let up = [0.0, 1.0, 0.0];
        for i in 0..samples {
            let t0 = i as f32 / samples as f32;
            let t1 = (i + 1) as f32 / samples as f32;
            let a: [f32; 3] = self.sample_position_along_part(part, t0)?.into();
            let b: [f32; 3] = self.sample_position_along_part(part, t1)?.into();
            facets.push_vertex(root, up, region.map([0.0, 0.0]));
            facets.push_vertex(a, up, region.map([t0, 1.0]));
            facets.push_vertex(b, up, region.map([t1, 1.0]));
        }
        Ok(facets)
    }
}

#[derive(Clone, Debug)]
struct Membrane {
    part: usize,
    samples: usize,
    region: &'static str,
}

/// A set of parts (plus membranes stretched along some of them) that is
/// turned into one facets buffer per frame.
#[derive(Clone, Debug, Default)]
pub struct Creature {
    parts: Vec<Part>,
    membranes: Vec<Membrane>,
}

impl Creature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_part(&mut self, part: Part) -> usize {
        self.parts.push(part);
        self.parts.len() - 1
    }

    /// Stretches a membrane along an already added part.
    pub fn add_membrane(&mut self, part: usize, samples: usize, region: &'static str) -> Result<()> {
        if part >= self.parts.len() {
            return Err(GeometryError::UnknownPart { index: part });
        }
        self.membranes.push(Membrane {
            part,
            samples,
            region,
        });
        Ok(())
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }

    pub fn facets(&self, assembly: &Assembly, atlas: &TextureAtlas) -> Result<Facets> {
        let mut facets = Facets::new();
        for part in &self.parts {
            facets.append(assembly.extrude_part(part, atlas)?);
        }
        for membrane in &self.membranes {
            let part = self
                .parts
                .get(membrane.part)
                .ok_or(GeometryError::UnknownPart { index: membrane.part })?;
            let region = atlas.region(membrane.region)?;
            facets.append(assembly.membrane_fan(part, membrane.samples, &region)?);
        }
        Ok(facets)
    }
}
