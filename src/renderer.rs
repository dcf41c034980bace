//! The narrow seam between geometry and whatever actually draws it.

use crate::geometry::{Facets, Vertex};
use crate::math::Mat4;

pub const LIGHT_DIRECTION: [f32; 3] = [-0.2, -1.0, 0.2];

/// Minimal draw interface a rendering backend implements.
///
/// `begin_frame` receives the combined projection-view matrix and the
/// (unnormalized) light direction; `draw` is called once per mesh.
pub trait DrawTarget {
    fn begin_frame(&mut self, world: &Mat4, light: [f32; 3]);
    fn draw(&mut self, label: &str, facets: &Facets);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub draws: usize,
    pub triangles: usize,
    /// Size of the interleaved vertex data a GPU backend would upload.
    pub upload_bytes: usize,
}

/// Headless target that only counts what it is asked to draw.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    current: FrameStats,
    last_frame: Option<FrameStats>,
    frames: u64,
    world: Option<Mat4>,
    labels: Vec<String>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats of the frame being recorded.
    pub fn current(&self) -> &FrameStats {
        &self.current
    }

    /// Stats of the last completed frame.
    pub fn last_frame(&self) -> Option<&FrameStats> {
        self.last_frame.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn world(&self) -> Option<&Mat4> {
        self.world.as_ref()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl DrawTarget for FrameRecorder {
    fn begin_frame(&mut self, world: &Mat4, _light: [f32; 3]) {
        if self.frames > 0 {
            self.last_frame = Some(std::mem::take(&mut self.current));
        }
        self.frames += 1;
        self.world = Some(*world);
        self.labels.clear();
    }

    fn draw(&mut self, label: &str, facets: &Facets) {
        let vertices = facets.vertices();
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        self.current.draws += 1;
        self.current.triangles += facets.triangle_count();
        self.current.upload_bytes += bytes.len();
        self.labels.push(label.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math;

    #[test]
    fn recorder_counts_draws_and_bytes() {
        let mut facets = Facets::new();
        for _ in 0..6 {
            facets.push_vertex([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2]);
        }
        let mut recorder = FrameRecorder::new();
        recorder.begin_frame(&math::identity(), LIGHT_DIRECTION);
        recorder.draw("chunk", &facets);
        recorder.draw("dragon", &facets);
        assert_eq!(recorder.current().draws, 2);
        assert_eq!(recorder.current().triangles, 4);
        assert_eq!(recorder.current().upload_bytes, 12 * std::mem::size_of::<Vertex>());

        recorder.begin_frame(&math::identity(), LIGHT_DIRECTION);
        assert_eq!(recorder.last_frame().map(|s| s.draws), Some(2));
        assert_eq!(recorder.current().draws, 0);
        assert_eq!(recorder.frames(), 2);
    }
}
