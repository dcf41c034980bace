//! Tube extrusion: sweep a 2D cross-section along a chain of steps.
//!
//! Every step turns the running frame, scales it and moves forward along
//! the turned local z. Each step leaves a copy of the cross-section (a
//! segment) behind; consecutive segments are then hulled into triangles.
//! Output is in the tube's own frame, starting at the origin.

use cgmath::{Vector3, Vector4};

use crate::error::{GeometryError, Result};
use crate::geometry::Facets;
use crate::math::{self, Mat4};
use crate::texture::AtlasRegion;

/// Closed polygon in the local XY plane.
///
/// Normals are taken radially from the origin, so the origin should sit
/// roughly inside the polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossSection {
    points: Vec<[f32; 2]>,
}

impl CrossSection {
    pub fn new(points: Vec<[f32; 2]>) -> Result<Self> {
        if points.len() < 3 {
            return Err(GeometryError::DegenerateCrossSection {
                points: points.len(),
            });
        }
        Ok(Self { points })
    }

    /// Regular polygon centred on the origin, first vertex on +x.
    pub fn regular(sides: usize, radius: f32) -> Result<Self> {
        let points = (0..sides)
            .map(|i| {
                let angle = std::f32::consts::TAU * i as f32 / sides as f32;
                [radius * angle.cos(), radius * angle.sin()]
            })
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[[f32; 2]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepRotation {
    /// Incremental (rx, ry, rz) composed onto the running frame.
    Euler(Vector3<f32>),
    /// Replace the running frame with the caller's override frame.
    DefaultFrame,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TubeStep {
    pub length: f32,
    pub rotation: StepRotation,
    pub scale: f32,
}

impl TubeStep {
    pub fn new(length: f32, rotation: [f32; 3], scale: f32) -> Self {
        Self {
            length,
            rotation: StepRotation::Euler(Vector3::from(rotation)),
            scale,
        }
    }

    pub fn straight(length: f32, scale: f32) -> Self {
        Self::new(length, [0.0, 0.0, 0.0], scale)
    }

    pub fn default_frame(length: f32, scale: f32) -> Self {
        Self {
            length,
            rotation: StepRotation::DefaultFrame,
            scale,
        }
    }

    fn is_valid(&self) -> bool {
        self.length.is_finite() && self.length >= 0.0 && self.scale.is_finite() && self.scale >= 0.0
    }
}

/// Rejects steps that would run the tube backwards or turn it inside out.
pub fn validate_steps(steps: &[TubeStep]) -> Result<()> {
    match steps.iter().position(|step| !step.is_valid()) {
        Some(index) => Err(GeometryError::InvalidStep {
            index,
            length: steps[index].length,
            scale: steps[index].scale,
        }),
        None => Ok(()),
    }
}

/// One materialised copy of the cross-section along the tube.
#[derive(Clone, Debug)]
pub struct Segment {
    pub points: Vec<Vector4<f32>>,
    pub normals: Vec<Vector3<f32>>,
    /// Arc length from the start of the tube.
    pub position_on_tube: f32,
}

/// Running frame shared by extrusion and position sampling, so both land
/// on exactly the same numbers.
#[derive(Clone, Debug)]
pub struct FrameIntegrator<'a> {
    rotation: Mat4,
    scale: f32,
    position: Vector3<f32>,
    arc_length: f32,
    frame_override: Option<&'a Mat4>,
}

impl<'a> FrameIntegrator<'a> {
    pub fn new(frame_override: Option<&'a Mat4>) -> Self {
        Self {
            rotation: math::identity(),
            scale: 1.0,
            position: Vector3::new(0.0, 0.0, 0.0),
            arc_length: 0.0,
            frame_override,
        }
    }

    pub fn advance(&mut self, step: &TubeStep) {
        self.rotation = match step.rotation {
            StepRotation::Euler(angles) => math::rotation_twist_pitch_yaw(angles) * self.rotation,
            StepRotation::DefaultFrame => self.frame_override.copied().unwrap_or_else(math::identity),
        };
        self.scale *= step.scale;
        self.position += math::apply_direction(&self.rotation, Vector3::new(0.0, 0.0, step.length));
        self.arc_length += step.length;
    }

    pub fn rotation(&self) -> &Mat4 {
        &self.rotation
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn arc_length(&self) -> f32 {
        self.arc_length
    }

    /// translate(position) * scale * rotation
    pub fn segment_transform(&self) -> Mat4 {
        math::multiply_many(&[
            math::translation(self.position),
            math::scale(self.scale),
            self.rotation,
        ])
    }
}

/// Position reached after integrating the first `count` steps.
pub fn position_after(
    steps: &[TubeStep],
    count: usize,
    frame_override: Option<&Mat4>,
) -> Result<Vector3<f32>> {
    let steps = &steps[..count.min(steps.len())];
    validate_steps(steps)?;
    let mut frame = FrameIntegrator::new(frame_override);
    for step in steps {
        frame.advance(step);
    }
    Ok(frame.position())
}

pub fn build_segments(
    cross_section: &CrossSection,
    steps: &[TubeStep],
    frame_override: Option<&Mat4>,
) -> Vec<Segment> {
    let base_points: Vec<Vector4<f32>> = cross_section
        .points()
        .iter()
        .map(|p| Vector4::new(p[0], p[1], 0.0, 1.0))
        .collect();
    let base_normals: Vec<Vector3<f32>> = cross_section
        .points()
        .iter()
        .map(|p| Vector3::new(p[0], p[1], 0.0))
        .collect();

    let mut segments = Vec::with_capacity(steps.len() + 1);
    segments.push(Segment {
        points: base_points.clone(),
        normals: base_normals.clone(),
        position_on_tube: 0.0,
    });

    let mut frame = FrameIntegrator::new(frame_override);
    for step in steps {
        frame.advance(step);
        let transform = frame.segment_transform();
        segments.push(Segment {
            points: base_points.iter().map(|p| math::apply(&transform, *p)).collect(),
            normals: base_normals
                .iter()
                .map(|n| math::apply_direction(frame.rotation(), *n))
                .collect(),
            position_on_tube: frame.arc_length(),
        });
    }
    segments
}

/// Triangulates the band between two segments into `out`.
///
/// `tube_fraction` is how far along the tube `a` sits and
/// `interval_fraction` the gap to `b`, both as fractions of total length.
pub fn hull_segments(
    a: &Segment,
    b: &Segment,
    tube_fraction: f32,
    interval_fraction: f32,
    region: &AtlasRegion,
    out: &mut Facets,
) -> Result<()> {
    for seg in [a, b] {
        if seg.points.len() != seg.normals.len() {
            return Err(GeometryError::NormalCountMismatch {
                points: seg.points.len(),
                normals: seg.normals.len(),
            });
        }
    }
    if a.points.len() != b.points.len() {
        return Err(GeometryError::SegmentSizeMismatch {
            a: a.points.len(),
            b: b.points.len(),
        });
    }
    let n = a.points.len();
    if n < 3 {
        return Err(GeometryError::DegenerateCrossSection { points: n });
    }

    let circum_interval = 1.0 / n as f32;
    for i in 0..n {
        let circum = i as f32 / n as f32;
        let ni = (i + 1) % n;
        let corners = [
            (a, i, [0.0, 0.0]),
            (a, ni, [1.0, 0.0]),
            (b, i, [0.0, 1.0]),
            (b, i, [0.0, 1.0]),
            (a, ni, [1.0, 0.0]),
            (b, ni, [1.0, 1.0]),
        ];
        for (seg, idx, offset) in corners {
            let position = math::flatten(seg.points[idx])?;
            let uv = region.map([
                circum + circum_interval * offset[0],
                1.0 - (tube_fraction + offset[1] * interval_fraction),
            ]);
            out.push_vertex(position, seg.normals[idx].into(), uv);
        }
    }
    Ok(())
}

/// Extrudes `cross_section` along `steps` into a closed tube.
///
/// An empty step list yields a single segment and therefore no triangles.
pub fn extrude(
    cross_section: &CrossSection,
    steps: &[TubeStep],
    frame_override: Option<&Mat4>,
    region: &AtlasRegion,
) -> Result<Facets> {
    if steps.is_empty() {
        return Ok(Facets::new());
    }
    validate_steps(steps)?;
    let segments = build_segments(cross_section, steps, frame_override);
    let total_length = segments
        .last()
        .map(|s| s.position_on_tube)
        .unwrap_or_default();
    if !(total_length.is_finite() && total_length > 0.0) {
        return Err(GeometryError::ZeroLengthTube);
    }

    let mut facets = Facets::with_capacity(6 * cross_section.len() * steps.len());
    for pair in segments.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        hull_segments(
            a,
            b,
            a.position_on_tube / total_length,
            (b.position_on_tube - a.position_on_tube) / total_length,
            region,
            &mut facets,
        )?;
    }
    Ok(facets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    fn unit_square() -> CrossSection {
        CrossSection::new(vec![[-1.0, -1.0], [-1.0, 1.0], [1.0, 1.0], [1.0, -1.0]]).unwrap()
    }

    fn full_region() -> AtlasRegion {
        AtlasRegion::new([0.0, 0.0], [1.0, 1.0], 0.0)
    }

    fn wiggly_steps() -> Vec<TubeStep> {
        vec![
            TubeStep::new(0.5, [0.1, 0.0, 0.2], 1.2),
            TubeStep::new(1.0, [0.0, -0.3, 0.0], 0.9),
            TubeStep::default_frame(0.25, 1.0),
            TubeStep::new(0.0, [0.4, 0.4, 0.4], 1.0),
            TubeStep::new(2.0, [-0.2, 0.1, 0.0], 0.0),
        ]
    }

    #[test]
    fn empty_step_list_gives_no_triangles() {
        let facets = extrude(&unit_square(), &[], None, &full_region()).unwrap();
        assert!(facets.is_empty());
        assert_eq!(build_segments(&unit_square(), &[], None).len(), 1);
    }

    #[test]
    fn triangle_count_is_two_per_edge_per_band() {
        let cs = CrossSection::regular(7, 0.5).unwrap();
        let steps = wiggly_steps();
        let facets = extrude(&cs, &steps, None, &full_region()).unwrap();
        let segments = steps.len() + 1;
        assert_eq!(facets.triangle_count(), 2 * (segments - 1) * cs.len());
    }

    #[test]
    fn arc_length_is_monotonic_and_sums_steps() {
        let steps = wiggly_steps();
        let segments = build_segments(&unit_square(), &steps, None);
        for pair in segments.windows(2) {
            assert!(pair[1].position_on_tube >= pair[0].position_on_tube);
        }
        let total: f32 = steps.iter().map(|s| s.length).sum();
        assert!((segments.last().unwrap().position_on_tube - total).abs() < 1e-6);
    }

    #[test]
    fn unit_square_single_step_forms_a_box_band() {
        let steps = [TubeStep::straight(1.0, 1.0)];
        let segments = build_segments(&unit_square(), &steps, None);
        assert_eq!(segments.len(), 2);
        let facets = extrude(&unit_square(), &steps, None, &full_region()).unwrap();
        assert_eq!(facets.triangle_count(), 8);
        for p in facets.positions() {
            assert!(p[2] == 0.0 || (p[2] - 1.0).abs() < 1e-6, "z off the end faces: {p:?}");
            assert!((p[0].abs() - 1.0).abs() < 1e-6);
            assert!((p[1].abs() - 1.0).abs() < 1e-6);
        }
        let far: Vec<_> = segments[1].points.iter().map(|p| [p.x, p.y]).collect();
        let near: Vec<_> = segments[0].points.iter().map(|p| [p.x, p.y]).collect();
        assert_eq!(far, near);
    }

    #[test]
    fn texcoords_run_from_far_end() {
        let steps = [TubeStep::straight(1.0, 1.0), TubeStep::straight(3.0, 1.0)];
        let facets = extrude(&unit_square(), &steps, None, &full_region()).unwrap();
        // first triangle starts at the tube root: v = 1
        assert_eq!(facets.texcoords()[0], [0.0, 1.0]);
        // third vertex is on the second segment, a quarter of the way along
        assert!((facets.texcoords()[2][1] - 0.75).abs() < 1e-6);
        let v_min = facets
            .texcoords()
            .iter()
            .map(|uv| uv[1])
            .fold(f32::INFINITY, f32::min);
        assert!(v_min.abs() < 1e-6);
    }

    #[test]
    fn default_frame_substitutes_the_override() {
        let down = math::rotation_x(std::f32::consts::FRAC_PI_2);
        let steps = [TubeStep::default_frame(1.0, 1.0)];
        let end = position_after(&steps, 1, Some(&down)).unwrap();
        assert!((end - Vector3::new(0.0, -1.0, 0.0)).magnitude() < 1e-6);
        let without = position_after(&steps, 1, None).unwrap();
        assert!((without - Vector3::new(0.0, 0.0, 1.0)).magnitude() < 1e-6);
    }

    #[test]
    fn scale_accumulates_across_steps() {
        let steps = [TubeStep::straight(1.0, 2.0), TubeStep::straight(1.0, 1.5)];
        let segments = build_segments(&unit_square(), &steps, None);
        assert!((segments[2].points[2].x - 3.0).abs() < 1e-6);
        assert!((segments[2].points[2].z - 2.0).abs() < 1e-6);
        // normals only rotate
        assert_eq!(segments[2].normals[2], Vector3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn sampled_position_matches_segment_centre() {
        let steps = wiggly_steps();
        let segments = build_segments(&unit_square(), &steps, None);
        for count in 0..=steps.len() {
            let centre = segments[count]
                .points
                .iter()
                .fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + p.truncate())
                / 4.0;
            let sampled = position_after(&steps, count, None).unwrap();
            assert!((centre - sampled).magnitude() < 1e-5, "step {count}");
        }
    }

    #[test]
    fn zero_length_tube_is_rejected() {
        let steps = [TubeStep::straight(0.0, 1.0)];
        assert_eq!(
            extrude(&unit_square(), &steps, None, &full_region()),
            Err(GeometryError::ZeroLengthTube)
        );
    }

    #[test]
    fn backwards_step_is_rejected() {
        let steps = [TubeStep::straight(2.0, 1.0), TubeStep::straight(-1.0, 1.0)];
        let region = AtlasRegion::new([0.5, 0.5], [1.0, 1.0], 0.0);
        assert_eq!(
            extrude(&unit_square(), &steps, None, &region),
            Err(GeometryError::InvalidStep {
                index: 1,
                length: -1.0,
                scale: 1.0
            })
        );
        // a lone negative step is reported as such, not as a zero-length tube
        assert!(matches!(
            extrude(&unit_square(), &steps[1..], None, &region),
            Err(GeometryError::InvalidStep { index: 0, .. })
        ));
    }

    #[test]
    fn negative_or_non_finite_scale_is_rejected() {
        for scale in [-2.0, f32::NAN, f32::INFINITY] {
            let steps = [TubeStep::straight(1.0, 1.0), TubeStep::new(1.0, [0.1, 0.0, 0.0], scale)];
            let err = extrude(&unit_square(), &steps, None, &full_region()).unwrap_err();
            assert!(matches!(err, GeometryError::InvalidStep { index: 1, .. }), "{scale}");
        }
    }

    #[test]
    fn sampling_only_checks_the_steps_it_integrates() {
        let steps = [TubeStep::straight(1.0, 1.0), TubeStep::straight(f32::NAN, 1.0)];
        let before = position_after(&steps, 1, None).unwrap();
        assert!((before - Vector3::new(0.0, 0.0, 1.0)).magnitude() < 1e-6);
        assert!(matches!(
            position_after(&steps, 2, None),
            Err(GeometryError::InvalidStep { index: 1, .. })
        ));
    }

    #[test]
    fn degenerate_cross_section_is_rejected() {
        assert_eq!(
            CrossSection::new(vec![[0.0, 0.0], [1.0, 0.0]]),
            Err(GeometryError::DegenerateCrossSection { points: 2 })
        );
    }

    #[test]
    fn hulling_mismatched_segments_fails() {
        let segments = build_segments(&unit_square(), &[TubeStep::straight(1.0, 1.0)], None);
        let mut short = segments[1].clone();
        short.points.pop();
        short.normals.pop();
        let mut out = Facets::new();
        let err = hull_segments(&segments[0], &short, 0.0, 1.0, &full_region(), &mut out);
        assert_eq!(err, Err(GeometryError::SegmentSizeMismatch { a: 4, b: 3 }));

        let mut lopsided = segments[1].clone();
        lopsided.normals.pop();
        let err = hull_segments(&segments[0], &lopsided, 0.0, 1.0, &full_region(), &mut out);
        assert_eq!(err, Err(GeometryError::NormalCountMismatch { points: 4, normals: 3 }));
    }
}
