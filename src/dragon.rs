use std::f32::consts::{FRAC_PI_2, PI};

use cgmath::Vector3;

use crate::creature::{Assembly, Creature, Part, StepSource};
use crate::error::Result;
use crate::geometry::Facets;
use crate::math::Mat4;
use crate::texture::{TextureAtlas, REGION_BLACK, REGION_RASPBERRY_SCALES};
use crate::tube::{CrossSection, TubeStep};

pub const WING_MEMBRANE_SAMPLES: usize = 40;

const TAIL_LENGTH: f32 = 6.0;
const TAIL_SEGMENTS: usize = 10;
const TAIL_WAG: f32 = 0.1;
const TAIL_WAVE: f32 = 6.0;
const TAIL_TAPER: f32 = 0.92;

const WING_LENGTH: f32 = 14.0;
const WING_SEGMENTS: usize = 10;
const WING_CURL: [f32; 5] = [-0.6, -0.5, -0.2, -0.05, -0.3];
const WING_TAPER: f32 = 0.97;
const WING_SWEEP: f32 = -0.15;
const WING_FLAP_AMPLITUDE: f32 = 0.5;
const WING_FLAP_REST: f32 = -1.0;

const LEG_SWING: f32 = 0.15;
const LEG_HIP_STEP: usize = 3;

const TAIL_SECTION: &[[f32; 2]] = &[
    [0.3, 0.3],
    [0.6, -0.2],
    [0.2, -0.5],
    [-0.2, -0.5],
    [-0.6, -0.2],
    [-0.3, 0.3],
];

const BODY_SECTION: &[[f32; 2]] = &[
    [0.3, 0.2],
    [0.4, -0.2],
    [0.2, -0.3],
    [0.0, -0.4],
    [-0.2, -0.3],
    [-0.4, -0.2],
    [-0.3, 0.2],
];

const WING_SECTION: &[[f32; 2]] = &[[-0.2, 0.0], [0.0, -0.2], [0.2, 0.0], [0.0, 0.2]];

const HEAD_SECTION: &[[f32; 2]] = &[
    [-0.3, -0.25],
    [-0.5, -0.1],
    [-0.5, 0.1],
    [-0.4, 0.2],
    [0.0, 0.4],
    [0.4, 0.2],
    [0.5, 0.1],
    [0.5, -0.1],
    [0.3, -0.25],
];

// (length, rotation, scale)
type StepRow = (f32, [f32; 3], f32);

const BODY_STEPS: &[StepRow] = &[
    (1.0, [0.0, 0.0, 0.0], 2.0),
    (1.0, [0.0, 0.0, 0.0], 1.1),
    (1.0, [0.0, 0.0, 0.0], 1.4),
    (1.0, [-0.2, 0.0, 0.0], 1.3),
    (1.0, [-0.4, 0.0, 0.0], 1.1),
    (1.0, [-0.1, 0.0, 0.0], 0.8),
    (1.0, [0.3, 0.0, 0.0], 0.4),
    (1.0, [0.0, 0.0, 0.0], 0.0),
];

const FORE_LEG_STEPS: &[StepRow] = &[
    (0.3, [0.0, 0.0, 0.0], 1.4),
    (0.5, [0.0, 0.0, 0.0], 1.1),
    (0.5, [0.0, 0.0, 0.0], 1.1),
    (0.5, [0.5, 1.1, 0.0], 1.0),
    (0.5, [0.3, 0.3, 0.0], 0.6),
    (0.5, [0.0, 0.0, 0.0], 1.0),
    (0.5, [0.0, 0.0, -0.4], 0.8),
    (0.5, [0.0, 0.0, -0.5], 1.2),
    (0.5, [0.0, 0.0, -0.2], 1.0),
    (0.2, [0.0, 0.0, 0.2], 1.5),
    (0.05, [0.0, 0.0, 0.0], 1.0),
    (0.2, [0.0, 0.0, 0.0], 0.7),
    (0.0, [0.0, 0.0, 0.0], 0.0),
];

const HIND_LEG_STEPS: &[StepRow] = &[
    (0.4, [0.0, 0.0, 0.0], 1.4),
    (0.7, [0.0, 0.0, 0.0], 1.1),
    (0.7, [0.0, 0.0, 0.0], 1.1),
    (0.5, [1.0, 0.6, 0.0], 1.0),
    (0.5, [0.3, 0.3, 0.0], 0.6),
    (0.5, [0.0, 0.0, 0.0], 1.0),
    (0.5, [0.0, 0.0, -0.2], 0.8),
    (0.5, [0.0, 0.0, -0.3], 1.2),
    (0.5, [0.0, 0.0, -0.1], 1.0),
    (0.2, [0.0, 0.0, 0.2], 1.5),
    (0.05, [0.0, 0.0, 0.0], 1.0),
    (0.2, [0.0, 0.0, 0.0], 0.7),
    (0.0, [0.0, 0.0, 0.0], 0.0),
];

const HEAD_STEPS: &[StepRow] = &[
    (0.6, [0.0, 0.0, 0.0], 2.0),
    (0.4, [0.6, 0.0, 0.0], 1.4),
    (0.5, [0.4, 0.0, 0.0], 1.0),
    (0.5, [0.3, 0.0, 0.0], 1.0),
    (0.3, [0.0, 0.0, 0.0], 0.8),
    (0.1, [0.0, 0.0, 0.0], 0.8),
    (0.1, [0.0, 0.0, 0.0], 0.6),
    (0.1, [0.0, 0.0, 0.0], 0.2),
    (0.0, [0.0, 0.0, 0.0], 0.0),
];

/// Animation phases the dragon is drawn at.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragonPose {
    /// Drives tail wag and leg swing.
    pub tail_phase: f32,
    /// Drives the wing root rotation.
    pub flap_phase: f32,
}

fn rows(table: &[StepRow]) -> Vec<TubeStep> {
    table
        .iter()
        .map(|(length, rotation, scale)| TubeStep::new(*length, *rotation, *scale))
        .collect()
}

fn tail_steps(phase: f32) -> Vec<TubeStep> {
    let mut steps = Vec::with_capacity(TAIL_SEGMENTS + 2);
    // root hangs straight down whatever the dragon's attitude
    steps.push(TubeStep::default_frame(1.0, 1.0));
    for i in 0..TAIL_SEGMENTS {
        let x = i as f32 / TAIL_SEGMENTS as f32;
        let wag = TAIL_WAG * (phase + TAIL_WAVE * x).sin();
        steps.push(TubeStep::new(
            TAIL_LENGTH / TAIL_SEGMENTS as f32,
            [wag, wag, 0.0],
            TAIL_TAPER,
        ));
    }
    steps.push(TubeStep::straight(0.4, 0.0));
    steps
}

fn wing_steps() -> Vec<TubeStep> {
    let mut steps: Vec<TubeStep> = (0..WING_SEGMENTS)
        .map(|i| {
            let curl = WING_CURL[i * WING_CURL.len() / WING_SEGMENTS];
            TubeStep::new(WING_LENGTH / WING_SEGMENTS as f32, [curl, 0.0, 0.0], WING_TAPER)
        })
        .collect();
    // closing spike
    steps.push(TubeStep::straight(0.3, 0.0));
    steps
}

/// Leg whose hip joint swings with the phase; `offset` sets its place in
/// the gait.
fn swinging_leg(table: &'static [StepRow], offset: f32) -> StepSource {
    StepSource::generated(move |phase| {
        let mut steps = rows(table);
        if let Some(hip) = steps.get_mut(LEG_HIP_STEP) {
            let swing = LEG_SWING * (phase + offset).sin();
            *hip = TubeStep::new(
                hip.length,
                [table[LEG_HIP_STEP].1[0] + swing, table[LEG_HIP_STEP].1[1], table[LEG_HIP_STEP].1[2]],
                hip.scale,
            );
        }
        steps
    })
}

fn section(points: &[[f32; 2]]) -> Result<CrossSection> {
    CrossSection::new(points.to_vec())
}

/// Lays out every dragon part for this frame.
///
/// The body is defined first; legs, wings and head are attached to
/// positions sampled along it.
pub fn build_dragon(assembly: &Assembly, flap_phase: f32) -> Result<Creature> {
    let mut creature = Creature::new();

    let tail = Part::new(
        "tail",
        section(TAIL_SECTION)?,
        StepSource::generated(tail_steps),
        REGION_RASPBERRY_SCALES,
    )
    .with_orientation([0.0, PI, 0.0])
    .with_translation(Vector3::new(0.0, 0.0, 0.4));
    creature.add_part(tail);

    let body = Part::new(
        "body",
        section(BODY_SECTION)?,
        StepSource::Static(rows(BODY_STEPS)),
        REGION_RASPBERRY_SCALES,
    );

    let fore_attach = assembly.sample_position_along_part(&body, 0.2)?;
    let hind_attach = assembly.sample_position_along_part(&body, 0.5)?;
    let wing_attach = assembly.sample_position_along_part(&body, 0.7)?;
    let head_attach = assembly.sample_position_along_part(&body, 0.96)?;

    let legs = [
        ("fore_leg_left", FORE_LEG_STEPS, fore_attach, false, 0.0),
        ("hind_leg_left", HIND_LEG_STEPS, hind_attach, false, PI),
        ("fore_leg_right", FORE_LEG_STEPS, fore_attach, true, PI),
        ("hind_leg_right", HIND_LEG_STEPS, hind_attach, true, 0.0),
    ];
    creature.add_part(body);

    for (name, table, attach, mirror, gait_offset) in legs {
        let yaw = if mirror { -FRAC_PI_2 } else { FRAC_PI_2 };
        let leg = Part::new(name, section(BODY_SECTION)?, swinging_leg(table, gait_offset), REGION_RASPBERRY_SCALES)
            .with_mirror(mirror)
            .with_orientation([0.0, yaw, 0.0])
            .with_translation(attach);
        creature.add_part(leg);
    }

    let flap = WING_FLAP_AMPLITUDE * flap_phase.sin() + WING_FLAP_REST;
    for (name, side) in [("wing_left", 1.0), ("wing_right", -1.0)] {
        let wing = Part::new(
            name,
            section(WING_SECTION)?,
            StepSource::Static(wing_steps()),
            REGION_RASPBERRY_SCALES,
        )
        .with_orientation([WING_SWEEP, 0.0, side * flap])
        .with_translation(wing_attach + Vector3::new(side, 0.0, -0.3));
        let index = creature.add_part(wing);
        creature.add_membrane(index, WING_MEMBRANE_SAMPLES, REGION_BLACK)?;
    }

    let head = Part::new(
        "head",
        section(HEAD_SECTION)?,
        StepSource::Static(rows(HEAD_STEPS)),
        REGION_RASPBERRY_SCALES,
    )
    .with_orientation([-1.1, 0.0, 0.0])
    .with_translation(head_attach);
    creature.add_part(head);

    Ok(creature)
}

/// Full dragon geometry in dragon space for one frame.
///
/// `tilt` is the dragon's world rotation (without translation or scale).
pub fn form_dragon(pose: &DragonPose, tilt: &Mat4, atlas: &TextureAtlas) -> Result<Facets> {
    let assembly = Assembly::new(tilt, pose.tail_phase)?;
    build_dragon(&assembly, pose.flap_phase)?.facets(&assembly, atlas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creature::sample_position_along_part;
    use crate::math;
    use cgmath::{vec3, InnerSpace};

    fn tilted() -> Mat4 {
        math::rotation_twist_pitch_yaw(vec3(-0.35, 1.3, 0.2))
    }

    #[test]
    fn dragon_triangle_budget() {
        let atlas = TextureAtlas::default();
        let facets = form_dragon(&DragonPose::default(), &math::identity(), &atlas).unwrap();
        let tail = 2 * 12 * 6;
        let body = 2 * 8 * 7;
        let legs = 4 * (2 * 13 * 7);
        let wings = 2 * (2 * 11 * 4);
        let head = 2 * 9 * 9;
        let membranes = 2 * WING_MEMBRANE_SAMPLES;
        assert_eq!(
            facets.triangle_count(),
            tail + body + legs + wings + head + membranes
        );
        assert!(facets.flat_positions().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn tail_root_hangs_down_in_world_space() {
        let tilt = tilted();
        let assembly = Assembly::new(&tilt, 0.7).unwrap();
        let dragon = build_dragon(&assembly, 0.0).unwrap();
        let tail = dragon.part("tail").unwrap();
        let steps = tail.steps.resolve(assembly.phase());
        let after_root = assembly
            .sample_position_along_part(tail, 1.5 / steps.len() as f32)
            .unwrap();
        let world_dir = math::apply_direction(&tilt, after_root - tail.translation);
        assert!((world_dir - vec3(0.0, -1.0, 0.0)).magnitude() < 1e-4, "{world_dir:?}");
    }

    #[test]
    fn legs_and_head_attach_to_body() {
        let assembly = Assembly::new(&math::identity(), 0.0).unwrap();
        let dragon = build_dragon(&assembly, 0.0).unwrap();
        let body = dragon.part("body").unwrap();
        let fore = assembly.sample_position_along_part(body, 0.2).unwrap();
        assert_eq!(dragon.part("fore_leg_left").unwrap().translation, fore);
        assert_eq!(dragon.part("fore_leg_right").unwrap().translation, fore);
        let head = sample_position_along_part(body, 0.96, 0.0, None).unwrap();
        assert!((dragon.part("head").unwrap().translation - head).magnitude() < 1e-6);
    }

    #[test]
    fn wings_flap_symmetrically() {
        let assembly = Assembly::new(&math::identity(), 0.0).unwrap();
        let up = build_dragon(&assembly, FRAC_PI_2).unwrap();
        let down = build_dragon(&assembly, -FRAC_PI_2).unwrap();
        let tip = |c: &Creature, name| assembly.sample_position_along_part(c.part(name).unwrap(), 1.0).unwrap();
        assert!((tip(&up, "wing_left") - tip(&down, "wing_left")).magnitude() > 1.0);
        let left = tip(&up, "wing_left");
        let right = tip(&up, "wing_right");
        assert!((left.x + right.x).abs() < 1e-3);
        assert!((left.y - right.y).abs() < 1e-3);
    }

    #[test]
    fn tail_wags_with_phase() {
        let quiet = tail_steps(0.0);
        let later = tail_steps(1.0);
        assert_eq!(quiet.len(), TAIL_SEGMENTS + 2);
        assert_ne!(quiet[3], later[3]);
        assert_eq!(quiet[0], later[0]);
    }
}
