use cgmath::{vec3, Matrix4, Vector3};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::error::Result;
use crate::math::{self, Mat4};
use crate::terrain::Terrain;

pub const START_POSITION: Vector3<f32> = vec3(0.0, 3.0, 0.0);

pub const GLIDE_SPEED: f32 = 0.9;
pub const MIN_SPEED: f32 = 0.7;
pub const MAX_SPEED: f32 = 20.0;
/// Speed change per second while easing back to gliding.
const DAMPENING_RATE: f32 = 0.4;
const DIVE_OR_CLIMB_RATE: f32 = 10.0;
/// |dir.y| below this counts as level flight.
const LEVEL_THRESHOLD: f32 = 0.4;

pub const MAX_HEIGHT: f32 = 10.0;
const CEILING_PITCH: f32 = -0.4;
pub const MIN_FLY_HEIGHT: f32 = 0.05;

pub const TARGET_INTERVAL_MS: f64 = 3000.0;
const MAX_YAW_SPEED_TARGET: f32 = 2.0;
const MAX_PITCH_TARGET: f32 = 0.6;
/// Fraction of the remaining error closed each tick.
const STEERING_RATE: f32 = 0.03;

/// Visual exaggeration of pitch on the model.
const PITCH_TILT: f32 = 1.15;
const BANK_DIVISOR: f32 = 3.0;

/// Autopilot flight state. Sole writer of the viewer position and heading.
#[derive(Clone, Debug)]
pub struct Flight {
    pub position: Vector3<f32>,
    pub yaw: f32,
    pub pitch: f32,
    pub yaw_speed: f32,
    pub speed: f32,
    yaw_speed_target: f32,
    pitch_target: f32,
    last_target_ms: f64,
    rng: SmallRng,
}

impl Flight {
    pub fn new(seed: u64) -> Self {
        Self {
            position: START_POSITION,
            yaw: 0.0,
            pitch: 0.0,
            yaw_speed: 0.0,
            speed: GLIDE_SPEED,
            yaw_speed_target: 0.0,
            pitch_target: 0.0,
            last_target_ms: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn direction(&self) -> Vector3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        vec3(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    pub fn targets(&self) -> (f32, f32) {
        (self.yaw_speed_target, self.pitch_target)
    }

    fn steer(&mut self, time_ms: f64) {
        if time_ms - self.last_target_ms > TARGET_INTERVAL_MS {
            self.last_target_ms = time_ms;
            self.yaw_speed_target = self
                .rng
                .gen_range(-MAX_YAW_SPEED_TARGET..=MAX_YAW_SPEED_TARGET);
            self.pitch_target = self.rng.gen_range(-MAX_PITCH_TARGET..=MAX_PITCH_TARGET);
            log::debug!(
                "new heading targets: yaw speed {:.2}, pitch {:.2}",
                self.yaw_speed_target,
                self.pitch_target
            );
        }
        self.yaw_speed -= (self.yaw_speed - self.yaw_speed_target) * STEERING_RATE;
        self.pitch -= (self.pitch - self.pitch_target) * STEERING_RATE;
    }

    fn adjust_speed(&mut self, climb: f32, dt: f32) {
        if climb.abs() < LEVEL_THRESHOLD {
            let step = DAMPENING_RATE * dt;
            if (self.speed - GLIDE_SPEED).abs() > step {
                self.speed += if self.speed < GLIDE_SPEED { step } else { -step };
            } else {
                self.speed = GLIDE_SPEED;
            }
        } else {
            self.speed = self.speed.clamp(MIN_SPEED, MAX_SPEED);
            if self.speed > MIN_SPEED && self.speed < MAX_SPEED {
                self.speed -= climb.powi(3) * DIVE_OR_CLIMB_RATE * dt;
            }
        }
    }

    /// Advances one tick of `dt` seconds and returns the wing flap
    /// frequency for this attitude.
    pub fn update(&mut self, time_ms: f64, dt: f32, terrain: &Terrain) -> f32 {
        self.steer(time_ms);
        self.yaw += self.yaw_speed * dt;

        if self.position.y > MAX_HEIGHT {
            self.pitch = CEILING_PITCH;
            self.position.y = MAX_HEIGHT;
        }

        let dir = self.direction();
        // this tick moves at the speed from before the adjustment
        let travel_speed = self.speed;
        self.adjust_speed(dir.y, dt);
        self.position += dir * (travel_speed * dt);

        let ground = terrain.height(self.position.x as f64, self.position.z as f64) as f32;
        if ground > self.position.y - MIN_FLY_HEIGHT {
            self.position.y = ground + MIN_FLY_HEIGHT;
            self.speed = GLIDE_SPEED;
        }

        5.0 * (dir.y + 1.0).powi(2)
    }

    /// World rotation of the dragon model, banking into turns.
    pub fn tilt(&self) -> Mat4 {
        math::multiply_many(&[
            math::rotation_y(self.yaw),
            math::rotation_x(-self.pitch * PITCH_TILT),
            math::rotation_z(-self.yaw_speed / BANK_DIVISOR),
        ])
    }

    pub fn model_matrix(&self, scale: f32) -> Mat4 {
        math::multiply_many(&[
            math::translation(self.position),
            self.tilt(),
            math::scale(scale),
        ])
    }

    /// Follow camera sitting `distance` behind the dragon.
    pub fn camera_eye(&self, distance: f32) -> Vector3<f32> {
        self.position - self.direction() * distance
    }

    pub fn view_matrix(&self, distance: f32) -> Result<Mat4> {
        math::inverse(&math::orient(self.camera_eye(distance), self.position)?)
    }
}

/// Perspective projection for a +z-forward view space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fov_y: f32,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fov_y: f32, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fov_y,
            znear,
            zfar,
        }
    }

    pub fn build_matrix(&self) -> Mat4 {
        let f = 1.0 / (self.fov_y / 2.0).tan();
        let (n, far) = (self.znear, self.zfar);
        #[rustfmt::skip]
        let m = Matrix4::new(
            f / self.aspect, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, (far + n) / (far - n), 1.0,
            0.0, 0.0, 2.0 * n * far / (n - far), 0.0,
        );
        m
    }
}
