//! 4x4 homogeneous transforms on top of `cgmath`.
//!
//! Composition reads right to left: in `multiply_many(&[a, b, c])` the
//! matrix `c` touches a point first and `a` last.

use cgmath::{InnerSpace, Matrix4, Rad, SquareMatrix, Vector3, Vector4};

use crate::error::{GeometryError, Result};

pub type Mat4 = Matrix4<f32>;

const SINGULAR_EPSILON: f32 = 1e-12;
const W_TOLERANCE: f32 = 1e-5;
const UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

pub fn identity() -> Mat4 {
    Matrix4::identity()
}

pub fn translation(offset: Vector3<f32>) -> Mat4 {
    Matrix4::from_translation(offset)
}

pub fn scale(factor: f32) -> Mat4 {
    Matrix4::from_scale(factor)
}

/// Negates local x when `mirror` is set, identity otherwise.
pub fn mirror_x(mirror: bool) -> Mat4 {
    if mirror {
        Matrix4::from_nonuniform_scale(-1.0, 1.0, 1.0)
    } else {
        identity()
    }
}

/// Pitch.
pub fn rotation_x(angle: f32) -> Mat4 {
    Matrix4::from_angle_x(Rad(angle))
}

/// Yaw.
pub fn rotation_y(angle: f32) -> Mat4 {
    Matrix4::from_angle_y(Rad(angle))
}

/// Twist.
pub fn rotation_z(angle: f32) -> Mat4 {
    Matrix4::from_angle_z(Rad(angle))
}

/// The one composition order used everywhere in the crate: twist about z
/// first, then pitch about x, then yaw about y (`Ry * Rx * Rz`).
pub fn rotation_twist_pitch_yaw(angles: Vector3<f32>) -> Mat4 {
    multiply_many(&[
        rotation_y(angles.y),
        rotation_x(angles.x),
        rotation_z(angles.z),
    ])
}

pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
    *a * *b
}

/// Left-to-right product; the first matrix ends up leftmost.
pub fn multiply_many(matrices: &[Mat4]) -> Mat4 {
    matrices.iter().fold(identity(), |acc, m| acc * *m)
}

pub fn apply(matrix: &Mat4, v: Vector4<f32>) -> Vector4<f32> {
    *matrix * v
}

/// Rotates a direction, ignoring any translation in `matrix`.
pub fn apply_direction(matrix: &Mat4, v: Vector3<f32>) -> Vector3<f32> {
    (*matrix * v.extend(0.0)).truncate()
}

pub fn to_homogeneous(v: Vector3<f32>) -> Vector4<f32> {
    v.extend(1.0)
}

/// Drops w from a homogeneous point. Refuses points whose w drifted from 1.
pub fn flatten(v: Vector4<f32>) -> Result<[f32; 3]> {
    if !v.w.is_finite() || (v.w - 1.0).abs() > W_TOLERANCE {
        return Err(GeometryError::NonUnitW { w: v.w });
    }
    Ok([v.x, v.y, v.z])
}

pub fn inverse(matrix: &Mat4) -> Result<Mat4> {
    let det = matrix.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return Err(GeometryError::SingularMatrix);
    }
    matrix.invert().ok_or(GeometryError::SingularMatrix)
}

/// Basis sitting at `eye` whose local +z points at `target`.
///
/// The inverse of this matrix is a view matrix. Looking straight up or
/// down falls back to world x for the side axis.
pub fn orient(eye: Vector3<f32>, target: Vector3<f32>) -> Result<Mat4> {
    let forward = target - eye;
    if forward.magnitude2() <= f32::EPSILON {
        return Err(GeometryError::DegenerateOrientation);
    }
    let z = forward.normalize();
    let side = UP.cross(z);
    let x = if side.magnitude2() <= f32::EPSILON {
        Vector3::unit_x()
    } else {
        side.normalize()
    };
    let y = z.cross(x);
    Ok(Matrix4::from_cols(
        x.extend(0.0),
        y.extend(0.0),
        z.extend(0.0),
        eye.extend(1.0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::vec3;

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn multiply_many_applies_rightmost_first() {
        let m = multiply_many(&[translation(vec3(1.0, 0.0, 0.0)), scale(2.0)]);
        let p = flatten(apply(&m, to_homogeneous(vec3(1.0, 1.0, 1.0)))).unwrap();
        assert_eq!(p, [3.0, 2.0, 2.0]);
    }

    #[test]
    fn twist_pitch_yaw_matches_sequential_application() {
        let angles = vec3(0.3, -0.7, 1.1);
        let v = vec3(0.2, 0.5, 1.0);
        let composed = apply_direction(&rotation_twist_pitch_yaw(angles), v);
        let stepwise = apply_direction(
            &rotation_y(angles.y),
            apply_direction(&rotation_x(angles.x), apply_direction(&rotation_z(angles.z), v)),
        );
        assert!(close(composed, stepwise));
    }

    #[test]
    fn inverse_undoes_rigid_transform() {
        let m = multiply_many(&[
            translation(vec3(2.0, -1.0, 4.0)),
            rotation_twist_pitch_yaw(vec3(0.4, 1.2, -0.3)),
        ]);
        let inv = inverse(&m).unwrap();
        let p = vec3(0.5, 0.25, -3.0);
        let back = flatten(apply(&inv, apply(&m, to_homogeneous(p)))).unwrap();
        assert!(close(Vector3::from(back), p));
    }

    #[test]
    fn inverse_rejects_singular_matrix() {
        assert_eq!(inverse(&scale(0.0)), Err(GeometryError::SingularMatrix));
    }

    #[test]
    fn flatten_rejects_non_unit_w() {
        let err = flatten(Vector4::new(1.0, 2.0, 3.0, 0.5)).unwrap_err();
        assert_eq!(err, GeometryError::NonUnitW { w: 0.5 });
    }

    #[test]
    fn orient_points_local_z_at_target() {
        let eye = vec3(1.0, 2.0, 3.0);
        let target = vec3(4.0, 2.0, 7.0);
        let m = orient(eye, target).unwrap();
        let forward = apply_direction(&m, Vector3::unit_z());
        assert!(close(forward, (target - eye).normalize()));
        let origin = flatten(apply(&m, to_homogeneous(vec3(0.0, 0.0, 0.0)))).unwrap();
        assert!(close(Vector3::from(origin), eye));
    }

    #[test]
    fn orient_handles_vertical_view_and_rejects_coincident_points() {
        let down = orient(vec3(0.0, 5.0, 0.0), vec3(0.0, 0.0, 0.0)).unwrap();
        assert!(inverse(&down).is_ok());
        let p = vec3(1.0, 1.0, 1.0);
        assert_eq!(orient(p, p), Err(GeometryError::DegenerateOrientation));
    }
}
