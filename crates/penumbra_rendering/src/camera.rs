//! # Camera
//!
//! Right-handed perspective camera.
//!
//! Screen UVs put `(0, 0)` at the top-left corner with `y` growing down;
//! pixel `(x, y)` of a `w × h` target is centered at
//! `((x + 0.5) / w, (y + 0.5) / h)`. Projection matrices use the `[0, 1]`
//! depth range of wgpu.

use crate::error::{RenderError, RenderResult};
use crate::math::{self, Mat4, Ray, Vec3};

/// Orthonormal camera frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    /// Screen right.
    pub right: Vec3,
    /// Screen up.
    pub up: Vec3,
    /// View direction.
    pub forward: Vec3,
}

/// Perspective camera looking from `position` at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Eye position.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// World up hint.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance; background depth.
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(60.0, 16.0 / 9.0, 0.1, 100.0)
    }
}

impl Camera {
    /// Camera at `(0, 0, 5)` looking at the origin.
    #[must_use]
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: [0.0, 0.0, 5.0],
            target: [0.0; 3],
            up: [0.0, 1.0, 0.0],
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Moves the eye and re-aims it.
    #[must_use]
    pub fn looking_at(mut self, position: Vec3, target: Vec3) -> Self {
        self.position = position;
        self.target = target;
        self
    }

    /// Replaces the aspect ratio.
    #[must_use]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    /// Rejects cameras no pass can render through.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Configuration` for a non-positive near plane,
    /// a far plane not beyond the near plane, a field of view outside
    /// `(0, π)`, a non-positive aspect, or a degenerate view direction.
    pub fn validate(&self) -> RenderResult<()> {
        if !(self.near > 0.0 && self.near.is_finite()) {
            return Err(RenderError::config(format!(
                "camera near plane must be positive, got {}",
                self.near
            )));
        }
        if !(self.far > self.near && self.far.is_finite()) {
            return Err(RenderError::config(format!(
                "camera far plane {} must exceed near plane {}",
                self.far, self.near
            )));
        }
        if !(self.fov_y > 0.0 && self.fov_y < std::f32::consts::PI) {
            return Err(RenderError::config(format!(
                "camera field of view {} is outside (0, pi)",
                self.fov_y
            )));
        }
        if !(self.aspect > 0.0 && self.aspect.is_finite()) {
            return Err(RenderError::config(format!(
                "camera aspect must be positive, got {}",
                self.aspect
            )));
        }
        let forward = math::sub(self.target, self.position);
        if math::length(math::cross(forward, self.up)) < 1e-6 {
            return Err(RenderError::config(
                "camera view direction is zero or parallel to up",
            ));
        }
        Ok(())
    }

    /// Right/up/forward frame of the camera.
    #[must_use]
    pub fn basis(&self) -> CameraBasis {
        let forward = math::normalize(math::sub(self.target, self.position));
        let right = math::normalize(math::cross(forward, self.up));
        let up = math::cross(right, forward);
        CameraBasis { right, up, forward }
    }

    /// `tan(fov_y / 2)`.
    #[must_use]
    pub fn tan_half_fov(&self) -> f32 {
        (self.fov_y * 0.5).tan()
    }

    /// World-space ray through screen `uv`.
    #[must_use]
    pub fn ray(&self, uv: [f32; 2]) -> Ray {
        let b = self.basis();
        let t = self.tan_half_fov();
        let x = (uv[0] * 2.0 - 1.0) * t * self.aspect;
        let y = (1.0 - uv[1] * 2.0) * t;
        let direction = math::add(
            b.forward,
            math::add(math::scale(b.right, x), math::scale(b.up, y)),
        );
        Ray::new(self.position, direction)
    }

    /// Distance of `p` along the view direction.
    #[must_use]
    pub fn view_depth(&self, p: Vec3) -> f32 {
        math::dot(math::sub(p, self.position), self.basis().forward)
    }

    /// Screen UV of world point `p`, or `None` if it lies behind the eye.
    #[must_use]
    pub fn project(&self, p: Vec3) -> Option<[f32; 2]> {
        let b = self.basis();
        let v = math::sub(p, self.position);
        let z = math::dot(v, b.forward);
        if z <= 1e-6 {
            return None;
        }
        let t = self.tan_half_fov();
        let x = math::dot(v, b.right) / (z * t * self.aspect);
        let y = math::dot(v, b.up) / (z * t);
        Some([(x + 1.0) * 0.5, (1.0 - y) * 0.5])
    }

    /// World direction expressed in the camera frame (`-z` forward).
    #[must_use]
    pub fn to_view(&self, dir: Vec3) -> Vec3 {
        let b = self.basis();
        [
            math::dot(dir, b.right),
            math::dot(dir, b.up),
            -math::dot(dir, b.forward),
        ]
    }

    /// Inverse of [`Camera::to_view`].
    #[must_use]
    pub fn from_view(&self, dir: Vec3) -> Vec3 {
        let b = self.basis();
        math::add(
            math::add(math::scale(b.right, dir[0]), math::scale(b.up, dir[1])),
            math::scale(b.forward, -dir[2]),
        )
    }

    /// World-to-view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        let CameraBasis { right, up, forward } = self.basis();
        let e = self.position;
        [
            [right[0], up[0], -forward[0], 0.0],
            [right[1], up[1], -forward[1], 0.0],
            [right[2], up[2], -forward[2], 0.0],
            [
                -math::dot(right, e),
                -math::dot(up, e),
                math::dot(forward, e),
                1.0,
            ],
        ]
    }

    /// View-to-clip matrix with `[0, 1]` depth.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        let f = 1.0 / self.tan_half_fov();
        let range = self.near - self.far;
        [
            [f / self.aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, self.far / range, -1.0],
            [0.0, 0.0, self.near * self.far / range, 0.0],
        ]
    }

    /// World-to-clip matrix.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        math::mat4_mul(&self.projection_matrix(), &self.view_matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::perspective(60.0, 1.5, 0.1, 50.0).looking_at([0.0, -0.5, 8.0], [0.0, 0.0, 0.0])
    }

    #[test]
    fn test_center_ray_is_forward() {
        let c = camera();
        let ray = c.ray([0.5, 0.5]);
        let fwd = c.basis().forward;
        assert!((math::dot(ray.direction, fwd) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_project_inverts_ray() {
        let c = camera();
        for uv in [[0.1, 0.2], [0.5, 0.5], [0.9, 0.75]] {
            let p = c.ray(uv).at(6.0);
            let back = c.project(p).expect("in front");
            assert!((back[0] - uv[0]).abs() < 1e-4, "{back:?} vs {uv:?}");
            assert!((back[1] - uv[1]).abs() < 1e-4, "{back:?} vs {uv:?}");
        }
    }

    #[test]
    fn test_top_of_screen_is_up() {
        let c = camera();
        let top = c.ray([0.5, 0.0]).direction;
        let bottom = c.ray([0.5, 1.0]).direction;
        assert!(top[1] > bottom[1]);
    }

    #[test]
    fn test_behind_eye_not_projected() {
        let c = camera();
        assert!(c.project([0.0, 0.0, 20.0]).is_none());
    }

    #[test]
    fn test_matrices_agree_with_project() {
        let c = camera();
        let p = [1.0, 0.5, -2.0];
        let clip = math::mat4_transform(&c.view_projection(), p);
        let ndc = [clip[0] / clip[3], clip[1] / clip[3], clip[2] / clip[3]];
        let uv = c.project(p).expect("visible");
        assert!(((ndc[0] + 1.0) * 0.5 - uv[0]).abs() < 1e-4);
        assert!(((1.0 - ndc[1]) * 0.5 - uv[1]).abs() < 1e-4);
        assert!(ndc[2] > 0.0 && ndc[2] < 1.0);
        // Clip w is the view depth.
        assert!((clip[3] - c.view_depth(p)).abs() < 1e-4);
    }

    #[test]
    fn test_view_round_trip() {
        let c = camera();
        let d = math::normalize([0.3, -0.2, 0.9]);
        let back = c.from_view(c.to_view(d));
        for i in 0..3 {
            assert!((back[i] - d[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_validate() {
        assert!(camera().validate().is_ok());
        let mut bad = camera();
        bad.near = 0.0;
        assert!(bad.validate().unwrap_err().is_configuration());
        let mut bad = camera();
        bad.far = 0.05;
        assert!(bad.validate().is_err());
        let mut bad = camera();
        bad.target = bad.position;
        assert!(bad.validate().is_err());
    }
}
