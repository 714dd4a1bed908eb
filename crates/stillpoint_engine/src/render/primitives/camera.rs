//! # 3D Camera
//!
//! Perspective camera used to drive visibility culling and LOD distances.
//!
//! ## Design Principles
//! - **Backend-agnostic**: matrices only, no renderer types
//! - **On-demand matrices**: nothing is cached, every getter recomputes
//! - **Conventional math**: right-handed Y-up view space, OpenGL-style clip
//!   space (`z` in `[-w, w]`)

use crate::foundation::math::{utils, Mat4, Point3, Vec3};

/// 3D perspective camera
///
/// Holds position, orientation (via a look-at target and up vector) and the
/// projection parameters.
///
/// # Coordinate System
/// - X+ = Right
/// - Y+ = Up
/// - The camera looks down -Z in view space
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Viewport width / height
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use stillpoint_engine::foundation::math::Vec3;
    /// use stillpoint_engine::render::primitives::Camera;
    ///
    /// let camera = Camera::perspective(Vec3::new(0.0, 2.0, 10.0), 60.0, 16.0 / 9.0, 0.1, 100.0);
    /// assert_eq!(camera.target, Vec3::zeros());
    /// ```
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Move the camera, keeping its target
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Point the camera somewhere else
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }

    /// Set target and up vector together
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Update the aspect ratio after a viewport resize
    ///
    /// Only logs when the change is larger than 0.01.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// World-to-camera transform
    pub fn get_view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }

    /// Camera-to-world transform (inverse of the view matrix)
    pub fn get_world_matrix(&self) -> Mat4 {
        self.get_view_matrix()
            .try_inverse()
            .unwrap_or_else(|| Mat4::new_translation(&self.position))
    }

    /// Perspective projection
    pub fn get_projection_matrix(&self) -> Mat4 {
        Mat4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Combined `projection × view`, the matrix frustum planes are taken from
    pub fn get_view_projection_matrix(&self) -> Mat4 {
        self.get_projection_matrix() * self.get_view_matrix()
    }

    /// Euclidean distance from the camera to a world-space point
    pub fn distance_to(&self, point: &Vec3) -> f32 {
        (point - self.position).magnitude()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 10.0), 75.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_view_matrix_moves_target_onto_negative_z() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0);
        let view = camera.get_view_matrix();
        let target_in_view = view.transform_point(&Point3::origin());
        assert_relative_eq!(target_in_view, Point3::new(0.0, 0.0, -10.0), epsilon = 1e-5);
    }

    #[test]
    fn test_world_matrix_is_inverse_of_view() {
        let mut camera = Camera::default();
        camera.set_position(Vec3::new(3.0, 4.0, 5.0));
        camera.set_target(Vec3::new(1.0, 0.0, -2.0));

        let product = camera.get_world_matrix() * camera.get_view_matrix();
        assert_relative_eq!(product, Mat4::identity(), epsilon = 1e-4);

        let origin = camera.get_world_matrix().transform_point(&Point3::origin());
        assert_relative_eq!(origin.coords, camera.position, epsilon = 1e-4);
    }

    #[test]
    fn test_aspect_ratio_update() {
        let mut camera = Camera::default();
        camera.set_aspect_ratio(2.0);
        assert_relative_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn test_distance_to_point() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0);
        assert_relative_eq!(camera.distance_to(&Vec3::new(0.0, 0.0, -20.0)), 30.0);
    }
}
