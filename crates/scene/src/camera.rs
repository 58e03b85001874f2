use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Perspective camera looking from `position` at `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov: 50.0,
            aspect: 1.0,
            near: 0.1,
            far: 2000.0,
        }
    }
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov,
            aspect,
            near,
            far,
            ..Self::default()
        }
    }

    /// Set the aspect ratio from a surface size. Zero heights are treated as 1.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Map a normalized device coordinate (x, y in `-1..=1`, depth in
    /// `0..=1`) back to world space.
    pub fn unproject(&self, ndc: Vec2, depth: f32) -> Vec3 {
        self.view_projection()
            .inverse()
            .project_point3(Vec3::new(ndc.x, ndc.y, depth))
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }
}

/// Orbit controls: rotate around, zoom towards and pan the camera target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitControls {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    radius: f32,
    /// Angle from +Y.
    polar: f32,
    /// Angle around +Y measured from +Z.
    azimuth: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            rotate_speed: 0.005,
            zoom_speed: 0.95,
            pan_speed: 0.002,
            min_distance: 0.5,
            max_distance: 1000.0,
            radius: 5.0,
            polar: std::f32::consts::FRAC_PI_2,
            azimuth: 0.0,
        }
    }
}

const POLAR_EPSILON: f32 = 1e-4;

impl OrbitControls {
    /// Controls orbiting `target`, starting from the camera's current position.
    pub fn new(camera: &PerspectiveCamera, target: Vec3) -> Self {
        let mut controls = Self {
            target,
            ..Self::default()
        };
        controls.sync_from(camera);
        controls
    }

    /// Re-derive the spherical state from a camera position.
    pub fn sync_from(&mut self, camera: &PerspectiveCamera) {
        let offset = camera.position - self.target;
        self.radius = offset.length().max(self.min_distance);
        self.polar = (offset.y / self.radius).clamp(-1.0, 1.0).acos();
        self.azimuth = offset.x.atan2(offset.z);
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Rotate by a pointer drag delta in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.azimuth -= dx * self.rotate_speed;
        self.polar = (self.polar - dy * self.rotate_speed)
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
    }

    /// Zoom by wheel steps; positive steps move closer.
    pub fn zoom(&mut self, steps: f32) {
        self.radius = (self.radius * self.zoom_speed.powf(steps))
            .clamp(self.min_distance, self.max_distance);
    }

    /// Pan the target in the camera plane by a pointer drag delta in pixels.
    pub fn pan(&mut self, camera: &PerspectiveCamera, dx: f32, dy: f32) {
        let forward = camera.forward();
        let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
        let up = right.cross(forward);
        let scale = self.radius * self.pan_speed;
        self.target += (-right * dx + up * dy) * scale;
    }

    /// Write the orbit state into the camera.
    pub fn update(&self, camera: &mut PerspectiveCamera) {
        let (sin_p, cos_p) = self.polar.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        let offset = Vec3::new(sin_p * sin_a, cos_p, sin_p * cos_a) * self.radius;
        camera.position = self.target + offset;
        camera.target = self.target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(position: Vec3) -> PerspectiveCamera {
        PerspectiveCamera {
            position,
            ..PerspectiveCamera::new(75.0, 16.0 / 9.0, 0.1, 1000.0)
        }
    }

    #[test]
    fn set_aspect_from_size() {
        let mut cam = PerspectiveCamera::default();
        cam.set_aspect(1920, 1080);
        assert!((cam.aspect - 1920.0 / 1080.0).abs() < 1e-6);
        cam.set_aspect(10, 0);
        assert_eq!(cam.aspect, 10.0);
    }

    #[test]
    fn unproject_center_lies_on_view_axis() {
        let cam = camera_at(Vec3::new(-10.0, 30.0, 30.0));
        let p = cam.unproject(Vec2::ZERO, 0.5);
        let dir = (p - cam.position).normalize();
        assert!(dir.abs_diff_eq(cam.forward(), 1e-3));
    }

    #[test]
    fn orbit_update_preserves_start_position() {
        let mut cam = camera_at(Vec3::new(-10.0, 30.0, 30.0));
        let start = cam.position;
        let orbit = OrbitControls::new(&cam, Vec3::ZERO);
        orbit.update(&mut cam);
        assert!(cam.position.abs_diff_eq(start, 1e-3));
        assert_eq!(cam.target, Vec3::ZERO);
    }

    #[test]
    fn orbit_rotation_keeps_distance_and_clamps_pole() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut orbit = OrbitControls::new(&cam, Vec3::ZERO);
        orbit.rotate(300.0, 0.0);
        orbit.rotate(0.0, 100_000.0);
        orbit.update(&mut cam);
        assert!((cam.position.length() - 10.0).abs() < 1e-3);
        assert!(cam.position.y > 9.9);
        assert!(!cam.view_projection().col(0).x.is_nan());
    }

    #[test]
    fn orbit_zoom_is_clamped() {
        let cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut orbit = OrbitControls::new(&cam, Vec3::ZERO);
        orbit.zoom(1.0);
        assert!(orbit.distance() < 10.0);
        orbit.zoom(10_000.0);
        assert_eq!(orbit.distance(), orbit.min_distance);
    }

    #[test]
    fn orbit_pan_moves_target() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut orbit = OrbitControls::new(&cam, Vec3::ZERO);
        orbit.pan(&cam, 100.0, 0.0);
        orbit.update(&mut cam);
        assert!(cam.target.x < 0.0);
        assert!(((cam.position - cam.target).length() - 10.0).abs() < 1e-3);
    }
}
