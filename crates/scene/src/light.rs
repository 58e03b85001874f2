use etude_common::{Color, ObjectId};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Cone light shining from its object position towards `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub color: Color,
    pub intensity: f32,
    /// Maximum range. Zero means unlimited.
    pub distance: f32,
    /// Half-angle of the cone in radians.
    pub angle: f32,
    /// Fraction of the cone that is attenuated towards the edge, `0..=1`.
    pub penumbra: f32,
    pub target: Vec3,
    pub cast_shadow: bool,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            intensity: 1.0,
            distance: 0.0,
            angle: PI / 3.0,
            penumbra: 0.0,
            target: Vec3::ZERO,
            cast_shadow: false,
        }
    }
}

impl SpotLight {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Unit vector from `position` towards the target.
    pub fn direction(&self, position: Vec3) -> Vec3 {
        (self.target - position).normalize_or(Vec3::NEG_Y)
    }

    /// Cosine of the full cone half-angle.
    pub fn cos_outer(&self) -> f32 {
        self.angle.cos()
    }

    /// Cosine of the fully lit inner cone.
    pub fn cos_inner(&self) -> f32 {
        (self.angle * (1.0 - self.penumbra.clamp(0.0, 1.0))).cos()
    }

    /// Spot attenuation for a point seen at `cos_theta` from the axis.
    pub fn spot_factor(&self, cos_theta: f32) -> f32 {
        let (outer, inner) = (self.cos_outer(), self.cos_inner());
        if inner - outer <= f32::EPSILON {
            return if cos_theta >= outer { 1.0 } else { 0.0 };
        }
        let t = ((cos_theta - outer) / (inner - outer)).clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Light {
    Spot(SpotLight),
}

/// Colored line segment emitted by helpers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Vec3,
    pub end: Vec3,
    pub color: Color,
}

impl LineSegment {
    pub fn new(start: Vec3, end: Vec3, color: Color) -> Self {
        Self { start, end, color }
    }
}

/// Visual cone for a spot light, rebuilt by [`SpotLightHelper::update`].
/// Segments are in world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotLightHelper {
    pub light: ObjectId,
    cone: Vec<LineSegment>,
}

const CONE_RIM_SEGMENTS: usize = 32;
const CONE_DEFAULT_LENGTH: f32 = 1000.0;

impl SpotLightHelper {
    pub fn new(light: ObjectId) -> Self {
        Self {
            light,
            cone: Vec::new(),
        }
    }

    /// Recompute the cone from the light's current position and parameters.
    pub fn update(&mut self, light_position: Vec3, light: &SpotLight) {
        let length = if light.distance > 0.0 {
            light.distance
        } else {
            CONE_DEFAULT_LENGTH
        };
        let axis = light.direction(light_position);
        let radius = length * light.angle.tan();
        let side = axis.any_orthonormal_vector();
        let up = axis.cross(side);
        let center = light_position + axis * length;
        let rim = |t: f32| center + (side * t.cos() + up * t.sin()) * radius;

        self.cone.clear();
        for k in 0..4 {
            let t = k as f32 * TAU / 4.0;
            self.cone
                .push(LineSegment::new(light_position, rim(t), light.color));
        }
        for k in 0..CONE_RIM_SEGMENTS {
            let t0 = k as f32 * TAU / CONE_RIM_SEGMENTS as f32;
            let t1 = (k + 1) as f32 * TAU / CONE_RIM_SEGMENTS as f32;
            self.cone.push(LineSegment::new(rim(t0), rim(t1), light.color));
        }
    }

    pub fn cone(&self) -> &[LineSegment] {
        &self.cone
    }
}

/// Non-pickable line visuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Helper {
    /// X, Y and Z axes in red, green and blue.
    Axes { size: f32 },
    /// Square grid on the XZ plane.
    Grid { size: f32, divisions: u32 },
    SpotLight(SpotLightHelper),
}

const GRID_CENTER_COLOR: u32 = 0x444444;
const GRID_LINE_COLOR: u32 = 0x888888;

impl Helper {
    /// Segments of the helper in its object's local space (world space for
    /// the spot light cone).
    pub fn line_segments(&self) -> Vec<LineSegment> {
        match self {
            Helper::Axes { size } => vec![
                LineSegment::new(Vec3::ZERO, Vec3::X * *size, Color::from_hex(0xff0000)),
                LineSegment::new(Vec3::ZERO, Vec3::Y * *size, Color::from_hex(0x00ff00)),
                LineSegment::new(Vec3::ZERO, Vec3::Z * *size, Color::from_hex(0x0000ff)),
            ],
            Helper::Grid { size, divisions } => {
                let divisions = (*divisions).max(1);
                let half = size / 2.0;
                let step = size / divisions as f32;
                let mut segments = Vec::with_capacity(2 * (divisions as usize + 1));
                for i in 0..=divisions {
                    let k = -half + i as f32 * step;
                    let color = if i * 2 == divisions {
                        Color::from_hex(GRID_CENTER_COLOR)
                    } else {
                        Color::from_hex(GRID_LINE_COLOR)
                    };
                    segments.push(LineSegment::new(
                        Vec3::new(-half, 0.0, k),
                        Vec3::new(half, 0.0, k),
                        color,
                    ));
                    segments.push(LineSegment::new(
                        Vec3::new(k, 0.0, -half),
                        Vec3::new(k, 0.0, half),
                        color,
                    ));
                }
                segments
            }
            Helper::SpotLight(helper) => helper.cone().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_two_lines_per_division_boundary() {
        let grid = Helper::Grid {
            size: 30.0,
            divisions: 10,
        };
        let lines = grid.line_segments();
        assert_eq!(lines.len(), 22);
        assert!(lines.iter().all(|l| l.start.y == 0.0 && l.end.y == 0.0));
        assert!(lines.iter().any(|l| l.color == Color::from_hex(GRID_CENTER_COLOR)));
    }

    #[test]
    fn axes_have_requested_length() {
        let lines = Helper::Axes { size: 5.0 }.line_segments();
        assert_eq!(lines.len(), 3);
        for l in lines {
            assert_eq!(l.start.distance(l.end), 5.0);
        }
    }

    #[test]
    fn spot_factor_respects_penumbra() {
        let mut light = SpotLight {
            angle: 0.2,
            ..SpotLight::default()
        };
        assert_eq!(light.spot_factor(1.0), 1.0);
        assert_eq!(light.spot_factor(0.0), 0.0);

        light.penumbra = 1.0;
        let edge = light.spot_factor((0.19f32).cos());
        assert!(edge > 0.0 && edge < 1.0);
    }

    #[test]
    fn helper_cone_follows_angle() {
        let position = Vec3::new(-100.0, 100.0, 0.0);
        let mut light = SpotLight {
            angle: 0.2,
            ..SpotLight::default()
        };
        let mut helper = SpotLightHelper::new(ObjectId(1));
        helper.update(position, &light);
        assert_eq!(helper.cone().len(), 4 + CONE_RIM_SEGMENTS);
        let narrow = helper.cone()[0].end.distance(helper.cone()[2].end);

        light.angle = 0.6;
        helper.update(position, &light);
        let wide = helper.cone()[0].end.distance(helper.cone()[2].end);
        assert!(wide > narrow);
        assert!(helper.cone().iter().take(4).all(|l| l.start == position));
    }
}
