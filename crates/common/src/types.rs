use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Identifier for an object in a scene.
///
/// Ids are handed out sequentially by the scene that owns the object, so
/// ordering by id is insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Content-addressed handle to a texture in a texture store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

/// Spatial transform: position, Euler rotation (XYZ order, radians), scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Local-to-world matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

/// Error returned when parsing a CSS-style hex color fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex color: {0:?}")]
pub struct ColorParseError(pub String);

/// RGB color with sRGB-encoded channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build a color from a packed `0xRRGGBB` value.
    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_hex(self) -> u32 {
        let [r, g, b] = self.to_srgb8();
        (r as u32) << 16 | (g as u32) << 8 | b as u32
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn parse(s: &str) -> Result<Self, ColorParseError> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 {
            return Err(ColorParseError(s.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Self::from_hex)
            .map_err(|_| ColorParseError(s.to_string()))
    }

    pub fn to_css(self) -> String {
        format!("#{:06x}", self.to_hex())
    }

    pub fn to_srgb8(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    pub fn from_srgb8(rgb: [u8; 3]) -> Self {
        Self::rgb(
            rgb[0] as f32 / 255.0,
            rgb[1] as f32 / 255.0,
            rgb[2] as f32 / 255.0,
        )
    }

    /// Linear-light RGBA, for shading on an sRGB surface.
    pub fn to_linear_rgba(self) -> [f32; 4] {
        let lin = |c: f32| {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        [lin(self.r), lin(self.g), lin(self.b), 1.0]
    }

    /// Inverse of [`Color::to_linear_rgba`]; alpha is dropped.
    pub fn from_linear(rgb: [f32; 3]) -> Self {
        let enc = |c: f32| {
            let c = c.clamp(0.0, 1.0);
            if c <= 0.0031308 {
                c * 12.92
            } else {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            }
        };
        Self::rgb(enc(rgb[0]), enc(rgb[1]), enc(rgb[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        assert!(t.matrix().abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn transform_matrix_applies_translation() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let p = t.matrix().transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn rotation_about_x_turns_y_into_z() {
        let t = Transform {
            rotation: Vec3::new(std::f32::consts::FRAC_PI_2, 0.0, 0.0),
            ..Transform::default()
        };
        let p = t.matrix().transform_point3(Vec3::Y);
        assert!(p.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn hex_round_trip() {
        for hex in [0x000000, 0xffea00, 0x0fffff, 0xff0000] {
            assert_eq!(Color::from_hex(hex).to_hex(), hex);
        }
    }

    #[test]
    fn parse_css_colors() {
        assert_eq!(Color::parse("#ffea00").unwrap().to_hex(), 0xffea00);
        assert_eq!(Color::parse("00ff00").unwrap().to_hex(), 0x00ff00);
        assert!(Color::parse("#fff").is_err());
        assert!(Color::parse("#gggggg").is_err());
        assert_eq!(Color::from_hex(0xffea00).to_css(), "#ffea00");
    }

    #[test]
    fn linear_conversion_keeps_endpoints() {
        assert_eq!(Color::WHITE.to_linear_rgba(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(Color::BLACK.to_linear_rgba(), [0.0, 0.0, 0.0, 1.0]);
        let mid = Color::rgb(0.5, 0.5, 0.5).to_linear_rgba();
        assert!(mid[0] > 0.2 && mid[0] < 0.25);
        let back = Color::from_linear([mid[0], mid[1], mid[2]]);
        assert!((back.r - 0.5).abs() < 1e-4);
    }
}
