use etude_common::{Color, TextureHandle};
use serde::{Deserialize, Serialize};

/// Which faces of a mesh are drawn and picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// Unlit material, optionally textured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicMaterial {
    pub color: Color,
    pub map: Option<TextureHandle>,
    pub wireframe: bool,
    pub side: Side,
}

impl Default for BasicMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
            wireframe: false,
            side: Side::Front,
        }
    }
}

/// Lit material shaded by the scene lights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardMaterial {
    pub color: Color,
    pub wireframe: bool,
    pub side: Side,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            wireframe: false,
            side: Side::Front,
        }
    }
}

/// Material drawn with user-supplied WGSL vertex and fragment stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderMaterial {
    pub vertex_source: String,
    pub fragment_source: String,
    pub side: Side,
}

impl ShaderMaterial {
    /// Transforms by the model and view-projection matrices.
    pub const DEFAULT_VERTEX: &'static str = r#"
@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let world = draw.model * vec4<f32>(in.position, 1.0);
    var out: VertexOutput;
    out.clip_position = globals.view_proj * world;
    out.uv = in.uv;
    out.world_position = world.xyz;
    return out;
}
"#;

    /// Flat lavender.
    pub const DEFAULT_FRAGMENT: &'static str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(0.5, 0.5, 1.0, 1.0);
}
"#;

    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            side: Side::Front,
        }
    }
}

impl Default for ShaderMaterial {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VERTEX, Self::DEFAULT_FRAGMENT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Material {
    Basic(BasicMaterial),
    Standard(StandardMaterial),
    Shader(ShaderMaterial),
}

impl Material {
    /// Base color, if the material has one. Shader materials do not.
    pub fn color(&self) -> Option<Color> {
        match self {
            Material::Basic(m) => Some(m.color),
            Material::Standard(m) => Some(m.color),
            Material::Shader(_) => None,
        }
    }

    /// Set the base color. Returns false for materials without one.
    pub fn set_color(&mut self, color: Color) -> bool {
        match self {
            Material::Basic(m) => m.color = color,
            Material::Standard(m) => m.color = color,
            Material::Shader(_) => return false,
        }
        true
    }

    pub fn wireframe(&self) -> bool {
        match self {
            Material::Basic(m) => m.wireframe,
            Material::Standard(m) => m.wireframe,
            Material::Shader(_) => false,
        }
    }

    /// Set the wireframe flag. Returns false for shader materials.
    pub fn set_wireframe(&mut self, wireframe: bool) -> bool {
        match self {
            Material::Basic(m) => m.wireframe = wireframe,
            Material::Standard(m) => m.wireframe = wireframe,
            Material::Shader(_) => return false,
        }
        true
    }

    pub fn side(&self) -> Side {
        match self {
            Material::Basic(m) => m.side,
            Material::Standard(m) => m.side,
            Material::Shader(m) => m.side,
        }
    }

    pub fn map(&self) -> Option<TextureHandle> {
        match self {
            Material::Basic(m) => m.map,
            _ => None,
        }
    }
}

impl From<BasicMaterial> for Material {
    fn from(m: BasicMaterial) -> Self {
        Material::Basic(m)
    }
}

impl From<StandardMaterial> for Material {
    fn from(m: StandardMaterial) -> Self {
        Material::Standard(m)
    }
}

impl From<ShaderMaterial> for Material {
    fn from(m: ShaderMaterial) -> Self {
        Material::Shader(m)
    }
}

/// One material for the whole mesh, or one per geometry group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MaterialSlot {
    Single(Material),
    Multi(Vec<Material>),
}

impl MaterialSlot {
    /// Material used for a geometry group. Out-of-range indices on a
    /// multi-material fall back to its first entry.
    pub fn for_group(&self, material_index: usize) -> Option<&Material> {
        match self {
            MaterialSlot::Single(m) => Some(m),
            MaterialSlot::Multi(ms) => ms.get(material_index).or_else(|| ms.first()),
        }
    }

    /// The material addressed when the mesh is treated as a whole.
    pub fn primary(&self) -> Option<&Material> {
        self.for_group(0)
    }

    pub fn primary_mut(&mut self) -> Option<&mut Material> {
        match self {
            MaterialSlot::Single(m) => Some(m),
            MaterialSlot::Multi(ms) => ms.first_mut(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        let slice: &[Material] = match self {
            MaterialSlot::Single(m) => std::slice::from_ref(m),
            MaterialSlot::Multi(ms) => ms,
        };
        slice.iter()
    }
}

impl From<Material> for MaterialSlot {
    fn from(m: Material) -> Self {
        MaterialSlot::Single(m)
    }
}

impl From<BasicMaterial> for MaterialSlot {
    fn from(m: BasicMaterial) -> Self {
        MaterialSlot::Single(m.into())
    }
}

impl From<StandardMaterial> for MaterialSlot {
    fn from(m: StandardMaterial) -> Self {
        MaterialSlot::Single(m.into())
    }
}

impl From<ShaderMaterial> for MaterialSlot {
    fn from(m: ShaderMaterial) -> Self {
        MaterialSlot::Single(m.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_material_has_no_color() {
        let mut m = Material::Shader(ShaderMaterial::new("", ""));
        assert_eq!(m.color(), None);
        assert!(!m.set_color(Color::WHITE));
        assert!(!m.set_wireframe(true));
    }

    #[test]
    fn default_shader_defines_entry_points() {
        let m = ShaderMaterial::default();
        assert!(m.vertex_source.contains("fn vs_main"));
        assert!(m.fragment_source.contains("fn fs_main"));
        assert_eq!(m.side, Side::Front);
    }

    #[test]
    fn set_color_and_wireframe() {
        let mut m = Material::from(StandardMaterial::default());
        assert!(m.set_color(Color::from_hex(0xff0000)));
        assert!(m.set_wireframe(true));
        assert_eq!(m.color(), Some(Color::from_hex(0xff0000)));
        assert!(m.wireframe());
    }

    #[test]
    fn multi_slot_resolves_groups() {
        let slot = MaterialSlot::Multi(vec![
            BasicMaterial {
                map: Some(TextureHandle(1)),
                ..BasicMaterial::default()
            }
            .into(),
            BasicMaterial {
                map: Some(TextureHandle(2)),
                ..BasicMaterial::default()
            }
            .into(),
        ]);
        assert_eq!(slot.for_group(1).and_then(Material::map), Some(TextureHandle(2)));
        assert_eq!(slot.for_group(9).and_then(Material::map), Some(TextureHandle(1)));
        assert_eq!(slot.iter().count(), 2);
    }
}
