use bytemuck::{Pod, Zeroable};
use etude_common::Color;
use etude_scene::{Fog, Light, Material, ObjectKind, PerspectiveCamera, Scene};
use glam::Mat4;

pub(crate) const FOG_NONE: f32 = 0.0;
pub(crate) const FOG_LINEAR: f32 = 1.0;
pub(crate) const FOG_EXP2: f32 = 2.0;

/// Per-frame values shared by every pipeline (group 0).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub fog_color: [f32; 4],
    /// mode, near or density, far, time in seconds
    pub fog: [f32; 4],
    /// w is 1 when a spot light is present
    pub light_position: [f32; 4],
    /// w is the cosine of the outer cone
    pub light_direction: [f32; 4],
    /// rgb premultiplied by intensity, w is the cosine of the inner cone
    pub light_color: [f32; 4],
}

impl Globals {
    pub fn new(camera: &PerspectiveCamera, scene: &Scene, time: f32) -> Self {
        let view_proj = camera.view_projection();
        let (fog_color, fog) = match scene.fog() {
            None => ([0.0; 4], [FOG_NONE, 0.0, 0.0, time]),
            Some(Fog::Linear { color, near, far }) => {
                (color.to_linear_rgba(), [FOG_LINEAR, near, far, time])
            }
            Some(Fog::Exp2 { color, density }) => {
                (color.to_linear_rgba(), [FOG_EXP2, density, 0.0, time])
            }
        };
        let mut globals = Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            fog_color,
            fog,
            light_position: [0.0; 4],
            light_direction: [0.0, -1.0, 0.0, 1.0],
            light_color: [0.0, 0.0, 0.0, 1.0],
        };

        let spot = scene.objects().find_map(|o| match &o.kind {
            ObjectKind::Light(Light::Spot(light)) => Some((o.transform.position, light)),
            _ => None,
        });
        if let Some((position, light)) = spot {
            let [r, g, b, _] = light.color.to_linear_rgba();
            globals.light_position = position.extend(1.0).to_array();
            globals.light_direction = light.direction(position).extend(light.cos_outer()).to_array();
            globals.light_color = [
                r * light.intensity,
                g * light.intensity,
                b * light.intensity,
                light.cos_inner(),
            ];
        }
        globals
    }
}

pub(crate) const SHADING_UNLIT: f32 = 0.0;
pub(crate) const SHADING_LIT: f32 = 1.0;

/// Per-draw values (group 1, dynamic offset).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// x is the shading model
    pub params: [f32; 4],
}

impl DrawUniform {
    pub fn new(model: Mat4, material: &Material) -> Self {
        let shading = match material {
            Material::Standard(_) => SHADING_LIT,
            Material::Basic(_) | Material::Shader(_) => SHADING_UNLIT,
        };
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            color: material.color().unwrap_or(Color::WHITE).to_linear_rgba(),
            params: [shading, 0.0, 0.0, 0.0],
        }
    }
}

/// Round `size` up to the device's dynamic offset alignment.
pub(crate) fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}
