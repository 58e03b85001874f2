use bytemuck::{Pod, Zeroable};
use etude_common::Color;
use etude_scene::{Geometry, Helper, Material, Mesh, ObjectKind, Scene};
use glam::Mat4;
use std::ops::Range;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

pub(crate) fn mesh_vertices(geometry: &Geometry) -> Vec<Vertex> {
    geometry
        .positions()
        .iter()
        .zip(geometry.normals())
        .zip(geometry.uvs())
        .map(|((p, n), uv)| Vertex {
            position: *p,
            normal: *n,
            uv: *uv,
        })
        .collect()
}

/// Index range of a mesh drawn with one material.
#[derive(Debug)]
pub(crate) struct DrawRange<'a> {
    pub indices: Range<u32>,
    pub material: &'a Material,
}

/// Split a mesh into per-material index ranges. Geometry without groups is
/// drawn whole with the primary material.
pub(crate) fn draw_ranges(mesh: &Mesh) -> Vec<DrawRange<'_>> {
    let groups = mesh.geometry.groups();
    if groups.is_empty() {
        return mesh
            .material
            .primary()
            .map(|material| DrawRange {
                indices: 0..mesh.geometry.indices().len() as u32,
                material,
            })
            .into_iter()
            .collect();
    }
    groups
        .iter()
        .filter_map(|g| {
            mesh.material.for_group(g.material_index).map(|material| DrawRange {
                indices: g.start..g.start + g.count,
                material,
            })
        })
        .collect()
}

fn push_line(out: &mut Vec<LineVertex>, matrix: Mat4, a: glam::Vec3, b: glam::Vec3, color: Color) {
    let color = color.to_linear_rgba();
    for p in [a, b] {
        out.push(LineVertex {
            position: matrix.transform_point3(p).to_array(),
            color,
        });
    }
}

/// World-space edges of a mesh drawn as wireframe.
pub(crate) fn wireframe_lines(matrix: Mat4, geometry: &Geometry, color: Color, out: &mut Vec<LineVertex>) {
    let positions = geometry.positions();
    for [a, b] in geometry.edges() {
        push_line(
            out,
            matrix,
            positions[a as usize].into(),
            positions[b as usize].into(),
            color,
        );
    }
}

/// World-space segments of a helper.
pub(crate) fn helper_lines(matrix: Mat4, helper: &Helper, out: &mut Vec<LineVertex>) {
    // Spot light cones are already in world space.
    let matrix = match helper {
        Helper::SpotLight(_) => Mat4::IDENTITY,
        _ => matrix,
    };
    for seg in helper.line_segments() {
        push_line(out, matrix, seg.start, seg.end, seg.color);
    }
}

/// Every line primitive in the scene: helpers plus wireframe meshes.
pub(crate) fn scene_lines(scene: &Scene) -> Vec<LineVertex> {
    let mut out = Vec::new();
    for object in scene.objects() {
        if let ObjectKind::Helper(helper) = &object.kind {
            helper_lines(object.matrix(), helper, &mut out);
            continue;
        }
        for (matrix, mesh) in object.world_meshes() {
            let Some(material) = mesh.material.primary() else {
                continue;
            };
            if material.wireframe() {
                let color = material.color().unwrap_or(Color::WHITE);
                wireframe_lines(matrix, &mesh.geometry, color, &mut out);
            }
        }
    }
    out
}
