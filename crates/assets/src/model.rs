use crate::AssetError;
use etude_common::Color;
use etude_scene::{Geometry, Mesh, Model, ModelPart, StandardMaterial};
use glam::Mat4;
use std::path::Path;

/// Vertex data of one glTF primitive with its accumulated node matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPartData {
    pub name: String,
    /// Transform relative to the model root.
    pub local: Mat4,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Option<Vec<u32>>,
    /// Linear RGBA base color factor.
    pub base_color: [f32; 4],
}

/// A decoded model, flattened to a list of parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub source: String,
    pub parts: Vec<ModelPartData>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.positions.len()).sum()
    }

    /// Convert into a scene model with one lit mesh per part.
    pub fn into_model(self) -> Model {
        let parts = self
            .parts
            .into_iter()
            .map(|part| {
                let [r, g, b, _] = part.base_color;
                let geometry = Geometry::from_mesh(part.positions, part.normals, part.uvs, part.indices);
                let material = StandardMaterial {
                    color: Color::from_linear([r, g, b]),
                    ..StandardMaterial::default()
                };
                ModelPart {
                    name: part.name,
                    local: part.local,
                    mesh: Mesh::new(geometry, material),
                }
            })
            .collect();
        Model {
            source: self.source,
            parts,
        }
    }
}

/// Read a `.gltf` or `.glb` file and flatten the node hierarchy of its
/// default scene. Non-triangle primitives are skipped; an index pointing
/// past a primitive's vertices fails the whole load.
pub fn load_model(path: impl AsRef<Path>) -> Result<ModelData, AssetError> {
    let path = path.as_ref();
    let (doc, buffers, _images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;
    let scene = doc
        .default_scene()
        .or_else(|| doc.scenes().next())
        .ok_or_else(|| AssetError::NoScene(path.to_path_buf()))?;

    let mut parts = Vec::new();
    for node in scene.nodes() {
        collect_node(path, &node, Mat4::IDENTITY, &buffers, &mut parts)?;
    }
    if parts.is_empty() {
        return Err(AssetError::EmptyModel(path.to_path_buf()));
    }
    tracing::debug!(path = %path.display(), parts = parts.len(), "model decoded");
    Ok(ModelData {
        source: path.display().to_string(),
        parts,
    })
}

fn collect_node(
    path: &Path,
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<ModelPartData>,
) -> Result<(), AssetError> {
    let local = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        let base_name = node
            .name()
            .or_else(|| mesh.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("node{}", node.index()));
        for (i, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                tracing::debug!(node = %base_name, mode = ?primitive.mode(), "skipping primitive");
                continue;
            }
            let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let name = if i == 0 {
                base_name.clone()
            } else {
                format!("{base_name}.{i}")
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let indices: Option<Vec<u32>> = reader.read_indices().map(|i| i.into_u32().collect());
            if let Some(&index) = indices
                .iter()
                .flatten()
                .find(|&&i| i as usize >= positions.len())
            {
                return Err(AssetError::InvalidIndices {
                    path: path.to_path_buf(),
                    part: name,
                    index,
                    vertices: positions.len(),
                });
            }
            out.push(ModelPartData {
                name,
                local,
                positions,
                normals: reader.read_normals().map(Iterator::collect),
                uvs: reader.read_tex_coords(0).map(|t| t.into_f32().collect()),
                indices,
                base_color: primitive
                    .material()
                    .pbr_metallic_roughness()
                    .base_color_factor(),
            });
        }
    }
    for child in node.children() {
        collect_node(path, &child, local, buffers, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    /// One triangle whose u32 index buffer is `[0, 1, 7]` over three
    /// positions.
    fn write_gltf_with_bad_index(dir: &Path) -> std::path::PathBuf {
        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u32, 1, 7] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        std::fs::write(dir.join("bad.bin"), &bin).unwrap();
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [{"name": "bad", "mesh": 0}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
            "buffers": [{"uri": "bad.bin", "byteLength": 48}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 36},
                {"buffer": 0, "byteOffset": 36, "byteLength": 12}
            ],
            "accessors": [
                {
                    "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                    "min": [0, 0, 0], "max": [1, 1, 0]
                },
                {"bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR"}
            ]
        }"#;
        let path = dir.join("bad.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    /// A node with a child holding one red triangle, backed by `tri.bin`.
    fn write_gltf(dir: &Path) -> std::path::PathBuf {
        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        std::fs::write(dir.join("tri.bin"), &bin).unwrap();
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [
                {"name": "root", "translation": [0, 2, 0], "children": [1]},
                {"name": "head", "mesh": 0, "translation": [1, 0, 0]}
            ],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "material": 0}]}],
            "materials": [{"pbrMetallicRoughness": {"baseColorFactor": [1, 0, 0, 1]}}],
            "buffers": [{"uri": "tri.bin", "byteLength": 36}],
            "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 36}],
            "accessors": [{
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0, 0, 0], "max": [1, 1, 0]
            }]
        }"#;
        let path = dir.join("tri.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn loads_and_flattens_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gltf(dir.path());
        let data = load_model(&path).unwrap();
        assert_eq!(data.parts.len(), 1);
        let part = &data.parts[0];
        assert_eq!(part.name, "head");
        assert_eq!(part.positions.len(), 3);
        assert!(part.normals.is_none());
        assert_eq!(part.base_color, [1.0, 0.0, 0.0, 1.0]);
        let origin = part.local.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn converts_into_scene_model() {
        let dir = tempfile::tempdir().unwrap();
        let data = load_model(write_gltf(dir.path())).unwrap();
        assert_eq!(data.vertex_count(), 3);
        let model = data.into_model();
        assert_eq!(model.parts.len(), 1);
        let mesh = &model.parts[0].mesh;
        assert_eq!(mesh.geometry.triangle_count(), 1);
        assert_eq!(mesh.geometry.normals().len(), 3);
        let color = mesh.material.primary().and_then(|m| m.color()).unwrap();
        assert_eq!(color.to_hex(), 0xff0000);
    }

    #[test]
    fn index_past_vertex_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(write_gltf_with_bad_index(dir.path())).unwrap_err();
        let AssetError::InvalidIndices { part, index, vertices, .. } = &err else {
            panic!("expected InvalidIndices, got {err}");
        };
        assert_eq!((part.as_str(), *index, *vertices), ("bad", 7, 3));
        assert!(err.to_string().contains("bad.gltf"));
    }

    #[test]
    fn missing_file_is_gltf_error() {
        let err = load_model("/nonexistent/monkey.glb").unwrap_err();
        assert!(matches!(err, AssetError::Gltf { .. }));
        assert!(err.to_string().contains("monkey.glb"));
    }

    #[test]
    fn scene_without_meshes_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.gltf");
        std::fs::write(
            &path,
            r#"{"asset": {"version": "2.0"}, "scenes": [{"nodes": [0]}], "nodes": [{"name": "n"}]}"#,
        )
        .unwrap();
        assert!(matches!(load_model(&path), Err(AssetError::EmptyModel(_))));
    }
}
