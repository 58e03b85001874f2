use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f32::consts::PI;

/// What a geometry was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GeometryKind {
    Box { width: f32, height: f32, depth: f32 },
    Plane { width: f32, height: f32, width_segments: u32, height_segments: u32 },
    Sphere { radius: f32, width_segments: u32, height_segments: u32 },
    Mesh,
}

/// A contiguous index range drawn with one entry of a multi-material slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryGroup {
    pub start: u32,
    pub count: u32,
    pub material_index: usize,
}

/// Indexed triangle geometry.
///
/// UVs use image space: `(0, 0)` is the top-left texel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    kind: GeometryKind,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
    groups: Vec<GeometryGroup>,
}

impl Geometry {
    /// Axis-aligned box centred on the origin. Emits one group per face in
    /// the order +X, -X, +Y, -Y, +Z, -Z.
    pub fn box_geometry(width: f32, height: f32, depth: f32) -> Self {
        let mut g = Self::empty(GeometryKind::Box { width, height, depth });
        let (hw, hh, hd) = (width / 2.0, height / 2.0, depth / 2.0);
        // (normal, u axis, v axis, half extent along normal, face width, face height)
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y, hw, depth, height),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y, hw, depth, height),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z, hh, width, depth),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z, hh, width, depth),
            (Vec3::Z, Vec3::X, Vec3::Y, hd, width, height),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y, hd, width, height),
        ];
        for (material_index, (normal, u, v, offset, fw, fh)) in faces.into_iter().enumerate() {
            let start = g.indices.len() as u32;
            g.push_grid(normal * offset, u, v, normal, fw, fh, 1, 1);
            g.groups.push(GeometryGroup {
                start,
                count: g.indices.len() as u32 - start,
                material_index,
            });
        }
        g
    }

    /// Plane in the XY plane facing +Z. The first vertex is the top-left
    /// corner and the last is the bottom-right corner.
    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(1);
        let height_segments = height_segments.max(1);
        let mut g = Self::empty(GeometryKind::Plane {
            width,
            height,
            width_segments,
            height_segments,
        });
        g.push_grid(
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::Z,
            width,
            height,
            width_segments,
            height_segments,
        );
        g
    }

    /// UV sphere. Segment counts are clamped to at least 3 and 2.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);
        let mut g = Self::empty(GeometryKind::Sphere {
            radius,
            width_segments: ws,
            height_segments: hs,
        });

        let mut grid = Vec::with_capacity(hs as usize + 1);
        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            let mut row = Vec::with_capacity(ws as usize + 1);
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let p = Vec3::new(
                    -radius * (u * 2.0 * PI).cos() * (v * PI).sin(),
                    radius * (v * PI).cos(),
                    radius * (u * 2.0 * PI).sin() * (v * PI).sin(),
                );
                row.push(g.positions.len() as u32);
                g.positions.push(p.to_array());
                g.normals.push(p.normalize_or_zero().to_array());
                g.uvs.push([u, v]);
            }
            grid.push(row);
        }

        for iy in 0..hs as usize {
            for ix in 0..ws as usize {
                let a = grid[iy][ix + 1];
                let b = grid[iy][ix];
                let c = grid[iy + 1][ix];
                let d = grid[iy + 1][ix + 1];
                if iy != 0 {
                    g.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs as usize - 1 {
                    g.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        g
    }

    /// Geometry from raw mesh data. Missing normals are computed from faces;
    /// missing UVs default to zero; a missing index list means sequential
    /// triangles. Triangles referencing a vertex past the end are dropped.
    pub fn from_mesh(
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        uvs: Option<Vec<[f32; 2]>>,
        indices: Option<Vec<u32>>,
    ) -> Self {
        let n = positions.len();
        let mut indices = indices.unwrap_or_else(|| (0..n as u32).collect());
        let total = indices.len() / 3;
        indices = indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| (i as usize) < n))
            .flatten()
            .copied()
            .collect();
        if indices.len() / 3 != total {
            tracing::warn!(
                dropped = total - indices.len() / 3,
                vertices = n,
                "dropping triangles with out-of-range indices"
            );
        }
        let mut g = Self {
            kind: GeometryKind::Mesh,
            positions,
            normals: Vec::new(),
            uvs: uvs.filter(|u| u.len() == n).unwrap_or_else(|| vec![[0.0, 0.0]; n]),
            indices,
            groups: Vec::new(),
        };
        match normals {
            Some(normals) if normals.len() == n => g.normals = normals,
            _ => g.compute_vertex_normals(),
        }
        g
    }

    fn empty(kind: GeometryKind) -> Self {
        Self {
            kind,
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Append a segmented rectangle centred on `center`, spanned by `u`
    /// (left to right) and `v` (bottom to top). `u x v` must equal `normal`
    /// so triangles wind counter-clockwise seen from the front.
    #[allow(clippy::too_many_arguments)]
    fn push_grid(
        &mut self,
        center: Vec3,
        u: Vec3,
        v: Vec3,
        normal: Vec3,
        width: f32,
        height: f32,
        segments_u: u32,
        segments_v: u32,
    ) {
        let base = self.positions.len() as u32;
        let columns = segments_u + 1;
        for iy in 0..=segments_v {
            let ty = iy as f32 / segments_v as f32;
            for ix in 0..=segments_u {
                let tx = ix as f32 / segments_u as f32;
                let p = center + u * ((tx - 0.5) * width) + v * ((0.5 - ty) * height);
                self.positions.push(p.to_array());
                self.normals.push(normal.to_array());
                self.uvs.push([tx, ty]);
            }
        }
        for iy in 0..segments_v {
            for ix in 0..segments_u {
                let a = base + ix + columns * iy;
                let b = base + ix + columns * (iy + 1);
                let c = base + ix + 1 + columns * (iy + 1);
                let d = base + ix + 1 + columns * iy;
                self.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }

    /// Recompute smooth vertex normals from the triangle list.
    pub fn compute_vertex_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (pa, pb, pc) = (
                Vec3::from(self.positions[a]),
                Vec3::from(self.positions[b]),
                Vec3::from(self.positions[c]),
            );
            let face = (pb - pa).cross(pc - pa);
            acc[a] += face;
            acc[b] += face;
            acc[c] += face;
        }
        self.normals = acc
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect();
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn groups(&self) -> &[GeometryGroup] {
        &self.groups
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Length of the position array viewed as flat `x, y, z, x, y, z, ...`.
    pub fn flat_len(&self) -> usize {
        self.positions.len() * 3
    }

    /// Add `delta` to one component of the flat position array.
    /// Returns false if the index is out of range.
    pub fn offset_component(&mut self, flat_index: usize, delta: f32) -> bool {
        match self.positions.get_mut(flat_index / 3) {
            Some(p) => {
                p[flat_index % 3] += delta;
                true
            }
            None => false,
        }
    }

    /// Unique undirected edges of all triangles, as index pairs.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut set = BTreeSet::new();
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                set.insert([a.min(b), a.max(b)]);
            }
        }
        set.into_iter().collect()
    }

    /// Centre of the bounding box and the radius that encloses every vertex.
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        if self.positions.is_empty() {
            return (Vec3::ZERO, 0.0);
        }
        let (min, max) = self.positions.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), p| (min.min(Vec3::from(*p)), max.max(Vec3::from(*p))),
        );
        let center = (min + max) * 0.5;
        let radius = self
            .positions
            .iter()
            .map(|p| center.distance(Vec3::from(*p)))
            .fold(0.0, f32::max);
        (center, radius)
    }

    /// UV of a vertex as a `Vec2`.
    pub fn uv(&self, index: usize) -> Vec2 {
        Vec2::from(self.uvs[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(g: &Geometry, tri: &[u32]) -> Vec3 {
        let p = |i: u32| Vec3::from(g.positions()[i as usize]);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0])).normalize()
    }

    #[test]
    fn box_has_six_groups_of_two_triangles() {
        let g = Geometry::box_geometry(1.0, 1.0, 1.0);
        assert_eq!(g.vertex_count(), 24);
        assert_eq!(g.triangle_count(), 12);
        assert_eq!(g.groups().len(), 6);
        for (i, group) in g.groups().iter().enumerate() {
            assert_eq!(group.material_index, i);
            assert_eq!(group.count, 6);
            assert_eq!(group.start, i as u32 * 6);
        }
    }

    #[test]
    fn box_faces_wind_outward() {
        let g = Geometry::box_geometry(4.0, 4.0, 4.0);
        for tri in g.indices().chunks_exact(3) {
            let n = face_normal(&g, tri);
            let stored = Vec3::from(g.normals()[tri[0] as usize]);
            assert!(n.abs_diff_eq(stored, 1e-5), "{n} vs {stored}");
        }
    }

    #[test]
    fn plane_corner_order() {
        let g = Geometry::plane(10.0, 10.0, 10, 10);
        assert_eq!(g.vertex_count(), 121);
        assert_eq!(g.triangle_count(), 200);
        assert_eq!(g.positions()[0], [-5.0, 5.0, 0.0]);
        assert_eq!(*g.positions().last().unwrap(), [5.0, -5.0, 0.0]);
        assert_eq!(g.flat_len(), 363);
    }

    #[test]
    fn plane_faces_point_along_z() {
        let g = Geometry::plane(2.0, 2.0, 1, 1);
        for tri in g.indices().chunks_exact(3) {
            assert!(face_normal(&g, tri).abs_diff_eq(Vec3::Z, 1e-6));
        }
    }

    #[test]
    fn offset_component_edits_flat_array() {
        let mut g = Geometry::plane(10.0, 10.0, 10, 10);
        let last = g.flat_len() - 1;
        assert!(g.offset_component(0, -1.0));
        assert!(g.offset_component(last, -2.0));
        assert!(!g.offset_component(last + 1, 1.0));
        assert_eq!(g.positions()[0][0], -6.0);
        assert_eq!(g.positions().last().unwrap()[2], -2.0);
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let g = Geometry::sphere(4.0, 30, 30);
        assert_eq!(g.vertex_count(), 31 * 31);
        // Poles contribute one triangle per segment instead of two.
        assert_eq!(g.triangle_count(), 30 * 30 * 2 - 2 * 30);
        for p in g.positions() {
            assert!((Vec3::from(*p).length() - 4.0).abs() < 1e-4);
        }
        let (center, radius) = g.bounding_sphere();
        assert!(center.length() < 1e-4);
        assert!((radius - 4.0).abs() < 1e-3);
    }

    #[test]
    fn mesh_without_normals_gets_computed_normals() {
        let g = Geometry::from_mesh(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
            None,
        );
        assert_eq!(g.kind(), GeometryKind::Mesh);
        assert_eq!(g.indices(), &[0, 1, 2]);
        for n in g.normals() {
            assert_eq!(*n, [0.0, 0.0, 1.0]);
        }
        assert_eq!(g.uvs().len(), 3);
    }

    #[test]
    fn mesh_drops_triangles_past_the_vertex_list() {
        let g = Geometry::from_mesh(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
            Some(vec![0, 1, 2, 0, 1, 7, 2]),
        );
        assert_eq!(g.indices(), &[0, 1, 2]);
        assert_eq!(g.triangle_count(), 1);
        assert_eq!(g.normals().len(), 3);
        assert!(g.edges().iter().flatten().all(|&i| i < 3));
    }

    #[test]
    fn edges_are_unique() {
        let g = Geometry::plane(1.0, 1.0, 1, 1);
        // Two triangles sharing a diagonal: 5 unique edges.
        assert_eq!(g.edges().len(), 5);
    }
}
