use crate::ray::Ray;
use etude_common::ObjectId;
use etude_scene::{Mesh, PerspectiveCamera, Scene};
use glam::{Mat4, Vec2, Vec3};

/// One ray/triangle hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// World-space distance from the ray origin.
    pub distance: f32,
    pub point: Vec3,
    pub object: ObjectId,
    /// Index of the mesh within the object (model parts); 0 for plain meshes.
    pub part: usize,
    pub face_index: usize,
    pub uv: Vec2,
}

/// Casts rays into a scene.
#[derive(Debug, Clone)]
pub struct Raycaster {
    pub ray: Ray,
    pub near: f32,
    pub far: f32,
}

impl Default for Raycaster {
    fn default() -> Self {
        Self {
            ray: Ray::new(Vec3::ZERO, Vec3::NEG_Z),
            near: 0.0,
            far: f32::INFINITY,
        }
    }
}

impl Raycaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aim the ray from the camera through a normalized device coordinate.
    pub fn set_from_camera(&mut self, ndc: Vec2, camera: &PerspectiveCamera) {
        let through = camera.unproject(ndc, 0.5);
        self.ray = Ray::new(camera.position, through - camera.position);
    }

    /// Intersect every mesh and model part in the scene. Lights and helpers
    /// are not pickable. Results are sorted by ascending distance.
    pub fn intersect_objects(&self, scene: &Scene) -> Vec<Intersection> {
        let mut hits = Vec::new();
        for object in scene.objects() {
            for (part, (matrix, mesh)) in object.world_meshes().into_iter().enumerate() {
                self.intersect_mesh(object.id, part, matrix, mesh, &mut hits);
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        tracing::trace!(hits = hits.len(), "ray cast");
        hits
    }

    fn intersect_mesh(
        &self,
        object: ObjectId,
        part: usize,
        matrix: Mat4,
        mesh: &Mesh,
        out: &mut Vec<Intersection>,
    ) {
        let geometry = &mesh.geometry;
        let (center, radius) = geometry.bounding_sphere();
        let (scale, _, _) = matrix.to_scale_rotation_translation();
        if !self
            .ray
            .intersects_sphere(matrix.transform_point3(center), radius * scale.abs().max_element())
        {
            return;
        }

        let local = self.ray.transformed(matrix.inverse());
        let side = mesh.side();
        let positions = geometry.positions();
        for (face_index, tri) in geometry.indices().chunks_exact(3).enumerate() {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let Some(hit) = local.intersect_triangle(
                Vec3::from(positions[a]),
                Vec3::from(positions[b]),
                Vec3::from(positions[c]),
                side,
            ) else {
                continue;
            };
            // The world ray is unit length and shares the parameter.
            let distance = hit.t;
            if distance < self.near || distance > self.far {
                continue;
            }
            let uv = geometry.uv(a) * (1.0 - hit.u - hit.v)
                + geometry.uv(b) * hit.u
                + geometry.uv(c) * hit.v;
            out.push(Intersection {
                distance,
                point: self.ray.at(distance),
                object,
                part,
                face_index,
                uv,
            });
        }
    }
}
