use etude_scene::Side;
use glam::{Mat4, Vec3};

const DET_EPSILON: f32 = 1e-9;

/// Half-line `origin + t * direction` for `t >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Barycentric hit on a triangle: ray parameter and weights of `b` and `c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

impl Ray {
    /// A ray with a normalized direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or(Vec3::NEG_Z),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Apply an affine matrix. The direction is not renormalized so that
    /// ray parameters stay comparable across spaces.
    pub fn transformed(&self, matrix: Mat4) -> Self {
        Self {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
        }
    }

    /// Whether the ray passes within `radius` of `center` ahead of its origin.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let to_center = center - self.origin;
        let len2 = self.direction.length_squared();
        if len2 == 0.0 {
            return false;
        }
        let along = to_center.dot(self.direction) / len2;
        let closest = if along < 0.0 { self.origin } else { self.at(along) };
        closest.distance_squared(center) <= radius * radius
    }

    /// Möller–Trumbore intersection honoring face orientation. Counter-
    /// clockwise triangles face the viewer.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3, side: Side) -> Option<TriangleHit> {
        let e1 = b - a;
        let e2 = c - a;
        let p = self.direction.cross(e2);
        let det = e1.dot(p);
        let facing = match side {
            Side::Front => det > DET_EPSILON,
            Side::Back => det < -DET_EPSILON,
            Side::Double => det.abs() > DET_EPSILON,
        };
        if !facing {
            return None;
        }
        let inv = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = self.direction.dot(q) * inv;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv;
        (t >= 0.0).then_some(TriangleHit { t, u, v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> (Vec3, Vec3, Vec3) {
        (
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn front_face_hit() {
        let (a, b, c) = tri();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let hit = ray.intersect_triangle(a, b, c, Side::Front).unwrap();
        assert!((hit.t - 5.0).abs() < 1e-6);
    }

    #[test]
    fn back_face_culled_unless_double() {
        let (a, b, c) = tri();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(ray.intersect_triangle(a, b, c, Side::Front).is_none());
        assert!(ray.intersect_triangle(a, b, c, Side::Back).is_some());
        assert!(ray.intersect_triangle(a, b, c, Side::Double).is_some());
    }

    #[test]
    fn miss_outside_and_behind() {
        let (a, b, c) = tri();
        let outside = Ray::new(Vec3::new(5.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(outside.intersect_triangle(a, b, c, Side::Double).is_none());
        let behind = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert!(behind.intersect_triangle(a, b, c, Side::Double).is_none());
    }

    #[test]
    fn sphere_test() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(ray.intersects_sphere(Vec3::new(10.0, 0.5, 0.0), 1.0));
        assert!(!ray.intersects_sphere(Vec3::new(10.0, 5.0, 0.0), 1.0));
        assert!(!ray.intersects_sphere(Vec3::new(-10.0, 0.0, 0.0), 1.0));
        assert!(ray.intersects_sphere(Vec3::new(-0.5, 0.0, 0.0), 1.0));
    }

    #[test]
    fn transformed_keeps_parameterization() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let m = Mat4::from_scale(Vec3::splat(2.0));
        let local = ray.transformed(m.inverse());
        let world_at = ray.at(4.0);
        let local_at = m.transform_point3(local.at(4.0));
        assert!(world_at.abs_diff_eq(local_at, 1e-5));
    }
}
