//! Picking: camera rays and ray/mesh intersection.
//!
//! Meshes are tested triangle by triangle in object space after a
//! bounding-sphere rejection. Lights and helpers never produce hits.

mod ray;
mod raycaster;

pub use ray::{Ray, TriangleHit};
pub use raycaster::{Intersection, Raycaster};
