//! Scene model for the etude demo.
//!
//! A scene is a flat set of top-level objects (meshes, a loaded model,
//! lights and line helpers) plus background and fog. Geometry is generated
//! on the CPU so picking and drawing read the same vertex data.
//!
//! # Invariants
//! - Object ids are sequential; iteration order is insertion order.
//! - Every insertion and removal is recorded in the event log.

mod camera;
mod geometry;
mod light;
mod material;
mod rng;
mod scene;

pub use camera::{OrbitControls, PerspectiveCamera};
pub use geometry::{Geometry, GeometryGroup, GeometryKind};
pub use light::{Helper, Light, LineSegment, SpotLight, SpotLightHelper};
pub use material::{BasicMaterial, Material, MaterialSlot, ShaderMaterial, Side, StandardMaterial};
pub use rng::SeededRng;
pub use scene::{
    Background, Fog, Mesh, Model, ModelPart, ObjectKind, Scene, SceneEvent, SceneObject,
};
