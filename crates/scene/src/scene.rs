use crate::geometry::Geometry;
use crate::light::{Helper, Light};
use crate::material::{MaterialSlot, Side};
use etude_common::{Color, ObjectId, TextureHandle, Transform};
use glam::Mat4;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A record produced by every structural mutation to the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEvent {
    /// Object was inserted.
    Added { id: ObjectId, name: String },
    /// Object was removed.
    Removed { id: ObjectId },
}

/// Geometry drawn with a material slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: MaterialSlot,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(geometry: Geometry, material: impl Into<MaterialSlot>) -> Self {
        Self {
            geometry,
            material: material.into(),
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    /// Face culling mode for picking and drawing.
    pub fn side(&self) -> Side {
        self.material.primary().map(|m| m.side()).unwrap_or_default()
    }
}

/// One mesh of a loaded model, positioned relative to the model root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPart {
    pub name: String,
    pub local: Mat4,
    pub mesh: Mesh,
}

/// Loaded external model: a root with flattened parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub source: String,
    pub parts: Vec<ModelPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Mesh(Mesh),
    Model(Model),
    Light(Light),
    Helper(Helper),
}

impl ObjectKind {
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Mesh(_) => "mesh",
            ObjectKind::Model(_) => "model",
            ObjectKind::Light(_) => "light",
            ObjectKind::Helper(_) => "helper",
        }
    }
}

/// A top-level object in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub transform: Transform,
    pub kind: ObjectKind,
}

impl SceneObject {
    pub fn matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            ObjectKind::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            ObjectKind::Mesh(m) => Some(m),
            _ => None,
        }
    }

    /// Every drawable mesh of the object with its world matrix.
    pub fn world_meshes(&self) -> Vec<(Mat4, &Mesh)> {
        let root = self.matrix();
        match &self.kind {
            ObjectKind::Mesh(m) => vec![(root, m)],
            ObjectKind::Model(model) => model
                .parts
                .iter()
                .map(|part| (root * part.local, &part.mesh))
                .collect(),
            ObjectKind::Light(_) | ObjectKind::Helper(_) => Vec::new(),
        }
    }
}

/// Distance fog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Fog {
    Linear { color: Color, near: f32, far: f32 },
    Exp2 { color: Color, density: f32 },
}

impl Fog {
    /// Fraction of the fog color mixed in at `depth`.
    pub fn factor(&self, depth: f32) -> f32 {
        match *self {
            Fog::Linear { near, far, .. } => {
                if far <= near {
                    return 0.0;
                }
                ((depth - near) / (far - near)).clamp(0.0, 1.0)
            }
            Fog::Exp2 { density, .. } => 1.0 - (-density * density * depth * depth).exp(),
        }
    }

    pub fn color(&self) -> Color {
        match *self {
            Fog::Linear { color, .. } | Fog::Exp2 { color, .. } => color,
        }
    }
}

/// What is drawn behind all objects.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Background {
    /// Use the renderer clear color.
    #[default]
    None,
    Color(Color),
    Texture(TextureHandle),
    Cube(TextureHandle),
}

/// The scene: a flat set of top-level objects plus environment settings.
///
/// Objects are keyed by sequential ids, so iteration follows insertion
/// order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: u64,
    background: Background,
    fog: Option<Fog>,
    event_log: Vec<SceneEvent>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object and return its id.
    pub fn add(&mut self, name: impl Into<String>, transform: Transform, kind: ObjectKind) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        let name = name.into();
        tracing::debug!(%id, name = %name, kind = kind.label(), "scene object added");
        self.event_log.push(SceneEvent::Added {
            id,
            name: name.clone(),
        });
        self.objects.insert(
            id,
            SceneObject {
                id,
                name,
                transform,
                kind,
            },
        );
        id
    }

    /// Remove an object. Returns it if it existed.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let removed = self.objects.remove(&id);
        if removed.is_some() {
            self.event_log.push(SceneEvent::Removed { id });
        }
        removed
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    /// First object with the given name, in insertion order.
    pub fn find_by_name(&self, name: &str) -> Option<&SceneObject> {
        self.objects.values().find(|o| o.name == name)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn background(&self) -> Background {
        self.background
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
    }

    pub fn fog(&self) -> Option<Fog> {
        self.fog
    }

    pub fn set_fog(&mut self, fog: Option<Fog>) {
        self.fog = fog;
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Remove every object. Environment settings are kept.
    pub fn clear(&mut self) {
        for id in self.ids() {
            self.remove(id);
        }
    }
}
