use crate::stage::{ModelState, Stage};
use etude_common::ObjectId;
use glam::{Vec2, Vec3};
use std::fmt;

/// Read-only snapshot of a stage for logs and debug text.
#[derive(Debug, Clone)]
pub struct SceneSummary {
    pub frame: u64,
    pub object_count: usize,
    pub texture_count: usize,
    pub camera_position: Vec3,
    pub pointer: Vec2,
    pub model: ModelState,
    pub objects: Vec<ObjectSummary>,
}

/// One line per scene object.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub id: ObjectId,
    pub name: String,
    pub kind: &'static str,
    pub position: Vec3,
}

impl SceneSummary {
    pub fn capture(stage: &Stage) -> Self {
        let scene = stage.scene();
        Self {
            frame: stage.frame_count(),
            object_count: scene.len(),
            texture_count: stage.textures().len(),
            camera_position: stage.camera().position,
            pointer: stage.pointer(),
            model: stage.model_state().clone(),
            objects: scene
                .objects()
                .map(|o| ObjectSummary {
                    id: o.id,
                    name: o.name.clone(),
                    kind: o.kind.label(),
                    position: o.transform.position,
                })
                .collect(),
        }
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Pending => write!(f, "pending"),
            ModelState::Loaded(id) => write!(f, "loaded {id}"),
            ModelState::Failed(e) => write!(f, "failed ({e})"),
        }
    }
}

impl fmt::Display for ObjectSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>4} {:<8} {:<20} pos=({:.2}, {:.2}, {:.2})",
            self.id.to_string(),
            self.kind,
            self.name,
            self.position.x,
            self.position.y,
            self.position.z
        )
    }
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Stage: frame={} objects={} textures={} model={}",
            self.frame, self.object_count, self.texture_count, self.model
        )?;
        writeln!(
            f,
            "Camera: ({:.1}, {:.1}, {:.1})  Pointer: ({:.3}, {:.3})",
            self.camera_position.x,
            self.camera_position.y,
            self.camera_position.z,
            self.pointer.x,
            self.pointer.y
        )?;
        for object in &self.objects {
            writeln!(f, "{object}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StageConfig;
    use etude_assets::{AssetError, ModelRequest};

    #[test]
    fn summary_lists_every_object() {
        let dir = tempfile::tempdir().unwrap();
        let mut stage = Stage::with_model(
            StageConfig::default().with_asset_root(dir.path()),
            ModelRequest::resolved("monkey.glb", Err(AssetError::LoaderDisconnected)),
        );
        let summary = SceneSummary::capture(&stage);
        assert_eq!(summary.frame, 0);
        assert_eq!(summary.model, ModelState::Pending);
        assert_eq!(summary.objects.len(), summary.object_count);

        stage.frame();
        let summary = SceneSummary::capture(&stage);
        let text = summary.to_string();
        assert!(text.starts_with("Stage: frame=1"));
        assert!(text.contains("model=failed"));
        assert!(text.contains("theBox"));
        assert_eq!(text.lines().count(), 2 + summary.object_count);
    }
}
