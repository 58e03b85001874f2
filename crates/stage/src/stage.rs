use crate::bootstrap::{self, RendererSettings, Tracked, MODEL, THE_BOX};
use crate::config::StageConfig;
use crate::options::{OptionChange, PanelOptions};
use crate::pointer;
use etude_assets::{AssetError, ModelData, ModelRequest, TextureStore};
use etude_common::{Color, ObjectId, Transform};
use etude_raycast::Raycaster;
use etude_scene::{
    Helper, Light, ObjectKind, OrbitControls, PerspectiveCamera, Scene, SceneEvent, SpotLight,
};
use glam::{Vec2, Vec3};

const CUBE_SPIN: f32 = 0.01;
const BOX_SPIN: Vec2 = Vec2::new(0.01, 0.03);
const HIT_COLOR: u32 = 0xff0000;
const TOGGLED_COLOR: u32 = 0x00ff00;

/// Camera navigation produced by mouse drags and the wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitInput {
    /// Drag delta in pixels.
    Rotate { dx: f32, dy: f32 },
    /// Wheel steps; positive moves closer.
    Zoom(f32),
    /// Drag delta in pixels.
    Pan { dx: f32, dy: f32 },
}

/// Input delivered to the stage between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageEvent {
    /// Pointer position in surface pixels.
    PointerMoved { x: f32, y: f32 },
    Resized { width: u32, height: u32 },
    OptionChanged(OptionChange),
    Orbit(OrbitInput),
}

/// State of the background model load.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelState {
    Pending,
    Loaded(ObjectId),
    Failed(String),
}

/// Result of the model load, reported once when it resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    Loaded(ObjectId),
    Failed(String),
}

/// One object under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct HitReport {
    pub object: ObjectId,
    pub name: String,
    pub distance: f32,
}

/// What happened during one [`Stage::frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    /// Intersections sorted by distance.
    pub hits: Vec<HitReport>,
    pub model: Option<ModelOutcome>,
    /// Structural scene changes since the previous frame.
    pub scene_events: Vec<SceneEvent>,
}

/// The demo scene together with everything the frame loop reads and
/// mutates.
///
/// Lifecycle: [`Stage::new`] builds the scene and starts the model load,
/// [`Stage::handle`] and [`Stage::frame`] mutate it, [`Stage::dispose`]
/// tears it down. Drawing is left to the caller.
pub struct Stage {
    config: StageConfig,
    scene: Scene,
    textures: TextureStore,
    camera: PerspectiveCamera,
    orbit: OrbitControls,
    options: PanelOptions,
    pointer: Vec2,
    surface: (u32, u32),
    step: f64,
    frame: u64,
    raycaster: Raycaster,
    tracked: Tracked,
    renderer: RendererSettings,
    model: Option<ModelRequest>,
    model_state: ModelState,
}

impl Stage {
    /// Build the scene and start loading the configured model.
    pub fn new(config: StageConfig) -> Self {
        let request = ModelRequest::spawn(config.asset_path(&config.assets.model));
        Self::with_model(config, request)
    }

    /// Build the scene around an already started model request.
    pub fn with_model(config: StageConfig, request: ModelRequest) -> Self {
        let mut built = bootstrap::build(&config);
        built.scene.drain_events();
        let surface = (config.window.width.max(1), config.window.height.max(1));
        Self {
            scene: built.scene,
            textures: built.textures,
            camera: built.camera,
            orbit: built.orbit,
            options: PanelOptions::default(),
            pointer: Vec2::ZERO,
            surface,
            step: 0.0,
            frame: 0,
            raycaster: Raycaster::new(),
            tracked: built.tracked,
            renderer: built.renderer,
            model: Some(request),
            model_state: ModelState::Pending,
            config,
        }
    }

    pub fn handle(&mut self, event: StageEvent) {
        match event {
            StageEvent::PointerMoved { x, y } => {
                self.pointer = pointer::normalize(x, y, self.surface.0, self.surface.1);
            }
            StageEvent::Resized { width, height } => {
                self.surface = (width.max(1), height.max(1));
                self.camera.set_aspect(self.surface.0, self.surface.1);
                tracing::debug!(width, height, aspect = self.camera.aspect, "surface resized");
            }
            StageEvent::OptionChanged(change) => self.apply_option(change),
            StageEvent::Orbit(input) => {
                match input {
                    OrbitInput::Rotate { dx, dy } => self.orbit.rotate(dx, dy),
                    OrbitInput::Zoom(steps) => self.orbit.zoom(steps),
                    OrbitInput::Pan { dx, dy } => self.orbit.pan(&self.camera, dx, dy),
                }
                self.orbit.update(&mut self.camera);
            }
        }
    }

    fn apply_option(&mut self, change: OptionChange) {
        self.options.apply(change);
        let Some(material) = self
            .scene
            .get_mut(self.tracked.sphere)
            .and_then(|o| o.as_mesh_mut())
            .and_then(|m| m.material.primary_mut())
        else {
            return;
        };
        match change {
            OptionChange::SphereColor(_) => {
                material.set_color(self.options.sphere_color);
            }
            OptionChange::Wireframe(_) => {
                material.set_wireframe(self.options.wireframe);
            }
            // Light options are copied every frame.
            _ => {}
        }
    }

    /// Advance the scene by one frame.
    pub fn frame(&mut self) -> FrameReport {
        let model = self.poll_model();
        self.frame += 1;

        if let Some(cube) = self.scene.get_mut(self.tracked.cube) {
            cube.transform.rotation.x += CUBE_SPIN;
            cube.transform.rotation.y += CUBE_SPIN;
        }

        self.step += f64::from(self.options.speed);
        let height = self.config.bounce_height * self.step.sin().abs() as f32;
        if let Some(sphere) = self.scene.get_mut(self.tracked.sphere) {
            sphere.transform.position.y = height;
        }

        self.update_light();
        let hits = self.pick();

        FrameReport {
            frame: self.frame,
            hits,
            model,
            scene_events: self.scene.drain_events(),
        }
    }

    fn update_light(&mut self) {
        let mut updated: Option<(Vec3, SpotLight)> = None;
        if let Some(object) = self.scene.get_mut(self.tracked.light) {
            if let ObjectKind::Light(Light::Spot(spot)) = &mut object.kind {
                spot.angle = self.options.angle;
                spot.penumbra = self.options.penumbra;
                spot.intensity = self.options.intensity;
                updated = Some((object.transform.position, spot.clone()));
            }
        }
        let Some((position, spot)) = updated else {
            return;
        };
        if let Some(object) = self.scene.get_mut(self.tracked.light_helper) {
            if let ObjectKind::Helper(Helper::SpotLight(helper)) = &mut object.kind {
                helper.update(position, &spot);
            }
        }
    }

    fn pick(&mut self) -> Vec<HitReport> {
        self.raycaster.set_from_camera(self.pointer, &self.camera);
        let intersections = self.raycaster.intersect_objects(&self.scene);
        let mut hits = Vec::with_capacity(intersections.len());
        for hit in intersections {
            let Some(object) = self.scene.get_mut(hit.object) else {
                continue;
            };
            tracing::trace!(
                object = %hit.object,
                name = %object.name,
                distance = hit.distance,
                "pointer intersection"
            );

            if hit.object == self.tracked.sphere {
                if let Some(material) = object
                    .as_mesh_mut()
                    .and_then(|m| m.material.primary_mut())
                {
                    let current = material.color().unwrap_or(Color::WHITE);
                    material.set_color(hit_color(current, self.config.toggle_color_on_hit));
                }
            }
            if object.name == THE_BOX {
                object.transform.rotation.x += BOX_SPIN.x;
                object.transform.rotation.y += BOX_SPIN.y;
            }

            hits.push(HitReport {
                object: hit.object,
                name: object.name.clone(),
                distance: hit.distance,
            });
        }
        hits
    }

    /// Take the model load result if it has arrived. Returns `Some` at most
    /// once per stage.
    pub fn poll_model(&mut self) -> Option<ModelOutcome> {
        let result = self.model.as_mut()?.poll()?;
        Some(self.finish_model(result))
    }

    /// Block until the model load resolves.
    pub fn wait_for_model(&mut self) -> Option<ModelOutcome> {
        let result = self.model.as_mut()?.wait()?;
        Some(self.finish_model(result))
    }

    fn finish_model(&mut self, result: Result<ModelData, AssetError>) -> ModelOutcome {
        let path = self
            .model
            .take()
            .map(|r| r.path().display().to_string())
            .unwrap_or_default();
        match result {
            Ok(data) => {
                let parts = data.parts.len();
                let vertices = data.vertex_count();
                let id = self.scene.add(
                    MODEL,
                    Transform::from_position(self.config.model_position),
                    ObjectKind::Model(data.into_model()),
                );
                tracing::info!(%id, %path, parts, vertices, "model loaded");
                self.model_state = ModelState::Loaded(id);
                ModelOutcome::Loaded(id)
            }
            Err(e) => {
                tracing::error!(%path, "model load failed: {e}");
                let message = e.to_string();
                self.model_state = ModelState::Failed(message.clone());
                ModelOutcome::Failed(message)
            }
        }
    }

    /// Tear the stage down.
    pub fn dispose(self) {
        tracing::info!(
            frames = self.frame,
            objects = self.scene.len(),
            model_pending = self.model.is_some(),
            "stage disposed"
        );
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn textures(&self) -> &TextureStore {
        &self.textures
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn options(&self) -> &PanelOptions {
        &self.options
    }

    /// Pointer in normalized device coordinates.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn tracked(&self) -> Tracked {
        self.tracked
    }

    pub fn renderer_settings(&self) -> RendererSettings {
        self.renderer
    }

    pub fn model_state(&self) -> &ModelState {
        &self.model_state
    }
}

fn hit_color(current: Color, toggle: bool) -> Color {
    if toggle && current.to_hex() == HIT_COLOR {
        Color::from_hex(TOGGLED_COLOR)
    } else {
        Color::from_hex(HIT_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{CUBE, SPHERE};
    use etude_assets::ModelPartData;
    use glam::Mat4;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const W: u32 = 1280;
    const H: u32 = 720;

    fn stage_with(config: StageConfig, result: Result<ModelData, AssetError>) -> (tempfile::TempDir, Stage) {
        let dir = tempfile::tempdir().unwrap();
        let config = config.with_asset_root(dir.path());
        let request = ModelRequest::resolved(dir.path().join("monkey.glb"), result);
        (dir, Stage::with_model(config, request))
    }

    fn stage() -> (tempfile::TempDir, Stage) {
        stage_with(StageConfig::default(), Err(AssetError::LoaderDisconnected))
    }

    fn triangle_model() -> ModelData {
        ModelData {
            source: "monkey.glb".into(),
            parts: vec![ModelPartData {
                name: "Suzanne".into(),
                local: Mat4::IDENTITY,
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                normals: None,
                uvs: None,
                indices: None,
                base_color: [0.8, 0.8, 0.8, 1.0],
            }],
        }
    }

    fn sphere_color(stage: &Stage) -> u32 {
        stage
            .scene()
            .get(stage.tracked().sphere)
            .and_then(|o| o.as_mesh())
            .and_then(|m| m.material.primary())
            .and_then(|m| m.color())
            .unwrap()
            .to_hex()
    }

    /// Pixel position of a world point on the default surface.
    fn screen_of(stage: &Stage, world: Vec3) -> (f32, f32) {
        let ndc = stage.camera().view_projection().project_point3(world);
        ((ndc.x + 1.0) / 2.0 * W as f32, (1.0 - ndc.y) / 2.0 * H as f32)
    }

    #[test]
    fn sphere_bounces_with_abs_sine() {
        let (_dir, mut stage) = stage();
        let speed = stage.options().speed;
        for n in 1..=400u64 {
            stage.frame();
            let y = stage.scene().get(stage.tracked().sphere).unwrap().transform.position.y;
            let expected = 10.0 * (n as f64 * f64::from(speed)).sin().abs() as f32;
            assert!((y - expected).abs() < 1e-4, "frame {n}: {y} vs {expected}");
            assert!((0.0..=10.0).contains(&y));
        }
    }

    #[test]
    fn speed_change_affects_the_bounce() {
        let (_dir, mut stage) = stage();
        stage.handle(StageEvent::OptionChanged(OptionChange::Speed(0.05)));
        stage.frame();
        stage.frame();
        let y = stage.scene().find_by_name(SPHERE).unwrap().transform.position.y;
        assert!((y - 10.0 * (0.1f64).sin() as f32).abs() < 1e-4);
    }

    #[test]
    fn cube_spins_every_frame() {
        let (_dir, mut stage) = stage();
        for _ in 0..5 {
            stage.frame();
        }
        let r = stage.scene().find_by_name(CUBE).unwrap().transform.rotation;
        assert!((r.x - 0.05).abs() < 1e-6 && (r.y - 0.05).abs() < 1e-6);
        assert_eq!(stage.frame_count(), 5);
    }

    #[test]
    fn resize_updates_aspect_and_surface() {
        let (_dir, mut stage) = stage();
        for (w, h) in [(800, 600), (1, 1000), (1920, 1080)] {
            stage.handle(StageEvent::Resized { width: w, height: h });
            assert_eq!(stage.surface_size(), (w, h));
            assert!((stage.camera().aspect - w as f32 / h as f32).abs() < 1e-6);
        }
        stage.handle(StageEvent::Resized { width: 0, height: 0 });
        assert_eq!(stage.surface_size(), (1, 1));
    }

    #[test]
    fn pointer_uses_the_current_surface() {
        let (_dir, mut stage) = stage();
        stage.handle(StageEvent::PointerMoved { x: 0.0, y: 0.0 });
        assert_eq!(stage.pointer(), Vec2::new(-1.0, 1.0));
        stage.handle(StageEvent::Resized { width: 400, height: 200 });
        stage.handle(StageEvent::PointerMoved { x: 400.0, y: 200.0 });
        assert_eq!(stage.pointer(), Vec2::new(1.0, -1.0));
    }

    /// Counts ERROR-level events seen on the current thread.
    struct ErrorCount(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCount {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Run `f` and return its result with the number of `error!` events it
    /// emitted.
    fn count_errors<T>(f: impl FnOnce() -> T) -> (T, usize) {
        use tracing_subscriber::layer::SubscriberExt;
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCount(count.clone()));
        let out = tracing::subscriber::with_default(subscriber, f);
        (out, count.load(Ordering::SeqCst))
    }

    #[test]
    fn failed_model_leaves_scene_unchanged() {
        let (_dir, mut stage) = stage();
        let before = stage.scene().len();
        let ((first, later), errors) = count_errors(|| {
            let first = stage.frame();
            let later: Vec<_> = (0..5).map(|_| stage.frame().model).collect();
            (first, later)
        });
        assert_eq!(errors, 1);
        assert!(matches!(first.model, Some(ModelOutcome::Failed(_))));
        assert!(later.iter().all(Option::is_none));
        assert_eq!(stage.scene().len(), before);
        assert!(matches!(stage.model_state(), ModelState::Failed(_)));
        assert!(stage.poll_model().is_none());
    }

    #[test]
    fn loaded_model_is_added_once_at_the_configured_position() {
        let config = StageConfig {
            model_position: Vec3::new(1.0, 2.0, 3.0),
            ..StageConfig::default()
        };
        let (_dir, mut stage) = stage_with(config, Ok(triangle_model()));
        let before = stage.scene().len();
        let report = stage.frame();
        let Some(ModelOutcome::Loaded(id)) = report.model else {
            panic!("model should load on the first frame");
        };
        assert_eq!(
            report.scene_events,
            vec![SceneEvent::Added {
                id,
                name: MODEL.to_string()
            }]
        );
        assert!(stage.frame().scene_events.is_empty());
        assert_eq!(stage.scene().len(), before + 1);
        let object = stage.scene().get(id).unwrap();
        assert_eq!(object.name, MODEL);
        assert_eq!(object.transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(matches!(object.kind, ObjectKind::Model(_)));
        assert_eq!(stage.model_state(), &ModelState::Loaded(id));
    }

    #[test]
    fn spawned_load_of_missing_file_fails_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut stage = Stage::new(StageConfig::default().with_asset_root(dir.path()));
        let before = stage.scene().len();
        assert!(matches!(stage.wait_for_model(), Some(ModelOutcome::Failed(_))));
        assert!(stage.wait_for_model().is_none());
        assert!(stage.frame().model.is_none());
        assert_eq!(stage.scene().len(), before);
    }

    #[test]
    fn model_with_out_of_range_index_fails_without_touching_the_scene() {
        let dir = tempfile::tempdir().unwrap();
        let mut bin = Vec::new();
        for c in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&c.to_le_bytes());
        }
        for i in [0u32, 1, 7] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        std::fs::write(dir.path().join("bad.bin"), &bin).unwrap();
        let path = dir.path().join("bad.gltf");
        std::fs::write(
            &path,
            r#"{
                "asset": {"version": "2.0"},
                "scenes": [{"nodes": [0]}],
                "nodes": [{"mesh": 0}],
                "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
                "buffers": [{"uri": "bad.bin", "byteLength": 48}],
                "bufferViews": [
                    {"buffer": 0, "byteOffset": 0, "byteLength": 36},
                    {"buffer": 0, "byteOffset": 36, "byteLength": 12}
                ],
                "accessors": [
                    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                     "min": [0, 0, 0], "max": [1, 1, 0]},
                    {"bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR"}
                ]
            }"#,
        )
        .unwrap();

        let config = StageConfig::default().with_asset_root(dir.path());
        let mut stage = Stage::with_model(config, ModelRequest::spawn(&path));
        let before = stage.scene().len();
        let (outcome, errors) = count_errors(|| stage.wait_for_model());
        let Some(ModelOutcome::Failed(message)) = &outcome else {
            panic!("expected a failed model load, got {outcome:?}");
        };
        assert!(message.contains("out of range"), "{message}");
        assert_eq!(errors, 1);
        assert_eq!(stage.scene().len(), before);
        assert!(stage.frame().scene_events.is_empty());
    }

    #[test]
    fn sphere_hit_always_sets_red() {
        let (_dir, mut stage) = stage();
        let (x, y) = screen_of(&stage, Vec3::new(0.3, 0.2, 0.1));
        stage.handle(StageEvent::PointerMoved { x, y });
        for _ in 0..3 {
            let report = stage.frame();
            assert!(report.hits.iter().any(|h| h.object == stage.tracked().sphere));
            assert_eq!(sphere_color(&stage), HIT_COLOR);
        }
    }

    #[test]
    fn toggle_flag_alternates_colors() {
        let config = StageConfig {
            toggle_color_on_hit: true,
            ..StageConfig::default()
        };
        let (_dir, mut stage) = stage_with(config, Err(AssetError::LoaderDisconnected));
        let (x, y) = screen_of(&stage, Vec3::new(0.3, 0.2, 0.1));
        stage.handle(StageEvent::PointerMoved { x, y });
        let colors: Vec<u32> = (0..4)
            .map(|_| {
                stage.frame();
                sphere_color(&stage)
            })
            .collect();
        assert_eq!(colors, [HIT_COLOR, TOGGLED_COLOR, HIT_COLOR, TOGGLED_COLOR]);
    }

    #[test]
    fn hovering_the_box_rotates_it() {
        let (_dir, mut stage) = stage();
        let (x, y) = screen_of(&stage, Vec3::new(0.0, 15.0, 10.0));
        stage.handle(StageEvent::PointerMoved { x, y });
        let report = stage.frame();
        let box_hits = report.hits.iter().filter(|h| h.name == THE_BOX).count() as f32;
        assert!(box_hits >= 1.0);
        let r = stage.scene().get(stage.tracked().the_box).unwrap().transform.rotation;
        assert!((r.x - 0.01 * box_hits).abs() < 1e-6);
        assert!((r.y - 0.03 * box_hits).abs() < 1e-6);
        assert!(report.hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn nothing_under_the_pointer() {
        let (_dir, mut stage) = stage();
        // Top-left corner looks over the scene into the sky.
        stage.handle(StageEvent::PointerMoved { x: 0.0, y: 0.0 });
        assert!(stage.frame().hits.is_empty());
        assert_eq!(sphere_color(&stage), 0x0000ff);
    }

    #[test]
    fn panel_changes_reach_the_scene() {
        let (_dir, mut stage) = stage();
        stage.handle(StageEvent::OptionChanged(OptionChange::SphereColor(Color::from_hex(0x123456))));
        stage.handle(StageEvent::OptionChanged(OptionChange::Wireframe(true)));
        stage.handle(StageEvent::OptionChanged(OptionChange::Angle(0.5)));
        stage.handle(StageEvent::OptionChanged(OptionChange::Penumbra(0.3)));
        assert_eq!(sphere_color(&stage), 0x123456);
        let sphere = stage.scene().get(stage.tracked().sphere).unwrap();
        assert!(sphere.as_mesh().unwrap().material.primary().unwrap().wireframe());

        stage.frame();
        let light = stage.scene().get(stage.tracked().light).unwrap();
        let ObjectKind::Light(Light::Spot(spot)) = &light.kind else {
            panic!("expected a spot light");
        };
        assert_eq!((spot.angle, spot.penumbra, spot.intensity), (0.5, 0.3, 1.0));
    }

    #[test]
    fn orbit_moves_the_camera() {
        let (_dir, mut stage) = stage();
        let start = stage.camera().position;
        let distance = start.length();
        stage.handle(StageEvent::Orbit(OrbitInput::Rotate { dx: 100.0, dy: 0.0 }));
        assert!((stage.camera().position - start).length() > 1.0);
        assert!((stage.camera().position.length() - distance).abs() < 1e-3);
        stage.handle(StageEvent::Orbit(OrbitInput::Zoom(2.0)));
        assert!(stage.camera().position.length() < distance);
    }

    #[test]
    fn hit_color_logic() {
        let red = Color::from_hex(HIT_COLOR);
        assert_eq!(hit_color(red, false).to_hex(), HIT_COLOR);
        assert_eq!(hit_color(red, true).to_hex(), TOGGLED_COLOR);
        assert_eq!(hit_color(Color::WHITE, true).to_hex(), HIT_COLOR);
    }
}
