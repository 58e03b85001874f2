use crate::config::StageConfig;
use etude_assets::TextureStore;
use etude_common::{Color, ObjectId, TextureHandle, Transform};
use etude_scene::{
    BasicMaterial, Background, Fog, Geometry, Helper, Light, Material, MaterialSlot, Mesh,
    ObjectKind, OrbitControls, PerspectiveCamera, Scene, SeededRng, ShaderMaterial, Side,
    SpotLight, SpotLightHelper, StandardMaterial,
};
use glam::Vec3;
use std::f32::consts::FRAC_PI_2;
use std::path::Path;

pub const CUBE: &str = "cube";
pub const PLANE: &str = "plane";
pub const SPHERE: &str = "sphere";
pub const SPOT_LIGHT: &str = "spot light";
pub const THE_BOX: &str = "theBox";
pub const DISPLACED_PLANE: &str = "displaced plane";
pub const SHADER_SPHERE: &str = "shader sphere";
pub const MODEL: &str = "model";

/// Renderer-level switches set up with the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererSettings {
    /// Shadow maps requested. Stored only; no shadow pass is drawn.
    pub shadows: bool,
    pub clear_color: Color,
}

/// Objects the frame loop touches directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tracked {
    pub cube: ObjectId,
    pub sphere: ObjectId,
    pub light: ObjectId,
    pub light_helper: ObjectId,
    pub the_box: ObjectId,
}

pub(crate) struct Built {
    pub scene: Scene,
    pub textures: TextureStore,
    pub camera: PerspectiveCamera,
    pub orbit: OrbitControls,
    pub tracked: Tracked,
    pub renderer: RendererSettings,
}

fn load_texture(store: &mut TextureStore, path: &Path) -> TextureHandle {
    match store.load(path) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!("{e}; using placeholder texture");
            store.placeholder()
        }
    }
}

fn read_shader(path: &Path, fallback: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(path = %path.display(), "shader source unavailable ({e}); using built-in");
            fallback.to_string()
        }
    }
}

/// Build the demo scene, camera and textures from `config`.
pub(crate) fn build(config: &StageConfig) -> Built {
    let renderer = RendererSettings {
        shadows: config.shadows,
        clear_color: config.clear_color,
    };

    let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
    camera.set_aspect(config.window.width, config.window.height);
    camera.position = Vec3::new(-10.0, 30.0, 30.0);
    let orbit = OrbitControls::new(&camera, Vec3::ZERO);
    orbit.update(&mut camera);

    let mut scene = Scene::new();
    let mut textures = TextureStore::new();

    scene.add("axes", Transform::default(), ObjectKind::Helper(Helper::Axes { size: 5.0 }));

    let cube = scene.add(
        CUBE,
        Transform::default(),
        ObjectKind::Mesh(Mesh::new(
            Geometry::box_geometry(1.0, 1.0, 1.0),
            BasicMaterial {
                color: Color::from_hex(0x00ff00),
                ..BasicMaterial::default()
            },
        )),
    );

    let plane = Mesh {
        receive_shadow: true,
        ..Mesh::new(
            Geometry::plane(30.0, 30.0, 1, 1),
            StandardMaterial {
                color: Color::from_hex(0x0fffff),
                side: Side::Double,
                ..StandardMaterial::default()
            },
        )
    };
    scene.add(
        PLANE,
        Transform {
            rotation: Vec3::new(-FRAC_PI_2, 0.0, 0.0),
            ..Transform::default()
        },
        ObjectKind::Mesh(plane),
    );

    scene.add(
        "grid",
        Transform::default(),
        ObjectKind::Helper(Helper::Grid {
            size: 30.0,
            divisions: 10,
        }),
    );

    let sphere = Mesh {
        cast_shadow: true,
        ..Mesh::new(
            Geometry::sphere(4.0, 30, 30),
            StandardMaterial {
                color: Color::from_hex(0x0000ff),
                wireframe: false,
                ..StandardMaterial::default()
            },
        )
    };
    let sphere = scene.add(SPHERE, Transform::default(), ObjectKind::Mesh(sphere));

    let light_position = Vec3::new(-100.0, 100.0, 0.0);
    let spot = SpotLight {
        angle: 0.2,
        cast_shadow: true,
        ..SpotLight::new(Color::WHITE)
    };
    let light = scene.add(
        SPOT_LIGHT,
        Transform::from_position(light_position),
        ObjectKind::Light(Light::Spot(spot.clone())),
    );
    let mut helper = SpotLightHelper::new(light);
    helper.update(light_position, &spot);
    let light_helper = scene.add(
        "spot light helper",
        Transform::default(),
        ObjectKind::Helper(Helper::SpotLight(helper)),
    );

    scene.set_fog(Some(Fog::Linear {
        color: Color::WHITE,
        near: 0.0,
        far: 200.0,
    }));
    scene.set_fog(Some(Fog::Exp2 {
        color: Color::WHITE,
        density: 0.01,
    }));

    let nebula_path = config.asset_path(&config.assets.nebula);
    let stars_path = config.asset_path(&config.assets.stars);
    let stars = load_texture(&mut textures, &stars_path);
    scene.set_background(Background::Texture(stars));
    let sky = match textures.load_cube([
        &nebula_path,
        &nebula_path,
        &stars_path,
        &stars_path,
        &stars_path,
        &stars_path,
    ]) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!("{e}; using placeholder sky");
            textures.placeholder_cube()
        }
    };
    scene.set_background(Background::Cube(sky));

    let nebula = load_texture(&mut textures, &nebula_path);
    let mapped = |map: TextureHandle| -> Material {
        BasicMaterial {
            map: Some(map),
            ..BasicMaterial::default()
        }
        .into()
    };
    let box_materials = vec![
        mapped(nebula),
        mapped(nebula),
        mapped(nebula),
        mapped(stars),
        mapped(stars),
        mapped(stars),
    ];
    let the_box = scene.add(
        THE_BOX,
        Transform::from_position(Vec3::new(0.0, 15.0, 10.0)),
        ObjectKind::Mesh(Mesh::new(
            Geometry::box_geometry(4.0, 4.0, 4.0),
            MaterialSlot::Multi(box_materials),
        )),
    );

    let mut rng = SeededRng::new(config.seed);
    let mut displaced = Geometry::plane(10.0, 10.0, 10, 10);
    let last = displaced.flat_len() - 1;
    for index in [0, 1, 2, last] {
        displaced.offset_component(index, -10.0 * rng.next_f32());
    }
    scene.add(
        DISPLACED_PLANE,
        Transform::from_position(Vec3::new(10.0, 10.0, 15.0)),
        ObjectKind::Mesh(Mesh::new(
            displaced,
            BasicMaterial {
                wireframe: true,
                ..BasicMaterial::default()
            },
        )),
    );

    let shader = ShaderMaterial::new(
        read_shader(
            &config.asset_path(&config.assets.vertex_shader),
            ShaderMaterial::DEFAULT_VERTEX,
        ),
        read_shader(
            &config.asset_path(&config.assets.fragment_shader),
            ShaderMaterial::DEFAULT_FRAGMENT,
        ),
    );
    scene.add(
        SHADER_SPHERE,
        Transform::from_position(Vec3::new(-5.0, 10.0, 10.0)),
        ObjectKind::Mesh(Mesh::new(Geometry::sphere(4.0, 32, 16), shader)),
    );

    tracing::info!(
        objects = scene.len(),
        textures = textures.len(),
        "scene built"
    );

    Built {
        scene,
        textures,
        camera,
        orbit,
        tracked: Tracked {
            cube,
            sphere,
            light,
            light_helper,
            the_box,
        },
        renderer,
    }
}
