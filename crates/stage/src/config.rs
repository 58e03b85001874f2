use crate::StageError;
use etude_common::Color;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Window title and initial surface size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "etude".into(),
            width: 1280,
            height: 720,
        }
    }
}

/// Asset file names, relative to `root` unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub root: PathBuf,
    pub nebula: PathBuf,
    pub stars: PathBuf,
    pub model: PathBuf,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: "assets".into(),
            nebula: "nebula.jpg".into(),
            stars: "stars.jpg".into(),
            model: "monkey.glb".into(),
            vertex_shader: "vertex.wgsl".into(),
            fragment_shader: "fragment.wgsl".into(),
        }
    }
}

/// Stage configuration, read from YAML.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub window: WindowConfig,
    pub assets: AssetConfig,
    /// Where the loaded model is placed.
    pub model_position: Vec3,
    /// Peak height of the bouncing sphere.
    pub bounce_height: f32,
    /// Seed for the displaced plane.
    pub seed: u64,
    /// Alternate the sphere color between red and green on every hit
    /// instead of always setting red.
    pub toggle_color_on_hit: bool,
    pub shadows: bool,
    #[serde(with = "css_color")]
    pub clear_color: Color,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            assets: AssetConfig::default(),
            model_position: Vec3::new(-12.0, 4.0, 10.0),
            bounce_height: 10.0,
            seed: 42,
            toggle_color_on_hit: false,
            shadows: true,
            clear_color: Color::from_hex(0xffea00),
        }
    }
}

impl StageConfig {
    /// Read a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StageError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| StageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_yaml::from_str(&text).map_err(|source| StageError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "stage config loaded");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, StageError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, StageError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Replace the asset root directory.
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets.root = root.into();
        self
    }

    /// Resolve an asset file against the asset root.
    pub fn asset_path(&self, file: impl AsRef<Path>) -> PathBuf {
        self.assets.root.join(file)
    }
}

/// Colors as `#rrggbb` strings.
mod css_color {
    use etude_common::Color;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&color.to_css())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_demo_scene() {
        let config = StageConfig::default();
        assert_eq!(config.model_position, Vec3::new(-12.0, 4.0, 10.0));
        assert_eq!(config.bounce_height, 10.0);
        assert_eq!(config.clear_color.to_hex(), 0xffea00);
        assert!(!config.toggle_color_on_hit);
        assert_eq!(
            config.asset_path(&config.assets.model),
            PathBuf::from("assets/monkey.glb")
        );
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = StageConfig::from_yaml_str(
            "bounce_height: 3.5\nclear_color: '#102030'\nwindow:\n  width: 640\n",
        )
        .unwrap();
        assert_eq!(config.bounce_height, 3.5);
        assert_eq!(config.clear_color.to_hex(), 0x102030);
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.assets, AssetConfig::default());
    }

    #[test]
    fn yaml_round_trip() {
        let config = StageConfig {
            seed: 7,
            toggle_color_on_hit: true,
            ..StageConfig::default()
        }
        .with_asset_root("/data/etude");
        let text = config.to_yaml().unwrap();
        assert!(text.contains("'#ffea00'") || text.contains("\"#ffea00\""));
        assert_eq!(StageConfig::from_yaml_str(&text).unwrap(), config);
    }

    #[test]
    fn bad_color_is_rejected() {
        let err = StageConfig::from_yaml_str("clear_color: yellow").unwrap_err();
        assert!(matches!(err, StageError::Serialize(_)));
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        match StageConfig::load(&missing) {
            Err(StageError::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected: {other:?}"),
        }

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "seed: [1, 2").unwrap();
        assert!(matches!(StageConfig::load(&bad), Err(StageError::Yaml { .. })));

        let good = dir.path().join("stage.yaml");
        std::fs::write(&good, "seed: 99\n").unwrap();
        assert_eq!(StageConfig::load(&good).unwrap().seed, 99);
    }
}
