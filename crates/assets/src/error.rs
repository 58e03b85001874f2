use etude_common::TextureHandle;
use std::path::PathBuf;

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image decode error in {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("glTF error in {}: {source}", .path.display())]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("{} has no scene", .0.display())]
    NoScene(PathBuf),
    #[error("{} contains no triangle meshes", .0.display())]
    EmptyModel(PathBuf),
    #[error("{} part {part}: index {index} is out of range for {vertices} vertices", .path.display())]
    InvalidIndices {
        path: PathBuf,
        part: String,
        index: u32,
        vertices: usize,
    },
    #[error("texture not found: {0:?}")]
    NotFound(TextureHandle),
    #[error("failed to start model loader: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("model loader exited without a result")]
    LoaderDisconnected,
}
