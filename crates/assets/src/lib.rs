//! Asset loading: textures, cube textures and glTF models.
//!
//! Textures are identified by content-addressed handles. The renderer
//! consumes them by handle, never by raw file paths.
//!
//! Models load on a worker thread through [`ModelRequest`] and are polled
//! once per frame by the owner.

mod error;
mod model;
mod request;
mod texture;

pub use error::AssetError;
pub use model::{load_model, ModelData, ModelPartData};
pub use request::ModelRequest;
pub use texture::{Texture, TextureData, TextureStore};
