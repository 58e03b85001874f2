//! Shared value types used across the etude crates.

mod types;

pub use types::{Color, ColorParseError, ObjectId, TextureHandle, Transform};
