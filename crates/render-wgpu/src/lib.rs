//! wgpu render backend for the etude scene.
//!
//! Draws the background (clear color, flat texture or cube texture),
//! meshes with basic, standard or custom WGSL materials, wireframes and
//! helper lines, with optional distance fog.
//!
//! # Invariants
//! - The renderer never mutates the scene.
//! - Textures are referenced by handle and uploaded through
//!   [`WgpuRenderer::sync_textures`] before they are drawn.

mod gpu;
mod shaders;
mod uniforms;
mod vertex;

pub use gpu::{RenderInput, WgpuRenderer, DEPTH_FORMAT};
pub use shaders::SHADER_MATERIAL_PRELUDE;
