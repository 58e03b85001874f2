//! The etude stage: builds the demo scene and advances it frame by frame.
//!
//! [`Stage`] owns the scene, camera, control options, pointer and the
//! pending model load. Input arrives as [`StageEvent`]s; [`Stage::frame`]
//! applies the per-frame animation and pointer picking. Nothing here
//! touches the GPU, so the whole loop runs headless.
//!
//! # Invariants
//! - Object count and identity are fixed after construction, except for
//!   the one model insertion when the background load succeeds.
//! - The model result is consumed at most once; a failure is logged once
//!   and leaves the scene unchanged.

mod bootstrap;
mod config;
mod error;
mod options;
pub mod pointer;
mod stage;
mod summary;

pub use bootstrap::{
    RendererSettings, Tracked, CUBE, DISPLACED_PLANE, MODEL, PLANE, SHADER_SPHERE, SPHERE,
    SPOT_LIGHT, THE_BOX,
};
pub use config::{AssetConfig, StageConfig, WindowConfig};
pub use error::StageError;
pub use options::{
    OptionChange, PanelOptions, ANGLE_RANGE, INTENSITY_RANGE, PENUMBRA_RANGE, SPEED_RANGE,
};
pub use stage::{
    FrameReport, HitReport, ModelOutcome, ModelState, OrbitInput, Stage, StageEvent,
};
pub use summary::{ObjectSummary, SceneSummary};
