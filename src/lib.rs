//! # meshtrace
//!
//! Progressive stochastic path tracer for small triangle-mesh scenes.
//!
//! ## Modules
//!
//! - [`util`] - Math types (bounds, transforms) and errors
//! - [`pathtracer`] - Mesh partitioning, scene snapshots, integrator, accumulation
//! - [`settings`] - Persistent quality and environment settings
//! - [`worker`] - Background mesh partitioning
//!
//! ## Example
//!
//! ```ignore
//! use meshtrace::prelude::*;
//!
//! let settings = RenderSettings::load();
//! let mut scene = Scene::new();
//! scene.add_mesh(1, &mesh, Transform::IDENTITY, vec![Material::diffuse(Vec3::splat(0.7))])?;
//! let snapshot = scene.snapshot();
//!
//! let camera = CameraParams::from_fov(settings.fov_y, settings.aspect(), settings.focus_distance, xf);
//! let mut pt = ProgressiveRenderer::new(settings.width, settings.height);
//! for _ in 0..64 {
//!     pt.render(&snapshot, &camera, &settings.quality, &settings.environment);
//! }
//! ```

pub mod util;
pub mod pathtracer;
pub mod settings;
pub mod worker;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Bounds, Error, Result, Transform, Affine3A, Quat, Vec2, Vec3};
    pub use crate::pathtracer::{
        CameraParams, EnvironmentSettings, FrameStats, Image, Material, MaterialFlag, MeshData,
        MeshId, ProgressiveRenderer, Scene, SceneSnapshot, SceneStore,
    };
    pub use crate::settings::{QualitySettings, RenderMode, RenderSettings};
    pub use crate::worker::{PartitionWorker, WorkerCommand, WorkerResult};
}
