//! Progressive CPU path tracer.
//!
//! Meshes are partitioned into bounded [`GeometryChunk`]s by an octree-style
//! splitter ([`split`]), placed in world space by [`MeshInstance`], and
//! flattened into an immutable [`SceneSnapshot`]. Each frame traces a few
//! stochastic paths per pixel ([`shade`]) and [`ProgressiveRenderer`]
//! folds the frame into a running mean.
//!
//! ```ignore
//! let mut scene = Scene::new();
//! scene.add_mesh(1, &mesh, Transform::IDENTITY, vec![Material::diffuse(Vec3::splat(0.8))])?;
//! let store = SceneStore::new(scene.snapshot());
//!
//! let camera = CameraParams::from_fov(45.0, 16.0 / 9.0, 1.0, xf);
//! let mut pt = ProgressiveRenderer::new(320, 180);
//! pt.render(&store.current(), &camera, &quality, &env);
//! ```

pub mod camera;
pub mod chunk;
pub mod compute;
pub mod environment;
pub mod intersect;
pub mod material;
pub mod rng;
pub mod scene;
pub mod scene_convert;
pub mod shade;
pub mod split;

pub use camera::CameraParams;
pub use chunk::{GeometryChunk, Triangle};
pub use compute::{blend_into, render_frame, FrameStats, Image, ProgressiveRenderer};
pub use environment::EnvironmentSettings;
pub use intersect::{IntersectionStats, Ray};
pub use material::{Material, MaterialFlag};
pub use rng::PixelRng;
pub use scene::{HitRecord, MeshId, Scene, SceneSnapshot, SceneStore};
pub use scene_convert::{chunks_to_world, MeshData, MeshInstance};
pub use split::{partition_mesh, MAX_MESH_TRIANGLES, MAX_SPLIT_DEPTH, MAX_TRIS_PER_CHUNK};
