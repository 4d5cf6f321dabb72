//! Error types for meshtrace.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for partitioning, scene and settings operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Mesh has more faces than the per-mesh intersection budget allows
    #[error("Mesh has {count} triangles, limit is {limit}")]
    TriangleLimitExceeded { count: usize, limit: usize },

    /// Index buffer or sub-mesh range does not describe whole triangles
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Normal array does not match the position array
    #[error("Normal count {normals} does not match vertex count {vertices}")]
    NormalCountMismatch { vertices: usize, normals: usize },

    /// Mesh registered without any material
    #[error("Mesh {0} has an empty material table")]
    EmptyMaterialTable(u64),

    /// Mesh id not present in the scene
    #[error("Mesh not found: {0}")]
    MeshNotFound(u64),

    /// Settings file could not be parsed
    #[error("Invalid settings in {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No usable config directory on this platform
    #[error("No config directory available")]
    NoConfigDir,

    /// Background worker is gone
    #[error("Partition worker disconnected")]
    WorkerDisconnected,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid mesh error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidMesh(msg.into())
    }
}

/// Result type alias for meshtrace operations.
pub type Result<T> = std::result::Result<T, Error>;
