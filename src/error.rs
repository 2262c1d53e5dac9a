//! Error types for the tiled text-spotting pipeline.
//!
//! Every stage reports failures through [`SpotError`]. The variants map onto
//! the stage that produced them so callers can tell a bad parameter apart from
//! a detector failure without string matching.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid tiling, deduplication or scheduling parameters.
///
/// Always reported before any tile is generated or any detector is invoked.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("patch size must be a positive number of pixels")]
    ZeroPatchSize,

    #[error("overlap fraction must be in [0, 1), got {0}")]
    OverlapOutOfRange(f32),

    #[error("overlap fraction {overlap} leaves a zero stride for patch size {patch_size}")]
    ZeroStride { patch_size: u32, overlap: f32 },

    #[error("min_ioa must be in [0, 1], got {0}")]
    MinIoaOutOfRange(f32),

    #[error("at least one concurrent inference is required")]
    ZeroConcurrency,

    #[error("max concurrency {requested} exceeds the limit of {max}")]
    ConcurrencyTooHigh { requested: usize, max: usize },
}

/// Failure of a detection model invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("tile {tile_id} has a zero-size dimension ({width}x{height})")]
    EmptyTile { tile_id: usize, width: u32, height: u32 },

    #[error("detector backend failed on tile {tile_id}: {message}")]
    Backend { tile_id: usize, message: String },

    #[error("inference task did not complete: {message}")]
    TaskFailed {
        tile_id: Option<usize>,
        message: String,
    },
}

/// Malformed detection geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("geometry has zero area")]
    ZeroArea,

    #[error("polygon has {count} vertices, expected between {min} and {max}")]
    VertexCount { count: usize, min: usize, max: usize },

    #[error("geometry contains a non-finite coordinate")]
    NonFinite,

    #[error("polygon edges {first} and {second} cross")]
    SelfIntersecting { first: usize, second: usize },
}

/// Missing or unreadable source image.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("image does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to decode image {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read image {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error for the pipeline.
#[derive(Error, Debug)]
pub enum SpotError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("model: {0}")]
    Model(#[from] ModelError),

    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("input: {0}")]
    Input(#[from] InputError),

    #[error("debug output: {0:#}")]
    DebugOutput(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SpotError>;
