pub mod config;
pub mod debug;
pub mod dedup;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod image_source;
pub mod mapping;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod tiling;

pub use config::PipelineConfig;
pub use dedup::{OverlapDeduplicator, deduplicate};
pub use detection::{DetectionModel, ModelBundle, OcrsDetector};
pub use error::{ConfigError, GeometryError, InputError, ModelError, Result, SpotError};
pub use geometry::{Geometry, Point, Polygon, Rect};
pub use image_source::SourceImage;
pub use mapping::remap;
pub use models::{Detection, DetectionSet, RawDetection};
pub use pipeline::Pipeline;
pub use tiling::{Tile, TileGenerator, TileRegion};
