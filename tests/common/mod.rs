#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from spot_text for tests
pub use spot_text::{
    ConfigError, Detection, DetectionSet, Geometry, GeometryError, ModelError, Pipeline,
    PipelineConfig, Point, Polygon, RawDetection, Rect, SourceImage, SpotError, Tile,
    TileGenerator, TileRegion,
};
