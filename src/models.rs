use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

/// Detector output for a single tile, in tile-local pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub geometry: Geometry,
    pub text: Option<String>,
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(geometry: Geometry, text: Option<String>, confidence: f32) -> Self {
        Self {
            geometry,
            text,
            confidence,
        }
    }
}

/// A detection placed in parent-image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub geometry: Geometry,
    pub text: Option<String>,
    pub confidence: f32,
    /// Tile the detection was observed in.
    pub tile_id: usize,
}

impl Detection {
    pub fn area(&self) -> f32 {
        self.geometry.area()
    }
}

/// Final, deduplicated detections for one parent image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionSet {
    pub image_id: String,
    pub detections: Vec<Detection>,
    /// Tiles dropped under best-effort mode because their inference failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_tiles: Vec<usize>,
}

impl DetectionSet {
    pub fn empty(image_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            detections: Vec::new(),
            skipped_tiles: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }
}
