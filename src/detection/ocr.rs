use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::detection::bundle::{DETECTION_MODEL, ModelBundle, RECOGNITION_MODEL};
use crate::detection::{DetectionModel, ensure_non_empty};
use crate::error::ModelError;
use crate::geometry::{Geometry, Point, Polygon};
use crate::models::RawDetection;
use crate::tiling::Tile;

/// ocrs does not score its output; every recognized line gets this confidence.
pub const LINE_CONFIDENCE: f32 = 0.9;

/// Standard ocrs model cache, `$HOME/.cache/ocrs`.
pub fn default_model_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

/// Text-line detector backed by the ocrs engine.
pub struct OcrsDetector {
    engine: OcrEngine,
}

impl OcrsDetector {
    /// Build the engine from the detection and recognition models in a bundle.
    pub fn from_bundle(mut bundle: ModelBundle) -> anyhow::Result<Self> {
        debug!(path = %bundle.path().display(), "loading ocrs models from bundle");
        let detection_model = Model::load(bundle.take(DETECTION_MODEL)?)?;
        let recognition_model = Model::load(bundle.take(RECOGNITION_MODEL)?)?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })?;

        Ok(Self { engine })
    }

    /// Ensure the bundle exists in `model_dir`, then load the engine from it.
    pub fn from_model_dir(model_dir: &Path) -> anyhow::Result<Self> {
        let bundle_path = ModelBundle::ensure(model_dir)?;
        Self::from_bundle(ModelBundle::load(bundle_path)?)
    }
}

impl DetectionModel for OcrsDetector {
    fn infer(&self, tile: &Tile) -> Result<Vec<RawDetection>, ModelError> {
        ensure_non_empty(tile)?;

        let backend = |err: &dyn std::fmt::Display| ModelError::Backend {
            tile_id: tile.id(),
            message: err.to_string(),
        };

        let img = tile.image().to_rgb8();
        let img_source =
            ImageSource::from_bytes(img.as_raw(), img.dimensions()).map_err(|e| backend(&e))?;
        let ocr_input = self.engine.prepare_input(img_source).map_err(|e| backend(&e))?;

        let words = self.engine.detect_words(&ocr_input).map_err(|e| backend(&e))?;
        let lines = self.engine.find_text_lines(&ocr_input, &words);
        let recognized = self
            .engine
            .recognize_text(&ocr_input, &lines)
            .map_err(|e| backend(&e))?;

        let mut detections = Vec::new();
        for line in recognized.into_iter().flatten() {
            let text = line.to_string().trim().to_string();
            if text.is_empty() {
                continue;
            }

            let corners = line
                .rotated_rect()
                .corners()
                .iter()
                .map(|c| Point::new(c.x, c.y))
                .collect();
            detections.push(RawDetection::new(
                Geometry::Polygon(Polygon::new(corners)),
                Some(text),
                LINE_CONFIDENCE,
            ));
        }

        Ok(detections)
    }

    fn name(&self) -> &str {
        "ocrs"
    }
}
