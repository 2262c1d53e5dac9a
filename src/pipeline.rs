//! Tiled inference orchestration.
//!
//! A run validates its parameters, cuts the image into overlapping tiles,
//! infers every tile on the blocking pool (bounded by a semaphore), remaps the
//! results into parent coordinates and finally deduplicates them once every
//! tile has reported back.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::debug::DebugConfig;
use crate::dedup::OverlapDeduplicator;
use crate::detection::DetectionModel;
use crate::error::{ModelError, Result, SpotError};
use crate::image_source::SourceImage;
use crate::mapping;
use crate::models::{Detection, DetectionSet};
use crate::tiling::{Tile, TileGenerator};

/// Composable pipeline builder
pub struct Pipeline {
    model: Arc<dyn DetectionModel>,
    config: PipelineConfig,
    debug: Option<DebugConfig>,
}

impl Pipeline {
    pub fn new(model: Arc<dyn DetectionModel>) -> Self {
        Self {
            model,
            config: PipelineConfig::default(),
            debug: None,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_patch_size(mut self, patch_size: u32) -> Self {
        self.config.patch_size = patch_size;
        self
    }

    pub fn with_overlap_fraction(mut self, overlap_fraction: f32) -> Self {
        self.config.overlap_fraction = overlap_fraction;
        self
    }

    pub fn with_min_ioa(mut self, min_ioa: f32) -> Self {
        self.config.min_ioa = min_ioa;
        self
    }

    /// Skip failing tiles (with a warning) instead of aborting the run.
    pub fn with_best_effort(mut self, best_effort: bool) -> Self {
        self.config.best_effort = best_effort;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        self.debug = Some(DebugConfig::new(output_dir)?);
        Ok(self)
    }

    /// Detect text over the whole image.
    ///
    /// Parameters are validated before any tile is cut. A tile failure aborts
    /// the run unless best-effort mode is enabled.
    pub async fn run(&self, image: &SourceImage) -> Result<DetectionSet> {
        self.config.validate()?;
        let tiler = TileGenerator::new(self.config.patch_size, self.config.overlap_fraction)?;
        let dedup = OverlapDeduplicator::new(self.config.min_ioa)?;

        let tiles = tiler.generate(image);
        if tiles.is_empty() {
            info!(image = image.id(), "image has no pixels, nothing to detect");
            return Ok(DetectionSet::empty(image.id()));
        }

        info!(
            image = image.id(),
            width = image.width(),
            height = image.height(),
            tiles = tiles.len(),
            model = self.model.name(),
            "spotting text"
        );

        if let Some(debug_config) = &self.debug {
            debug_config
                .save_tiles(image, &tiles)
                .map_err(SpotError::DebugOutput)?;
        }

        let (detections, skipped_tiles) = self.infer_tiles(tiles).await?;

        let remapped = self.debug.as_ref().map(|_| detections.clone());
        let kept = dedup.deduplicate(detections);

        if let (Some(debug_config), Some(remapped)) = (&self.debug, remapped) {
            debug_config
                .save_detections(image, &remapped, &kept)
                .map_err(SpotError::DebugOutput)?;
        }

        info!(
            image = image.id(),
            detections = kept.len(),
            skipped = skipped_tiles.len(),
            "text spotting finished"
        );

        Ok(DetectionSet {
            image_id: image.id().to_string(),
            detections: kept,
            skipped_tiles,
        })
    }

    /// Run the model over every tile and collect the remapped detections in
    /// tile order, together with the ids of tiles skipped in best-effort mode.
    async fn infer_tiles(&self, tiles: Vec<Tile>) -> Result<(Vec<Detection>, Vec<usize>)> {
        let tile_count = tiles.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();

        for tile in tiles {
            let semaphore = Arc::clone(&semaphore);
            let model = Arc::clone(&self.model);
            let tile_id = tile.id();

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(permit) => tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        infer_tile(model.as_ref(), &tile)
                    })
                    .await
                    .unwrap_or_else(|err| {
                        Err(ModelError::TaskFailed {
                            tile_id: Some(tile_id),
                            message: err.to_string(),
                        }
                        .into())
                    }),
                    Err(err) => Err(ModelError::TaskFailed {
                        tile_id: Some(tile_id),
                        message: err.to_string(),
                    }
                    .into()),
                };
                (tile_id, outcome)
            });
        }

        // One slot per tile keeps the merged order independent of completion order.
        let mut slots: Vec<Option<Vec<Detection>>> = vec![None; tile_count];
        let mut skipped = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (tile_id, outcome) = joined.map_err(|err| ModelError::TaskFailed {
                tile_id: None,
                message: err.to_string(),
            })?;

            match outcome {
                Ok(detections) => slots[tile_id] = Some(detections),
                Err(SpotError::Model(err)) if self.config.best_effort => {
                    warn!(tile = tile_id, error = %err, "skipping tile after inference failure");
                    skipped.push(tile_id);
                }
                Err(err) => {
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }

        skipped.sort_unstable();
        let detections = slots.into_iter().flatten().flatten().collect();
        Ok((detections, skipped))
    }
}

fn infer_tile(model: &dyn DetectionModel, tile: &Tile) -> Result<Vec<Detection>> {
    let raw = model.infer(tile)?;
    debug!(
        tile = tile.id(),
        row = tile.row(),
        col = tile.col(),
        detections = raw.len(),
        "tile inferred"
    );
    Ok(mapping::remap_all(raw, tile)?)
}

/// One-shot convenience wrapper around [`Pipeline`] with the default policy.
pub async fn run(
    image: &SourceImage,
    patch_size: u32,
    overlap_fraction: f32,
    min_ioa: f32,
    model: Arc<dyn DetectionModel>,
) -> Result<DetectionSet> {
    Pipeline::new(model)
        .with_patch_size(patch_size)
        .with_overlap_fraction(overlap_fraction)
        .with_min_ioa(min_ioa)
        .run(image)
        .await
}
