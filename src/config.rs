use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::dedup::validate_min_ioa;
use crate::error::ConfigError;
use crate::tiling::TileGenerator;

pub const DEFAULT_PATCH_SIZE: u32 = 1024;
pub const DEFAULT_OVERLAP_FRACTION: f32 = 0.2;
pub const DEFAULT_MIN_IOA: f32 = 0.7;

/// Tiling, deduplication and scheduling parameters for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Edge length of the square tiles, in pixels.
    pub patch_size: u32,
    /// Fraction of `patch_size` shared by neighbouring tiles, in [0, 1).
    pub overlap_fraction: f32,
    /// Intersection-over-area at or above which two detections are duplicates.
    pub min_ioa: f32,
    /// Skip tiles whose inference fails instead of aborting the run.
    pub best_effort: bool,
    /// Upper bound on tile inferences in flight at once.
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            overlap_fraction: DEFAULT_OVERLAP_FRACTION,
            min_ioa: DEFAULT_MIN_IOA,
            best_effort: false,
            max_concurrency: 1,
        }
    }
}

impl PipelineConfig {
    /// Check every parameter without touching any image data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        TileGenerator::new(self.patch_size, self.overlap_fraction)?;
        validate_min_ioa(self.min_ioa)?;
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(ConfigError::ConcurrencyTooHigh {
                requested: self.max_concurrency,
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(())
    }
}
