pub mod bundle;
pub mod ocr;

use crate::error::ModelError;
use crate::models::RawDetection;
use crate::tiling::Tile;

pub use bundle::ModelBundle;
pub use ocr::OcrsDetector;

/// A text detector that works on one tile at a time.
///
/// Implementations must not keep per-call state: the pipeline may invoke
/// `infer` for different tiles concurrently and in any order. Results are in
/// tile-local pixel coordinates.
pub trait DetectionModel: Send + Sync {
    fn infer(&self, tile: &Tile) -> Result<Vec<RawDetection>, ModelError>;

    /// Human-readable name (used in log output)
    fn name(&self) -> &str;
}

/// Reject tiles with a zero-size dimension before handing them to a backend.
pub fn ensure_non_empty(tile: &Tile) -> Result<(), ModelError> {
    if tile.width() == 0 || tile.height() == 0 {
        return Err(ModelError::EmptyTile {
            tile_id: tile.id(),
            width: tile.width(),
            height: tile.height(),
        });
    }
    Ok(())
}
