use crate::error::GeometryError;
use crate::models::{Detection, RawDetection};
use crate::tiling::Tile;

/// Move a tile-local detection into parent-image coordinates.
///
/// The geometry variant is kept; only coordinates are shifted by the tile
/// origin. Degenerate geometry is rejected before translation.
pub fn remap(raw: &RawDetection, tile: &Tile) -> Result<Detection, GeometryError> {
    raw.geometry.validate()?;

    let (dx, dy) = tile.origin();
    Ok(Detection {
        geometry: raw.geometry.translate(dx as f32, dy as f32),
        text: raw.text.clone(),
        confidence: raw.confidence,
        tile_id: tile.id(),
    })
}

/// Remap every detection of one tile, stopping at the first malformed one.
pub fn remap_all(raw: Vec<RawDetection>, tile: &Tile) -> Result<Vec<Detection>, GeometryError> {
    raw.iter().map(|detection| remap(detection, tile)).collect()
}
