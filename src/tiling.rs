//! Overlapping tile layout over a parent image.
//!
//! Tiles are square `patch_size` windows stepped by a stride derived from the
//! overlap fraction. The last tile along each axis is clipped to the image
//! edge instead of padded, so edge tiles can be narrower or shorter than the
//! patch size.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::image_source::SourceImage;

/// Pixel rectangle of a tile inside the parent image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRegion {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// One tile: its place in the grid and an owned copy of its pixels.
#[derive(Debug, Clone)]
pub struct Tile {
    id: usize,
    row: u32,
    col: u32,
    region: TileRegion,
    pixels: DynamicImage,
}

impl Tile {
    pub fn new(id: usize, row: u32, col: u32, region: TileRegion, pixels: DynamicImage) -> Self {
        Self {
            id,
            row,
            col,
            region,
            pixels,
        }
    }

    /// Row-major index within the grid.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    pub fn region(&self) -> TileRegion {
        self.region
    }

    /// Offset of the tile's top-left pixel in parent coordinates.
    pub fn origin(&self) -> (u32, u32) {
        (self.region.x, self.region.y)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.pixels
    }
}

/// Grid cell produced by [`TileGenerator::layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSlot {
    pub id: usize,
    pub row: u32,
    pub col: u32,
    pub region: TileRegion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGenerator {
    patch_size: u32,
    stride: u32,
}

impl TileGenerator {
    /// Validates the parameters and derives the stride,
    /// `floor(patch_size * (1 - overlap_fraction))`.
    pub fn new(patch_size: u32, overlap_fraction: f32) -> Result<Self, ConfigError> {
        if patch_size == 0 {
            return Err(ConfigError::ZeroPatchSize);
        }
        if !overlap_fraction.is_finite() || !(0.0..1.0).contains(&overlap_fraction) {
            return Err(ConfigError::OverlapOutOfRange(overlap_fraction));
        }

        let stride = (patch_size as f64 * (1.0 - overlap_fraction as f64)).floor() as u32;
        if stride == 0 {
            return Err(ConfigError::ZeroStride {
                patch_size,
                overlap: overlap_fraction,
            });
        }

        Ok(Self { patch_size, stride })
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Tile rectangles for an image of the given size, in row-major order.
    ///
    /// Empty when either dimension is zero.
    pub fn layout(&self, width: u32, height: u32) -> Vec<TileSlot> {
        let xs = self.axis_starts(width);
        let ys = self.axis_starts(height);

        let mut slots = Vec::with_capacity(xs.len() * ys.len());
        for (row, &y) in ys.iter().enumerate() {
            for (col, &x) in xs.iter().enumerate() {
                slots.push(TileSlot {
                    id: slots.len(),
                    row: row as u32,
                    col: col as u32,
                    region: TileRegion {
                        x,
                        y,
                        width: self.patch_size.min(width - x),
                        height: self.patch_size.min(height - y),
                    },
                });
            }
        }
        slots
    }

    /// Cut the image into tiles, copying each tile's pixels.
    pub fn generate(&self, image: &SourceImage) -> Vec<Tile> {
        let slots = self.layout(image.width(), image.height());
        debug!(
            image = image.id(),
            width = image.width(),
            height = image.height(),
            tiles = slots.len(),
            stride = self.stride,
            "generated tile layout"
        );

        slots
            .into_iter()
            .map(|slot| {
                let r = slot.region;
                let pixels = image.image().crop_imm(r.x, r.y, r.width, r.height);
                Tile::new(slot.id, slot.row, slot.col, r, pixels)
            })
            .collect()
    }

    /// Window start offsets along one axis.
    ///
    /// Stepping stops once a window reaches the edge, so no window lies
    /// entirely inside its predecessor.
    fn axis_starts(&self, len: u32) -> Vec<u32> {
        let mut starts = Vec::new();
        if len == 0 {
            return starts;
        }

        let mut start = 0u32;
        loop {
            starts.push(start);
            if start.saturating_add(self.patch_size) >= len {
                break;
            }
            start += self.stride;
        }
        starts
    }
}
