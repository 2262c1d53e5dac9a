use std::path::{Path, PathBuf};

use anyhow::Context;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as DrawRect;
use tracing::debug;

use crate::geometry::{Geometry, Point};
use crate::image_source::SourceImage;
use crate::models::Detection;
use crate::tiling::Tile;

const TILE_COLOR: Rgba<u8> = Rgba([0, 120, 255, 255]);
const RAW_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const KEPT_COLOR: Rgba<u8> = Rgba([0, 200, 0, 255]);

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// The directory must be empty or non-existent.
    pub fn new(output_dir: PathBuf) -> anyhow::Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        Ok(Self { output_dir })
    }

    fn step_dir(&self, name: &str) -> anyhow::Result<PathBuf> {
        let dir = self.output_dir.join(name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create debug directory {:?}", dir))?;
        Ok(dir)
    }

    /// Save the tile grid drawn over the input, plus each tile's pixels.
    pub fn save_tiles(&self, image: &SourceImage, tiles: &[Tile]) -> anyhow::Result<()> {
        let mut canvas = image.image().to_rgba8();
        for tile in tiles {
            let region = tile.region();
            if region.width == 0 || region.height == 0 {
                continue;
            }
            draw_hollow_rect_mut(
                &mut canvas,
                DrawRect::at(region.x as i32, region.y as i32).of_size(region.width, region.height),
                TILE_COLOR,
            );
        }
        save(&canvas, &self.step_dir("00_input")?.join("tiles.png"))?;

        let tiles_dir = self.step_dir("01_tiles")?;
        for tile in tiles {
            let filename = format!("{:02}-{:02}.png", tile.row(), tile.col());
            tile.image()
                .save(tiles_dir.join(&filename))
                .map_err(|e| anyhow::anyhow!("Failed to save debug tile {}: {}", filename, e))?;
        }
        debug!(tiles = tiles.len(), dir = %tiles_dir.display(), "saved debug tiles");
        Ok(())
    }

    /// Overlay of every remapped detection (red) and the survivors of deduplication (green).
    pub fn save_detections(
        &self,
        image: &SourceImage,
        remapped: &[Detection],
        kept: &[Detection],
    ) -> anyhow::Result<()> {
        let mut canvas = image.image().to_rgba8();
        for detection in remapped {
            draw_geometry(&mut canvas, &detection.geometry, RAW_COLOR);
        }
        for detection in kept {
            draw_geometry(&mut canvas, &detection.geometry, KEPT_COLOR);
        }

        let path = self.step_dir("02_detections")?.join("overlay.png");
        save(&canvas, &path)?;
        debug!(
            remapped = remapped.len(),
            kept = kept.len(),
            path = %path.display(),
            "saved detection overlay"
        );
        Ok(())
    }
}

fn draw_geometry(canvas: &mut RgbaImage, geometry: &Geometry, color: Rgba<u8>) {
    let outline: Vec<Point> = match geometry {
        Geometry::Rect(rect) => rect.corners().to_vec(),
        Geometry::Polygon(polygon) => polygon.points.clone(),
    };

    for (i, start) in outline.iter().enumerate() {
        let end = outline[(i + 1) % outline.len()];
        draw_line_segment_mut(canvas, (start.x, start.y), (end.x, end.y), color);
    }
}

fn save(canvas: &RgbaImage, path: &Path) -> anyhow::Result<()> {
    canvas
        .save(path)
        .map_err(|e| anyhow::anyhow!("Failed to save debug image {}: {}", path.display(), e))
}
