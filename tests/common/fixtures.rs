use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};
use spot_text::detection::{DetectionModel, ensure_non_empty};
use spot_text::{Detection, Geometry, ModelError, RawDetection, Rect, SourceImage, Tile};

/// Confidence reported for a word the tile sees completely.
pub const FULL_VIEW_CONFIDENCE: f32 = 0.9;
/// Confidence reported for a word cut off by the tile edge.
pub const PARTIAL_VIEW_CONFIDENCE: f32 = 0.5;

/// Creates a black RGB image of the given size.
pub fn blank_image(width: u32, height: u32) -> SourceImage {
    SourceImage::from_image("synthetic.png", DynamicImage::ImageRgb8(RgbImage::new(width, height)))
}

/// Creates an image whose pixels encode their own coordinates.
pub fn gradient_image(width: u32, height: u32) -> SourceImage {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 7]));
    SourceImage::from_image("gradient.png", DynamicImage::ImageRgb8(img))
}

pub fn rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Geometry {
    Geometry::Rect(Rect::from_coords(x1, y1, x2, y2))
}

/// Parent-space detection with a box geometry.
pub fn detection(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, tile_id: usize) -> Detection {
    Detection {
        geometry: rect(x1, y1, x2, y2),
        text: None,
        confidence,
        tile_id,
    }
}

/// A word printed on the synthetic page, in parent coordinates.
#[derive(Debug, Clone)]
pub struct Word {
    pub text: String,
    pub bounds: Rect,
}

pub fn word(text: &str, x1: f32, y1: f32, x2: f32, y2: f32) -> Word {
    Word {
        text: text.to_string(),
        bounds: Rect::from_coords(x1, y1, x2, y2),
    }
}

/// Deterministic detector that "sees" the part of each word inside the tile.
///
/// Words cut by the tile edge come back clipped and with a lower confidence,
/// which is what a real detector does with text split across tiles.
pub struct PageStub {
    pub words: Vec<Word>,
}

impl PageStub {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }
}

impl DetectionModel for PageStub {
    fn infer(&self, tile: &Tile) -> Result<Vec<RawDetection>, ModelError> {
        ensure_non_empty(tile)?;

        let region = tile.region();
        let tile_rect = Rect::from_coords(
            region.x as f32,
            region.y as f32,
            region.right() as f32,
            region.bottom() as f32,
        );

        let mut detections = Vec::new();
        for word in &self.words {
            let Some(visible) = word.bounds.intersection(&tile_rect) else {
                continue;
            };
            let confidence = if visible == word.bounds {
                FULL_VIEW_CONFIDENCE
            } else {
                PARTIAL_VIEW_CONFIDENCE
            };
            detections.push(RawDetection::new(
                Geometry::Rect(visible.translate(-(region.x as f32), -(region.y as f32))),
                Some(word.text.clone()),
                confidence,
            ));
        }
        Ok(detections)
    }

    fn name(&self) -> &str {
        "page-stub"
    }
}

/// Fails on the listed tiles and otherwise defers to a [`PageStub`].
pub struct FailingStub {
    pub inner: PageStub,
    pub failing_tiles: HashSet<usize>,
}

impl DetectionModel for FailingStub {
    fn infer(&self, tile: &Tile) -> Result<Vec<RawDetection>, ModelError> {
        if self.failing_tiles.contains(&tile.id()) {
            return Err(ModelError::Backend {
                tile_id: tile.id(),
                message: "device unavailable".to_string(),
            });
        }
        self.inner.infer(tile)
    }

    fn name(&self) -> &str {
        "failing-stub"
    }
}

/// Panics on one tile.
pub struct PanickingStub {
    pub panic_on: usize,
}

impl DetectionModel for PanickingStub {
    fn infer(&self, tile: &Tile) -> Result<Vec<RawDetection>, ModelError> {
        if tile.id() == self.panic_on {
            panic!("backend crashed on tile {}", tile.id());
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "panicking-stub"
    }
}

/// Returns the same detections for every tile.
pub struct FixedStub {
    pub detections: Vec<RawDetection>,
}

impl DetectionModel for FixedStub {
    fn infer(&self, _tile: &Tile) -> Result<Vec<RawDetection>, ModelError> {
        Ok(self.detections.clone())
    }

    fn name(&self) -> &str {
        "fixed-stub"
    }
}

/// Records how often it is called and how many calls overlap in time.
#[derive(Default)]
pub struct CountingStub {
    pub delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen_tiles: Mutex<Vec<usize>>,
}

impl CountingStub {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen_tiles(&self) -> Vec<usize> {
        let mut seen = self.seen_tiles.lock().unwrap().clone();
        seen.sort_unstable();
        seen
    }
}

impl DetectionModel for CountingStub {
    fn infer(&self, tile: &Tile) -> Result<Vec<RawDetection>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.seen_tiles.lock().unwrap().push(tile.id());

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "counting-stub"
    }
}
