//! JSON export of a [`DetectionSet`].
//!
//! The document is an object keyed by detection id (its position in the set,
//! as a string) so that consumers can address detections individually:
//!
//! ```text
//! {
//!   "0": { "image_id": "sheet.png", "geometry": { "type": "polygon", ... },
//!          "text": "MILL", "confidence": 0.9, "tile_id": 3 },
//!   ...
//! }
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::geometry::Geometry;
use crate::models::DetectionSet;

#[derive(Serialize)]
struct DetectionRecord<'a> {
    image_id: &'a str,
    geometry: &'a Geometry,
    text: Option<&'a str>,
    confidence: f32,
    tile_id: usize,
}

/// Entries are emitted in set order, not sorted by key.
struct KeyedDetections<'a>(&'a DetectionSet);

impl Serialize for KeyedDetections<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let set = self.0;
        let mut map = serializer.serialize_map(Some(set.len()))?;
        for (id, detection) in set.iter().enumerate() {
            map.serialize_entry(
                &id.to_string(),
                &DetectionRecord {
                    image_id: &set.image_id,
                    geometry: &detection.geometry,
                    text: detection.text.as_deref(),
                    confidence: detection.confidence,
                    tile_id: detection.tile_id,
                },
            )?;
        }
        map.end()
    }
}

/// Write the set as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write>(set: &DetectionSet, mut writer: W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut writer, &KeyedDetections(set))
        .context("Failed to serialize detections")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write the set to `path`, creating parent directories as needed.
pub fn save_json(set: &DetectionSet, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
    }

    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_json(set, BufWriter::new(file))
}
