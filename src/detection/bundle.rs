//! Combined model artifact, built once from partial model files and reused.
//!
//! The bundle is a zstd-compressed tar archive whose entries are keyed by the
//! partial file names. It is written to a temporary file next to its final
//! location and renamed into place, so concurrent runs never observe a
//! half-written bundle.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tar::{Archive, Builder};
use tracing::{debug, info};
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

pub const DETECTION_MODEL: &str = "text-detection.rten";
pub const RECOGNITION_MODEL: &str = "text-recognition.rten";
pub const BUNDLE_FILE_NAME: &str = "ocrs-models.tar.zst";

const ZSTD_LEVEL: i32 = 3;

/// Merge two or more partial model files into a single bundle at `dest`.
pub fn merge_partials<P: AsRef<Path>>(parts: &[P], dest: &Path) -> anyhow::Result<()> {
    if parts.len() < 2 {
        anyhow::bail!(
            "At least two partial model files are required to build a bundle, got {}",
            parts.len()
        );
    }

    let mut keys = HashSet::new();
    for part in parts {
        let part = part.as_ref();
        if !part.is_file() {
            anyhow::bail!("Partial model file not found: {}", part.display());
        }
        let key = entry_key(part)?;
        if !keys.insert(key.clone()) {
            anyhow::bail!("Duplicate partial model entry {:?} ({})", key, part.display());
        }
    }

    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create bundle directory {:?}", dir))?;

    let mut staging = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create staging file in {:?}", dir))?;
    {
        let encoder = ZstdEncoder::new(staging.as_file_mut(), ZSTD_LEVEL)
            .with_context(|| format!("Failed to create zstd encoder for {:?}", dest))?;
        let mut tar = Builder::new(encoder);

        for part in parts {
            let part = part.as_ref();
            let key = entry_key(part)?;
            debug!(entry = %key, source = %part.display(), "adding partial model");
            tar.append_path_with_name(part, &key)
                .with_context(|| format!("Failed to add {:?} to bundle", part))?;
        }

        let encoder = tar
            .into_inner()
            .with_context(|| format!("Failed to finalize tar for {:?}", dest))?;
        encoder
            .finish()
            .with_context(|| format!("Failed to finalize zstd stream for {:?}", dest))?;
    }

    staging
        .persist(dest)
        .with_context(|| format!("Failed to move bundle into place at {:?}", dest))?;
    Ok(())
}

fn entry_key(part: &Path) -> anyhow::Result<String> {
    part.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("Partial model path has no file name: {}", part.display()))
}

/// Model files loaded from a bundle, keyed by entry name.
#[derive(Debug)]
pub struct ModelBundle {
    path: PathBuf,
    entries: BTreeMap<String, Vec<u8>>,
}

impl ModelBundle {
    /// Path of the bundle inside `model_dir`, building it from the partial
    /// detection and recognition models if it does not exist yet.
    pub fn ensure(model_dir: &Path) -> anyhow::Result<PathBuf> {
        let bundle_path = model_dir.join(BUNDLE_FILE_NAME);
        if bundle_path.is_file() {
            debug!(path = %bundle_path.display(), "reusing model bundle");
            return Ok(bundle_path);
        }

        let parts = [
            model_dir.join(DETECTION_MODEL),
            model_dir.join(RECOGNITION_MODEL),
        ];
        if let Some(missing) = parts.iter().find(|p| !p.is_file()) {
            anyhow::bail!(
                "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
                 Missing: {}\n\
                 Expected locations:\n  - {}\n  - {}",
                missing.display(),
                parts[0].display(),
                parts[1].display()
            );
        }

        info!(path = %bundle_path.display(), "merging partial model files into bundle");
        merge_partials(&parts, &bundle_path)?;
        Ok(bundle_path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .with_context(|| format!("Failed to open model bundle {:?}", path))?;
        let decoder = ZstdDecoder::new(file)
            .with_context(|| format!("Invalid zstd stream in {:?}", path))?;

        let mut archive = Archive::new(decoder);
        let mut entries = BTreeMap::new();
        for entry in archive
            .entries()
            .with_context(|| format!("Failed to read archive {:?}", path))?
        {
            let mut entry = entry.with_context(|| format!("Corrupt entry in {:?}", path))?;
            let name = entry.path()?.to_string_lossy().into_owned();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut data)
                .with_context(|| format!("Failed to read {:?} from {:?}", name, path))?;
            entries.insert(name, data);
        }

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Remove an entry, handing ownership of its bytes to the caller.
    pub fn take(&mut self, name: &str) -> anyhow::Result<Vec<u8>> {
        self.entries
            .remove(name)
            .ok_or_else(|| anyhow::anyhow!("Model bundle {:?} has no entry {:?}", self.path, name))
    }
}
