//! Raster persistence.
//!
//! The pipeline only needs two operations from storage: load a raster from a
//! path and save one to a path. [`FileStore`] backs them with the `image`
//! crate's codecs; [`MemoryStore`] keeps everything in memory and records
//! every save, which is what the orchestration tests observe.

use crate::core::error::{EditorError, EditorResult};
use crate::core::raster::Raster;
use image::{DynamicImage, ImageFormat};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Storage for rasters addressed by path.
pub trait RasterStore: Send + Sync {
    /// Load a raster; both of its planes hold the stored pixels.
    fn load(&self, path: &Path) -> EditorResult<Raster>;

    /// Persist the raster's output plane.
    fn save(&self, raster: &Raster, path: &Path) -> EditorResult<()>;
}

/// Filesystem-backed store; the encoding follows the destination extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    /// Create a new file store.
    pub fn new() -> Self {
        Self
    }
}

impl RasterStore for FileStore {
    fn load(&self, path: &Path) -> EditorResult<Raster> {
        let image = image::open(path).map_err(|source| EditorError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "Loaded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Raster::from_dynamic(image))
    }

    fn save(&self, raster: &Raster, path: &Path) -> EditorResult<()> {
        let image = raster.to_dynamic();
        // JPEG has neither alpha nor 16-bit samples.
        let image = match ImageFormat::from_path(path) {
            Ok(ImageFormat::Jpeg) => DynamicImage::ImageRgb8(image.to_rgb8()),
            _ => image,
        };
        image.save(path).map_err(|source| EditorError::Save {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Saved {}", path.display());
        Ok(())
    }
}

/// In-memory store that records the order of saves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rasters: Mutex<HashMap<PathBuf, Raster>>,
    saves: Mutex<Vec<PathBuf>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `raster` loadable from `path`.
    pub fn insert(&self, path: impl Into<PathBuf>, raster: Raster) {
        self.rasters.lock().insert(path.into(), raster);
    }

    /// Builder form of [`MemoryStore::insert`].
    pub fn with_raster(self, path: impl Into<PathBuf>, raster: Raster) -> Self {
        self.insert(path, raster);
        self
    }

    /// The raster stored at `path`, if any.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Raster> {
        self.rasters.lock().get(path.as_ref()).cloned()
    }

    /// Every destination saved so far, in completion order.
    pub fn saves(&self) -> Vec<PathBuf> {
        self.saves.lock().clone()
    }

    /// Number of save operations performed.
    pub fn save_count(&self) -> usize {
        self.saves.lock().len()
    }
}

impl RasterStore for MemoryStore {
    fn load(&self, path: &Path) -> EditorResult<Raster> {
        self.get(path).ok_or_else(|| EditorError::Load {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no raster stored at this path",
            )),
        })
    }

    fn save(&self, raster: &Raster, path: &Path) -> EditorResult<()> {
        // Stored as a fresh raster so it can be loaded again as a source.
        let saved = Raster::from_plane(raster.output().clone()).with_depth(raster.depth());
        self.rasters.lock().insert(path.to_path_buf(), saved);
        self.saves.lock().push(path.to_path_buf());
        Ok(())
    }
}
