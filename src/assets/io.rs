use std::cell::Cell;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::assets::location::AssetLocation;
use crate::errors::Result;
use crate::resources::Bitmap;
use crate::scene::Shape;

/// Shape loader.
///
/// Every call must return a fresh, independently owned shape: the compositor
/// mutates what it receives and never hands it back.
pub trait ShapeSource {
    fn load_shape(&self, location: &AssetLocation) -> Option<Shape>;
}

/// Decoded RGBA texture loader.
pub trait TextureSource {
    fn load_bitmap(&self, location: &AssetLocation) -> Option<Bitmap>;
}

// ============================================================================
// In-memory source
// ============================================================================

/// Shapes and bitmaps held in memory, keyed by normalized location.
///
/// Locations passed to the `insert_*` methods go through the same
/// normalization as lookups (`shapes/…json`, `textures/…png`), so callers can
/// register assets by the short names used in model configs.
#[derive(Debug, Default)]
pub struct MemoryAssets {
    shapes: FxHashMap<AssetLocation, Shape>,
    bitmaps: FxHashMap<AssetLocation, Bitmap>,
    shape_loads: Cell<usize>,
    bitmap_loads: Cell<usize>,
}

impl MemoryAssets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_shape(&mut self, location: &str, shape: Shape) {
        self.shapes.insert(AssetLocation::shape(location), shape);
    }

    pub fn insert_shape_json(&mut self, location: &str, json: &str) -> Result<()> {
        let shape = Shape::from_json(json)?;
        self.insert_shape(location, shape);
        Ok(())
    }

    pub fn insert_bitmap(&mut self, location: &str, bitmap: Bitmap) {
        self.bitmaps.insert(AssetLocation::texture(location), bitmap);
    }

    /// Number of successful shape loads served so far.
    #[must_use]
    pub fn shape_loads(&self) -> usize {
        self.shape_loads.get()
    }

    /// Number of successful bitmap loads served so far.
    #[must_use]
    pub fn bitmap_loads(&self) -> usize {
        self.bitmap_loads.get()
    }
}

impl ShapeSource for MemoryAssets {
    fn load_shape(&self, location: &AssetLocation) -> Option<Shape> {
        let shape = self.shapes.get(location)?.clone();
        self.shape_loads.set(self.shape_loads.get() + 1);
        Some(shape)
    }
}

impl TextureSource for MemoryAssets {
    fn load_bitmap(&self, location: &AssetLocation) -> Option<Bitmap> {
        let bitmap = self.bitmaps.get(location)?.clone();
        self.bitmap_loads.set(self.bitmap_loads.get() + 1);
        Some(bitmap)
    }
}

// ============================================================================
// File system source
// ============================================================================

/// Reads `<root>/<domain>/<path>` from disk.
pub struct FileAssets {
    root_path: PathBuf,
}

impl FileAssets {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            root_path: path.as_ref().to_path_buf(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    #[must_use]
    pub fn resolve(&self, location: &AssetLocation) -> PathBuf {
        self.root_path.join(&location.domain).join(&location.path)
    }

    fn read(&self, location: &AssetLocation) -> Option<Vec<u8>> {
        let path = self.resolve(location);
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::debug!("Asset {location} not readable at {}: {err}", path.display());
                None
            }
        }
    }
}

impl ShapeSource for FileAssets {
    fn load_shape(&self, location: &AssetLocation) -> Option<Shape> {
        let bytes = self.read(location)?;
        let text = String::from_utf8_lossy(&bytes);
        match Shape::from_json(&text) {
            Ok(shape) => Some(shape),
            Err(err) => {
                log::warn!("Shape {location} failed to parse: {err}");
                None
            }
        }
    }
}

impl TextureSource for FileAssets {
    fn load_bitmap(&self, location: &AssetLocation) -> Option<Bitmap> {
        let bytes = self.read(location)?;
        match Bitmap::from_png_bytes(&bytes) {
            Ok(bitmap) => Some(bitmap),
            Err(err) => {
                log::warn!("Texture {location} failed to decode: {err}");
                None
            }
        }
    }
}
