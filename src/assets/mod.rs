//! Asset addressing and loading
//!
//! - [`AssetLocation`]: `domain:path` addresses with the `shapes/` and
//!   `textures/` conventions
//! - [`ShapeSource`] / [`TextureSource`]: host loaders consumed by the compositors
//! - [`MemoryAssets`] / [`FileAssets`]: in-memory and on-disk implementations

pub mod io;
pub mod location;

pub use io::{FileAssets, MemoryAssets, ShapeSource, TextureSource};
pub use location::{AssetLocation, DEFAULT_DOMAIN, FALLBACK_DOMAIN};
