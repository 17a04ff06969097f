//! Texture atlas seam and the per-entity texture compositor.
//!
//! - [`TextureAtlas`]: host atlas interface (allocation, upload, draw)
//! - [`CpuAtlas`]: in-memory atlas for servers, tools and tests
//! - [`TextureAllocation`]: one target's CPU buffer and atlas region
//! - [`TextureCompositor`]: paints applied parts into allocations and commits them

pub mod allocation;
pub mod atlas;
pub mod compositor;
pub mod cpu_atlas;

pub use allocation::TextureAllocation;
pub use atlas::{
    AtlasBlend, AtlasPosition, ClearTextureCache, GpuTextureId, SubId, TextureAtlas, TextureRegion,
};
pub use compositor::{CompositorSettings, TextureCompositor, TextureInputs, TextureReport};
pub use cpu_atlas::CpuAtlas;
