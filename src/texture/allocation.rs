use crate::errors::Result;
use crate::resources::{Bitmap, ChangeTracker};
use crate::utils::color::blend_over;

use super::atlas::{AtlasBlend, AtlasPosition, GpuTextureId, SubId, TextureAtlas, TextureRegion};

/// One texture target of one entity: a reserved atlas region, the CPU pixel
/// buffer mirrored into it, and the lazily created upload texture.
#[derive(Debug)]
pub struct TextureAllocation {
    /// `"{target}-{entity id}"`
    key: String,
    target: String,
    sub_id: SubId,
    position: AtlasPosition,
    texture: Option<GpuTextureId>,
    buffer: Bitmap,
    commits: ChangeTracker,
}

impl TextureAllocation {
    #[must_use]
    pub fn new(key: String, target: &str, sub_id: SubId, position: AtlasPosition) -> Self {
        Self {
            key,
            target: target.to_string(),
            sub_id,
            position,
            texture: None,
            buffer: Bitmap::new(position.width, position.height),
            commits: ChangeTracker::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline]
    #[must_use]
    pub fn sub_id(&self) -> SubId {
        self.sub_id
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> &AtlasPosition {
        &self.position
    }

    #[inline]
    #[must_use]
    pub fn texture(&self) -> Option<GpuTextureId> {
        self.texture
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// CPU pixels as of the last write.
    #[must_use]
    pub fn pixels(&self) -> &Bitmap {
        &self.buffer
    }

    /// Incremented on every commit.
    #[must_use]
    pub fn commit_version(&self) -> u64 {
        self.commits.version()
    }

    /// Zeroes the buffer.
    pub fn clear_pixels(&mut self) {
        self.buffer.fill(0);
    }

    pub fn fill_pixels(&mut self, color: u32) {
        self.buffer.fill(color);
    }

    /// Writes `src` (row-major, `src_width x src_height`) with its top-left
    /// corner at `(x, y)`. Pixels falling outside the buffer on either axis
    /// are dropped. With `overlay` the source is alpha-blended over the
    /// buffer, otherwise it replaces it.
    pub fn write_pixels(
        &mut self,
        src: &[u32],
        src_width: u32,
        src_height: u32,
        x: i32,
        y: i32,
        overlay: bool,
    ) {
        let width = i64::from(self.buffer.width());
        let height = i64::from(self.buffer.height());
        let src_width = src_width as usize;
        let pixels = self.buffer.pixels_mut();

        for (sy, row) in src.chunks(src_width.max(1)).take(src_height as usize).enumerate() {
            let dy = i64::from(y) + sy as i64;
            if dy < 0 || dy >= height {
                continue;
            }
            for (sx, &value) in row.iter().enumerate() {
                let dx = i64::from(x) + sx as i64;
                if dx < 0 || dx >= width {
                    continue;
                }
                let idx = (dy * width + dx) as usize;
                pixels[idx] = if overlay {
                    blend_over(pixels[idx], value)
                } else {
                    value
                };
            }
        }
    }

    /// Uploads the buffer (creating the texture on first use) and draws it
    /// over the reserved region.
    pub fn commit(&mut self, atlas: &mut dyn TextureAtlas) -> Result<()> {
        let (w, h) = (self.buffer.width(), self.buffer.height());
        let texture = atlas.upload(self.texture, self.buffer.pixels(), w, h)?;
        self.texture = Some(texture);
        atlas.render_into_atlas(
            &TextureRegion::full(texture, w, h),
            &self.position,
            0,
            0,
            AtlasBlend::Replace,
        )?;
        self.commits.changed();
        Ok(())
    }

    /// Releases the atlas region and the upload texture.
    pub fn release(self, atlas: &mut dyn TextureAtlas) {
        if let Some(texture) = self.texture {
            atlas.dispose(texture);
        }
        atlas.free(self.sub_id);
    }
}
