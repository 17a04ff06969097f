use smallvec::SmallVec;

use super::part::{DressSlot, PixelOffset};

/// Atlas region that one or more parts paint into, in render order.
///
/// The first part listed is the base layer: it is drawn without blending and
/// clears the buffer before drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureTarget {
    pub code: String,
    /// Part codes, ascending render order
    pub parts: Vec<String>,
    pub width: u32,
    pub height: u32,
}

impl TextureTarget {
    /// Code of the part that establishes the base layer.
    #[must_use]
    pub fn base_part(&self) -> Option<&str> {
        self.parts.first().map(String::as_str)
    }

    #[must_use]
    pub fn is_base_part(&self, part: &str) -> bool {
        self.base_part() == Some(part)
    }
}

/// Square user-painted canvas and the texture targets that display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintingTarget {
    pub code: String,
    pub size: u32,
    pub texture_targets: SmallVec<[String; 2]>,
}

impl PaintingTarget {
    /// Expected byte length of the stored RGBA pixels.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        (self.size as usize) * (self.size as usize) * 4
    }
}

/// "Copy target `from` into target `to`" directive, applied after commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureCopy {
    pub from: String,
    pub to: String,
}

/// Worn-item textures composited on top of a committed target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClothingOverlay {
    pub target: String,
    pub slots: SmallVec<[DressSlot; 4]>,
    pub offset: PixelOffset,
}
