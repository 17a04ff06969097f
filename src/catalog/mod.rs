//! Part Catalog
//!
//! Immutable, shared description of every skin model:
//!
//! - [`SkinPart`] / [`Variant`]: customization slots and their options
//! - [`TextureTarget`] / [`PaintingTarget`]: derived compositing targets
//! - [`Emote`]: transient part substitutions
//! - [`SkinModel`]: a model with its derived lookup tables
//! - [`ModelRegistry`]: loads models, applies addons, initializes

pub mod emote;
pub mod model;
pub mod part;
pub mod preset;
pub mod registry;
pub mod target;

pub use emote::{Emote, EmoteGuiPosition, PartSelection};
pub use model::{JointNames, SkinModel};
pub use part::{DressSlot, PartKind, PixelOffset, ScalePart, SkinPart, Variant};
pub use preset::ModelPreset;
pub use registry::ModelRegistry;
pub use target::{ClothingOverlay, PaintingTarget, TextureCopy, TextureTarget};
