//! Per-entity skin state and the two compositors that consume it.
//!
//! - [`Skinnable`]: entity facade (model, selection, commands, rebuild)
//! - [`SelectionState`]: persisted variant, color, scale and painting choices
//! - [`DirtyTracker`]: typed invalidation events between rebuilds
//! - [`ShapeCompositor`]: staged copy-on-write shape assembly
//! - [`Inventory`] / [`Equipment`]: worn items that hide elements and overlay textures

pub mod applied;
pub mod command;
pub mod dirty;
pub mod equipment;
pub mod selection;
pub mod shape_compositor;
pub mod skinnable;

pub use applied::{AppliedVariant, PartFilter, applied_parts};
pub use command::SkinCommand;
pub use dirty::{DirtyEvent, DirtyState, DirtyTracker, ShapeDirty};
pub use equipment::{Equipment, IGNORED_ITEM_TEXTURE, Inventory, ItemStack, ItemTexture};
pub use selection::{SelectionState, pitch_modifier};
pub use shape_compositor::{ShapeCompositor, ShapeInputs, ShapeReport, ShapeStage, Side};
pub use skinnable::{EmoteChange, Graphics, RebuildReport, SkinHost, Skinnable};
