//! Kemono skin compositing
//!
//! Incremental shape and texture compositing for customizable skeletal
//! characters. A [`SkinModel`] from the [`ModelRegistry`] describes which
//! parts an entity can customize; a [`Skinnable`] holds one entity's choices
//! and rebuilds only what its [`DirtyTracker`] says changed.
//!
//! ```rust,ignore
//! use kemono::prelude::*;
//!
//! let registry = ModelRegistry::from_dir("assets/kemono/config/skinmodels")?;
//! let mut skin = Skinnable::new(1, "kemono:player", Side::Client);
//! skin.set_model_code(&registry, "kemono0")?;
//! skin.enqueue(SkinCommand::select("hair", "braid"));
//! let report = skin.rebuild(&mut host)?;
//! ```

pub mod animation;
pub mod assets;
pub mod catalog;
pub mod errors;
pub mod resources;
pub mod scene;
pub mod skin;
pub mod texture;
pub mod utils;

pub use animation::{AnimationCache, AnimationClip, AnimationMeta};
pub use assets::{AssetLocation, FileAssets, MemoryAssets, ShapeSource, TextureSource};
pub use catalog::{Emote, ModelPreset, ModelRegistry, PartKind, SkinModel, SkinPart, Variant};
pub use errors::{Result, SkinError};
pub use resources::Bitmap;
pub use scene::{Shape, ShapeTree};
pub use skin::{
    DirtyEvent, DirtyTracker, SelectionState, ShapeCompositor, Side, SkinCommand, SkinHost,
    Skinnable,
};
pub use texture::{CpuAtlas, TextureAtlas, TextureCompositor};
pub use utils::ColorRgb;

/// Common imports for hosts.
pub mod prelude {
    pub use crate::animation::{AnimationCache, AnimationMeta};
    pub use crate::assets::{AssetLocation, ShapeSource, TextureSource};
    pub use crate::catalog::{ModelPreset, ModelRegistry, SkinModel};
    pub use crate::errors::{Result, SkinError};
    pub use crate::skin::{
        EmoteChange, Equipment, Graphics, Inventory, SelectionState, Side, SkinCommand, SkinHost,
        Skinnable,
    };
    pub use crate::texture::{ClearTextureCache, CpuAtlas, TextureAtlas};
}
