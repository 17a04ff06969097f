//! Animation metadata, overrides and the shared resolved-animation cache.
//!
//! - [`AnimationClip`]: keyframed shape animation (extra clips come from [`AnimationSet`]s)
//! - [`AnimationMeta`] / [`AnimationOverride`]: playback metadata and its patch form
//! - [`EntityAnimations`]: per-entity metadata with restore-then-patch reloads
//! - [`AnimationCache`]: resolved clips keyed by `(entity type, model shape)`

pub mod cache;
pub mod clip;
pub mod meta;
pub mod state;

pub use cache::{AnimCacheKey, AnimationCache, CachedAnimations};
pub use clip::{AnimationClip, AnimationSet, ElementPose, Keyframe};
pub use meta::{AnimationMeta, AnimationOverride, BlendMode};
pub use state::EntityAnimations;
