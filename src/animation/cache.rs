use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::clip::AnimationClip;

/// Identifies compiled animation data for one entity type on one model shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnimCacheKey {
    pub entity_code: String,
    pub model_path: String,
}

impl AnimCacheKey {
    #[must_use]
    pub fn new(entity_code: &str, model_path: &str) -> Self {
        Self {
            entity_code: entity_code.to_string(),
            model_path: model_path.to_string(),
        }
    }
}

impl fmt::Display for AnimCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.entity_code, self.model_path)
    }
}

/// Clips resolved against a shape's joint layout.
#[derive(Debug, Clone)]
pub struct CachedAnimations {
    pub clips: Arc<[AnimationClip]>,
    pub joint_count: u32,
}

/// Shared cache of resolved animations, keyed by `(entity type, model shape)`.
///
/// Entities of the same type wearing the same model share one entry. A model
/// reload must [`invalidate`](Self::invalidate) its key.
#[derive(Debug, Default)]
pub struct AnimationCache {
    entries: FxHashMap<AnimCacheKey, Arc<CachedAnimations>>,
}

impl AnimationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &AnimCacheKey) -> Option<Arc<CachedAnimations>> {
        self.entries.get(key).cloned()
    }

    /// Returns the entry for `key`, building it with `build` on a miss.
    pub fn get_or_insert_with(
        &mut self,
        key: &AnimCacheKey,
        build: impl FnOnce() -> CachedAnimations,
    ) -> Arc<CachedAnimations> {
        if let Some(hit) = self.entries.get(key) {
            return hit.clone();
        }
        log::debug!("Animation cache miss for {key}, building");
        let entry = Arc::new(build());
        self.entries.insert(key.clone(), entry.clone());
        entry
    }

    pub fn invalidate(&mut self, key: &AnimCacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
