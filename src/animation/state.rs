use std::collections::BTreeMap;

use super::meta::{AnimationMeta, AnimationOverride};

/// Per-entity animation metadata with a pristine snapshot.
///
/// The snapshot is taken the first time [`reload`](Self::reload) runs and is
/// restored before every later reload, so overrides always apply to the
/// original values and never compound.
#[derive(Debug, Clone, Default)]
pub struct EntityAnimations {
    metas: Vec<AnimationMeta>,
    base: BTreeMap<String, AnimationMeta>,
}

impl EntityAnimations {
    #[must_use]
    pub fn new(metas: Vec<AnimationMeta>) -> Self {
        Self {
            metas,
            base: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn metas(&self) -> &[AnimationMeta] {
        &self.metas
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&AnimationMeta> {
        self.metas.iter().find(|m| m.code == code)
    }

    /// True once the pristine snapshot has been captured.
    #[must_use]
    pub fn has_base_snapshot(&self) -> bool {
        !self.base.is_empty()
    }

    /// Restore, remap, then apply overrides.
    pub fn reload(
        &mut self,
        remappings: &BTreeMap<String, String>,
        overrides: &[AnimationOverride],
    ) {
        if self.base.is_empty() {
            self.base = self
                .metas
                .iter()
                .map(|m| (m.code.clone(), m.clone()))
                .collect();
        }

        for meta in &mut self.metas {
            if let Some(base) = self.base.get(&meta.code) {
                meta.clone_from(base);
            }
        }

        for meta in &mut self.metas {
            meta.apply_remappings(remappings);
        }

        for patch in overrides {
            let existing = patch.code.as_deref().filter(|code| self.base.contains_key(*code));
            if let Some(code) = existing
                && let Some(meta) = self.metas.iter_mut().find(|m| m.code == code)
            {
                patch.apply_to(meta);
                continue;
            }

            match patch.to_meta() {
                Some(meta) => self.upsert(meta),
                None => log::error!(
                    "Animation override missing code: {}",
                    patch.animation.as_deref().unwrap_or("<none>")
                ),
            }
        }
    }

    fn upsert(&mut self, meta: AnimationMeta) {
        match self.metas.iter_mut().find(|m| m.code == meta.code) {
            Some(slot) => *slot = meta,
            None => self.metas.push(meta),
        }
    }
}
