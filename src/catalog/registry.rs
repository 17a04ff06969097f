//! Model registry
//!
//! Loads every model, addon, animation set and default preset document,
//! merges addons into their base models, then initializes each model once.
//! Models are handed out as `Arc<SkinModel>` and never mutated afterwards.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::model::SkinModel;
use super::preset::ModelPreset;
use crate::animation::AnimationSet;
use crate::errors::{Result, SkinError};

#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: FxHashMap<String, Arc<SkinModel>>,
    /// Registration order of base models
    codes: Vec<String>,
    animation_sets: FxHashMap<String, AnimationSet>,
    default_presets: FxHashMap<String, ModelPreset>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from already-parsed documents.
    ///
    /// Base models are registered first (a duplicate code replaces the
    /// earlier model). Addons are then applied in order; an addon whose base
    /// model is missing is skipped. Finally every model is initialized.
    #[must_use]
    pub fn build(
        documents: Vec<SkinModel>,
        animation_sets: Vec<AnimationSet>,
        presets: Vec<ModelPreset>,
    ) -> Self {
        let (addons, bases): (Vec<_>, Vec<_>) =
            documents.into_iter().partition(SkinModel::is_addon);

        let mut staged: FxHashMap<String, SkinModel> = FxHashMap::default();
        let mut codes = Vec::new();
        for model in bases {
            if staged.contains_key(&model.code) {
                log::warn!("Duplicate skin model {}, replacing", model.code);
            } else {
                codes.push(model.code.clone());
            }
            staged.insert(model.code.clone(), model);
        }

        for addon in addons {
            let target = addon.addon.clone().unwrap_or_default();
            match staged.get_mut(&target) {
                Some(base) => {
                    log::debug!("Applying addon {} to model {target}", addon.code);
                    base.apply_addon(addon);
                }
                None => log::warn!(
                    "Addon {} targets unknown model {target}, skipped",
                    addon.code
                ),
            }
        }

        let models = staged
            .into_iter()
            .map(|(code, mut model)| {
                model.initialize();
                (code, Arc::new(model))
            })
            .collect();

        let mut default_presets = FxHashMap::default();
        for preset in presets {
            default_presets.insert(preset.model.clone(), preset);
        }

        Self {
            models,
            codes,
            animation_sets: animation_sets
                .into_iter()
                .map(|set| (set.code.clone(), set))
                .collect(),
            default_presets,
        }
    }

    /// Parses JSON documents then [`build`](Self::build)s.
    pub fn from_json_documents(
        models: &[&str],
        animation_sets: &[&str],
        presets: &[&str],
    ) -> Result<Self> {
        let models = models
            .iter()
            .map(|json| SkinModel::from_json(json))
            .collect::<Result<Vec<_>>>()?;
        let sets = animation_sets
            .iter()
            .map(|json| Ok(serde_json::from_str::<AnimationSet>(json)?))
            .collect::<Result<Vec<_>>>()?;
        let presets = presets
            .iter()
            .map(|json| ModelPreset::from_json(json))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::build(models, sets, presets))
    }

    /// Loads `models/`, `animations/` and `presets/` JSON files under `root`.
    /// Missing folders are treated as empty.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let models = read_json_dir(&root.join("models"))?;
        let sets = read_json_dir(&root.join("animations"))?;
        let presets = read_json_dir(&root.join("presets"))?;
        fn as_refs(docs: &[String]) -> Vec<&str> {
            docs.iter().map(String::as_str).collect()
        }
        Self::from_json_documents(&as_refs(&models), &as_refs(&sets), &as_refs(&presets))
    }

    #[must_use]
    pub fn model(&self, code: &str) -> Option<&Arc<SkinModel>> {
        self.models.get(code)
    }

    pub fn require_model(&self, code: &str) -> Result<&Arc<SkinModel>> {
        self.model(code)
            .ok_or_else(|| SkinError::UnknownModel(code.to_string()))
    }

    /// Model codes in registration order.
    #[must_use]
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Models shown in character creation.
    pub fn visible_models(&self) -> impl Iterator<Item = &Arc<SkinModel>> {
        self.codes
            .iter()
            .filter_map(|code| self.models.get(code))
            .filter(|m| !m.hidden)
    }

    #[must_use]
    pub fn animation_sets(&self) -> &FxHashMap<String, AnimationSet> {
        &self.animation_sets
    }

    #[must_use]
    pub fn default_preset(&self, model: &str) -> Option<&ModelPreset> {
        self.default_presets.get(model)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn read_json_dir(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    paths
        .into_iter()
        .map(|p| Ok(std::fs::read_to_string(p)?))
        .collect()
}
