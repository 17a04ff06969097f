use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Column of the emote wheel an emote is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmoteGuiPosition {
    #[default]
    #[serde(alias = "Default")]
    Default,
    #[serde(alias = "Left")]
    Left,
    #[serde(alias = "Right")]
    Right,
}

/// A `(part, variant)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartSelection {
    pub part: String,
    pub variant: String,
}

/// Transient override bundle: an animation plus skin part substitutions.
///
/// With an empty `skin_part_filter` the substituted parts replace the
/// selected ones entirely. With a filter, only part elements whose step
/// parent is listed are attached, and those step parents lose their current
/// children first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Emote {
    pub code: String,
    pub name: String,
    pub animation: Option<String>,
    /// Part code -> variant code
    pub skin_parts: BTreeMap<String, String>,
    pub skin_part_filter: SmallVec<[String; 4]>,
    pub icon: Option<String>,
    pub gui: EmoteGuiPosition,

    #[serde(skip)]
    parts: Vec<PartSelection>,
}

impl Emote {
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            name: code.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_part(mut self, part: &str, variant: &str) -> Self {
        self.skin_parts.insert(part.to_string(), variant.to_string());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, elements: &[&str]) -> Self {
        self.skin_part_filter = elements.iter().map(|e| (*e).to_string()).collect();
        self
    }

    pub(crate) fn initialize(&mut self) {
        self.parts = self
            .skin_parts
            .iter()
            .map(|(part, variant)| PartSelection {
                part: part.clone(),
                variant: variant.clone(),
            })
            .collect();
    }

    /// Flattened substitutions in stable iteration order.
    #[must_use]
    pub fn parts(&self) -> &[PartSelection] {
        &self.parts
    }

    /// True when the emote only touches filtered step parents.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.skin_part_filter.is_empty()
    }
}
