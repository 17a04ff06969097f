use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::utils::ColorRgb;

/// Flat snapshot of a selection: part -> variant, part -> scale,
/// part -> RGB color.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelPreset {
    pub model: String,
    pub parts: BTreeMap<String, String>,
    pub scale: BTreeMap<String, f64>,
    pub colors: BTreeMap<String, ColorRgb>,
}

impl ModelPreset {
    #[must_use]
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
