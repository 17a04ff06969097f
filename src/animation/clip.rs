use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Pose of one element at one keyframe. Absent components are not animated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementPose {
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub offset_z: Option<f64>,
    pub rotation_x: Option<f64>,
    pub rotation_y: Option<f64>,
    pub rotation_z: Option<f64>,
    pub stretch_x: Option<f64>,
    pub stretch_y: Option<f64>,
    pub stretch_z: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Keyframe {
    pub frame: u32,
    /// Element name -> pose
    pub elements: BTreeMap<String, ElementPose>,
}

/// Keyframed shape animation, referenced by [`AnimationMeta`](super::AnimationMeta)
/// through its `code`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationClip {
    pub code: String,
    pub name: String,
    pub quantity_frames: u32,
    pub keyframes: Vec<Keyframe>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(code: &str, quantity_frames: u32, keyframes: Vec<Keyframe>) -> Self {
        Self {
            code: code.to_string(),
            name: code.to_string(),
            quantity_frames,
            keyframes,
        }
    }

    /// Every element name this clip animates, each reported once.
    pub fn animated_elements(&self) -> impl Iterator<Item = &str> {
        let mut seen = BTreeMap::new();
        for kf in &self.keyframes {
            for name in kf.elements.keys() {
                seen.entry(name.as_str()).or_insert(());
            }
        }
        seen.into_keys()
    }
}

/// Named bundle of extra clips that models can opt into by code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationSet {
    pub code: String,
    pub animations: Vec<AnimationClip>,
}
