use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// What a part contributes to the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    /// Geometry attached to the base shape (and optionally a texture)
    #[default]
    #[serde(alias = "Shape")]
    Shape,
    /// Texture layer only
    #[serde(alias = "Texture")]
    Texture,
    /// Voice selection, no geometry or texture
    #[serde(alias = "Voice")]
    Voice,
}

/// Equipment slot of the character inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DressSlot {
    #[serde(alias = "Foot")]
    Foot,
    #[serde(alias = "Hand")]
    Hand,
    #[serde(alias = "Shoulder")]
    Shoulder,
    #[serde(alias = "UpperBody")]
    UpperBody,
    #[serde(alias = "LowerBody")]
    LowerBody,
    #[serde(alias = "Emblem")]
    Emblem,
    #[serde(alias = "Neck")]
    Neck,
    #[serde(alias = "Head")]
    Head,
    #[serde(alias = "Face")]
    Face,
    #[serde(alias = "Arm")]
    Arm,
    #[serde(alias = "ArmorHead")]
    ArmorHead,
    #[serde(alias = "ArmorBody")]
    ArmorBody,
    #[serde(alias = "ArmorLegs")]
    ArmorLegs,
}

/// Pixel offset inside a texture target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelOffset {
    pub x: i32,
    pub y: i32,
}

impl PixelOffset {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One selectable option of a part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Variant {
    pub code: String,
    /// Template code substituted for `{code}` when clothed
    pub alt_clothed: Option<String>,
    /// Template code substituted for `{code}` when armored
    pub alt_armored: Option<String>,
    pub shape: Option<String>,
    pub shape_clothed: Option<String>,
    pub shape_armored: Option<String>,
    pub texture: Option<String>,
    pub sound: Option<String>,
    /// Empty slot: the variant renders nothing
    pub skip: bool,
}

impl Variant {
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_texture(mut self, texture: &str) -> Self {
        self.texture = Some(texture.to_string());
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: &str) -> Self {
        self.shape = Some(shape.to_string());
        self
    }
}

/// A customization slot of a model ("hair", "eyes", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkinPart {
    pub code: String,
    /// Lower renders (and attaches) first
    pub render_order: i32,
    #[serde(rename = "type")]
    pub kind: PartKind,
    /// Face parts rebuild on the hot path and only exist client side
    pub face: bool,
    /// Shape path with a `{code}` placeholder for the variant code
    pub shape_template: Option<String>,
    pub variants: Vec<Variant>,
    /// Part-level texture used by every variant of a shape part
    pub texture: Option<String>,
    pub texture_render_to: PixelOffset,
    pub texture_target: Option<String>,
    pub texture_target_width: u32,
    pub texture_target_height: u32,
    pub use_painting: bool,
    pub painting_name: Option<String>,
    pub painting_size: u32,
    pub texture_copy_from: Option<String>,
    pub use_clothing_texture: bool,
    pub clothing_textures: Vec<DressSlot>,
    /// Cleared at initialization for the first part of each texture target
    pub texture_blend_overlay: bool,
    pub use_drop_down: bool,
    pub use_color_slider: bool,
    pub use_transform_slider: bool,
    pub alt_clothed_requirement: Vec<DressSlot>,
    pub alt_armored_requirement: Vec<DressSlot>,

    #[serde(skip)]
    variants_by_code: FxHashMap<String, usize>,
    #[serde(skip)]
    pub(crate) texture_target_index: Option<usize>,
    /// `texture_blend_overlay` as configured, before initialization touched it
    #[serde(skip)]
    configured_blend_overlay: Option<bool>,
}

impl Default for SkinPart {
    fn default() -> Self {
        Self {
            code: String::new(),
            render_order: 0,
            kind: PartKind::Shape,
            face: false,
            shape_template: None,
            variants: Vec::new(),
            texture: None,
            texture_render_to: PixelOffset::default(),
            texture_target: None,
            texture_target_width: 0,
            texture_target_height: 0,
            use_painting: false,
            painting_name: None,
            painting_size: 32,
            texture_copy_from: None,
            use_clothing_texture: false,
            clothing_textures: Vec::new(),
            texture_blend_overlay: true,
            use_drop_down: true,
            use_color_slider: false,
            use_transform_slider: false,
            alt_clothed_requirement: Vec::new(),
            alt_armored_requirement: Vec::new(),
            variants_by_code: FxHashMap::default(),
            texture_target_index: None,
            configured_blend_overlay: None,
        }
    }
}

impl SkinPart {
    #[must_use]
    pub fn new(code: &str, kind: PartKind, render_order: i32) -> Self {
        Self {
            code: code.to_string(),
            kind,
            render_order,
            ..Default::default()
        }
    }

    /// Assigns a texture target of the given size.
    #[must_use]
    pub fn with_target(mut self, target: &str, width: u32, height: u32) -> Self {
        self.texture_target = Some(target.to_string());
        self.texture_target_width = width;
        self.texture_target_height = height;
        self
    }

    #[must_use]
    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = variants;
        self
    }

    /// Puts back the configured blend flag so initialization can derive it
    /// again from the current target layout.
    pub(crate) fn reset_blend_overlay(&mut self) {
        let configured = *self
            .configured_blend_overlay
            .get_or_insert(self.texture_blend_overlay);
        self.texture_blend_overlay = configured;
    }

    /// Rebuilds the variant lookup table. Later duplicates win.
    pub(crate) fn index_variants(&mut self) {
        self.variants_by_code = self
            .variants
            .iter()
            .enumerate()
            .map(|(i, v)| (v.code.clone(), i))
            .collect();
    }

    /// Variant code -> index into [`Self::variants`].
    #[must_use]
    pub fn variants_by_code(&self) -> &FxHashMap<String, usize> {
        &self.variants_by_code
    }

    #[must_use]
    pub fn variant(&self, code: &str) -> Option<&Variant> {
        self.variants_by_code
            .get(code)
            .and_then(|&i| self.variants.get(i))
    }

    #[must_use]
    pub fn has_variant(&self, code: &str) -> bool {
        self.variants_by_code.contains_key(code)
    }

    #[must_use]
    pub fn is_voice(&self) -> bool {
        self.kind == PartKind::Voice
    }

    /// Index into the model's texture targets, set by initialization.
    #[must_use]
    pub fn texture_target_index(&self) -> Option<usize> {
        self.texture_target_index
    }
}

/// Scaling slider bound to a base shape bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScalePart {
    pub code: String,
    /// Element name of the bone to scale
    pub target: String,
    pub min: f64,
    pub max: f64,
    /// The main scale also scales eye height and hit box
    pub is_main: bool,
}

impl Default for ScalePart {
    fn default() -> Self {
        Self {
            code: String::new(),
            target: String::new(),
            min: 1.0,
            max: 1.0,
            is_main: false,
        }
    }
}
