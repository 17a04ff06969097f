use crate::catalog::ModelPreset;

/// Deferred edit of a [`Skinnable`](super::Skinnable).
///
/// Commands are queued from any call site (GUI, network, emote triggers) with
/// [`Skinnable::enqueue`](super::Skinnable::enqueue) and applied in order at
/// the start of the next rebuild. Each variant maps onto the direct method of
/// the same name.
#[derive(Debug, Clone, PartialEq)]
pub enum SkinCommand {
    SetModel(String),
    ReloadModel,
    SelectVariant { part: String, variant: String },
    SetColor { part: String, color: u32 },
    SetGlow { part: String, glow: i32 },
    RemoveGlow,
    SetScale { part: String, scale: f64 },
    ClearScale,
    SetEyeHeightOffset(f64),
    SetPaintingPixels { name: String, pixels: Vec<u32> },
    ClearPaintingPixels { name: String, color: u32 },
    LoadPreset(ModelPreset),
    Randomize,
    StartEmote(String),
    StopEmote(String),
    StopAllEmotes,
}

impl SkinCommand {
    #[must_use]
    pub fn select(part: &str, variant: &str) -> Self {
        Self::SelectVariant {
            part: part.to_string(),
            variant: variant.to_string(),
        }
    }

    #[must_use]
    pub fn color(part: &str, color: u32) -> Self {
        Self::SetColor {
            part: part.to_string(),
            color,
        }
    }

    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetModel(_) => "set_model",
            Self::ReloadModel => "reload_model",
            Self::SelectVariant { .. } => "select_variant",
            Self::SetColor { .. } => "set_color",
            Self::SetGlow { .. } => "set_glow",
            Self::RemoveGlow => "remove_glow",
            Self::SetScale { .. } => "set_scale",
            Self::ClearScale => "clear_scale",
            Self::SetEyeHeightOffset(_) => "set_eye_height_offset",
            Self::SetPaintingPixels { .. } => "set_painting_pixels",
            Self::ClearPaintingPixels { .. } => "clear_painting_pixels",
            Self::LoadPreset(_) => "load_preset",
            Self::Randomize => "randomize",
            Self::StartEmote(_) => "start_emote",
            Self::StopEmote(_) => "stop_emote",
            Self::StopAllEmotes => "stop_all_emotes",
        }
    }
}
