//! Applied variants
//!
//! Projects the selection and the active emotes onto the catalog, producing
//! the ordered list of `(part, variant)` pairs that the shape and texture
//! compositors walk. Rebuilt on every pass; never stored.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::selection::SelectionState;
use crate::catalog::{PartKind, SkinModel, SkinPart, Variant};

/// Which parts an applied list includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartFilter {
    All,
    /// Non-face parts, attached on the base rebuild
    Main,
    /// Face parts, attached on the face rebuild
    Face,
}

impl PartFilter {
    #[inline]
    fn admits(self, part: &SkinPart) -> bool {
        match self {
            Self::All => true,
            Self::Main => !part.face,
            Self::Face => part.face,
        }
    }
}

/// One resolved `(part, variant)` pair with the entity's color and glow.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedVariant {
    pub part: String,
    pub variant: String,
    pub render_order: i32,
    pub kind: PartKind,
    pub face: bool,
    pub shape: Option<String>,
    pub shape_clothed: Option<String>,
    pub shape_armored: Option<String>,
    pub alt_clothed: Option<String>,
    pub alt_armored: Option<String>,
    pub texture: Option<String>,
    pub skip: bool,
    /// Packed RGBA, `0` when no color is set
    pub color: u32,
    /// `-1` when no glow is set
    pub glow: i32,
    /// Set for emote overrides: the step parents this variant's geometry
    /// replaces. Empty means the whole part.
    pub step_parent_filter: Option<SmallVec<[String; 4]>>,
}

impl AppliedVariant {
    #[must_use]
    pub fn new(
        part: &SkinPart,
        variant: &Variant,
        selection: &SelectionState,
        step_parent_filter: Option<SmallVec<[String; 4]>>,
    ) -> Self {
        let texture = match (&part.kind, &part.texture) {
            (PartKind::Shape, Some(texture)) => Some(texture.clone()),
            _ => variant.texture.clone(),
        };
        Self {
            part: part.code.clone(),
            variant: variant.code.clone(),
            render_order: part.render_order,
            kind: part.kind,
            face: part.face,
            shape: variant.shape.clone(),
            shape_clothed: variant.shape_clothed.clone(),
            shape_armored: variant.shape_armored.clone(),
            alt_clothed: variant.alt_clothed.clone(),
            alt_armored: variant.alt_armored.clone(),
            texture,
            skip: variant.skip,
            color: selection.color(&part.code),
            glow: selection.glow(&part.code),
            step_parent_filter,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_emote_override(&self) -> bool {
        self.step_parent_filter.is_some()
    }

    #[must_use]
    pub fn has_alt_clothed(&self) -> bool {
        self.alt_clothed.as_deref().is_some_and(|s| !s.is_empty())
    }

    #[must_use]
    pub fn has_alt_armored(&self) -> bool {
        self.alt_armored.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Resolves the applied variants in ascending render order.
///
/// Emotes are evaluated from the most recently started backwards; the first
/// emote naming a part wins and later (older) emotes are ignored for that
/// part. An unfiltered emote replaces the part's selected variant. A filtered
/// emote is applied after it, so it only swaps the geometry under its filter
/// elements.
#[must_use]
pub fn applied_parts(
    model: &SkinModel,
    selection: &SelectionState,
    filter: PartFilter,
) -> Vec<AppliedVariant> {
    let mut emoted: FxHashSet<&str> = FxHashSet::default();
    let mut replaced: FxHashSet<&str> = FxHashSet::default();
    let mut overrides = Vec::new();

    for code in selection.active_emotes.iter().rev() {
        let Some(emote) = model.emote(code) else {
            continue;
        };
        for selected in emote.parts() {
            let Some(part) = model.part(&selected.part) else {
                continue;
            };
            if part.is_voice()
                || part.variants.is_empty()
                || !filter.admits(part)
                || emoted.contains(part.code.as_str())
            {
                continue;
            }
            let Some(variant) = part.variant(&selected.variant) else {
                continue;
            };
            emoted.insert(part.code.as_str());
            if !emote.is_filtered() {
                replaced.insert(part.code.as_str());
            }
            overrides.push(AppliedVariant::new(
                part,
                variant,
                selection,
                Some(emote.skin_part_filter.clone()),
            ));
        }
    }

    let mut applied: Vec<AppliedVariant> = model
        .parts_by_render_order()
        .filter(|part| {
            !part.variants.is_empty()
                && filter.admits(part)
                && !replaced.contains(part.code.as_str())
        })
        .filter_map(|part| {
            let variant = selection
                .variant(&part.code)
                .and_then(|code| part.variant(code))?;
            Some(AppliedVariant::new(part, variant, selection, None))
        })
        .collect();

    applied.extend(overrides);
    // stable: a filtered override stays behind the variant it patches
    applied.sort_by_key(|a| a.render_order);
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Emote, PartKind, SkinModel, SkinPart, Variant};

    fn model() -> SkinModel {
        let mut model = SkinModel::new("kemono0", "kemono:entity/kemono0/main")
            .with_part(
                SkinPart::new("hair", PartKind::Shape, 10)
                    .with_variants(vec![Variant::new("braid"), Variant::new("short")]),
            )
            .with_part({
                let mut eyes = SkinPart::new("eyes", PartKind::Shape, 5)
                    .with_variants(vec![
                        Variant::new("round"),
                        Variant::new("closed"),
                        Variant::new("wink"),
                    ]);
                eyes.face = true;
                eyes
            })
            .with_emote(Emote::new("blink").with_part("eyes", "closed"))
            .with_emote(Emote::new("wink").with_part("eyes", "wink"))
            .with_emote(
                Emote::new("mane")
                    .with_part("hair", "short")
                    .with_filter(&["b_Mane"]),
            );
        model.initialize();
        model
    }

    fn selection() -> SelectionState {
        let mut selection = SelectionState::new();
        selection.variants.insert("hair".into(), "braid".into());
        selection.variants.insert("eyes".into(), "round".into());
        selection
    }

    #[test]
    fn filter_splits_face_and_main() {
        let model = model();
        let selection = selection();
        let main = applied_parts(&model, &selection, PartFilter::Main);
        let face = applied_parts(&model, &selection, PartFilter::Face);
        assert_eq!(main.iter().map(|a| a.part.as_str()).collect::<Vec<_>>(), ["hair"]);
        assert_eq!(face.iter().map(|a| a.part.as_str()).collect::<Vec<_>>(), ["eyes"]);
    }

    #[test]
    fn filtered_emote_follows_patched_variant() {
        let model = model();
        let mut selection = selection();
        selection.active_emotes.push("mane".into());
        let all = applied_parts(&model, &selection, PartFilter::All);
        let hair: Vec<_> = all.iter().filter(|a| a.part == "hair").collect();
        assert_eq!(hair.len(), 2);
        assert_eq!(hair[0].variant, "braid");
        assert!(!hair[0].is_emote_override());
        assert_eq!(hair[1].variant, "short");
        assert!(hair[1].is_emote_override());
    }

    #[test]
    fn unset_color_and_glow_use_sentinels() {
        let model = model();
        let applied = applied_parts(&model, &selection(), PartFilter::All);
        assert!(applied.iter().all(|a| a.color == 0 && a.glow == -1));
    }
}
