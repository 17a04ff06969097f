//! Skinnable Tests
//!
//! Tests for:
//! - Skin part initialization from defaults and presets
//! - Variant, color, voice and scale selection
//! - Emote activation order and override precedence
//! - Preset save/load and selection persistence
//! - Deferred command queue
//! - Animation metadata reload and the shared animation cache

mod common;

use std::sync::Arc;

use common::{MODEL, TestHost};
use kemono::catalog::ModelPreset;
use kemono::errors::SkinError;
use kemono::skin::{EmoteChange, PartFilter, SelectionState, Side, SkinCommand, Skinnable};
use kemono::utils::ColorRgb;

fn applied_variants(skin: &Skinnable, part: &str) -> Vec<String> {
    skin.applied_parts()
        .into_iter()
        .filter(|a| a.part == part)
        .map(|a| a.variant)
        .collect()
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn every_part_gets_a_variant_and_color() {
    let host = TestHost::new();
    let skin = host.skin(1);
    let model = skin.model().unwrap();

    for part in model.parts_by_render_order().filter(|p| !p.is_voice()) {
        assert_eq!(
            skin.selection().variant(&part.code),
            Some(part.variants[0].code.as_str()),
            "{}",
            part.code
        );
        let color = skin.selection().colors[&part.code];
        assert_eq!(color >> 24, 255, "{} color must be opaque", part.code);
    }
    assert_eq!(skin.selection().model.as_deref(), Some(MODEL));
    assert!(skin.dirty().is_base_dirty());
    assert!(skin.dirty().is_animations_dirty());
}

#[test]
fn initial_colors_are_seeded_by_entity() {
    let host = TestHost::new();
    let a = host.skin(42);
    let b = host.skin(42);
    assert_eq!(a.selection().colors, b.selection().colors);
}

#[test]
fn invalid_persisted_entries_are_dropped() {
    let host = TestHost::new();

    let mut saved = SelectionState::new();
    saved.variants.insert("hair".into(), "mohawk".into());
    saved.variants.insert("mane".into(), "braided".into());
    saved.variants.insert("wings".into(), "feathered".into());
    saved.colors.insert("wings".into(), 0xFFFF_FFFF);
    saved.scales.insert("neck".into(), 1.3);
    saved.scales.insert("body".into(), 1.1);
    saved.paintings.insert("cutiemark".into(), vec![0; 12]);

    let mut skin = Skinnable::new(1, common::ENTITY, Side::Client).with_selection(saved);
    skin.set_model_code(&host.registry, MODEL).unwrap();

    let selection = skin.selection();
    assert_eq!(selection.variant("hair"), Some("braid"));
    assert_eq!(selection.variant("mane"), Some("braided"));
    assert!(selection.variant("wings").is_none());
    assert!(!selection.colors.contains_key("wings"));
    assert_eq!(selection.scales.keys().collect::<Vec<_>>(), ["body"]);
    assert!(selection.paintings.is_empty());
}

#[test]
fn preset_fills_missing_parts() {
    let host = TestHost::new();
    let model = host.registry.model(MODEL).unwrap().clone();

    let mut preset = ModelPreset::new(MODEL);
    preset.parts.insert("hair".into(), "short".into());
    preset.parts.insert("horn".into(), "spiral".into());
    preset.colors.insert("coat".into(), ColorRgb::new(10, 20, 30));

    let mut skin = Skinnable::new(1, common::ENTITY, Side::Client);
    skin.set_model(model, Some(&preset));

    assert_eq!(skin.selection().variant("hair"), Some("short"));
    // unknown preset variant falls back to the first one
    assert_eq!(skin.selection().variant("horn"), Some("none"));
    assert_eq!(
        skin.selection().color("coat"),
        ColorRgb::new(10, 20, 30).to_packed()
    );
}

#[test]
fn selecting_the_current_model_again_changes_nothing() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();

    skin.set_model_code(&host.registry, MODEL).unwrap();
    assert!(skin.dirty().is_clean());
    assert!(matches!(
        skin.set_model_code(&host.registry, "kemono9"),
        Err(SkinError::UnknownModel(_))
    ));
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn select_variant_validates_part_and_variant() {
    let host = TestHost::new();
    let mut skin = host.skin(1);

    assert!(matches!(
        skin.select_variant("wings", "big"),
        Err(SkinError::UnknownPart { .. })
    ));
    assert!(matches!(
        skin.select_variant("hair", "mohawk"),
        Err(SkinError::UnknownVariant { .. })
    ));
    assert_eq!(skin.selection().variant("hair"), Some("braid"));
}

#[test]
fn shape_and_texture_parts_dirty_their_stages() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();

    skin.select_variant("mouth", "open").unwrap();
    assert!(skin.dirty().is_face_dirty());
    assert!(!skin.dirty().is_base_dirty());
    host.rebuild(&mut skin).unwrap();

    skin.select_variant("hair", "short").unwrap();
    assert!(skin.dirty().is_base_dirty());
    assert!(skin.dirty().is_texture_dirty("main"));
    host.rebuild(&mut skin).unwrap();

    skin.select_variant("eyes", "closed").unwrap();
    assert!(!skin.dirty().is_base_dirty());
    assert!(skin.dirty().is_texture_dirty("main"));
}

#[test]
fn voice_parts_never_dirty_the_mesh() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();

    skin.select_variant("voicetype", "harp").unwrap();
    skin.select_variant("voicepitch", "high").unwrap();
    assert!(skin.dirty().is_clean());
    assert_eq!(skin.selection().voice_type, "harp");
    assert!((skin.selection().voice_pitch_modifier() - 1.2).abs() < f32::EPSILON);
}

#[test]
fn randomize_picks_known_variants() {
    let host = TestHost::new();
    let mut skin = host.skin(3);
    skin.randomize_skin_parts().unwrap();

    let model = skin.model().unwrap().clone();
    for part in model.parts_by_render_order().filter(|p| !p.is_voice()) {
        let variant = skin.selection().variant(&part.code).unwrap();
        assert!(part.has_variant(variant), "{} -> {variant}", part.code);
    }
    assert!(skin.dirty().is_base_dirty());
    assert!(skin.dirty().is_face_dirty());
}

// ============================================================================
// Emotes
// ============================================================================

#[test]
fn most_recent_emote_wins() {
    let host = TestHost::new();
    let mut skin = host.skin(1);

    skin.start_emote("blink").unwrap();
    skin.start_emote("wink").unwrap();
    assert_eq!(applied_variants(&skin, "eyes"), ["wink"]);

    skin.stop_emote("wink").unwrap();
    assert_eq!(applied_variants(&skin, "eyes"), ["closed"]);

    skin.stop_emote("blink").unwrap();
    assert_eq!(applied_variants(&skin, "eyes"), ["round"]);
}

#[test]
fn emote_activation_is_validated() {
    let host = TestHost::new();
    let mut skin = host.skin(1);

    assert_eq!(
        skin.start_emote("BLINK"),
        Some(EmoteChange::Started {
            code: "blink".into(),
            animation: None,
        })
    );
    assert!(skin.start_emote("blink").is_none());
    assert!(skin.start_emote("dance").is_none());
    assert!(skin.stop_emote("dance").is_none());
    assert_eq!(skin.selection().active_emotes, ["blink"]);
}

#[test]
fn stop_all_emotes_reports_each() {
    let host = TestHost::new();
    let mut skin = host.skin(1);
    skin.start_emote("blink").unwrap();
    skin.start_emote("surprised").unwrap();

    let changes = skin.stop_all_emotes();
    let codes: Vec<_> = changes
        .iter()
        .map(|c| match c {
            EmoteChange::Stopped { code, .. } | EmoteChange::Started { code, .. } => code.as_str(),
        })
        .collect();
    assert_eq!(codes, ["surprised", "blink"]);
    assert!(skin.selection().active_emotes.is_empty());
}

#[test]
fn filtered_emote_keeps_selected_variant() {
    let host = TestHost::new();
    let mut skin = host.skin(1);
    skin.start_emote("maneflip").unwrap();
    assert_eq!(applied_variants(&skin, "mane"), ["long", "braided"]);

    let model = skin.model().unwrap().clone();
    let main = kemono::skin::applied_parts(&model, skin.selection(), PartFilter::Main);
    assert!(main.iter().all(|a| !a.face));
}

// ============================================================================
// Presets and Persistence
// ============================================================================

#[test]
fn preset_round_trip_restores_selection() -> anyhow::Result<()> {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    skin.select_variant("hair", "short")?;
    skin.set_color("coat", ColorRgb::new(1, 2, 3).to_packed())?;
    skin.set_scale("body", 1.25)?;

    let preset = skin.save_preset()?;
    assert_eq!(preset.model, MODEL);
    assert_eq!(preset.parts["hair"], "short");
    assert_eq!(preset.colors["coat"], ColorRgb::new(1, 2, 3));
    assert!(!preset.parts.contains_key("voicetype"));
    let json = preset.to_json()?;

    let mut other = host.skin(2);
    host.rebuild(&mut other)?;
    other.load_preset(&host.registry, &ModelPreset::from_json(&json)?)?;
    assert_eq!(other.selection().variant("hair"), Some("short"));
    assert_eq!(other.selection().color("coat"), ColorRgb::new(1, 2, 3).to_packed());
    assert_eq!(other.selection().scale("body"), Some(1.25));
    assert!(other.dirty().is_base_dirty());
    assert!(other.dirty().is_texture_dirty("body"));
    Ok(())
}

#[test]
fn preset_can_switch_models() {
    let host = TestHost::new();
    let mut skin = host.skin(1);
    let preset = ModelPreset::new("kemono1");
    skin.load_preset(&host.registry, &preset).unwrap();
    assert_eq!(skin.model().unwrap().code, "kemono1");

    let missing = ModelPreset::new("kemono9");
    assert!(matches!(
        skin.load_preset(&host.registry, &missing),
        Err(SkinError::UnknownModel(_))
    ));
}

#[test]
fn selection_json_skips_active_emotes() -> anyhow::Result<()> {
    let host = TestHost::new();
    let mut skin = host.skin(1);
    skin.start_emote("blink").unwrap();
    skin.clear_painting_pixels("cutiemark", common::RED)?;

    let json = skin.selection().to_json()?;
    let restored = SelectionState::from_json(&json)?;
    assert!(restored.active_emotes.is_empty());
    assert_eq!(restored.variants, skin.selection().variants);
    assert_eq!(restored.paintings, skin.selection().paintings);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn queued_commands_apply_on_rebuild() {
    let mut host = TestHost::new();
    let mut skin = Skinnable::new(1, common::ENTITY, Side::Client);
    skin.enqueue(SkinCommand::SetModel(MODEL.into()));
    skin.enqueue(SkinCommand::select("eyes", "closed"));
    skin.enqueue(SkinCommand::select("hair", "mohawk"));
    skin.enqueue(SkinCommand::StartEmote("surprised".into()));
    assert_eq!(skin.pending_commands(), 4);
    assert!(skin.model().is_none());

    let report = host.rebuild(&mut skin).unwrap();
    assert_eq!(report.commands, 4);
    assert_eq!(skin.pending_commands(), 0);
    assert_eq!(skin.selection().variant("eyes"), Some("closed"));
    assert_eq!(skin.selection().variant("hair"), Some("braid"));
    assert!(skin.selection().is_emote_active("surprised"));
    assert!(common::children_of(&skin, "b_Head").contains(&"mouth-open".to_string()));
}

#[test]
fn rebuild_without_model_fails() {
    let mut host = TestHost::new();
    let mut skin = Skinnable::new(1, common::ENTITY, Side::Client);
    assert!(matches!(host.rebuild(&mut skin), Err(SkinError::NoModel)));
}

// ============================================================================
// Animations
// ============================================================================

#[test]
fn animation_overrides_apply_once_per_reload() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);

    let report = host.rebuild(&mut skin).unwrap();
    assert!(report.animations_reloaded);
    let idle = skin.animations().get("idle").unwrap();
    assert!((idle.animation_speed - 2.0).abs() < f32::EPSILON);
    assert!(skin.animations().has_base_snapshot());

    let report = host.rebuild(&mut skin).unwrap();
    assert!(!report.animations_reloaded);
}

#[test]
fn entities_of_one_type_share_cached_animations() {
    let mut host = TestHost::new();
    let mut a = host.skin(1);
    let mut b = host.skin(2);
    host.rebuild(&mut a).unwrap();
    host.rebuild(&mut b).unwrap();

    assert_eq!(host.cache.len(), 1);
    let cached = a.cached_animations().unwrap();
    assert!(Arc::ptr_eq(cached, b.cached_animations().unwrap()));
    assert!(cached.clips.iter().any(|c| c.code == "idle"));
    assert!(cached.joint_count > 0);
}

#[test]
fn model_reload_rebuilds_cache_entry() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();
    let before = skin.cached_animations().unwrap().clone();

    skin.reload_model(&host.registry).unwrap();
    assert!(skin.dirty().is_animations_dirty());
    let report = host.rebuild(&mut skin).unwrap();
    assert!(report.animations_reloaded);
    assert_eq!(host.cache.len(), 1);
    assert!(!Arc::ptr_eq(&before, skin.cached_animations().unwrap()));

    // overrides never compound across reloads
    let idle = skin.animations().get("idle").unwrap();
    assert!((idle.animation_speed - 2.0).abs() < f32::EPSILON);
}
