//! Shape Compositor Tests
//!
//! Tests for:
//! - Clean rebuilds reusing every stage and the compiled mesh
//! - Main part attachment order under shared step parents
//! - Face-only rebuilds (expression hot path)
//! - Server-side passes without face parts or textures
//! - Worn item element filter and hide-clothing toggle
//! - Clothed alternative part models
//! - Filtered emotes, glow, scale parts and joint resolution
//! - Dirty state restoration when the base shape is missing

mod common;

use glam::DVec3;

use common::{TestHost, children_of, children_snapshot};
use kemono::assets::MemoryAssets;
use kemono::catalog::DressSlot;
use kemono::errors::SkinError;
use kemono::resources::Bitmap;
use kemono::skin::{ItemStack, ShapeStage};
use kemono::texture::TextureRegion;

const EPSILON: f64 = 1e-9;

fn head_item(host: &mut TestHost) -> ItemStack {
    let texture = host.atlas.register_texture(Bitmap::filled(2, 2, common::GREEN));
    ItemStack::new("hood").with_texture("hood", TextureRegion::full(texture, 2, 2))
}

// ============================================================================
// Stage Reuse
// ============================================================================

#[test]
fn clean_rebuild_is_idempotent() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);

    let first = host.rebuild(&mut skin).unwrap();
    assert!(first.shape.base_rebuilt);
    assert!(first.shape.face_rebuilt);

    let snapshot = children_snapshot(&skin);
    let shape_loads = host.assets.shape_loads();
    let uploads = host.atlas.upload_count();

    let second = host.rebuild(&mut skin).unwrap();
    assert!(!second.shape.base_rebuilt);
    assert!(!second.shape.face_rebuilt);
    assert!(second.textures.as_ref().is_some_and(|t| t.committed.is_empty()));
    assert_eq!(children_snapshot(&skin), snapshot);
    assert_eq!(host.assets.shape_loads(), shape_loads);
    assert_eq!(host.atlas.upload_count(), uploads);
    assert!(skin.dirty().is_clean());
}

#[test]
fn compile_version_advances_only_on_change() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();
    let version = skin.shape_compositor().version();

    host.rebuild(&mut skin).unwrap();
    assert_eq!(skin.shape_compositor().version(), version);

    assert!(skin.start_emote("surprised").is_some());
    host.rebuild(&mut skin).unwrap();
    assert_eq!(skin.shape_compositor().version(), version + 1);
}

// ============================================================================
// Attachment Order
// ============================================================================

#[test]
fn main_parts_attach_in_render_order() {
    let mut host = TestHost::new();

    let mut a = host.skin(1);
    a.select_variant("horn", "small").unwrap();
    a.select_variant("hair", "short").unwrap();

    let mut b = host.skin(2);
    b.select_variant("hair", "short").unwrap();
    b.select_variant("horn", "small").unwrap();

    host.rebuild(&mut a).unwrap();
    host.rebuild(&mut b).unwrap();

    let expected = ["b_Mane", "b_Eyes", "hair-short", "horn-small", "mouth-smile"];
    assert_eq!(children_of(&a, "b_Head"), expected);
    assert_eq!(children_of(&b, "b_Head"), expected);
}

#[test]
fn skipped_variant_attaches_nothing() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    assert_eq!(skin.selection().variant("horn"), Some("none"));
    host.rebuild(&mut skin).unwrap();
    assert!(!children_of(&skin, "b_Head").iter().any(|c| c.starts_with("horn")));
}

// ============================================================================
// Face Rebuilds
// ============================================================================

#[test]
fn face_change_skips_base_stage() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();
    let loads = host.assets.shape_loads();

    assert!(skin.start_emote("surprised").is_some());
    assert!(skin.dirty().is_face_dirty());
    assert!(!skin.dirty().is_base_dirty());

    let report = host.rebuild(&mut skin).unwrap();
    assert!(!report.shape.base_rebuilt);
    assert!(report.shape.face_rebuilt);
    // only the new mouth shape is loaded
    assert_eq!(host.assets.shape_loads(), loads + 1);

    let head = children_of(&skin, "b_Head");
    assert!(head.contains(&"mouth-open".to_string()));
    assert!(!head.contains(&"mouth-smile".to_string()));
}

#[test]
fn face_stage_shares_untouched_child_lists() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();

    let shapes = skin.shape_compositor();
    let main = shapes.stage(ShapeStage::AfterMainParts);
    let face = shapes.stage(ShapeStage::AfterFaceParts);
    assert!(face.shares_children_with(main, "b_Tail"));
    assert!(!face.shares_children_with(main, "b_Head"));
}

#[test]
fn server_side_skips_face_parts_and_textures() {
    let mut host = TestHost::new();
    let mut skin = host.server_skin(1);

    let report = host.rebuild_headless(&mut skin).unwrap();
    assert!(report.shape.base_rebuilt);
    assert!(report.textures.is_none());
    assert!(!children_of(&skin, "b_Head").contains(&"mouth-smile".to_string()));
    // texture work stays queued for a side that has graphics
    assert!(skin.dirty().is_texture_dirty("main"));
    assert!(!skin.dirty().is_base_dirty());
}

// ============================================================================
// Worn Items
// ============================================================================

#[test]
fn worn_item_hides_elements() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();
    assert!(children_of(&skin, "b_Head").contains(&"b_Mane".to_string()));

    host.equipment.equip(
        DressSlot::Neck,
        ItemStack::new("scarf").with_disabled_elements(&["b_Mane"]),
    );
    let report = host.rebuild(&mut skin).unwrap();
    assert!(report.shape.filtered);
    assert!(!report.shape.base_rebuilt);
    assert!(!children_of(&skin, "b_Head").contains(&"b_Mane".to_string()));
    assert!(skin.shape_compositor().removed_elements().contains("b_Mane"));

    // unchanged set reuses the filtered stage
    let report = host.rebuild(&mut skin).unwrap();
    assert!(!report.shape.filtered);

    host.equipment.unequip(DressSlot::Neck);
    host.rebuild(&mut skin).unwrap();
    assert!(children_of(&skin, "b_Head").contains(&"b_Mane".to_string()));
    assert!(skin.shape_compositor().removed_elements().is_empty());
}

#[test]
fn hidden_clothing_disables_filter() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.equipment.equip(
        DressSlot::Neck,
        ItemStack::new("scarf").with_disabled_elements(&["b_Mane"]),
    );
    host.equipment.set_hide_clothing(true);
    host.rebuild(&mut skin).unwrap();
    assert!(children_of(&skin, "b_Head").contains(&"b_Mane".to_string()));
}

#[test]
fn clothed_alternative_swaps_part_model() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();
    assert!(children_of(&skin, "b_Head").contains(&"hair-braid".to_string()));
    assert!(!skin.shape_compositor().is_clothed());

    let hood = head_item(&mut host);
    host.equipment.equip(DressSlot::Head, hood);
    let report = host.rebuild(&mut skin).unwrap();
    assert!(report.shape.base_rebuilt);
    assert!(skin.shape_compositor().is_clothed());
    let head = children_of(&skin, "b_Head");
    assert!(head.contains(&"hair-braidtucked".to_string()));
    assert!(!head.contains(&"hair-braid".to_string()));

    host.equipment.unequip(DressSlot::Head);
    let report = host.rebuild(&mut skin).unwrap();
    assert!(report.shape.base_rebuilt);
    assert!(children_of(&skin, "b_Head").contains(&"hair-braid".to_string()));
}

#[test]
fn textureless_item_does_not_count_as_worn() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();

    host.equipment.equip(DressSlot::Head, ItemStack::new("broken"));
    let report = host.rebuild(&mut skin).unwrap();
    assert!(!report.shape.base_rebuilt);
    assert!(!skin.shape_compositor().is_clothed());
}

// ============================================================================
// Emotes, Glow, Scale
// ============================================================================

#[test]
fn filtered_emote_replaces_children_of_step_parent() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();
    assert_eq!(children_of(&skin, "b_Mane"), ["mane-long"]);

    skin.start_emote("maneflip").unwrap();
    host.rebuild(&mut skin).unwrap();
    assert_eq!(children_of(&skin, "b_Mane"), ["mane-braided"]);

    skin.stop_emote("maneflip").unwrap();
    host.rebuild(&mut skin).unwrap();
    assert_eq!(children_of(&skin, "b_Mane"), ["mane-long"]);
}

#[test]
fn glow_is_written_on_attached_subtree() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    skin.select_variant("horn", "small").unwrap();
    skin.set_glow("horn", 5).unwrap();
    host.rebuild(&mut skin).unwrap();

    let shape = skin.shape_compositor().shape().unwrap();
    for name in ["horn-small", "horn-small-tip"] {
        let key = shape.find(name).unwrap();
        assert_eq!(shape.element(key).unwrap().glow, 5, "{name}");
    }
    let hair = shape.find("hair-braid").unwrap();
    assert_eq!(shape.element(hair).unwrap().glow, 0);

    skin.remove_glow();
    host.rebuild(&mut skin).unwrap();
    let shape = skin.shape_compositor().shape().unwrap();
    let key = shape.find("horn-small").unwrap();
    assert_eq!(shape.element(key).unwrap().glow, 0);
}

#[test]
fn main_scale_updates_eye_height_and_hit_box() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    skin.set_scale("body", 1.2).unwrap();
    host.rebuild(&mut skin).unwrap();

    let shape = skin.shape_compositor().shape().unwrap();
    let torso = shape.find("LowerTorso").unwrap();
    assert_eq!(shape.element(torso).unwrap().scale, DVec3::splat(1.2));
    assert!((skin.shape_compositor().main_scale() - 1.2).abs() < EPSILON);
    assert!((skin.eye_height() - 1.7 * 1.2).abs() < EPSILON);
    assert!((skin.hit_box().x - 0.72).abs() < 1e-5);

    skin.set_eye_height_offset(2.0);
    assert!((skin.selection().eye_height_offset - 0.5).abs() < EPSILON);
    host.rebuild(&mut skin).unwrap();
    assert!((skin.eye_height() - (1.7 * 1.2 + 0.5)).abs() < EPSILON);

    skin.clear_scale();
    host.rebuild(&mut skin).unwrap();
    assert!((skin.shape_compositor().main_scale() - 1.0).abs() < EPSILON);
}

#[test]
fn unknown_scale_part_is_rejected() {
    let host = TestHost::new();
    let mut skin = host.skin(1);
    let err = skin.set_scale("wings", 1.1).unwrap_err();
    assert!(matches!(err, SkinError::UnknownPart { .. }));
    assert!(skin.selection().scales.is_empty());
}

#[test]
fn attached_elements_share_step_parent_joint() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    let report = host.rebuild(&mut skin).unwrap();
    assert!(report.joints_resolved);
    assert!(skin.shape_compositor().joint_count() > 0);

    let shape = skin.shape_compositor().shape().unwrap();
    let joint = |name: &str| shape.element(shape.find(name).unwrap()).unwrap().joint_id;
    assert_ne!(joint("b_Head"), 0);
    assert_ne!(joint("b_Head"), joint("b_Neck"));
    assert_eq!(joint("hair-braid"), joint("b_Head"));
    assert_eq!(joint("hair-braid-tip"), joint("b_Head"));
    assert_eq!(joint("mane-long"), joint("b_Head"));
}

// ============================================================================
// Failure Handling
// ============================================================================

#[test]
fn missing_base_shape_keeps_dirty_state() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    let assets = std::mem::replace(&mut host.assets, MemoryAssets::new());

    let err = host.rebuild(&mut skin).unwrap_err();
    assert!(matches!(err, SkinError::BaseShapeNotFound(_)));
    assert!(skin.dirty().is_base_dirty());
    assert!(skin.dirty().is_texture_dirty("main"));
    assert!(skin.shape_compositor().shape().is_none());

    host.assets = assets;
    host.rebuild(&mut skin).unwrap();
    assert!(skin.dirty().is_clean());
    assert!(skin.shape_compositor().shape().is_some());
}

#[test]
fn failed_base_rebuild_keeps_pending_clothed_swap() {
    let mut host = TestHost::new();
    let mut skin = host.skin(1);
    host.rebuild(&mut skin).unwrap();

    let hood = head_item(&mut host);
    host.equipment.equip(DressSlot::Head, hood);
    let assets = std::mem::replace(&mut host.assets, MemoryAssets::new());
    let err = host.rebuild(&mut skin).unwrap_err();
    assert!(matches!(err, SkinError::BaseShapeNotFound(_)));
    assert!(!skin.shape_compositor().is_clothed());

    host.assets = assets;
    let report = host.rebuild(&mut skin).unwrap();
    assert!(report.shape.base_rebuilt);
    assert!(skin.shape_compositor().is_clothed());
    assert!(children_of(&skin, "b_Head").contains(&"hair-braidtucked".to_string()));
}
