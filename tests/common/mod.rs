//! Shared fixture: the `kemono0` model, its in-memory assets, and a host
//! bundling the collaborators a rebuild borrows.

#![allow(dead_code)]

use kemono::animation::{AnimationCache, AnimationMeta, AnimationOverride};
use kemono::assets::MemoryAssets;
use kemono::catalog::{
    DressSlot, Emote, ModelRegistry, PartKind, PixelOffset, ScalePart, SkinModel, SkinPart, Variant,
};
use kemono::errors::Result;
use kemono::resources::Bitmap;
use kemono::skin::{Equipment, Graphics, Inventory, RebuildReport, Side, SkinHost, Skinnable};
use kemono::texture::{ClearTextureCache, CpuAtlas, TextureAtlas};
use kemono::utils::color::pack_rgba;

pub const MODEL: &str = "kemono0";
pub const BASE_SHAPE: &str = "kemono:entity/kemono0/main";
pub const ENTITY: &str = "kemono:player";

pub const RED: u32 = pack_rgba(255, 0, 0, 255);
pub const GREEN: u32 = pack_rgba(0, 255, 0, 255);
pub const BLUE: u32 = pack_rgba(0, 0, 255, 255);
pub const YELLOW: u32 = pack_rgba(255, 255, 0, 255);
pub const WHITE: u32 = pack_rgba(255, 255, 255, 255);

const BASE_SHAPE_JSON: &str = r#"{
    "elements": [
        { "name": "LowerTorso", "children": [
            { "name": "UpperTorso", "children": [
                { "name": "b_Neck", "children": [
                    { "name": "b_Head", "children": [
                        { "name": "b_Mane" },
                        { "name": "b_Eyes" }
                    ]}
                ]}
            ]},
            { "name": "b_Tail" }
        ]}
    ],
    "animations": [
        { "code": "idle", "quantityFrames": 2, "keyframes": [
            { "frame": 0, "elements": { "b_Head": { "rotationX": 5.0 } } }
        ]}
    ]
}"#;

fn part_shape(name: &str, step_parent: &str) -> String {
    format!(
        r#"{{ "elements": [ {{ "name": "{name}", "stepParentName": "{step_parent}", "children": [ {{ "name": "{name}-tip" }} ] }} ] }}"#
    )
}

fn textured(code: &str, texture: &str) -> Variant {
    Variant::new(code).with_texture(texture)
}

/// Uninitialized `kemono0` model.
///
/// | part      | order | kind    | target | notes                               |
/// |-----------|-------|---------|--------|-------------------------------------|
/// | coat      | 1     | texture | body   | color slider, texture via fallback  |
/// | eyes      | 5     | texture | main   | base layer of `main`                |
/// | mouth     | 7     | shape   |        | face part                           |
/// | hair      | 10    | shape   | main   | template, clothed alternative       |
/// | horn      | 15    | shape   |        | first variant is empty              |
/// | mane      | 20    | shape   |        | attaches to `b_Mane`                |
/// | cutiemark | 30    | texture | flank  | 32x32 painting                      |
/// | tail      | 35    | texture | tail   | copy of `main`                      |
/// | clothes   | 40    | texture | main   | worn upper body overlay             |
#[must_use]
pub fn model() -> SkinModel {
    let mut coat = SkinPart::new("coat", PartKind::Texture, 1)
        .with_target("body", 4, 4)
        .with_variants(vec![textured("plain", "entity/kemono0/coat")]);
    coat.use_color_slider = true;

    let eyes = SkinPart::new("eyes", PartKind::Texture, 5)
        .with_target("main", 8, 8)
        .with_variants(vec![
            textured("round", "kemono:entity/kemono0/eyes-round"),
            textured("closed", "kemono:entity/kemono0/eyes-closed"),
            textured("wink", "kemono:entity/kemono0/eyes-wink"),
        ]);

    let mut mouth = SkinPart::new("mouth", PartKind::Shape, 7)
        .with_variants(vec![Variant::new("smile"), Variant::new("open")]);
    mouth.face = true;
    mouth.shape_template = Some("kemono:entity/kemono0/mouth-{code}".into());

    let mut braid = textured("braid", "kemono:entity/kemono0/hair-braid");
    braid.alt_clothed = Some("braidtucked".into());
    let mut hair = SkinPart::new("hair", PartKind::Shape, 10)
        .with_target("main", 8, 8)
        .with_variants(vec![braid, textured("short", "kemono:entity/kemono0/hair-short")]);
    hair.shape_template = Some("kemono:entity/kemono0/hair-{code}".into());
    hair.alt_clothed_requirement = vec![DressSlot::Head];

    let mut none = Variant::new("none");
    none.skip = true;
    let horn = SkinPart::new("horn", PartKind::Shape, 15).with_variants(vec![
        none,
        Variant::new("small").with_shape("kemono:entity/kemono0/horn-small"),
    ]);

    let mane = SkinPart::new("mane", PartKind::Shape, 20).with_variants(vec![
        Variant::new("long").with_shape("kemono:entity/kemono0/mane-long"),
        Variant::new("braided").with_shape("kemono:entity/kemono0/mane-braided"),
    ]);

    let mut cutiemark = SkinPart::new("cutiemark", PartKind::Texture, 30)
        .with_target("flank", 32, 32)
        .with_variants(vec![Variant::new("default")]);
    cutiemark.use_painting = true;
    cutiemark.painting_name = Some("cutiemark".into());
    cutiemark.painting_size = 32;

    let mut tail = SkinPart::new("tail", PartKind::Texture, 35)
        .with_target("tail", 8, 8)
        .with_variants(vec![Variant::new("plain")]);
    tail.texture_copy_from = Some("main".into());

    let mut clothes = SkinPart::new("clothes", PartKind::Texture, 40)
        .with_target("main", 8, 8)
        .with_variants(vec![Variant::new("default")]);
    clothes.use_clothing_texture = true;
    clothes.clothing_textures = vec![DressSlot::UpperBody];
    clothes.texture_render_to = PixelOffset::new(0, 0);

    let voice_type = SkinPart::new("voicetype", PartKind::Voice, 0)
        .with_variants(vec![Variant::new("altoflute"), Variant::new("harp")]);
    let voice_pitch = SkinPart::new("voicepitch", PartKind::Voice, 0).with_variants(vec![
        Variant::new("low"),
        Variant::new("medium"),
        Variant::new("high"),
    ]);

    let mut model = SkinModel::new(MODEL, BASE_SHAPE)
        .with_part(coat)
        .with_part(eyes)
        .with_part(mouth)
        .with_part(hair)
        .with_part(horn)
        .with_part(mane)
        .with_part(cutiemark)
        .with_part(tail)
        .with_part(clothes)
        .with_part(voice_type)
        .with_part(voice_pitch)
        .with_scale_part(ScalePart {
            code: "body".into(),
            target: "LowerTorso".into(),
            min: 0.5,
            max: 1.5,
            is_main: true,
        })
        .with_emote(Emote::new("blink").with_part("eyes", "closed"))
        .with_emote(Emote::new("wink").with_part("eyes", "wink"))
        .with_emote(Emote::new("surprised").with_part("mouth", "open"))
        .with_emote(
            Emote::new("maneflip")
                .with_part("mane", "braided")
                .with_filter(&["b_Mane"]),
        );
    model.animation_overrides.push(AnimationOverride {
        code: Some("idle".into()),
        animation_speed: Some(2.0),
        ..Default::default()
    });
    model
}

/// Second model, sharing the base shape, with a single texture part.
#[must_use]
pub fn small_model() -> SkinModel {
    SkinModel::new("kemono1", BASE_SHAPE).with_part(
        SkinPart::new("eyes", PartKind::Texture, 5)
            .with_target("main", 8, 8)
            .with_variants(vec![textured("round", "kemono:entity/kemono0/eyes-round")]),
    )
}

#[must_use]
pub fn registry() -> ModelRegistry {
    ModelRegistry::build(vec![model(), small_model()], Vec::new(), Vec::new())
}

/// 8x8 bitmap whose first `rows` rows are `color`, the rest transparent.
#[must_use]
pub fn top_rows(rows: u32, color: u32) -> Bitmap {
    let mut bitmap = Bitmap::new(8, 8);
    for y in 0..rows {
        for x in 0..8 {
            bitmap.set_pixel(x, y, color);
        }
    }
    bitmap
}

#[must_use]
pub fn assets() -> MemoryAssets {
    let mut assets = MemoryAssets::new();
    assets
        .insert_shape_json(BASE_SHAPE, BASE_SHAPE_JSON)
        .expect("base shape parses");

    let parts = [
        ("hair-braid", "b_Head"),
        ("hair-braidtucked", "b_Head"),
        ("hair-short", "b_Head"),
        ("horn-small", "b_Head"),
        ("mane-long", "b_Mane"),
        ("mane-braided", "b_Mane"),
        ("mouth-smile", "b_Head"),
        ("mouth-open", "b_Head"),
    ];
    for (name, parent) in parts {
        assets
            .insert_shape_json(&format!("kemono:entity/kemono0/{name}"), &part_shape(name, parent))
            .expect("part shape parses");
    }

    // stored under the fallback domain only
    assets.insert_bitmap("kemono:entity/kemono0/coat", Bitmap::filled(4, 4, WHITE));
    assets.insert_bitmap("kemono:entity/kemono0/eyes-round", Bitmap::filled(8, 8, BLUE));
    assets.insert_bitmap("kemono:entity/kemono0/eyes-closed", Bitmap::filled(8, 8, GREEN));
    assets.insert_bitmap("kemono:entity/kemono0/eyes-wink", Bitmap::filled(8, 8, YELLOW));
    assets.insert_bitmap("kemono:entity/kemono0/hair-braid", top_rows(4, RED));
    assets.insert_bitmap("kemono:entity/kemono0/hair-short", top_rows(2, RED));
    assets
}

/// Routes crate logs to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Everything a rebuild borrows, owned in one place.
pub struct TestHost {
    pub registry: ModelRegistry,
    pub assets: MemoryAssets,
    pub cache: AnimationCache,
    pub atlas: CpuAtlas,
    pub clear_textures: ClearTextureCache,
    pub equipment: Equipment,
}

impl TestHost {
    #[must_use]
    pub fn new() -> Self {
        Self::with_atlas(CpuAtlas::new(256, 256))
    }

    #[must_use]
    pub fn with_atlas(atlas: CpuAtlas) -> Self {
        init_logging();
        Self {
            registry: registry(),
            assets: assets(),
            cache: AnimationCache::new(),
            atlas,
            clear_textures: ClearTextureCache::new(),
            equipment: Equipment::new(),
        }
    }

    /// Client skin on `kemono0` with the default selection.
    pub fn skin(&self, entity_id: u64) -> Skinnable {
        let mut skin = Skinnable::new(entity_id, ENTITY, Side::Client)
            .with_animations(vec![AnimationMeta::new("idle", "idle")]);
        skin.set_model_code(&self.registry, MODEL)
            .expect("fixture model is registered");
        skin
    }

    pub fn server_skin(&self, entity_id: u64) -> Skinnable {
        let mut skin = Skinnable::new(entity_id, ENTITY, Side::Server);
        skin.set_model_code(&self.registry, MODEL)
            .expect("fixture model is registered");
        skin
    }

    pub fn rebuild(&mut self, skin: &mut Skinnable) -> Result<RebuildReport> {
        let inventory: &dyn Inventory = &self.equipment;
        let mut host = SkinHost {
            registry: &self.registry,
            shapes: &self.assets,
            textures: &self.assets,
            inventory: Some(inventory),
            animation_cache: &mut self.cache,
            graphics: Some(Graphics {
                atlas: &mut self.atlas,
                clear_textures: &mut self.clear_textures,
            }),
        };
        skin.rebuild(&mut host)
    }

    /// Rebuild drawing into `atlas` instead of the host's own.
    pub fn rebuild_on(&mut self, skin: &mut Skinnable, atlas: &mut dyn TextureAtlas) -> Result<RebuildReport> {
        let inventory: &dyn Inventory = &self.equipment;
        let mut host = SkinHost {
            registry: &self.registry,
            shapes: &self.assets,
            textures: &self.assets,
            inventory: Some(inventory),
            animation_cache: &mut self.cache,
            graphics: Some(Graphics {
                atlas,
                clear_textures: &mut self.clear_textures,
            }),
        };
        skin.rebuild(&mut host)
    }

    /// Rebuild without graphics, as a dedicated server would.
    pub fn rebuild_headless(&mut self, skin: &mut Skinnable) -> Result<RebuildReport> {
        let inventory: &dyn Inventory = &self.equipment;
        let mut host = SkinHost {
            registry: &self.registry,
            shapes: &self.assets,
            textures: &self.assets,
            inventory: Some(inventory),
            animation_cache: &mut self.cache,
            graphics: None,
        };
        skin.rebuild(&mut host)
    }
}

/// `(element, children)` for every element of the compiled mesh, in walk order.
pub fn children_snapshot(skin: &Skinnable) -> Vec<(String, Vec<String>)> {
    let Some(shape) = skin.shape_compositor().shape() else {
        return Vec::new();
    };
    shape
        .walk()
        .into_iter()
        .filter_map(|key| {
            let element = shape.element(key)?;
            let children = shape.child_names(key).into_iter().map(str::to_string).collect();
            Some((element.name.clone(), children))
        })
        .collect()
}

/// Compiled children of the named element.
pub fn children_of(skin: &Skinnable, name: &str) -> Vec<String> {
    let Some(shape) = skin.shape_compositor().shape() else {
        return Vec::new();
    };
    shape
        .find(name)
        .map(|key| shape.child_names(key).into_iter().map(str::to_string).collect())
        .unwrap_or_default()
}
