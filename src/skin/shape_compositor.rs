//! Shape Compositor
//!
//! Builds the entity mesh through four cached stages:
//!
//! ```text
//!   Base ──(main parts)──▶ AfterMainParts ──(face parts)──▶ AfterFaceParts
//!                                                                │
//!                                             (worn item filter) ▼
//!                                                           AfterFilter ──▶ compile
//! ```
//!
//! Each stage is a [`ShapeTree`] that shares unchanged child lists with its
//! predecessor. A base rebuild reloads the base shape and redoes every
//! stage; a face rebuild starts again from `AfterMainParts`, so expression
//! changes never re-walk the main parts.

use std::sync::Arc;

use glam::{DVec3, Vec2};
use rustc_hash::{FxHashMap, FxHashSet};

use super::applied::{AppliedVariant, PartFilter, applied_parts};
use super::dirty::ShapeDirty;
use super::equipment::{Inventory, is_any_slot_worn};
use super::selection::SelectionState;
use crate::animation::{AnimationClip, AnimationSet};
use crate::assets::{AssetLocation, ShapeSource};
use crate::catalog::{DressSlot, PartKind, SkinModel, SkinPart};
use crate::errors::{Result, SkinError};
use crate::resources::ChangeTracker;
use crate::scene::{AttachError, ElementKey, Shape, ShapeTree};

/// Which side of the game the entity lives on. The server never attaches
/// face parts: they affect neither hit-testing nor server-side joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    #[default]
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeStage {
    Base,
    AfterMainParts,
    AfterFaceParts,
    AfterFilter,
}

/// Everything a shape pass reads.
pub struct ShapeInputs<'a> {
    pub model: &'a SkinModel,
    pub selection: &'a SelectionState,
    pub shapes: &'a dyn ShapeSource,
    pub inventory: Option<&'a dyn Inventory>,
    pub animation_sets: &'a FxHashMap<String, AnimationSet>,
    pub side: Side,
}

impl ShapeInputs<'_> {
    /// Inventory, unless worn clothing is hidden.
    fn visible_inventory(&self) -> Option<&dyn Inventory> {
        self.inventory.filter(|inv| !inv.hides_clothing())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeReport {
    pub base_rebuilt: bool,
    pub face_rebuilt: bool,
    /// A new filtered stage was produced
    pub filtered: bool,
    /// Part elements grafted this pass
    pub attached: usize,
}

/// Tracks whether parts with an alternate clothed (or armored) model need a
/// rebuild when the relevant slots change.
#[derive(Debug, Clone, Default)]
struct AltModelCheck {
    active: bool,
    slots: Vec<DressSlot>,
    worn: bool,
}

impl AltModelCheck {
    fn reset(&mut self) {
        self.active = false;
        self.slots.clear();
        self.worn = false;
    }

    fn require(&mut self, slots: &[DressSlot]) {
        self.active = true;
        for slot in slots {
            if !self.slots.contains(slot) {
                self.slots.push(*slot);
            }
        }
    }

    fn evaluate(&self, inventory: Option<&dyn Inventory>) -> bool {
        inventory.is_some_and(|inv| is_any_slot_worn(inv, &self.slots))
    }

    /// True when the slots no longer match the state of the last base
    /// rebuild. The recorded state only changes with a successful rebuild.
    fn flipped(&self, inventory: Option<&dyn Inventory>) -> bool {
        self.active && self.evaluate(inventory) != self.worn
    }
}

#[derive(Debug, Default)]
pub struct ShapeCompositor {
    shape: Option<Shape>,
    clips: Arc<[AnimationClip]>,

    base: ShapeTree,
    after_main: ShapeTree,
    after_face: ShapeTree,
    after_filter: ShapeTree,

    /// Face part elements in the arena, dropped on the next face rebuild
    face_grafts: Vec<ElementKey>,
    removed_elements: FxHashSet<String>,
    clothed: AltModelCheck,
    armored: AltModelCheck,

    main_scale: f64,
    eye_height: f64,
    hit_box: Vec2,
    joint_count: u32,
    compiled: ChangeTracker,
}

impl ShapeCompositor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            main_scale: 1.0,
            ..Default::default()
        }
    }

    /// The compiled mesh, once a base rebuild has succeeded.
    #[must_use]
    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    #[must_use]
    pub fn stage(&self, stage: ShapeStage) -> &ShapeTree {
        match stage {
            ShapeStage::Base => &self.base,
            ShapeStage::AfterMainParts => &self.after_main,
            ShapeStage::AfterFaceParts => &self.after_face,
            ShapeStage::AfterFilter => &self.after_filter,
        }
    }

    /// Animations of the current shape, including the model's extra sets.
    #[must_use]
    pub fn clips(&self) -> &Arc<[AnimationClip]> {
        &self.clips
    }

    #[must_use]
    pub fn main_scale(&self) -> f64 {
        self.main_scale
    }

    #[must_use]
    pub fn eye_height(&self) -> f64 {
        self.eye_height
    }

    #[must_use]
    pub fn hit_box(&self) -> Vec2 {
        self.hit_box
    }

    #[must_use]
    pub fn joint_count(&self) -> u32 {
        self.joint_count
    }

    /// Bumped whenever a pass produced a new compiled mesh. Unchanged across
    /// clean passes.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.compiled.version()
    }

    #[must_use]
    pub fn is_clothed(&self) -> bool {
        self.clothed.worn
    }

    #[must_use]
    pub fn is_armored(&self) -> bool {
        self.armored.worn
    }

    /// Element names hidden by worn items as of the last pass.
    #[must_use]
    pub fn removed_elements(&self) -> &FxHashSet<String> {
        &self.removed_elements
    }

    /// Drops the mesh and every stage; the next pass rebuilds from scratch.
    pub fn clear(&mut self) {
        let compiled = self.compiled;
        *self = Self::new();
        self.compiled = compiled;
    }

    /// Runs one pass. BASE and FACE are removed from `dirty` on success; on
    /// error `dirty` and the cached stages are left untouched.
    pub fn rebuild(&mut self, inputs: &ShapeInputs<'_>, dirty: &mut ShapeDirty) -> Result<ShapeReport> {
        let mut report = ShapeReport::default();

        let mut base_dirty = self.shape.is_none() || dirty.contains(ShapeDirty::BASE);
        if !base_dirty {
            let inventory = inputs.visible_inventory();
            if self.clothed.flipped(inventory) || self.armored.flipped(inventory) {
                log::debug!("Worn items changed an alternate part model, rebuilding base");
                base_dirty = true;
            }
        }
        let face_dirty = dirty.contains(ShapeDirty::FACE);

        if base_dirty {
            report.attached += self.rebuild_base(inputs)?;
            report.base_rebuilt = true;
        }

        let Some(shape) = self.shape.as_mut() else {
            return Err(SkinError::BaseShapeNotFound(inputs.model.model_path().to_string()));
        };

        if base_dirty || face_dirty {
            for key in self.face_grafts.drain(..) {
                shape.remove_subtree(key);
            }
            self.after_face = self.after_main.clone();
            if inputs.side == Side::Client {
                for applied in applied_parts(inputs.model, inputs.selection, PartFilter::Face) {
                    if applied.skip {
                        continue;
                    }
                    let Some(part) = inputs.model.part(&applied.part) else {
                        continue;
                    };
                    if !part.face || part.kind != PartKind::Shape {
                        continue;
                    }
                    let keys = attach_part(&mut self.after_face, shape, part, &applied, inputs);
                    report.attached += keys.len();
                    self.face_grafts.extend(keys);
                }
            }
            report.face_rebuilt = true;
        }

        let removed: FxHashSet<String> = inputs
            .visible_inventory()
            .map(|inv| {
                inv.stacks()
                    .flat_map(|stack| stack.disable_elements.iter().cloned())
                    .collect()
            })
            .unwrap_or_default();

        let filter_changed = removed != self.removed_elements;
        if base_dirty || face_dirty || filter_changed {
            if removed.is_empty() {
                self.after_filter = self.after_face.clone();
            } else {
                self.after_filter = self.after_face.filtered_clone(shape, &removed);
                report.filtered = true;
            }
            self.after_filter.compile(shape);
            self.compiled.changed();
        }
        self.removed_elements = removed;

        dirty.remove(ShapeDirty::BASE | ShapeDirty::FACE);

        if report.base_rebuilt || report.face_rebuilt {
            log::debug!(
                "Shape pass for {}: base={} face={} filtered={} attached={}",
                inputs.model.code,
                report.base_rebuilt,
                report.face_rebuilt,
                report.filtered,
                report.attached
            );
        }
        Ok(report)
    }

    /// Reassigns joint ids over the compiled mesh. Every animated element
    /// and every element named in `required` gets its own joint.
    pub fn resolve_joints(&mut self, required: &[&str]) -> u32 {
        let Some(shape) = self.shape.as_mut() else {
            return 0;
        };
        self.joint_count = shape.resolve_joints(&self.clips, required);
        self.joint_count
    }

    fn rebuild_base(&mut self, inputs: &ShapeInputs<'_>) -> Result<usize> {
        let model = inputs.model;
        let selection = inputs.selection;

        // start from a fresh copy every time, the loader's instance is never reused
        let location = AssetLocation::shape(model.model_path());
        let mut shape = inputs
            .shapes
            .load_shape(&location)
            .ok_or_else(|| SkinError::BaseShapeNotFound(location.to_string()))?;

        let mut main_scale = 1.0;
        if !selection.scales.is_empty() {
            for key in shape.walk() {
                let Some(element) = shape.element_mut(key) else {
                    continue;
                };
                let Some(scale_part) = model.scale_part_for_element(&element.name) else {
                    continue;
                };
                match selection.scale(&scale_part.code) {
                    Some(scale) => {
                        element.scale = DVec3::splat(scale);
                        if scale_part.is_main {
                            main_scale = scale;
                        }
                    }
                    None => element.scale = DVec3::ONE,
                }
            }
        }

        self.main_scale = main_scale;
        self.eye_height = model.eye_height * main_scale + selection.eye_height_offset;
        self.hit_box = model.hit_box_size * main_scale as f32;

        self.clips = if model.animations.is_empty() {
            shape.animations.clone().into()
        } else {
            model.compiled_animations(&shape.animations, inputs.animation_sets)
        };

        let base = ShapeTree::from_shape(&shape);
        let mut after_main = base.clone();

        self.clothed.reset();
        self.armored.reset();

        let mut attached = 0;
        for applied in applied_parts(model, selection, PartFilter::Main) {
            if applied.skip {
                continue;
            }
            let Some(part) = model.part(&applied.part) else {
                continue;
            };
            if part.kind != PartKind::Shape {
                continue;
            }
            if applied.has_alt_clothed() {
                self.clothed.require(&part.alt_clothed_requirement);
            }
            if applied.has_alt_armored() {
                self.armored.require(&part.alt_armored_requirement);
            }
            attached += attach_part(&mut after_main, &mut shape, part, &applied, inputs).len();
        }

        let inventory = inputs.visible_inventory();
        self.clothed.worn = self.clothed.active && self.clothed.evaluate(inventory);
        self.armored.worn = self.armored.active && self.armored.evaluate(inventory);

        // previous face grafts lived in the old arena
        self.face_grafts.clear();
        self.after_face = after_main.clone();
        self.after_filter = after_main.clone();
        self.base = base;
        self.after_main = after_main;
        self.shape = Some(shape);
        Ok(attached)
    }
}

/// Shape location for an applied variant: a variant's own shape wins over
/// the part template; armored wins over clothed.
fn part_shape_location(
    part: &SkinPart,
    applied: &AppliedVariant,
    clothed: bool,
    armored: bool,
) -> Option<AssetLocation> {
    if applied.shape.is_none()
        && let Some(template) = part.shape_template.as_deref()
    {
        let code = if armored && let Some(code) = applied.alt_armored.as_deref() {
            code
        } else if clothed && let Some(code) = applied.alt_clothed.as_deref() {
            code
        } else {
            applied.variant.as_str()
        };
        return Some(AssetLocation::shape(template).with_code(code));
    }

    let path = if armored && applied.shape_armored.is_some() {
        applied.shape_armored.as_deref()
    } else if clothed && applied.shape_clothed.is_some() {
        applied.shape_clothed.as_deref()
    } else {
        applied.shape.as_deref()
    };
    path.map(AssetLocation::shape)
}

/// Grafts the root elements of a variant's shape onto their step parents in
/// `tree`. Returns the grafted keys; problems are logged and skipped.
fn attach_part(
    tree: &mut ShapeTree,
    shape: &mut Shape,
    part: &SkinPart,
    applied: &AppliedVariant,
    inputs: &ShapeInputs<'_>,
) -> Vec<ElementKey> {
    let (clothed, armored) = match inputs.visible_inventory() {
        Some(inv) => (
            is_any_slot_worn(inv, &part.alt_clothed_requirement),
            is_any_slot_worn(inv, &part.alt_armored_requirement),
        ),
        None => (false, false),
    };

    let Some(location) = part_shape_location(part, applied, clothed, armored) else {
        log::warn!(
            "Part {} variant {} has no shape or template, part will be invisible",
            part.code,
            applied.variant
        );
        return Vec::new();
    };
    let Some(part_shape) = inputs.shapes.load_shape(&location) else {
        log::warn!(
            "Shape {location} for part {} of {} not found, part will be invisible",
            part.code,
            inputs.model.code
        );
        return Vec::new();
    };

    let filter = applied.step_parent_filter.as_ref();
    if let Some(filter) = filter {
        for name in filter {
            tree.clear_children(name);
        }
    }

    let mut attached = Vec::new();
    for &root in part_shape.roots() {
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            let step_parent = part_shape
                .element(root)
                .and_then(|e| e.step_parent_name.as_deref());
            let admitted = step_parent
                .is_some_and(|parent| filter.iter().any(|f| f.eq_ignore_ascii_case(parent)));
            if !admitted {
                continue;
            }
        }

        match tree.attach(shape, &part_shape, root) {
            Ok(key) => {
                if applied.glow > 0 {
                    shape.set_glow_recursive(key, applied.glow);
                }
                attached.push(key);
            }
            Err(AttachError::StepParentNotFound(parent)) => log::warn!(
                "Step parent {parent} for {location} not found in base shape, element skipped"
            ),
            Err(AttachError::NoStepParent) => {
                log::warn!("Element of {location} has no step parent, element skipped");
            }
            Err(AttachError::MissingSource) => {}
        }
    }
    attached
}
