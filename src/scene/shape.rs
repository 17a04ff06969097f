//! Shape arena
//!
//! A [`Shape`] is a skeletal mesh hierarchy stored in a `SlotMap` arena.
//! Elements refer to each other through [`ElementKey`] handles instead of
//! shared object references, so grafting a part's geometry onto a base shape
//! is an explicit copy into the base arena.
//!
//! Shapes are loaded from JSON documents ([`ShapeDocument`]) and every
//! rebuild starts from a freshly loaded instance.

use std::collections::BTreeMap;

use glam::DVec3;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::animation::AnimationClip;
use crate::errors::Result;

new_key_type! {
    pub struct ElementKey;
}

// ============================================================================
// Serialized form
// ============================================================================

/// One element of a shape file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementDef {
    pub name: String,
    /// Bone of the base shape this element attaches to when used as a part
    pub step_parent_name: Option<String>,
    pub from: [f64; 3],
    pub to: [f64; 3],
    pub scale_x: f64,
    pub scale_y: f64,
    pub scale_z: f64,
    pub children: Vec<ElementDef>,
}

impl Default for ElementDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            step_parent_name: None,
            from: [0.0; 3],
            to: [0.0; 3],
            scale_x: 1.0,
            scale_y: 1.0,
            scale_z: 1.0,
            children: Vec::new(),
        }
    }
}

/// Shape file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeDocument {
    pub elements: Vec<ElementDef>,
    /// Texture code -> texture path
    pub textures: BTreeMap<String, String>,
    pub texture_width: u32,
    pub texture_height: u32,
    /// Texture code -> `[width, height]`
    pub texture_sizes: BTreeMap<String, [u32; 2]>,
    pub animations: Vec<AnimationClip>,
}

// ============================================================================
// Runtime arena
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeElement {
    pub name: String,
    pub step_parent_name: Option<String>,
    pub(crate) parent: Option<ElementKey>,
    pub(crate) children: Vec<ElementKey>,
    pub from: DVec3,
    pub to: DVec3,
    pub scale: DVec3,
    pub joint_id: u32,
    /// Face glow applied to this element, `0` when unlit
    pub glow: i32,
}

impl ShapeElement {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            step_parent_name: None,
            parent: None,
            children: Vec::new(),
            from: DVec3::ZERO,
            to: DVec3::ZERO,
            scale: DVec3::ONE,
            joint_id: 0,
            glow: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ElementKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[ElementKey] {
        &self.children
    }
}

#[derive(Debug, Clone, Default)]
pub struct Shape {
    elements: SlotMap<ElementKey, ShapeElement>,
    roots: Vec<ElementKey>,
    pub textures: BTreeMap<String, String>,
    pub texture_width: u32,
    pub texture_height: u32,
    pub texture_sizes: BTreeMap<String, (u32, u32)>,
    pub animations: Vec<AnimationClip>,
}

impl Shape {
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: SlotMap::with_key(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ShapeDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(&doc))
    }

    #[must_use]
    pub fn from_document(doc: &ShapeDocument) -> Self {
        let mut shape = Self::new();
        for def in &doc.elements {
            let key = shape.insert_def(def, None);
            shape.roots.push(key);
        }
        shape.textures.clone_from(&doc.textures);
        shape.texture_width = doc.texture_width;
        shape.texture_height = doc.texture_height;
        shape.texture_sizes = doc
            .texture_sizes
            .iter()
            .map(|(k, [w, h])| (k.clone(), (*w, *h)))
            .collect();
        shape.animations.clone_from(&doc.animations);
        shape
    }

    fn insert_def(&mut self, def: &ElementDef, parent: Option<ElementKey>) -> ElementKey {
        let key = self.elements.insert(ShapeElement {
            name: def.name.clone(),
            step_parent_name: def.step_parent_name.clone(),
            parent,
            children: Vec::with_capacity(def.children.len()),
            from: DVec3::from_array(def.from),
            to: DVec3::from_array(def.to),
            scale: DVec3::new(def.scale_x, def.scale_y, def.scale_z),
            joint_id: 0,
            glow: 0,
        });
        for child in &def.children {
            let child_key = self.insert_def(child, Some(key));
            self.elements[key].children.push(child_key);
        }
        key
    }

    // === Construction ===

    /// Deep-copies the subtree rooted at `src` of `source` into this arena.
    /// The copy is detached: its root has no parent and is not a root.
    pub fn graft(&mut self, source: &Shape, src: ElementKey) -> Option<ElementKey> {
        let elem = source.elements.get(src)?;
        let key = self.elements.insert(ShapeElement {
            parent: None,
            children: Vec::with_capacity(elem.children.len()),
            ..elem.clone()
        });
        for &child in &elem.children {
            if let Some(child_key) = self.graft(source, child) {
                self.elements[child_key].parent = Some(key);
                self.elements[key].children.push(child_key);
            }
        }
        Some(key)
    }

    /// Removes the element and all of its descendants from the arena.
    /// Does not unlink it from a parent's child list.
    pub fn remove_subtree(&mut self, key: ElementKey) {
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(elem) = self.elements.remove(k) {
                stack.extend(elem.children);
            }
        }
    }

    // === Queries ===

    #[inline]
    #[must_use]
    pub fn element(&self, key: ElementKey) -> Option<&ShapeElement> {
        self.elements.get(key)
    }

    #[inline]
    pub fn element_mut(&mut self, key: ElementKey) -> Option<&mut ShapeElement> {
        self.elements.get_mut(key)
    }

    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[ElementKey] {
        &self.roots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Pre-order walk over every element reachable from the roots.
    #[must_use]
    pub fn walk(&self) -> Vec<ElementKey> {
        let mut out = Vec::with_capacity(self.elements.len());
        let mut stack: Vec<ElementKey> = self.roots.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            let Some(elem) = self.elements.get(key) else {
                continue;
            };
            out.push(key);
            stack.extend(elem.children.iter().rev().copied());
        }
        out
    }

    /// First reachable element with this name (exact match).
    #[must_use]
    pub fn find(&self, name: &str) -> Option<ElementKey> {
        self.walk()
            .into_iter()
            .find(|&k| self.elements[k].name == name)
    }

    /// Names of the direct children of `key`, in order.
    #[must_use]
    pub fn child_names(&self, key: ElementKey) -> Vec<&str> {
        self.elements.get(key).map_or_else(Vec::new, |e| {
            e.children
                .iter()
                .filter_map(|c| self.elements.get(*c))
                .map(|c| c.name.as_str())
                .collect()
        })
    }

    // === Mutation helpers ===

    fn subtree(&self, key: ElementKey) -> Vec<ElementKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(elem) = self.elements.get(k) {
                out.push(k);
                stack.extend(elem.children.iter().copied());
            }
        }
        out
    }

    pub fn set_joint_id_recursive(&mut self, key: ElementKey, joint_id: u32) {
        for k in self.subtree(key) {
            self.elements[k].joint_id = joint_id;
        }
    }

    pub fn set_glow_recursive(&mut self, key: ElementKey, glow: i32) {
        for k in self.subtree(key) {
            self.elements[k].glow = glow;
        }
    }

    /// Assigns joint ids: every element animated by a clip or named in
    /// `required` gets its own id (starting at 1, in pre-order), every other
    /// element inherits its parent's id (roots inherit 0).
    ///
    /// Returns the number of joints allocated.
    pub fn resolve_joints(&mut self, clips: &[AnimationClip], required: &[&str]) -> u32 {
        let mut animated: FxHashSet<&str> = required.iter().copied().collect();
        for clip in clips {
            animated.extend(clip.animated_elements());
        }
        let animated: FxHashSet<String> = animated.into_iter().map(str::to_string).collect();

        let mut next = 1;
        for key in self.walk() {
            let inherited = self.elements[key]
                .parent
                .and_then(|p| self.elements.get(p))
                .map_or(0, |p| p.joint_id);
            let elem = &mut self.elements[key];
            if animated.contains(&elem.name) {
                elem.joint_id = next;
                next += 1;
            } else {
                elem.joint_id = inherited;
            }
        }
        next - 1
    }
}
