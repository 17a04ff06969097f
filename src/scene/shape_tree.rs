//! Copy-on-write overlay of a shape's child lists.
//!
//! A [`ShapeTree`] mirrors every element of a base [`Shape`] with its own
//! child list. Cloning a tree shares all child lists (`Arc`); the first
//! mutation of a list through [`Arc::make_mut`] detaches it. This lets the
//! compositor keep several cached stages (base, after main parts, after
//! face parts, after clothing filter) that differ only in the few lists
//! they touched.
//!
//! Trees never write into the arena except through [`ShapeTree::compile`]
//! and the element grafting done by [`ShapeTree::attach`].

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::scene::shape::{ElementKey, Shape};
use crate::utils::CaseInsensitiveMap;

#[derive(Debug, Clone)]
struct BaseElement {
    key: ElementKey,
    name: String,
    children: Arc<Vec<ElementKey>>,
}

#[derive(Debug, Clone, Default)]
pub struct ShapeTree {
    elements: Vec<BaseElement>,
    by_name: CaseInsensitiveMap<usize>,
}

/// Why an element could not be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    NoStepParent,
    StepParentNotFound(String),
    MissingSource,
}

impl ShapeTree {
    /// Mirrors every element reachable in `shape`.
    #[must_use]
    pub fn from_shape(shape: &Shape) -> Self {
        let keys = shape.walk();
        let mut tree = Self {
            elements: Vec::with_capacity(keys.len()),
            by_name: CaseInsensitiveMap::with_capacity(keys.len()),
        };
        for key in keys {
            let Some(elem) = shape.element(key) else {
                continue;
            };
            tree.by_name.insert(&elem.name, tree.elements.len());
            tree.elements.push(BaseElement {
                key,
                name: elem.name.clone(),
                children: Arc::new(elem.children().to_vec()),
            });
        }
        tree
    }

    /// Clone that drops every base element named in `remove`, and removes
    /// children with those names from the remaining lists.
    #[must_use]
    pub fn filtered_clone(&self, shape: &Shape, remove: &FxHashSet<String>) -> Self {
        if remove.is_empty() {
            return self.clone();
        }

        let mut tree = Self {
            elements: Vec::with_capacity(self.elements.len()),
            by_name: CaseInsensitiveMap::with_capacity(self.elements.len()),
        };
        for base in self.elements.iter().filter(|e| !remove.contains(&e.name)) {
            let removes_child = base.children.iter().any(|c| {
                shape
                    .element(*c)
                    .is_some_and(|child| remove.contains(&child.name))
            });
            let children = if removes_child {
                Arc::new(
                    base.children
                        .iter()
                        .copied()
                        .filter(|c| shape.element(*c).is_none_or(|child| !remove.contains(&child.name)))
                        .collect(),
                )
            } else {
                base.children.clone()
            };
            tree.by_name.insert(&base.name, tree.elements.len());
            tree.elements.push(BaseElement {
                key: base.key,
                name: base.name.clone(),
                children,
            });
        }
        tree
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    #[must_use]
    pub fn element_key(&self, name: &str) -> Option<ElementKey> {
        self.by_name.get(name).map(|&i| self.elements[i].key)
    }

    /// Current (uncompiled) child list of a base element.
    #[must_use]
    pub fn children(&self, name: &str) -> Option<&[ElementKey]> {
        self.by_name
            .get(name)
            .map(|&i| self.elements[i].children.as_slice())
    }

    /// True when both trees still share the same backing list for `name`.
    #[must_use]
    pub fn shares_children_with(&self, other: &ShapeTree, name: &str) -> bool {
        match (self.by_name.get(name), other.by_name.get(name)) {
            (Some(&a), Some(&b)) => {
                Arc::ptr_eq(&self.elements[a].children, &other.elements[b].children)
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Empties the child list of a base element. Unknown names are ignored.
    pub fn clear_children(&mut self, name: &str) {
        if let Some(&i) = self.by_name.get(name) {
            self.elements[i].children = Arc::new(Vec::new());
        }
    }

    /// Grafts the element `src` of `part` (and its subtree) into `shape` and
    /// appends it to the child list of its step parent. The copy takes the
    /// step parent's joint id.
    pub fn attach(
        &mut self,
        shape: &mut Shape,
        part: &Shape,
        src: ElementKey,
    ) -> Result<ElementKey, AttachError> {
        let elem = part.element(src).ok_or(AttachError::MissingSource)?;
        let parent_name = elem
            .step_parent_name
            .as_deref()
            .ok_or(AttachError::NoStepParent)?;
        let &index = self
            .by_name
            .get(parent_name)
            .ok_or_else(|| AttachError::StepParentNotFound(parent_name.to_string()))?;

        let parent_key = self.elements[index].key;
        let parent_joint = shape.element(parent_key).map_or(0, |p| p.joint_id);

        let copy = shape.graft(part, src).ok_or(AttachError::MissingSource)?;
        if let Some(e) = shape.element_mut(copy) {
            e.parent = Some(parent_key);
        }
        shape.set_joint_id_recursive(copy, parent_joint);

        Arc::make_mut(&mut self.elements[index].children).push(copy);
        Ok(copy)
    }

    /// Writes every child list into the arena's elements.
    pub fn compile(&self, shape: &mut Shape) {
        for base in &self.elements {
            let Some(elem) = shape.element_mut(base.key) else {
                continue;
            };
            elem.children.clone_from(&base.children);
            for &child in base.children.iter() {
                if let Some(c) = shape.element_mut(child) {
                    c.parent = Some(base.key);
                }
            }
        }
    }
}
