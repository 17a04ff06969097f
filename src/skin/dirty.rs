//! Dirty Tracker
//!
//! Records which compositing stages and which texture targets must be
//! rebuilt. Every mutation goes through [`DirtyTracker::mark`] with a typed
//! [`DirtyEvent`]; many events between two rebuilds coalesce into one
//! [`DirtyState`].
//!
//! A rebuild [`take`](DirtyTracker::take)s the state, works on it, and on
//! failure [`restore`](DirtyTracker::restore)s it so the next rebuild retries.

use bitflags::bitflags;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ShapeDirty: u8 {
        /// Base shape and main parts
        const BASE       = 1 << 0;
        /// Face parts only
        const FACE       = 1 << 1;
        /// Animation metadata and cache
        const ANIMATIONS = 1 << 2;
    }
}

/// Something that invalidates part of the composited output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyEvent {
    BaseShape,
    FaceShape,
    Animations,
    /// A texture target must be redrawn
    Texture(String),
    /// A painting changed, along with every target that displays it
    Painting {
        name: String,
        targets: SmallVec<[String; 2]>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyState {
    pub shape: ShapeDirty,
    /// Texture target codes
    pub textures: FxHashSet<String>,
    /// Painting names
    pub paintings: FxHashSet<String>,
}

impl DirtyState {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.shape.is_empty() && self.textures.is_empty() && self.paintings.is_empty()
    }

    fn apply(&mut self, event: DirtyEvent) {
        match event {
            DirtyEvent::BaseShape => self.shape |= ShapeDirty::BASE,
            DirtyEvent::FaceShape => self.shape |= ShapeDirty::FACE,
            DirtyEvent::Animations => self.shape |= ShapeDirty::ANIMATIONS,
            DirtyEvent::Texture(target) => {
                self.textures.insert(target);
            }
            DirtyEvent::Painting { name, targets } => {
                self.paintings.insert(name);
                self.textures.extend(targets);
            }
        }
    }

    /// Union with `other`.
    pub fn merge(&mut self, other: DirtyState) {
        self.shape |= other.shape;
        self.textures.extend(other.textures);
        self.paintings.extend(other.paintings);
    }
}

#[derive(Debug, Default)]
pub struct DirtyTracker {
    state: DirtyState,
}

impl DirtyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mark(&mut self, event: DirtyEvent) {
        self.state.apply(event);
    }

    /// Removes and returns the accumulated state, leaving the tracker clean.
    #[must_use]
    pub fn take(&mut self) -> DirtyState {
        std::mem::take(&mut self.state)
    }

    /// Merges a previously taken state back in.
    pub fn restore(&mut self, state: DirtyState) {
        self.state.merge(state);
    }

    #[must_use]
    pub fn state(&self) -> &DirtyState {
        &self.state
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.state.is_clean()
    }

    #[must_use]
    pub fn is_base_dirty(&self) -> bool {
        self.state.shape.contains(ShapeDirty::BASE)
    }

    #[must_use]
    pub fn is_face_dirty(&self) -> bool {
        self.state.shape.contains(ShapeDirty::FACE)
    }

    #[must_use]
    pub fn is_animations_dirty(&self) -> bool {
        self.state.shape.contains(ShapeDirty::ANIMATIONS)
    }

    #[must_use]
    pub fn is_texture_dirty(&self, target: &str) -> bool {
        self.state.textures.contains(target)
    }

    #[must_use]
    pub fn is_painting_dirty(&self, name: &str) -> bool {
        self.state.paintings.contains(name)
    }

    #[must_use]
    pub fn dirty_textures(&self) -> &FxHashSet<String> {
        &self.state.textures
    }

    #[must_use]
    pub fn dirty_paintings(&self) -> &FxHashSet<String> {
        &self.state.paintings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn painting_event_dirties_its_targets() {
        let mut tracker = DirtyTracker::new();
        tracker.mark(DirtyEvent::Painting {
            name: "cutiemark".into(),
            targets: SmallVec::from_vec(vec!["main".into(), "clothing".into()]),
        });
        assert!(tracker.is_painting_dirty("cutiemark"));
        assert!(tracker.is_texture_dirty("main"));
        assert!(tracker.is_texture_dirty("clothing"));
    }

    #[test]
    fn take_then_restore_round_trips() {
        let mut tracker = DirtyTracker::new();
        tracker.mark(DirtyEvent::BaseShape);
        tracker.mark(DirtyEvent::Texture("main".into()));
        let taken = tracker.take();
        assert!(tracker.is_clean());

        tracker.mark(DirtyEvent::FaceShape);
        tracker.restore(taken);
        assert!(tracker.is_base_dirty());
        assert!(tracker.is_face_dirty());
        assert!(tracker.is_texture_dirty("main"));
    }
}
