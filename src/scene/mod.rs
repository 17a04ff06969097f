//! Shape hierarchy
//!
//! - [`Shape`]: slotmap arena of skeletal mesh elements
//! - [`ShapeTree`]: copy-on-write child-list overlay used for staged rebuilds

pub mod shape;
pub mod shape_tree;

pub use shape::{ElementDef, ElementKey, Shape, ShapeDocument, ShapeElement};
pub use shape_tree::{AttachError, ShapeTree};
