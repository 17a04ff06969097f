//! CPU-side resources shared by the compositors.
//!
//! - [`Bitmap`]: packed RGBA pixel buffer with PNG import/export
//! - [`ChangeTracker`]: monotonic version counter

pub mod bitmap;
pub mod version_tracker;

pub use bitmap::Bitmap;
pub use version_tracker::ChangeTracker;
