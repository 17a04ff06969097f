//! Utility Module
//!
//! - [`color`]: packed RGBA pixels, alpha blending, tinting and HSV helpers
//! - [`CaseInsensitiveMap`]: string-keyed lookup ignoring ASCII case, used for
//!   element names and emote codes
//!
//! ```rust,ignore
//! use kemono::utils::color::{pack_rgba, blend_over};
//!
//! let red = pack_rgba(255, 0, 0, 255);
//! assert_eq!(blend_over(0, red), red);
//! ```

pub mod color;
pub mod nocase;

pub use color::ColorRgb;
pub use nocase::CaseInsensitiveMap;
