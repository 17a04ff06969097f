//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`SkinError`] covers the failure modes that abort a
//! whole operation:
//! - Catalog lookups that the caller asked for explicitly
//! - Base shape assets that cannot be loaded
//! - Texture atlas allocation and upload failures
//! - Painting import/export and configuration decoding
//!
//! Per-fragment configuration problems (a missing part shape, a missing step
//! parent bone, a missing texture) are *not* errors: they are logged through
//! the `log` facade and the fragment is skipped.
//!
//! # Usage
//!
//! Fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, SkinError>`.
//!
//! ```rust,ignore
//! use kemono::errors::{SkinError, Result};
//!
//! fn load_model() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the skin compositor.
#[derive(Error, Debug)]
pub enum SkinError {
    // ========================================================================
    // Catalog Errors
    // ========================================================================
    /// The requested model code is not registered.
    #[error("Unknown skin model: {0}")]
    UnknownModel(String),

    /// The requested part code does not exist in the model.
    #[error("Unknown skin part '{part}' in model '{model}'")]
    UnknownPart {
        /// Model code
        model: String,
        /// Part code that was requested
        part: String,
    },

    /// The requested variant does not exist in the part.
    #[error("Unknown variant '{variant}' for skin part '{part}'")]
    UnknownVariant {
        /// Part code
        part: String,
        /// Variant code that was requested
        variant: String,
    },

    /// The requested painting canvas does not exist in the model.
    #[error("Unknown painting '{0}'")]
    UnknownPainting(String),

    /// An operation needs a model but none is selected.
    #[error("No skin model selected")]
    NoModel,

    // ========================================================================
    // Shape Errors
    // ========================================================================
    /// The base model shape could not be loaded.
    #[error("Base shape not found: {0}")]
    BaseShapeNotFound(String),

    // ========================================================================
    // Painting Errors
    // ========================================================================
    /// Painting pixel data does not match the canvas dimensions.
    #[error("Painting '{name}' expects {expected} bytes, got {actual}")]
    PaintingSizeMismatch {
        /// Painting canvas name
        name: String,
        /// Expected byte length (size * size * 4)
        expected: usize,
        /// Provided byte length
        actual: usize,
    },

    /// Imported painting image has the wrong dimensions.
    #[error("Painting '{name}' must be {size}x{size}, image is {width}x{height}")]
    PaintingImageSize {
        /// Painting canvas name
        name: String,
        /// Required square size
        size: u32,
        /// Image width
        width: u32,
        /// Image height
        height: u32,
    },

    // ========================================================================
    // Atlas Errors
    // ========================================================================
    /// The atlas has no room for a new allocation.
    #[error("Texture atlas full: cannot allocate {width}x{height}")]
    AtlasFull {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// A texture handle passed to the atlas is not (or no longer) valid.
    #[error("Invalid texture handle: {0}")]
    InvalidTexture(u64),

    // ========================================================================
    // Format & I/O Errors
    // ========================================================================
    /// Image decoding or encoding error.
    #[error("Image error: {0}")]
    ImageError(String),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for SkinError {
    fn from(err: image::ImageError) -> Self {
        SkinError::ImageError(err.to_string())
    }
}

/// Alias for `Result<T, SkinError>`.
pub type Result<T> = std::result::Result<T, SkinError>;
