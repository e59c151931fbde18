//! Error Types
//!
//! This module defines the error types used throughout the renderer core.
//!
//! Scope and shape errors (`UnbalancedScope`, `InvalidState`) indicate a
//! broken call-nesting contract on the caller's side: they are surfaced
//! immediately and are never retried internally. They are also guaranteed
//! to be local to the offending call: renderer state is only mutated
//! after validation succeeds, so a failed call leaves `MaterialState`,
//! the style stack, and the shape accumulator untouched.
//!
//! An unready texture source is deliberately *not* an error; see
//! [`crate::texture::TextureCache::bind`].

use thiserror::Error;

/// The main error type for the atelier renderer core.
#[derive(Error, Debug)]
pub enum AtelierError {
    // ========================================================================
    // Scope & Shape State Errors
    // ========================================================================
    /// `pop()` was called without a matching `push()`.
    #[error("pop() called on an empty style stack")]
    UnbalancedScope,

    /// A drawing call arrived while the renderer was in the wrong state
    /// (e.g. `begin_shape` while a shape is already being built, or
    /// `end_shape` without `begin_shape`).
    #[error("invalid call sequence: {0}")]
    InvalidState(&'static str),

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// A uniform name is not present in the program's reflected table.
    #[error("unknown uniform '{name}' in program '{program}'")]
    UnknownUniform {
        /// The program label the lookup ran against.
        program: String,
        /// The requested uniform name.
        name: String,
    },

    /// The supplied value does not match the reflected uniform's size.
    #[error("uniform '{name}' expects {expected} bytes, got {actual}")]
    UniformMismatch {
        /// The uniform name.
        name: String,
        /// Size reflected at link time.
        expected: u32,
        /// Size of the supplied value.
        actual: u32,
    },

    /// WGSL parsing failed while building a program's uniform table.
    #[error("shader '{label}' failed to parse: {message}")]
    ShaderParse {
        /// The program label.
        label: String,
        /// The parser diagnostic.
        message: String,
    },

    // ========================================================================
    // Texture Errors
    // ========================================================================
    /// A texture source type outside image/video/offscreen-surface.
    #[error("unsupported texture source type: {0}")]
    UnsupportedSource(&'static str),

    // ========================================================================
    // Geometry Errors
    // ========================================================================
    /// The polygon tessellator rejected the input outright.
    #[error("tessellation failed: {0}")]
    Tessellation(String),
}

/// Alias for `Result<T, AtelierError>`.
pub type Result<T> = std::result::Result<T, AtelierError>;
