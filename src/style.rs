//! Push/pop style scoping.
//!
//! A [`StyleFrame`] snapshots everything a drawing scope may mutate:
//! the full material state (light lists copied by value, shader and
//! texture references by identity), the model-view matrix, and the
//! drawing-mode settings. Push and pop perform no GPU work.

use glam::Mat4;

use crate::errors::{AtelierError, Result};
use crate::material::MaterialState;

/// How `vertex(u, v)` texture coordinates are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureMode {
    /// UVs are pixel coordinates of the bound texture.
    #[default]
    Image,
    /// UVs are already normalized to [0, 1].
    Normal,
}

/// Drawing-mode flags carried alongside the material state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawSettings {
    pub texture_mode: TextureMode,
    /// Samples emitted per Catmull-Rom curve segment.
    pub curve_detail: u32,
    /// Samples emitted per bezier/quadratic segment.
    pub bezier_detail: u32,
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self {
            texture_mode: TextureMode::Image,
            curve_detail: 20,
            bezier_detail: 20,
        }
    }
}

/// One immutable snapshot on the style stack.
#[derive(Debug, Clone)]
pub struct StyleFrame {
    pub material: MaterialState,
    pub model_view: Mat4,
    pub settings: DrawSettings,
}

/// LIFO stack of style frames, unbounded depth, one per renderer
/// context.
#[derive(Debug, Default)]
pub struct StyleStack {
    frames: Vec<StyleFrame>,
}

impl StyleStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: StyleFrame) {
        self.frames.push(frame);
    }

    /// Remove and return the most recent frame.
    pub fn pop(&mut self) -> Result<StyleFrame> {
        self.frames.pop().ok_or(AtelierError::UnbalancedScope)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drop all frames; called at the start of a frame so a sketch that
    /// leaked pushes does not poison the next frame.
    pub fn reset(&mut self) {
        self.frames.clear();
    }
}
