//! Current material state of a renderer context.
//!
//! One fill-producing mode is active at a time (none / flat color /
//! texture / normal-material) and the stroke machine runs independently
//! of it. Ambient, specular and emissive colors are *material* inputs
//! layered on top of whichever fill mode is active: setting them never
//! drops an installed texture reference, and installing a texture never
//! clears them. Setters mutate in place so a `push`/mutate/`pop`
//! sequence restores an observably identical state.

use std::sync::Arc;

use glam::{Vec3, Vec4};

use crate::blend::{BlendMode, BlendSpec, pipeline_state};
use crate::lights::LightState;
use crate::shader::ProgramId;
use crate::texture::TextureSource;

bitflags::bitflags! {
    /// Sticky material flags that shader selection and uniform packing
    /// consult. Distinct from the fill mode: `HAS_SET_AMBIENT` survives
    /// fill-mode transitions that keep the material inputs meaningful.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u32 {
        const HAS_SET_AMBIENT = 1 << 0;
        const USE_SPECULAR    = 1 << 1;
        const USE_EMISSIVE    = 1 << 2;
    }
}

/// Which source produces fill fragments. Last setter wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// `no_fill()`: fill pass skipped entirely.
    None,
    /// Flat color fill.
    #[default]
    Flat,
    /// Sample the bound texture.
    Textured,
    /// Debug normal-material shading.
    NormalMaterial,
}

/// Stroke machine, independent of fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeMode {
    /// `no_stroke()`: edge pass skipped.
    None,
    /// Flat stroke color.
    #[default]
    Flat,
}

/// All renderer-affecting material selections.
///
/// Owned exclusively by the renderer instance; the style stack stores
/// value clones of it (shader/texture references clone by identity).
#[derive(Debug, Clone)]
pub struct MaterialState {
    fill_mode: FillMode,
    stroke_mode: StrokeMode,
    fill_color: Vec4,
    stroke_color: Vec4,
    stroke_weight: f32,
    ambient_color: Vec4,
    specular_color: Vec4,
    emissive_color: Vec4,
    shininess: f32,
    flags: MaterialFlags,
    texture: Option<Arc<dyn TextureSource>>,
    blend_mode: BlendMode,
    fill_program: Option<ProgramId>,
    stroke_program: Option<ProgramId>,
    current_normal: Vec3,
    /// Accumulated lights; snapshot by value on push.
    pub lights: LightState,
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Flat,
            stroke_mode: StrokeMode::Flat,
            fill_color: Vec4::ONE,
            stroke_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            stroke_weight: 1.0,
            ambient_color: Vec4::ONE,
            specular_color: Vec4::ONE,
            emissive_color: Vec4::ZERO,
            shininess: 1.0,
            flags: MaterialFlags::empty(),
            texture: None,
            blend_mode: BlendMode::Blend,
            fill_program: None,
            stroke_program: None,
            current_normal: Vec3::Z,
            lights: LightState::new(),
        }
    }
}

impl MaterialState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Fill machine ─────────────────────────────────────────────────────────

    /// Flat fill. Clears an installed texture, the normal-material mode,
    /// and the has-set-ambient flag (ambient defaults back to the fill
    /// color until set explicitly again).
    pub fn set_fill(&mut self, color: Vec4) {
        self.fill_mode = FillMode::Flat;
        self.fill_color = color;
        self.texture = None;
        self.flags.remove(MaterialFlags::HAS_SET_AMBIENT);
    }

    pub fn no_fill(&mut self) {
        self.fill_mode = FillMode::None;
    }

    /// Textured fill. Ambient/specular/emissive material colors persist:
    /// `texture` then `set_ambient` and the reverse order land in the
    /// same state.
    pub fn set_texture(&mut self, source: Arc<dyn TextureSource>) {
        self.fill_mode = FillMode::Textured;
        self.texture = Some(source);
    }

    /// Normal-material debug shading. The texture reference survives;
    /// the fill mode decides which shader runs.
    pub fn set_normal_material(&mut self) {
        self.fill_mode = FillMode::NormalMaterial;
    }

    // ── Material colors ──────────────────────────────────────────────────────

    /// Ambient reflectance. Never clears the texture reference.
    pub fn set_ambient(&mut self, color: Vec4) {
        self.ambient_color = color;
        self.flags.insert(MaterialFlags::HAS_SET_AMBIENT);
        if self.fill_mode == FillMode::NormalMaterial {
            self.fill_mode = if self.texture.is_some() {
                FillMode::Textured
            } else {
                FillMode::Flat
            };
        }
    }

    /// Specular reflectance. Never clears the texture reference.
    pub fn set_specular(&mut self, color: Vec4) {
        self.specular_color = color;
        self.flags.insert(MaterialFlags::USE_SPECULAR);
        if self.fill_mode == FillMode::NormalMaterial {
            self.fill_mode = if self.texture.is_some() {
                FillMode::Textured
            } else {
                FillMode::Flat
            };
        }
    }

    /// Emissive color. Never clears the texture reference.
    pub fn set_emissive(&mut self, color: Vec4) {
        self.emissive_color = color;
        self.flags.insert(MaterialFlags::USE_EMISSIVE);
    }

    pub fn set_shininess(&mut self, shininess: f32) {
        self.shininess = shininess.max(1.0);
    }

    // ── Stroke machine ───────────────────────────────────────────────────────

    pub fn set_stroke(&mut self, color: Vec4) {
        self.stroke_mode = StrokeMode::Flat;
        self.stroke_color = color;
    }

    pub fn no_stroke(&mut self) {
        self.stroke_mode = StrokeMode::None;
    }

    pub fn set_stroke_weight(&mut self, weight: f32) {
        self.stroke_weight = weight.max(0.0);
    }

    // ── Shader slots & blend ─────────────────────────────────────────────────

    pub fn set_fill_program(&mut self, program: Option<ProgramId>) {
        self.fill_program = program;
    }

    pub fn set_stroke_program(&mut self, program: Option<ProgramId>) {
        self.stroke_program = program;
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn set_current_normal(&mut self, normal: Vec3) {
        self.current_normal = normal;
    }

    // ── Query surface ────────────────────────────────────────────────────────

    #[must_use]
    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    #[must_use]
    pub fn stroke_mode(&self) -> StrokeMode {
        self.stroke_mode
    }

    #[must_use]
    pub fn fill_color(&self) -> Vec4 {
        self.fill_color
    }

    #[must_use]
    pub fn stroke_color(&self) -> Vec4 {
        self.stroke_color
    }

    #[must_use]
    pub fn stroke_weight(&self) -> f32 {
        self.stroke_weight
    }

    /// Ambient reflectance; defaults to the fill color until set
    /// explicitly.
    #[must_use]
    pub fn ambient_color(&self) -> Vec4 {
        if self.flags.contains(MaterialFlags::HAS_SET_AMBIENT) {
            self.ambient_color
        } else {
            self.fill_color
        }
    }

    #[must_use]
    pub fn specular_color(&self) -> Vec4 {
        self.specular_color
    }

    #[must_use]
    pub fn emissive_color(&self) -> Vec4 {
        self.emissive_color
    }

    #[must_use]
    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    #[must_use]
    pub fn flags(&self) -> MaterialFlags {
        self.flags
    }

    #[must_use]
    pub fn texture(&self) -> Option<&Arc<dyn TextureSource>> {
        self.texture.as_ref()
    }

    #[must_use]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    #[must_use]
    pub fn fill_program(&self) -> Option<ProgramId> {
        self.fill_program
    }

    #[must_use]
    pub fn stroke_program(&self) -> Option<ProgramId> {
        self.stroke_program
    }

    #[must_use]
    pub fn current_normal(&self) -> Vec3 {
        self.current_normal
    }

    /// A draw is translucent when the fill samples a texture or the
    /// resolved fill alpha is below one.
    #[must_use]
    pub fn translucent(&self) -> bool {
        (self.fill_mode == FillMode::Textured && self.texture.is_some())
            || self.fill_color.w < 1.0
    }

    /// Pipeline flags for the next draw under the current blend mode.
    #[must_use]
    pub fn blend_spec(&self) -> BlendSpec {
        pipeline_state(self.blend_mode, self.translucent())
    }
}

impl PartialEq for MaterialState {
    /// Structural equality; resource references compare by identity.
    fn eq(&self, other: &Self) -> bool {
        let tex_eq = match (&self.texture, &other.texture) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        tex_eq
            && self.fill_mode == other.fill_mode
            && self.stroke_mode == other.stroke_mode
            && self.fill_color == other.fill_color
            && self.stroke_color == other.stroke_color
            && self.stroke_weight == other.stroke_weight
            && self.ambient_color == other.ambient_color
            && self.specular_color == other.specular_color
            && self.emissive_color == other.emissive_color
            && self.shininess == other.shininess
            && self.flags == other.flags
            && self.blend_mode == other.blend_mode
            && self.fill_program == other.fill_program
            && self.stroke_program == other.stroke_program
            && self.current_normal == other.current_normal
            && self.lights == other.lights
    }
}
