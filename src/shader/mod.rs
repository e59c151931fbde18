//! Shader program registry.
//!
//! Every drawable material resolves to a [`Program`]: WGSL source plus a
//! reflected uniform table and CPU-side staging copies of each uniform
//! block. Built-in programs are compiled from embedded source the first
//! time they are requested and cached for the life of the registry;
//! user programs go through the same [`ShaderRegistry::register`] path.

mod reflect;

pub use reflect::{BlockInfo, UniformSlot};

use glam::{Mat3, Mat4, UVec4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::errors::{AtelierError, Result};
use crate::lights::MAX_LIGHTS;

// ====================================================================
// Program identity
// ====================================================================

/// Stable handle to a registered program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u32);

/// The programs shipped with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinShader {
    /// Surface normal visualized as color.
    NormalMaterial,
    /// Flat or per-vertex color, no lighting.
    ColorOnly,
    /// Texture sample, no lighting.
    TexturedColor,
    /// Phong lighting with optional texture.
    LitTextured,
    /// Stroke segments.
    LineStroke,
}

impl BuiltinShader {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            Self::NormalMaterial => 0,
            Self::ColorOnly => 1,
            Self::TexturedColor => 2,
            Self::LitTextured => 3,
            Self::LineStroke => 4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::NormalMaterial => "builtin:normal",
            Self::ColorOnly => "builtin:color",
            Self::TexturedColor => "builtin:texture",
            Self::LitTextured => "builtin:lit",
            Self::LineStroke => "builtin:line",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::NormalMaterial => include_str!("programs/normal.wgsl"),
            Self::ColorOnly => include_str!("programs/color.wgsl"),
            Self::TexturedColor => include_str!("programs/texture.wgsl"),
            Self::LitTextured => include_str!("programs/lit.wgsl"),
            Self::LineStroke => include_str!("programs/line.wgsl"),
        }
    }

    fn stroke_capable(self) -> bool {
        matches!(self, Self::LineStroke)
    }
}

// ====================================================================
// Uniform values
// ====================================================================

/// A typed uniform value, serialized per WGSL layout rules.
///
/// `Mat3` columns are padded to 16 bytes; `Bool` is lowered to `u32`.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    UInt(u32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    UVec4(UVec4),
    Mat3(Mat3),
    Mat4(Mat4),
    /// Fixed-size light array, one entry per light slot.
    Vec4Array([Vec4; MAX_LIGHTS]),
}

impl UniformValue {
    /// Serialized size in bytes, matching WGSL's size of the member type.
    #[must_use]
    pub fn size(&self) -> u32 {
        match self {
            Self::Float(_) | Self::Int(_) | Self::UInt(_) | Self::Bool(_) => 4,
            Self::Vec2(_) => 8,
            Self::Vec3(_) => 12,
            Self::Vec4(_) | Self::UVec4(_) => 16,
            Self::Mat3(_) => 48,
            Self::Mat4(_) => 64,
            Self::Vec4Array(_) => 16 * MAX_LIGHTS as u32,
        }
    }

    fn write_into(&self, out: &mut [u8]) {
        match self {
            Self::Float(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Int(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            Self::UInt(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Bool(v) => out.copy_from_slice(bytemuck::bytes_of(&u32::from(*v))),
            Self::Vec2(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Vec3(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Vec4(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            Self::UVec4(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Mat3(m) => {
                for (i, col) in [m.x_axis, m.y_axis, m.z_axis].into_iter().enumerate() {
                    out[i * 16..i * 16 + 12].copy_from_slice(bytemuck::bytes_of(&col));
                }
            }
            Self::Mat4(m) => out.copy_from_slice(bytemuck::bytes_of(m)),
            Self::Vec4Array(arr) => out.copy_from_slice(bytemuck::cast_slice(arr)),
        }
    }
}

// ====================================================================
// Programs
// ====================================================================

/// CPU-side staging copy of one uniform block.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    pub group: u32,
    pub binding: u32,
    data: Vec<u8>,
}

impl UniformBlock {
    /// The current staged bytes, ready for a buffer upload.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// A registered shader program with its uniform table.
#[derive(Debug)]
pub struct Program {
    label: String,
    source: String,
    stroke_capable: bool,
    samples_texture: bool,
    uniforms: FxHashMap<String, UniformSlot>,
    blocks: Vec<UniformBlock>,
}

impl Program {
    fn new(label: &str, source: &str, stroke_capable: bool) -> Result<Self> {
        let reflected = reflect::reflect(label, source)?;
        let blocks = reflected
            .blocks
            .iter()
            .map(|b| UniformBlock {
                group: b.group,
                binding: b.binding,
                data: vec![0u8; b.size as usize],
            })
            .collect();
        Ok(Self {
            label: label.to_string(),
            source: source.to_string(),
            stroke_capable,
            samples_texture: reflected.samples_texture,
            uniforms: reflected.members,
            blocks,
        })
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this program renders stroke segments rather than fill.
    #[must_use]
    pub fn stroke_capable(&self) -> bool {
        self.stroke_capable
    }

    /// Whether the program declares a sampled texture binding.
    #[must_use]
    pub fn samples_texture(&self) -> bool {
        self.samples_texture
    }

    #[must_use]
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Reflected location of a uniform member, if the program declares it.
    #[must_use]
    pub fn uniform_slot(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms.get(name).copied()
    }

    /// Staged uniform blocks in declaration order.
    #[must_use]
    pub fn blocks(&self) -> &[UniformBlock] {
        &self.blocks
    }

    fn write_uniform(&mut self, name: &str, value: &UniformValue) -> Result<()> {
        let Some(slot) = self.uniforms.get(name) else {
            return Err(AtelierError::UnknownUniform {
                program: self.label.clone(),
                name: name.to_string(),
            });
        };
        if slot.size != value.size() {
            return Err(AtelierError::UniformMismatch {
                name: name.to_string(),
                expected: slot.size,
                actual: value.size(),
            });
        }
        let start = slot.offset as usize;
        let end = start + slot.size as usize;
        value.write_into(&mut self.blocks[slot.block].data[start..end]);
        Ok(())
    }
}

// ====================================================================
// Registry
// ====================================================================

/// Owns every program and tracks which one is active.
///
/// Activation is idempotent: re-activating the current program is a
/// no-op the caller can detect, so pipeline rebinds are skipped.
#[derive(Debug, Default)]
pub struct ShaderRegistry {
    programs: Vec<Program>,
    builtins: [Option<ProgramId>; BuiltinShader::COUNT],
    active: Option<ProgramId>,
}

impl ShaderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register a user program.
    ///
    /// Reflection runs once here; bad WGSL fails with
    /// [`AtelierError::ShaderParse`] and registers nothing.
    pub fn register(&mut self, label: &str, source: &str, stroke_capable: bool) -> Result<ProgramId> {
        let program = Program::new(label, source, stroke_capable)?;
        let id = ProgramId(u32::try_from(self.programs.len()).map_err(|_| {
            AtelierError::InvalidState("program registry full")
        })?);
        self.programs.push(program);
        Ok(id)
    }

    /// Handle for a builtin, compiling it on first request.
    pub fn builtin(&mut self, kind: BuiltinShader) -> Result<ProgramId> {
        if let Some(id) = self.builtins[kind.index()] {
            return Ok(id);
        }
        let id = self.register(kind.label(), kind.source(), kind.stroke_capable())?;
        self.builtins[kind.index()] = Some(id);
        Ok(id)
    }

    #[must_use]
    pub fn program(&self, id: ProgramId) -> &Program {
        &self.programs[id.0 as usize]
    }

    /// Stage a uniform write into the program's CPU-side block.
    pub fn set_uniform(&mut self, id: ProgramId, name: &str, value: &UniformValue) -> Result<()> {
        self.programs[id.0 as usize].write_uniform(name, value)
    }

    /// Stage a uniform write, ignoring members the program lacks.
    ///
    /// Used when populating builtin state: not every program declares
    /// every engine uniform. Size mismatches still fail.
    pub fn set_uniform_if_present(
        &mut self,
        id: ProgramId,
        name: &str,
        value: &UniformValue,
    ) -> Result<()> {
        match self.set_uniform(id, name, value) {
            Err(AtelierError::UnknownUniform { .. }) => Ok(()),
            other => other,
        }
    }

    /// Make `id` the active program. Returns `true` if this changed the
    /// active program, `false` if it was already active.
    pub fn activate(&mut self, id: ProgramId) -> bool {
        if self.active == Some(id) {
            return false;
        }
        self.active = Some(id);
        true
    }

    #[must_use]
    pub fn active(&self) -> Option<ProgramId> {
        self.active
    }

    /// Number of registered programs, builtins included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r"
        struct Params {
            tint: vec4<f32>,
            strength: f32,
        };
        @group(0) @binding(0) var<uniform> params: Params;

        @vertex
        fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(position, 1.0) * params.strength;
        }

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return params.tint;
        }
    ";

    #[test]
    fn reflects_struct_members() {
        let mut reg = ShaderRegistry::new();
        let id = reg.register("small", SMALL, false).unwrap();
        let program = reg.program(id);
        let tint = program.uniform_slot("tint").unwrap();
        assert_eq!(tint.offset, 0);
        assert_eq!(tint.size, 16);
        let strength = program.uniform_slot("strength").unwrap();
        assert_eq!(strength.offset, 16);
        assert_eq!(strength.size, 4);
    }

    #[test]
    fn unknown_uniform_is_an_error() {
        let mut reg = ShaderRegistry::new();
        let id = reg.register("small", SMALL, false).unwrap();
        let err = reg
            .set_uniform(id, "nope", &UniformValue::Float(1.0))
            .unwrap_err();
        assert!(matches!(err, AtelierError::UnknownUniform { .. }));
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let mut reg = ShaderRegistry::new();
        let id = reg.register("small", SMALL, false).unwrap();
        let err = reg
            .set_uniform(id, "tint", &UniformValue::Float(1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            AtelierError::UniformMismatch { expected: 16, actual: 4, .. }
        ));
    }

    #[test]
    fn staged_bytes_land_at_reflected_offsets() {
        let mut reg = ShaderRegistry::new();
        let id = reg.register("small", SMALL, false).unwrap();
        reg.set_uniform(id, "strength", &UniformValue::Float(2.0)).unwrap();
        let block = &reg.program(id).blocks()[0];
        assert_eq!(&block.bytes()[16..20], bytemuck::bytes_of(&2.0f32));
    }

    #[test]
    fn builtins_compile_once() {
        let mut reg = ShaderRegistry::new();
        let a = reg.builtin(BuiltinShader::ColorOnly).unwrap();
        let b = reg.builtin(BuiltinShader::ColorOnly).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn activation_is_idempotent() {
        let mut reg = ShaderRegistry::new();
        let a = reg.builtin(BuiltinShader::ColorOnly).unwrap();
        let b = reg.builtin(BuiltinShader::NormalMaterial).unwrap();
        assert!(reg.activate(a));
        assert!(!reg.activate(a));
        assert!(reg.activate(b));
        assert_eq!(reg.active(), Some(b));
    }

    #[test]
    fn bad_source_reports_parse_error() {
        let mut reg = ShaderRegistry::new();
        let err = reg.register("broken", "fn {", false).unwrap_err();
        assert!(matches!(err, AtelierError::ShaderParse { .. }));
        assert!(reg.is_empty());
    }
}
