//! Backend seam between renderer state and the graphics API.
//!
//! The renderer drives a narrow [`GpuBackend`] trait: upload meshes and
//! textures, submit draw calls. The wgpu implementation lives in
//! [`wgpu_backend`]; tests drive the same trait with a recording stub.

pub mod wgpu_backend;

use crate::blend::BlendSpec;
use crate::errors::Result;
use crate::geometry::{BufferKind, ShapeBuffer};
use crate::shader::{Program, ProgramId};

/// Backend handle to an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Backend handle to an uploaded mesh (fill and stroke parts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u64);

/// Which part of an uploaded mesh a draw call renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawPart {
    Fill,
    Stroke,
}

/// One fully-resolved draw: program, pipeline state, mesh, texture.
#[derive(Debug)]
pub struct DrawCall<'a> {
    pub program: &'a Program,
    pub program_id: ProgramId,
    pub mesh: MeshId,
    pub part: DrawPart,
    /// Primitive class of this part: fill is always `Triangles`,
    /// stroke is `Lines` or `Points`.
    pub topology: BufferKind,
    pub blend: BlendSpec,
    pub texture: Option<TextureId>,
}

/// Graphics-API surface the renderer draws through.
pub trait GpuBackend {
    /// Upload a finalized shape. The backend derives both the fill
    /// vertex stream and the de-indexed stroke stream from it.
    fn upload_mesh(&mut self, buffer: &ShapeBuffer) -> MeshId;

    /// Release an uploaded mesh.
    fn free_mesh(&mut self, id: MeshId);

    /// Allocate an RGBA8 texture of the given dimensions.
    fn create_texture(&mut self, label: &str, width: u32, height: u32) -> TextureId;

    /// Upload full-texture pixel data (RGBA8, tightly packed rows).
    fn upload_texture(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]);

    /// Release a texture.
    fn destroy_texture(&mut self, id: TextureId);

    /// Record one draw call.
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()>;
}
