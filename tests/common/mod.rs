//! Shared test fixtures: a recording GPU backend and fake texture
//! sources with interior mutability, so cache and renderer behavior is
//! observable without a device.

#![allow(dead_code)]

use std::borrow::Cow;
use std::cell::{Cell, RefCell};

use uuid::Uuid;

use atelier::errors::Result;
use atelier::geometry::{BufferKind, ShapeBuffer};
use atelier::gpu::{DrawCall, DrawPart, GpuBackend, MeshId, TextureId};
use atelier::texture::{SourceKind, TextureSource};

// ============================================================================
// Recording backend
// ============================================================================

/// One draw call as the backend saw it.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub program_label: String,
    pub mesh: MeshId,
    pub part: DrawPart,
    pub topology: BufferKind,
    pub blend: Option<wgpu::BlendState>,
    pub depth_write: bool,
    pub texture: Option<TextureId>,
}

/// GPU stub that remembers everything it is asked to do.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub meshes: Vec<(MeshId, ShapeBuffer)>,
    pub freed_meshes: Vec<MeshId>,
    pub created_textures: Vec<(TextureId, u32, u32)>,
    pub uploads: Vec<(TextureId, u32, u32, usize)>,
    pub destroyed_textures: Vec<TextureId>,
    pub draws: Vec<DrawRecord>,
    next_texture: u64,
    next_mesh: u64,
}

/// Route `log` output through the test harness so truncation and
/// cache messages show up in failing test output (RUST_LOG to enable).
pub fn init_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

impl RecordingBackend {
    pub fn new() -> Self {
        init_logging();
        Self::default()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.len()
    }

    pub fn mesh(&self, id: MeshId) -> &ShapeBuffer {
        &self
            .meshes
            .iter()
            .find(|(m, _)| *m == id)
            .expect("mesh not uploaded")
            .1
    }
}

impl GpuBackend for RecordingBackend {
    fn upload_mesh(&mut self, buffer: &ShapeBuffer) -> MeshId {
        let id = MeshId(self.next_mesh);
        self.next_mesh += 1;
        self.meshes.push((id, buffer.clone()));
        id
    }

    fn free_mesh(&mut self, id: MeshId) {
        self.freed_meshes.push(id);
    }

    fn create_texture(&mut self, _label: &str, width: u32, height: u32) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.created_textures.push((id, width, height));
        id
    }

    fn upload_texture(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]) {
        self.uploads.push((id, width, height, pixels.len()));
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.destroyed_textures.push(id);
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        self.draws.push(DrawRecord {
            program_label: call.program.label().to_string(),
            mesh: call.mesh,
            part: call.part,
            topology: call.topology,
            blend: call.blend.blend,
            depth_write: call.blend.depth_write,
            texture: call.texture,
        });
        Ok(())
    }
}

// ============================================================================
// Fake texture sources
// ============================================================================

/// In-memory pixel source with mutable content, dimensions and
/// generation, mimicking an image or a video feed.
#[derive(Debug)]
pub struct FakeSource {
    id: Uuid,
    kind: SourceKind,
    dims: Cell<(u32, u32)>,
    generation: Cell<u64>,
    pixels: RefCell<Option<Vec<u8>>>,
}

impl FakeSource {
    /// A ready image source filled with opaque white.
    pub fn image(width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: SourceKind::Image,
            dims: Cell::new((width, height)),
            generation: Cell::new(1),
            pixels: RefCell::new(Some(vec![255; (width * height * 4) as usize])),
        }
    }

    /// A video source that has not produced a frame yet.
    pub fn unready_video() -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: SourceKind::Video,
            dims: Cell::new((0, 0)),
            generation: Cell::new(0),
            pixels: RefCell::new(None),
        }
    }

    /// A source of a kind the cache cannot sample.
    pub fn unsupported(tag: &'static str) -> Self {
        let mut source = Self::image(1, 1);
        source.kind = SourceKind::Other(tag);
        source
    }

    /// New content at the same dimensions.
    pub fn bump_generation(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    /// The source stops producing pixels (e.g. a seeking video).
    pub fn drop_frame(&self) {
        *self.pixels.borrow_mut() = None;
    }

    /// First frame (or a resize) arrives.
    pub fn set_frame(&self, width: u32, height: u32) {
        self.dims.set((width, height));
        self.generation.set(self.generation.get() + 1);
        *self.pixels.borrow_mut() = Some(vec![128; (width * height * 4) as usize]);
    }
}

impl TextureSource for FakeSource {
    fn source_id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dims.get()
    }

    fn content_generation(&self) -> u64 {
        self.generation.get()
    }

    fn pixels(&self) -> Option<Cow<'_, [u8]>> {
        self.pixels.borrow().clone().map(Cow::Owned)
    }
}
