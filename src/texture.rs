//! Texture sources and the GPU texture cache.
//!
//! A [`TextureSource`] is anything that can supply RGBA8 pixels: an
//! image, a video feed, an offscreen surface. Sources carry a stable
//! identity and a content generation; the cache uploads only when the
//! generation moved or the dimensions changed, so binding the same
//! unchanged source every frame costs one hash lookup and no transfer.

use std::borrow::Cow;
use std::fmt;

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::errors::{AtelierError, Result};
use crate::gpu::{GpuBackend, TextureId};

// ====================================================================
// Sources
// ====================================================================

/// What kind of producer backs a texture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Image,
    Video,
    /// An offscreen render surface.
    Surface,
    /// Anything the cache does not know how to sample.
    Other(&'static str),
}

/// A pixel producer the cache can upload from.
pub trait TextureSource: fmt::Debug {
    /// Stable identity for the lifetime of the source.
    fn source_id(&self) -> Uuid;

    fn kind(&self) -> SourceKind;

    /// Current width and height in pixels. May be zero while the
    /// source is still loading.
    fn dimensions(&self) -> (u32, u32);

    /// Monotonic counter bumped whenever the pixel content changes.
    fn content_generation(&self) -> u64;

    /// Current pixels, RGBA8 row-major, or `None` while not ready.
    fn pixels(&self) -> Option<Cow<'_, [u8]>>;
}

// ====================================================================
// Cache
// ====================================================================

/// Per-source upload bookkeeping.
#[derive(Debug, Clone, Copy)]
struct TextureRecord {
    id: TextureId,
    generation: u64,
    width: u32,
    height: u32,
}

/// Maps source identities to GPU textures, uploading lazily.
#[derive(Debug, Default)]
pub struct TextureCache {
    records: FxHashMap<Uuid, TextureRecord>,
    bound: Option<Uuid>,
}

impl TextureCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `source` to a GPU texture, uploading if its content is
    /// new or changed.
    ///
    /// A source that is not ready yet (zero dimensions or no pixels)
    /// is not an error: if a previous upload exists its texture is
    /// reused as-is, otherwise `Ok(None)` tells the caller to skip the
    /// textured draw this frame.
    pub fn bind<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        source: &dyn TextureSource,
    ) -> Result<Option<TextureId>> {
        if let SourceKind::Other(tag) = source.kind() {
            return Err(AtelierError::UnsupportedSource(tag));
        }

        let key = source.source_id();
        let (width, height) = source.dimensions();
        let generation = source.content_generation();

        let ready = width > 0 && height > 0;
        let pixels = if ready { source.pixels() } else { None };

        let Some(pixels) = pixels else {
            // Not ready. Keep whatever was uploaded before, if anything.
            let prior = self.records.get(&key).map(|r| r.id);
            if prior.is_some() {
                self.bound = Some(key);
            }
            return Ok(prior);
        };

        let record = match self.records.get_mut(&key) {
            Some(record) if record.width == width && record.height == height => {
                if record.generation != generation {
                    backend.upload_texture(record.id, width, height, &pixels);
                    record.generation = generation;
                }
                *record
            }
            Some(record) => {
                // Dimensions moved: the old allocation cannot be reused.
                backend.destroy_texture(record.id);
                let id = backend.create_texture("texture-cache", width, height);
                backend.upload_texture(id, width, height, &pixels);
                *record = TextureRecord {
                    id,
                    generation,
                    width,
                    height,
                };
                *record
            }
            None => {
                let id = backend.create_texture("texture-cache", width, height);
                backend.upload_texture(id, width, height, &pixels);
                let record = TextureRecord {
                    id,
                    generation,
                    width,
                    height,
                };
                self.records.insert(key, record);
                record
            }
        };

        self.bound = Some(key);
        Ok(Some(record.id))
    }

    /// Drop a source's GPU texture, if cached.
    pub fn evict<B: GpuBackend>(&mut self, backend: &mut B, source_id: Uuid) {
        if let Some(record) = self.records.remove(&source_id) {
            backend.destroy_texture(record.id);
            if self.bound == Some(source_id) {
                self.bound = None;
            }
        }
    }

    /// Identity of the most recently bound source.
    #[must_use]
    pub fn bound(&self) -> Option<Uuid> {
        self.bound
    }

    /// Number of cached GPU textures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
