//! Retained geometry for reusable named primitives.
//!
//! Immediate-mode shapes are uploaded and discarded every frame; a
//! retained mesh is built once under a caller-chosen key (typically
//! the primitive name plus its detail parameters) and its GPU buffers
//! are reused on every later draw.

use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::xxh3_64;

use crate::errors::Result;
use crate::geometry::{BufferSummary, ShapeBuffer};
use crate::gpu::{GpuBackend, MeshId};

#[derive(Debug, Default)]
pub struct RetainedCache {
    meshes: FxHashMap<u64, (MeshId, BufferSummary)>,
}

impl RetainedCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`, building and uploading the geometry on a miss.
    ///
    /// `build` runs only on a miss; a build failure caches nothing.
    pub fn get_or_build<B, F>(
        &mut self,
        backend: &mut B,
        key: &str,
        build: F,
    ) -> Result<(MeshId, BufferSummary)>
    where
        B: GpuBackend,
        F: FnOnce() -> Result<ShapeBuffer>,
    {
        let hash = xxh3_64(key.as_bytes());
        if let Some(&entry) = self.meshes.get(&hash) {
            return Ok(entry);
        }
        let buffer = build()?;
        let summary = buffer.summary();
        let id = backend.upload_mesh(&buffer);
        self.meshes.insert(hash, (id, summary));
        Ok((id, summary))
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.meshes.contains_key(&xxh3_64(key.as_bytes()))
    }

    /// Free every retained mesh.
    pub fn clear<B: GpuBackend>(&mut self, backend: &mut B) {
        for (_, (id, _)) in self.meshes.drain() {
            backend.free_mesh(id);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}
