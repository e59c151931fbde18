//! Immediate-mode shape accumulation and finalization.
//!
//! A shape is transient: `begin_shape` opens the accumulation buffers,
//! vertex calls append to them, and `end_shape` finalizes into a
//! [`ShapeBuffer`] that is uploaded and discarded. Fill geometry is
//! expanded to a flat triangle list; stroke geometry keeps the original
//! vertices and indexes them with an edge list.

mod builder;
mod tess;

pub use builder::ShapeBuilder;

use glam::{Vec2, Vec3, Vec4};

// ====================================================================
// Modes
// ====================================================================

/// Draw-mode tag recorded by `begin_shape`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShapeMode {
    Points,
    Lines,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
    /// General polygon, possibly self-intersecting or multi-contour.
    #[default]
    Tess,
}

/// Primitive class of a finalized buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Points,
    Lines,
    Triangles,
}

// ====================================================================
// Vertices
// ====================================================================

/// One accumulated vertex with every attribute resolved at append time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub fill: Vec4,
    pub stroke: Vec4,
}

impl ShapeVertex {
    pub(crate) fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        Self {
            position: a.position.lerp(b.position, t),
            normal: a.normal.lerp(b.normal, t),
            uv: a.uv.lerp(b.uv, t),
            fill: a.fill.lerp(b.fill, t),
            stroke: a.stroke.lerp(b.stroke, t),
        }
    }
}

// ====================================================================
// Finalized buffers
// ====================================================================

/// Finalized shape geometry, ready for upload.
///
/// Fill attributes are expanded (one entry per triangle corner, or per
/// point/line vertex for the non-filled kinds). Stroke attributes keep
/// the original un-expanded vertices; `edges` indexes into them.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeBuffer {
    pub kind: BufferKind,

    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec4>,

    pub stroke_positions: Vec<Vec3>,
    pub stroke_colors: Vec<Vec4>,
    pub edges: Vec<[u32; 2]>,

    /// At least one vertex carried a fill color different from the
    /// first vertex's; downstream draws read per-vertex color.
    pub uses_vertex_colors: bool,
    /// Same, for stroke color.
    pub uses_stroke_colors: bool,
}

/// What a draw needs to know about an uploaded buffer after the
/// vertex data itself is gone to the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSummary {
    pub kind: BufferKind,
    pub has_fill: bool,
    pub has_stroke: bool,
    pub uses_vertex_colors: bool,
    pub uses_stroke_colors: bool,
}

impl ShapeBuffer {
    /// Summarize for draws that outlive the CPU-side data.
    #[must_use]
    pub fn summary(&self) -> BufferSummary {
        BufferSummary {
            kind: self.kind,
            has_fill: !self.positions.is_empty(),
            has_stroke: !self.stroke_positions.is_empty()
                && (self.kind == BufferKind::Points || !self.edges.is_empty()),
            uses_vertex_colors: self.uses_vertex_colors,
            uses_stroke_colors: self.uses_stroke_colors,
        }
    }

    pub(crate) fn empty(kind: BufferKind) -> Self {
        Self {
            kind,
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            colors: Vec::new(),
            stroke_positions: Vec::new(),
            stroke_colors: Vec::new(),
            edges: Vec::new(),
            uses_vertex_colors: false,
            uses_stroke_colors: false,
        }
    }

    /// Number of expanded fill vertices.
    #[must_use]
    pub fn fill_len(&self) -> usize {
        self.positions.len()
    }

    /// True when neither fill nor stroke produced anything drawable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.edges.is_empty() && self.stroke_positions.is_empty()
    }

    pub(crate) fn push_fill(&mut self, v: &ShapeVertex) {
        self.positions.push(v.position);
        self.normals.push(v.normal);
        self.uvs.push(v.uv);
        self.colors.push(v.fill);
    }

    pub(crate) fn push_stroke(&mut self, v: &ShapeVertex) {
        self.stroke_positions.push(v.position);
        self.stroke_colors.push(v.stroke);
    }
}
