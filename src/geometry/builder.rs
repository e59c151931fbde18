//! Shape accumulation state machine.

use glam::{Vec2, Vec3};

use crate::errors::{AtelierError, Result};
use crate::material::MaterialState;
use crate::style::DrawSettings;

use super::tess;
use super::{BufferKind, ShapeBuffer, ShapeMode, ShapeVertex};

/// Accumulates vertices between `begin_shape` and `end_shape`.
///
/// Every vertex resolves its attributes from [`MaterialState`] at
/// append time, so color changes mid-shape produce per-vertex color.
/// Curve vertices interpolate attributes between the previous anchor's
/// captured values and the material values current at the call.
#[derive(Debug, Default)]
pub struct ShapeBuilder {
    building: bool,
    mode: ShapeMode,
    contours: Vec<Vec<ShapeVertex>>,
    spline: Vec<ShapeVertex>,
}

impl ShapeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a shape is currently being accumulated.
    #[must_use]
    pub fn building(&self) -> bool {
        self.building
    }

    /// Drop any half-built shape. A shape left open by a missed
    /// `end_shape` is a logic error, not a crash; the next frame
    /// starts clean.
    pub fn reset(&mut self) {
        self.building = false;
        self.contours.clear();
        self.spline.clear();
    }

    /// Start a new shape. Fails if one is already open.
    pub fn begin_shape(&mut self, mode: ShapeMode) -> Result<()> {
        if self.building {
            return Err(AtelierError::InvalidState(
                "begin_shape while a shape is already building",
            ));
        }
        self.building = true;
        self.mode = mode;
        self.contours.clear();
        self.contours.push(Vec::new());
        self.spline.clear();
        Ok(())
    }

    /// Append a vertex, resolving omitted attributes from `material`.
    pub fn vertex(
        &mut self,
        material: &MaterialState,
        position: Vec3,
        uv: Option<Vec2>,
    ) -> Result<()> {
        let v = self.capture(material, position, uv);
        self.current_contour()?.push(v);
        self.spline.clear();
        Ok(())
    }

    /// Start an inner contour. Only meaningful for the general-polygon
    /// mode.
    pub fn begin_contour(&mut self) -> Result<()> {
        if !self.building {
            return Err(AtelierError::InvalidState("begin_contour without begin_shape"));
        }
        if self.mode != ShapeMode::Tess {
            return Err(AtelierError::InvalidState(
                "begin_contour requires the general-polygon mode",
            ));
        }
        self.contours.push(Vec::new());
        self.spline.clear();
        Ok(())
    }

    /// Close the current inner contour.
    pub fn end_contour(&mut self) -> Result<()> {
        if !self.building || self.contours.len() < 2 {
            return Err(AtelierError::InvalidState("end_contour without begin_contour"));
        }
        self.spline.clear();
        Ok(())
    }

    /// Append a cubic Bézier segment from the previous vertex.
    ///
    /// Attributes blend linearly along the segment from the previous
    /// vertex's captured values to the material values current now; the
    /// destination inherits the previous vertex's uv.
    pub fn bezier_vertex(
        &mut self,
        material: &MaterialState,
        settings: &DrawSettings,
        c1: Vec3,
        c2: Vec3,
        anchor: Vec3,
    ) -> Result<()> {
        let detail = settings.bezier_detail.max(1);
        let (prev, dest) = self.curve_endpoints(material, anchor)?;
        for step in 1..=detail {
            let t = step as f32 / detail as f32;
            let mut v = ShapeVertex::lerp(&prev, &dest, t);
            v.position = cubic_point(prev.position, c1, c2, anchor, t);
            self.current_contour()?.push(v);
        }
        Ok(())
    }

    /// Append a quadratic Bézier segment from the previous vertex.
    pub fn quadratic_vertex(
        &mut self,
        material: &MaterialState,
        settings: &DrawSettings,
        ctrl: Vec3,
        anchor: Vec3,
    ) -> Result<()> {
        let detail = settings.bezier_detail.max(1);
        let (prev, dest) = self.curve_endpoints(material, anchor)?;
        for step in 1..=detail {
            let t = step as f32 / detail as f32;
            let mut v = ShapeVertex::lerp(&prev, &dest, t);
            v.position = quadratic_point(prev.position, ctrl, anchor, t);
            self.current_contour()?.push(v);
        }
        Ok(())
    }

    /// Append a Catmull-Rom control point.
    ///
    /// Nothing is emitted until four control points exist; each further
    /// point emits the spline segment between the two middle controls.
    pub fn curve_vertex(
        &mut self,
        material: &MaterialState,
        settings: &DrawSettings,
        position: Vec3,
    ) -> Result<()> {
        if !self.building {
            return Err(AtelierError::InvalidState("curve_vertex without begin_shape"));
        }
        let v = self.capture(material, position, None);
        self.spline.push(v);
        let n = self.spline.len();
        if n < 4 {
            return Ok(());
        }

        let detail = settings.curve_detail.max(1);
        let [p0, p1, p2, p3] = [
            self.spline[n - 4],
            self.spline[n - 3],
            self.spline[n - 2],
            self.spline[n - 1],
        ];
        // First emitted segment includes t = 0; later segments start one
        // step in so the shared control point is not duplicated.
        let first_step = u32::from(n > 4);
        for step in first_step..=detail {
            let t = step as f32 / detail as f32;
            let mut v = ShapeVertex::lerp(&p1, &p2, t);
            v.position = catmull_rom_point(p0.position, p1.position, p2.position, p3.position, t);
            self.current_contour()?.push(v);
        }
        Ok(())
    }

    /// Finalize the shape into a drawable buffer.
    pub fn end_shape(&mut self, close: bool) -> Result<ShapeBuffer> {
        if !self.building {
            return Err(AtelierError::InvalidState("end_shape without begin_shape"));
        }
        self.building = false;
        self.spline.clear();
        let mut contours = std::mem::take(&mut self.contours);

        if self.mode != ShapeMode::Tess {
            // Inner contours only exist for the general-polygon mode.
            contours.truncate(1);
        }

        let vertices = contours.first().cloned().unwrap_or_default();
        let mut buffer = match self.mode {
            ShapeMode::Points => finalize_points(&vertices),
            ShapeMode::Lines => finalize_lines(vertices),
            ShapeMode::Triangles => finalize_triangles(vertices),
            ShapeMode::TriangleStrip => finalize_triangle_strip(&vertices),
            ShapeMode::TriangleFan => finalize_triangle_fan(&vertices),
            ShapeMode::Quads => finalize_quads(vertices),
            ShapeMode::QuadStrip => finalize_quad_strip(vertices),
            ShapeMode::Tess => tess::finalize_polygon(&contours, close)?,
        };

        mark_color_variation(&mut buffer);
        Ok(buffer)
    }

    fn capture(
        &self,
        material: &MaterialState,
        position: Vec3,
        uv: Option<Vec2>,
    ) -> ShapeVertex {
        ShapeVertex {
            position,
            normal: material.current_normal(),
            uv: uv.unwrap_or(Vec2::ZERO),
            fill: material.fill_color(),
            stroke: material.stroke_color(),
        }
    }

    fn current_contour(&mut self) -> Result<&mut Vec<ShapeVertex>> {
        if !self.building {
            return Err(AtelierError::InvalidState("vertex without begin_shape"));
        }
        self.contours
            .last_mut()
            .ok_or(AtelierError::InvalidState("vertex without begin_shape"))
    }

    fn curve_endpoints(
        &mut self,
        material: &MaterialState,
        anchor: Vec3,
    ) -> Result<(ShapeVertex, ShapeVertex)> {
        let contour = self.current_contour()?;
        let Some(prev) = contour.last().copied() else {
            return Err(AtelierError::InvalidState(
                "curve segment without a starting vertex",
            ));
        };
        let dest = ShapeVertex {
            position: anchor,
            normal: material.current_normal(),
            uv: prev.uv,
            fill: material.fill_color(),
            stroke: material.stroke_color(),
        };
        Ok((prev, dest))
    }
}

// ====================================================================
// Per-mode finalization
// ====================================================================

fn truncated<T>(mut vertices: Vec<T>, multiple: usize, mode: &str) -> Vec<T> {
    let excess = vertices.len() % multiple;
    if excess != 0 {
        log::debug!(
            "{mode} shape with {} vertices, discarding {excess} trailing",
            vertices.len()
        );
        let keep = vertices.len() - excess;
        vertices.truncate(keep);
    }
    vertices
}

fn finalize_points(vertices: &[ShapeVertex]) -> ShapeBuffer {
    let mut buffer = ShapeBuffer::empty(BufferKind::Points);
    for v in vertices {
        buffer.push_stroke(v);
    }
    buffer
}

fn finalize_lines(vertices: Vec<ShapeVertex>) -> ShapeBuffer {
    let vertices = truncated(vertices, 2, "lines");
    let mut buffer = ShapeBuffer::empty(BufferKind::Lines);
    for v in &vertices {
        buffer.push_stroke(v);
    }
    for pair in 0..vertices.len() / 2 {
        let i = (pair * 2) as u32;
        buffer.edges.push([i, i + 1]);
    }
    buffer
}

fn finalize_triangles(vertices: Vec<ShapeVertex>) -> ShapeBuffer {
    let vertices = truncated(vertices, 3, "triangles");
    let mut buffer = ShapeBuffer::empty(BufferKind::Triangles);
    for v in &vertices {
        buffer.push_fill(v);
        buffer.push_stroke(v);
    }
    for tri in 0..vertices.len() / 3 {
        let b = (tri * 3) as u32;
        buffer.edges.push([b, b + 1]);
        buffer.edges.push([b + 1, b + 2]);
        buffer.edges.push([b + 2, b]);
    }
    buffer
}

fn finalize_triangle_strip(vertices: &[ShapeVertex]) -> ShapeBuffer {
    let mut buffer = ShapeBuffer::empty(BufferKind::Triangles);
    if vertices.len() < 3 {
        return buffer;
    }
    for i in 0..vertices.len() - 2 {
        // Alternate winding so every triangle faces the same way.
        let (a, b, c) = if i % 2 == 0 {
            (i, i + 1, i + 2)
        } else {
            (i + 1, i, i + 2)
        };
        buffer.push_fill(&vertices[a]);
        buffer.push_fill(&vertices[b]);
        buffer.push_fill(&vertices[c]);
    }
    for v in vertices {
        buffer.push_stroke(v);
    }
    let n = vertices.len() as u32;
    for i in 0..n - 2 {
        buffer.edges.push([i, i + 1]);
        buffer.edges.push([i, i + 2]);
    }
    buffer.edges.push([n - 2, n - 1]);
    buffer
}

fn finalize_triangle_fan(vertices: &[ShapeVertex]) -> ShapeBuffer {
    let mut buffer = ShapeBuffer::empty(BufferKind::Triangles);
    if vertices.len() < 3 {
        return buffer;
    }
    for i in 2..vertices.len() {
        buffer.push_fill(&vertices[0]);
        buffer.push_fill(&vertices[i - 1]);
        buffer.push_fill(&vertices[i]);
    }
    for v in vertices {
        buffer.push_stroke(v);
    }
    let n = vertices.len() as u32;
    buffer.edges.push([0, 1]);
    for i in 2..n {
        buffer.edges.push([0, i]);
        buffer.edges.push([i - 1, i]);
    }
    buffer
}

fn finalize_quads(vertices: Vec<ShapeVertex>) -> ShapeBuffer {
    let vertices = truncated(vertices, 4, "quads");
    let mut buffer = ShapeBuffer::empty(BufferKind::Triangles);
    for quad in vertices.chunks_exact(4) {
        // Split along the 0-2 diagonal.
        for &i in &[0usize, 1, 2, 0, 2, 3] {
            buffer.push_fill(&quad[i]);
        }
    }
    for v in &vertices {
        buffer.push_stroke(v);
    }
    for quad in 0..vertices.len() / 4 {
        let b = (quad * 4) as u32;
        buffer.edges.push([b, b + 1]);
        buffer.edges.push([b + 1, b + 2]);
        buffer.edges.push([b + 2, b + 3]);
        buffer.edges.push([b + 3, b]);
    }
    buffer
}

fn finalize_quad_strip(vertices: Vec<ShapeVertex>) -> ShapeBuffer {
    let vertices = truncated(vertices, 2, "quad-strip");
    let mut buffer = ShapeBuffer::empty(BufferKind::Triangles);
    if vertices.len() < 4 {
        return buffer;
    }
    let n = vertices.len();
    let mut i = 0;
    while i + 3 < n {
        for &j in &[i, i + 1, i + 2, i + 1, i + 3, i + 2] {
            buffer.push_fill(&vertices[j]);
        }
        i += 2;
    }
    for v in &vertices {
        buffer.push_stroke(v);
    }
    let mut i = 0u32;
    while i + 3 < n as u32 {
        buffer.edges.push([i, i + 2]);
        buffer.edges.push([i + 1, i + 3]);
        buffer.edges.push([i + 2, i + 3]);
        i += 2;
    }
    buffer.edges.push([0, 1]);
    buffer
}

fn mark_color_variation(buffer: &mut ShapeBuffer) {
    if let Some(first) = buffer.colors.first().copied() {
        buffer.uses_vertex_colors = buffer.colors.iter().any(|c| *c != first);
    }
    if let Some(first) = buffer.stroke_colors.first().copied() {
        buffer.uses_stroke_colors = buffer.stroke_colors.iter().any(|c| *c != first);
    }
}

// ====================================================================
// Curve evaluation
// ====================================================================

fn cubic_point(p0: Vec3, c1: Vec3, c2: Vec3, p1: Vec3, t: f32) -> Vec3 {
    let u = 1.0 - t;
    p0 * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + p1 * (t * t * t)
}

fn quadratic_point(p0: Vec3, c: Vec3, p1: Vec3, t: f32) -> Vec3 {
    let u = 1.0 - t;
    p0 * (u * u) + c * (2.0 * u * t) + p1 * (t * t)
}

fn catmull_rom_point(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    ((p1 * 2.0)
        + (p2 - p0) * t
        + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * t2
        + (p1 * 3.0 - p0 - p2 * 3.0 + p3) * t3)
        * 0.5
}
