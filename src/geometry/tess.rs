//! General-polygon triangulation.
//!
//! Contours are projected onto their best-fit plane, tessellated with
//! lyon's sweep-line fill tessellator (non-zero winding), and lifted
//! back to 3D. Vertex attributes ride through the tessellator as lyon
//! custom attributes: output vertices that coincide with an input
//! vertex keep that vertex's exact original attributes and position,
//! while synthesized vertices (edge intersections) receive the
//! attributes lyon interpolates from the crossing edges.

use glam::{Vec2, Vec3, Vec4};
use lyon::math::point;
use lyon::path::{EndpointId, Path};
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, FillVertexConstructor,
    VertexBuffers,
};

use crate::errors::{AtelierError, Result};

use super::{BufferKind, ShapeBuffer, ShapeVertex};

/// Interpolated attribute lanes: normal.xyz, uv.xy, fill.rgba,
/// stroke.rgba.
const ATTRIBUTE_LANES: usize = 13;

fn pack_attributes(v: &ShapeVertex) -> [f32; ATTRIBUTE_LANES] {
    [
        v.normal.x, v.normal.y, v.normal.z, v.uv.x, v.uv.y, v.fill.x, v.fill.y, v.fill.z, v.fill.w,
        v.stroke.x, v.stroke.y, v.stroke.z, v.stroke.w,
    ]
}

fn unpack_attributes(a: &[f32; ATTRIBUTE_LANES]) -> ShapeVertex {
    ShapeVertex {
        position: Vec3::ZERO,
        normal: Vec3::new(a[0], a[1], a[2]),
        uv: Vec2::new(a[3], a[4]),
        fill: Vec4::new(a[5], a[6], a[7], a[8]),
        stroke: Vec4::new(a[9], a[10], a[11], a[12]),
    }
}

/// Orthonormal frame of the polygon's plane, with the dominant normal
/// axis chosen so that axis-aligned input projects losslessly.
struct PlaneFrame {
    origin: Vec3,
    normal: Vec3,
    /// Indices of the two kept axes and the dropped one.
    keep: (usize, usize),
    drop: usize,
}

impl PlaneFrame {
    /// Fit a plane through the points. `None` when the input has fewer
    /// than three distinct points or is collinear.
    fn fit(points: impl Iterator<Item = Vec3> + Clone) -> Option<Self> {
        let origin = points.clone().next()?;
        let u = points
            .clone()
            .map(|p| p - origin)
            .find(|d| d.length_squared() > f32::EPSILON)?;
        let normal = points
            .clone()
            .map(|p| u.cross(p - origin))
            .find(|n| n.length_squared() > f32::EPSILON)?
            .normalize();

        let a = normal.to_array().map(f32::abs);
        let drop = if a[0] >= a[1] && a[0] >= a[2] {
            0
        } else if a[1] >= a[2] {
            1
        } else {
            2
        };
        let keep = match drop {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        Some(Self {
            origin,
            normal,
            keep,
            drop,
        })
    }

    fn project(&self, p: Vec3) -> Vec2 {
        let p = p.to_array();
        Vec2::new(p[self.keep.0], p[self.keep.1])
    }

    /// Lift a 2D point back onto the plane by solving the plane
    /// equation for the dropped coordinate.
    fn lift(&self, p: Vec2) -> Vec3 {
        let n = self.normal.to_array();
        let dropped = (self.normal.dot(self.origin) - n[self.keep.0] * p.x - n[self.keep.1] * p.y)
            / n[self.drop];
        let mut out = [0.0f32; 3];
        out[self.keep.0] = p.x;
        out[self.keep.1] = p.y;
        out[self.drop] = dropped;
        Vec3::from_array(out)
    }
}

/// Raw tessellator output: 2D position, the originating endpoint if
/// the vertex is one of the inputs, and the interpolated attribute
/// lanes otherwise.
struct RawVertex {
    position: Vec2,
    endpoint: Option<EndpointId>,
    attributes: [f32; ATTRIBUTE_LANES],
}

struct AttributeCapture;

impl FillVertexConstructor<RawVertex> for AttributeCapture {
    fn new_vertex(&mut self, mut vertex: FillVertex) -> RawVertex {
        let position = Vec2::new(vertex.position().x, vertex.position().y);
        let endpoint = vertex
            .as_endpoint_id()
            .filter(|id| *id != EndpointId::INVALID);
        let mut attributes = [0.0f32; ATTRIBUTE_LANES];
        if endpoint.is_none() {
            attributes.copy_from_slice(vertex.interpolated_attributes());
        }
        RawVertex {
            position,
            endpoint,
            attributes,
        }
    }
}

/// Tessellate the contours into a triangle-list buffer with outline
/// edges. Degenerate input produces an empty buffer.
pub(super) fn finalize_polygon(contours: &[Vec<ShapeVertex>], close: bool) -> Result<ShapeBuffer> {
    let mut buffer = ShapeBuffer::empty(BufferKind::Triangles);

    // Stroke geometry is the pre-tessellation outline.
    for contour in contours {
        let base = buffer.stroke_positions.len() as u32;
        for v in contour {
            buffer.push_stroke(v);
        }
        let n = contour.len() as u32;
        for i in 0..n.saturating_sub(1) {
            buffer.edges.push([base + i, base + i + 1]);
        }
        if close && n > 2 {
            buffer.edges.push([base + n - 1, base]);
        }
    }

    let all_points = contours.iter().flatten().map(|v| v.position);
    let Some(frame) = PlaneFrame::fit(all_points) else {
        // Fewer than three distinct points, or collinear: no fill and,
        // with nothing to outline meaningfully, no edges either.
        return Ok(ShapeBuffer::empty(BufferKind::Triangles));
    };

    // Flat list of the input vertices, indexed by lyon endpoint id.
    // Carrying the attributes on the path makes lyon track vertex
    // sources and interpolate at synthesized intersections.
    let mut endpoint_map: Vec<usize> = Vec::new();
    let mut flat: Vec<&ShapeVertex> = Vec::new();

    let mut builder = Path::builder_with_attributes(ATTRIBUTE_LANES);
    for contour in contours {
        if contour.len() < 2 {
            continue;
        }
        for (i, v) in contour.iter().enumerate() {
            let p = frame.project(v.position);
            let attrs = pack_attributes(v);
            let id = if i == 0 {
                builder.begin(point(p.x, p.y), &attrs)
            } else {
                builder.line_to(point(p.x, p.y), &attrs)
            };
            let slot = id.to_usize();
            if endpoint_map.len() <= slot {
                endpoint_map.resize(slot + 1, usize::MAX);
            }
            endpoint_map[slot] = flat.len();
            flat.push(v);
        }
        builder.end(true);
    }
    let path = builder.build();

    let mut raw: VertexBuffers<RawVertex, u32> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();
    tessellator
        .tessellate_path(
            &path,
            &FillOptions::default().with_fill_rule(FillRule::NonZero),
            &mut BuffersBuilder::new(&mut raw, AttributeCapture),
        )
        .map_err(|e| AtelierError::Tessellation(e.to_string()))?;

    // Resolve attributes, then de-index into a flat triangle list.
    // Input vertices are copied verbatim so their positions and
    // attributes stay bit-exact.
    let resolved: Vec<ShapeVertex> = raw
        .vertices
        .iter()
        .map(|rv| {
            let known = rv
                .endpoint
                .and_then(|id| endpoint_map.get(id.to_usize()))
                .and_then(|&slot| flat.get(slot));
            match known {
                Some(v) => **v,
                None => {
                    let mut v = unpack_attributes(&rv.attributes);
                    v.position = frame.lift(rv.position);
                    v
                }
            }
        })
        .collect();

    for &index in &raw.indices {
        buffer.push_fill(&resolved[index as usize]);
    }

    Ok(buffer)
}
