//! Polygon tessellation tests
//!
//! Tests for:
//! - Self-intersecting polygons splitting at synthesized vertices
//! - Plain convex and curve-built polygons filling cleanly
//! - Exact attribute pass-through for original vertices
//! - Attribute blending at edge intersections
//! - Degenerate input producing empty buffers
//! - Holes via inner contours
//! - Outline geometry staying pre-tessellation

use glam::{Vec2, Vec3, Vec4};

use atelier::geometry::{BufferKind, ShapeBuffer, ShapeBuilder, ShapeMode};
use atelier::material::MaterialState;
use atelier::style::DrawSettings;

const EPSILON: f32 = 1e-4;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn vec4_approx(a: Vec4, b: Vec4) -> bool {
    (a - b).abs().max_element() < EPSILON
}

/// Bow-tie quad: the 0-1 and 2-3 edges cross at the origin.
const HOURGLASS: [(Vec3, Vec4, Vec2); 4] = [
    (
        Vec3::new(-10.0, -10.0, 0.0),
        Vec4::new(1.0, 1.0, 1.0, 1.0),
        Vec2::new(0.0, 0.0),
    ),
    (
        Vec3::new(10.0, 10.0, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 1.0),
        Vec2::new(1.0, 1.0),
    ),
    (
        Vec3::new(10.0, -10.0, 0.0),
        Vec4::new(1.0, 0.0, 0.0, 1.0),
        Vec2::new(1.0, 0.0),
    ),
    (
        Vec3::new(-10.0, 10.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ),
];

fn hourglass_buffer() -> ShapeBuffer {
    let mut material = MaterialState::new();
    let mut builder = ShapeBuilder::new();
    builder.begin_shape(ShapeMode::Tess).unwrap();
    for (position, fill, uv) in HOURGLASS {
        material.set_fill(fill);
        builder.vertex(&material, position, Some(uv)).unwrap();
    }
    builder.end_shape(true).unwrap()
}

// ============================================================================
// Self-intersection
// ============================================================================

#[test]
fn hourglass_splits_into_two_triangles() {
    let buffer = hourglass_buffer();
    assert_eq!(buffer.kind, BufferKind::Triangles);
    // Two triangles meeting at the synthesized crossing point.
    assert_eq!(buffer.fill_len(), 6);
}

#[test]
fn original_vertices_keep_their_exact_attributes() {
    let buffer = hourglass_buffer();
    for (position, fill, uv) in HOURGLASS {
        let hits: Vec<usize> = (0..buffer.fill_len())
            .filter(|&i| buffer.positions[i] == position)
            .collect();
        assert!(!hits.is_empty(), "input vertex {position} missing from output");
        for i in hits {
            // Bit-exact copies, not reconstructions.
            assert_eq!(buffer.colors[i], fill);
            assert_eq!(buffer.uvs[i], uv);
        }
    }
}

#[test]
fn crossing_point_blends_both_edges() {
    let buffer = hourglass_buffer();
    let synthesized: Vec<usize> = (0..buffer.fill_len())
        .filter(|&i| {
            HOURGLASS
                .iter()
                .all(|(position, _, _)| buffer.positions[i] != *position)
        })
        .collect();
    // The crossing appears once per triangle.
    assert_eq!(synthesized.len(), 2);
    for i in synthesized {
        assert!(vec3_approx(buffer.positions[i], Vec3::ZERO));
        assert!(vec4_approx(buffer.colors[i], Vec4::new(0.5, 0.5, 0.5, 1.0)));
        assert!((buffer.uvs[i] - Vec2::new(0.5, 0.5)).abs().max_element() < EPSILON);
    }
}

#[test]
fn hourglass_outline_is_the_input_polygon() {
    let buffer = hourglass_buffer();
    assert_eq!(buffer.stroke_positions.len(), 4);
    for (i, (position, _, _)) in HOURGLASS.iter().enumerate() {
        assert_eq!(buffer.stroke_positions[i], *position);
    }
    // Closed: consecutive edges plus the wrap-around.
    assert_eq!(buffer.edges, vec![[0, 1], [1, 2], [2, 3], [3, 0]]);
    assert!(buffer.uses_vertex_colors);
}

#[test]
fn stroke_colors_come_from_the_input_vertices() {
    let buffer = hourglass_buffer();
    // Stroke defaults are uniform here, so the flag stays off even
    // though fill varies.
    assert_eq!(buffer.stroke_colors.len(), 4);
    assert!(!buffer.uses_stroke_colors);
}

// ============================================================================
// Plain polygons
// ============================================================================

#[test]
fn convex_pentagon_fills_with_its_own_vertices() {
    let pentagon: Vec<Vec3> = (0..5)
        .map(|i| {
            let angle = std::f32::consts::TAU * i as f32 / 5.0;
            Vec3::new(angle.cos() * 10.0, angle.sin() * 10.0, 0.0)
        })
        .collect();
    let buffer = tess_of(&pentagon, true);
    // Three triangles, every corner one of the inputs.
    assert_eq!(buffer.fill_len(), 9);
    for p in &buffer.positions {
        assert!(pentagon.iter().any(|s| vec3_approx(*p, *s)));
    }
    assert_eq!(buffer.edges.len(), 5);
}

#[test]
fn curved_outline_tessellates_into_triangles() {
    let material = MaterialState::new();
    let settings = DrawSettings::default();
    let mut builder = ShapeBuilder::new();
    builder.begin_shape(ShapeMode::Tess).unwrap();
    // Catmull-Rom ring: eight points around a circle, the first three
    // repeated to close the loop.
    let ring: Vec<Vec3> = (0..8)
        .map(|i| {
            let angle = std::f32::consts::TAU * i as f32 / 8.0;
            Vec3::new(angle.cos() * 10.0, angle.sin() * 10.0, 0.0)
        })
        .collect();
    for &p in ring.iter().chain(ring.iter().take(3)) {
        builder.curve_vertex(&material, &settings, p).unwrap();
    }
    let buffer = builder.end_shape(true).unwrap();

    assert!(buffer.fill_len() >= 3);
    assert_eq!(buffer.fill_len() % 3, 0);
    assert!(buffer.stroke_positions.len() > ring.len());
    assert_eq!(buffer.edges.len(), buffer.stroke_positions.len());
}

// ============================================================================
// Degenerate input
// ============================================================================

fn tess_of(points: &[Vec3], close: bool) -> ShapeBuffer {
    let material = MaterialState::new();
    let mut builder = ShapeBuilder::new();
    builder.begin_shape(ShapeMode::Tess).unwrap();
    for &p in points {
        builder.vertex(&material, p, None).unwrap();
    }
    builder.end_shape(close).unwrap()
}

#[test]
fn two_vertices_produce_nothing() {
    let buffer = tess_of(&[Vec3::ZERO, Vec3::X], true);
    assert!(buffer.is_empty());
}

#[test]
fn collinear_vertices_produce_nothing() {
    let buffer = tess_of(
        &[
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(2.0, 4.0, 6.0),
            Vec3::new(3.0, 6.0, 9.0),
        ],
        true,
    );
    assert!(buffer.is_empty());
    assert!(buffer.edges.is_empty());
}

#[test]
fn coincident_vertices_produce_nothing() {
    let p = Vec3::new(4.0, -2.0, 1.0);
    let buffer = tess_of(&[p, p, p], true);
    assert!(buffer.is_empty());
}

// ============================================================================
// Planes off the z axis
// ============================================================================

#[test]
fn vertical_plane_polygons_keep_their_coordinates() {
    // Square in the x = 3 plane.
    let square = [
        Vec3::new(3.0, 0.0, 0.0),
        Vec3::new(3.0, 2.0, 0.0),
        Vec3::new(3.0, 2.0, 2.0),
        Vec3::new(3.0, 0.0, 2.0),
    ];
    let buffer = tess_of(&square, true);
    assert_eq!(buffer.fill_len(), 6);
    for p in &buffer.positions {
        assert!((p.x - 3.0).abs() < EPSILON);
        assert!(square.iter().any(|s| vec3_approx(*p, *s)));
    }
}

// ============================================================================
// Inner contours
// ============================================================================

#[test]
fn opposite_winding_contour_cuts_a_hole() {
    let material = MaterialState::new();
    let mut builder = ShapeBuilder::new();
    builder.begin_shape(ShapeMode::Tess).unwrap();
    // Outer square, counter-clockwise.
    for p in [
        Vec3::new(-5.0, -5.0, 0.0),
        Vec3::new(5.0, -5.0, 0.0),
        Vec3::new(5.0, 5.0, 0.0),
        Vec3::new(-5.0, 5.0, 0.0),
    ] {
        builder.vertex(&material, p, None).unwrap();
    }
    // Inner square, clockwise, so non-zero winding cancels inside it.
    builder.begin_contour().unwrap();
    for p in [
        Vec3::new(-2.0, -2.0, 0.0),
        Vec3::new(-2.0, 2.0, 0.0),
        Vec3::new(2.0, 2.0, 0.0),
        Vec3::new(2.0, -2.0, 0.0),
    ] {
        builder.vertex(&material, p, None).unwrap();
    }
    builder.end_contour().unwrap();
    let buffer = builder.end_shape(true).unwrap();

    assert!(buffer.fill_len() >= 18);
    assert_eq!(buffer.fill_len() % 3, 0);
    // No triangle sits inside the hole.
    for tri in buffer.positions.chunks_exact(3) {
        let centroid = (tri[0] + tri[1] + tri[2]) / 3.0;
        let inside = centroid.x.abs() < 2.0 - EPSILON && centroid.y.abs() < 2.0 - EPSILON;
        assert!(!inside, "triangle centroid {centroid} inside the hole");
    }
    // Both outlines survive, each closed.
    assert_eq!(buffer.stroke_positions.len(), 8);
    assert_eq!(buffer.edges.len(), 8);
}
