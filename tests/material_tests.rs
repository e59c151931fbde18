//! Material state tests
//!
//! Tests for:
//! - Setter orthogonality: material colors and texture never clobber
//!   each other, in either call order
//! - Fill-mode transitions (flat / textured / normal-material / none)
//! - Ambient fallback to the fill color
//! - Translucency and the derived pipeline blend state

mod common;

use std::sync::Arc;

use glam::{Vec3, Vec4};

use atelier::material::{FillMode, MaterialFlags, MaterialState, StrokeMode};

use common::FakeSource;

// ============================================================================
// Setter order independence
// ============================================================================

#[test]
fn texture_then_ambient_equals_ambient_then_texture() {
    let source = Arc::new(FakeSource::image(2, 2));
    let ambient = Vec4::new(0.2, 0.4, 0.6, 1.0);

    let mut a = MaterialState::new();
    a.set_texture(source.clone());
    a.set_ambient(ambient);

    let mut b = MaterialState::new();
    b.set_ambient(ambient);
    b.set_texture(source);

    assert_eq!(a, b);
}

#[test]
fn specular_does_not_drop_texture() {
    let mut m = MaterialState::new();
    m.set_texture(Arc::new(FakeSource::image(2, 2)));
    m.set_specular(Vec4::ONE);
    assert!(m.texture().is_some());
    assert_eq!(m.fill_mode(), FillMode::Textured);
    assert!(m.flags().contains(MaterialFlags::USE_SPECULAR));
}

#[test]
fn emissive_does_not_drop_texture() {
    let mut m = MaterialState::new();
    m.set_texture(Arc::new(FakeSource::image(2, 2)));
    m.set_emissive(Vec4::new(0.1, 0.2, 0.3, 1.0));
    assert!(m.texture().is_some());
    assert!(m.flags().contains(MaterialFlags::USE_EMISSIVE));
}

// ============================================================================
// Fill-mode transitions
// ============================================================================

#[test]
fn fill_clears_texture_and_ambient_flag() {
    let mut m = MaterialState::new();
    m.set_texture(Arc::new(FakeSource::image(2, 2)));
    m.set_ambient(Vec4::ONE);

    m.set_fill(Vec4::new(1.0, 0.0, 0.0, 1.0));
    assert_eq!(m.fill_mode(), FillMode::Flat);
    assert!(m.texture().is_none());
    assert!(!m.flags().contains(MaterialFlags::HAS_SET_AMBIENT));
}

#[test]
fn normal_material_keeps_texture_reference() {
    let mut m = MaterialState::new();
    m.set_texture(Arc::new(FakeSource::image(2, 2)));
    m.set_normal_material();
    assert_eq!(m.fill_mode(), FillMode::NormalMaterial);
    assert!(m.texture().is_some());
}

#[test]
fn ambient_after_normal_material_returns_to_textured() {
    let mut m = MaterialState::new();
    m.set_texture(Arc::new(FakeSource::image(2, 2)));
    m.set_normal_material();
    m.set_ambient(Vec4::ONE);
    assert_eq!(m.fill_mode(), FillMode::Textured);
}

#[test]
fn no_fill_and_no_stroke_disable_their_modes() {
    let mut m = MaterialState::new();
    m.no_fill();
    m.no_stroke();
    assert_eq!(m.fill_mode(), FillMode::None);
    assert_eq!(m.stroke_mode(), StrokeMode::None);
}

// ============================================================================
// Derived values
// ============================================================================

#[test]
fn ambient_falls_back_to_fill_until_set() {
    let mut m = MaterialState::new();
    m.set_fill(Vec4::new(0.3, 0.5, 0.7, 1.0));
    assert_eq!(m.ambient_color(), Vec4::new(0.3, 0.5, 0.7, 1.0));

    m.set_ambient(Vec4::new(1.0, 1.0, 0.0, 1.0));
    assert_eq!(m.ambient_color(), Vec4::new(1.0, 1.0, 0.0, 1.0));
}

#[test]
fn opaque_flat_fill_is_not_translucent() {
    let mut m = MaterialState::new();
    m.set_fill(Vec4::new(1.0, 1.0, 1.0, 1.0));
    assert!(!m.translucent());
    let spec = m.blend_spec();
    assert!(spec.blend.is_none());
    assert!(spec.depth_write);
}

#[test]
fn low_alpha_fill_is_translucent_and_disables_depth_write() {
    let mut m = MaterialState::new();
    m.set_fill(Vec4::new(1.0, 1.0, 1.0, 0.5));
    assert!(m.translucent());
    let spec = m.blend_spec();
    assert!(spec.blend.is_some());
    assert!(!spec.depth_write);
}

#[test]
fn textured_fill_is_translucent() {
    let mut m = MaterialState::new();
    m.set_texture(Arc::new(FakeSource::image(2, 2)));
    assert!(m.translucent());
}

#[test]
fn current_normal_defaults_to_plus_z() {
    let m = MaterialState::new();
    assert_eq!(m.current_normal(), Vec3::Z);
}
