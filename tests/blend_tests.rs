//! Blend mode tests
//!
//! Tests for:
//! - Mode → wgpu blend equation mapping
//! - Opaque default draws skipping blending and keeping depth writes
//! - Exact pixel outcomes of ADD and REPLACE, evaluated by applying the
//!   produced blend equations on the CPU (premultiplied readback, as a
//!   canvas would report)
//! - Determinism across repeated evaluation

use glam::{Vec3, Vec4};

use atelier::blend::{BlendMode, blend_state, pipeline_state};

// ============================================================================
// CPU evaluation of a wgpu blend equation
// ============================================================================

fn color_factor(f: wgpu::BlendFactor, src: Vec4, dst: Vec4) -> Vec3 {
    match f {
        wgpu::BlendFactor::One => Vec3::ONE,
        wgpu::BlendFactor::Zero => Vec3::ZERO,
        wgpu::BlendFactor::SrcAlpha => Vec3::splat(src.w),
        wgpu::BlendFactor::OneMinusSrcAlpha => Vec3::splat(1.0 - src.w),
        wgpu::BlendFactor::Dst => dst.truncate(),
        wgpu::BlendFactor::OneMinusDst => Vec3::ONE - dst.truncate(),
        wgpu::BlendFactor::OneMinusSrc => Vec3::ONE - src.truncate(),
        other => panic!("factor {other:?} not used by any blend mode"),
    }
}

fn alpha_factor(f: wgpu::BlendFactor, src: Vec4, dst: Vec4) -> f32 {
    match f {
        wgpu::BlendFactor::One => 1.0,
        wgpu::BlendFactor::Zero => 0.0,
        wgpu::BlendFactor::SrcAlpha => src.w,
        wgpu::BlendFactor::OneMinusSrcAlpha => 1.0 - src.w,
        wgpu::BlendFactor::Dst => dst.w,
        wgpu::BlendFactor::OneMinusDst => 1.0 - dst.w,
        wgpu::BlendFactor::OneMinusSrc => 1.0 - src.w,
        other => panic!("factor {other:?} not used by any blend mode"),
    }
}

fn operate(op: wgpu::BlendOperation, s: Vec3, d: Vec3) -> Vec3 {
    match op {
        wgpu::BlendOperation::Add => s + d,
        wgpu::BlendOperation::Subtract => s - d,
        wgpu::BlendOperation::ReverseSubtract => d - s,
        wgpu::BlendOperation::Min => s.min(d),
        wgpu::BlendOperation::Max => s.max(d),
    }
}

/// Apply one blended draw of `src` over `dst`, both straight-alpha.
fn blend_over(state: wgpu::BlendState, src: Vec4, dst: Vec4) -> Vec4 {
    let c = operate(
        state.color.operation,
        src.truncate() * color_factor(state.color.src_factor, src, dst),
        dst.truncate() * color_factor(state.color.dst_factor, src, dst),
    )
    .clamp(Vec3::ZERO, Vec3::ONE);
    let sa = src.w * alpha_factor(state.alpha.src_factor, src, dst);
    let da = dst.w * alpha_factor(state.alpha.dst_factor, src, dst);
    let a = match state.alpha.operation {
        wgpu::BlendOperation::Add => sa + da,
        wgpu::BlendOperation::Subtract => sa - da,
        wgpu::BlendOperation::ReverseSubtract => da - sa,
        wgpu::BlendOperation::Min => sa.min(da),
        wgpu::BlendOperation::Max => sa.max(da),
    }
    .clamp(0.0, 1.0);
    c.extend(a)
}

/// Quantize as a premultiplied RGBA8 readback.
fn readback(c: Vec4) -> [u8; 4] {
    [
        (c.x * c.w * 255.0).round() as u8,
        (c.y * c.w * 255.0).round() as u8,
        (c.z * c.w * 255.0).round() as u8,
        (c.w * 255.0).round() as u8,
    ]
}

const HALF_RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 122.0 / 255.0);
const HALF_BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 122.0 / 255.0);

// ============================================================================
// Exact pixel outcomes
// ============================================================================

#[test]
fn add_over_black_yields_122_0_122_255() {
    let state = pipeline_state(BlendMode::Add, true).blend.unwrap();
    let black = Vec4::new(0.0, 0.0, 0.0, 1.0);
    let after_red = blend_over(state, HALF_RED, black);
    let after_blue = blend_over(state, HALF_BLUE, after_red);
    assert_eq!(readback(after_blue), [122, 0, 122, 255]);
}

#[test]
fn replace_over_white_yields_0_0_122_122() {
    let state = pipeline_state(BlendMode::Replace, true).blend.unwrap();
    let white = Vec4::ONE;
    let after_red = blend_over(state, HALF_RED, white);
    let after_blue = blend_over(state, HALF_BLUE, after_red);
    assert_eq!(readback(after_blue), [0, 0, 122, 122]);
}

#[test]
fn blend_outcomes_are_deterministic() {
    let state = pipeline_state(BlendMode::Add, true).blend.unwrap();
    let black = Vec4::new(0.0, 0.0, 0.0, 1.0);
    let mut results = Vec::new();
    for _ in 0..50 {
        let out = blend_over(state, HALF_BLUE, blend_over(state, HALF_RED, black));
        results.push(readback(out));
    }
    assert!(results.iter().all(|r| *r == results[0]));
}

#[test]
fn lightest_takes_per_channel_maximum() {
    let state = blend_state(BlendMode::Lightest);
    let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
    let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);
    let out = blend_over(state, red, blue);
    assert_eq!(out.truncate(), Vec3::new(1.0, 0.0, 1.0));
}

#[test]
fn darkest_takes_per_channel_minimum() {
    let state = blend_state(BlendMode::Darkest);
    let gray = Vec4::new(0.5, 0.5, 0.5, 1.0);
    let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);
    let out = blend_over(state, gray, blue);
    assert_eq!(out.truncate(), Vec3::new(0.0, 0.0, 0.5));
}

// ============================================================================
// Pipeline flag policy
// ============================================================================

#[test]
fn opaque_default_mode_skips_blending() {
    let spec = pipeline_state(BlendMode::Blend, false);
    assert!(spec.blend.is_none());
    assert!(spec.depth_write);
}

#[test]
fn translucent_default_mode_blends_without_depth_write() {
    let spec = pipeline_state(BlendMode::Blend, true);
    assert!(spec.blend.is_some());
    assert!(!spec.depth_write);
}

#[test]
fn non_default_mode_blends_even_when_opaque() {
    let spec = pipeline_state(BlendMode::Add, false);
    assert_eq!(spec.blend, Some(blend_state(BlendMode::Add)));
    assert!(spec.depth_write);
}
