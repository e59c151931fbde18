//! Blend-mode to pipeline-state mapping.
//!
//! Pure data: a symbolic [`BlendMode`] maps to a [`BlendSpec`], the
//! `wgpu::BlendState` to attach to the color target plus the depth-write
//! flag. No GPU calls are made here; the wgpu backend consumes the spec
//! when it assembles a pipeline.

/// Symbolic blend modes of the drawing vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Source-over compositing. The default.
    #[default]
    Blend,
    /// Additive.
    Add,
    /// Overwrite the destination.
    Replace,
    /// Multiply source and destination.
    Multiply,
    /// Screen.
    Screen,
    /// Exclusion.
    Exclusion,
    /// Per-channel maximum.
    Lightest,
    /// Per-channel minimum.
    Darkest,
    /// Destination minus source.
    Subtract,
    /// Erase destination by source alpha.
    Remove,
}

/// Resolved pipeline flags for one draw: blending (if any) and whether
/// depth writes stay enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendSpec {
    /// Color/alpha blend state, `None` for opaque overwrite.
    pub blend: Option<wgpu::BlendState>,
    /// Whether the draw writes the depth buffer.
    pub depth_write: bool,
}

fn component(
    src_factor: wgpu::BlendFactor,
    dst_factor: wgpu::BlendFactor,
    operation: wgpu::BlendOperation,
) -> wgpu::BlendComponent {
    wgpu::BlendComponent {
        src_factor,
        dst_factor,
        operation,
    }
}

/// The raw blend equation for `mode`, independent of translucency.
#[must_use]
pub fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    use wgpu::BlendFactor::{
        Dst, One, OneMinusDst, OneMinusSrc, OneMinusSrcAlpha, SrcAlpha, Zero,
    };
    use wgpu::BlendOperation::{Add, Max, Min, ReverseSubtract};

    match mode {
        BlendMode::Blend => wgpu::BlendState {
            color: component(SrcAlpha, OneMinusSrcAlpha, Add),
            alpha: component(One, OneMinusSrcAlpha, Add),
        },
        BlendMode::Add => wgpu::BlendState {
            color: component(SrcAlpha, One, Add),
            alpha: component(SrcAlpha, One, Add),
        },
        BlendMode::Replace => wgpu::BlendState {
            color: component(One, Zero, Add),
            alpha: component(One, Zero, Add),
        },
        BlendMode::Multiply => wgpu::BlendState {
            color: component(Dst, OneMinusSrcAlpha, Add),
            alpha: component(Dst, OneMinusSrcAlpha, Add),
        },
        BlendMode::Screen => wgpu::BlendState {
            color: component(One, OneMinusSrc, Add),
            alpha: component(One, OneMinusSrc, Add),
        },
        BlendMode::Exclusion => wgpu::BlendState {
            color: component(OneMinusDst, OneMinusSrc, Add),
            alpha: component(One, One, Add),
        },
        // WebGPU requires ONE/ONE factors with min/max operations.
        BlendMode::Lightest => wgpu::BlendState {
            color: component(One, One, Max),
            alpha: component(One, One, Add),
        },
        BlendMode::Darkest => wgpu::BlendState {
            color: component(One, One, Min),
            alpha: component(One, One, Add),
        },
        BlendMode::Subtract => wgpu::BlendState {
            color: component(One, One, ReverseSubtract),
            alpha: component(One, One, Add),
        },
        BlendMode::Remove => wgpu::BlendState {
            color: component(Zero, OneMinusSrcAlpha, Add),
            alpha: component(Zero, OneMinusSrcAlpha, Add),
        },
    }
}

/// Resolve the pipeline flags for a draw.
///
/// `translucent` is true when the fill samples a texture or the resolved
/// fill alpha is below 1. A translucent draw blends and leaves the depth
/// buffer untouched, so later draws in the same pass are not occluded by
/// it; an opaque default-mode draw skips blending entirely and writes
/// depth. Non-default modes always blend.
#[must_use]
pub fn pipeline_state(mode: BlendMode, translucent: bool) -> BlendSpec {
    if mode == BlendMode::Blend && !translucent {
        BlendSpec {
            blend: None,
            depth_write: true,
        }
    } else {
        BlendSpec {
            blend: Some(blend_state(mode)),
            depth_write: !translucent,
        }
    }
}
