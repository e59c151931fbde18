//! Color argument resolution boundary.
//!
//! The original drawing vocabulary accepts colors as one, two, three or
//! four numbers, packed arrays, named strings, or color objects, all
//! interpreted under an ambient color mode. That variance is resolved
//! *once* at this boundary into a normalized RGBA `Vec4`; nothing past
//! this module ever sees the variant form.

use glam::Vec4;

/// A color argument before resolution.
///
/// Covers the overload set of the public drawing calls. `Gray(v)` is a
/// single component interpreted per the parser's color mode;
/// `Packed` is a caller-supplied `[f32; 4]` already in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub enum ColorInput {
    /// Single gray value.
    Gray(f32),
    /// Gray value plus alpha.
    GrayAlpha(f32, f32),
    /// Three components (RGB or HSB depending on the parser's mode).
    Triple(f32, f32, f32),
    /// Three components plus alpha.
    Quad(f32, f32, f32, f32),
    /// Pre-normalized RGBA array.
    Packed([f32; 4]),
    /// Named color, e.g. `"red"`.
    Named(String),
    /// An already-resolved color object.
    Resolved(Vec4),
}

/// External color-parsing collaborator.
///
/// The core never performs color-space conversion itself; it hands a
/// [`ColorInput`] to the parser and consumes the normalized result.
pub trait ColorParser {
    /// Resolve `input` to RGBA components in [0, 1].
    fn parse(&self, input: &ColorInput) -> Vec4;
}

/// Default parser: components in 0–255, RGB interpretation.
///
/// Stands in for the host's color module so the crate is usable and
/// testable on its own. Unknown names resolve to opaque black, matching
/// the permissive posture of the rest of the drawing surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rgb255Parser;

impl Rgb255Parser {
    const MAX: f32 = 255.0;

    fn named(name: &str) -> Vec4 {
        match name {
            "white" => Vec4::new(1.0, 1.0, 1.0, 1.0),
            "red" => Vec4::new(1.0, 0.0, 0.0, 1.0),
            "green" => Vec4::new(0.0, 1.0, 0.0, 1.0),
            "blue" => Vec4::new(0.0, 0.0, 1.0, 1.0),
            "yellow" => Vec4::new(1.0, 1.0, 0.0, 1.0),
            "magenta" => Vec4::new(1.0, 0.0, 1.0, 1.0),
            "cyan" => Vec4::new(0.0, 1.0, 1.0, 1.0),
            _ => Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl ColorParser for Rgb255Parser {
    fn parse(&self, input: &ColorInput) -> Vec4 {
        let clamp = |v: Vec4| v.clamp(Vec4::ZERO, Vec4::ONE);
        match input {
            ColorInput::Gray(v) => {
                let g = v / Self::MAX;
                clamp(Vec4::new(g, g, g, 1.0))
            }
            ColorInput::GrayAlpha(v, a) => {
                let g = v / Self::MAX;
                clamp(Vec4::new(g, g, g, a / Self::MAX))
            }
            ColorInput::Triple(r, g, b) => {
                clamp(Vec4::new(r / Self::MAX, g / Self::MAX, b / Self::MAX, 1.0))
            }
            ColorInput::Quad(r, g, b, a) => clamp(Vec4::new(
                r / Self::MAX,
                g / Self::MAX,
                b / Self::MAX,
                a / Self::MAX,
            )),
            ColorInput::Packed(c) => clamp(Vec4::from_array(*c)),
            ColorInput::Named(name) => Self::named(name),
            ColorInput::Resolved(c) => clamp(*c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_expands_to_rgb() {
        let c = Rgb255Parser.parse(&ColorInput::Gray(255.0));
        assert_eq!(c, Vec4::ONE);
    }

    #[test]
    fn quad_normalizes_alpha() {
        let c = Rgb255Parser.parse(&ColorInput::Quad(255.0, 0.0, 0.0, 122.0));
        assert!((c.w - 122.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn named_red() {
        let c = Rgb255Parser.parse(&ColorInput::Named("red".into()));
        assert_eq!(c, Vec4::new(1.0, 0.0, 0.0, 1.0));
    }
}
