#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod blend;
pub mod color;
pub mod errors;
pub mod geometry;
pub mod gpu;
pub mod lights;
pub mod material;
pub mod renderer;
pub mod retained;
pub mod shader;
pub mod style;
pub mod texture;

pub use blend::{BlendMode, BlendSpec};
pub use color::{ColorInput, ColorParser, Rgb255Parser};
pub use errors::{AtelierError, Result};
pub use geometry::{BufferKind, BufferSummary, ShapeBuffer, ShapeBuilder, ShapeMode};
pub use gpu::{
    DrawCall, DrawPart, GpuBackend, MeshId, TextureId,
    wgpu_backend::{RendererConfig, WgpuBackend},
};
pub use lights::{DirectionalLight, LightState, MAX_LIGHTS, PointLight, SpotLight};
pub use material::{FillMode, MaterialFlags, MaterialState, StrokeMode};
pub use renderer::Renderer;
pub use retained::RetainedCache;
pub use shader::{BuiltinShader, Program, ProgramId, ShaderRegistry, UniformValue};
pub use style::{DrawSettings, StyleFrame, StyleStack, TextureMode};
pub use texture::{SourceKind, TextureCache, TextureSource};
