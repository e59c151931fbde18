//! The drawing context.
//!
//! [`Renderer`] owns every per-context subsystem (material state, style
//! stack, shape builder, shader registry, texture cache, retained
//! meshes) and drives a [`GpuBackend`] with fully-resolved draw calls.
//! All calls are synchronous and run to completion; there is one
//! renderer per canvas and no cross-context sharing.

use std::sync::Arc;

use glam::{Mat3, Mat4, UVec4, Vec2, Vec3, Vec4};

use crate::blend::BlendMode;
use crate::color::{ColorInput, ColorParser, Rgb255Parser};
use crate::errors::{AtelierError, Result};
use crate::geometry::{BufferKind, BufferSummary, ShapeBuffer, ShapeBuilder, ShapeMode};
use crate::gpu::{DrawCall, DrawPart, GpuBackend, MeshId, TextureId};
use crate::lights::{DirectionalLight, LightState, MAX_LIGHTS, PointLight, SpotLight};
use crate::material::{FillMode, MaterialState, MaterialFlags, StrokeMode};
use crate::retained::RetainedCache;
use crate::shader::{BuiltinShader, ProgramId, ShaderRegistry, UniformValue};
use crate::style::{DrawSettings, StyleFrame, StyleStack, TextureMode};
use crate::texture::{TextureCache, TextureSource};

pub struct Renderer<B: GpuBackend> {
    backend: B,

    material: MaterialState,
    settings: DrawSettings,
    model_view: Mat4,
    projection: Mat4,

    stack: StyleStack,
    builder: ShapeBuilder,
    shaders: ShaderRegistry,
    textures: TextureCache,
    retained: RetainedCache,
    colors: Rgb255Parser,

    /// Meshes uploaded for the current frame's immediate shapes,
    /// freed when the frame ends.
    immediate: Vec<MeshId>,
}

impl<B: GpuBackend> Renderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            material: MaterialState::new(),
            settings: DrawSettings::default(),
            model_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            stack: StyleStack::new(),
            builder: ShapeBuilder::new(),
            shaders: ShaderRegistry::new(),
            textures: TextureCache::new(),
            retained: RetainedCache::new(),
            colors: Rgb255Parser,
            immediate: Vec::new(),
        }
    }

    // ====================================================================
    // Frame lifecycle
    // ====================================================================

    /// Start a frame: the style stack returns to base state, lights
    /// reset, the model-view matrix becomes identity, and any shape
    /// left half-built by a missed `end_shape` is dropped.
    pub fn begin_frame(&mut self) {
        self.stack.reset();
        self.material.lights.clear();
        self.model_view = Mat4::IDENTITY;
        self.builder.reset();
    }

    /// End a frame and release the immediate-mode meshes it uploaded.
    pub fn end_frame(&mut self) {
        for id in self.immediate.drain(..) {
            self.backend.free_mesh(id);
        }
    }

    // ====================================================================
    // Style scoping
    // ====================================================================

    /// Snapshot material, transform and settings onto the style stack.
    pub fn push(&mut self) {
        self.stack.push(StyleFrame {
            material: self.material.clone(),
            model_view: self.model_view,
            settings: self.settings,
        });
    }

    /// Restore the most recent snapshot. Fails fast on an unmatched
    /// pop, leaving the current state untouched.
    pub fn pop(&mut self) -> Result<()> {
        let frame = self.stack.pop()?;
        self.material = frame.material;
        self.model_view = frame.model_view;
        self.settings = frame.settings;
        Ok(())
    }

    // ====================================================================
    // Color and material
    // ====================================================================

    pub fn fill(&mut self, input: &ColorInput) {
        let color = self.colors.parse(input);
        self.material.set_fill(color);
    }

    pub fn no_fill(&mut self) {
        self.material.no_fill();
    }

    pub fn stroke(&mut self, input: &ColorInput) {
        let color = self.colors.parse(input);
        self.material.set_stroke(color);
    }

    pub fn no_stroke(&mut self) {
        self.material.no_stroke();
    }

    pub fn stroke_weight(&mut self, weight: f32) {
        self.material.set_stroke_weight(weight);
    }

    pub fn texture(&mut self, source: Arc<dyn TextureSource>) {
        self.material.set_texture(source);
    }

    pub fn normal_material(&mut self) {
        self.material.set_normal_material();
    }

    pub fn ambient_material(&mut self, input: &ColorInput) {
        let color = self.colors.parse(input);
        self.material.set_ambient(color);
    }

    pub fn specular_material(&mut self, input: &ColorInput) {
        let color = self.colors.parse(input);
        self.material.set_specular(color);
    }

    pub fn emissive_material(&mut self, input: &ColorInput) {
        let color = self.colors.parse(input);
        self.material.set_emissive(color);
    }

    pub fn shininess(&mut self, value: f32) {
        self.material.set_shininess(value);
    }

    pub fn blend_mode(&mut self, mode: BlendMode) {
        self.material.set_blend_mode(mode);
    }

    // ====================================================================
    // Lights
    // ====================================================================

    pub fn ambient_light(&mut self, color: Vec3) {
        self.material.lights.add_ambient(color);
    }

    pub fn directional_light(&mut self, light: DirectionalLight) {
        self.material.lights.add_directional(light);
    }

    pub fn point_light(&mut self, light: PointLight) {
        self.material.lights.add_point(light);
    }

    pub fn spot_light(&mut self, light: SpotLight) {
        self.material.lights.add_spot(light);
    }

    pub fn no_lights(&mut self) {
        self.material.lights.clear();
    }

    // ====================================================================
    // Shaders
    // ====================================================================

    /// Compile and register a user program for later selection.
    pub fn register_shader(
        &mut self,
        label: &str,
        source: &str,
        stroke_capable: bool,
    ) -> Result<ProgramId> {
        self.shaders.register(label, source, stroke_capable)
    }

    /// Route draws through a user program. Stroke-capable programs
    /// land in the stroke slot, everything else in the fill slot; the
    /// two slots stay independent.
    pub fn shader(&mut self, id: ProgramId) {
        if self.shaders.program(id).stroke_capable() {
            self.material.set_stroke_program(Some(id));
        } else {
            self.material.set_fill_program(Some(id));
        }
    }

    /// Return both slots to the built-in selection.
    pub fn reset_shader(&mut self) {
        self.material.set_fill_program(None);
        self.material.set_stroke_program(None);
    }

    /// Stage a uniform on the active user program, fill slot first.
    pub fn set_uniform(&mut self, name: &str, value: &UniformValue) -> Result<()> {
        let Some(id) = self
            .material
            .fill_program()
            .or_else(|| self.material.stroke_program())
        else {
            return Err(AtelierError::InvalidState(
                "set_uniform without an active user shader",
            ));
        };
        self.shaders.set_uniform(id, name, value)
    }

    // ====================================================================
    // Transforms and projection
    // ====================================================================

    pub fn translate(&mut self, offset: Vec3) {
        self.model_view *= Mat4::from_translation(offset);
    }

    pub fn rotate(&mut self, angle: f32, axis: Vec3) {
        self.model_view *= Mat4::from_axis_angle(axis, angle);
    }

    pub fn scale(&mut self, factor: Vec3) {
        self.model_view *= Mat4::from_scale(factor);
    }

    pub fn apply_matrix(&mut self, matrix: Mat4) {
        self.model_view *= matrix;
    }

    pub fn reset_matrix(&mut self) {
        self.model_view = Mat4::IDENTITY;
    }

    pub fn perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Mat4::perspective_rh(fov_y, aspect, near, far);
    }

    #[allow(clippy::many_single_char_names)]
    pub fn ortho(&mut self, l: f32, r: f32, b: f32, t: f32, near: f32, far: f32) {
        self.projection = Mat4::orthographic_rh(l, r, b, t, near, far);
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    // ====================================================================
    // Drawing-mode settings
    // ====================================================================

    pub fn texture_mode(&mut self, mode: TextureMode) {
        self.settings.texture_mode = mode;
    }

    pub fn curve_detail(&mut self, detail: u32) {
        self.settings.curve_detail = detail.max(1);
    }

    pub fn bezier_detail(&mut self, detail: u32) {
        self.settings.bezier_detail = detail.max(1);
    }

    // ====================================================================
    // Shapes
    // ====================================================================

    pub fn begin_shape(&mut self, mode: ShapeMode) -> Result<()> {
        self.builder.begin_shape(mode)
    }

    pub fn vertex(&mut self, position: Vec3) -> Result<()> {
        self.builder.vertex(&self.material, position, None)
    }

    /// Vertex with explicit texture coordinates, interpreted per the
    /// current texture mode.
    pub fn vertex_uv(&mut self, position: Vec3, uv: Vec2) -> Result<()> {
        let uv = self.resolve_uv(uv);
        self.builder.vertex(&self.material, position, Some(uv))
    }

    /// Set the normal applied to subsequent vertices.
    pub fn normal(&mut self, normal: Vec3) {
        self.material.set_current_normal(normal);
    }

    pub fn curve_vertex(&mut self, position: Vec3) -> Result<()> {
        self.builder
            .curve_vertex(&self.material, &self.settings, position)
    }

    pub fn bezier_vertex(&mut self, c1: Vec3, c2: Vec3, anchor: Vec3) -> Result<()> {
        self.builder
            .bezier_vertex(&self.material, &self.settings, c1, c2, anchor)
    }

    pub fn quadratic_vertex(&mut self, ctrl: Vec3, anchor: Vec3) -> Result<()> {
        self.builder
            .quadratic_vertex(&self.material, &self.settings, ctrl, anchor)
    }

    pub fn begin_contour(&mut self) -> Result<()> {
        self.builder.begin_contour()
    }

    pub fn end_contour(&mut self) -> Result<()> {
        self.builder.end_contour()
    }

    /// Finalize the shape, upload it, and submit its draws.
    pub fn end_shape(&mut self, close: bool) -> Result<()> {
        let buffer = self.builder.end_shape(close)?;
        if buffer.is_empty() {
            return Ok(());
        }
        let summary = buffer.summary();
        let mesh = self.backend.upload_mesh(&buffer);
        self.immediate.push(mesh);
        self.submit(mesh, summary)
    }

    /// Draw a retained named primitive, building and uploading it on
    /// first use.
    pub fn draw_retained<F>(&mut self, key: &str, build: F) -> Result<()>
    where
        F: FnOnce() -> Result<ShapeBuffer>,
    {
        let (mesh, summary) = self.retained.get_or_build(&mut self.backend, key, build)?;
        self.submit(mesh, summary)
    }

    // ====================================================================
    // Queries
    // ====================================================================

    #[must_use]
    pub fn material(&self) -> &MaterialState {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut MaterialState {
        &mut self.material
    }

    #[must_use]
    pub fn settings(&self) -> &DrawSettings {
        &self.settings
    }

    #[must_use]
    pub fn model_view(&self) -> Mat4 {
        self.model_view
    }

    #[must_use]
    pub fn style_depth(&self) -> usize {
        self.stack.depth()
    }

    #[must_use]
    pub fn shaders(&self) -> &ShaderRegistry {
        &self.shaders
    }

    #[must_use]
    pub fn texture_cache(&self) -> &TextureCache {
        &self.textures
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    // ====================================================================
    // Draw submission
    // ====================================================================

    fn submit(&mut self, mesh: MeshId, summary: BufferSummary) -> Result<()> {
        if summary.has_fill && self.material.fill_mode() != FillMode::None {
            self.submit_fill(mesh, summary)?;
        }
        if summary.has_stroke && self.material.stroke_mode() != StrokeMode::None {
            self.submit_stroke(mesh, summary)?;
        }
        Ok(())
    }

    fn submit_fill(&mut self, mesh: MeshId, summary: BufferSummary) -> Result<()> {
        // Resolve the texture first: an unready source with no prior
        // upload skips the fill draw, recoverable next frame.
        let mut texture: Option<TextureId> = None;
        if self.material.fill_mode() == FillMode::Textured {
            if let Some(source) = self.material.texture().cloned() {
                texture = self.textures.bind(&mut self.backend, source.as_ref())?;
                if texture.is_none() {
                    return Ok(());
                }
            }
        }

        let program_id = self.select_fill_program(texture.is_some())?;
        self.shaders.activate(program_id);
        self.populate_uniforms(program_id, summary.uses_vertex_colors, texture.is_some())?;

        let call = DrawCall {
            program: self.shaders.program(program_id),
            program_id,
            mesh,
            part: DrawPart::Fill,
            topology: BufferKind::Triangles,
            blend: self.material.blend_spec(),
            texture,
        };
        self.backend.draw(&call)
    }

    fn submit_stroke(&mut self, mesh: MeshId, summary: BufferSummary) -> Result<()> {
        let program_id = match self.material.stroke_program() {
            Some(id) => id,
            None => self.shaders.builtin(BuiltinShader::LineStroke)?,
        };
        self.shaders.activate(program_id);
        self.populate_uniforms(program_id, summary.uses_stroke_colors, false)?;

        let topology = if summary.kind == BufferKind::Points {
            BufferKind::Points
        } else {
            BufferKind::Lines
        };
        let call = DrawCall {
            program: self.shaders.program(program_id),
            program_id,
            mesh,
            part: DrawPart::Stroke,
            topology,
            blend: self.material.blend_spec(),
            texture: None,
        };
        self.backend.draw(&call)
    }

    /// Builtin selection for fill: an explicit user program wins, then
    /// the normal-material debug mode, then the lit path whenever any
    /// light is on, then the texture path, then plain color.
    fn select_fill_program(&mut self, texture_bound: bool) -> Result<ProgramId> {
        if let Some(id) = self.material.fill_program() {
            return Ok(id);
        }
        let kind = if self.material.fill_mode() == FillMode::NormalMaterial {
            BuiltinShader::NormalMaterial
        } else if self.material.lights.any() {
            BuiltinShader::LitTextured
        } else if texture_bound {
            BuiltinShader::TexturedColor
        } else {
            BuiltinShader::ColorOnly
        };
        self.shaders.builtin(kind)
    }

    fn populate_uniforms(
        &mut self,
        id: ProgramId,
        use_vertex_color: bool,
        texture_bound: bool,
    ) -> Result<()> {
        let normal_matrix = Mat3::from_mat4(self.model_view).inverse().transpose();
        let material = &self.material;
        let sh = &mut self.shaders;

        sh.set_uniform_if_present(id, "model_view", &UniformValue::Mat4(self.model_view))?;
        sh.set_uniform_if_present(id, "projection", &UniformValue::Mat4(self.projection))?;
        sh.set_uniform_if_present(id, "normal_matrix", &UniformValue::Mat3(normal_matrix))?;
        sh.set_uniform_if_present(
            id,
            "material_color",
            &UniformValue::Vec4(material.fill_color()),
        )?;
        sh.set_uniform_if_present(
            id,
            "stroke_color",
            &UniformValue::Vec4(material.stroke_color()),
        )?;
        sh.set_uniform_if_present(
            id,
            "use_vertex_color",
            &UniformValue::Bool(use_vertex_color),
        )?;
        sh.set_uniform_if_present(id, "use_texture", &UniformValue::Bool(texture_bound))?;
        sh.set_uniform_if_present(
            id,
            "ambient_color",
            &UniformValue::Vec4(material.ambient_color()),
        )?;
        sh.set_uniform_if_present(
            id,
            "specular_color",
            &UniformValue::Vec4(material.specular_color()),
        )?;
        sh.set_uniform_if_present(
            id,
            "emissive_color",
            &UniformValue::Vec4(material.emissive_color()),
        )?;
        sh.set_uniform_if_present(id, "shininess", &UniformValue::Float(material.shininess()))?;
        sh.set_uniform_if_present(
            id,
            "use_specular",
            &UniformValue::Bool(material.flags().contains(MaterialFlags::USE_SPECULAR)),
        )?;

        pack_lights(sh, id, &material.lights)
    }

    fn resolve_uv(&self, uv: Vec2) -> Vec2 {
        if self.settings.texture_mode == TextureMode::Normal {
            return uv;
        }
        // Image mode: uv is in pixels of the bound texture.
        let Some(source) = self.material.texture() else {
            return uv;
        };
        let (w, h) = source.dimensions();
        if w == 0 || h == 0 {
            return uv;
        }
        uv / Vec2::new(w as f32, h as f32)
    }
}

/// Stage the light arrays into whichever of the engine light uniforms
/// the program declares.
fn pack_lights(sh: &mut ShaderRegistry, id: ProgramId, lights: &LightState) -> Result<()> {
    let ambient: Vec3 = lights.ambient.iter().copied().sum();
    sh.set_uniform_if_present(id, "ambient_light", &UniformValue::Vec4(ambient.extend(1.0)))?;

    let mut dir_color = [Vec4::ZERO; MAX_LIGHTS];
    let mut dir_specular = [Vec4::ZERO; MAX_LIGHTS];
    let mut dir_dir = [Vec4::ZERO; MAX_LIGHTS];
    for (i, l) in lights.directional.iter().enumerate() {
        dir_color[i] = l.color.extend(1.0);
        dir_specular[i] = l.specular.extend(1.0);
        dir_dir[i] = l.direction.extend(0.0);
    }
    sh.set_uniform_if_present(id, "directional_color", &UniformValue::Vec4Array(dir_color))?;
    sh.set_uniform_if_present(
        id,
        "directional_specular",
        &UniformValue::Vec4Array(dir_specular),
    )?;
    sh.set_uniform_if_present(id, "directional_dir", &UniformValue::Vec4Array(dir_dir))?;

    let mut point_color = [Vec4::ZERO; MAX_LIGHTS];
    let mut point_specular = [Vec4::ZERO; MAX_LIGHTS];
    let mut point_pos = [Vec4::ZERO; MAX_LIGHTS];
    for (i, l) in lights.point.iter().enumerate() {
        point_color[i] = l.color.extend(1.0);
        point_specular[i] = l.specular.extend(1.0);
        point_pos[i] = l.position.extend(1.0);
    }
    sh.set_uniform_if_present(id, "point_color", &UniformValue::Vec4Array(point_color))?;
    sh.set_uniform_if_present(id, "point_specular", &UniformValue::Vec4Array(point_specular))?;
    sh.set_uniform_if_present(id, "point_pos", &UniformValue::Vec4Array(point_pos))?;

    let mut spot_color = [Vec4::ZERO; MAX_LIGHTS];
    let mut spot_specular = [Vec4::ZERO; MAX_LIGHTS];
    let mut spot_pos = [Vec4::ZERO; MAX_LIGHTS];
    let mut spot_dir = [Vec4::ZERO; MAX_LIGHTS];
    let mut spot_params = [Vec4::ZERO; MAX_LIGHTS];
    for (i, l) in lights.spot.iter().enumerate() {
        spot_color[i] = l.color.extend(1.0);
        spot_specular[i] = l.specular.extend(1.0);
        spot_pos[i] = l.position.extend(1.0);
        spot_dir[i] = l.direction.extend(0.0);
        spot_params[i] = Vec4::new(l.angle, l.concentration, 0.0, 0.0);
    }
    sh.set_uniform_if_present(id, "spot_color", &UniformValue::Vec4Array(spot_color))?;
    sh.set_uniform_if_present(id, "spot_specular", &UniformValue::Vec4Array(spot_specular))?;
    sh.set_uniform_if_present(id, "spot_pos", &UniformValue::Vec4Array(spot_pos))?;
    sh.set_uniform_if_present(id, "spot_dir", &UniformValue::Vec4Array(spot_dir))?;
    sh.set_uniform_if_present(id, "spot_params", &UniformValue::Vec4Array(spot_params))?;

    let counts = UVec4::new(
        lights.directional.len() as u32,
        lights.point.len() as u32,
        lights.spot.len() as u32,
        0,
    );
    sh.set_uniform_if_present(id, "light_counts", &UniformValue::UVec4(counts))
}
