//! wgpu implementation of [`GpuBackend`].
//!
//! Draw calls are resolved eagerly (pipeline lookup, uniform upload,
//! bind groups) and replayed into a single render pass when the frame
//! is presented. Pipelines are deduplicated on the full state key;
//! shader modules are deduplicated on a hash of their source.

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;
use xxhash_rust::xxh3::xxh3_64;

use crate::errors::{AtelierError, Result};
use crate::geometry::{BufferKind, ShapeBuffer};
use crate::shader::Program;

use super::{DrawCall, DrawPart, GpuBackend, MeshId, TextureId};

/// Target and depth configuration of one backend instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    /// Format of the color target every pipeline renders into.
    pub target_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    pub sample_count: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            target_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            depth_format: wgpu::TextureFormat::Depth32Float,
            sample_count: 1,
        }
    }
}

const FILL_STRIDE: u64 = 48;
const FILL_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
    3 => Float32x4,
];

const STROKE_STRIDE: u64 = 28;
const STROKE_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x4,
];

// ─── Pipeline keys ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    module_hash: u64,
    stroke_layout: bool,
    samples_texture: bool,
    topology: BufferKind,
    blend: Option<wgpu::BlendState>,
    depth_write: bool,
}

struct GpuPipeline {
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: Option<wgpu::BindGroupLayout>,
}

// ─── GPU resources ───────────────────────────────────────────────────────────

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct GpuMesh {
    fill: Option<(wgpu::Buffer, u32)>,
    stroke: Option<(wgpu::Buffer, u32)>,
}

struct RecordedDraw {
    pipeline: usize,
    uniforms: wgpu::BindGroup,
    texture: Option<wgpu::BindGroup>,
    vertex: wgpu::Buffer,
    count: u32,
}

// ─── Backend ─────────────────────────────────────────────────────────────────

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: RendererConfig,

    sampler: wgpu::Sampler,
    fallback: GpuTexture,

    textures: FxHashMap<u64, GpuTexture>,
    meshes: FxHashMap<u64, GpuMesh>,

    modules: FxHashMap<u64, wgpu::ShaderModule>,
    pipelines: Vec<GpuPipeline>,
    pipeline_lookup: FxHashMap<PipelineKey, usize>,

    records: Vec<RecordedDraw>,
    depth: Option<(u32, u32, wgpu::TextureView)>,

    next_texture: u64,
    next_mesh: u64,
}

impl WgpuBackend {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, config: RendererConfig) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shape Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let fallback = create_texture_internal(&device, "Fallback White", 1, 1);
        upload_texture_internal(&queue, &fallback, 1, 1, &[255, 255, 255, 255]);

        Self {
            device,
            queue,
            config,
            sampler,
            fallback,
            textures: FxHashMap::default(),
            meshes: FxHashMap::default(),
            modules: FxHashMap::default(),
            pipelines: Vec::with_capacity(16),
            pipeline_lookup: FxHashMap::default(),
            records: Vec::new(),
            depth: None,
            next_texture: 0,
            next_mesh: 0,
        }
    }

    /// Encode every recorded draw into one render pass targeting
    /// `view` and submit it.
    pub fn present(&mut self, view: &wgpu::TextureView, width: u32, height: u32, clear: wgpu::Color) {
        let depth_view = self.depth_view(width, height);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shape Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for record in &self.records {
                pass.set_pipeline(&self.pipelines[record.pipeline].pipeline);
                pass.set_bind_group(0, &record.uniforms, &[]);
                if let Some(texture) = &record.texture {
                    pass.set_bind_group(1, texture, &[]);
                }
                pass.set_vertex_buffer(0, record.vertex.slice(..));
                pass.draw(0..record.count, 0..1);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        self.records.clear();
    }

    /// Pending draw count of the current frame.
    #[must_use]
    pub fn pending_draws(&self) -> usize {
        self.records.len()
    }

    fn depth_view(&mut self, width: u32, height: u32) -> wgpu::TextureView {
        if let Some((w, h, view)) = &self.depth
            && *w == width
            && *h == height
        {
            return view.clone();
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.config.depth_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth = Some((width, height, view.clone()));
        view
    }

    fn module(&mut self, program: &Program) -> (u64, wgpu::ShaderModule) {
        let hash = xxh3_64(program.source().as_bytes());
        let device = &self.device;
        let module = self
            .modules
            .entry(hash)
            .or_insert_with(|| {
                log::debug!("compiling shader module '{}'", program.label());
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(program.label()),
                    source: wgpu::ShaderSource::Wgsl(program.source().into()),
                })
            })
            .clone();
        (hash, module)
    }

    fn pipeline(&mut self, program: &Program, call: &DrawCall<'_>) -> usize {
        let (module_hash, module) = self.module(program);
        let key = PipelineKey {
            module_hash,
            stroke_layout: call.part == DrawPart::Stroke,
            samples_texture: program.samples_texture(),
            topology: call.topology,
            blend: call.blend.blend,
            depth_write: call.blend.depth_write,
        };
        if let Some(&index) = self.pipeline_lookup.get(&key) {
            return index;
        }
        log::debug!(
            "building pipeline for '{}' ({:?})",
            program.label(),
            call.topology
        );

        let uniform_entries: Vec<wgpu::BindGroupLayoutEntry> = program
            .blocks()
            .iter()
            .filter(|b| b.group == 0)
            .map(|b| wgpu::BindGroupLayoutEntry {
                binding: b.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        let uniform_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Layout"),
                entries: &uniform_entries,
            });

        let texture_layout = program.samples_texture().then(|| {
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Texture Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                })
        });

        let mut layouts: Vec<Option<&wgpu::BindGroupLayout>> = vec![Some(&uniform_layout)];
        if let Some(layout) = &texture_layout {
            layouts.push(Some(layout));
        }
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(program.label()),
                bind_group_layouts: &layouts,
                immediate_size: 0,
            });

        let (stride, attributes): (u64, &[wgpu::VertexAttribute]) = if key.stroke_layout {
            (STROKE_STRIDE, &STROKE_ATTRIBUTES)
        } else {
            (FILL_STRIDE, &FILL_ATTRIBUTES)
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(program.label()),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes,
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.target_format,
                        blend: key.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: topology_of(key.topology),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: self.config.depth_format,
                    depth_write_enabled: Some(key.depth_write),
                    depth_compare: Some(wgpu::CompareFunction::Less),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: self.config.sample_count,
                    ..Default::default()
                },
                multiview_mask: None,
                cache: None,
            });

        let index = self.pipelines.len();
        self.pipelines.push(GpuPipeline {
            pipeline,
            uniform_layout,
            texture_layout,
        });
        self.pipeline_lookup.insert(key, index);
        index
    }
}

impl GpuBackend for WgpuBackend {
    fn upload_mesh(&mut self, buffer: &ShapeBuffer) -> MeshId {
        let fill = (!buffer.positions.is_empty()).then(|| {
            let mut bytes = Vec::with_capacity(buffer.positions.len() * FILL_STRIDE as usize);
            for i in 0..buffer.positions.len() {
                bytes.extend_from_slice(bytemuck::bytes_of(&buffer.positions[i]));
                bytes.extend_from_slice(bytemuck::bytes_of(&buffer.normals[i]));
                bytes.extend_from_slice(bytemuck::bytes_of(&buffer.uvs[i]));
                bytes.extend_from_slice(bytemuck::bytes_of(&buffer.colors[i]));
            }
            let gpu = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Fill Vertices"),
                contents: &bytes,
                usage: wgpu::BufferUsages::VERTEX,
            });
            (gpu, buffer.positions.len() as u32)
        });

        // The stroke stream is de-indexed here: points stay as-is,
        // edges expand to a line list.
        let stroke_vertices: Vec<usize> = if buffer.kind == BufferKind::Points {
            (0..buffer.stroke_positions.len()).collect()
        } else {
            buffer
                .edges
                .iter()
                .flat_map(|e| [e[0] as usize, e[1] as usize])
                .collect()
        };
        let stroke = (!stroke_vertices.is_empty()).then(|| {
            let mut bytes = Vec::with_capacity(stroke_vertices.len() * STROKE_STRIDE as usize);
            for &i in &stroke_vertices {
                bytes.extend_from_slice(bytemuck::bytes_of(&buffer.stroke_positions[i]));
                bytes.extend_from_slice(bytemuck::bytes_of(&buffer.stroke_colors[i]));
            }
            let gpu = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Stroke Vertices"),
                contents: &bytes,
                usage: wgpu::BufferUsages::VERTEX,
            });
            (gpu, stroke_vertices.len() as u32)
        });

        let id = MeshId(self.next_mesh);
        self.next_mesh += 1;
        self.meshes.insert(id.0, GpuMesh { fill, stroke });
        id
    }

    fn free_mesh(&mut self, id: MeshId) {
        self.meshes.remove(&id.0);
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        let texture = create_texture_internal(&self.device, label, width, height);
        self.textures.insert(id.0, texture);
        id
    }

    fn upload_texture(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]) {
        if let Some(texture) = self.textures.get(&id.0) {
            upload_texture_internal(&self.queue, texture, width, height, pixels);
        }
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.textures.remove(&id.0);
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        let mesh = self
            .meshes
            .get(&call.mesh.0)
            .ok_or(AtelierError::InvalidState("draw references a freed mesh"))?;
        let part = match call.part {
            DrawPart::Fill => &mesh.fill,
            DrawPart::Stroke => &mesh.stroke,
        };
        let Some((vertex, count)) = part else {
            return Ok(());
        };
        let (vertex, count) = (vertex.clone(), *count);

        let pipeline = self.pipeline(call.program, call);

        let uniform_buffers: Vec<(u32, wgpu::Buffer)> = call
            .program
            .blocks()
            .iter()
            .filter(|b| b.group == 0)
            .map(|block| {
                let gpu = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Uniform Block"),
                    contents: block.bytes(),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                (block.binding, gpu)
            })
            .collect();
        let uniform_entries: Vec<wgpu::BindGroupEntry> = uniform_buffers
            .iter()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        let uniforms = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &self.pipelines[pipeline].uniform_layout,
            entries: &uniform_entries,
        });

        let texture = self.pipelines[pipeline].texture_layout.as_ref().map(|layout| {
            let view = call
                .texture
                .and_then(|t| self.textures.get(&t.0))
                .map_or(&self.fallback.view, |t| &t.view);
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Texture Bind Group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            })
        });

        self.records.push(RecordedDraw {
            pipeline,
            uniforms,
            texture,
            vertex,
            count,
        });
        Ok(())
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn topology_of(kind: BufferKind) -> wgpu::PrimitiveTopology {
    match kind {
        BufferKind::Points => wgpu::PrimitiveTopology::PointList,
        BufferKind::Lines => wgpu::PrimitiveTopology::LineList,
        BufferKind::Triangles => wgpu::PrimitiveTopology::TriangleList,
    }
}

fn create_texture_internal(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { texture, view }
}

fn upload_texture_internal(
    queue: &wgpu::Queue,
    texture: &GpuTexture,
    width: u32,
    height: u32,
    pixels: &[u8],
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}
