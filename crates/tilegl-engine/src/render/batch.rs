use std::collections::{HashMap, HashSet};

use bytemuck::{Pod, Zeroable};
use tilegl_batch::record::{
    AGE_OFFSET, ALPHA_OFFSET, MATERIAL_OFFSET, POSITION_OFFSET, TEXTURE_OFFSET, TEX_COORD_OFFSET,
    VERTEX_STRIDE,
};
use tilegl_batch::{DrawRun, TextureId};

use crate::map::PreparedFrame;
use crate::render::{DecodedImage, RenderCtx, RenderTarget};
use crate::view::MapView;

// ── vertex layout ─────────────────────────────────────────────────────────

/// Vertex attributes read straight from the packed primitive records.
///
/// The material tag is a single byte followed by three zeroed bytes, so it is
/// read as a `Uint32`. The interleaved per-primitive word at offset 60 and the
/// reserved bytes are not exposed to the shader.
pub const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 6] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Uint32,
        offset: MATERIAL_OFFSET as u64,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: POSITION_OFFSET as u64,
        shader_location: 1,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: TEX_COORD_OFFSET as u64,
        shader_location: 2,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Uint32,
        offset: TEXTURE_OFFSET as u64,
        shader_location: 3,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32,
        offset: ALPHA_OFFSET as u64,
        shader_location: 4,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Uint32,
        offset: AGE_OFFSET as u64,
        shader_location: 5,
    },
];

pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

// ── view uniform ──────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct ViewUniform {
    pub center: [f32; 2],
    pub half_size: [f32; 2],
    pub now_ms: u32,
    pub fade_ms: f32,
    pub _pad: [f32; 2], // 16-byte alignment
}

impl ViewUniform {
    pub(crate) fn new(view: &MapView, now_ms: u32, fade_ms: f32) -> Self {
        Self {
            center: view.center.to_f32(),
            half_size: view.half_size.to_f32(),
            now_ms,
            fade_ms: fade_ms.max(0.0),
            _pad: [0.0; 2],
        }
    }
}

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Draws a prepared frame's batch buffer.
///
/// The live prefix of the batch is uploaded as-is into one vertex buffer;
/// every [`DrawRun`] becomes one `draw` with its texture bound. Textures are
/// registered up front by id and bound through one bind group each.
#[derive(Default)]
pub struct BatchRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    view_layout: Option<wgpu::BindGroupLayout>,
    texture_layout: Option<wgpu::BindGroupLayout>,
    view_bind_group: Option<wgpu::BindGroup>,
    view_ubo: Option<wgpu::Buffer>,
    sampler: Option<wgpu::Sampler>,

    vbo: Option<wgpu::Buffer>,
    vbo_capacity: usize, // bytes

    textures: HashMap<TextureId, GpuTexture>,
    warned_missing: HashSet<TextureId>,
}

impl BatchRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has_texture(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Uploads `image` and makes it drawable under `id`, replacing any
    /// texture previously registered with that id.
    pub fn register_texture(&mut self, ctx: &RenderCtx<'_>, id: TextureId, image: &DecodedImage) {
        self.ensure_layouts(ctx);
        self.ensure_sampler(ctx);

        let Some(layout) = self.texture_layout.as_ref() else { return };
        let Some(sampler) = self.sampler.as_ref() else { return };

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tilegl batch texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.bytes_per_row()),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tilegl batch texture bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        log::debug!("registered texture {} ({}x{})", id.0, image.width, image.height);
        self.warned_missing.remove(&id);
        self.textures.insert(id, GpuTexture { _texture: texture, bind_group });
    }

    /// Drops the GPU texture registered under `id`.
    pub fn remove_texture(&mut self, id: TextureId) -> bool {
        let removed = self.textures.remove(&id).is_some();
        if removed {
            log::debug!("evicted texture {}", id.0);
        }
        removed
    }

    /// Uploads the frame's live records and issues one draw per texture run.
    ///
    /// Runs whose texture is not registered are skipped. Returns the number
    /// of draw calls issued.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        frame: &PreparedFrame<'_>,
    ) -> usize {
        self.ensure_layouts(ctx);
        self.ensure_pipeline(ctx);
        self.ensure_view_binding(ctx);

        let bytes = frame.batch.live_bytes();
        if bytes.is_empty() && target.clear.is_none() {
            return 0;
        }

        // Mutating methods must happen before borrowing pipeline/buffers immutably.
        self.write_view_uniform(ctx, frame);
        self.ensure_vertex_capacity(ctx, bytes.len());

        let mut runs: Vec<DrawRun> = Vec::new();
        frame.batch.render(|run| runs.push(run));

        let Some(vbo) = self.vbo.as_ref() else { return 0 };
        if !bytes.is_empty() {
            ctx.queue.write_buffer(vbo, 0, bytes);
        }

        let Some(pipeline) = self.pipeline.as_ref() else { return 0 };
        let Some(view_bind_group) = self.view_bind_group.as_ref() else { return 0 };

        let load = match target.clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tilegl batch pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, view_bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));

        let mut draws = 0;
        for run in &runs {
            let Some(texture) = self.textures.get(&run.texture) else {
                if self.warned_missing.insert(run.texture) {
                    log::debug!("texture {} not registered; skipping its primitives", run.texture.0);
                }
                continue;
            };
            let first = run.first_vertex();
            rpass.set_bind_group(1, &texture.bind_group, &[]);
            rpass.draw(first..first + run.vertex_count(), 0..1);
            draws += 1;
        }

        log::trace!("batch frame: {} runs, {draws} draws", runs.len());
        draws
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_layouts(&mut self, ctx: &RenderCtx<'_>) {
        if self.view_layout.is_some() && self.texture_layout.is_some() {
            return;
        }

        let view_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tilegl batch view bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ViewUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let texture_layout =
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tilegl batch texture bgl"),
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
            });

        self.view_layout = Some(view_layout);
        self.texture_layout = Some(texture_layout);
        self.view_bind_group = None;
        self.view_ubo = None;
        self.pipeline = None;
        self.pipeline_format = None;
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }
        let Some(view_layout) = self.view_layout.as_ref() else { return };
        let Some(texture_layout) = self.texture_layout.as_ref() else { return };

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tilegl batch shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/batch.wgsl").into()),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tilegl batch pipeline layout"),
            bind_group_layouts: &[view_layout, texture_layout],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tilegl batch pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
    }

    fn ensure_sampler(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_some() {
            return;
        }
        self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tilegl batch sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }));
    }

    fn ensure_view_binding(&mut self, ctx: &RenderCtx<'_>) {
        if self.view_bind_group.is_some() && self.view_ubo.is_some() {
            return;
        }
        let Some(layout) = self.view_layout.as_ref() else { return };

        let view_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tilegl batch view ubo"),
            size: std::mem::size_of::<ViewUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tilegl batch view bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_ubo.as_entire_binding(),
            }],
        });

        self.view_ubo = Some(view_ubo);
        self.view_bind_group = Some(bind_group);
    }

    fn write_view_uniform(&mut self, ctx: &RenderCtx<'_>, frame: &PreparedFrame<'_>) {
        let Some(ubo) = self.view_ubo.as_ref() else { return };
        let u = ViewUniform::new(&frame.view, frame.now_ms, frame.fade_ms);
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    fn ensure_vertex_capacity(&mut self, ctx: &RenderCtx<'_>, required_bytes: usize) {
        if required_bytes <= self.vbo_capacity && self.vbo.is_some() {
            return;
        }

        let new_cap = vertex_buffer_capacity(required_bytes);
        self.vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tilegl batch vbo"),
            size: new_cap as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        log::debug!("batch vertex buffer resized: {} -> {new_cap} bytes", self.vbo_capacity);
        self.vbo_capacity = new_cap;
    }
}

/// Vertex buffer size for `required` bytes: next power of two, at least 64 KiB.
fn vertex_buffer_capacity(required: usize) -> usize {
    required.next_power_of_two().max(1 << 16)
}
