//! GPU-facing layouts for the quad batch.
//!
//! Tilesets are expected in one `texture_2d_array`, layer = tileset index.
//! Shadow quads carry layer `-1` and are shaded as flat half-transparent black.

use static_assertions::const_assert_eq;
use tiles::{TileSize, WATER_SURFACE_SEQUENCE, WATERFALL_PHASES};

use crate::quad_batch::{QuadRecord, TilesetSlot};

pub const SHADOW_TILESET_LAYER: f32 = -1.0;
const INITIAL_QUAD_INSTANCE_CAPACITY: usize = 1024;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadInstanceGpu {
    pub dest_origin: [f32; 2],
    pub dest_size: [f32; 2],
    pub source_origin: [f32; 2],
    pub source_size: [f32; 2],
    pub anim_step: [f32; 2],
    pub tileset_layer: f32,
    pub _padding: f32,
}

const_assert_eq!(std::mem::size_of::<QuadInstanceGpu>(), 48);

impl From<&QuadRecord> for QuadInstanceGpu {
    fn from(record: &QuadRecord) -> Self {
        let tileset_layer = match record.slot {
            TilesetSlot::Image(index) => f32::from(index),
            TilesetSlot::Shadow => SHADOW_TILESET_LAYER,
        };
        Self {
            dest_origin: [record.dest.x as f32, record.dest.y as f32],
            dest_size: [record.dest.width as f32, record.dest.height as f32],
            source_origin: [record.source.x as f32, record.source.y as f32],
            source_size: [record.source.width as f32, record.source.height as f32],
            anim_step: [f32::from(record.anim.x), f32::from(record.anim.y)],
            tileset_layer,
            _padding: 0.0,
        }
    }
}

/// Per-frame uniform of `tile_quad.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TileAnimUniform {
    /// Screen position of quad space.
    pub layer_offset: [f32; 2],
    pub screen_size: [f32; 2],
    pub anim_offset: [f32; 2],
    pub tileset_size: [f32; 2],
}

const_assert_eq!(std::mem::size_of::<TileAnimUniform>(), 32);

/// Source offset one animation step moves by at `frame`, in pixels.
pub fn tile_anim_offset(frame: u64, tile_size: TileSize) -> [f32; 2] {
    let water = WATER_SURFACE_SEQUENCE[(frame % WATER_SURFACE_SEQUENCE.len() as u64) as usize];
    let waterfall = (frame % WATERFALL_PHASES) as u32;
    [
        (water * tile_size.width()) as f32,
        (waterfall * tile_size.height()) as f32,
    ]
}

/// Growable storage buffer holding one stratum's quads.
pub struct QuadInstanceBuffer {
    label: &'static str,
    buffer: wgpu::Buffer,
    capacity: usize,
    len: usize,
    staging: Vec<QuadInstanceGpu>,
}

impl QuadInstanceBuffer {
    pub fn new(device: &wgpu::Device, label: &'static str) -> Self {
        Self {
            label,
            buffer: create_instance_buffer(device, label, INITIAL_QUAD_INSTANCE_CAPACITY),
            capacity: INITIAL_QUAD_INSTANCE_CAPACITY,
            len: 0,
            staging: Vec::new(),
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Uploads `records`; returns true when the buffer was reallocated and
    /// bind groups referencing it must be rebuilt.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        records: &[QuadRecord],
    ) -> bool {
        self.staging.clear();
        self.staging.extend(records.iter().map(QuadInstanceGpu::from));
        self.len = self.staging.len();
        let reallocated = self.ensure_capacity(device, self.len);
        if !self.staging.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&self.staging));
        }
        reallocated
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, required_len: usize) -> bool {
        if required_len <= self.capacity {
            return false;
        }
        let expanded_capacity = required_len
            .max(INITIAL_QUAD_INSTANCE_CAPACITY)
            .checked_next_power_of_two()
            .expect("quad instance capacity overflow");
        self.buffer = create_instance_buffer(device, self.label, expanded_capacity);
        self.capacity = expanded_capacity;
        true
    }
}

/// Render pipeline for `tile_quad.wgsl`: group 0 holds the `TileAnimUniform`
/// and one stratum's instances, group 1 the tileset array and its sampler.
pub struct TileQuadPipeline {
    pipeline: wgpu::RenderPipeline,
    frame_layout: wgpu::BindGroupLayout,
    tileset_layout: wgpu::BindGroupLayout,
}

impl TileQuadPipeline {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("renderer.tile_quad"),
            source: wgpu::ShaderSource::Wgsl(crate::TILE_QUAD_WGSL.into()),
        });
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("renderer.tile_quad.frame_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let tileset_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("renderer.tile_quad.tileset_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
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
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("renderer.tile_quad.layout"),
            bind_group_layouts: &[&frame_layout, &tileset_layout],
            immediate_size: 0,
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("renderer.tile_quad.pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        Self {
            pipeline,
            frame_layout,
            tileset_layout,
        }
    }

    /// `tilesets` must be a `D2Array` view, one layer per tileset index.
    pub fn tileset_bind_group(
        &self,
        device: &wgpu::Device,
        tilesets: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("renderer.tile_quad.tilesets"),
            layout: &self.tileset_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(tilesets),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Rebuild after `QuadInstanceBuffer::upload` reports a reallocation.
    pub fn frame_bind_group(
        &self,
        device: &wgpu::Device,
        uniform: &wgpu::Buffer,
        instances: &QuadInstanceBuffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("renderer.tile_quad.frame"),
            layout: &self.frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instances.buffer().as_entire_binding(),
                },
            ],
        })
    }

    /// Six vertices per quad, one instance per record.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        frame: &wgpu::BindGroup,
        tilesets: &wgpu::BindGroup,
        instances: &QuadInstanceBuffer,
    ) {
        if instances.is_empty() {
            return;
        }
        let instance_count =
            u32::try_from(instances.len()).expect("quad instance count exceeds u32");
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, frame, &[]);
        pass.set_bind_group(1, tilesets, &[]);
        pass.draw(0..6, 0..instance_count);
    }
}

fn create_instance_buffer(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
    let instance_size = std::mem::size_of::<QuadInstanceGpu>() as u64;
    let capacity_u64 = u64::try_from(capacity).expect("quad instance capacity exceeds u64");
    let size = capacity_u64
        .checked_mul(instance_size)
        .expect("quad instance buffer size overflow");
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
