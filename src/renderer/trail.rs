use std::mem::size_of;

use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::{animation::TrailSet, entity::Scene};

use super::{
    projection_matrix, starfield::additive_target, view_matrix, DEPTH_FORMAT, QUAD_INDICES,
    QUAD_VERTICES,
};

/// Screen size of the shooting star head relative to a trail particle.
const HEAD_SIZE: f32 = 2.5;

#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
#[repr(C)]
struct TrailUniforms {
    v_mat: Mat4,
    p_mat: Mat4,
    point_size: f32,
    _pad0: [u8; 12],
}

/// xyz world position, w size multiplier; color rgb plus opacity.
#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
#[repr(C)]
struct TrailInstance {
    position: Vec4,
    color: Vec4,
}

/// The shooting star head plus every live trail segment, rewritten into one
/// fixed-capacity instance buffer each frame. The capacity follows the trail
/// cap, so the buffer never reallocates.
pub struct TrailPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    live_count: u32,
}

impl TrailPass {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        sampler: &wgpu::Sampler,
        sprite: &wgpu::TextureView,
        trails: &TrailSet,
    ) -> Self {
        let capacity =
            trails.max_segments() as u64 * trails.particles_per_segment() as u64 + 1;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Trail Uniform Buffer"),
            size: size_of::<TrailUniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Trail Instance Buffer"),
            size: capacity * size_of::<TrailInstance>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Trail Vertex Buffer"),
            contents: bytes_of(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Trail Index Buffer"),
            contents: bytes_of(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let bind_group_layout = Self::make_bind_group_layout(device);
        let bind_group = Self::make_bind_group(
            device,
            &bind_group_layout,
            &uniform_buffer,
            &instance_buffer,
            sprite,
            sampler,
        );
        let pipeline = Self::make_render_pipeline(device, &bind_group_layout, surface_format);

        Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            instance_buffer,
            vertex_buffer,
            index_buffer,
            bind_group,
            live_count: 0,
        }
    }

    pub fn set_sprite(
        &mut self,
        device: &wgpu::Device,
        sampler: &wgpu::Sampler,
        sprite: &wgpu::TextureView,
    ) {
        self.bind_group = Self::make_bind_group(
            device,
            &self.bind_group_layout,
            &self.uniform_buffer,
            &self.instance_buffer,
            sprite,
            sampler,
        );
    }

    fn make_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: None,
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size_of::<TrailUniforms>() as _),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size_of::<TrailInstance>() as _),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn make_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        instance_buffer: &wgpu::Buffer,
        sprite: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instance_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(sprite),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn make_render_pipeline(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let shader_module = device.create_shader_module(&wgpu::include_wgsl!("trail.wgsl"));

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Trail Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: size_of::<glam::Vec3>() as _,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    }],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fs_main",
                targets: &[additive_target(surface_format)],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }

    pub fn update(&mut self, queue: &wgpu::Queue, scene: &Scene) {
        let uniforms = TrailUniforms {
            v_mat: view_matrix(&scene.camera),
            p_mat: projection_matrix(&scene.camera),
            point_size: 0.04,
            ..Default::default()
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytes_of(&uniforms));

        let mut instances = Vec::with_capacity(
            scene.trails.len() * scene.trails.particles_per_segment() as usize + 1,
        );
        instances.push(TrailInstance {
            position: (scene.star.position, HEAD_SIZE).into(),
            color: Vec4::ONE,
        });
        for segment in scene.trails.iter() {
            for particle in &segment.particles {
                instances.push(TrailInstance {
                    position: (segment.anchor + particle.offset, 1.0).into(),
                    color: (particle.color, segment.opacity).into(),
                });
            }
        }

        self.live_count = instances.len() as u32;
        queue.write_buffer(&self.instance_buffer, 0, cast_slice(instances.as_slice()));
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..(QUAD_INDICES.len() as _), 0, 0..self.live_count);
    }
}
