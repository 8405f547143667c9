use std::{f32::consts::PI, mem::size_of};

use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{vec3, Mat4};
use wgpu::util::DeviceExt;

use crate::entity::Scene;

use super::{projection_matrix, view_matrix, DEPTH_FORMAT, QUAD_INDICES, QUAD_VERTICES};

#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
#[repr(C)]
struct FaceUniforms {
    mvp_mat: Mat4,
}

struct Face {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// The two-sided card: one quad per face, the back rotated half a turn and
/// offset slightly behind the front. Backface culling keeps each texture
/// visible only from its own side.
pub struct CardPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    front: Face,
    back: Face,
}

impl CardPass {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        sampler: &wgpu::Sampler,
        front_texture: &wgpu::TextureView,
        back_texture: &wgpu::TextureView,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Card Vertex Buffer"),
            contents: bytes_of(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Card Index Buffer"),
            contents: bytes_of(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let bind_group_layout = Self::make_bind_group_layout(device);
        let pipeline = Self::make_render_pipeline(device, &bind_group_layout, surface_format);

        let front = Self::make_face(device, &bind_group_layout, sampler, front_texture);
        let back = Self::make_face(device, &bind_group_layout, sampler, back_texture);

        Self {
            pipeline,
            bind_group_layout,
            vertex_buffer,
            index_buffer,
            front,
            back,
        }
    }

    pub fn set_textures(
        &mut self,
        device: &wgpu::Device,
        sampler: &wgpu::Sampler,
        front: Option<wgpu::TextureView>,
        back: Option<wgpu::TextureView>,
    ) {
        if let Some(view) = front {
            self.front = Self::make_face(device, &self.bind_group_layout, sampler, &view);
        }
        if let Some(view) = back {
            self.back = Self::make_face(device, &self.bind_group_layout, sampler, &view);
        }
    }

    fn make_face(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        texture: &wgpu::TextureView,
    ) -> Face {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Card Face Uniform Buffer"),
            size: size_of::<FaceUniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Face {
            uniform_buffer,
            bind_group,
        }
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
                        min_binding_size: wgpu::BufferSize::new(size_of::<FaceUniforms>() as _),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn make_render_pipeline(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let shader_module = device.create_shader_module(&wgpu::include_wgsl!("card.wgsl"));

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Card Pipeline"),
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
                targets: &[surface_format.into()],
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
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }

    pub fn update(&self, queue: &wgpu::Queue, scene: &Scene) {
        let card = &scene.card;
        let vp = projection_matrix(&scene.camera) * view_matrix(&scene.camera);
        let group = Mat4::from_rotation_y(card.rotation);
        let scale = Mat4::from_scale(vec3(card.size, card.size, 1.0));

        // Front face sits half the gap toward the camera, the back half away
        // and turned around.
        let m_front = group * Mat4::from_translation(vec3(0.0, 0.0, -card.gap * 0.5)) * scale;
        let m_back = group
            * Mat4::from_translation(vec3(0.0, 0.0, card.gap * 0.5))
            * Mat4::from_rotation_y(PI)
            * scale;

        queue.write_buffer(
            &self.front.uniform_buffer,
            0,
            bytes_of(&FaceUniforms { mvp_mat: vp * m_front }),
        );
        queue.write_buffer(
            &self.back.uniform_buffer,
            0,
            bytes_of(&FaceUniforms { mvp_mat: vp * m_back }),
        );
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

        for face in [&self.front, &self.back] {
            render_pass.set_bind_group(0, &face.bind_group, &[]);
            render_pass.draw_indexed(0..(QUAD_INDICES.len() as _), 0, 0..1);
        }
    }
}
