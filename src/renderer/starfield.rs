use std::mem::size_of;

use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use glam::{Mat4, Vec4};
use log::warn;
use wgpu::util::DeviceExt;

use crate::entity::{Scene, StarLayer};

use super::{projection_matrix, view_matrix, DEPTH_FORMAT, QUAD_INDICES, QUAD_VERTICES};

#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
#[repr(C)]
struct LayerUniforms {
    mv_mat: Mat4,
    p_mat: Mat4,
    tint: Vec4,
    time: f32,
    point_size: f32,
    pulse_rate: f32,
    _pad0: f32,
}

impl LayerUniforms {
    fn new(scene: &Scene, layer: &StarLayer, pulse_rate: f32) -> Self {
        let m_mat = Mat4::from_quat(layer.rotation());
        Self {
            mv_mat: view_matrix(&scene.camera) * m_mat,
            p_mat: projection_matrix(&scene.camera),
            tint: Vec4::from(layer.tint),
            time: scene.time,
            point_size: layer.point_size,
            pulse_rate,
            ..Default::default()
        }
    }
}

/// xyz base position; w is the static size attribute that also phases the
/// pulsation.
#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
#[repr(C)]
struct StarInstance {
    position: Vec4,
}

struct LayerState {
    uniform_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    count: u32,
    render_bundle: wgpu::RenderBundle,
}

/// One draw per starfield layer; geometry is immutable, so each layer is a
/// pre-recorded render bundle and the per-frame work is one uniform write.
pub struct StarfieldPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    surface_format: wgpu::TextureFormat,
    pulse_rate: f32,
    layers: Vec<LayerState>,
}

impl StarfieldPass {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        pulse_rate: f32,
        sampler: &wgpu::Sampler,
        sprite: &wgpu::TextureView,
        scene: &Scene,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Star Vertex Buffer"),
            contents: bytes_of(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Star Index Buffer"),
            contents: bytes_of(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let bind_group_layout = Self::make_bind_group_layout(device);
        let pipeline = Self::make_render_pipeline(device, &bind_group_layout, surface_format);

        let layers = scene
            .layers
            .iter()
            .map(|layer| {
                let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Star Layer Uniform Buffer"),
                    size: size_of::<LayerUniforms>() as _,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });

                let instances: Vec<StarInstance> = layer
                    .field
                    .positions()
                    .chunks_exact(3)
                    .zip(layer.field.sizes())
                    .map(|(p, &size)| StarInstance {
                        position: Vec4::new(p[0], p[1], p[2], size),
                    })
                    .collect();

                let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Star Instance Buffer"),
                    contents: cast_slice(instances.as_slice()),
                    usage: wgpu::BufferUsages::STORAGE,
                });

                let count = layer.field.len();
                let bind_group = Self::make_bind_group(
                    device,
                    &bind_group_layout,
                    &uniform_buffer,
                    &instance_buffer,
                    sprite,
                    sampler,
                );
                let render_bundle = Self::make_render_bundle(
                    device,
                    surface_format,
                    &pipeline,
                    &bind_group,
                    &vertex_buffer,
                    &index_buffer,
                    count,
                );

                LayerState {
                    uniform_buffer,
                    instance_buffer,
                    count,
                    render_bundle,
                }
            })
            .collect();

        Self {
            pipeline,
            bind_group_layout,
            vertex_buffer,
            index_buffer,
            surface_format,
            pulse_rate,
            layers,
        }
    }

    /// Rebinds one layer's sprite texture and re-records its bundle.
    pub fn set_sprite(
        &mut self,
        device: &wgpu::Device,
        sampler: &wgpu::Sampler,
        index: usize,
        sprite: &wgpu::TextureView,
    ) {
        let layer = match self.layers.get_mut(index) {
            Some(layer) => layer,
            None => {
                warn!("No star layer {} for sprite texture", index);
                return;
            }
        };

        let bind_group = Self::make_bind_group(
            device,
            &self.bind_group_layout,
            &layer.uniform_buffer,
            &layer.instance_buffer,
            sprite,
            sampler,
        );
        layer.render_bundle = Self::make_render_bundle(
            device,
            self.surface_format,
            &self.pipeline,
            &bind_group,
            &self.vertex_buffer,
            &self.index_buffer,
            layer.count,
        );
    }

    fn make_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: None,
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size_of::<LayerUniforms>() as _),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size_of::<StarInstance>() as _),
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
        let shader_module = device.create_shader_module(&wgpu::include_wgsl!("starfield.wgsl"));

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Starfield Pipeline"),
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
            // Particles never occlude anything; they draw first and skip the
            // depth buffer entirely.
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

    fn make_render_bundle(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        vertex_buffer: &wgpu::Buffer,
        index_buffer: &wgpu::Buffer,
        count: u32,
    ) -> wgpu::RenderBundle {
        let mut encoder =
            device.create_render_bundle_encoder(&wgpu::RenderBundleEncoderDescriptor {
                label: None,
                color_formats: &[surface_format],
                depth_stencil: Some(wgpu::RenderBundleDepthStencil {
                    format: DEPTH_FORMAT,
                    depth_read_only: false,
                    stencil_read_only: true,
                }),
                sample_count: 1,
                multiview: None,
            });

        encoder.set_pipeline(pipeline);
        encoder.set_bind_group(0, bind_group, &[]);
        encoder.set_vertex_buffer(0, vertex_buffer.slice(..));
        encoder.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        encoder.draw_indexed(0..(QUAD_INDICES.len() as _), 0, 0..count);

        encoder.finish(&wgpu::RenderBundleDescriptor {
            label: Some("Star Layer Render Bundle"),
        })
    }

    pub fn update(&self, queue: &wgpu::Queue, scene: &Scene) {
        for (state, layer) in self.layers.iter().zip(&scene.layers) {
            let uniforms = LayerUniforms::new(scene, layer, self.pulse_rate);
            queue.write_buffer(&state.uniform_buffer, 0, bytes_of(&uniforms));
        }
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.execute_bundles(self.layers.iter().map(|l| &l.render_bundle));
    }
}

pub(super) fn additive_target(format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
    wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        }),
        write_mask: wgpu::ColorWrites::ALL,
    }
}
