mod card;
mod starfield;
mod trail;

use std::num::NonZeroU32;

use anyhow::{Context, Result};
use glam::{const_vec3, Mat4, Vec3};
use image::RgbaImage;
use log::warn;

use crate::{
    assets::{LoadedAsset, Slot},
    entity::{Camera, Scene},
};

use card::CardPass;
use starfield::StarfieldPass;
use trail::TrailPass;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Night-sky clear color, linear.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.002,
    g: 0.004,
    b: 0.016,
    a: 1.0,
};

/// Unit quad shared by every pass; particles billboard it, the card scales it.
const QUAD_VERTICES: [Vec3; 4] = [
    const_vec3!([-0.5, -0.5, 0.]),
    const_vec3!([-0.5, 0.5, 0.]),
    const_vec3!([0.5, -0.5, 0.]),
    const_vec3!([0.5, 0.5, 0.]),
];
const QUAD_INDICES: [u16; 6] = [0, 2, 1, 1, 2, 3];

fn projection_matrix(camera: &Camera) -> Mat4 {
    Mat4::perspective_lh(
        camera.fov.to_radians(),
        camera.aspect_ratio,
        camera.near,
        camera.far,
    )
}

fn view_matrix(camera: &Camera) -> Mat4 {
    let position = camera.transform.position;
    let center = position + camera.transform.rotation * Vec3::Z;
    Mat4::look_at_lh(position, center, Vec3::Y)
}

pub struct Renderer {
    surface: wgpu::Surface,
    surface_format: wgpu::TextureFormat,
    device: wgpu::Device,
    queue: wgpu::Queue,
    depth_texture_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    starfield: StarfieldPass,
    trail: TrailPass,
    card: CardPass,
}

impl Renderer {
    pub async fn new(
        window: &winit::window::Window,
        scene: &Scene,
        pulse_rate: f32,
        (width, height): (u32, u32),
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
        let surface = unsafe { instance.create_surface(window) };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No adapter found")?;

        let surface_format = surface
            .get_preferred_format(&adapter)
            .context("No preferred format found")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .context("No device found")?;

        Self::configure_surface(&surface, &device, surface_format, width, height);
        let depth_texture_view = Self::create_depth_texture_view(&device, width, height);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bilinear Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Every texture slot starts blank and is swapped in when (and if)
        // its image decodes.
        let blank = blank_texture_view(&device, &queue);

        let starfield = StarfieldPass::new(&device, surface_format, pulse_rate, &sampler, &blank, scene);
        let trail = TrailPass::new(&device, surface_format, &sampler, &blank, &scene.trails);
        let card = CardPass::new(&device, surface_format, &sampler, &blank, &blank);

        Ok(Self {
            surface,
            surface_format,
            device,
            queue,
            depth_texture_view,
            sampler,
            starfield,
            trail,
            card,
        })
    }

    fn configure_surface(
        surface: &wgpu::Surface,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) {
        surface.configure(
            device,
            &wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width,
                height,
                present_mode: wgpu::PresentMode::Fifo,
            },
        )
    }

    fn create_depth_texture_view(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        });
        texture.create_view(&Default::default())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        Self::configure_surface(
            &self.surface,
            &self.device,
            self.surface_format,
            width,
            height,
        );
        self.depth_texture_view = Self::create_depth_texture_view(&self.device, width, height);
    }

    /// Swaps the blank placeholders for the decoded images. Slots whose load
    /// failed keep the placeholder.
    pub fn upload_textures(&mut self, assets: Vec<LoadedAsset>) {
        let mut front = None;
        let mut back = None;
        for asset in assets {
            let image = match asset.image {
                Some(image) => image,
                None => continue,
            };
            let view = upload_rgba(&self.device, &self.queue, &image);
            match asset.slot {
                Slot::CardFront => front = Some(view),
                Slot::CardBack => back = Some(view),
                Slot::Sprite(layer) => {
                    self.starfield
                        .set_sprite(&self.device, &self.sampler, layer, &view);
                    if layer == 0 {
                        self.trail.set_sprite(&self.device, &self.sampler, &view);
                    }
                }
            }
        }
        if front.is_some() || back.is_some() {
            self.card
                .set_textures(&self.device, &self.sampler, front, back);
        }
    }

    /// Draws one frame: star layers, then trails, then the card, in a single
    /// pass so the ordering is fixed.
    pub fn render(&mut self, scene: &Scene) {
        self.starfield.update(&self.queue, scene);
        self.trail.update(&self.queue, scene);
        self.card.update(&self.queue, scene);

        let surface_texture = self
            .surface
            .get_current_texture()
            .expect("Failed to get next surface texture");
        let surface_texture_view = surface_texture.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Command Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sky Render Pass"),
                color_attachments: &[wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: true,
                    },
                }],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });

            self.starfield.draw(&mut render_pass);
            self.trail.draw(&mut render_pass);
            self.card.draw(&mut render_pass);
        }

        self.queue.submit(Some(encoder.finish()));

        surface_texture.present();
    }
}

fn upload_rgba(device: &wgpu::Device, queue: &wgpu::Queue, image: &RgbaImage) -> wgpu::TextureView {
    let (width, height) = image.dimensions();
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Image Texture"),
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
    });

    let bytes_per_row = match NonZeroU32::new(4 * width) {
        Some(n) => Some(n),
        None => {
            warn!("Zero-width image, leaving texture blank");
            return texture.create_view(&Default::default());
        }
    };

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row,
            rows_per_image: NonZeroU32::new(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    texture.create_view(&Default::default())
}

/// 1x1 white placeholder bound wherever an image has not arrived.
fn blank_texture_view(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
    let image = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
    upload_rgba(device, queue, &image)
}
