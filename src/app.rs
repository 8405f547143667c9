use anyhow::Result;
use chrono::prelude::*;
use log::info;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    window::Window,
};

use crate::{
    assets::{AssetLoader, Slot},
    config::SkyConfig,
    renderer::Renderer,
    sky::Sky,
};

/// Device pixel ratios above this are clamped to bound the surface size.
const MAX_PIXEL_RATIO: f64 = 2.0;

/// Frame clamp for stalls (tab in background, window drag); dt never exceeds
/// this, so tweens cannot jump a whole cycle in one frame.
const MAX_FRAME_SECS: f32 = 0.1;

pub struct App {
    window: Window,
    sky: Sky,
    renderer: Renderer,
    loader: Option<AssetLoader>,
    last_frame_millis: i64,
}

impl App {
    pub async fn new(window: Window, config: SkyConfig) -> Result<Self> {
        let (width, height) = Self::surface_size(&window);
        let aspect_ratio = width as f32 / height as f32;
        let logical_width = window.inner_size().width as f64 / window.scale_factor();

        let seed = Local::now().timestamp_millis() as u64;
        let mut sky = Sky::new(&config, aspect_ratio, seed);
        sky.on_resize(logical_width, aspect_ratio);

        let renderer =
            Renderer::new(&window, &sky.scene, config.pulse_rate, (width, height)).await?;

        let mut requests = vec![
            (Slot::CardFront, config.card.front.clone()),
            (Slot::CardBack, config.card.back.clone()),
        ];
        for (index, layer) in config.layers.iter().enumerate() {
            if let Some(path) = &layer.sprite {
                requests.push((Slot::Sprite(index), path.clone()));
            }
        }
        let loader = AssetLoader::spawn(requests);

        Ok(Self {
            window,
            sky,
            renderer,
            loader: Some(loader),
            last_frame_millis: Local::now().timestamp_millis(),
        })
    }

    /// Window size in pixels, with the pixel ratio capped at 2x.
    fn surface_size(window: &Window) -> (u32, u32) {
        let physical = window.inner_size();
        let shrink = (MAX_PIXEL_RATIO / window.scale_factor()).min(1.0);
        (
            ((physical.width as f64 * shrink) as u32).max(1),
            ((physical.height as f64 * shrink) as u32).max(1),
        )
    }

    pub fn on_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }

        let (width, height) = Self::surface_size(&self.window);
        let logical_width = size.width as f64 / self.window.scale_factor();

        self.sky
            .on_resize(logical_width, width as f32 / height as f32);
        self.renderer.resize(width, height);
    }

    pub fn on_cursor_move(&mut self, position: PhysicalPosition<f64>) {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return;
        }
        let x = position.x / size.width as f64 * 2.0 - 1.0;
        let y = -(position.y / size.height as f64 * 2.0 - 1.0);
        self.sky.on_cursor_move(x as f32, y as f32);
    }

    pub fn on_click(&mut self) {
        self.sky.on_click();
    }

    pub fn render(&mut self) {
        if !self.sky.is_running() {
            return;
        }

        if let Some(mut loader) = self.loader.take() {
            match loader.poll() {
                Some(assets) => {
                    self.renderer.upload_textures(assets);
                    self.sky.mark_textures_ready();
                    info!("All textures resolved, starting to draw");
                }
                None => self.loader = Some(loader),
            }
        }

        let now = Local::now().timestamp_millis();
        let dt = ((now - self.last_frame_millis) as f32 * 0.001).min(MAX_FRAME_SECS);
        self.last_frame_millis = now;

        if self.sky.advance_frame(dt) {
            self.renderer.render(&self.sky.scene);
        }
    }

    pub fn shutdown(&mut self) {
        self.sky.shutdown();
    }
}
