use anyhow::Result;
use log::debug;
use pollster::FutureExt as _;
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, MouseButton, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

mod animation;
mod app;
mod assets;
mod config;
mod entity;
mod field;
mod renderer;
mod sky;

use app::App;
use config::SkyConfig;

fn main() -> Result<()> {
    env_logger::init();

    let event_loop = EventLoop::new();

    let window = WindowBuilder::new()
        .with_title("paper comet")
        .with_inner_size(LogicalSize::<u32> {
            width: 960,
            height: 540,
        })
        .build(&event_loop)?;

    let mut app = App::new(window, SkyConfig::default()).block_on()?;

    event_loop.run(move |e, _, control_flow| {
        debug!("{:#?}", e);

        match e {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    app.shutdown();
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(size) => app.on_resize(size),
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    app.on_resize(*new_inner_size)
                }
                WindowEvent::CursorMoved { position, .. } => app.on_cursor_move(position),
                WindowEvent::MouseInput {
                    state: ElementState::Released,
                    button: MouseButton::Left,
                    ..
                } => app.on_click(),
                _ => (),
            },
            Event::MainEventsCleared => app.render(),
            Event::LoopDestroyed => app.shutdown(),
            _ => (),
        }
    });
}
