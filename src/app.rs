//! Window and event loop.
//!
//! One thread does everything: winit delivers events, [`App`] advances the
//! scene and records a single render pass per `RedrawRequested`. Start-up
//! blocks on the tokio runtime until every asset is loaded; a load failure
//! closes the loop and is returned from [`run`].

use std::{iter, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::DemoConfig,
    context::Context,
    gpu::wgpu_backend::{WgpuBackend, WgpuPass},
    render::{FpsTracker, Renderer},
    scene::Scene,
};

struct AppState {
    ctx: Context,
    scene: Scene<WgpuBackend>,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &DemoConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config.clear_colour).await?;
        let (width, height) = ctx.size();
        let scene = Scene::load(&ctx.backend, config, width, height).await?;
        Ok(Self {
            ctx,
            scene,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.scene.resize(width, height);
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self, renderer: &mut Renderer) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let backend = &self.ctx.backend;
        let mut encoder = backend
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            let mut commands = WgpuPass::new(&mut render_pass, backend);
            renderer.begin_frame();
            self.scene.draw(renderer, &mut commands);
            let state = commands.finish();
            debug_assert!(state.is_clear(), "frame ended with bindings left");
        }

        backend.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: DemoConfig,
    state: Option<AppState>,
    renderer: Renderer,
    fps: FpsTracker,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: DemoConfig) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            config,
            state: None,
            renderer: Renderer::new(),
            fps: FpsTracker::new(),
            last_time: Instant::now(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("start-up failed: {error:#}");
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes().with_title(&self.config.window_title);
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match self
            .async_runtime
            .block_on(AppState::new(window, &self.config))
        {
            Ok(mut state) => {
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
                self.last_time = Instant::now();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt: Duration = self.last_time.elapsed();
                self.last_time = Instant::now();
                let dt = dt.as_secs_f32();

                state.scene.update(dt);
                match state.render(&mut self.renderer) {
                    Ok(()) => {
                        if let Some(fps) = self.fps.tick(dt) {
                            let stats = self.renderer.stats();
                            log::info!(
                                "{} fps (best {}), {} draws, {} triangles per frame",
                                fps,
                                self.fps.highest(),
                                stats.draws,
                                stats.triangles
                            );
                        }
                    }
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Open the window and run the demo until it is closed.
pub fn run(config: DemoConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
