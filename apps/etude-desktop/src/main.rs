mod panel;

use anyhow::Result;
use clap::Parser;
use egui::Context as EguiContext;
use etude_render_wgpu::{RenderInput, WgpuRenderer};
use etude_stage::{OrbitInput, SceneSummary, Stage, StageConfig, StageEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "etude-desktop", about = "Etude scene in a desktop window")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Stage config file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset directory, overrides the config
    #[arg(long)]
    assets: Option<PathBuf>,
}

/// Pixels of wheel travel per zoom step.
const PIXELS_PER_ZOOM_STEP: f64 = 50.0;

enum Drag {
    Rotate,
    Pan,
}

struct GpuApp {
    stage: Option<Stage>,
    started: Instant,
    drag: Option<Drag>,
    cursor: Option<PhysicalPosition<f64>>,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    config: Option<wgpu::SurfaceConfiguration>,
    renderer: Option<WgpuRenderer>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
}

impl GpuApp {
    fn new(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            started: Instant::now(),
            drag: None,
            cursor: None,
            window: None,
            surface: None,
            device: None,
            queue: None,
            config: None,
            renderer: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
        }
    }

    fn redraw(&mut self) {
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        let report = stage.frame();
        if let Some(outcome) = &report.model {
            tracing::debug!(?outcome, "model request resolved");
        }

        let (Some(surface), Some(device), Some(queue), Some(config)) =
            (&self.surface, &self.device, &self.queue, &self.config)
        else {
            return;
        };

        let output = match surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.configure(device, config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Some(renderer) = &mut self.renderer {
            renderer.sync_textures(device, queue, stage.textures());
            renderer.render(
                device,
                queue,
                &view,
                &RenderInput {
                    scene: stage.scene(),
                    camera: stage.camera(),
                    clear_color: stage.renderer_settings().clear_color,
                    time: self.started.elapsed().as_secs_f32(),
                },
            );
        }

        let (Some(window), Some(egui_winit), Some(egui_renderer)) =
            (&self.window, &mut self.egui_winit, &mut self.egui_renderer)
        else {
            output.present();
            return;
        };

        let raw_input = egui_winit.take_egui_input(window);
        let mut changes = Vec::new();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            changes = panel::controls(ctx, stage.options(), Some(&report));
        });
        for change in changes {
            stage.handle(StageEvent::OptionChanged(change));
        }
        egui_winit.handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        egui_renderer.update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }

        output.present();
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(stage) = self.stage.take() {
            tracing::info!("{}", SceneSummary::capture(&stage));
            stage.dispose();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let Some(stage) = self.stage.as_mut() else {
            return;
        };

        let window_config = &stage.config().window;
        let attrs = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("create surface");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("find adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("etude_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .expect("create device");

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        stage.handle(StageEvent::Resized {
            width: config.width,
            height: config.height,
        });

        let renderer = WgpuRenderer::new(&device, &queue, surface_format, config.width, config.height);

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        self.window = Some(window);
        self.surface = Some(surface);
        self.device = Some(device);
        self.queue = Some(queue);
        self.config = Some(config);
        self.renderer = Some(renderer);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Pointer and resize always reach the stage; orbit input only when
        // the panel does not want it.
        let consumed = match (&mut self.egui_winit, &self.window) {
            (Some(egui_winit), Some(window)) => egui_winit.on_window_event(window, &event).consumed,
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(surface), Some(device), Some(config)) =
                    (&self.surface, &self.device, &mut self.config)
                {
                    config.width = new_size.width.max(1);
                    config.height = new_size.height.max(1);
                    surface.configure(device, config);
                    if let Some(renderer) = &mut self.renderer {
                        renderer.resize(device, config.width, config.height);
                    }
                }
                if let Some(stage) = self.stage.as_mut() {
                    stage.handle(StageEvent::Resized {
                        width: new_size.width,
                        height: new_size.height,
                    });
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let Some(stage) = self.stage.as_mut() else {
                    return;
                };
                stage.handle(StageEvent::PointerMoved {
                    x: position.x as f32,
                    y: position.y as f32,
                });
                if let (Some(drag), Some(last)) = (&self.drag, self.cursor) {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    let input = match drag {
                        Drag::Rotate => OrbitInput::Rotate { dx, dy },
                        Drag::Pan => OrbitInput::Pan { dx, dy },
                    };
                    stage.handle(StageEvent::Orbit(input));
                }
                self.cursor = Some(position);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if state == ElementState::Released {
                    self.drag = None;
                } else if !consumed {
                    self.drag = match button {
                        MouseButton::Left => Some(Drag::Rotate),
                        MouseButton::Right => Some(Drag::Pan),
                        _ => None,
                    };
                }
            }
            WindowEvent::MouseWheel { delta, .. } if !consumed => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_ZOOM_STEP) as f32,
                };
                if let Some(stage) = self.stage.as_mut() {
                    stage.handle(StageEvent::Orbit(OrbitInput::Zoom(steps)));
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    tracing::info!("etude-desktop starting");

    let mut config = match &cli.config {
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    if let Some(root) = cli.assets {
        config = config.with_asset_root(root);
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(Stage::new(config));
    event_loop.run_app(&mut app)?;

    Ok(())
}
