use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::AppConfig;
use crate::content::load_content;
use crate::error::{Error, Result};
use crate::frame::SceneContext;
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::overlay::{OverlayInput, OverlayRenderer};
use crate::render::{DepthPrepassRenderer, FrameInput};
use crate::scene::{SceneGraph, SceneLoadTask};

/// Open the window and run the viewer until it is closed.
///
/// Content is loaded and validated before the window opens, so a malformed content
/// file fails here rather than mid-frame.
///
/// # Example
/// ```no_run
/// let config = planetfolio::AppConfig::new().title("Portfolio").size(1280, 720);
/// planetfolio::run(config).unwrap();
/// ```
pub fn run(config: AppConfig) -> Result<()> {
    config.validate()?;
    let records = load_content(config.assets.content.as_deref())?;
    tracing::info!(items = records.len(), "content loaded");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = PlanetApp::Pending {
        context: Some(SceneContext::new(config, records)),
    };
    event_loop.run_app(&mut app)?;

    match app {
        PlanetApp::Failed(e) => Err(e),
        _ => Ok(()),
    }
}

enum PlanetApp {
    Pending { context: Option<SceneContext> },
    Running(Box<Running>),
    Failed(Error),
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: DepthPrepassRenderer,
    overlay: OverlayRenderer,
    context: SceneContext,
    input: Input,
    loader: SceneLoadTask,
    /// Stand-in graph drawn while the scene is loading.
    empty_graph: SceneGraph,
    start_time: Instant,
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, mut context: SceneContext) -> Result<Self> {
        let window_config = &context.config().window;
        let window_attrs = WindowAttributes::default()
            .with_title(&window_config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                window_config.width,
                window_config.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| Error::Window(e.to_string()))?,
        );

        let gpu = GpuContext::new(window.clone())?;
        let renderer = DepthPrepassRenderer::new(&gpu);
        let overlay = OverlayRenderer::new(&gpu, &context.config().assets);
        let loader = SceneLoadTask::spawn(context.config().assets.clone())?;

        // The window may not have opened at the requested size.
        context.request_resize(gpu.width(), gpu.height());

        Ok(Self {
            window,
            gpu,
            renderer,
            overlay,
            context,
            input: Input::new(),
            loader,
            empty_graph: SceneGraph::new(),
            start_time: Instant::now(),
        })
    }

    fn poll_scene(&mut self) {
        match self.loader.poll() {
            Some(Ok(scene)) => {
                self.renderer.upload_scene(&self.gpu, &scene);
                self.context.install_scene(scene);
            }
            Some(Err(e)) => tracing::error!(error = %e, "scene failed to load"),
            None => {}
        }
    }

    fn redraw(&mut self) {
        self.poll_scene();

        let time = self.start_time.elapsed().as_secs_f64();
        let report = self.context.tick(time);
        for event in &report.events {
            tracing::debug!(?event, "interaction");
        }

        let (width, height) = self.context.viewport();
        self.overlay.prepare(&OverlayInput {
            report: &report,
            records: self.context.records(),
            states: &self.context.config().states,
            width: width as f32,
            height: height as f32,
        });

        let frame = FrameInput {
            graph: self.context.graph().unwrap_or(&self.empty_graph),
            camera: self.context.camera(),
            materials: self.context.materials(),
            clear_color: self.context.config().shading.clear_color,
        };
        let overlay = &self.overlay;
        match self
            .renderer
            .render(&self.gpu, &frame, |gpu, pass| overlay.render(gpu, pass))
        {
            Ok(submitted) => tracing::trace!(submitted, "frame rendered"),
            Err(e) => tracing::error!(error = %e, "frame skipped"),
        }
    }
}

impl ApplicationHandler for PlanetApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let PlanetApp::Pending { context } = self else {
            return;
        };
        let Some(context) = context.take() else {
            return;
        };
        match Running::start(event_loop, context) {
            Ok(running) => {
                running.window.request_redraw();
                *self = PlanetApp::Running(Box::new(running));
            }
            Err(e) => {
                tracing::error!(error = %e, "startup failed");
                event_loop.exit();
                *self = PlanetApp::Failed(e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let PlanetApp::Running(running) = self else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.gpu.resize(size.width, size.height);
                running.context.request_resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                running.redraw();
                running.window.request_redraw();
            }
            event => {
                if let Some(action) = running.input.handle_event(&event) {
                    running.context.apply_input(action);
                }
            }
        }
    }
}
