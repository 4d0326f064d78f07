use crate::keys::key_name;
use anyhow::{Result, anyhow};
use pixels::{Pixels, SurfaceTexture};
use rivalry_core::Phase;
use rivalry_experiment::{ExperimentConfig, Participant, RivalrySession, SessionEvent};
use rivalry_render::{FrameView, RendererOptions, SkiaRenderer, load_font};
use rivalry_timing::{HighPrecisionTimer, Timer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{Fullscreen, Window, WindowId},
};

const WINDOWED_SIZE: PhysicalSize<u32> = PhysicalSize::new(1280, 720);

pub struct App {
    config: ExperimentConfig,
    participant: Participant,

    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    session: Option<RivalrySession<HighPrecisionTimer>>,
    renderer: Option<SkiaRenderer>,
    current_size: Option<PhysicalSize<u32>>,
    scale_factor: f64,
    refresh_rate: Option<f64>,
    last_present: Option<u64>,

    failure: Option<anyhow::Error>,
    should_exit: bool,
}

impl App {
    pub fn new(config: ExperimentConfig, participant: Participant) -> Self {
        Self {
            config,
            participant,
            window: None,
            pixels: None,
            session: None,
            renderer: None,
            current_size: None,
            scale_factor: 1.0,
            refresh_rate: None,
            last_present: None,
            failure: None,
            should_exit: false,
        }
    }

    /// Runs the event loop until the session is over. Returns where the
    /// session output was written.
    pub fn run(mut self) -> Result<Option<PathBuf>> {
        let event_loop = EventLoop::new()?;
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting binocular rivalry session"
        );

        event_loop.run_app(&mut self)?;

        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        Ok(self.session.and_then(|s| s.saved_to))
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("No monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let mut window_attributes = Window::default_attributes()
            .with_title("Binocular rivalry")
            .with_resizable(false);
        window_attributes = if self.config.screen.fullscreen {
            window_attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(
                primary_monitor.clone(),
            ))))
        } else {
            window_attributes.with_inner_size(WINDOWED_SIZE)
        };

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        self.current_size = Some(physical_size);
        self.scale_factor = window.scale_factor();

        info!(
            width = physical_size.width,
            height = physical_size.height,
            scale_factor = self.scale_factor,
            refresh_hz = ?self.refresh_rate,
            "display configured"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);

        // visual angle follows the physical monitor, not the window
        let monitor = self.config.monitor(primary_monitor.size().width);
        debug!(
            params = ?self.config.anaglyph_params(&monitor),
            px_per_deg = monitor.pixels_per_degree(),
            "stimulus geometry"
        );
        let stimuli = self.config.build_stimuli(&monitor)?;

        let options = RendererOptions {
            background: self.config.screen.background,
            show_checker_cross: self.config.stimuli.show_checker_cross,
            font: load_font(self.config.screen.font_path.as_deref()),
            continue_key: self.config.responses.continue_key.clone(),
        };
        self.renderer = Some(SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            &stimuli,
            options,
        )?);

        let framerate = self.config.framerate(self.refresh_rate);
        self.session = Some(RivalrySession::new(
            self.config.clone(),
            self.participant,
            HighPrecisionTimer::new(),
            framerate,
        ));

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);

        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer), Some(session)) = (
            self.pixels.as_mut(),
            self.renderer.as_mut(),
            self.session.as_mut(),
        ) else {
            return Ok(());
        };

        let phase = *session.current_phase();
        let view = FrameView {
            rotation: session.rotation(),
            progress: Some(session.run_progress()),
        };
        let stats = renderer.render_frame(&phase, &view, pixels.frame_mut(), &session.timer)?;
        pixels.render()?;

        if let Some(previous) = self.last_present {
            let frame_time = session.timer.elapsed(previous);
            session.timer.record_frame(frame_time);
        }
        self.last_present = Some(session.timer.now());

        if phase.presents_stimulus() {
            session.advance_frame();
        }

        trace!(
            clear_ms = stats.clear.as_secs_f64() * 1e3,
            phase_ms = stats.phase.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            total_ms = stats.total.as_secs_f64() * 1e3,
            "frame rendered"
        );

        for event in session.update() {
            session.handle_event(event)?;
        }
        Ok(())
    }

    fn send(&mut self, event: SessionEvent) -> Result<()> {
        if let Some(session) = self.session.as_mut() {
            session.handle_event(event)?;
        }
        Ok(())
    }

    fn handle_input(&mut self, key: PhysicalKey) -> Result<()> {
        let PhysicalKey::Code(code) = key else {
            return Ok(());
        };
        match key_name(code) {
            Some(name) => self.send(SessionEvent::KeyPressed(name.to_string())),
            None => {
                debug!(?code, "unmapped key");
                Ok(())
            }
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        if new_size.width == 0 || new_size.height == 0 || self.current_size == Some(new_size) {
            return Ok(());
        }
        self.current_size = Some(new_size);
        if let Some(pixels) = &mut self.pixels {
            pixels.resize_surface(new_size.width, new_size.height)?;
            pixels.resize_buffer(new_size.width, new_size.height)?;
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size.width, new_size.height)?;
        }
        info!(width = new_size.width, height = new_size.height, "display resized");
        Ok(())
    }

    fn session_finished(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_finished())
    }

    /// Stops the loop, keeping the first error for [`App::run`].
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        self.cleanup_and_exit(event_loop);
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        if let Some(session) = self.session.as_mut() {
            save_before_exit(session);
            let (completed, planned) = session.run_progress();
            info!(completed, planned, "experiment completed");
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

/// Stops an unfinished session and makes sure its runs reach the disk,
/// falling back to the working directory when the output directory fails.
fn save_before_exit<T: Timer<Timestamp = u64>>(session: &mut RivalrySession<T>) {
    if !session.is_saved() {
        if let Err(e) = session.handle_event(SessionEvent::Closed) {
            error!("{e}");
        }
    }
    if session.is_saved() {
        return;
    }
    match session.save_to(Path::new(".")) {
        Ok(path) => warn!(path = %path.display(), "session output written to the working directory"),
        Err(e) => error!(runs = session.event_array.len(), "session output lost: {e}"),
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.fail(event_loop, e.context("failed to create window and surface"));
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if self.should_exit {
            return;
        }
        let result = match event {
            WindowEvent::CloseRequested => {
                warn!("window closed");
                self.send(SessionEvent::Closed)
            }
            WindowEvent::RedrawRequested => {
                let result = self.redraw();
                if let Some(win) = &self.window {
                    win.request_redraw();
                }
                result
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                self.handle_input(event.physical_key)
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                match self.window.as_ref().map(|w| w.inner_size()) {
                    Some(size) => self.handle_resize(size),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        };

        match result {
            Err(e) => self.fail(event_loop, e),
            Ok(()) if self.session_finished() => self.cleanup_and_exit(event_loop),
            Ok(()) => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
