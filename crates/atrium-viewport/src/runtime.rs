//! winit adapter.
//!
//! Realizes the host lifecycle hooks for a real window: `resumed` attaches
//! the viewport, `Resized`/`ScaleFactorChanged` feed the size observer,
//! `RedrawRequested` drives one tick and reschedules, and window close tears
//! the viewport down. Pointer input is forwarded to the orbit controls; a
//! few debug keys flip the overlay toggles.

use std::sync::Arc;

use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::device::GpuRenderer;
use crate::overlay::DebugBindings;
use crate::viewport::{FrameControl, Viewport};

/// Window configuration for the runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "atrium".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Entry point: runs `viewport` inside a winit event loop until the window
/// closes, Escape is pressed, or a frame fails.
pub struct ViewportRuntime;

impl ViewportRuntime {
    pub fn run(viewport: Viewport<GpuRenderer>, config: RuntimeConfig) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let bindings = viewport.debug_bindings();
        let mut host = HostState {
            config,
            viewport,
            bindings,
            window: None,
            pointer: None,
            dragging: false,
        };

        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")?;
        Ok(())
    }
}

struct HostState {
    config: RuntimeConfig,
    viewport: Viewport<GpuRenderer>,
    bindings: DebugBindings,
    window: Option<Arc<Window>>,

    pointer: Option<(f32, f32)>,
    dragging: bool,
}

impl HostState {
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.viewport.teardown();
        event_loop.exit();
    }

    fn feed_window_size(&mut self, window: &Window) {
        let scale = window.scale_factor();
        let logical: LogicalSize<f64> = window.inner_size().to_logical(scale);
        self.viewport.set_device_pixel_ratio(scale);
        self.viewport
            .handle_surface_size(logical.width as f32, logical.height as f32);
    }

    fn handle_key(&mut self, code: KeyCode, event_loop: &ActiveEventLoop) {
        match code {
            KeyCode::Escape => self.shutdown(event_loop),
            KeyCode::KeyA => {
                let current = self.bindings.axes_helper.get();
                self.bindings.axes_helper.set(!current);
            }
            KeyCode::KeyH => {
                let current = self.bindings.camera_helper.get();
                self.bindings.camera_helper.set(!current);
            }
            KeyCode::KeyL => {
                let current = self.bindings.ambient_light.get();
                self.bindings.ambient_light.set(!current);
            }
            KeyCode::KeyC => {
                let enabled = !self.viewport.use_composer();
                self.viewport.set_use_composer(enabled);
                log::info!("composited rendering: {enabled}");
            }
            KeyCode::KeyR => {
                let mut controls = self.bindings.controls.borrow_mut();
                let enabled = !controls.auto_rotate();
                controls.set_auto_rotate(enabled);
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for HostState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("failed to create window: {err}");
                self.shutdown(event_loop);
                return;
            }
        };

        self.feed_window_size(&window);
        if let Err(err) = self.viewport.attach(Arc::clone(&window)) {
            log::error!("failed to attach viewport: {err:#}");
            self.shutdown(event_loop);
            return;
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw; the viewport's loop decides when to halt.
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = self.window.clone() {
                    self.feed_window_size(&window);
                    window.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => match self.viewport.tick() {
                Ok(FrameControl::Continue) => {
                    if let Some(window) = self.window.as_ref() {
                        window.request_redraw();
                    }
                }
                Ok(FrameControl::Halt) => event_loop.exit(),
                Err(err) => {
                    // Fatal-by-default frame policy: surface the error, then
                    // make sure cleanup still runs.
                    log::error!("frame failed: {err:#}");
                    self.shutdown(event_loop);
                }
            },

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && let PhysicalKey::Code(code) = event.physical_key
                {
                    self.handle_key(code, event_loop);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.dragging = state == ElementState::Pressed;
                }
            }

            WindowEvent::CursorLeft { .. } => {
                self.dragging = false;
                self.pointer = None;
            }

            WindowEvent::CursorMoved { position, .. } => {
                let scale = self
                    .window
                    .as_ref()
                    .map_or(1.0, |window| window.scale_factor());
                let logical = position.to_logical::<f64>(scale);
                let current = (logical.x as f32, logical.y as f32);

                if self.dragging
                    && let Some((px, py)) = self.pointer
                {
                    // Full-width drag sweeps half a revolution.
                    let (width, _) = self.viewport.observed_size();
                    let k = std::f32::consts::PI / width.max(1.0);
                    self.bindings
                        .controls
                        .borrow_mut()
                        .rotate_by((current.0 - px) * k, (current.1 - py) * k);
                }
                self.pointer = Some(current);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 60.0,
                };
                let factor = (1.0 - steps * 0.1).clamp(0.5, 2.0);
                self.bindings.controls.borrow_mut().dolly(factor);
            }

            _ => {}
        }
    }
}
