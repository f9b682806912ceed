//! Lifecycle coordinator.
//!
//! `Viewport` sequences attach → first-render → resize handling → teardown
//! around a continuously ticking render loop. The loop is live from
//! construction: hosts re-enter [`Viewport::tick`] on every redraw signal,
//! and frames before [`Viewport::attach`] render to the backend's unattached
//! context. All mutation is single-threaded and cooperative; a resize or a
//! toggle flip completes fully before the next frame reads camera or
//! compositor state.
//!
//! Frame-loop error policy: an error out of the render path is fatal for the
//! instance and propagates from `tick` (transient surface hiccups are
//! absorbed by the backend as skipped frames). Teardown errors never
//! propagate — every step is individually guarded so cleanup always runs to
//! completion.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::camera::{ProjectionCamera, surface_to_ndc};
use crate::compositor::CompositorPipeline;
use crate::config::ViewportOptions;
use crate::controls::OrbitControls;
use crate::device::GpuRenderer;
use crate::events::{EventBus, EventKind, Subscription, ViewportEvent};
use crate::overlay::DebugBindings;
use crate::render::{RenderBackend, RenderPath};
use crate::scene::{
    NodeId, NodeKind, SceneGraph, SceneNode, ToggleHandle, ambient_light_node, axes_helper_node,
    camera_helper_node,
};
use crate::time::{FrameClock, FrameStats};

/// Directive returned by [`Viewport::tick`]: whether the host should keep
/// scheduling frames.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameControl {
    Continue,
    Halt,
}

/// Cancel token for the render loop.
///
/// One loop per viewport, owned — never an ambient timer. Cancelling before
/// the next scheduled tick fires prevents that tick; cancelling twice is a
/// no-op.
#[derive(Debug, Default)]
pub struct FrameLoop {
    cancelled: Cell<bool>,
}

impl FrameLoop {
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// The lifecycle coordinator.
///
/// Generic over the renderer seam so the state machine is exercisable
/// without a GPU; `Viewport::new` builds the shipped wgpu backend.
pub struct Viewport<B: RenderBackend = GpuRenderer> {
    backend: B,

    scene: Rc<RefCell<SceneGraph>>,
    camera: Rc<RefCell<ProjectionCamera>>,
    compositor: CompositorPipeline,
    events: EventBus,
    clock: FrameClock,
    frame_loop: FrameLoop,
    stats: Rc<RefCell<FrameStats>>,
    controls: Rc<RefCell<OrbitControls>>,
    controls_enabled: bool,

    camera_helper: ToggleHandle,
    ambient_light: ToggleHandle,
    axes_helper: ToggleHandle,
    stats_visible: ToggleHandle,
    panel_visible: ToggleHandle,

    device_pixel_ratio: f64,
    observed: (f32, f32),

    rendered: bool,
    destroyed: bool,
    overlay_attached: bool,
}

impl Viewport<GpuRenderer> {
    /// Validates `options`, builds the wgpu backend, and starts the frame
    /// loop. The loop runs from this point on even though no output surface
    /// is attached yet.
    pub fn new(options: ViewportOptions) -> Result<Self> {
        options.validate()?;
        let backend = GpuRenderer::new(&options.renderer)?;
        Self::with_backend(options, backend)
    }
}

impl<B: RenderBackend> Viewport<B> {
    /// Builds a viewport over an explicit backend. `options` must already be
    /// consistent; this still validates to keep the fail-fast contract.
    pub fn with_backend(options: ViewportOptions, backend: B) -> Result<Self> {
        options.validate().context("invalid viewport options")?;

        let scene = Rc::new(RefCell::new(SceneGraph::new()));
        let camera = Rc::new(RefCell::new(ProjectionCamera::new(&options.camera)));
        let controls = Rc::new(RefCell::new(OrbitControls::from_camera(&camera.borrow())));

        let (light_color, light_intensity) = options.ambient_light.color_and_intensity();
        let axes_size = options.axes_helper.size();

        let (camera_helper_id, ambient_light_id, axes_helper_id) = {
            let mut scene = scene.borrow_mut();
            (scene.allocate_id(), scene.allocate_id(), scene.allocate_id())
        };

        let mut viewport = Self {
            backend,
            scene,
            camera,
            compositor: CompositorPipeline::new(options.anti_aliasing),
            events: EventBus::new(),
            clock: FrameClock::new(),
            frame_loop: FrameLoop::default(),
            stats: Rc::new(RefCell::new(FrameStats::new())),
            controls,
            controls_enabled: options.controls,
            camera_helper: ToggleHandle::new(false),
            ambient_light: ToggleHandle::new(false),
            axes_helper: ToggleHandle::new(false),
            stats_visible: ToggleHandle::new(options.stats),
            panel_visible: ToggleHandle::new(true),
            device_pixel_ratio: 1.0,
            observed: (0.0, 0.0),
            rendered: false,
            destroyed: false,
            overlay_attached: false,
        };

        if !options.controls {
            viewport.controls.borrow_mut().dispose();
        }

        // Helper toggles mutate the scene through synchronous watchers; the
        // graph's idempotent attach/detach keeps repeated sets harmless.
        viewport.wire_helper(
            &viewport.camera_helper.clone(),
            camera_helper_id,
            move |id, _| camera_helper_node(id),
        );
        viewport.wire_helper(
            &viewport.ambient_light.clone(),
            ambient_light_id,
            move |id, _| ambient_light_node(id, light_color, light_intensity),
        );
        viewport.wire_helper(
            &viewport.axes_helper.clone(),
            axes_helper_id,
            move |id, _| axes_helper_node(id, axes_size),
        );

        // Apply configured defaults through the same path the overlay uses.
        viewport.camera_helper.set(options.camera_helper);
        viewport
            .ambient_light
            .set(options.ambient_light.initially_visible());
        viewport
            .axes_helper
            .set(options.axes_helper.initially_visible());

        Ok(viewport)
    }

    fn wire_helper<F>(&self, handle: &ToggleHandle, id: NodeId, build: F)
    where
        F: Fn(NodeId, &ProjectionCamera) -> SceneNode + 'static,
    {
        let scene = Rc::clone(&self.scene);
        let camera = Rc::clone(&self.camera);
        handle.watch(move |visible| {
            if visible {
                let node = build(id, &camera.borrow());
                scene.borrow_mut().attach(node);
            } else {
                scene.borrow_mut().detach(id);
            }
        });
    }

    // ── lifecycle ────────────────────────────────────────────────────────

    /// Binds the renderer's output to a host surface, performs the first
    /// resize with the last observed size, and emits `Rendered` — once per
    /// attach call. No-op after teardown.
    pub fn attach(&mut self, target: B::AttachTarget) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }

        self.backend
            .attach(target)
            .context("failed to attach the render surface")?;
        self.resize();

        self.overlay_attached = true;
        self.rendered = true;
        self.events.emit(ViewportEvent::Rendered);
        Ok(())
    }

    /// Feeds an observed surface size (logical pixels). This is the size
    /// observer's entry point; a synchronous resize pass runs immediately.
    pub fn handle_surface_size(&mut self, width: f32, height: f32) {
        if self.destroyed {
            return;
        }
        self.observed = (width.max(0.0), height.max(0.0));
        self.resize();
    }

    /// Updates the host's device pixel ratio. Takes effect on the next
    /// resize pass.
    pub fn set_device_pixel_ratio(&mut self, ratio: f64) {
        if self.destroyed {
            return;
        }
        self.device_pixel_ratio = ratio.max(0.0);
    }

    /// The ordered resize pass. Pixel ratio and renderer size first, then
    /// compositor buffers (only while compositing), then the events — the
    /// camera projection is up to date before the next frame renders.
    fn resize(&mut self) {
        let (width, height) = self.observed;
        let ratio = effective_pixel_ratio(self.device_pixel_ratio);

        self.backend.set_pixel_ratio(ratio);
        self.backend.set_logical_size(width, height);

        if self.compositor.enabled() {
            let buffer_width = (width as f64 * ratio).round() as u32;
            let buffer_height = (height as f64 * ratio).round() as u32;
            self.compositor.resize(buffer_width, buffer_height);
            if let Err(err) = self.backend.apply_compositor_resize(&self.compositor) {
                log::error!("failed to resize compositor buffers: {err:#}");
            }
        }

        self.events.emit(ViewportEvent::Resized { width, height });

        // Zero-sized layouts skip the projection update but still announce
        // the camera pass, matching the event contract.
        self.camera.borrow_mut().set_viewport_size(width, height);
        self.events.emit(ViewportEvent::CameraUpdated);
    }

    /// Drives one frame. Hosts call this on every redraw signal and stop
    /// when `Halt` comes back.
    ///
    /// Order per tick: `PreFrame`, timing begin, render along the path
    /// selected by the compositor flag, timing end, controls update,
    /// `PostFrame`.
    pub fn tick(&mut self) -> Result<FrameControl> {
        if self.destroyed || self.frame_loop.is_cancelled() {
            return Ok(FrameControl::Halt);
        }

        let frame_time = self.clock.tick();
        self.events.emit(ViewportEvent::PreFrame);
        self.stats.borrow_mut().begin();

        {
            let scene = self.scene.borrow();
            let camera = self.camera.borrow();
            let path = if self.compositor.enabled() {
                RenderPath::Composited(&self.compositor)
            } else {
                RenderPath::Direct
            };
            self.backend.render(&scene, &camera, path)?;
        }

        self.stats.borrow_mut().end();

        if self.controls_enabled {
            let mut camera = self.camera.borrow_mut();
            self.controls
                .borrow_mut()
                .update(frame_time.delta, &mut camera);
        }

        self.events.emit(ViewportEvent::PostFrame);
        Ok(FrameControl::Continue)
    }

    /// Irreversible teardown.
    ///
    /// Steps run in order, each individually guarded: a failing step is
    /// logged and the sequence continues, so cleanup is always best-effort
    /// complete. The second call is a silent no-op, and every public
    /// operation afterwards does nothing.
    pub fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        teardown_step("clear scene graph", {
            self.scene.borrow_mut().clear();
            Ok(())
        });
        teardown_step("dispose renderer", self.backend.dispose());
        teardown_step("force context loss", self.backend.force_context_loss());
        teardown_step("cancel frame loop", {
            self.frame_loop.cancel();
            Ok(())
        });
        teardown_step("dispose controls", {
            self.controls.borrow_mut().dispose();
            Ok(())
        });
        teardown_step("detach stats overlay", {
            self.overlay_attached = false;
            self.stats.borrow_mut().reset();
            Ok(())
        });
        teardown_step("disconnect debug bindings", {
            self.camera_helper.clear_watchers();
            self.ambient_light.clear_watchers();
            self.axes_helper.clear_watchers();
            self.stats_visible.clear_watchers();
            self.panel_visible.clear_watchers();
            Ok(())
        });
        teardown_step("clear event bus", {
            self.events.clear();
            Ok(())
        });
    }

    // ── toggles & compositor ─────────────────────────────────────────────

    pub fn set_camera_helper(&mut self, visible: bool) {
        if !self.destroyed {
            self.camera_helper.set(visible);
        }
    }

    pub fn set_ambient_light(&mut self, visible: bool) {
        if !self.destroyed {
            self.ambient_light.set(visible);
        }
    }

    pub fn set_axes_helper(&mut self, visible: bool) {
        if !self.destroyed {
            self.axes_helper.set(visible);
        }
    }

    pub fn set_stats_visible(&mut self, visible: bool) {
        if !self.destroyed {
            self.stats_visible.set(visible);
        }
    }

    /// Selects the composited render path, effective on the next frame.
    /// Buffer sizes are untouched until the next resize (see
    /// [`CompositorPipeline::set_enabled`] for the sizing contract).
    pub fn set_use_composer(&mut self, enabled: bool) {
        if !self.destroyed {
            self.compositor.set_enabled(enabled);
        }
    }

    pub fn use_composer(&self) -> bool {
        self.compositor.enabled()
    }

    pub fn compositor(&self) -> &CompositorPipeline {
        &self.compositor
    }

    // ── events ───────────────────────────────────────────────────────────

    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> Subscription
    where
        F: FnMut(&ViewportEvent) + 'static,
    {
        self.events.on(kind, callback)
    }

    pub fn off(&mut self, subscription: Subscription) {
        self.events.off(subscription);
    }

    // ── scene content ────────────────────────────────────────────────────

    /// Adds host-supplied line content to the scene. Returns the node id for
    /// later removal or picking.
    pub fn add_lines(&mut self, lines: crate::scene::LineSet, name: &str) -> Option<NodeId> {
        if self.destroyed {
            return None;
        }
        let mut scene = self.scene.borrow_mut();
        let id = scene.allocate_id();
        scene.attach(SceneNode {
            id,
            name: name.to_string(),
            kind: NodeKind::Lines(lines),
        });
        Some(id)
    }

    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self.destroyed {
            return false;
        }
        self.scene.borrow_mut().detach(id)
    }

    /// Picks the first line node whose bounds the pointer ray intersects.
    /// Coordinates are surface-local logical pixels.
    pub fn pick(&self, x: f32, y: f32) -> Option<NodeId> {
        let (width, height) = self.observed;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let (ndc_x, ndc_y) = surface_to_ndc(x, y, width, height);
        let ray = self.camera.borrow().pick_ray(ndc_x, ndc_y);

        let scene = self.scene.borrow();
        scene
            .iter()
            .filter(|node| matches!(node.kind, NodeKind::Lines(_)))
            .find(|node| {
                scene
                    .node_bounds(node.id)
                    .is_some_and(|(min, max)| ray.intersects_aabb(min, max))
            })
            .map(|node| node.id)
    }

    // ── introspection ────────────────────────────────────────────────────

    pub fn scene(&self) -> Ref<'_, SceneGraph> {
        self.scene.borrow()
    }

    pub fn camera(&self) -> Ref<'_, ProjectionCamera> {
        self.camera.borrow()
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn observed_size(&self) -> (f32, f32) {
        self.observed
    }

    /// Handles for the external debug panel.
    pub fn debug_bindings(&self) -> DebugBindings {
        DebugBindings {
            camera_helper: self.camera_helper.clone(),
            ambient_light: self.ambient_light.clone(),
            axes_helper: self.axes_helper.clone(),
            stats: self.stats_visible.clone(),
            panel: self.panel_visible.clone(),
            controls: Rc::clone(&self.controls),
            frame_graph: Rc::clone(&self.stats),
        }
    }
}

/// Effective pixel ratio: at least 2x to stay crisp on dense displays, the
/// device's own ratio when that is higher.
fn effective_pixel_ratio(device_ratio: f64) -> f64 {
    device_ratio.max(2.0)
}

fn teardown_step(name: &str, result: Result<()>) {
    if let Err(err) = result {
        log::error!("teardown step `{name}` failed: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::camera::ProjectionCamera;
    use crate::compositor::{CompositorPipeline, PassSize};
    use crate::config::{AxesHelperOptions, ViewportOptions};
    use crate::render::{FrameOutcome, RenderPath};
    use crate::scene::SceneGraph;

    /// What the recording backend saw, in call order.
    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Attach,
        SetPixelRatio(f64),
        SetLogicalSize(f32, f32),
        CompositorResize(u32, u32),
        RenderDirect,
        RenderComposited(u32, u32),
        Dispose,
        ForceContextLoss,
    }

    #[derive(Default)]
    struct RecordingState {
        calls: Vec<Call>,
        fail_dispose: bool,
        fail_render: bool,
    }

    #[derive(Clone, Default)]
    struct RecordingBackend {
        state: Rc<RefCell<RecordingState>>,
    }

    impl RecordingBackend {
        fn calls(&self) -> Vec<Call> {
            self.state.borrow().calls.clone()
        }

        fn take_calls(&self) -> Vec<Call> {
            std::mem::take(&mut self.state.borrow_mut().calls)
        }
    }

    impl RenderBackend for RecordingBackend {
        type AttachTarget = ();

        fn attach(&mut self, _target: ()) -> anyhow::Result<()> {
            self.state.borrow_mut().calls.push(Call::Attach);
            Ok(())
        }

        fn set_pixel_ratio(&mut self, ratio: f64) {
            self.state.borrow_mut().calls.push(Call::SetPixelRatio(ratio));
        }

        fn set_logical_size(&mut self, width: f32, height: f32) {
            self.state
                .borrow_mut()
                .calls
                .push(Call::SetLogicalSize(width, height));
        }

        fn apply_compositor_resize(&mut self, pipeline: &CompositorPipeline) -> anyhow::Result<()> {
            let size = pipeline.buffer_size();
            self.state
                .borrow_mut()
                .calls
                .push(Call::CompositorResize(size.width, size.height));
            Ok(())
        }

        fn render(
            &mut self,
            _scene: &SceneGraph,
            _camera: &ProjectionCamera,
            path: RenderPath<'_>,
        ) -> anyhow::Result<FrameOutcome> {
            let mut state = self.state.borrow_mut();
            if state.fail_render {
                anyhow::bail!("GPU context lost");
            }
            let call = match path {
                RenderPath::Direct => Call::RenderDirect,
                RenderPath::Composited(pipeline) => {
                    let size = pipeline.buffer_size();
                    Call::RenderComposited(size.width, size.height)
                }
            };
            state.calls.push(call);
            Ok(FrameOutcome::Rendered)
        }

        fn dispose(&mut self) -> anyhow::Result<()> {
            let mut state = self.state.borrow_mut();
            state.calls.push(Call::Dispose);
            if state.fail_dispose {
                anyhow::bail!("dispose blew up");
            }
            Ok(())
        }

        fn force_context_loss(&mut self) -> anyhow::Result<()> {
            self.state.borrow_mut().calls.push(Call::ForceContextLoss);
            Ok(())
        }
    }

    fn viewport_with(options: ViewportOptions) -> (Viewport<RecordingBackend>, RecordingBackend) {
        let backend = RecordingBackend::default();
        let viewport = Viewport::with_backend(options, backend.clone()).unwrap();
        (viewport, backend)
    }

    fn viewport() -> (Viewport<RecordingBackend>, RecordingBackend) {
        viewport_with(ViewportOptions::default())
    }

    fn event_log(vp: &mut Viewport<RecordingBackend>) -> Rc<RefCell<Vec<ViewportEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            EventKind::Resized,
            EventKind::CameraUpdated,
            EventKind::Rendered,
            EventKind::PreFrame,
            EventKind::PostFrame,
        ] {
            let log = Rc::clone(&log);
            vp.on(kind, move |event| log.borrow_mut().push(*event));
        }
        log
    }

    // ── resize ───────────────────────────────────────────────────────────

    #[test]
    fn resize_recomputes_aspect_before_the_next_frame() {
        let (mut vp, _backend) = viewport();
        for (w, h) in [(800.0, 600.0), (1024.0, 768.0), (300.0, 900.0)] {
            vp.handle_surface_size(w, h);
            assert!((vp.camera().aspect() - w / h).abs() < 1e-6);
            vp.tick().unwrap();
        }
    }

    #[test]
    fn resize_call_order_is_ratio_size_events() {
        let (mut vp, backend) = viewport();
        let log = event_log(&mut vp);

        vp.set_device_pixel_ratio(1.5);
        vp.handle_surface_size(800.0, 600.0);

        // Ratio below 2 clamps up to 2.
        assert_eq!(
            backend.calls(),
            vec![
                Call::SetPixelRatio(2.0),
                Call::SetLogicalSize(800.0, 600.0),
            ]
        );
        assert_eq!(
            *log.borrow(),
            vec![
                ViewportEvent::Resized {
                    width: 800.0,
                    height: 600.0
                },
                ViewportEvent::CameraUpdated,
            ]
        );
    }

    #[test]
    fn device_ratio_above_two_wins() {
        let (mut vp, backend) = viewport();
        vp.set_device_pixel_ratio(3.0);
        vp.handle_surface_size(100.0, 100.0);
        assert_eq!(backend.calls()[0], Call::SetPixelRatio(3.0));
    }

    #[test]
    fn zero_size_resize_does_not_panic_and_recovers() {
        let (mut vp, _backend) = viewport();
        vp.handle_surface_size(800.0, 600.0);
        vp.handle_surface_size(0.0, 0.0);
        // Aspect unchanged by the degenerate step.
        assert!((vp.camera().aspect() - 800.0 / 600.0).abs() < 1e-6);
        vp.tick().unwrap();

        vp.handle_surface_size(1024.0, 768.0);
        assert!((vp.camera().aspect() - 1024.0 / 768.0).abs() < 1e-6);
    }

    // ── toggles ──────────────────────────────────────────────────────────

    #[test]
    fn construction_scenario_axes_sized_camera_helper_absent() {
        let (mut vp, _backend) = viewport_with(ViewportOptions {
            axes_helper: AxesHelperOptions::Sized(5.0),
            camera_helper: false,
            ..ViewportOptions::default()
        });

        {
            let scene = vp.scene();
            let axes = scene
                .iter()
                .find(|n| n.name == "axes-helper")
                .expect("axes helper attached");
            let NodeKind::Lines(lines) = &axes.kind else {
                panic!("axes helper carries lines");
            };
            let (_, max) = lines.bounds().unwrap();
            assert_eq!(max.x, 5.0);
            assert!(!scene.iter().any(|n| n.name == "camera-helper"));
        }

        let log = event_log(&mut vp);
        vp.handle_surface_size(800.0, 600.0);
        vp.attach(()).unwrap();

        assert!((vp.camera().aspect() - 1.3333334).abs() < 1e-4);
        let events = log.borrow();
        assert!(events.contains(&ViewportEvent::Resized {
            width: 800.0,
            height: 600.0
        }));
        assert_eq!(events.last(), Some(&ViewportEvent::Rendered));
        assert!(vp.is_rendered());
    }

    #[test]
    fn toggling_twice_mutates_the_scene_once() {
        let (mut vp, _backend) = viewport();
        let before = vp.scene().mutation_count();

        vp.set_camera_helper(true);
        let after_first = vp.scene().mutation_count();
        assert_eq!(after_first, before + 1);

        vp.set_camera_helper(true);
        assert_eq!(vp.scene().mutation_count(), after_first);

        vp.set_camera_helper(false);
        vp.set_camera_helper(false);
        assert_eq!(vp.scene().mutation_count(), after_first + 1);
    }

    #[test]
    fn toggles_take_effect_synchronously_via_bindings() {
        let (vp, _backend) = viewport();
        let bindings = vp.debug_bindings();

        assert!(!vp.scene().iter().any(|n| n.name == "camera-helper"));
        bindings.camera_helper.set(true);
        assert!(vp.scene().iter().any(|n| n.name == "camera-helper"));
        bindings.camera_helper.set(false);
        assert!(!vp.scene().iter().any(|n| n.name == "camera-helper"));
    }

    #[test]
    fn default_helpers_follow_configuration() {
        let (vp, _backend) = viewport();
        let scene = vp.scene();
        assert!(scene.iter().any(|n| n.name == "axes-helper"));
        assert!(scene.iter().any(|n| n.name == "ambient-light"));
        assert!(!scene.iter().any(|n| n.name == "camera-helper"));
    }

    // ── render loop ──────────────────────────────────────────────────────

    #[test]
    fn tick_runs_before_attach() {
        let (mut vp, backend) = viewport();
        assert_eq!(vp.tick().unwrap(), FrameControl::Continue);
        assert_eq!(backend.calls(), vec![Call::RenderDirect]);
    }

    #[test]
    fn tick_emits_pre_and_post_frame_in_order() {
        let (mut vp, _backend) = viewport();
        let log = event_log(&mut vp);
        vp.tick().unwrap();
        assert_eq!(
            *log.borrow(),
            vec![ViewportEvent::PreFrame, ViewportEvent::PostFrame]
        );
    }

    #[test]
    fn render_path_switches_on_the_next_frame() {
        let (mut vp, backend) = viewport();
        vp.tick().unwrap();
        vp.set_use_composer(true);
        vp.tick().unwrap();
        vp.set_use_composer(false);
        vp.tick().unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                Call::RenderDirect,
                Call::RenderComposited(0, 0),
                Call::RenderDirect,
            ]
        );
    }

    #[test]
    fn render_errors_propagate_from_tick() {
        let (mut vp, backend) = viewport();
        backend.state.borrow_mut().fail_render = true;
        assert!(vp.tick().is_err());
    }

    #[test]
    fn cancelled_loop_halts_without_side_effects() {
        let (mut vp, backend) = viewport();
        let log = event_log(&mut vp);
        vp.frame_loop().cancel();
        vp.frame_loop().cancel(); // idempotent
        assert_eq!(vp.tick().unwrap(), FrameControl::Halt);
        assert!(backend.calls().is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn frame_stats_record_each_tick() {
        let (mut vp, _backend) = viewport();
        let bindings = vp.debug_bindings();
        vp.tick().unwrap();
        vp.tick().unwrap();
        assert_eq!(bindings.frame_graph.borrow().total_frames(), 2);
    }

    // ── compositor sizing ────────────────────────────────────────────────

    #[test]
    fn compositor_buffers_size_on_resize_while_enabled() {
        let (mut vp, backend) = viewport();
        vp.set_device_pixel_ratio(2.0);
        vp.set_use_composer(true);
        vp.handle_surface_size(800.0, 600.0);

        assert!(backend.calls().contains(&Call::CompositorResize(1600, 1200)));
        assert_eq!(
            vp.compositor().buffer_size(),
            PassSize {
                width: 1600,
                height: 1200
            }
        );
    }

    #[test]
    fn enabling_composer_without_resize_keeps_stale_buffers() {
        let (mut vp, backend) = viewport();
        vp.handle_surface_size(800.0, 600.0);
        backend.take_calls();

        vp.set_use_composer(true);
        assert_eq!(vp.compositor().buffer_size(), PassSize::default());
        assert!(backend.calls().is_empty(), "no buffer work until a resize");

        vp.handle_surface_size(1024.0, 768.0);
        assert_eq!(
            vp.compositor().buffer_size(),
            PassSize {
                width: 2048,
                height: 1536
            }
        );
    }

    #[test]
    fn disabled_composer_skips_buffer_sizing_on_resize() {
        let (mut vp, backend) = viewport();
        vp.handle_surface_size(800.0, 600.0);
        assert!(
            !backend
                .calls()
                .iter()
                .any(|c| matches!(c, Call::CompositorResize(..)))
        );
    }

    // ── teardown ─────────────────────────────────────────────────────────

    #[test]
    fn teardown_runs_every_step_in_order() {
        let (mut vp, backend) = viewport();
        vp.handle_surface_size(800.0, 600.0);
        vp.attach(()).unwrap();
        backend.take_calls();

        vp.teardown();

        assert_eq!(backend.calls(), vec![Call::Dispose, Call::ForceContextLoss]);
        assert!(vp.is_destroyed());
        assert!(vp.frame_loop().is_cancelled());
        assert!(vp.scene().is_empty());
    }

    #[test]
    fn teardown_twice_has_no_additional_side_effects() {
        let (mut vp, backend) = viewport();
        vp.teardown();
        backend.take_calls();
        vp.teardown();
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn teardown_before_attach_completes() {
        let (mut vp, backend) = viewport();
        vp.teardown();
        assert_eq!(backend.calls(), vec![Call::Dispose, Call::ForceContextLoss]);
    }

    #[test]
    fn failing_step_does_not_stop_the_sequence() {
        let (mut vp, backend) = viewport();
        backend.state.borrow_mut().fail_dispose = true;

        vp.teardown();

        // Context loss still ran after the failed dispose, and the loop was
        // still cancelled downstream of both.
        assert_eq!(backend.calls(), vec![Call::Dispose, Call::ForceContextLoss]);
        assert!(vp.frame_loop().is_cancelled());
        assert!(vp.scene().is_empty());
    }

    #[test]
    fn operations_after_teardown_are_no_ops() {
        let (mut vp, backend) = viewport();
        let bindings = vp.debug_bindings();
        vp.teardown();
        backend.take_calls();

        assert_eq!(vp.tick().unwrap(), FrameControl::Halt);
        vp.handle_surface_size(640.0, 480.0);
        vp.attach(()).unwrap();
        vp.set_camera_helper(true);
        vp.set_use_composer(true);
        assert!(vp.add_lines(crate::scene::LineSet::new(), "late").is_none());

        assert!(backend.calls().is_empty());
        assert!(vp.scene().is_empty());

        // Watchers were disconnected: panel writes flip the flag but no
        // longer reach the scene.
        bindings.axes_helper.set(true);
        bindings.axes_helper.set(false);
        assert!(vp.scene().is_empty());
    }

    #[test]
    fn subscribers_detach_on_teardown() {
        let (mut vp, _backend) = viewport();
        let log = event_log(&mut vp);
        vp.teardown();
        vp.handle_surface_size(100.0, 100.0);
        assert!(log.borrow().is_empty());
    }

    // ── events & misc ────────────────────────────────────────────────────

    #[test]
    fn rendered_fires_once_per_attach() {
        let (mut vp, _backend) = viewport();
        let hits = Rc::new(RefCell::new(0));
        let h = Rc::clone(&hits);
        vp.on(EventKind::Rendered, move |_| *h.borrow_mut() += 1);

        vp.handle_surface_size(800.0, 600.0);
        vp.attach(()).unwrap();
        assert_eq!(*hits.borrow(), 1);

        vp.handle_surface_size(900.0, 600.0);
        vp.tick().unwrap();
        assert_eq!(*hits.borrow(), 1, "resizes and ticks never re-emit it");
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let (mut vp, _backend) = viewport();
        let hits = Rc::new(RefCell::new(0));
        let h = Rc::clone(&hits);
        let sub = vp.on(EventKind::PreFrame, move |_| *h.borrow_mut() += 1);
        vp.tick().unwrap();
        vp.off(sub);
        vp.tick().unwrap();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn pick_finds_host_lines_under_the_pointer() {
        let (mut vp, _backend) = viewport();
        vp.handle_surface_size(800.0, 600.0);

        // A small box of lines straight ahead of the default camera pose
        // (camera orbits toward the origin).
        let mut lines = crate::scene::LineSet::new();
        lines.segment(
            glam::Vec3::new(-0.5, -0.5, -0.5),
            glam::Vec3::new(0.5, 0.5, 0.5),
            [1.0; 4],
        );
        let id = vp.add_lines(lines, "probe").unwrap();

        // Center of the surface looks at the target (origin).
        assert_eq!(vp.pick(400.0, 300.0), Some(id));
        assert_eq!(vp.pick(0.0, 0.0), None);
    }

    #[test]
    fn invalid_options_fail_fast() {
        let mut options = ViewportOptions::default();
        options.camera.near = 0.0;
        assert!(Viewport::with_backend(options, RecordingBackend::default()).is_err());
    }
}
