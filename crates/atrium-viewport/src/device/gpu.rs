use std::sync::Arc;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use winit::window::Window;

use crate::camera::ProjectionCamera;
use crate::compositor::{CompositorPipeline, EdgeDetectionMode};
use crate::config::RendererOptions;
use crate::render::{FrameOutcome, RenderBackend, RenderPath};
use crate::scene::{LineVertex, NodeKind, SceneGraph, frustum_lines};

/// Format of the internal target used before a surface is attached.
const UNATTACHED_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Composer framebuffer format (half-float, HDR-capable).
const COMPOSER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// wgpu-backed renderer.
///
/// The device and queue exist from construction so frames can render before
/// any host surface is attached (they land in an internal offscreen target).
/// `attach` binds the output to a window; at most one surface is live per
/// renderer.
pub struct GpuRenderer {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    options: RendererOptions,

    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    config: Option<wgpu::SurfaceConfiguration>,

    logical: (f32, f32),
    ratio: f64,

    offscreen: Option<SizedTexture>,
    msaa: Option<SizedTexture>,
    depth: Option<SizedTexture>,
    comp_color: Option<SizedTexture>,

    lines: LinePass,
    post: PostPass,

    warned_unsized_composer: bool,
    disposed: bool,
}

impl GpuRenderer {
    /// Creates a headless-capable renderer.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu; this blocks on
    /// it, matching construction-time use.
    pub fn new(options: &RendererOptions) -> Result<Self> {
        pollster::block_on(Self::new_async(options))
    }

    async fn new_async(options: &RendererOptions) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // No compatible_surface: the output element arrives later (or never,
        // for headless hosts).
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("atrium device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            options: options.clone(),
            window: None,
            surface: None,
            config: None,
            logical: (0.0, 0.0),
            ratio: 1.0,
            offscreen: None,
            msaa: None,
            depth: None,
            comp_color: None,
            lines: LinePass::default(),
            post: PostPass::default(),
            warned_unsized_composer: false,
            disposed: false,
        })
    }

    /// Current physical output size, `logical * pixel_ratio`.
    fn physical_size(&self) -> (u32, u32) {
        let w = (self.logical.0 as f64 * self.ratio).round().max(0.0) as u32;
        let h = (self.logical.1 as f64 * self.ratio).round().max(0.0) as u32;
        (w, h)
    }

    fn output_format(&self) -> wgpu::TextureFormat {
        self.config
            .as_ref()
            .map_or(UNATTACHED_FORMAT, |c| c.format)
    }

    fn sample_count(&self) -> u32 {
        if self.options.antialias { 4 } else { 1 }
    }

    fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        if !self.options.depth {
            return None;
        }
        Some(if self.options.stencil {
            wgpu::TextureFormat::Depth24PlusStencil8
        } else {
            wgpu::TextureFormat::Depth32Float
        })
    }

    fn clear_color(&self) -> wgpu::Color {
        if self.options.alpha {
            wgpu::Color::TRANSPARENT
        } else {
            wgpu::Color {
                r: 0.012,
                g: 0.012,
                b: 0.02,
                a: 1.0,
            }
        }
    }

    fn reconfigure_surface(&mut self) {
        let (width, height) = self.physical_size();

        // Size-dependent intermediates are rebuilt lazily at the new size.
        self.offscreen = None;
        self.msaa = None;
        self.depth = None;

        let (Some(surface), Some(config)) = (self.surface.as_ref(), self.config.as_mut()) else {
            return;
        };

        // wgpu cannot configure a 0x0 surface; defer until laid out.
        if width == 0 || height == 0 {
            return;
        }

        config.width = width;
        config.height = height;
        surface.configure(&self.device, config);
    }

    /// Collects the world-space line geometry for this frame. The frustum
    /// helper is expanded here so it tracks the live camera.
    fn collect_lines(scene: &SceneGraph, camera: &ProjectionCamera) -> Vec<LineVertex> {
        let mut vertices = Vec::new();
        for node in scene.iter() {
            match &node.kind {
                NodeKind::Lines(lines) => vertices.extend_from_slice(&lines.vertices),
                NodeKind::CameraFrustum => {
                    let corners = camera.frustum_corners_world();
                    vertices.extend_from_slice(&frustum_lines(&corners).vertices);
                }
                NodeKind::AmbientLight { .. } => {}
            }
        }
        vertices
    }

    /// Renders the scene into `view` with a clear, honoring MSAA/depth flags.
    #[allow(clippy::too_many_arguments)]
    fn draw_scene(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        size: (u32, u32),
        samples: u32,
        scene: &SceneGraph,
        camera: &ProjectionCamera,
    ) {
        let vertices = Self::collect_lines(scene, camera);
        let ambient = scene.ambient_term().unwrap_or([1.0, 1.0, 1.0]);
        let clear = self.clear_color();
        let depth_format = self.depth_format();

        self.lines.ensure_pipeline(&self.device, format, samples, depth_format);
        self.lines.ensure_bindings(&self.device);
        self.lines.write_uniform(&self.queue, camera, ambient);
        self.lines.ensure_capacity(&self.device, vertices.len());
        self.lines.upload(&self.queue, &vertices);

        // MSAA resolve setup: render into the multisampled intermediate and
        // resolve into the real target.
        let device = &self.device;
        let (color_view, resolve_target) = if samples > 1 {
            let msaa = ensure_target(
                device,
                &mut self.msaa,
                "atrium msaa color",
                size,
                format,
                samples,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            );
            (msaa, Some(view))
        } else {
            (view, None)
        };

        let depth_view = match depth_format {
            Some(df) => Some(ensure_target(
                device,
                &mut self.depth,
                "atrium depth",
                size,
                df,
                samples,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            )),
            None => None,
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("atrium scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_view.map(|dv| {
                wgpu::RenderPassDepthStencilAttachment {
                    view: dv,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if !vertices.is_empty() {
            self.lines.record(&mut rpass, vertices.len() as u32);
        }
    }

    /// Runs the composited path: scene into the composer target, then the
    /// effect (or copy) pass into `view`.
    fn draw_composited(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        target_format: wgpu::TextureFormat,
        pipeline: &CompositorPipeline,
        scene: &SceneGraph,
        camera: &ProjectionCamera,
    ) {
        // Caller checks the composer buffers exist; taking the target out of
        // `self` keeps the scene-pass borrow simple.
        let Some(comp) = self.comp_color.take() else {
            return;
        };

        // Scene pass into the half-float composer target. The composited
        // path owns anti-aliasing, so no MSAA here.
        self.draw_scene(
            encoder,
            &comp.view,
            COMPOSER_FORMAT,
            comp.size,
            1,
            scene,
            camera,
        );

        self.post.ensure_pipelines(&self.device, target_format);
        self.post.ensure_bindings(&self.device, &comp.view);
        self.post
            .write_uniform(&self.queue, comp.size, &pipeline.aa_pass.settings);

        let use_copy = pipeline.copy_pass.enabled;
        self.post.record(encoder, view, use_copy);

        self.comp_color = Some(comp);
    }
}

impl RenderBackend for GpuRenderer {
    type AttachTarget = Arc<Window>;

    fn attach(&mut self, window: Arc<Window>) -> Result<()> {
        anyhow::ensure!(
            self.surface.is_none(),
            "renderer output is already attached to a surface"
        );

        let surface = self
            .instance
            .create_surface(Arc::clone(&window))
            .context("failed to create wgpu surface")?;

        let caps = surface.get_capabilities(&self.adapter);
        let format = choose_surface_format(&caps, self.options.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = choose_alpha_mode(&caps, self.options.alpha);

        // The coordinator resizes right after attach; until then fall back
        // to the window's own size so configuration succeeds.
        let (mut width, mut height) = self.physical_size();
        if width == 0 || height == 0 {
            let inner = window.inner_size();
            width = inner.width;
            height = inner.height;
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: self.options.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: self.options.desired_maximum_frame_latency,
        };
        surface.configure(&self.device, &config);

        // Target format changed from the unattached fallback; pipelines keyed
        // on it rebuild on next use.
        self.lines.invalidate_pipeline();
        self.post.invalidate_pipelines();
        self.offscreen = None;
        self.msaa = None;

        self.window = Some(window);
        self.surface = Some(surface);
        self.config = Some(config);
        Ok(())
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.ratio = ratio.max(0.0);
    }

    fn set_logical_size(&mut self, width: f32, height: f32) {
        self.logical = (width.max(0.0), height.max(0.0));
        self.reconfigure_surface();
    }

    fn apply_compositor_resize(&mut self, pipeline: &CompositorPipeline) -> Result<()> {
        if self.disposed {
            return Ok(());
        }

        let size = pipeline.buffer_size();
        if size.width == 0 || size.height == 0 {
            self.comp_color = None;
        } else {
            self.comp_color = Some(SizedTexture::new(
                &self.device,
                "atrium composer color",
                (size.width, size.height),
                COMPOSER_FORMAT,
                1,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            ));
        }

        // The effect pass samples the recreated target.
        self.post.invalidate_bindings();
        self.warned_unsized_composer = false;
        Ok(())
    }

    fn render(
        &mut self,
        scene: &SceneGraph,
        camera: &ProjectionCamera,
        path: RenderPath<'_>,
    ) -> Result<FrameOutcome> {
        if self.disposed {
            return Ok(FrameOutcome::Skipped);
        }

        let (width, height) = self.physical_size();

        // Acquire the output target: the surface when attached, otherwise
        // the internal offscreen fallback.
        let mut surface_frame = None;
        let target_format = self.output_format();
        let target_view = if self.surface.is_some() {
            if width == 0 || height == 0 {
                return Ok(FrameOutcome::Skipped);
            }
            let acquired = self
                .surface
                .as_ref()
                .expect("surface presence checked above")
                .get_current_texture();
            let frame = match acquired {
                Ok(frame) => frame,
                Err(err) => return self.absorb_surface_error(err),
            };
            let view = frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            surface_frame = Some(frame);
            view
        } else {
            if width == 0 || height == 0 {
                return Ok(FrameOutcome::Skipped);
            }
            let offscreen = ensure_target(
                &self.device,
                &mut self.offscreen,
                "atrium unattached target",
                (width, height),
                UNATTACHED_FORMAT,
                1,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            );
            offscreen.clone()
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("atrium frame encoder"),
            });

        match path {
            RenderPath::Composited(pipeline)
                if pipeline.has_sized_buffers() && self.comp_color.is_some() =>
            {
                self.draw_composited(
                    &mut encoder,
                    &target_view,
                    target_format,
                    pipeline,
                    scene,
                    camera,
                );
            }
            RenderPath::Composited(_) => {
                // Composer enabled before its buffers were ever sized by a
                // resize: fall back to the direct path for this frame.
                if !self.warned_unsized_composer {
                    log::debug!("composited path requested with unsized buffers; rendering direct");
                    self.warned_unsized_composer = true;
                }
                self.draw_scene(
                    &mut encoder,
                    &target_view,
                    target_format,
                    (width, height),
                    self.sample_count(),
                    scene,
                    camera,
                );
            }
            RenderPath::Direct => {
                self.draw_scene(
                    &mut encoder,
                    &target_view,
                    target_format,
                    (width, height),
                    self.sample_count(),
                    scene,
                    camera,
                );
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(frame) = surface_frame {
            if let Some(window) = self.window.as_ref() {
                window.pre_present_notify();
            }
            frame.present();
        }

        Ok(FrameOutcome::Rendered)
    }

    fn dispose(&mut self) -> Result<()> {
        self.lines = LinePass::default();
        self.post = PostPass::default();
        self.offscreen = None;
        self.msaa = None;
        self.depth = None;
        self.comp_color = None;
        self.disposed = true;
        Ok(())
    }

    fn force_context_loss(&mut self) -> Result<()> {
        self.surface = None;
        self.config = None;
        self.window = None;
        // Destroys the logical device; outstanding work is dropped.
        self.device.destroy();
        Ok(())
    }
}

impl GpuRenderer {
    fn absorb_surface_error(&mut self, err: wgpu::SurfaceError) -> Result<FrameOutcome> {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                let (width, height) = self.physical_size();
                if width > 0 && height > 0 {
                    if let (Some(surface), Some(config)) =
                        (self.surface.as_ref(), self.config.as_ref())
                    {
                        surface.configure(&self.device, config);
                    }
                }
                Ok(FrameOutcome::Skipped)
            }
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => Ok(FrameOutcome::Skipped),
            wgpu::SurfaceError::OutOfMemory => {
                Err(anyhow::anyhow!("GPU out of memory while acquiring a frame"))
            }
        }
    }
}

// ── sized texture targets ─────────────────────────────────────────────────

struct SizedTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
    format: wgpu::TextureFormat,
    samples: u32,
}

impl SizedTexture {
    fn new(
        device: &wgpu::Device,
        label: &str,
        size: (u32, u32),
        format: wgpu::TextureFormat,
        samples: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.0.max(1),
                height: size.1.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
            size,
            format,
            samples,
        }
    }
}

/// Returns a view over `slot`, recreating the texture when the requested
/// size/format/sample count differ from what is cached.
fn ensure_target<'a>(
    device: &wgpu::Device,
    slot: &'a mut Option<SizedTexture>,
    label: &str,
    size: (u32, u32),
    format: wgpu::TextureFormat,
    samples: u32,
    usage: wgpu::TextureUsages,
) -> &'a wgpu::TextureView {
    let stale = slot
        .as_ref()
        .is_none_or(|t| t.size != size || t.format != format || t.samples != samples);
    if stale {
        *slot = Some(SizedTexture::new(device, label, size, format, samples, usage));
    }
    &slot.as_ref().unwrap().view
}

// ── surface selection helpers ─────────────────────────────────────────────

fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

fn choose_alpha_mode(caps: &wgpu::SurfaceCapabilities, alpha: bool) -> wgpu::CompositeAlphaMode {
    let preferred: &[wgpu::CompositeAlphaMode] = if alpha {
        &[
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
    } else {
        &[wgpu::CompositeAlphaMode::Opaque]
    };

    preferred
        .iter()
        .find(|m| caps.alpha_modes.contains(m))
        .copied()
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

// ── line pass ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SceneUniform {
    view_proj: [[f32; 4]; 4],
    ambient: [f32; 4],
}

#[derive(Default)]
struct LinePass {
    pipeline: Option<wgpu::RenderPipeline>,
    pipeline_key: Option<(wgpu::TextureFormat, u32, Option<wgpu::TextureFormat>)>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    scene_ubo: Option<wgpu::Buffer>,

    vbo: Option<wgpu::Buffer>,
    capacity: usize,
}

impl LinePass {
    fn invalidate_pipeline(&mut self) {
        self.pipeline = None;
        self.pipeline_key = None;
    }

    fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        samples: u32,
        depth_format: Option<wgpu::TextureFormat>,
    ) {
        let key = (format, samples, depth_format);
        if self.pipeline_key == Some(key) && self.pipeline.is_some() {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("atrium lines shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/lines.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("atrium lines bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(
                        std::num::NonZeroU64::new(std::mem::size_of::<SceneUniform>() as u64)
                            .expect("SceneUniform has non-zero size by construction"),
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("atrium lines pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("atrium lines pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4],
                }],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: depth_format.map(|df| wgpu::DepthStencilState {
                format: df,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: samples,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },

            multiview_mask: None,
            cache: None,
        });

        self.pipeline_key = Some(key);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.bind_group = None;
    }

    fn ensure_bindings(&mut self, device: &wgpu::Device) {
        if self.bind_group.is_some() && self.scene_ubo.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else {
            return;
        };

        let scene_ubo = self.scene_ubo.take().unwrap_or_else(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("atrium scene ubo"),
                size: std::mem::size_of::<SceneUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("atrium lines bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_ubo.as_entire_binding(),
            }],
        });

        self.scene_ubo = Some(scene_ubo);
        self.bind_group = Some(bind_group);
    }

    fn write_uniform(&self, queue: &wgpu::Queue, camera: &ProjectionCamera, ambient: [f32; 3]) {
        let Some(ubo) = self.scene_ubo.as_ref() else {
            return;
        };
        let uniform = SceneUniform {
            view_proj: camera.view_projection().to_cols_array_2d(),
            ambient: [ambient[0], ambient[1], ambient[2], 1.0],
        };
        queue.write_buffer(ubo, 0, bytemuck::bytes_of(&uniform));
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.capacity && self.vbo.is_some() {
            return;
        }
        let new_cap = required.next_power_of_two().max(256);
        self.vbo = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("atrium lines vbo"),
            size: (new_cap * std::mem::size_of::<LineVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.capacity = new_cap;
    }

    fn upload(&self, queue: &wgpu::Queue, vertices: &[LineVertex]) {
        if vertices.is_empty() {
            return;
        }
        let Some(vbo) = self.vbo.as_ref() else {
            return;
        };
        queue.write_buffer(vbo, 0, bytemuck::cast_slice(vertices));
    }

    fn record(&self, rpass: &mut wgpu::RenderPass<'_>, vertex_count: u32) {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return;
        };
        let Some(bind_group) = self.bind_group.as_ref() else {
            return;
        };
        let Some(vbo) = self.vbo.as_ref() else {
            return;
        };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.draw(0..vertex_count, 0..1);
    }
}

// ── post pass (anti-aliasing / copy) ──────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct AaUniform {
    texel: [f32; 2],
    edge_threshold: f32,
    search_span: f32,
    mode: u32,
    predication_scale: f32,
    predication_threshold: f32,
    _pad: f32,
}

#[derive(Default)]
struct PostPass {
    aa_pipeline: Option<wgpu::RenderPipeline>,
    blit_pipeline: Option<wgpu::RenderPipeline>,
    pipeline_format: Option<wgpu::TextureFormat>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    blit_bind_group_layout: Option<wgpu::BindGroupLayout>,
    blit_bind_group: Option<wgpu::BindGroup>,
    sampler: Option<wgpu::Sampler>,
    aa_ubo: Option<wgpu::Buffer>,
}

impl PostPass {
    fn invalidate_pipelines(&mut self) {
        self.aa_pipeline = None;
        self.blit_pipeline = None;
        self.pipeline_format = None;
        self.invalidate_bindings();
    }

    fn invalidate_bindings(&mut self) {
        self.bind_group = None;
        self.blit_bind_group = None;
    }

    fn ensure_pipelines(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format) && self.aa_pipeline.is_some() {
            return;
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("atrium post sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let aa_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("atrium aa bgl"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            std::num::NonZeroU64::new(std::mem::size_of::<AaUniform>() as u64)
                                .expect("AaUniform has non-zero size by construction"),
                        ),
                    },
                    count: None,
                },
            ],
        });

        let blit_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("atrium blit bgl"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });

        let fullscreen_pipeline = |label: &str,
                                   bgl: &wgpu::BindGroupLayout,
                                   shader: &wgpu::ShaderModule| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[bgl],
                immediate_size: 0,
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        let aa_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("atrium aa shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/post.wgsl").into()),
        });
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("atrium blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        self.aa_pipeline = Some(fullscreen_pipeline("atrium aa pipeline", &aa_bgl, &aa_shader));
        self.blit_pipeline = Some(fullscreen_pipeline(
            "atrium blit pipeline",
            &blit_bgl,
            &blit_shader,
        ));
        self.bind_group_layout = Some(aa_bgl);
        self.blit_bind_group_layout = Some(blit_bgl);
        self.sampler = Some(sampler);
        self.pipeline_format = Some(format);
        self.invalidate_bindings();
    }

    fn ensure_bindings(&mut self, device: &wgpu::Device, source: &wgpu::TextureView) {
        if self.bind_group.is_some() && self.blit_bind_group.is_some() {
            return;
        }
        let (Some(aa_bgl), Some(blit_bgl), Some(sampler)) = (
            self.bind_group_layout.as_ref(),
            self.blit_bind_group_layout.as_ref(),
            self.sampler.as_ref(),
        ) else {
            return;
        };

        let aa_ubo = self.aa_ubo.take().unwrap_or_else(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("atrium aa ubo"),
                size: std::mem::size_of::<AaUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("atrium aa bind group"),
            layout: aa_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: aa_ubo.as_entire_binding(),
                },
            ],
        }));
        self.blit_bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("atrium blit bind group"),
            layout: blit_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        }));
        self.aa_ubo = Some(aa_ubo);
    }

    fn write_uniform(
        &self,
        queue: &wgpu::Queue,
        source_size: (u32, u32),
        settings: &crate::compositor::AaSettings,
    ) {
        let Some(ubo) = self.aa_ubo.as_ref() else {
            return;
        };
        let uniform = AaUniform {
            texel: [
                1.0 / source_size.0.max(1) as f32,
                1.0 / source_size.1.max(1) as f32,
            ],
            edge_threshold: settings.edge_threshold,
            search_span: settings.preset.search_span() as f32,
            mode: match settings.edge_detection {
                EdgeDetectionMode::Depth => 0,
                EdgeDetectionMode::Luma => 1,
                EdgeDetectionMode::Color => 2,
            },
            predication_scale: match settings.predication {
                crate::compositor::PredicationMode::Disabled => 1.0,
                _ => settings.predication_scale.max(1.0),
            },
            predication_threshold: settings.predication_threshold,
            _pad: 0.0,
        };
        queue.write_buffer(ubo, 0, bytemuck::bytes_of(&uniform));
    }

    fn record(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, copy: bool) {
        let (pipeline, bind_group) = if copy {
            (self.blit_pipeline.as_ref(), self.blit_bind_group.as_ref())
        } else {
            (self.aa_pipeline.as_ref(), self.bind_group.as_ref())
        };
        let (Some(pipeline), Some(bind_group)) = (pipeline, bind_group) else {
            return;
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("atrium output pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }
}
