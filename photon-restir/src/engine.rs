use std::mem;

use derivative::Derivative;
use glam::{uvec2, UVec2};
use log::{debug, info};
use photon_restir_gpu::{
    neighbor_offsets, LightSample, PhotonKind, Reservoir, SurfaceInfo,
    NEIGHBOR_OFFSET_COUNT, PHOTON_KINDS,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::metrics::Metrics;
use crate::{
    build_count, read_buffer_as, reflection, result_slot, ui, Device,
    DispatchController, Error, Frame, FrameResources, InputBundle,
    Invalidation, KernelCache, LightingPreparer, PassContext, Passes,
    PhotonAccel, PhotonBuffers, PhotonCounter, PipelineConfig, Reflection,
    RenderData, ResamplingMode, Result, Scene, Slot, Texture, UiStats,
    Widgets, COLOR, VIEW,
};

/// Photon-mapped ReSTIR pipeline.
///
/// The engine owns every resource the pipeline needs and renders one frame
/// per [`Engine::execute()`]. Configuration changes are staged (see
/// [`Engine::config_mut()`]) and committed at the start of the next frame,
/// invalidating exactly the resources and kernels they affect.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Engine {
    config: PipelineConfig,
    pending: Option<PipelineConfig>,

    #[derivative(Debug = "ignore")]
    scene: Option<Box<dyn Scene>>,

    kernels: KernelCache,
    passes: Passes,
    lighting: LightingPreparer,
    resources: Option<FrameResources>,
    photon_buffers: Option<PhotonBuffers>,
    photon_accel: Option<PhotonAccel>,
    photon_counter: Option<PhotonCounter>,
    dispatch: DispatchController,
    neighbor_offsets: Option<Texture>,
    rng: StdRng,

    /// Frame index, counted since the last reset of history.
    frame: Frame,

    /// Frame index, counted since photon buffers were (re)allocated.
    photon_frame: u32,

    /// Whether the current frame must not reuse any history.
    reset: bool,

    last_report: Option<FrameReport>,
}

/// Summary of a rendered frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub frame: u32,

    /// Slot written by this frame.
    pub parity: Slot,

    /// Resampling mode the frame has actually been rendered with; always
    /// `NoResampling` right after a reset.
    pub mode: ResamplingMode,

    /// Slot holding this frame's resolved reservoirs.
    pub result: Slot,

    /// Photon counts, lagging one frame behind.
    pub photon_counts: [u32; PHOTON_KINDS],

    pub dispatched: u32,

    /// Number of photons each bottom-level structure has been built over.
    pub build_counts: [u32; PHOTON_KINDS],

    pub reset: bool,
}

/// State of a single pixel, as of the last rendered frame.
#[derive(Clone, Copy, Debug)]
pub struct PixelInspection {
    pub reservoir: Reservoir<LightSample>,
    pub surface: SurfaceInfo,
    pub photon_counts: [u32; PHOTON_KINDS],
}

impl Engine {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let config = config.sanitize()?;

        info!("Creating engine");

        Ok(Self {
            passes: Passes::new(&config),
            dispatch: dispatch_controller(&config),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            pending: None,
            scene: None,
            kernels: Default::default(),
            lighting: Default::default(),
            resources: None,
            photon_buffers: None,
            photon_accel: None,
            photon_counter: None,
            neighbor_offsets: None,
            frame: Frame::default(),
            photon_frame: 0,
            reset: true,
            last_report: None,
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the pending configuration, which becomes active at the start
    /// of the next frame.
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        self.pending.get_or_insert_with(|| self.config.clone())
    }

    pub fn kernels(&self) -> &KernelCache {
        &self.kernels
    }

    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }

    /// Replaces the scene; the next frame starts without history.
    pub fn set_scene(&mut self, scene: Box<dyn Scene>) {
        info!("Setting scene; geometries={}", scene.geometry_count());

        self.scene = Some(scene);
        self.lighting.invalidate();
        self.reset_history();
    }

    /// Forgets all history; the next frame behaves like the first one.
    pub fn reset_history(&mut self) {
        self.reset = true;
        self.frame = Frame::default();
    }

    pub fn reflect(&self) -> Reflection {
        reflection::reflect()
    }

    /// Draws the settings; changes land in the pending configuration.
    pub fn render_ui(&mut self, widgets: &mut dyn Widgets) -> bool {
        let stats = self
            .last_report
            .map(|report| UiStats {
                frame: report.frame,
                photon_counts: report.photon_counts,
                dispatched: report.dispatched,
            })
            .unwrap_or_default();

        ui::render_ui(self.config_mut(), &stats, widgets)
    }

    /// Reads back the resolved reservoir and surface of given pixel, as of
    /// the last rendered frame.
    ///
    /// Unlike [`Engine::execute()`], this waits for the freshest photon
    /// counts.
    pub fn inspect_pixel(
        &mut self,
        device: &mut dyn Device,
        pixel: UVec2,
    ) -> Result<Option<PixelInspection>> {
        let (Some(report), Some(resources)) = (self.last_report, &self.resources)
        else {
            return Ok(None);
        };

        let dims = resources.dims();

        if pixel.x >= dims.x || pixel.y >= dims.y {
            return Ok(None);
        }

        let idx = (pixel.y * dims.x + pixel.x) as usize;
        let len = idx + 1;
        let layout = resources.layout();

        let words: Vec<u32> = read_buffer_as(
            device,
            resources.reservoirs.get(report.result).id(),
            layout.words() * len,
        )?;

        let samples: Vec<LightSample> = read_buffer_as(
            device,
            resources.samples.get(report.result).id(),
            len,
        )?;

        let surfaces: Vec<SurfaceInfo> = read_buffer_as(
            device,
            resources.surfaces.get(report.parity).id(),
            len,
        )?;

        let photon_counts = match &mut self.photon_counter {
            Some(counter) => counter.force_flush(device)?,
            None => [0; PHOTON_KINDS],
        };

        Ok(Some(PixelInspection {
            reservoir: Reservoir::read(&words, &samples, layout, idx),
            surface: surfaces[idx],
            photon_counts,
        }))
    }

    /// Renders a frame.
    pub fn execute(
        &mut self,
        device: &mut dyn Device,
        data: &RenderData,
    ) -> Result<FrameReport> {
        let scene = self
            .scene
            .take()
            .ok_or_else(|| Error::configuration("no scene has been set"))?;

        let report = self.render(device, &*scene, data);

        self.scene = Some(scene);

        let report = report?;

        self.last_report = Some(report);

        Ok(report)
    }

    fn render(
        &mut self,
        device: &mut dyn Device,
        scene: &dyn Scene,
        data: &RenderData,
    ) -> Result<FrameReport> {
        let mut metrics = Metrics::default();

        self.commit(device)?;

        if !device.features().ray_tracing {
            return Err(Error::RayTracingUnsupported);
        }

        let dims = data.dims;

        if dims.x == 0 || dims.y == 0 {
            return Err(Error::configuration(format!(
                "render target must not be empty, got {:?}",
                dims
            )));
        }

        let bundle = InputBundle::detect(data)?;

        data.required_output(&COLOR)?;

        self.prepare(device, scene, data)?;

        metrics.stage("prepare");

        let Self {
            config,
            kernels,
            passes,
            lighting,
            resources,
            photon_buffers,
            photon_accel,
            photon_counter,
            dispatch,
            neighbor_offsets,
            rng,
            frame,
            photon_frame,
            reset,
            ..
        } = self;

        let (
            Some(resources),
            Some(buffers),
            Some(accel),
            Some(counter),
            Some(neighbor_offsets),
            Some(light_sampler),
        ) = (
            resources.as_mut(),
            photon_buffers.as_mut(),
            photon_accel.as_ref(),
            photon_counter.as_mut(),
            neighbor_offsets.as_ref(),
            lighting.sampler(),
        )
        else {
            return Err(Error::device("pipeline resources are missing"));
        };

        let config = &*config;
        let frame = *frame;
        let curr = frame.current();

        // Photon counts of the previous frame; reading them back doesn't
        // have to wait for this frame's work
        let photon_counts = if *photon_frame > 0 {
            let counts = counter.read(device)?;

            dispatch.update(
                counts[PhotonKind::Global.index()],
                buffers.capacity(PhotonKind::Global),
            );

            counts
        } else {
            [0; PHOTON_KINDS]
        };

        let prev_view = match data.input(VIEW.name) {
            Some(view) => {
                let (_, format) = device.texture_desc(view).ok_or_else(|| {
                    Error::device(format!("unknown texture: {:?}", view))
                })?;

                Some(resources.prev_view(device, format)?)
            }

            None => None,
        };

        if config.photons.culling.enabled {
            buffers.culling_mask(device, config.photons.culling.hash_bits)?;
        }

        if config.candidates.presampling.enabled {
            buffers.presampling(device, &config.candidates.presampling)?;
        }

        let resources = &*resources;
        let buffers = &*buffers;
        let surfaces = resources.surfaces.get(curr);

        let mut ctx = PassContext {
            device,
            kernels,
            config,
            dims,
        };

        passes
            .fill_surface
            .run(&mut ctx, scene, data, bundle, surfaces)?;

        ctx.device.barrier();
        metrics.stage("fill_surface");

        let culling_mask = if config.photons.culling.enabled {
            let mask = buffers.allocated_culling_mask();

            if let Some(mask) = mask {
                passes.photon_culling.run(&mut ctx, surfaces, mask)?;
                ctx.device.barrier();
            }

            mask
        } else {
            None
        };

        metrics.stage("photon_culling");

        passes.photon_generation.run(
            &mut ctx,
            scene,
            light_sampler,
            buffers,
            culling_mask,
            dispatch.grid(),
            rng.gen(),
        )?;

        ctx.device.barrier();
        counter.copy(ctx.device, buffers.counters())?;

        let build_counts = PhotonKind::ALL.map(|kind| {
            build_count(
                *photon_frame == 0,
                photon_counts[kind.index()],
                buffers.capacity(kind),
                config.photons.accel_overestimate,
            )
        });

        accel.build(ctx.device, buffers, build_counts)?;
        ctx.device.barrier();
        metrics.stage("photon_generation");

        if config.candidates.presampling.enabled {
            if let Some(presampling) = buffers.presampled() {
                passes.photon_presampling.run(
                    &mut ctx,
                    buffers,
                    presampling,
                    rng.gen(),
                )?;

                ctx.device.barrier();
            }
        }

        metrics.stage("photon_presampling");

        passes.candidate_generation.run(
            &mut ctx,
            scene,
            light_sampler,
            buffers,
            surfaces,
            resources.reservoirs.get(curr),
            resources.samples.get(curr),
            rng.gen(),
        )?;

        ctx.device.barrier();
        metrics.stage("candidate_generation");

        if config.shading.caustics {
            passes.caustic_collection.run(
                &mut ctx,
                buffers,
                accel,
                surfaces,
                &resources.caustics,
            )?;

            ctx.device.barrier();
        }

        metrics.stage("caustic_collection");

        let mode = if *reset {
            ResamplingMode::NoResampling
        } else {
            config.resampling.mode
        };

        match mode {
            ResamplingMode::Temporal => {
                passes.temporal_resampling.run(
                    &mut ctx,
                    scene,
                    data,
                    resources,
                    prev_view,
                    frame,
                    rng.gen(),
                )?;
            }

            ResamplingMode::Spatial => {
                passes.spatial_resampling.run(
                    &mut ctx,
                    scene,
                    resources,
                    neighbor_offsets,
                    frame,
                    rng.gen(),
                )?;
            }

            ResamplingMode::SpatioTemporal => {
                passes.spatiotemporal_resampling.run(
                    &mut ctx,
                    scene,
                    data,
                    resources,
                    neighbor_offsets,
                    prev_view,
                    frame,
                    rng.gen(),
                )?;
            }

            ResamplingMode::NoResampling => {
                //
            }
        }

        ctx.device.barrier();
        metrics.stage("resampling");

        let result = result_slot(mode, frame);

        passes
            .final_shading
            .run(&mut ctx, scene, data, resources, curr, result)?;

        ctx.device.barrier();

        // Shading reads the current view, so it can be carried over only now
        if let (Some(view), Some(prev_view)) = (data.input(VIEW.name), prev_view)
        {
            ctx.device.copy_texture(view, prev_view)?;
        }

        metrics.stage("final_shading");

        ctx.kernels.end_frame(ctx.device);

        let report = FrameReport {
            frame: frame.0,
            parity: curr,
            mode,
            result,
            photon_counts,
            dispatched: dispatch.dispatched(),
            build_counts,
            reset: *reset,
        };

        self.frame = frame.next();
        self.photon_frame = self.photon_frame.saturating_add(1);
        self.reset = false;

        metrics.finish(report.frame);

        Ok(report)
    }

    /// Makes the pending configuration active, applying whatever it
    /// invalidates.
    fn commit(&mut self, device: &mut dyn Device) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let pending = pending.sanitize()?;
        let invalidation = self.config.diff(&pending);

        self.config = pending;

        if invalidation.any() {
            self.invalidate(device, invalidation);
        }

        Ok(())
    }

    fn invalidate(
        &mut self,
        device: &mut dyn Device,
        invalidation: Invalidation,
    ) {
        debug!("Applying configuration change: {:?}", invalidation);

        if invalidation.photon_buffers {
            if let Some(buffers) = self.photon_buffers.take() {
                buffers.destroy(device);
            }

            if let Some(accel) = self.photon_accel.take() {
                accel.destroy(device);
            }

            if let Some(counter) = &mut self.photon_counter {
                counter.reset();
            }

            self.photon_frame = 0;
        }

        if let Some(buffers) = &mut self.photon_buffers {
            if invalidation.culling {
                buffers.release_culling_mask(device);
            }

            if invalidation.presampling {
                buffers.release_presampling(device);
            }
        }

        if invalidation.reservoirs {
            if let Some(resources) = self.resources.take() {
                resources.destroy(device);
            }
        }

        if invalidation.kernels {
            self.kernels.clear(device);
            self.passes = Passes::new(&self.config);
        }

        if invalidation.light_sampler {
            self.lighting.invalidate();
        }

        if invalidation.dispatch {
            self.dispatch = dispatch_controller(&self.config);
        }

        if invalidation.history {
            self.reset_history();
        }
    }

    /// Makes sure all resources exist and match the configuration and the
    /// render target.
    fn prepare(
        &mut self,
        device: &mut dyn Device,
        scene: &dyn Scene,
        data: &RenderData,
    ) -> Result<()> {
        let capacities = self.config.photons.capacities;

        if self.photon_accel.is_none() {
            self.photon_accel = Some(PhotonAccel::new(device, capacities)?);
        }

        if self.photon_buffers.is_none() {
            self.photon_buffers = Some(PhotonBuffers::new(device, capacities)?);
            self.photon_frame = 0;
        }

        if self.photon_counter.is_none() {
            self.photon_counter = Some(PhotonCounter::new(device)?);
        }

        if self.neighbor_offsets.is_none() {
            let texture = Texture::new(
                device,
                "neighbor_offsets",
                uvec2(NEIGHBOR_OFFSET_COUNT as u32, 1),
                wgpu::TextureFormat::Rg8Snorm,
            )?;

            let offsets = neighbor_offsets(NEIGHBOR_OFFSET_COUNT);

            device.write_texture(texture.id(), bytemuck::cast_slice(&offsets))?;

            self.neighbor_offsets = Some(texture);
        }

        let reallocated = FrameResources::prepare(
            &mut self.resources,
            device,
            data.dims,
            self.config.resampling.layout,
        )?;

        if reallocated {
            debug!("Frame resources reallocated; resetting history");
            self.reset_history();
        }

        self.lighting
            .update(device, scene, self.config.photons.light_sampler)?;

        Ok(())
    }

    /// Releases all resources owned by the engine.
    pub fn destroy(mut self, device: &mut dyn Device) {
        info!("Destroying engine");

        self.kernels.clear(device);
        mem::take(&mut self.lighting).destroy(device);

        if let Some(resources) = self.resources.take() {
            resources.destroy(device);
        }

        if let Some(buffers) = self.photon_buffers.take() {
            buffers.destroy(device);
        }

        if let Some(accel) = self.photon_accel.take() {
            accel.destroy(device);
        }

        if let Some(counter) = self.photon_counter.take() {
            counter.destroy(device);
        }

        if let Some(offsets) = self.neighbor_offsets.take() {
            offsets.destroy(device);
        }
    }
}

fn dispatch_controller(config: &PipelineConfig) -> DispatchController {
    DispatchController::new(
        config.photons.dispatched,
        config.photons.dispatch_y_extent,
        config.photons.dynamic_dispatch,
    )
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use bytemuck::Pod;
    use glam::{uvec2, vec3, Vec2, Vec3, Vec4};
    use photon_restir_gpu::{BiasCorrection, Camera, Light, Triangle};

    use super::*;
    use crate::kernels::entry_points::*;
    use crate::{
        read_texture_as, Channel, Command, LightSamplerKind, ReferenceScene,
        SoftwareDevice, TextureDesc, TextureId, ALBEDO, MOTION, NORMAL,
        POSITION,
    };

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::default();

        config.photons.capacities = [256, 64];
        config.photons.dispatched = 64;
        config.photons.dispatch_y_extent = 8;
        config.photons.dynamic_dispatch.enabled = false;
        config.photons.light_sampler = LightSamplerKind::Uniform;
        config.candidates.photon_candidates = 0;
        config.resampling.mode = ResamplingMode::Temporal;
        config.resampling.bias_correction = BiasCorrection::Basic;
        config.resampling.spatial_samples = 0;
        config
    }

    fn floor() -> Vec<Triangle> {
        Triangle::quad(
            vec3(-1.0, 0.0, -1.0),
            vec3(0.0, 0.0, 2.0),
            vec3(2.0, 0.0, 0.0),
            Vec3::splat(0.5),
        )
        .to_vec()
    }

    fn lights() -> Vec<Light> {
        vec![
            Light::point(vec3(-0.5, 1.0, 0.0), Vec3::ONE),
            Light::point(vec3(0.5, 1.0, 0.25), Vec3::splat(2.0)),
        ]
    }

    fn camera(dims: UVec2) -> Camera {
        Camera::look_at(vec3(0.0, 2.0, 0.0), Vec3::ZERO, Vec3::Z, 0.5, dims)
    }

    fn upload<T>(
        device: &mut SoftwareDevice,
        channel: &Channel,
        dims: UVec2,
        texels: &[T],
    ) -> TextureId
    where
        T: Pod,
    {
        let id = device
            .create_texture(&TextureDesc {
                label: channel.name,
                size: dims,
                format: channel.format,
            })
            .unwrap();

        device.write_texture(id, bytemuck::cast_slice(texels)).unwrap();

        id
    }

    struct Fixture {
        device: SoftwareDevice,
        engine: Engine,
        data: RenderData,

        /// Analytic direct lighting (red channel) of each pixel.
        expected: Vec<f32>,
    }

    impl Fixture {
        fn new(config: PipelineConfig, dims: UVec2) -> Self {
            Self::with_device(SoftwareDevice::new(), config, dims)
        }

        fn with_device(
            mut device: SoftwareDevice,
            config: PipelineConfig,
            dims: UVec2,
        ) -> Self {
            let scene =
                ReferenceScene::new(&mut device, floor(), lights()).unwrap();

            let mut engine = Engine::new(config).unwrap();

            engine.set_scene(Box::new(scene));

            let (data, expected) = Self::render_data(&mut device, dims);

            Self {
                device,
                engine,
                data,
                expected,
            }
        }

        /// Rasterizes the simplified input bundle and allocates the output.
        fn render_data(
            device: &mut SoftwareDevice,
            dims: UVec2,
        ) -> (RenderData, Vec<f32>) {
            let scene = ReferenceScene::new(device, floor(), vec![]).unwrap();
            let camera = camera(dims);
            let gbuffer = scene.render_gbuffer(&camera);
            let pixels = (dims.x * dims.y) as usize;

            let expected = gbuffer
                .positions
                .iter()
                .zip(&gbuffer.normals)
                .map(|(position, normal)| {
                    lights()
                        .iter()
                        .map(|light| {
                            let to_light = light.position() - position.truncate();
                            let dist2 = to_light.length_squared();

                            let cos = normal
                                .truncate()
                                .dot(to_light / dist2.sqrt())
                                .max(0.0);

                            0.5 / PI * light.emission().x * cos / dist2
                        })
                        .sum()
                })
                .collect();

            let data = RenderData::new(dims, vec3(0.0, 2.0, 0.0))
                .with_input(
                    &POSITION,
                    upload(device, &POSITION, dims, &gbuffer.positions),
                )
                .with_input(
                    &NORMAL,
                    upload(device, &NORMAL, dims, &gbuffer.normals),
                )
                .with_input(
                    &ALBEDO,
                    upload(device, &ALBEDO, dims, &gbuffer.albedos),
                )
                .with_input(
                    &MOTION,
                    upload(device, &MOTION, dims, &vec![Vec2::ZERO; pixels]),
                )
                .with_output(
                    &COLOR,
                    upload(device, &COLOR, dims, &vec![Vec4::ZERO; pixels]),
                );

            (data, expected)
        }

        fn resize(&mut self, dims: UVec2) {
            (self.data, self.expected) = Self::render_data(&mut self.device, dims);
        }

        fn render(&mut self) -> FrameReport {
            self.engine.execute(&mut self.device, &self.data).unwrap()
        }

        fn color(&mut self) -> Vec<Vec4> {
            let color = self.data.output(COLOR.name).unwrap();

            read_texture_as(&mut self.device, color).unwrap()
        }

        fn inspect(&mut self, pixel: UVec2) -> Option<PixelInspection> {
            self.engine.inspect_pixel(&mut self.device, pixel).unwrap()
        }

        /// Reads the device-side photon counters left by the last frame.
        fn device_counts(&mut self) -> [u32; PHOTON_KINDS] {
            let counters = self
                .engine
                .photon_buffers
                .as_ref()
                .unwrap()
                .counters()
                .id();

            let counts: Vec<u32> =
                read_buffer_as(&mut self.device, counters, PHOTON_KINDS)
                    .unwrap();

            [counts[0], counts[1]]
        }

        fn live_resources(&self) -> (usize, usize) {
            (self.device.live_textures(), self.device.live_buffers())
        }
    }

    #[test]
    fn converges_to_direct_lighting() {
        let mut target = Fixture::new(config(), uvec2(4, 4));

        for _ in 0..32 {
            target.render();
        }

        let color = target.color();
        let actual: f32 = color.iter().map(|texel| texel.x).sum();
        let expected: f32 = target.expected.iter().sum();

        assert!(color.iter().all(|texel| texel.x > 0.0));

        assert!(
            (actual - expected).abs() < 0.05 * expected,
            "actual={}, expected={}",
            actual,
            expected
        );

        let report = target.engine.last_report().copied().unwrap();

        assert_eq!(31, report.frame);
        assert_eq!(ResamplingMode::Temporal, report.mode);
        assert_eq!(report.parity, report.result);
    }

    #[test]
    fn converges_in_every_mode() {
        let modes = [
            ResamplingMode::NoResampling,
            ResamplingMode::Temporal,
            ResamplingMode::Spatial,
            ResamplingMode::SpatioTemporal,
        ];

        let bias_corrections = [
            BiasCorrection::Off,
            BiasCorrection::Basic,
            BiasCorrection::RayTraced,
        ];

        for mode in modes {
            for bias_correction in bias_corrections {
                let mut config = config();

                config.resampling.mode = mode;
                config.resampling.bias_correction = bias_correction;
                config.resampling.spatial_samples = 1;

                let mut target = Fixture::new(config, uvec2(4, 4));
                let mut report = target.render();

                for _ in 1..32 {
                    report = target.render();
                }

                let color = target.color();
                let actual: f32 = color.iter().map(|texel| texel.x).sum();
                let expected: f32 = target.expected.iter().sum();

                assert!(
                    (actual - expected).abs() < 0.05 * expected,
                    "mode={:?}, bias_correction={:?}, actual={}, expected={}",
                    mode,
                    bias_correction,
                    actual,
                    expected
                );

                assert_eq!(mode, report.mode);
                assert_eq!(result_slot(mode, Frame(report.frame)), report.result);
            }
        }
    }

    #[test]
    fn reports_counts_of_previous_frame() {
        let mut target = Fixture::new(config(), uvec2(4, 4));
        let mut counts = Vec::new();

        for frame in 0..3 {
            let report = target.render();

            if frame > 0 {
                assert_eq!(counts[frame - 1], report.photon_counts);
            }

            counts.push(target.device_counts());
        }

        // Resets of history restart frame parity, but not the photon
        // pipeline
        target.engine.config_mut().resampling.mode = ResamplingMode::Spatial;

        let report = target.render();

        assert!(report.reset);
        assert_eq!(0, report.frame);
        assert_eq!(counts[2], report.photon_counts);

        let counts = target.device_counts();

        target.engine.reset_history();

        let report = target.render();

        assert!(report.reset);
        assert_eq!(counts, report.photon_counts);

        let counts = target.device_counts();
        let report = target.render();

        assert_eq!(counts, report.photon_counts);
    }

    #[test]
    fn disabling_features_releases_their_resources() {
        let mut config = config();

        config.photons.culling.hash_bits = 10;
        config.candidates.presampling.tile_count = 4;
        config.candidates.presampling.tile_size = 8;

        let mut target = Fixture::new(config, uvec2(2, 2));

        target.render();

        let (textures, buffers) = target.live_resources();

        target.engine.config_mut().photons.culling.enabled = true;
        target.engine.config_mut().candidates.presampling.enabled = true;
        target.render();

        // Culling mask, PDF chain and presampled tiles
        assert_eq!((textures + 1, buffers + 2), target.live_resources());

        target.engine.config_mut().photons.culling.enabled = false;
        target.render();

        assert_eq!((textures, buffers + 2), target.live_resources());

        target.engine.config_mut().candidates.presampling.enabled = false;
        target.render();

        assert_eq!((textures, buffers), target.live_resources());

        target.engine.config_mut().photons.culling.enabled = true;
        target.render();

        assert_eq!((textures + 1, buffers), target.live_resources());
    }

    #[test]
    fn first_frame_skips_resampling() {
        let mut target = Fixture::new(config(), uvec2(2, 2));

        let report = target.render();

        assert!(report.reset);
        assert_eq!(0, report.frame);
        assert_eq!(Slot::A, report.parity);
        assert_eq!(ResamplingMode::NoResampling, report.mode);
        assert_eq!([0, 0], report.photon_counts);

        let report = target.render();

        assert!(!report.reset);
        assert_eq!(Slot::B, report.parity);
        assert_eq!(ResamplingMode::Temporal, report.mode);
    }

    #[test]
    fn resize_resets_history() {
        let mut target = Fixture::new(config(), uvec2(4, 4));

        for _ in 0..3 {
            target.render();
        }

        target.resize(uvec2(2, 2));

        let report = target.render();

        assert!(report.reset);
        assert_eq!(0, report.frame);
        assert_eq!(ResamplingMode::NoResampling, report.mode);
        assert!(target.inspect(uvec2(3, 3)).is_none());

        let inspection = target.inspect(uvec2(1, 1)).unwrap();

        assert!(inspection.surface.is_valid());
        assert!(inspection.reservoir.m >= 1.0);
        assert!(inspection.reservoir.w > 0.0);

        let report = target.render();

        assert!(!report.reset);
        assert_eq!(1, report.frame);
        assert_eq!(ResamplingMode::Temporal, report.mode);
    }

    #[test]
    fn builds_over_delayed_counts() {
        let mut target = Fixture::new(config(), uvec2(2, 2));
        let report = target.render();

        // Nothing has been read back yet, so the first build covers all
        // capacity
        assert_eq!([256, 64], report.build_counts);

        for _ in 0..2 {
            let report = target.render();

            let expected = PhotonKind::ALL.map(|kind| {
                build_count(
                    false,
                    report.photon_counts[kind.index()],
                    config().photons.capacities[kind.index()],
                    config().photons.accel_overestimate,
                )
            });

            assert_eq!(expected, report.build_counts);
        }
    }

    #[test]
    fn commits_pending_config() {
        let mut target = Fixture::new(config(), uvec2(2, 2));

        target.render();
        target.render();
        target.engine.config_mut().photons.capacities = [128, 32];

        assert_eq!([256, 64], target.engine.config().photons.capacities);

        let report = target.render();

        assert_eq!([128, 32], target.engine.config().photons.capacities);
        assert_eq!([128, 32], report.build_counts);

        // Capacities don't affect history
        assert!(!report.reset);
    }

    #[test]
    fn switching_modes_evicts_kernels() {
        let mut target = Fixture::new(config(), uvec2(2, 2));

        target.render();
        target.render();

        assert!(target
            .engine
            .kernels()
            .entry_points()
            .contains(&TEMPORAL_RESAMPLING));

        target.engine.config_mut().resampling.mode = ResamplingMode::Spatial;

        let report = target.render();
        let entry_points = target.engine.kernels().entry_points();

        assert!(report.reset);
        assert!(!entry_points.contains(&TEMPORAL_RESAMPLING));
        assert!(!entry_points.contains(&SPATIAL_RESAMPLING));

        let report = target.render();

        assert_eq!(ResamplingMode::Spatial, report.mode);
        assert_eq!(report.parity.other(), report.result);

        assert!(target
            .engine
            .kernels()
            .entry_points()
            .contains(&SPATIAL_RESAMPLING));

        assert_eq!(target.engine.kernels().len(), target.device.live_kernels());
    }

    #[test]
    fn barriers() {
        let mut target = Fixture::new(config(), uvec2(2, 2));

        target.device.take_commands();
        target.render();

        let commands = target.device.take_commands();

        let generation = commands
            .iter()
            .position(|command| {
                matches!(
                    command,
                    Command::Dispatch { entry_point, .. }
                        if entry_point == PHOTON_GENERATION
                )
            })
            .unwrap();

        assert_eq!(
            [
                Command::Barrier,
                Command::CopyBuffer,
                Command::BuildBottomAccel { count: 256 },
                Command::Barrier,
                Command::BuildBottomAccel { count: 64 },
                Command::Barrier,
                Command::BuildTopAccel,
                Command::Barrier,
            ],
            commands[generation + 1..generation + 9]
        );

        for pair in commands.windows(2) {
            if let Command::Dispatch { .. } = pair[0] {
                assert_eq!(Command::Barrier, pair[1]);
            }
        }

        assert_eq!(Some(&Command::Barrier), commands.last());
    }

    #[test]
    fn missing_inputs() {
        let mut target = Fixture::new(config(), uvec2(2, 2));
        let color = target.data.output(COLOR.name).unwrap();

        let data = RenderData::new(uvec2(2, 2), Vec3::ZERO)
            .with_output(&COLOR, color);

        assert!(matches!(
            target.engine.execute(&mut target.device, &data),
            Err(Error::MissingInputs { .. })
        ));

        let mut data = RenderData::new(uvec2(2, 2), Vec3::ZERO);

        for channel in [POSITION, NORMAL, ALBEDO, MOTION] {
            let id = target.data.input(channel.name).unwrap();

            data = data.with_input(&channel, id);
        }

        assert!(matches!(
            target.engine.execute(&mut target.device, &data),
            Err(Error::MissingOutput(_))
        ));

        // Failed frames don't leave anything behind
        let report = target.render();

        assert!(report.reset);
        assert_eq!(0, report.frame);
    }

    #[test]
    fn ray_tracing_unsupported() {
        let mut target = Fixture::with_device(
            SoftwareDevice::without_ray_tracing(),
            config(),
            uvec2(2, 2),
        );

        assert!(matches!(
            target.engine.execute(&mut target.device, &target.data),
            Err(Error::RayTracingUnsupported)
        ));

        assert_eq!(0, target.device.live_accels());

        assert!(!target.device.commands().iter().any(|command| matches!(
            command,
            Command::Dispatch { .. } | Command::BuildBottomAccel { .. }
        )));
    }

    #[test]
    fn missing_scene() {
        let mut device = SoftwareDevice::new();
        let (data, _) = Fixture::render_data(&mut device, uvec2(2, 2));
        let mut engine = Engine::new(config()).unwrap();

        assert!(matches!(
            engine.execute(&mut device, &data),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn destroy() {
        let mut target = Fixture::new(config(), uvec2(2, 2));

        target.render();

        let buffers = target.device.live_buffers();
        let Fixture { mut device, engine, .. } = target;

        engine.destroy(&mut device);

        assert_eq!(0, device.live_kernels());
        assert_eq!(0, device.live_accels());
        assert!(device.live_buffers() < buffers);
    }
}
