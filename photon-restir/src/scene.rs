use std::mem;

use glam::{UVec2, Vec4};
use log::debug;
use photon_restir_gpu::{Camera, Light, SceneView, Triangle, TriangleHit};

use crate::{Bindings, Device, Result, StorageBuffer};

/// Scene the pipeline renders, as seen by the pipeline.
///
/// The pipeline never modifies the scene; it only binds its buffers and
/// watches [`Scene::lights_generation()`] to find out when the light sampler
/// has to be rebuilt.
pub trait Scene {
    fn lights(&self) -> &[Light];

    /// Number that changes whenever the set of lights (or their emission)
    /// changes.
    fn lights_generation(&self) -> u64;

    /// Whether emissive (area) lights take part in lighting; when they
    /// don't, only analytic lights are sampled.
    fn uses_emissive_lights(&self) -> bool;

    fn geometry_count(&self) -> usize;

    /// Binds the scene's geometry (as `triangles`) and lights (as `lights`).
    fn bind(&self, bindings: Bindings) -> Bindings;
}

/// Triangle-soup scene, uploaded into two storage buffers.
#[derive(Debug)]
pub struct ReferenceScene {
    triangles: Vec<Triangle>,
    lights: Vec<Light>,
    triangles_buffer: StorageBuffer,
    lights_buffer: StorageBuffer,
    lights_generation: u64,
    uses_emissive_lights: bool,
}

impl ReferenceScene {
    pub fn new(
        device: &mut dyn Device,
        triangles: Vec<Triangle>,
        lights: Vec<Light>,
    ) -> Result<Self> {
        debug!(
            "Uploading scene; triangles={}, lights={}",
            triangles.len(),
            lights.len()
        );

        let triangles_buffer = upload(device, "scene_triangles", &triangles)?;
        let lights_buffer = upload(device, "scene_lights", &lights)?;

        Ok(Self {
            triangles,
            lights,
            triangles_buffer,
            lights_buffer,
            lights_generation: 0,
            uses_emissive_lights: true,
        })
    }

    /// Replaces all lights.
    pub fn set_lights(
        &mut self,
        device: &mut dyn Device,
        lights: Vec<Light>,
    ) -> Result<()> {
        let lights_buffer = upload(device, "scene_lights", &lights)?;

        mem::replace(&mut self.lights_buffer, lights_buffer).destroy(device);

        self.lights = lights;
        self.lights_generation += 1;

        Ok(())
    }

    pub fn set_uses_emissive_lights(&mut self, enabled: bool) {
        if self.uses_emissive_lights != enabled {
            self.uses_emissive_lights = enabled;
            self.lights_generation += 1;
        }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn view(&self) -> SceneView<'_> {
        SceneView::new(&self.triangles)
    }

    /// Traces primary rays and returns the visibility buffer, one
    /// [`TriangleHit::pack()`]-ed texel per pixel.
    pub fn render_vbuffer(&self, camera: &Camera) -> Vec<[u32; 4]> {
        self.render(camera, |hit| TriangleHit::pack(hit.map(|(hit, _)| hit)))
    }

    /// Traces primary rays and returns world-space positions, normals and
    /// albedos, as expected by the simplified input bundle.
    pub fn render_gbuffer(&self, camera: &Camera) -> GBuffer {
        let texels = self.render(camera, |hit| match hit {
            Some((hit, triangle)) => {
                let position = triangle.position_at(hit.u, hit.v);
                let mut normal = triangle.normal();

                if normal.dot(camera.origin - position) < 0.0 {
                    normal = -normal;
                }

                (
                    position.extend(1.0),
                    normal.extend(0.0),
                    triangle.albedo().extend(1.0 - triangle.specular),
                )
            }

            None => (Vec4::ZERO, Vec4::ZERO, Vec4::ZERO),
        });

        let mut gbuffer = GBuffer::default();

        for (position, normal, albedo) in texels {
            gbuffer.positions.push(position);
            gbuffer.normals.push(normal);
            gbuffer.albedos.push(albedo);
        }

        gbuffer
    }

    fn render<T>(
        &self,
        camera: &Camera,
        f: impl Fn(Option<(TriangleHit, Triangle)>) -> T,
    ) -> Vec<T> {
        let scene = self.view();
        let dims = camera.dims;

        (0..dims.y)
            .flat_map(|y| (0..dims.x).map(move |x| UVec2::new(x, y)))
            .map(|pos| {
                let hit = scene
                    .trace(camera.ray(pos), f32::MAX)
                    .map(|hit| (hit, scene.triangle(hit.triangle_id)));

                f(hit)
            })
            .collect()
    }

    pub fn destroy(self, device: &mut dyn Device) {
        self.triangles_buffer.destroy(device);
        self.lights_buffer.destroy(device);
    }
}

impl Scene for ReferenceScene {
    fn lights(&self) -> &[Light] {
        &self.lights
    }

    fn lights_generation(&self) -> u64 {
        self.lights_generation
    }

    fn uses_emissive_lights(&self) -> bool {
        self.uses_emissive_lights
    }

    fn geometry_count(&self) -> usize {
        self.triangles.len()
    }

    fn bind(&self, bindings: Bindings) -> Bindings {
        bindings
            .buffer("triangles", self.triangles_buffer.id())
            .buffer("lights", self.lights_buffer.id())
    }
}

/// Host-side surface attributes of each pixel.
#[derive(Clone, Debug, Default)]
pub struct GBuffer {
    pub positions: Vec<Vec4>,
    pub normals: Vec<Vec4>,
    pub albedos: Vec<Vec4>,
}

fn upload<T>(
    device: &mut dyn Device,
    label: &str,
    items: &[T],
) -> Result<StorageBuffer>
where
    T: bytemuck::Pod,
{
    let bytes: &[u8] = bytemuck::cast_slice(items);
    let buffer = StorageBuffer::new(device, label, bytes.len() as u64)?;

    device.write_buffer(buffer.id(), 0, bytes)?;

    Ok(buffer)
}
