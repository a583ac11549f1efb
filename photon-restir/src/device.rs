use std::collections::BTreeMap;

use bytemuck::Pod;
use glam::UVec2;

use crate::Result;

macro_rules! ids {
    ($( $(#[$meta:meta])* $name:ident, )*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);
        )*
    };
}

ids! {
    BufferId,
    TextureId,
    KernelId,
    /// Acceleration structure (either bottom- or top-level).
    AccelId,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceFeatures {
    pub ray_tracing: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub size: u64,
    pub usage: wgpu::BufferUsages,
}

#[derive(Clone, Copy, Debug)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub size: UVec2,
    pub format: wgpu::TextureFormat,
}

#[derive(Clone, Copy, Debug)]
pub struct KernelDesc<'a> {
    pub entry_point: &'a str,
    pub defines: &'a BTreeMap<String, String>,
}

/// Memory requirements of an acceleration-structure build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccelSizes {
    pub result: u64,
    pub scratch: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccelLevel {
    /// Procedural (AABB) geometry.
    Bottom { primitives: u32 },
    Top { instances: u32 },
}

#[derive(Clone, Copy, Debug)]
pub struct BottomAccelBuild {
    pub dst: AccelId,
    pub aabbs: BufferId,
    pub stride: u64,
    pub count: u32,
    pub scratch: BufferId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccelInstance {
    pub blas: AccelId,
    pub instance_id: u32,
    pub mask: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct TopAccelBuild<'a> {
    pub dst: AccelId,
    pub instances: &'a [AccelInstance],
    pub scratch: BufferId,
}

/// Resource bound to a kernel under a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
    Buffer(BufferId),
    Texture(TextureId),
    Accel(AccelId),
}

/// Named resources and push-constant-like parameters of a single dispatch.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    entries: Vec<(&'static str, Binding)>,
    params: Vec<u8>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(self, name: &'static str, id: BufferId) -> Self {
        self.with(name, Binding::Buffer(id))
    }

    pub fn texture(self, name: &'static str, id: TextureId) -> Self {
        self.with(name, Binding::Texture(id))
    }

    pub fn accel(self, name: &'static str, id: AccelId) -> Self {
        self.with(name, Binding::Accel(id))
    }

    pub fn texture_opt(self, name: &'static str, id: Option<TextureId>) -> Self {
        if let Some(id) = id {
            self.texture(name, id)
        } else {
            self
        }
    }

    pub fn buffer_opt(self, name: &'static str, id: Option<BufferId>) -> Self {
        if let Some(id) = id {
            self.buffer(name, id)
        } else {
            self
        }
    }

    pub fn params<T>(mut self, params: &T) -> Self
    where
        T: Pod,
    {
        self.params = bytemuck::bytes_of(params).to_vec();
        self
    }

    fn with(mut self, name: &'static str, binding: Binding) -> Self {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name)
        {
            entry.1 = binding;
        } else {
            self.entries.push((name, binding));
        }

        self
    }

    pub fn get(&self, name: &str) -> Option<Binding> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, binding)| *binding)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Binding)> + '_ {
        self.entries.iter().copied()
    }

    pub fn params_bytes(&self) -> &[u8] {
        &self.params
    }
}

/// Compute device the pipeline runs on.
///
/// All commands are recorded into a single, strictly ordered queue; readbacks
/// (`read_*`) wait for all previously recorded commands to complete.
pub trait Device {
    fn features(&self) -> DeviceFeatures;

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId>;
    fn destroy_buffer(&mut self, id: BufferId);
    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<()>;
    fn clear_buffer(&mut self, id: BufferId) -> Result<()>;
    fn copy_buffer(&mut self, src: BufferId, dst: BufferId, size: u64) -> Result<()>;
    fn read_buffer(&mut self, id: BufferId, data: &mut [u8]) -> Result<()>;

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId>;
    fn destroy_texture(&mut self, id: TextureId);
    fn texture_desc(&self, id: TextureId) -> Option<(UVec2, wgpu::TextureFormat)>;
    fn write_texture(&mut self, id: TextureId, data: &[u8]) -> Result<()>;
    fn clear_texture(&mut self, id: TextureId) -> Result<()>;
    fn copy_texture(&mut self, src: TextureId, dst: TextureId) -> Result<()>;
    fn read_texture(&mut self, id: TextureId, data: &mut [u8]) -> Result<()>;

    /// Makes writes of all previously recorded commands visible to the
    /// following ones.
    fn barrier(&mut self);

    fn compile(&mut self, desc: &KernelDesc) -> Result<KernelId>;
    fn destroy_kernel(&mut self, id: KernelId);

    /// Runs `kernel` over a `size.x * size.y` grid of threads.
    fn dispatch(
        &mut self,
        kernel: KernelId,
        bindings: &Bindings,
        size: UVec2,
    ) -> Result<()>;

    fn acceleration_prebuild_info(&self, level: AccelLevel) -> AccelSizes;

    /// Required alignment of acceleration-structure and scratch sizes.
    fn acceleration_alignment(&self) -> u64;

    fn create_acceleration(&mut self, label: &str, size: u64) -> Result<AccelId>;
    fn destroy_acceleration(&mut self, id: AccelId);

    /// Builds a bottom-level structure over `build.count` AABBs, from scratch,
    /// with each primitive's any-hit invoked at most once.
    fn build_bottom_acceleration(&mut self, build: &BottomAccelBuild) -> Result<()>;

    /// Builds a top-level structure over identity-transformed instances,
    /// from scratch, preferring build speed over trace speed.
    fn build_top_acceleration(&mut self, build: &TopAccelBuild) -> Result<()>;
}

/// Reads a whole buffer of `Pod` values.
pub fn read_buffer_as<T>(
    device: &mut dyn Device,
    id: BufferId,
    len: usize,
) -> Result<Vec<T>>
where
    T: Pod,
{
    let mut items = vec![T::zeroed(); len];

    device.read_buffer(id, bytemuck::cast_slice_mut(&mut items))?;

    Ok(items)
}

/// Reads a whole texture of `Pod` texels.
pub fn read_texture_as<T>(device: &mut dyn Device, id: TextureId) -> Result<Vec<T>>
where
    T: Pod,
{
    let (size, _) = device
        .texture_desc(id)
        .ok_or_else(|| crate::Error::device(format!("unknown texture: {:?}", id)))?;

    let mut texels = vec![T::zeroed(); (size.x * size.y) as usize];

    device.read_texture(id, bytemuck::cast_slice_mut(&mut texels))?;

    Ok(texels)
}
