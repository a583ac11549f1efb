//! CPU implementation of [`Device`], running the reference kernels.
//!
//! Besides executing commands, the device validates them the way a strict
//! driver would: resources written by a dispatch (or an acceleration-structure
//! build) can't be accessed again until a [`Device::barrier()`], and a
//! resource can't be bound twice with conflicting access.

mod accel;
mod args;
mod kernels;
mod memory;

use std::cell::RefCell;

use derivative::Derivative;
use fxhash::{FxHashMap, FxHashSet};
use glam::UVec2;
use log::trace;
use photon_restir_gpu::PhotonAabb;

use self::accel::*;
use self::args::*;
use self::kernels::KernelFn;
use self::memory::*;
use crate::{
    AccelId, AccelLevel, AccelSizes, Binding, Bindings, BottomAccelBuild,
    BufferDesc, BufferId, Device, DeviceFeatures, Error, KernelDesc, KernelId,
    Result, TextureDesc, TextureId, TopAccelBuild,
};

/// Command recorded by [`SoftwareDevice`], for inspection in tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Dispatch { entry_point: String, size: UVec2 },
    Barrier,
    BuildBottomAccel { count: u32 },
    BuildTopAccel,
    CopyBuffer,
    CopyTexture,
    ReadBuffer,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct SoftwareDevice {
    features: DeviceFeatures,
    next_id: u32,

    #[derivative(Debug = "ignore")]
    buffers: FxHashMap<BufferId, Memory>,

    #[derivative(Debug = "ignore")]
    textures: FxHashMap<TextureId, TextureEntry>,

    #[derivative(Debug = "ignore")]
    accels: FxHashMap<AccelId, Accel>,

    #[derivative(Debug = "ignore")]
    kernels: FxHashMap<KernelId, KernelEntry>,

    compiled_kernels: usize,

    /// Resources written since the last barrier.
    hazards: RefCell<FxHashSet<Binding>>,

    commands: Vec<Command>,
}

struct TextureEntry {
    size: UVec2,
    format: wgpu::TextureFormat,
    memory: Memory,
}

struct KernelEntry {
    entry_point: String,
    run: KernelFn,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self {
            features: DeviceFeatures { ray_tracing: true },
            next_id: 0,
            buffers: Default::default(),
            textures: Default::default(),
            accels: Default::default(),
            kernels: Default::default(),
            compiled_kernels: 0,
            hazards: Default::default(),
            commands: Default::default(),
        }
    }

    /// Creates a device that reports no ray-tracing support.
    pub fn without_ray_tracing() -> Self {
        Self {
            features: DeviceFeatures { ray_tracing: false },
            ..Self::new()
        }
    }

    /// Number of kernels compiled so far.
    pub fn compiled_kernels(&self) -> usize {
        self.compiled_kernels
    }

    /// Number of kernels compiled and not destroyed yet.
    pub fn live_kernels(&self) -> usize {
        self.kernels.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_accels(&self) -> usize {
        self.accels.len()
    }

    pub fn buffer_size(&self, id: BufferId) -> Option<u64> {
        self.buffers.get(&id).map(|memory| memory.len() as u64)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn buffer(&mut self, id: BufferId) -> Result<&mut Memory> {
        self.buffers
            .get_mut(&id)
            .ok_or_else(|| Error::device(format!("unknown buffer: {:?}", id)))
    }

    fn texture(&mut self, id: TextureId) -> Result<&mut TextureEntry> {
        self.textures
            .get_mut(&id)
            .ok_or_else(|| Error::device(format!("unknown texture: {:?}", id)))
    }

    fn accel(&mut self, id: AccelId) -> Result<&mut Accel> {
        self.accels.get_mut(&id).ok_or_else(|| {
            Error::device(format!("unknown acceleration structure: {:?}", id))
        })
    }

    fn check_hazard(&self, binding: Binding) -> Result<()> {
        if self.hazards.borrow().contains(&binding) {
            Err(Error::device(format!(
                "{:?} is accessed before a barrier made it visible",
                binding
            )))
        } else {
            Ok(())
        }
    }

    fn check_scratch(
        &mut self,
        scratch: BufferId,
        sizes: AccelSizes,
    ) -> Result<()> {
        let size = self.buffer(scratch)?.len() as u64;

        if size < sizes.scratch {
            return Err(Error::device(format!(
                "scratch buffer too small: {} < {}",
                size, sizes.scratch
            )));
        }

        Ok(())
    }
}

impl Device for SoftwareDevice {
    fn features(&self) -> DeviceFeatures {
        self.features
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId> {
        let id = BufferId(self.alloc_id());

        trace!("create_buffer({}) -> {:?}", desc.label, id);

        self.buffers.insert(id, Memory::new(desc.size as usize));

        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        self.buffers.remove(&id);
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let bytes = self.buffer(id)?.bytes_mut();
        let offset = offset as usize;

        bytes
            .get_mut(offset..offset + data.len())
            .ok_or_else(|| Error::device(format!("write out of bounds: {:?}", id)))?
            .copy_from_slice(data);

        Ok(())
    }

    fn clear_buffer(&mut self, id: BufferId) -> Result<()> {
        self.buffer(id)?.bytes_mut().fill(0);

        Ok(())
    }

    fn copy_buffer(&mut self, src: BufferId, dst: BufferId, size: u64) -> Result<()> {
        self.check_hazard(Binding::Buffer(src))?;

        let size = size as usize;

        let data = self
            .buffer(src)?
            .bytes()
            .get(..size)
            .ok_or_else(|| Error::device(format!("copy out of bounds: {:?}", src)))?
            .to_vec();

        self.buffer(dst)?
            .bytes_mut()
            .get_mut(..size)
            .ok_or_else(|| Error::device(format!("copy out of bounds: {:?}", dst)))?
            .copy_from_slice(&data);

        self.commands.push(Command::CopyBuffer);

        Ok(())
    }

    fn read_buffer(&mut self, id: BufferId, data: &mut [u8]) -> Result<()> {
        let bytes = self.buffer(id)?.bytes();

        data.copy_from_slice(
            bytes
                .get(..data.len())
                .ok_or_else(|| Error::device(format!("read out of bounds: {:?}", id)))?,
        );

        self.commands.push(Command::ReadBuffer);

        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        let texel_size = desc.format.block_size(None).ok_or_else(|| {
            Error::device(format!("unsupported texture format: {:?}", desc.format))
        })?;

        let id = TextureId(self.alloc_id());
        let len = (desc.size.x * desc.size.y * texel_size) as usize;

        trace!("create_texture({}) -> {:?}", desc.label, id);

        self.textures.insert(
            id,
            TextureEntry {
                size: desc.size,
                format: desc.format,
                memory: Memory::new(len),
            },
        );

        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    fn texture_desc(&self, id: TextureId) -> Option<(UVec2, wgpu::TextureFormat)> {
        self.textures
            .get(&id)
            .map(|texture| (texture.size, texture.format))
    }

    fn write_texture(&mut self, id: TextureId, data: &[u8]) -> Result<()> {
        let bytes = self.texture(id)?.memory.bytes_mut();

        if bytes.len() != data.len() {
            return Err(Error::device(format!(
                "texture {:?} holds {} bytes, got {}",
                id,
                bytes.len(),
                data.len()
            )));
        }

        bytes.copy_from_slice(data);

        Ok(())
    }

    fn clear_texture(&mut self, id: TextureId) -> Result<()> {
        self.texture(id)?.memory.bytes_mut().fill(0);

        Ok(())
    }

    fn copy_texture(&mut self, src: TextureId, dst: TextureId) -> Result<()> {
        self.check_hazard(Binding::Texture(src))?;

        let (size, format, data) = {
            let src = self.texture(src)?;

            (src.size, src.format, src.memory.bytes().to_vec())
        };

        let dst = self.texture(dst)?;

        if dst.size != size || dst.format != format {
            return Err(Error::device(format!(
                "can't copy {:?} ({:?}) into {:?} ({:?})",
                size, format, dst.size, dst.format
            )));
        }

        dst.memory.bytes_mut().copy_from_slice(&data);

        self.commands.push(Command::CopyTexture);

        Ok(())
    }

    fn read_texture(&mut self, id: TextureId, data: &mut [u8]) -> Result<()> {
        let bytes = self.texture(id)?.memory.bytes();

        if bytes.len() != data.len() {
            return Err(Error::device(format!(
                "texture {:?} holds {} bytes, got {}",
                id,
                bytes.len(),
                data.len()
            )));
        }

        data.copy_from_slice(bytes);

        Ok(())
    }

    fn barrier(&mut self) {
        self.hazards.get_mut().clear();
        self.commands.push(Command::Barrier);
    }

    fn compile(&mut self, desc: &KernelDesc) -> Result<KernelId> {
        let run = kernels::lookup(desc.entry_point).ok_or_else(|| {
            Error::Compilation {
                entry_point: desc.entry_point.to_owned(),
                reason: "unknown entry point".into(),
            }
        })?;

        let id = KernelId(self.alloc_id());

        self.kernels.insert(
            id,
            KernelEntry {
                entry_point: desc.entry_point.to_owned(),
                run,
            },
        );

        self.compiled_kernels += 1;

        Ok(id)
    }

    fn destroy_kernel(&mut self, id: KernelId) {
        self.kernels.remove(&id);
    }

    fn dispatch(
        &mut self,
        kernel: KernelId,
        bindings: &Bindings,
        size: UVec2,
    ) -> Result<()> {
        let kernel = self
            .kernels
            .get(&kernel)
            .ok_or_else(|| Error::device(format!("unknown kernel: {:?}", kernel)))?;

        trace!("dispatch({}, {:?})", kernel.entry_point, size);

        let args = KernelArgs {
            device: self,
            entry_point: &kernel.entry_point,
            bindings,
        };

        (kernel.run)(&args, size)?;

        let entry_point = kernel.entry_point.clone();

        self.commands.push(Command::Dispatch { entry_point, size });

        Ok(())
    }

    fn acceleration_prebuild_info(&self, level: AccelLevel) -> AccelSizes {
        match level {
            AccelLevel::Bottom { primitives } => bottom_sizes(primitives),
            AccelLevel::Top { instances } => top_sizes(instances),
        }
    }

    fn acceleration_alignment(&self) -> u64 {
        ALIGNMENT
    }

    fn create_acceleration(&mut self, label: &str, size: u64) -> Result<AccelId> {
        if !self.features.ray_tracing {
            return Err(Error::RayTracingUnsupported);
        }

        let id = AccelId(self.alloc_id());

        trace!("create_acceleration({}) -> {:?}", label, id);

        self.accels.insert(
            id,
            Accel {
                size,
                data: AccelData::Empty,
            },
        );

        Ok(id)
    }

    fn destroy_acceleration(&mut self, id: AccelId) {
        self.accels.remove(&id);
    }

    fn build_bottom_acceleration(&mut self, build: &BottomAccelBuild) -> Result<()> {
        if !self.features.ray_tracing {
            return Err(Error::RayTracingUnsupported);
        }

        let sizes = bottom_sizes(build.count);

        self.check_hazard(Binding::Buffer(build.aabbs))?;
        self.check_scratch(build.scratch, sizes)?;

        let stride = build.stride as usize;
        let record = std::mem::size_of::<PhotonAabb>();

        if stride < record {
            return Err(Error::device(format!("invalid AABB stride: {}", stride)));
        }

        let aabbs: Vec<PhotonAabb> = {
            let bytes = self.buffer(build.aabbs)?.bytes();

            (0..build.count as usize)
                .map(|idx| {
                    bytes
                        .get(idx * stride..idx * stride + record)
                        .map(bytemuck::pod_read_unaligned)
                })
                .collect::<Option<_>>()
                .ok_or_else(|| {
                    Error::device(format!(
                        "AABB buffer {:?} holds less than {} primitives",
                        build.aabbs, build.count
                    ))
                })?
        };

        let accel = self.accel(build.dst)?;

        if accel.size < sizes.result {
            return Err(Error::device(format!(
                "acceleration structure {:?} too small: {} < {}",
                build.dst, accel.size, sizes.result
            )));
        }

        accel.data = AccelData::Bottom(aabbs);

        self.hazards.get_mut().insert(Binding::Accel(build.dst));

        self.commands
            .push(Command::BuildBottomAccel { count: build.count });

        Ok(())
    }

    fn build_top_acceleration(&mut self, build: &TopAccelBuild) -> Result<()> {
        if !self.features.ray_tracing {
            return Err(Error::RayTracingUnsupported);
        }

        let sizes = top_sizes(build.instances.len() as u32);

        self.check_scratch(build.scratch, sizes)?;

        let mut tlas = TopLevel::default();

        for instance in build.instances {
            self.check_hazard(Binding::Accel(instance.blas))?;

            let AccelData::Bottom(aabbs) = &self.accel(instance.blas)?.data else {
                return Err(Error::device(format!(
                    "{:?} is not a built bottom-level acceleration structure",
                    instance.blas
                )));
            };

            tlas.push(instance.instance_id, instance.mask, aabbs.clone());
        }

        let accel = self.accel(build.dst)?;

        if accel.size < sizes.result {
            return Err(Error::device(format!(
                "acceleration structure {:?} too small: {} < {}",
                build.dst, accel.size, sizes.result
            )));
        }

        accel.data = AccelData::Top(tlas);

        self.hazards.get_mut().insert(Binding::Accel(build.dst));
        self.commands.push(Command::BuildTopAccel);

        Ok(())
    }
}
