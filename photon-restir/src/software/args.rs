use std::cell::{Ref, RefMut};

use bytemuck::Pod;

use super::{AccelData, Memory, SoftwareDevice, TopLevel};
use crate::{Binding, Bindings, Error, Result};

/// Resources and parameters of a single dispatch, as seen by a software
/// kernel.
pub struct KernelArgs<'a> {
    pub(super) device: &'a SoftwareDevice,
    pub(super) entry_point: &'a str,
    pub(super) bindings: &'a Bindings,
}

impl<'a> KernelArgs<'a> {
    pub fn params<T>(&self) -> Result<T>
    where
        T: Pod,
    {
        bytemuck::try_pod_read_unaligned(self.bindings.params_bytes()).map_err(
            |_| {
                Error::device(format!(
                    "kernel `{}` expects {} bytes of parameters, got {}",
                    self.entry_point,
                    std::mem::size_of::<T>(),
                    self.bindings.params_bytes().len()
                ))
            },
        )
    }

    /// Views a bound resource for reading.
    pub fn read<T>(&self, name: &'static str) -> Result<Ref<'a, [T]>>
    where
        T: Pod,
    {
        self.try_read(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn try_read<T>(&self, name: &'static str) -> Result<Option<Ref<'a, [T]>>>
    where
        T: Pod,
    {
        let Some((binding, memory)) = self.memory(name)? else {
            return Ok(None);
        };

        self.check_hazard(name, binding)?;

        memory.view().map(Some).ok_or_else(|| self.aliased(name))
    }

    /// Views a bound resource for writing.
    pub fn write<T>(&self, name: &'static str) -> Result<RefMut<'a, [T]>>
    where
        T: Pod,
    {
        self.try_write(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn try_write<T>(
        &self,
        name: &'static str,
    ) -> Result<Option<RefMut<'a, [T]>>>
    where
        T: Pod,
    {
        let Some((binding, memory)) = self.memory(name)? else {
            return Ok(None);
        };

        self.check_hazard(name, binding)?;

        let view = memory.view_mut().ok_or_else(|| self.aliased(name))?;

        self.device.hazards.borrow_mut().insert(binding);

        Ok(Some(view))
    }

    /// Returns a bound top-level acceleration structure.
    pub fn accel(&self, name: &'static str) -> Result<&'a TopLevel> {
        let Some(binding @ Binding::Accel(id)) = self.bindings.get(name) else {
            return Err(self.missing(name));
        };

        self.check_hazard(name, binding)?;

        match self.device.accels.get(&id).map(|accel| &accel.data) {
            Some(AccelData::Top(tlas)) => Ok(tlas),

            _ => Err(Error::device(format!(
                "kernel `{}` expects `{}` to be a built top-level \
                 acceleration structure",
                self.entry_point, name
            ))),
        }
    }

    fn memory(&self, name: &'static str) -> Result<Option<(Binding, &'a Memory)>> {
        let Some(binding) = self.bindings.get(name) else {
            return Ok(None);
        };

        let memory = match binding {
            Binding::Buffer(id) => self.device.buffers.get(&id),
            Binding::Texture(id) => {
                self.device.textures.get(&id).map(|texture| &texture.memory)
            }
            Binding::Accel(_) => None,
        };

        memory.map(|memory| Some((binding, memory))).ok_or_else(|| {
            Error::device(format!(
                "kernel `{}` got unknown resource {:?} as `{}`",
                self.entry_point, binding, name
            ))
        })
    }

    fn check_hazard(&self, name: &'static str, binding: Binding) -> Result<()> {
        if self.device.hazards.borrow().contains(&binding) {
            Err(Error::device(format!(
                "kernel `{}` accesses `{}` written without a barrier",
                self.entry_point, name
            )))
        } else {
            Ok(())
        }
    }

    fn missing(&self, name: &'static str) -> Error {
        Error::UnknownBinding {
            entry_point: self.entry_point.to_owned(),
            name,
        }
    }

    fn aliased(&self, name: &'static str) -> Error {
        Error::device(format!(
            "kernel `{}` binds the resource of `{}` more than once",
            self.entry_point, name
        ))
    }
}
