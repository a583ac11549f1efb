use std::cell::{Ref, RefCell, RefMut};
use std::mem;

use bytemuck::{Pod, Zeroable};

/// Unit of software-device memory; keeps every allocation 16-byte aligned,
/// so that it can be viewed as a slice of any record.
#[repr(C, align(16))]
#[derive(Clone, Copy, Default)]
struct Block([u32; 4]);

// Safety: `Block` is a plain array of integers without any padding
unsafe impl Zeroable for Block {}
unsafe impl Pod for Block {}

/// Contents of a buffer or a texture.
///
/// Kernels borrow memories through [`RefCell`]s, so that one dispatch can
/// view many resources at once while a resource bound twice with
/// conflicting access is caught instead of aliased.
pub struct Memory {
    blocks: RefCell<Vec<Block>>,
    len: usize,
}

impl Memory {
    pub fn new(len: usize) -> Self {
        Self {
            blocks: RefCell::new(vec![Block::default(); len.div_ceil(16)]),
            len,
        }
    }

    /// Size, in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn bytes(&mut self) -> &[u8] {
        let len = self.len;
        let blocks = self.blocks.get_mut().as_slice();

        &bytemuck::cast_slice::<_, u8>(blocks)[..len]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        let blocks = self.blocks.get_mut().as_mut_slice();

        &mut bytemuck::cast_slice_mut::<_, u8>(blocks)[..len]
    }

    /// Views the memory as a slice of `T`; trailing bytes that don't fit a
    /// whole `T` are left out.
    ///
    /// Returns `None` if the memory is already borrowed mutably.
    pub fn view<T>(&self) -> Option<Ref<'_, [T]>>
    where
        T: Pod,
    {
        let len = self.len / mem::size_of::<T>() * mem::size_of::<T>();
        let blocks = self.blocks.try_borrow().ok()?;

        Some(Ref::map(blocks, |blocks| {
            bytemuck::cast_slice::<u8, T>(
                &bytemuck::cast_slice::<_, u8>(blocks.as_slice())[..len],
            )
        }))
    }

    /// Mutable counterpart of [`Self::view()`]; returns `None` if the memory
    /// is already borrowed.
    pub fn view_mut<T>(&self) -> Option<RefMut<'_, [T]>>
    where
        T: Pod,
    {
        let len = self.len / mem::size_of::<T>() * mem::size_of::<T>();
        let blocks = self.blocks.try_borrow_mut().ok()?;

        Some(RefMut::map(blocks, |blocks| {
            let bytes = bytemuck::cast_slice_mut::<_, u8>(blocks.as_mut_slice());

            bytemuck::cast_slice_mut::<u8, T>(&mut bytes[..len])
        }))
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    #[test]
    fn views() {
        let mut memory = Memory::new(40);

        memory.bytes_mut()[..4].copy_from_slice(&7u32.to_ne_bytes());

        assert_eq!(40, memory.bytes().len());
        assert_eq!(10, memory.view::<u32>().unwrap().len());
        assert_eq!(2, memory.view::<Vec4>().unwrap().len());
        assert_eq!(7, memory.view::<u32>().unwrap()[0]);
    }

    #[test]
    fn conflicting_borrows() {
        let memory = Memory::new(16);
        let view = memory.view_mut::<u32>().unwrap();

        assert!(memory.view::<u32>().is_none());
        assert!(memory.view_mut::<u32>().is_none());

        drop(view);

        let a = memory.view::<u32>().unwrap();
        let b = memory.view::<u32>().unwrap();

        assert_eq!(a.len(), b.len());
    }
}
