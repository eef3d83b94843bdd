use embedded_storage::{ReadStorage, Storage};

/// Error of [`RamStorage`], only returned for an access beyond its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RamStorageError;

/// Byte storage kept in RAM, initialized to `0xFF` like erased flash.
///
/// Useful for keyboards without persistent storage, and for tests.
#[derive(Clone)]
pub struct RamStorage<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> Default for RamStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RamStorage<N> {
    pub const fn new() -> Self {
        Self { data: [0xFF; N] }
    }

    pub const fn from_bytes(data: [u8; N]) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.data
    }

    pub fn into_bytes(self) -> [u8; N] {
        self.data
    }
}

impl<const N: usize> ReadStorage for RamStorage<N> {
    type Error = RamStorageError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let src = self.data.get(start..start + bytes.len()).ok_or(RamStorageError)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Storage for RamStorage<N> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let dst = self.data.get_mut(start..start + bytes.len()).ok_or(RamStorageError)?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}
