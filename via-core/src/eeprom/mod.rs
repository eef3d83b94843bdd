mod ram;

use embedded_storage::nor_flash::{NorFlash, RmwNorFlashStorage};
use embedded_storage::Storage;
pub use ram::{RamStorage, RamStorageError};

use crate::error::Error;

/// Chunk size used when comparing or filling the region.
const CHUNK_SIZE: usize = 32;

/// Eeprom based on any storage device which implements `embedded-storage::Storage` trait.
///
/// All addresses are relative to `base`, the start of the persisted region in the backing
/// storage. Every access is bounds checked as a whole before touching the storage, so a
/// rejected access never writes a single byte.
pub struct Eeprom<F: Storage> {
    storage: F,
    base: u32,
    size: u32,
}

impl<F: Storage> Eeprom<F> {
    /// Create an eeprom which occupies the backing storage from `base` to its end.
    pub fn new(storage: F, base: u32) -> Result<Self, Error> {
        let capacity = storage.capacity() as u32;
        if base > capacity {
            error!("Eeprom base {:#X} is beyond storage capacity {}", base, capacity);
            return Err(Error::LayoutOverflow);
        }
        debug!("Eeprom: {} bytes starting from {:#X}", capacity - base, base);
        Ok(Self {
            storage,
            base,
            size: capacity - base,
        })
    }

    /// Size of the persisted region in bytes
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn storage(&self) -> &F {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut F {
        &mut self.storage
    }

    pub fn into_inner(self) -> F {
        self.storage
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<(), Error> {
        match addr.checked_add(len as u32) {
            Some(end) if end <= self.size => Ok(()),
            _ => {
                warn!("Eeprom access out of range: addr {:#X}, len {}", addr, len);
                Err(Error::OutOfRange)
            }
        }
    }

    /// Read `buf.len()` bytes starting from `addr`.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error> {
        self.check_range(addr, buf.len())?;
        self.storage.read(self.base + addr, buf).map_err(|_| {
            error!("Storage read error at {:#X}", self.base + addr);
            Error::Backend
        })
    }

    /// Write `data` starting from `addr`.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Error> {
        self.check_range(addr, data.len())?;
        self.storage.write(self.base + addr, data).map_err(|_| {
            error!("Storage write error at {:#X}", self.base + addr);
            Error::Backend
        })
    }

    /// Write `data` starting from `addr`, skipping chunks whose content is unchanged.
    pub fn update(&mut self, addr: u32, data: &[u8]) -> Result<(), Error> {
        self.check_range(addr, data.len())?;
        let mut current = [0_u8; CHUNK_SIZE];
        for (i, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
            let chunk_addr = addr + (i * CHUNK_SIZE) as u32;
            let current = &mut current[..chunk.len()];
            self.read(chunk_addr, current)?;
            if current != chunk {
                self.write(chunk_addr, chunk)?;
            }
        }
        Ok(())
    }

    /// Set `len` bytes starting from `addr` to `value`.
    pub fn fill(&mut self, addr: u32, len: usize, value: u8) -> Result<(), Error> {
        self.check_range(addr, len)?;
        let chunk = [value; CHUNK_SIZE];
        let mut written = 0;
        while written < len {
            let n = (len - written).min(CHUNK_SIZE);
            self.update(addr + written as u32, &chunk[..n])?;
            written += n;
        }
        Ok(())
    }
}

/// Use a `NorFlash` as byte-addressed storage.
///
/// Each write erases and rewrites the touched sectors, `merge_buffer` must hold at least one
/// sector, aka `F::ERASE_SIZE` bytes.
pub fn nor_flash_storage<F: NorFlash>(flash: F, merge_buffer: &mut [u8]) -> RmwNorFlashStorage<'_, F> {
    RmwNorFlashStorage::new(flash, merge_buffer)
}
