use byteorder::{BigEndian, ByteOrder};
use embedded_storage::Storage;

use crate::config::EepromLayout;
use crate::eeprom::Eeprom;
use crate::error::Error;

/// Keycodes written per `update` when restoring the default keymap
const RESET_CHUNK_KEYS: usize = 16;

/// Dynamic keymap stored in the eeprom.
///
/// Every keycode takes 2 bytes, big-endian, ordered by layer, then row, then column.
pub struct DynamicKeymap<'a, const ROW: usize, const COL: usize, const NUM_LAYER: usize> {
    addr: u32,
    default_keymap: &'a [[[u16; COL]; ROW]; NUM_LAYER],
}

impl<'a, const ROW: usize, const COL: usize, const NUM_LAYER: usize> DynamicKeymap<'a, ROW, COL, NUM_LAYER> {
    /// Size of the stored keymap in bytes
    pub const SIZE: usize = NUM_LAYER * ROW * COL * 2;

    pub fn new(layout: &EepromLayout, default_keymap: &'a [[[u16; COL]; ROW]; NUM_LAYER]) -> Self {
        Self {
            addr: layout.keymap_addr,
            default_keymap,
        }
    }

    pub fn layer_count(&self) -> u8 {
        NUM_LAYER as u8
    }

    fn keycode_addr(&self, layer: u8, row: u8, col: u8) -> Result<u32, Error> {
        let (layer, row, col) = (layer as usize, row as usize, col as usize);
        if layer >= NUM_LAYER || row >= ROW || col >= COL {
            warn!("Keymap position out of range: layer {}, row {}, col {}", layer, row, col);
            return Err(Error::OutOfRange);
        }
        Ok(self.addr + ((layer * ROW * COL + row * COL + col) * 2) as u32)
    }

    fn check_window(&self, offset: u16, len: usize) -> Result<(), Error> {
        if offset as usize + len > Self::SIZE {
            warn!("Keymap buffer window out of range: offset {}, len {}", offset, len);
            return Err(Error::OutOfRange);
        }
        Ok(())
    }

    pub fn get_keycode<F: Storage>(&self, eeprom: &mut Eeprom<F>, layer: u8, row: u8, col: u8) -> Result<u16, Error> {
        let addr = self.keycode_addr(layer, row, col)?;
        let mut buf = [0_u8; 2];
        eeprom.read(addr, &mut buf)?;
        Ok(BigEndian::read_u16(&buf))
    }

    pub fn set_keycode<F: Storage>(
        &self,
        eeprom: &mut Eeprom<F>,
        layer: u8,
        row: u8,
        col: u8,
        keycode: u16,
    ) -> Result<(), Error> {
        let addr = self.keycode_addr(layer, row, col)?;
        let mut buf = [0_u8; 2];
        BigEndian::write_u16(&mut buf, keycode);
        eeprom.update(addr, &buf)
    }

    /// Overwrite the stored keymap with the default keymap
    pub fn reset<F: Storage>(&self, eeprom: &mut Eeprom<F>) -> Result<(), Error> {
        let mut buf = [0_u8; RESET_CHUNK_KEYS * 2];
        let keys = self.default_keymap.as_flattened().as_flattened();
        for (i, chunk) in keys.chunks(RESET_CHUNK_KEYS).enumerate() {
            for (keycode, dst) in chunk.iter().zip(buf.chunks_exact_mut(2)) {
                BigEndian::write_u16(dst, *keycode);
            }
            let addr = self.addr + (i * RESET_CHUNK_KEYS * 2) as u32;
            eeprom.update(addr, &buf[..chunk.len() * 2])?;
        }
        Ok(())
    }

    /// Read the raw keymap bytes starting from `offset`
    pub fn get_buffer<F: Storage>(&self, eeprom: &mut Eeprom<F>, offset: u16, buf: &mut [u8]) -> Result<(), Error> {
        self.check_window(offset, buf.len())?;
        eeprom.read(self.addr + offset as u32, buf)
    }

    /// Write the raw keymap bytes starting from `offset`
    pub fn set_buffer<F: Storage>(&self, eeprom: &mut Eeprom<F>, offset: u16, data: &[u8]) -> Result<(), Error> {
        self.check_window(offset, data.len())?;
        if !data.is_empty() {
            let (layer, row, col) = Self::position_from_offset(offset as usize);
            debug!(
                "Writing {} keymap bytes from layer {}, row {}, col {}",
                data.len(),
                layer,
                row,
                col
            );
        }
        eeprom.update(self.addr + offset as u32, data)
    }

    /// Map a byte offset of the keymap buffer to (layer, row, col)
    pub fn position_from_offset(offset: usize) -> (usize, usize, usize) {
        let idx = offset / 2;
        let layer = idx / (ROW * COL);
        let current_layer_offset = idx % (ROW * COL);
        let row = current_layer_offset / COL;
        let col = current_layer_offset % COL;
        (layer, row, col)
    }
}
