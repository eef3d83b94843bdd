use embedded_storage::Storage;

use crate::config::EepromLayout;
use crate::eeprom::Eeprom;
use crate::error::Error;

/// Bytes read per storage access when scanning the macro buffer
const SCAN_CHUNK_SIZE: usize = 32;

/// Prefix byte of an encoded operation, any other non-zero byte is an ascii character.
const MACRO_PREFIX: u8 = 0x01;

/// One step of a macro, as encoded in the macro buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacroOperation {
    /// 0x00, 1 byte
    /// Marks the end of a macro sequence
    End,
    /// 0x01 01 + 1 byte keycode
    Tap(u8),
    /// 0x01 02 + 1 byte keycode
    Press(u8),
    /// 0x01 03 + 1 byte keycode
    Release(u8),
    /// 0x01 04 + 2 byte for the delay in ms
    Delay(u16),
    /// Anything not covered above is the 1 byte ascii character
    Text(u8),
}

/// Macro buffer stored in the eeprom.
///
/// Macros are stored back to back, each one terminated by 0. The last byte of the buffer is
/// always 0, so that every scan ends inside the buffer.
#[derive(Clone, Copy, Debug)]
pub struct MacroBuffer {
    addr: u32,
    size: u16,
}

impl MacroBuffer {
    pub fn new(layout: &EepromLayout) -> Self {
        Self {
            addr: layout.macro_addr,
            size: layout.macro_size,
        }
    }

    pub fn buffer_size(&self) -> u16 {
        self.size
    }

    fn check_window(&self, offset: u16, len: usize) -> Result<(), Error> {
        if offset as usize + len > self.size as usize {
            warn!("Macro buffer window out of range: offset {}, len {}", offset, len);
            return Err(Error::OutOfRange);
        }
        Ok(())
    }

    /// Number of macros in the buffer.
    ///
    /// Counts terminators up to the one of the last non-empty macro, trailing empty slots are
    /// not counted. The buffer is scanned every time, the result saturates at 255.
    pub fn count<F: Storage>(&self, eeprom: &mut Eeprom<F>) -> Result<u8, Error> {
        let mut buf = [0_u8; SCAN_CHUNK_SIZE];
        let mut count: u16 = 0;
        let mut pending: u16 = 0;
        let mut prev = 0_u8;
        let mut offset = 0_usize;
        while offset < self.size as usize {
            let n = (self.size as usize - offset).min(SCAN_CHUNK_SIZE);
            eeprom.read(self.addr + offset as u32, &mut buf[..n])?;
            for &b in &buf[..n] {
                if b == 0 {
                    if prev != 0 {
                        count = count.saturating_add(pending + 1);
                        pending = 0;
                    } else {
                        pending = pending.saturating_add(1);
                    }
                }
                prev = b;
            }
            offset += n;
        }
        Ok(count.min(u8::MAX as u16) as u8)
    }

    pub fn get_buffer<F: Storage>(&self, eeprom: &mut Eeprom<F>, offset: u16, buf: &mut [u8]) -> Result<(), Error> {
        self.check_window(offset, buf.len())?;
        eeprom.read(self.addr + offset as u32, buf)
    }

    /// Write macro bytes starting from `offset`.
    ///
    /// A write which covers the last byte of the buffer must keep it 0.
    pub fn set_buffer<F: Storage>(&self, eeprom: &mut Eeprom<F>, offset: u16, data: &[u8]) -> Result<(), Error> {
        self.check_window(offset, data.len())?;
        if offset as usize + data.len() == self.size as usize && data.last().is_some_and(|b| *b != 0) {
            warn!("Macro buffer write would overwrite the last terminator");
            return Err(Error::OutOfRange);
        }
        eeprom.update(self.addr + offset as u32, data)
    }

    /// Clear all macros
    pub fn reset<F: Storage>(&self, eeprom: &mut Eeprom<F>) -> Result<(), Error> {
        eeprom.fill(self.addr, self.size as usize, 0)
    }

    /// Offset of macro `id` in the buffer, `None` if the buffer has fewer macros.
    pub fn macro_start<F: Storage>(&self, eeprom: &mut Eeprom<F>, id: u8) -> Result<Option<u16>, Error> {
        if id == 0 {
            return Ok(Some(0));
        }
        let mut buf = [0_u8; SCAN_CHUNK_SIZE];
        let mut remaining = id;
        let mut offset = 0_usize;
        while offset < self.size as usize {
            let n = (self.size as usize - offset).min(SCAN_CHUNK_SIZE);
            eeprom.read(self.addr + offset as u32, &mut buf[..n])?;
            for (i, &b) in buf[..n].iter().enumerate() {
                if b == 0 {
                    remaining -= 1;
                    if remaining == 0 {
                        let start = offset + i + 1;
                        return Ok((start < self.size as usize).then_some(start as u16));
                    }
                }
            }
            offset += n;
        }
        Ok(None)
    }

    /// Decode the operation at `offset`.
    ///
    /// Returns the operation and the offset of the next one. An operation truncated by the end
    /// of the buffer decodes as `End`.
    pub fn operation_at<F: Storage>(&self, eeprom: &mut Eeprom<F>, offset: u16) -> Result<(MacroOperation, u16), Error> {
        if offset >= self.size {
            return Ok((MacroOperation::End, offset));
        }
        let mut buf = [0_u8; 4];
        let n = (self.size - offset).min(4) as usize;
        eeprom.read(self.addr + offset as u32, &mut buf[..n])?;
        let window = &buf[..n];

        let op = match window {
            [0, ..] => (MacroOperation::End, offset),
            [MACRO_PREFIX, 1, keycode, ..] => (MacroOperation::Tap(*keycode), offset + 3),
            [MACRO_PREFIX, 2, keycode, ..] => (MacroOperation::Press(*keycode), offset + 3),
            [MACRO_PREFIX, 3, keycode, ..] => (MacroOperation::Release(*keycode), offset + 3),
            [MACRO_PREFIX, 4, low, high] => {
                // Both bytes are stored +1, so that they are never 0
                let delay_ms = low.saturating_sub(1) as u16 + high.saturating_sub(1) as u16 * 255;
                (MacroOperation::Delay(delay_ms), offset + 4)
            }
            [MACRO_PREFIX, ..] => {
                warn!("Unsupported or truncated macro operation at {}", offset);
                (MacroOperation::End, offset)
            }
            [c, ..] => (MacroOperation::Text(*c), offset + 1),
            [] => (MacroOperation::End, offset),
        };
        Ok(op)
    }
}
