use via_types::protocol::via::{VIA_EEPROM_LAYOUT_OPTIONS_SIZE, VIA_EEPROM_MAGIC_ADDR};

use crate::error::Error;

/// Config for the persisted VIA region
#[derive(Clone, Copy, Debug)]
pub struct ViaConfig {
    /// Address of the magic, relative to the start of the eeprom.
    /// Bytes before it are left to the keyboard.
    pub magic_addr: u32,
    /// Xor-ed into the magic, change it when the keyboard changes its own usage of the eeprom.
    pub extra_magic: u16,
    /// Size of the layout options in bytes, 1..=4
    pub layout_options_size: u8,
    /// Layout options written when the eeprom is reset
    pub default_layout_options: u32,
    /// Size of the macro buffer. If it's `None`(this is the default value), the rest of the eeprom is used.
    pub macro_buffer_size: Option<u16>,
    /// Reset the eeprom to default on every startup
    pub clear_storage: bool,
}

impl Default for ViaConfig {
    fn default() -> Self {
        Self {
            magic_addr: VIA_EEPROM_MAGIC_ADDR,
            extra_magic: 0,
            layout_options_size: VIA_EEPROM_LAYOUT_OPTIONS_SIZE as u8,
            default_layout_options: 0,
            macro_buffer_size: None,
            clear_storage: false,
        }
    }
}

/// Addresses of everything in the persisted region, derived from [`ViaConfig`] and the keymap dimensions.
///
/// ```text
/// | magic: 2 | version: 1 | layout options | keymap: NUM_LAYER * ROW * COL * 2 | macros |
/// ^ magic_addr
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EepromLayout {
    pub magic_addr: u32,
    pub version_addr: u32,
    pub layout_options_addr: u32,
    pub layout_options_size: u8,
    pub keymap_addr: u32,
    pub keymap_size: u32,
    pub macro_addr: u32,
    pub macro_size: u16,
}

impl EepromLayout {
    /// Compute the layout of an eeprom with `capacity` bytes.
    pub fn new<const ROW: usize, const COL: usize, const NUM_LAYER: usize>(
        config: &ViaConfig,
        capacity: u32,
    ) -> Result<Self, Error> {
        if !(1..=4).contains(&config.layout_options_size) {
            error!("Layout options size {} should be in 1..=4", config.layout_options_size);
            return Err(Error::LayoutOverflow);
        }
        if NUM_LAYER > u8::MAX as usize {
            error!("{} layers can't be reported to the host", NUM_LAYER);
            return Err(Error::LayoutOverflow);
        }

        let keymap_size = NUM_LAYER
            .checked_mul(ROW)
            .and_then(|n| n.checked_mul(COL))
            .and_then(|n| n.checked_mul(2))
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(Error::LayoutOverflow)?;
        let version_addr = offset(config.magic_addr, 2)?;
        let layout_options_addr = offset(version_addr, 1)?;
        let keymap_addr = offset(layout_options_addr, config.layout_options_size as u32)?;
        let macro_addr = offset(keymap_addr, keymap_size)?;

        if macro_addr >= capacity {
            error!(
                "Keymap ends at {}, no room for macros in {} bytes eeprom",
                macro_addr, capacity
            );
            return Err(Error::LayoutOverflow);
        }

        let available = capacity - macro_addr;
        let macro_size = match config.macro_buffer_size {
            Some(size) if size == 0 || size as u32 > available => {
                error!("Macro buffer size {} doesn't fit, {} bytes available", size, available);
                return Err(Error::LayoutOverflow);
            }
            Some(size) => size,
            None => available.min(u16::MAX as u32) as u16,
        };

        Ok(Self {
            magic_addr: config.magic_addr,
            version_addr,
            layout_options_addr,
            layout_options_size: config.layout_options_size,
            keymap_addr,
            keymap_size,
            macro_addr,
            macro_size,
        })
    }
}

fn offset(addr: u32, size: u32) -> Result<u32, Error> {
    addr.checked_add(size).ok_or(Error::LayoutOverflow)
}
