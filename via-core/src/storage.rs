use embedded_storage::Storage;

use crate::config::{EepromLayout, ViaConfig};
use crate::dynamic_keymap::DynamicKeymap;
use crate::eeconfig::EeConfig;
use crate::eeprom::Eeprom;
use crate::error::Error;
use crate::keyboard_macros::{MacroBuffer, MacroOperation};

/// Everything VIA persists: validity record, layout options, dynamic keymap and macros.
///
/// All stores are views into the one eeprom, which is owned here.
pub struct ViaStorage<'a, F: Storage, const ROW: usize, const COL: usize, const NUM_LAYER: usize> {
    eeprom: Eeprom<F>,
    layout: EepromLayout,
    eeconfig: EeConfig,
    keymap: DynamicKeymap<'a, ROW, COL, NUM_LAYER>,
    macros: MacroBuffer,
    default_layout_options: u32,
    clear_storage: bool,
}

impl<'a, F: Storage, const ROW: usize, const COL: usize, const NUM_LAYER: usize> ViaStorage<'a, F, ROW, COL, NUM_LAYER> {
    /// Create the storage, `base` is the start address of the eeprom in `storage`.
    ///
    /// Nothing is read or written until [`ViaStorage::init`].
    pub fn new(
        storage: F,
        base: u32,
        default_keymap: &'a [[[u16; COL]; ROW]; NUM_LAYER],
        config: &ViaConfig,
    ) -> Result<Self, Error> {
        let eeprom = Eeprom::new(storage, base)?;
        let layout = EepromLayout::new::<ROW, COL, NUM_LAYER>(config, eeprom.size())?;
        info!(
            "VIA storage: magic at {}, keymap at {}, {} bytes of macros at {}",
            layout.magic_addr,
            layout.keymap_addr,
            layout.macro_size,
            layout.macro_addr
        );
        Ok(Self {
            eeprom,
            eeconfig: EeConfig::new(config, &layout),
            keymap: DynamicKeymap::new(&layout, default_keymap),
            macros: MacroBuffer::new(&layout),
            layout,
            default_layout_options: config.default_layout_options,
            clear_storage: config.clear_storage,
        })
    }

    /// Load the persisted region, restoring defaults if it's invalid or `clear_storage` is set.
    ///
    /// Returns true if the defaults were restored.
    pub fn init(&mut self) -> Result<bool, Error> {
        match self.ensure_valid() {
            Ok(()) if !self.clear_storage => {
                debug!("Persisted VIA data is valid");
                return Ok(false);
            }
            Ok(()) => info!("Clearing VIA storage"),
            Err(Error::InvalidPersistedState) => warn!("Persisted VIA data is invalid, restoring defaults"),
            Err(e) => return Err(e),
        }

        // Keep the region invalid until everything is written, so that a reset during
        // initialization is detected on the next boot
        self.eeconfig.set_valid(&mut self.eeprom, false)?;
        self.restore_defaults()?;
        self.eeconfig.set_valid(&mut self.eeprom, true)?;
        Ok(true)
    }

    pub fn is_valid(&mut self) -> Result<bool, Error> {
        self.eeconfig.is_valid(&mut self.eeprom)
    }

    /// Fails with [`Error::InvalidPersistedState`] if the persisted region is invalid.
    pub fn ensure_valid(&mut self) -> Result<(), Error> {
        if self.is_valid()? {
            Ok(())
        } else {
            Err(Error::InvalidPersistedState)
        }
    }

    pub fn set_valid(&mut self, valid: bool) -> Result<(), Error> {
        self.eeconfig.set_valid(&mut self.eeprom, valid)
    }

    /// Invalidate the persisted region, defaults are restored on the next initialization.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.eeconfig.reset(&mut self.eeprom)
    }

    /// Write default layout options and keymap, and clear all macros.
    pub fn restore_defaults(&mut self) -> Result<(), Error> {
        self.eeconfig
            .set_layout_options(&mut self.eeprom, self.default_layout_options)?;
        self.keymap.reset(&mut self.eeprom)?;
        self.macros.reset(&mut self.eeprom)
    }

    pub fn layout(&self) -> &EepromLayout {
        &self.layout
    }

    pub fn eeprom(&self) -> &Eeprom<F> {
        &self.eeprom
    }

    pub fn eeprom_mut(&mut self) -> &mut Eeprom<F> {
        &mut self.eeprom
    }

    pub fn layout_options(&mut self) -> Result<u32, Error> {
        self.eeconfig.layout_options(&mut self.eeprom)
    }

    pub fn set_layout_options(&mut self, value: u32) -> Result<(), Error> {
        self.eeconfig.set_layout_options(&mut self.eeprom, value)
    }

    pub fn layer_count(&self) -> u8 {
        self.keymap.layer_count()
    }

    pub fn get_keycode(&mut self, layer: u8, row: u8, col: u8) -> Result<u16, Error> {
        self.keymap.get_keycode(&mut self.eeprom, layer, row, col)
    }

    pub fn set_keycode(&mut self, layer: u8, row: u8, col: u8, keycode: u16) -> Result<(), Error> {
        self.keymap.set_keycode(&mut self.eeprom, layer, row, col, keycode)
    }

    pub fn reset_keymap(&mut self) -> Result<(), Error> {
        self.keymap.reset(&mut self.eeprom)
    }

    pub fn get_keymap_buffer(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Error> {
        self.keymap.get_buffer(&mut self.eeprom, offset, buf)
    }

    pub fn set_keymap_buffer(&mut self, offset: u16, data: &[u8]) -> Result<(), Error> {
        self.keymap.set_buffer(&mut self.eeprom, offset, data)
    }

    pub fn macro_count(&mut self) -> Result<u8, Error> {
        self.macros.count(&mut self.eeprom)
    }

    pub fn macro_buffer_size(&self) -> u16 {
        self.macros.buffer_size()
    }

    pub fn get_macro_buffer(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Error> {
        self.macros.get_buffer(&mut self.eeprom, offset, buf)
    }

    pub fn set_macro_buffer(&mut self, offset: u16, data: &[u8]) -> Result<(), Error> {
        self.macros.set_buffer(&mut self.eeprom, offset, data)
    }

    pub fn reset_macros(&mut self) -> Result<(), Error> {
        self.macros.reset(&mut self.eeprom)
    }

    pub fn macro_start(&mut self, id: u8) -> Result<Option<u16>, Error> {
        self.macros.macro_start(&mut self.eeprom, id)
    }

    pub fn macro_operation_at(&mut self, offset: u16) -> Result<(MacroOperation, u16), Error> {
        self.macros.operation_at(&mut self.eeprom, offset)
    }
}
