use byteorder::{BigEndian, ByteOrder};
use embedded_storage::Storage;
use via_types::protocol::via::{VIA_EEPROM_MAGIC, VIA_EEPROM_VERSION};

use crate::config::{EepromLayout, ViaConfig};
use crate::eeprom::Eeprom;
use crate::error::Error;

/// Size of the magic and version: 3 bytes
const VALIDITY_RECORD_SIZE: usize = 3;

/// Magic, version and layout options of the persisted region.
///
/// The persisted region is valid only if both the magic and the version match the ones of the
/// running firmware. Erased storage, or a region written by a firmware with another layout, is
/// never valid.
#[derive(Clone, Copy, Debug)]
pub struct EeConfig {
    magic_addr: u32,
    layout_options_addr: u32,
    layout_options_size: u8,
    magic: u16,
}

impl EeConfig {
    pub fn new(config: &ViaConfig, layout: &EepromLayout) -> Self {
        Self {
            magic_addr: layout.magic_addr,
            layout_options_addr: layout.layout_options_addr,
            layout_options_size: layout.layout_options_size,
            magic: VIA_EEPROM_MAGIC ^ config.extra_magic,
        }
    }

    /// Expected magic, with the extra magic applied
    pub fn magic(&self) -> u16 {
        self.magic
    }

    /// Returns true only if the stored magic and version both match.
    pub fn is_valid<F: Storage>(&self, eeprom: &mut Eeprom<F>) -> Result<bool, Error> {
        let mut buf = [0_u8; VALIDITY_RECORD_SIZE];
        eeprom.read(self.magic_addr, &mut buf)?;
        let magic = BigEndian::read_u16(&buf[0..2]);
        let version = buf[2];
        if magic != self.magic || version != VIA_EEPROM_VERSION {
            debug!("Persisted magic {:#X}, version {:#X} don't match", magic, version);
            return Ok(false);
        }
        Ok(true)
    }

    /// Mark the persisted region valid or invalid.
    ///
    /// Invalidation writes only the version byte, with a value that never equals the current version.
    pub fn set_valid<F: Storage>(&self, eeprom: &mut Eeprom<F>, valid: bool) -> Result<(), Error> {
        if valid {
            let mut buf = [0_u8; VALIDITY_RECORD_SIZE];
            BigEndian::write_u16(&mut buf[0..2], self.magic);
            buf[2] = VIA_EEPROM_VERSION;
            eeprom.update(self.magic_addr, &buf)
        } else {
            eeprom.update(self.magic_addr + 2, &[!VIA_EEPROM_VERSION])
        }
    }

    /// Invalidate the persisted region, defaults are restored on the next initialization.
    pub fn reset<F: Storage>(&self, eeprom: &mut Eeprom<F>) -> Result<(), Error> {
        warn!("Invalidating persisted VIA data");
        self.set_valid(eeprom, false)
    }

    /// Layout options, big-endian over the configured size
    pub fn layout_options<F: Storage>(&self, eeprom: &mut Eeprom<F>) -> Result<u32, Error> {
        let mut buf = [0_u8; 4];
        let size = self.layout_options_size as usize;
        eeprom.read(self.layout_options_addr, &mut buf[4 - size..])?;
        Ok(BigEndian::read_u32(&buf))
    }

    /// Store layout options. Bytes beyond the configured size are dropped.
    pub fn set_layout_options<F: Storage>(&self, eeprom: &mut Eeprom<F>, value: u32) -> Result<(), Error> {
        let mut buf = [0_u8; 4];
        BigEndian::write_u32(&mut buf, value);
        let size = self.layout_options_size as usize;
        eeprom.update(self.layout_options_addr, &buf[4 - size..])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eeprom::RamStorage;

    fn setup(config: ViaConfig) -> (EeConfig, Eeprom<RamStorage<64>>) {
        let layout = EepromLayout::new::<1, 1, 1>(&config, 64).unwrap();
        let eeprom = Eeprom::new(RamStorage::new(), 0).unwrap();
        (EeConfig::new(&config, &layout), eeprom)
    }

    #[test]
    fn test_blank_eeprom_is_invalid() {
        let (eeconfig, mut eeprom) = setup(ViaConfig::default());
        assert_eq!(eeconfig.is_valid(&mut eeprom), Ok(false));

        eeconfig.set_valid(&mut eeprom, true).unwrap();
        assert_eq!(eeconfig.is_valid(&mut eeprom), Ok(true));
        assert_eq!(&eeprom.storage().as_bytes()[34..37], &[0x45, 0x21, 0x08]);
    }

    #[test]
    fn test_reset_writes_only_version() {
        let (eeconfig, mut eeprom) = setup(ViaConfig::default());
        eeconfig.set_valid(&mut eeprom, true).unwrap();
        eeconfig.reset(&mut eeprom).unwrap();

        assert_eq!(eeconfig.is_valid(&mut eeprom), Ok(false));
        assert_eq!(&eeprom.storage().as_bytes()[34..37], &[0x45, 0x21, 0xF7]);
    }

    #[test]
    fn test_version_mismatch() {
        let (eeconfig, mut eeprom) = setup(ViaConfig::default());
        eeprom.write(34, &[0x45, 0x21, 0x07]).unwrap();
        assert_eq!(eeconfig.is_valid(&mut eeprom), Ok(false));
        eeprom.write(36, &[0x08]).unwrap();
        assert_eq!(eeconfig.is_valid(&mut eeprom), Ok(true));
    }

    #[test]
    fn test_extra_magic() {
        let (eeconfig, mut eeprom) = setup(ViaConfig {
            extra_magic: 0x0001,
            ..Default::default()
        });
        eeprom.write(34, &[0x45, 0x21, 0x08]).unwrap();
        assert_eq!(eeconfig.is_valid(&mut eeprom), Ok(false));

        eeconfig.set_valid(&mut eeprom, true).unwrap();
        assert_eq!(&eeprom.storage().as_bytes()[34..37], &[0x45, 0x20, 0x08]);
        assert_eq!(eeconfig.is_valid(&mut eeprom), Ok(true));
    }

    #[test]
    fn test_layout_options() {
        let (eeconfig, mut eeprom) = setup(ViaConfig::default());
        eeconfig.set_layout_options(&mut eeprom, 0x1234_5678).unwrap();
        assert_eq!(eeconfig.layout_options(&mut eeprom), Ok(0x78));
        assert_eq!(eeprom.storage().as_bytes()[38], 0xFF);

        let (eeconfig, mut eeprom) = setup(ViaConfig {
            layout_options_size: 3,
            ..Default::default()
        });
        eeconfig.set_layout_options(&mut eeprom, 0x1234_5678).unwrap();
        assert_eq!(eeconfig.layout_options(&mut eeprom), Ok(0x34_5678));
        assert_eq!(&eeprom.storage().as_bytes()[37..40], &[0x34, 0x56, 0x78]);
    }
}
