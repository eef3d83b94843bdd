mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};
use via_core::{ViaConfig, ViaService, ViaStorage, nor_flash_storage};

use crate::common::*;

const SECTOR_SIZE: usize = 128;
const FLASH_SIZE: usize = SECTOR_SIZE * 8;

#[derive(Debug)]
struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

/// In-memory flash, cloning shares the content so that it survives a "reboot"
#[derive(Clone)]
struct Flash {
    buf: Rc<RefCell<Vec<u8>>>,
    fail: Rc<Cell<bool>>,
}

impl Flash {
    fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(vec![0xFF; FLASH_SIZE])),
            fail: Rc::new(Cell::new(false)),
        }
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf.borrow()[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        FLASH_SIZE
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(FlashError);
        }
        self.buf.borrow_mut()[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(FlashError);
        }
        let offset = offset as usize;
        self.buf.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

#[test]
fn test_persisted_across_reboot() {
    let flash = Flash::new();
    let mut merge_buffer = [0_u8; SECTOR_SIZE];
    {
        let storage = ViaStorage::new(
            nor_flash_storage(flash.clone(), &mut merge_buffer),
            256,
            &DEFAULT_KEYMAP,
            &ViaConfig::default(),
        )
        .unwrap();
        let mut service = ViaService::new(storage, TestHooks::default());
        service.init().unwrap();
        service.storage_mut().set_keycode(1, 1, 1, 0x29).unwrap();
    }

    // Magic, then version, at 256 + 34
    assert_eq!(&flash.buf.borrow()[290..293], &[0x45, 0x21, 0x08]);
    assert!(flash.buf.borrow()[..256].iter().all(|b| *b == 0xFF));

    let mut merge_buffer = [0_u8; SECTOR_SIZE];
    let storage = ViaStorage::new(
        nor_flash_storage(flash.clone(), &mut merge_buffer),
        256,
        &DEFAULT_KEYMAP,
        &ViaConfig::default(),
    )
    .unwrap();
    let mut service = ViaService::new(storage, TestHooks::default());
    service.init().unwrap();
    assert_eq!(service.storage_mut().get_keycode(1, 1, 1), Ok(0x29));
    assert_eq!(service.storage().macro_buffer_size(), (FLASH_SIZE - 256 - 86) as u16);
}

#[test]
fn test_backend_error_is_reported() {
    let flash = Flash::new();
    let mut merge_buffer = [0_u8; SECTOR_SIZE];
    let storage = ViaStorage::new(
        nor_flash_storage(flash.clone(), &mut merge_buffer),
        0,
        &DEFAULT_KEYMAP,
        &ViaConfig::default(),
    )
    .unwrap();
    let mut service = ViaService::new(storage, TestHooks::default());
    service.init().unwrap();

    flash.fail.set(true);
    let mut packet = request(&[0x05, 0, 0, 0, 0x00, 0x29]);
    service.process_via_packet(&mut packet);
    assert_eq!(packet[0], 0xFF);

    // Reads still work
    let mut packet = request(&[0x04, 0, 0, 0]);
    service.process_via_packet(&mut packet);
    assert_eq!(&packet[..6], &[0x04, 0, 0, 0, 0x00, 0x04]);
}

#[test]
fn test_version_mismatch_restores_defaults() {
    let mut storage = create_test_storage(&ViaConfig::default());
    storage.init().unwrap();
    storage.set_keycode(0, 0, 0, 0x29).unwrap();
    storage.set_macro_buffer(0, b"A\0").unwrap();

    // Written by a firmware with an older layout
    storage.eeprom_mut().write(36, &[0x07]).unwrap();
    assert_eq!(storage.is_valid(), Ok(false));

    assert_eq!(storage.init(), Ok(true));
    assert_eq!(storage.is_valid(), Ok(true));
    assert_eq!(storage.get_keycode(0, 0, 0), Ok(0x04));
    assert_eq!(storage.macro_count(), Ok(0));
}

#[test]
fn test_magic_mismatch_restores_defaults() {
    let mut storage = create_test_storage(&ViaConfig::default());
    storage.init().unwrap();
    storage.eeprom_mut().write(34, &[0x45, 0x22]).unwrap();
    assert_eq!(storage.is_valid(), Ok(false));
    assert_eq!(storage.init(), Ok(true));
}

#[test]
fn test_set_valid() {
    let mut storage = create_test_storage(&ViaConfig::default());
    assert_eq!(storage.is_valid(), Ok(false));
    storage.set_valid(true).unwrap();
    assert_eq!(storage.is_valid(), Ok(true));
    storage.set_valid(false).unwrap();
    assert_eq!(storage.is_valid(), Ok(false));
    assert_eq!(storage.eeprom().storage().as_bytes()[36], !0x08);
}

#[test]
fn test_extra_magic_invalidates_old_data() {
    let mut storage = create_test_storage(&ViaConfig::default());
    storage.init().unwrap();
    let bytes = *storage.eeprom().storage().as_bytes();

    let config = ViaConfig {
        extra_magic: 0x0100,
        ..Default::default()
    };
    let mut storage = ViaStorage::<_, ROW, COL, NUM_LAYER>::new(
        via_core::RamStorage::<EEPROM_SIZE>::from_bytes(bytes),
        0,
        &DEFAULT_KEYMAP,
        &config,
    )
    .unwrap();
    assert_eq!(storage.is_valid(), Ok(false));
    assert_eq!(storage.init(), Ok(true));
    assert_eq!(&storage.eeprom().storage().as_bytes()[34..37], &[0x44, 0x21, 0x08]);
}
