//! VIA configurator support for keyboard firmware.
//!
//! A [`ViaService`] answers the 32-byte raw HID packets sent by VIA, and keeps the dynamic
//! keymap, the macros and the layout options in a byte-addressed persisted region, see
//! [`ViaStorage`]. The region is stamped with a magic and a version, data written by an
//! incompatible firmware is discarded and replaced by the defaults on [`ViaService::init`].
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
#[macro_use]
pub(crate) mod fmt;

pub mod config;
pub mod dynamic_keymap;
pub mod eeconfig;
pub mod eeprom;
pub mod error;
pub mod keyboard_macros;
pub mod storage;
pub mod via;

pub use config::{EepromLayout, ViaConfig};
pub use eeprom::{Eeprom, RamStorage, nor_flash_storage};
pub use error::Error;
pub use keyboard_macros::MacroOperation;
pub use storage::ViaStorage;
pub use via::descriptor::ViaReport;
pub use via::hooks::KeyboardHooks;
pub use via::protocol::{Request, ViaPacket};
pub use via::transport::{TransportError, ViaTransport};
pub use via::{SharedViaService, ViaService};
pub use via_types;
