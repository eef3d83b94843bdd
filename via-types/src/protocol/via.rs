//! VIA protocol

use strum::FromRepr;

/// Changed only when the command ids change, so the configurator can detect compatible firmware.
pub const VIA_PROTOCOL_VERSION: u16 = 0x0008;

/// Size of every VIA raw HID packet, both directions.
pub const VIA_PACKET_SIZE: usize = 32;

/// Max payload of a bulk buffer command: packet minus command id, 2-byte offset and size byte.
pub const VIA_BULK_PAYLOAD_SIZE: usize = VIA_PACKET_SIZE - 4;

/// Magic stored in the persisted region.
///
/// Stays constant, `VIA_EEPROM_VERSION` is bumped instead. Keyboards which change their own
/// usage of the persisted region xor an extra magic into it.
pub const VIA_EEPROM_MAGIC: u16 = 0x4521;

/// Bump this every time the persisted layout changes.
///
/// Kept in sync with [`VIA_PROTOCOL_VERSION`], so a firmware upgrade that changes keycodes
/// invalidates keymaps written by older firmware.
pub const VIA_EEPROM_VERSION: u8 = 0x08;

/// Default address of the magic value in the persisted region.
pub const VIA_EEPROM_MAGIC_ADDR: u32 = 34;

/// Default size of the layout options, 1 byte is enough for 8 binary choices.
pub const VIA_EEPROM_LAYOUT_OPTIONS_SIZE: usize = 1;

/// VIA communication commands, protocol version 0x0008.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ViaCommand {
    GetProtocolVersion = 0x01, // always 0x01
    GetKeyboardValue = 0x02,
    SetKeyboardValue = 0x03,
    DynamicKeymapGetKeyCode = 0x04,
    DynamicKeymapSetKeyCode = 0x05,
    DynamicKeymapReset = 0x06,
    BacklightConfigSetValue = 0x07,
    BacklightConfigGetValue = 0x08,
    BacklightConfigSave = 0x09,
    EepromReset = 0x0A,
    BootloaderJump = 0x0B,
    DynamicKeymapMacroGetCount = 0x0C,
    DynamicKeymapMacroGetBufferSize = 0x0D,
    DynamicKeymapMacroGetBuffer = 0x0E,
    DynamicKeymapMacroSetBuffer = 0x0F,
    DynamicKeymapMacroReset = 0x10,
    DynamicKeymapGetLayerCount = 0x11,
    DynamicKeymapGetBuffer = 0x12,
    DynamicKeymapSetBuffer = 0x13,
    Unhandled = 0xFF,
}

impl From<u8> for ViaCommand {
    fn from(value: u8) -> Self {
        Self::from_repr(value).unwrap_or(Self::Unhandled)
    }
}

/// Keyboard value ids of `GetKeyboardValue`/`SetKeyboardValue`.
///
/// Later protocol revisions reuse the id space differently (e.g. a firmware version id);
/// only the ids of protocol 0x0008 are decoded here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ViaKeyboardValue {
    Uptime = 0x01,
    LayoutOptions = 0x02,
}

impl TryFrom<u8> for ViaKeyboardValue {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        // Return original value when there's an error
        Self::from_repr(value).ok_or(value)
    }
}
