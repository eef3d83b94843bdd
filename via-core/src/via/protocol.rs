use byteorder::{BigEndian, ByteOrder};
use via_types::protocol::via::{ViaCommand, ViaKeyboardValue, VIA_BULK_PAYLOAD_SIZE, VIA_PACKET_SIZE};

use crate::error::Error;

/// Raw VIA packet, used as both request and response
pub type ViaPacket = [u8; VIA_PACKET_SIZE];

/// Offset of the payload in a bulk buffer packet: command id, 2-byte offset and size byte
pub(crate) const BULK_DATA_START: usize = 4;

/// Decoded VIA request.
///
/// The payload of bulk writes stays in the packet, at `BULK_DATA_START..BULK_DATA_START + size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    GetProtocolVersion,
    GetKeyboardValue(ViaKeyboardValue),
    SetLayoutOptions(u32),
    GetKeycode { layer: u8, row: u8, col: u8 },
    SetKeycode { layer: u8, row: u8, col: u8, keycode: u16 },
    ResetKeymap,
    BacklightSetValue,
    BacklightGetValue,
    BacklightSave,
    EepromReset,
    BootloaderJump,
    MacroGetCount,
    MacroGetBufferSize,
    MacroGetBuffer { offset: u16, size: u8 },
    MacroSetBuffer { offset: u16, size: u8 },
    MacroReset,
    GetLayerCount,
    KeymapGetBuffer { offset: u16, size: u8 },
    KeymapSetBuffer { offset: u16, size: u8 },
}

impl Request {
    /// Decode the command id and its arguments.
    ///
    /// Unknown command ids and keyboard value ids are reported as errors, so that they can be
    /// forwarded to the keyboard.
    pub fn parse(packet: &ViaPacket) -> Result<Self, Error> {
        let request = match ViaCommand::from(packet[0]) {
            ViaCommand::GetProtocolVersion => Self::GetProtocolVersion,
            ViaCommand::GetKeyboardValue => {
                let value = ViaKeyboardValue::try_from(packet[1]).map_err(Error::UnknownValueId)?;
                Self::GetKeyboardValue(value)
            }
            ViaCommand::SetKeyboardValue => match ViaKeyboardValue::try_from(packet[1]) {
                Ok(ViaKeyboardValue::LayoutOptions) => Self::SetLayoutOptions(BigEndian::read_u32(&packet[2..6])),
                // Uptime is read-only
                Ok(_) => return Err(Error::UnknownValueId(packet[1])),
                Err(id) => return Err(Error::UnknownValueId(id)),
            },
            ViaCommand::DynamicKeymapGetKeyCode => Self::GetKeycode {
                layer: packet[1],
                row: packet[2],
                col: packet[3],
            },
            ViaCommand::DynamicKeymapSetKeyCode => Self::SetKeycode {
                layer: packet[1],
                row: packet[2],
                col: packet[3],
                keycode: BigEndian::read_u16(&packet[4..6]),
            },
            ViaCommand::DynamicKeymapReset => Self::ResetKeymap,
            ViaCommand::BacklightConfigSetValue => Self::BacklightSetValue,
            ViaCommand::BacklightConfigGetValue => Self::BacklightGetValue,
            ViaCommand::BacklightConfigSave => Self::BacklightSave,
            ViaCommand::EepromReset => Self::EepromReset,
            ViaCommand::BootloaderJump => Self::BootloaderJump,
            ViaCommand::DynamicKeymapMacroGetCount => Self::MacroGetCount,
            ViaCommand::DynamicKeymapMacroGetBufferSize => Self::MacroGetBufferSize,
            ViaCommand::DynamicKeymapMacroGetBuffer => {
                let (offset, size) = parse_bulk_window(packet)?;
                Self::MacroGetBuffer { offset, size }
            }
            ViaCommand::DynamicKeymapMacroSetBuffer => {
                let (offset, size) = parse_bulk_window(packet)?;
                Self::MacroSetBuffer { offset, size }
            }
            ViaCommand::DynamicKeymapMacroReset => Self::MacroReset,
            ViaCommand::DynamicKeymapGetLayerCount => Self::GetLayerCount,
            ViaCommand::DynamicKeymapGetBuffer => {
                let (offset, size) = parse_bulk_window(packet)?;
                Self::KeymapGetBuffer { offset, size }
            }
            ViaCommand::DynamicKeymapSetBuffer => {
                let (offset, size) = parse_bulk_window(packet)?;
                Self::KeymapSetBuffer { offset, size }
            }
            ViaCommand::Unhandled => return Err(Error::UnknownOpcode(packet[0])),
        };
        Ok(request)
    }
}

/// Offset at `[1..3]`, big-endian, and size at `[3]`
fn parse_bulk_window(packet: &ViaPacket) -> Result<(u16, u8), Error> {
    let offset = BigEndian::read_u16(&packet[1..3]);
    let size = packet[3];
    if size as usize > VIA_BULK_PAYLOAD_SIZE {
        warn!("Bulk payload size {} exceeds {}", size, VIA_BULK_PAYLOAD_SIZE);
        return Err(Error::OutOfRange);
    }
    Ok((offset, size))
}
