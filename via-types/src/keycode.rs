//! VIA keycodes.
//!
//! Backlight keycodes occupy `0x5F00..=0x5F0F`, VIA's own keycodes start right after them.

/// Momentary layer 1, with tri-layer update of layers 1/2/3.
pub const FN_MO13: u16 = 0x5F10;
/// Momentary layer 2, with tri-layer update of layers 1/2/3.
pub const FN_MO23: u16 = 0x5F11;
/// First dynamic macro keycode, `MACRO00..=MACRO15` are contiguous.
pub const MACRO00: u16 = 0x5F12;
/// First keyboard-level user keycode, `USER00..=USER15` are contiguous.
pub const USER00: u16 = 0x5F80;

/// Number of dynamic macro keycodes.
pub const MACRO_KEYCODE_NUM: u8 = 16;
/// Number of user keycodes.
pub const USER_KEYCODE_NUM: u8 = 16;

/// Keycodes handled by the VIA layer instead of the regular keycode processing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ViaKeycode {
    FnMo13,
    FnMo23,
    /// Dynamic macro `0..16`
    Macro(u8),
    /// Keyboard-level user keycode `0..16`
    User(u8),
}

impl ViaKeycode {
    pub fn from_keycode(keycode: u16) -> Option<Self> {
        match keycode {
            FN_MO13 => Some(Self::FnMo13),
            FN_MO23 => Some(Self::FnMo23),
            k if (MACRO00..MACRO00 + MACRO_KEYCODE_NUM as u16).contains(&k) => Some(Self::Macro((k - MACRO00) as u8)),
            k if (USER00..USER00 + USER_KEYCODE_NUM as u16).contains(&k) => Some(Self::User((k - USER00) as u8)),
            _ => None,
        }
    }

    pub fn to_keycode(self) -> u16 {
        match self {
            Self::FnMo13 => FN_MO13,
            Self::FnMo23 => FN_MO23,
            Self::Macro(idx) => MACRO00 + idx as u16,
            Self::User(idx) => USER00 + idx as u16,
        }
    }
}
