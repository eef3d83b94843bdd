use embassy_time::Instant;
use via_types::protocol::via::ViaCommand;

use super::protocol::ViaPacket;
use crate::keyboard_macros::MacroOperation;

/// Keyboard-side collaborators of the VIA service.
///
/// Only the bootloader jump is mandatory, everything else has a default which does nothing,
/// except `raw_hid_receive_kb` which marks the command as unhandled.
pub trait KeyboardHooks {
    /// Jump to the bootloader
    fn jump_to_bootloader(&mut self);

    /// Milliseconds since boot
    fn uptime_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }

    /// Called once before the persisted region is checked
    fn init_kb(&mut self) {}

    /// `data` starts with the backlight value id, the response is written in place
    fn backlight_config_set_value(&mut self, _data: &mut [u8]) {}

    /// `data` starts with the backlight value id, the response is written in place
    fn backlight_config_get_value(&mut self, _data: &mut [u8]) {}

    fn backlight_config_save(&mut self) {}

    fn layer_on(&mut self, _layer: u8) {}

    fn layer_off(&mut self, _layer: u8) {}

    /// Turn `layer3` on if both `layer1` and `layer2` are on, off otherwise
    fn update_tri_layer(&mut self, _layer1: u8, _layer2: u8, _layer3: u8) {}

    /// Send one step of a dynamic macro
    fn play_macro_operation(&mut self, _operation: MacroOperation) {}

    /// Commands VIA doesn't handle, the response is written in place
    fn raw_hid_receive_kb(&mut self, packet: &mut ViaPacket) {
        packet[0] = ViaCommand::Unhandled as u8;
    }
}
