use embedded_storage::Storage;
use via_types::keycode::ViaKeycode;

use super::hooks::KeyboardHooks;
use super::ViaService;
use crate::error::Error;
use crate::keyboard_macros::MacroOperation;

impl<'a, F: Storage, H: KeyboardHooks, const ROW: usize, const COL: usize, const NUM_LAYER: usize>
    ViaService<'a, F, H, ROW, COL, NUM_LAYER>
{
    /// Process VIA keycodes.
    ///
    /// Returns false if the keycode is consumed here, true if it should be processed further.
    pub fn process_keycode(&mut self, keycode: u16, pressed: bool) -> bool {
        match ViaKeycode::from_keycode(keycode) {
            Some(ViaKeycode::FnMo13) => {
                self.momentary_tri_layer(1, pressed);
                false
            }
            Some(ViaKeycode::FnMo23) => {
                self.momentary_tri_layer(2, pressed);
                false
            }
            Some(ViaKeycode::Macro(id)) => {
                if pressed {
                    if let Err(e) = self.play_macro(id) {
                        error!("Play macro {} error: {:?}", id, e);
                    }
                }
                false
            }
            _ => true,
        }
    }

    fn momentary_tri_layer(&mut self, layer: u8, pressed: bool) {
        if pressed {
            self.hooks.layer_on(layer);
        } else {
            self.hooks.layer_off(layer);
        }
        self.hooks.update_tri_layer(1, 2, 3);
    }

    /// Send every operation of dynamic macro `id`
    pub fn play_macro(&mut self, id: u8) -> Result<(), Error> {
        let Some(mut offset) = self.storage.macro_start(id)? else {
            warn!("Macro {} is not defined", id);
            return Ok(());
        };
        debug!("Playing macro {} from offset {}", id, offset);
        loop {
            let (operation, next) = self.storage.macro_operation_at(offset)?;
            if operation == MacroOperation::End {
                break;
            }
            self.hooks.play_macro_operation(operation);
            offset = next;
        }
        Ok(())
    }
}
