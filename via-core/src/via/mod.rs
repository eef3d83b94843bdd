use core::cell::RefCell;

use byteorder::{BigEndian, ByteOrder};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Timer;
use embedded_storage::Storage;
use via_types::protocol::via::{ViaCommand, ViaKeyboardValue, VIA_PROTOCOL_VERSION};

use crate::error::Error;
use crate::storage::ViaStorage;

pub mod descriptor;
pub mod hooks;
mod process;
pub mod protocol;
pub mod transport;

use hooks::KeyboardHooks;
use protocol::{Request, ViaPacket, BULK_DATA_START};
use transport::{TransportError, ViaTransport};

/// VIA command dispatcher.
///
/// Each packet is decoded, handled and answered in place. A failed command answers with
/// [`ViaCommand::Unhandled`] and leaves the persisted data untouched.
pub struct ViaService<'a, F: Storage, H: KeyboardHooks, const ROW: usize, const COL: usize, const NUM_LAYER: usize> {
    storage: ViaStorage<'a, F, ROW, COL, NUM_LAYER>,
    hooks: H,
}

impl<'a, F: Storage, H: KeyboardHooks, const ROW: usize, const COL: usize, const NUM_LAYER: usize>
    ViaService<'a, F, H, ROW, COL, NUM_LAYER>
{
    pub fn new(storage: ViaStorage<'a, F, ROW, COL, NUM_LAYER>, hooks: H) -> Self {
        Self { storage, hooks }
    }

    /// Initialize the keyboard, then restore default data if the persisted region is invalid.
    pub fn init(&mut self) -> Result<(), Error> {
        self.hooks.init_kb();
        self.storage.init()?;
        Ok(())
    }

    pub fn storage(&self) -> &ViaStorage<'a, F, ROW, COL, NUM_LAYER> {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut ViaStorage<'a, F, ROW, COL, NUM_LAYER> {
        &mut self.storage
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn is_valid(&mut self) -> Result<bool, Error> {
        self.storage.is_valid()
    }

    pub fn set_valid(&mut self, valid: bool) -> Result<(), Error> {
        self.storage.set_valid(valid)
    }

    pub fn reset(&mut self) -> Result<(), Error> {
        self.storage.reset()
    }

    pub fn layout_options(&mut self) -> Result<u32, Error> {
        self.storage.layout_options()
    }

    pub fn set_layout_options(&mut self, value: u32) -> Result<(), Error> {
        self.storage.set_layout_options(value)
    }

    /// Serve the host forever
    pub async fn run<T: ViaTransport>(&mut self, transport: &mut T) {
        loop {
            match self.process(transport).await {
                Ok(_) => continue,
                Err(e) => {
                    error!("Process via error: {:?}", e);
                    Timer::after_millis(1000).await;
                }
            }
        }
    }

    /// Receive one packet, process it and send the response back
    pub async fn process<T: ViaTransport>(&mut self, transport: &mut T) -> Result<(), TransportError> {
        let mut packet = transport.read_packet().await?;
        self.process_via_packet(&mut packet);
        transport.write_packet(&packet).await
    }

    /// Process a packet, the response is written into the packet.
    pub fn process_via_packet(&mut self, packet: &mut ViaPacket) {
        trace!("Received via packet: {:?}", packet);
        match Request::parse(packet) {
            Ok(request) => {
                if let Err(e) = self.handle_request(request, packet) {
                    warn!("Via command {:?} failed: {:?}", request, e);
                    packet[0] = ViaCommand::Unhandled as u8;
                }
            }
            Err(Error::UnknownOpcode(_)) | Err(Error::UnknownValueId(_)) => {
                debug!("Forwarding via command {:#X} to keyboard", packet[0]);
                self.hooks.raw_hid_receive_kb(packet);
            }
            Err(e) => {
                warn!("Invalid via command {:#X}: {:?}", packet[0], e);
                packet[0] = ViaCommand::Unhandled as u8;
            }
        }
    }

    fn handle_request(&mut self, request: Request, packet: &mut ViaPacket) -> Result<(), Error> {
        match request {
            Request::GetProtocolVersion => {
                BigEndian::write_u16(&mut packet[1..3], VIA_PROTOCOL_VERSION);
            }
            Request::GetKeyboardValue(ViaKeyboardValue::Uptime) => {
                BigEndian::write_u32(&mut packet[2..6], self.hooks.uptime_ms());
            }
            Request::GetKeyboardValue(ViaKeyboardValue::LayoutOptions) => {
                let layout_options = self.storage.layout_options()?;
                BigEndian::write_u32(&mut packet[2..6], layout_options);
            }
            Request::SetLayoutOptions(layout_options) => {
                self.storage.set_layout_options(layout_options)?;
            }
            Request::GetKeycode { layer, row, col } => {
                let keycode = self.storage.get_keycode(layer, row, col)?;
                BigEndian::write_u16(&mut packet[4..6], keycode);
            }
            Request::SetKeycode {
                layer,
                row,
                col,
                keycode,
            } => {
                debug!("Setting keycode {:#X} at layer {}, row {}, col {}", keycode, layer, row, col);
                self.storage.set_keycode(layer, row, col, keycode)?;
            }
            Request::ResetKeymap => self.storage.reset_keymap()?,
            Request::BacklightSetValue => self.hooks.backlight_config_set_value(&mut packet[1..]),
            Request::BacklightGetValue => self.hooks.backlight_config_get_value(&mut packet[1..]),
            Request::BacklightSave => self.hooks.backlight_config_save(),
            Request::EepromReset => self.storage.reset()?,
            Request::BootloaderJump => {
                info!("Jumping to bootloader");
                self.hooks.jump_to_bootloader();
            }
            Request::MacroGetCount => {
                packet[1] = self.storage.macro_count()?;
            }
            Request::MacroGetBufferSize => {
                BigEndian::write_u16(&mut packet[1..3], self.storage.macro_buffer_size());
            }
            Request::MacroGetBuffer { offset, size } => {
                let data = &mut packet[BULK_DATA_START..BULK_DATA_START + size as usize];
                self.storage.get_macro_buffer(offset, data)?;
            }
            Request::MacroSetBuffer { offset, size } => {
                let data = &packet[BULK_DATA_START..BULK_DATA_START + size as usize];
                self.storage.set_macro_buffer(offset, data)?;
            }
            Request::MacroReset => self.storage.reset_macros()?,
            Request::GetLayerCount => {
                packet[1] = self.storage.layer_count();
            }
            Request::KeymapGetBuffer { offset, size } => {
                let data = &mut packet[BULK_DATA_START..BULK_DATA_START + size as usize];
                self.storage.get_keymap_buffer(offset, data)?;
            }
            Request::KeymapSetBuffer { offset, size } => {
                let data = &packet[BULK_DATA_START..BULK_DATA_START + size as usize];
                self.storage.set_keymap_buffer(offset, data)?;
            }
        }
        Ok(())
    }
}

/// [`ViaService`] shared between tasks, e.g. the HID task and the key processing task.
///
/// The whole service, flash writes and macro playback included, runs inside `M`'s lock. With
/// `CriticalSectionRawMutex` that means interrupts are masked for the duration of a flash erase,
/// so prefer `ThreadModeRawMutex` or `NoopRawMutex` when every user runs in thread mode. Hooks
/// must not call back into the shared service.
pub struct SharedViaService<
    'a,
    M: RawMutex,
    F: Storage,
    H: KeyboardHooks,
    const ROW: usize,
    const COL: usize,
    const NUM_LAYER: usize,
> {
    inner: Mutex<M, RefCell<ViaService<'a, F, H, ROW, COL, NUM_LAYER>>>,
}

impl<'a, M: RawMutex, F: Storage, H: KeyboardHooks, const ROW: usize, const COL: usize, const NUM_LAYER: usize>
    SharedViaService<'a, M, F, H, ROW, COL, NUM_LAYER>
{
    pub fn new(service: ViaService<'a, F, H, ROW, COL, NUM_LAYER>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(service)),
        }
    }

    /// Run `f` with exclusive access to the service
    pub fn lock<R>(&self, f: impl FnOnce(&mut ViaService<'a, F, H, ROW, COL, NUM_LAYER>) -> R) -> R {
        self.inner.lock(|service| f(&mut service.borrow_mut()))
    }

    pub fn process_via_packet(&self, packet: &mut ViaPacket) {
        self.lock(|service| service.process_via_packet(packet))
    }

    pub fn process_keycode(&self, keycode: u16, pressed: bool) -> bool {
        self.lock(|service| service.process_keycode(keycode, pressed))
    }

    /// Serve the host forever, the service is locked only while a packet is processed
    pub async fn run<T: ViaTransport>(&self, transport: &mut T) {
        loop {
            match self.process(transport).await {
                Ok(_) => continue,
                Err(e) => {
                    error!("Process via error: {:?}", e);
                    Timer::after_millis(1000).await;
                }
            }
        }
    }

    pub async fn process<T: ViaTransport>(&self, transport: &mut T) -> Result<(), TransportError> {
        let mut packet = transport.read_packet().await?;
        self.process_via_packet(&mut packet);
        transport.write_packet(&packet).await
    }
}
