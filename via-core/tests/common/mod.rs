#![allow(dead_code)]

use std::collections::VecDeque;

use via_core::via_types::keycode::{FN_MO13, FN_MO23, MACRO00};
use via_core::{
    KeyboardHooks, MacroOperation, RamStorage, SharedViaService, TransportError, ViaConfig, ViaPacket, ViaService,
    ViaStorage, ViaTransport,
};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub const ROW: usize = 2;
pub const COL: usize = 3;
pub const NUM_LAYER: usize = 4;
pub const EEPROM_SIZE: usize = 256;

pub const TEST_UPTIME: u32 = 0x0102_0304;

#[rustfmt::skip]
pub const DEFAULT_KEYMAP: [[[u16; COL]; ROW]; NUM_LAYER] = [
    [[0x04, 0x05, 0x06], [FN_MO13, MACRO00, FN_MO23]],
    [[0x1E, 0x1F, 0x20], [0x00, 0x01, 0x00]],
    [[0x3A, 0x3B, 0x3C], [0x00, 0x01, 0x00]],
    [[0x00, 0x00, 0x00], [0x00, 0x00, 0x00]],
];

pub type TestService = ViaService<'static, RamStorage<EEPROM_SIZE>, TestHooks, ROW, COL, NUM_LAYER>;
pub type TestSharedService<M> = SharedViaService<'static, M, RamStorage<EEPROM_SIZE>, TestHooks, ROW, COL, NUM_LAYER>;

/// Hooks which record every call
#[derive(Debug, Default)]
pub struct TestHooks {
    pub init_kb_calls: usize,
    pub bootloader_jumps: usize,
    pub layers: [bool; NUM_LAYER],
    pub macro_operations: Vec<MacroOperation>,
    pub backlight: [u8; 2],
    pub backlight_saves: usize,
    pub unhandled: Vec<u8>,
}

impl KeyboardHooks for TestHooks {
    fn jump_to_bootloader(&mut self) {
        self.bootloader_jumps += 1;
    }

    fn uptime_ms(&self) -> u32 {
        TEST_UPTIME
    }

    fn init_kb(&mut self) {
        self.init_kb_calls += 1;
    }

    // Backlight value id at data[0], value at data[1]
    fn backlight_config_set_value(&mut self, data: &mut [u8]) {
        if let Some(slot) = self.backlight.get_mut(data[0] as usize) {
            *slot = data[1];
        }
    }

    fn backlight_config_get_value(&mut self, data: &mut [u8]) {
        if let Some(value) = self.backlight.get(data[0] as usize) {
            data[1] = *value;
        }
    }

    fn backlight_config_save(&mut self) {
        self.backlight_saves += 1;
    }

    fn layer_on(&mut self, layer: u8) {
        self.layers[layer as usize] = true;
    }

    fn layer_off(&mut self, layer: u8) {
        self.layers[layer as usize] = false;
    }

    fn update_tri_layer(&mut self, layer1: u8, layer2: u8, layer3: u8) {
        self.layers[layer3 as usize] = self.layers[layer1 as usize] && self.layers[layer2 as usize];
    }

    fn play_macro_operation(&mut self, operation: MacroOperation) {
        self.macro_operations.push(operation);
    }

    fn raw_hid_receive_kb(&mut self, packet: &mut ViaPacket) {
        self.unhandled.push(packet[0]);
        packet[0] = 0xFF;
    }
}

/// Transport which replays queued requests and records the responses
#[derive(Default)]
pub struct TestTransport {
    pub requests: VecDeque<ViaPacket>,
    pub responses: Vec<ViaPacket>,
}

impl ViaTransport for TestTransport {
    async fn read_packet(&mut self) -> Result<ViaPacket, TransportError> {
        self.requests.pop_front().ok_or(TransportError::Disconnected)
    }

    async fn write_packet(&mut self, packet: &ViaPacket) -> Result<(), TransportError> {
        self.responses.push(*packet);
        Ok(())
    }
}

pub fn create_test_storage(config: &ViaConfig) -> ViaStorage<'static, RamStorage<EEPROM_SIZE>, ROW, COL, NUM_LAYER> {
    ViaStorage::new(RamStorage::new(), 0, &DEFAULT_KEYMAP, config).unwrap()
}

/// Initialized service over a blank eeprom
pub fn create_test_service() -> TestService {
    let mut service = ViaService::new(create_test_storage(&ViaConfig::default()), TestHooks::default());
    service.init().unwrap();
    service
}

/// Build a request packet, the rest of the packet is zero
pub fn request(data: &[u8]) -> ViaPacket {
    let mut packet = [0; 32];
    packet[..data.len()].copy_from_slice(data);
    packet
}

/// Process a request and return the response
pub fn send(service: &mut TestService, data: &[u8]) -> ViaPacket {
    let mut packet = request(data);
    service.process_via_packet(&mut packet);
    packet
}
