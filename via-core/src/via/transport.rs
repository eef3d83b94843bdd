use core::future::Future;

use super::protocol::ViaPacket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The host is not connected
    Disconnected,
    /// Received fewer bytes than a whole packet
    PartialRead,
    BufferOverflow,
    /// Other error of the underlying transport
    Other,
}

/// Raw HID transport carrying VIA packets, USB or BLE
pub trait ViaTransport {
    /// Wait for the next packet from the host
    fn read_packet(&mut self) -> impl Future<Output = Result<ViaPacket, TransportError>>;

    /// Send a response to the host
    fn write_packet(&mut self, packet: &ViaPacket) -> impl Future<Output = Result<(), TransportError>>;
}
