use thiserror::Error;

/// Errors of the persisted stores and the command decoder.
///
/// None of them is fatal: the dispatcher turns every error into an `Unhandled` response and an
/// invalid persisted region is reloaded with defaults.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Index, or offset/length window, outside of the configured bounds. Nothing was written.
    #[error("out of range")]
    OutOfRange,

    /// Magic or version in the persisted region doesn't match this firmware.
    #[error("invalid persisted state")]
    InvalidPersistedState,

    /// First byte of the packet is not a known command id.
    #[error("unknown command id: {0:#04x}")]
    UnknownOpcode(u8),

    /// Second byte of a keyboard value command is not a known value id.
    #[error("unknown keyboard value id: {0:#04x}")]
    UnknownValueId(u8),

    /// The internal error value is returned from the storage backend
    #[error("storage backend error")]
    Backend,

    /// The persisted layout doesn't fit into the storage backend
    #[error("layout exceeds storage capacity")]
    LayoutOverflow,
}
