//! Communication protocol definitions.
//!
//! This module contains the protocol, type definitions and constants for communicating with
//! keyboard configuration software like VIA.
//!
//! - [`via`] - VIA raw HID protocol

pub mod via;
