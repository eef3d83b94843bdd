//! # VIA Types
//!
//! Fundamental definitions shared between the VIA configurator core and anything
//! that talks to it.
//!
//! ## Modules
//!
//! - [`protocol`] - Command ids, keyboard value ids and protocol constants
//! - [`keycode`] - VIA-specific keycodes (tri-layer keys, dynamic macros, user keycodes)

#![no_std]

pub mod keycode;
pub mod protocol;
