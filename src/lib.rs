//! OZ890 Rust Driver
//!
//! Register, EEPROM and measurement access for the O2Micro OZ890 battery
//! protection / fuel-gauge controller over I2C. The device-side protocol is
//! `no_std`; the `std` feature (default) adds the file-backed EEPROM substrate.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod auth;
pub mod data_types;
pub mod driver;
pub mod eeprom;
pub mod error;
pub mod registers;
#[cfg(feature = "std")]
pub mod substrate;

pub use driver::{Config, Oz890};
pub use eeprom::EepromImage;
pub use error::Error;
pub use registers::DEFAULT_I2C_ADDRESS;
