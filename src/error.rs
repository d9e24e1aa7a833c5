//! Error definitions for the OZ890 driver.

use crate::data_types::AuthenticationState;

#[derive(Debug)]
pub enum Error<I2cError> {
    /// Underlying I2C transaction failed (includes a missing acknowledgement).
    I2c(I2cError),
    /// Chip ID register did not read as an OZ890.
    UnknownChip(u8),
    /// Password gated unlock did not report success.
    AuthenticationFailed(AuthenticationState),
    /// EEPROM image was not exactly 128 bytes.
    ImageSizeMismatch(usize),
    /// File substrate access failed.
    #[cfg(feature = "std")]
    Io(std::io::Error),
    /// Busy flag stayed set for the whole poll budget.
    EepromTimeout,
    /// Provided parameter was outside device limits.
    OutOfRange,
    /// EEPROM word address was odd or past the end of the EEPROM.
    InvalidAddress(u8),
    /// Operation not available with the selected substrate or options.
    InvalidConfig,
}

impl<I2cError: core::fmt::Debug> core::fmt::Display for Error<I2cError> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
            Error::UnknownChip(id) => write!(f, "unknown chip: {:#x}", id),
            Error::AuthenticationFailed(state) => write!(f, "EEPROM authentication failed: {:?}", state),
            Error::ImageSizeMismatch(len) => write!(f, "EEPROM image is {} bytes, expected 128", len),
            #[cfg(feature = "std")]
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::EepromTimeout => write!(f, "timed out waiting for EEPROM busy flag"),
            Error::OutOfRange => write!(f, "parameter out of range"),
            Error::InvalidAddress(address) => write!(f, "invalid EEPROM word address {:#x}", address),
            Error::InvalidConfig => write!(f, "invalid configuration for selected substrate"),
        }
    }
}

#[cfg(feature = "std")]
impl<I2cError: core::fmt::Debug> std::error::Error for Error<I2cError> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl<I2cError> From<std::io::Error> for Error<I2cError> {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

#[cfg(feature = "defmt")]
impl<I2cError: defmt::Format> defmt::Format for Error<I2cError> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::I2c(e) => defmt::write!(f, "I2C error: {}", e),
            Error::UnknownChip(id) => defmt::write!(f, "unknown chip: {:#x}", id),
            Error::AuthenticationFailed(state) => defmt::write!(f, "EEPROM authentication failed: {}", state),
            Error::ImageSizeMismatch(len) => defmt::write!(f, "EEPROM image is {} bytes, expected 128", len),
            #[cfg(feature = "std")]
            Error::Io(_) => defmt::write!(f, "I/O error"),
            Error::EepromTimeout => defmt::write!(f, "timed out waiting for EEPROM busy flag"),
            Error::OutOfRange => defmt::write!(f, "parameter out of range"),
            Error::InvalidAddress(address) => defmt::write!(f, "invalid EEPROM word address {:#x}", address),
            Error::InvalidConfig => defmt::write!(f, "invalid configuration for selected substrate"),
        }
    }
}
