//! Password gated EEPROM rewrite.
//!
//! The stored password is read back from the EEPROM and submitted to unlock
//! privileged access. After a successful unlock the EEPROM is erased and every
//! word is written again in ascending order.
//!
//! There is no partial-write recovery: a failure after the erase leaves the
//! EEPROM partially written and the whole rewrite has to be repeated.

use log::{debug, warn};

use crate::data_types::{AuthenticationState, SenseResistor};
use crate::driver::Oz890;
use crate::eeprom::EepromImage;
use crate::error::Error;
use crate::registers::{addr, eeprom, eeprom_mode, AuthStatusBits};

impl<I2C> Oz890<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Submit the stored password and return the raw authentication status.
    /// EEPROM access is locked again whatever the outcome.
    pub fn authenticate_raw(&mut self) -> Result<AuthStatusBits, Error<I2C::Error>> {
        let [pw_lo, pw_hi] = self.read_eeprom_word(eeprom::PASSWORD)?;

        let status = self
            .wait_not_busy()
            .and_then(|_| self.write_reg(addr::EEPROM_CONTROL, eeprom_mode::AUTH))
            .and_then(|_| self.write_reg(addr::PASSWORD_LO, pw_lo))
            .and_then(|_| self.write_reg(addr::PASSWORD_HI, pw_hi))
            .and_then(|_| self.read_reg(addr::AUTH_STATUS));
        let lock = self.eeprom_lock();

        let bits = AuthStatusBits::from_bits_truncate(status?);
        lock?;
        debug!("authentication status {:#04x}", bits.bits());
        Ok(bits)
    }

    /// Unlock privileged EEPROM access with the stored password.
    pub fn authenticate(&mut self) -> Result<AuthenticationState, Error<I2C::Error>> {
        Ok(AuthenticationState::from_status(self.authenticate_raw()?))
    }

    /// Erase the whole EEPROM. Only effective after a successful [`authenticate`](Self::authenticate).
    pub fn erase_eeprom(&mut self) -> Result<(), Error<I2C::Error>> {
        self.wait_not_busy()?;
        self.write_reg(addr::EEPROM_CONTROL, eeprom_mode::ERASE)
    }

    /// Replace the EEPROM content with `image`.
    ///
    /// Nothing is erased or written unless the password is accepted.
    pub fn rewrite_eeprom(&mut self, image: &EepromImage) -> Result<(), Error<I2C::Error>> {
        let state = self.authenticate()?;
        if state != AuthenticationState::Success {
            warn!("EEPROM password rejected: {:?}", state);
            return Err(Error::AuthenticationFailed(state));
        }

        self.erase_eeprom()?;
        for (address, word) in image.words() {
            self.write_eeprom_word(address, word)?;
        }
        debug!("EEPROM rewritten");
        Ok(())
    }

    /// Store a new sense resistor value (milliohms) in the EEPROM.
    ///
    /// Values outside 0.1..=25.5 mOhm are rejected with [`Error::OutOfRange`] before
    /// any bus access. An unchanged value skips the rewrite.
    pub fn set_sense_resistor_milliohms(&mut self, mohm: f32) -> Result<(), Error<I2C::Error>> {
        let sense = SenseResistor::from_milliohms(mohm).ok_or(Error::OutOfRange)?;
        let mut image = self.read_eeprom()?;
        if image.sense_resistor() == sense {
            debug!("sense resistor already {} tenths of a mOhm", sense.tenths_mohm());
            return Ok(());
        }
        image.set_sense_resistor(sense);
        self.rewrite_eeprom(&image)
    }
}
