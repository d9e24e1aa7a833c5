//! EEPROM access through the control/address/data register handshake.
//!
//! Every step waits for the busy flag (bit 7 of 0x5F) to clear first. The wait is
//! bounded by [`Config::busy_poll_limit`](crate::driver::Config) and reports
//! [`Error::EepromTimeout`] instead of spinning forever.
//!
//! Aborting between steps (timeout or bus error mid-sequence) can leave the EEPROM
//! open for access; the next successful operation ends with a lock and restores it.

use log::debug;

use crate::data_types::{SenseResistor, VoltageLimits};
use crate::driver::Oz890;
use crate::error::Error;
use crate::registers::{addr, adc_code_bytes, eeprom, eeprom_mode, mv_to_adc, EepromControlBits};

/// Full 128-byte EEPROM content.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EepromImage([u8; eeprom::SIZE]);

impl EepromImage {
    pub fn new(bytes: [u8; eeprom::SIZE]) -> Self {
        Self(bytes)
    }

    /// Copy an image out of a slice that must be exactly 128 bytes long.
    pub fn from_slice<E>(bytes: &[u8]) -> Result<Self, Error<E>> {
        match <[u8; eeprom::SIZE]>::try_from(bytes) {
            Ok(bytes) => Ok(Self(bytes)),
            Err(_) => Err(Error::ImageSizeMismatch(bytes.len())),
        }
    }

    pub fn as_bytes(&self) -> &[u8; eeprom::SIZE] {
        &self.0
    }

    /// Word at an even address, `[even, odd]`, or `None` for odd or out-of-range addresses.
    pub fn word(&self, address: u8) -> Option<[u8; 2]> {
        check_word_address::<()>(address).ok()?;
        Some(self.pair(address))
    }

    /// Replace the word at an even address.
    pub fn set_word<E>(&mut self, address: u8, word: [u8; 2]) -> Result<(), Error<E>> {
        check_word_address::<E>(address)?;
        self.set_pair(address, word);
        Ok(())
    }

    // Callers pass layout constants or addresses already checked.
    pub(crate) fn pair(&self, address: u8) -> [u8; 2] {
        let i = address as usize;
        [self.0[i], self.0[i + 1]]
    }

    fn set_pair(&mut self, address: u8, word: [u8; 2]) {
        let i = address as usize;
        self.0[i..i + 2].copy_from_slice(&word);
    }

    /// All 64 words in ascending address order.
    pub fn words(&self) -> impl Iterator<Item = (u8, [u8; 2])> + '_ {
        self.0
            .chunks_exact(2)
            .enumerate()
            .map(|(i, pair)| ((i * 2) as u8, [pair[0], pair[1]]))
    }

    pub fn sense_resistor(&self) -> SenseResistor {
        SenseResistor::from_eeprom_byte(self.0[eeprom::SENSE_RESISTOR as usize])
    }

    /// Store the sense resistor in byte 0 of its word; byte 1 is left alone.
    pub fn set_sense_resistor(&mut self, sense: SenseResistor) {
        self.0[eeprom::SENSE_RESISTOR as usize] = sense.tenths_mohm();
    }

    /// Encode the OV/UV trip and release thresholds (mV) as 13-bit ADC codes.
    /// The low three bits of each low byte are not part of the code and are kept.
    pub fn set_voltage_limits(&mut self, limits: &VoltageLimits) {
        let fields = [
            (eeprom::OV_THRESHOLD, limits.ov_trip),
            (eeprom::OV_RELEASE, limits.ov_release),
            (eeprom::UV_THRESHOLD, limits.uv_trip),
            (eeprom::UV_RELEASE, limits.uv_release),
        ];
        for (address, mv) in fields {
            let [lo_keep, _] = self.pair(address);
            let (lo, hi) = adc_code_bytes(mv_to_adc(mv), lo_keep);
            self.set_pair(address, [lo, hi]);
        }
    }
}

impl Default for EepromImage {
    fn default() -> Self {
        Self([0; eeprom::SIZE])
    }
}

impl AsRef<[u8]> for EepromImage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Reject odd addresses and addresses past the last word.
pub fn check_word_address<E>(address: u8) -> Result<(), Error<E>> {
    if address & 1 != 0 || address > eeprom::LAST_WORD {
        return Err(Error::InvalidAddress(address));
    }
    Ok(())
}

impl<I2C> Oz890<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    pub fn is_eeprom_busy(&mut self) -> Result<bool, Error<I2C::Error>> {
        let control = EepromControlBits::from_bits_truncate(self.read_reg(addr::EEPROM_CONTROL)?);
        Ok(control.contains(EepromControlBits::BUSY))
    }

    /// Poll the busy flag until it clears.
    pub fn wait_not_busy(&mut self) -> Result<(), Error<I2C::Error>> {
        for _ in 0..self.config.busy_poll_limit.max(1) {
            if !self.is_eeprom_busy()? {
                return Ok(());
            }
        }
        Err(Error::EepromTimeout)
    }

    /// Release EEPROM access.
    pub fn eeprom_lock(&mut self) -> Result<(), Error<I2C::Error>> {
        self.wait_not_busy()?;
        self.write_reg(addr::EEPROM_CONTROL, eeprom_mode::LOCK)
    }

    /// Read one EEPROM word, `[even, odd]`.
    pub fn read_eeprom_word(&mut self, address: u8) -> Result<[u8; 2], Error<I2C::Error>> {
        check_word_address::<I2C::Error>(address)?;
        let mut word = [0u8; 2];

        self.wait_not_busy()?;
        self.write_reg(addr::EEPROM_ADDRESS, address)?;
        self.wait_not_busy()?;
        self.write_reg(addr::EEPROM_CONTROL, eeprom_mode::READ)?;
        self.wait_not_busy()?;
        word[1] = self.read_reg(addr::EEPROM_DATA_HI)?;
        self.wait_not_busy()?;
        word[0] = self.read_reg(addr::EEPROM_DATA_LO)?;

        debug!("EEPROM address {:#04x} read {:02x}{:02x}", address, word[0], word[1]);
        self.eeprom_lock()?;
        Ok(word)
    }

    /// Write one EEPROM word. The target must have been erased first.
    pub fn write_eeprom_word(&mut self, address: u8, word: [u8; 2]) -> Result<(), Error<I2C::Error>> {
        check_word_address::<I2C::Error>(address)?;

        // Write mode is selected before the address, unlike the read path.
        self.wait_not_busy()?;
        self.write_reg(addr::EEPROM_CONTROL, eeprom_mode::WRITE)?;
        self.wait_not_busy()?;
        self.write_reg(addr::EEPROM_ADDRESS, address)?;
        self.wait_not_busy()?;
        self.write_reg(addr::EEPROM_DATA_HI, word[1])?;
        self.wait_not_busy()?;
        self.write_reg(addr::EEPROM_DATA_LO, word[0])?;

        debug!("EEPROM address {:#04x} write {:02x}{:02x}", address, word[0], word[1]);
        self.eeprom_lock()
    }

    /// Read the whole EEPROM, word by word.
    pub fn read_eeprom(&mut self) -> Result<EepromImage, Error<I2C::Error>> {
        let mut image = EepromImage::default();
        for address in (0..=eeprom::LAST_WORD).step_by(2) {
            let word = self.read_eeprom_word(address)?;
            image.set_pair(address, word);
        }
        Ok(image)
    }
}
