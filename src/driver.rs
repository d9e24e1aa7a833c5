//! Register-level driver for the OZ890.
//! Provides blocking I2C register access plus cell voltage, current and status reads.

use log::{trace, warn};

use crate::data_types::{SenseResistor, StatusReport};
use crate::error::Error;
use crate::registers::{
    addr, adc_code, adc_to_mv, cell_register, current_code, eeprom, ChargeStateBits, CheckYesBits,
    FetEnableBits, ShutdownBits, SoftSleepBits, CELL_COUNT, DEFAULT_I2C_ADDRESS, OZ890_CHIP_ID,
};

/// Driver tuning knobs.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Reads of the EEPROM control register allowed per busy wait before giving up.
    pub busy_poll_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self { busy_poll_limit: 10_000 }
    }
}

/// OZ890 driver. Owns the bus handle for its lifetime.
pub struct Oz890<I2C> {
    i2c: I2C,
    address: u8,
    pub(crate) config: Config,
}

impl<I2C> Oz890<I2C> {
    /// Create a new driver instance with the default I2C address (0x30).
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DEFAULT_I2C_ADDRESS)
    }

    /// Create a new driver instance with a custom I2C address.
    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            config: Config::default(),
        }
    }

    /// Create a new driver instance with a custom address and configuration.
    pub fn with_config(i2c: I2C, address: u8, config: Config) -> Self {
        Self { i2c, address, config }
    }

    /// Return the 7-bit I2C address configured for this instance.
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn set_address(&mut self, address: u8) {
        self.address = address;
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Release the bus handle.
    pub fn free(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Oz890<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Read a single register.
    ///
    /// The OZ890 needs the single-byte read terminated by an extra NACK'd byte,
    /// so two bytes are clocked out and the second one is discarded.
    pub fn read_reg(&mut self, reg: u8) -> Result<u8, Error<I2C::Error>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(Error::I2c)?;
        trace!("register {:#04x} read {:#04x}", reg, buf[0]);
        Ok(buf[0])
    }

    /// Write a single register.
    pub fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        trace!("register {:#04x} write {:#04x}", reg, value);
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(Error::I2c)
    }

    pub fn chip_id(&mut self) -> Result<u8, Error<I2C::Error>> {
        self.read_reg(addr::CHIP_ID)
    }

    /// Verify the chip ID. With `force`, a mismatch is only logged.
    pub fn check_chip(&mut self, force: bool) -> Result<u8, Error<I2C::Error>> {
        let id = self.chip_id()?;
        if id != OZ890_CHIP_ID {
            if !force {
                return Err(Error::UnknownChip(id));
            }
            warn!("unknown chip id {:#x}, continuing anyway", id);
        }
        Ok(id)
    }

    /// Reboot the device (toggle the reboot bit in the shutdown register).
    pub fn reboot(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_reg(addr::SHUTDOWN, ShutdownBits::REBOOT.bits())?;
        self.write_reg(addr::SHUTDOWN, 0)
    }

    /// Raw 13-bit ADC code of one cell.
    pub fn read_cell_voltage_raw(&mut self, cell: u8) -> Result<u16, Error<I2C::Error>> {
        if cell as usize >= CELL_COUNT {
            return Err(Error::OutOfRange);
        }
        let reg = cell_register(cell);
        let lo = self.read_reg(reg)?;
        let hi = self.read_reg(reg + 1)?;
        Ok(adc_code(lo, hi))
    }

    pub fn read_cell_voltage_mv(&mut self, cell: u8) -> Result<f32, Error<I2C::Error>> {
        Ok(adc_to_mv(self.read_cell_voltage_raw(cell)?))
    }

    /// Read all 13 cell voltages (mV).
    pub fn read_cell_voltages(&mut self) -> Result<[f32; CELL_COUNT], Error<I2C::Error>> {
        let mut out = [0.0; CELL_COUNT];
        for (cell, mv) in out.iter_mut().enumerate() {
            *mv = self.read_cell_voltage_mv(cell as u8)?;
        }
        Ok(out)
    }

    /// Signed pack current ADC value (7.63 µV per count across the sense resistor).
    pub fn read_current_raw(&mut self) -> Result<i16, Error<I2C::Error>> {
        let lo = self.read_reg(addr::CURRENT_LO)?;
        let hi = self.read_reg(addr::CURRENT_HI)?;
        Ok(current_code(lo, hi))
    }

    /// Sense resistor configured in EEPROM.
    pub fn read_sense_resistor(&mut self) -> Result<SenseResistor, Error<I2C::Error>> {
        let word = self.read_eeprom_word(eeprom::SENSE_RESISTOR)?;
        Ok(SenseResistor::from_eeprom_byte(word[0]))
    }

    /// Pack current in amps, scaled by the sense resistor stored in EEPROM.
    pub fn read_current_amps(&mut self) -> Result<f32, Error<I2C::Error>> {
        let sense = self.read_sense_resistor()?;
        let raw = self.read_current_raw()?;
        Ok(sense.current_amps(raw))
    }

    /// Capture all flag registers plus the mode bits from EEPROM.
    pub fn read_status(&mut self) -> Result<StatusReport, Error<I2C::Error>> {
        let mode = self.read_eeprom_word(eeprom::MODE_FLAGS)?;
        Ok(StatusReport {
            software_mode: mode[0] & 0x01 == 0,
            bleeding_enabled: mode[0] & 0x02 != 0,
            soft_sleep: SoftSleepBits::from_bits_truncate(self.read_reg(addr::SOFT_SLEEP)?),
            shutdown: ShutdownBits::from_bits_truncate(self.read_reg(addr::SHUTDOWN)?),
            check_yes: CheckYesBits::from_bits_truncate(self.read_reg(addr::CHECK_YES)?),
            fet_enable: FetEnableBits::from_bits_truncate(self.read_reg(addr::FET_ENABLE)?),
            fet_disable: self.read_reg(addr::FET_DISABLE)?,
            charge_state: ChargeStateBits::from_bits_truncate(self.read_reg(addr::CHARGE_STATE)?),
        })
    }

    /// Clear write-1-to-clear shutdown flags.
    pub fn clear_shutdown_flags(&mut self, flags: ShutdownBits) -> Result<(), Error<I2C::Error>> {
        let flags = flags.difference(ShutdownBits::REBOOT);
        if flags.is_empty() {
            return Ok(());
        }
        self.write_reg(addr::SHUTDOWN, flags.bits())
    }
}
