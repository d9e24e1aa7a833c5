//! Register map, EEPROM layout and raw conversion helpers for the OZ890.
//! Addresses and bit positions follow the O2Micro register documentation for rev C parts.

/// Default 7-bit I2C address (0x60 write / 0x61 read on the wire).
pub const DEFAULT_I2C_ADDRESS: u8 = 0x30;

/// Value of the chip ID register for an OZ890 rev C.
pub const OZ890_CHIP_ID: u8 = 2;

/// Number of cell voltage channels.
pub const CELL_COUNT: usize = 13;

/// Register addresses.
pub mod addr {
    /// Chip ID (reads 2 on rev C).
    pub const CHIP_ID: u8 = 0x00;
    /// Charge current calibration offset (high nibble).
    pub const CHARGE_OFFSET: u8 = 0x02;
    /// Discharge current calibration offset (high nibble).
    pub const DISCHARGE_OFFSET: u8 = 0x04;
    /// Soft-sleep / wake-up status.
    pub const SOFT_SLEEP: u8 = 0x14;
    /// Shutdown flags; also reboot control (write 1 then 0).
    pub const SHUTDOWN: u8 = 0x15;
    /// Protection check flags ("check yes").
    pub const CHECK_YES: u8 = 0x1C;
    /// Software FET enable.
    pub const FET_ENABLE: u8 = 0x1E;
    /// FET disable reason flags.
    pub const FET_DISABLE: u8 = 0x1F;
    /// Charge / discharge state.
    pub const CHARGE_STATE: u8 = 0x20;
    /// First cell voltage register (low byte of cell 0). Cell `c` lives at `CELL_VOLTAGE + 2c`.
    pub const CELL_VOLTAGE: u8 = 0x32;
    /// Pack current, low byte.
    pub const CURRENT_LO: u8 = 0x54;
    /// Pack current, high byte.
    pub const CURRENT_HI: u8 = 0x55;
    /// EEPROM data, even (low) byte.
    pub const EEPROM_DATA_LO: u8 = 0x5C;
    /// EEPROM data, odd (high) byte.
    pub const EEPROM_DATA_HI: u8 = 0x5D;
    /// EEPROM target address.
    pub const EEPROM_ADDRESS: u8 = 0x5E;
    /// EEPROM control. Bit 7 is the busy flag.
    pub const EEPROM_CONTROL: u8 = 0x5F;
    /// Password submission, low byte.
    pub const PASSWORD_LO: u8 = 0x69;
    /// Password submission, high byte.
    pub const PASSWORD_HI: u8 = 0x6A;
    /// Authentication status.
    pub const AUTH_STATUS: u8 = 0x6F;
}

/// EEPROM control register modes (written to [`addr::EEPROM_CONTROL`]).
pub mod eeprom_mode {
    /// Release access.
    pub const LOCK: u8 = 0x00;
    /// Request privileged (password) access.
    pub const AUTH: u8 = 0x50;
    /// Word write mode.
    pub const WRITE: u8 = 0x52;
    /// Erase the whole EEPROM.
    pub const ERASE: u8 = 0x53;
    /// Word read mode.
    pub const READ: u8 = 0x55;
}

/// EEPROM layout (byte offsets; words start at even offsets).
pub mod eeprom {
    /// EEPROM size in bytes.
    pub const SIZE: usize = 128;
    /// Highest valid word address.
    pub const LAST_WORD: u8 = 126;

    pub const CHARGE_OFFSET: u8 = 0x02;
    pub const DISCHARGE_OFFSET: u8 = 0x04;
    /// Cell count in the low nibble.
    pub const CELL_COUNT: u8 = 0x26;
    /// Discharge (byte 0) and charge (byte 1) over-current limits.
    pub const CURRENT_LIMIT: u8 = 0x28;
    /// Idle bleeding flag, bit 6 of the high byte.
    pub const IDLE_BLEED: u8 = 0x2C;
    /// Bit 0 of byte 0: hardware mode; bit 1: bleeding enabled.
    pub const MODE_FLAGS: u8 = 0x32;
    /// Sense resistor in tenths of a milliohm (byte 0).
    pub const SENSE_RESISTOR: u8 = 0x34;
    pub const FACTORY_NAME: u8 = 0x36;
    pub const FACTORY_NAME_LEN: usize = 10;
    pub const PROJECT_NAME: u8 = 0x40;
    pub const PROJECT_NAME_LEN: usize = 5;
    pub const VERSION: u8 = 0x45;
    pub const BLEED_START: u8 = 0x48;
    pub const OV_THRESHOLD: u8 = 0x4A;
    pub const OV_RELEASE: u8 = 0x4C;
    pub const UV_THRESHOLD: u8 = 0x4E;
    pub const UV_RELEASE: u8 = 0x50;
    pub const PASSWORD: u8 = 0x7A;
}

/// Cell voltage ADC LSB in millivolts.
pub const ADC_LSB_MV: f32 = 1.22;
/// Largest 13-bit ADC code.
pub const ADC_MAX: u16 = 0x1FFF;
/// Current ADC LSB across the sense resistor, in volts.
pub const CURRENT_LSB_V: f32 = 7.63e-6;
/// Current limit step across the sense resistor, in volts.
pub const CURRENT_LIMIT_STEP_V: f32 = 5e-3;
/// Current limit code width (bits 5..0 of each limit byte).
pub const CURRENT_LIMIT_MASK: u8 = 0x3F;
/// Sense resistor used when the EEPROM holds 0, in tenths of a milliohm.
pub const DEFAULT_SENSE_TENTHS_MOHM: u8 = 25;

bitflags::bitflags! {
    /// EEPROM control register (0x5F), read side.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct EepromControlBits: u8 {
        const BUSY = 1 << 7;
    }

    /// Soft-sleep status (0x14).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct SoftSleepBits: u8 {
        /// Woken up by a short circuit.
        const SHORT_CIRCUIT_WAKE = 1 << 1;
        /// Device is in its low power state.
        const LOW_POWER          = 1 << 4;
    }

    /// Shutdown flags (0x15). Permanent failure bits are write-1-to-clear.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct ShutdownBits: u8 {
        /// Writing 1 then 0 reboots the device.
        const REBOOT           = 1 << 0;
        const VOLTAGE_LOW_PF   = 1 << 1;
        const VOLTAGE_HIGH_PF  = 1 << 2;
        const MOSFET_FAIL      = 1 << 3;
        const UNBALANCED_PF    = 1 << 4;
    }

    /// Protection check flags (0x1C).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct CheckYesBits: u8 {
        const UNDER_VOLTAGE    = 1 << 0;
        const EXTREME_LOW_PF   = 1 << 1;
        const EXTREME_HIGH_PF  = 1 << 2;
        const MOSFET_PF        = 1 << 3;
        const UNBALANCED_PF    = 1 << 4;
        const OVER_VOLTAGE     = 1 << 5;
        const UNDER_TEMP       = 1 << 6;
        const OVER_TEMP        = 1 << 7;
    }

    /// Software FET enable (0x1E). A cleared bit means the FET is held off by software.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct FetEnableBits: u8 {
        const DISCHARGE = 1 << 0;
        const CHARGE    = 1 << 1;
        const PRECHARGE = 1 << 2;
    }

    /// Charge / discharge state (0x20).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct ChargeStateBits: u8 {
        const DISCHARGING = 1 << 2;
        const CHARGING    = 1 << 3;
    }

    /// Authentication status (0x6F).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct AuthStatusBits: u8 {
        const CHG_OK   = 1 << 0;
        const CHG_FAIL = 1 << 1;
        const DSG_OK   = 1 << 2;
        const DSG_FAIL = 1 << 3;
        const PWD_BUSY = 1 << 5;
        const PWD_OK   = 1 << 6;
        const PWD_FAIL = 1 << 7;
    }
}

/// Register holding the low byte of `cell`'s voltage. Caller checks `cell < CELL_COUNT`.
pub fn cell_register(cell: u8) -> u8 {
    addr::CELL_VOLTAGE + cell * 2
}

/// Combine a 13-bit ADC code stored as `lo[7:3]`, `hi[7:0]`.
pub fn adc_code(lo: u8, hi: u8) -> u16 {
    ((hi as u16) << 5) + ((lo as u16) >> 3)
}

/// Split a 13-bit ADC code back into `(lo, hi)`, keeping the low 3 bits of `lo_keep`.
pub fn adc_code_bytes(code: u16, lo_keep: u8) -> (u8, u8) {
    let code = code.min(ADC_MAX);
    let lo = (((code & 0x1F) as u8) << 3) | (lo_keep & 0x07);
    let hi = (code >> 5) as u8;
    (lo, hi)
}

/// Convert an ADC code to millivolts.
pub fn adc_to_mv(code: u16) -> f32 {
    code as f32 * ADC_LSB_MV
}

/// Convert millivolts to the nearest ADC code. Clamps to the 13-bit range.
pub fn mv_to_adc(mv: f32) -> u16 {
    if mv <= 0.0 {
        return 0;
    }
    let code = (mv / ADC_LSB_MV + 0.5) as u32;
    code.min(ADC_MAX as u32) as u16
}

/// Signed current ADC value from the 0x54/0x55 pair.
pub fn current_code(lo: u8, hi: u8) -> i16 {
    i16::from_le_bytes([lo, hi])
}

/// Sign-extend the 4-bit two's-complement value held in the high nibble of `byte`.
pub fn sign_extend_nibble(byte: u8) -> i8 {
    (byte as i8) >> 4
}
