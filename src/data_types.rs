//! Decoded values and status types for the OZ890 driver.

use crate::eeprom::EepromImage;
use crate::registers::{
    adc_code, adc_to_mv, eeprom, sign_extend_nibble, AuthStatusBits, ChargeStateBits, CheckYesBits,
    FetEnableBits, ShutdownBits, SoftSleepBits, CURRENT_LIMIT_MASK, CURRENT_LIMIT_STEP_V,
    CURRENT_LSB_V, DEFAULT_SENSE_TENTHS_MOHM,
};

/// Current sense resistor, stored in tenths of a milliohm.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SenseResistor(u8);

impl SenseResistor {
    pub const MIN_MOHM: f32 = 0.1;
    pub const MAX_MOHM: f32 = 25.5;

    /// Interpret the EEPROM byte; 0 selects the 2.5 mΩ default.
    pub fn from_eeprom_byte(byte: u8) -> Self {
        if byte == 0 {
            Self(DEFAULT_SENSE_TENTHS_MOHM)
        } else {
            Self(byte)
        }
    }

    /// Validate a user supplied resistance. Returns `None` outside [0.1, 25.5] mΩ.
    pub fn from_milliohms(mohm: f32) -> Option<Self> {
        if !(Self::MIN_MOHM..=Self::MAX_MOHM).contains(&mohm) {
            return None;
        }
        let tenths = (mohm * 10.0 + 0.5) as u32;
        Some(Self(tenths.clamp(1, 255) as u8))
    }

    pub fn tenths_mohm(self) -> u8 {
        self.0
    }

    pub fn milliohms(self) -> f32 {
        self.0 as f32 / 10.0
    }

    pub fn ohms(self) -> f32 {
        self.0 as f32 * 1e-4
    }

    /// Convert a raw current ADC value to amps.
    pub fn current_amps(self, raw: i16) -> f32 {
        raw as f32 * CURRENT_LSB_V / self.ohms()
    }
}

impl Default for SenseResistor {
    fn default() -> Self {
        Self(DEFAULT_SENSE_TENTHS_MOHM)
    }
}

/// Over-current limit decoded from an EEPROM limit byte and its calibration nibble.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurrentLimit {
    /// Raw 6-bit limit code.
    pub code: u8,
    /// Signed calibration offset, in limit steps.
    pub offset: i8,
    /// Configured limit in amps.
    pub amps: f32,
    /// Limit reached with every code bit set, same offset.
    pub max_amps: f32,
}

impl CurrentLimit {
    /// Decode `limit_byte[5:0]` with the offset nibble held in `offset_byte[7:4]`.
    pub fn decode(limit_byte: u8, offset_byte: u8, sense: SenseResistor) -> Self {
        let code = limit_byte & CURRENT_LIMIT_MASK;
        let offset = sign_extend_nibble(offset_byte);
        let step = CURRENT_LIMIT_STEP_V / sense.ohms();
        Self {
            code,
            offset,
            amps: (code as i16 + offset as i16) as f32 * step,
            max_amps: (CURRENT_LIMIT_MASK as i16 + offset as i16) as f32 * step,
        }
    }
}

/// Cell over/under-voltage protection thresholds, in millivolts.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoltageLimits {
    pub ov_trip: f32,
    pub ov_release: f32,
    pub uv_trip: f32,
    pub uv_release: f32,
}

/// Configuration fields decoded from an EEPROM image.
#[derive(Clone, Debug, PartialEq)]
pub struct EepromConfig {
    pub cell_count: u8,
    /// FETs are driven by the host rather than the internal state machine.
    pub software_mode: bool,
    pub bleeding_enabled: bool,
    pub idle_bleeding: bool,
    pub sense_resistor: SenseResistor,
    /// Two-bit current limit scale selector (byte 0 of the limit word, bits 7:6).
    pub current_scale: u8,
    pub discharge_limit: CurrentLimit,
    pub charge_limit: CurrentLimit,
    pub bleed_start_mv: f32,
    pub voltage_limits: VoltageLimits,
    pub factory_name: [u8; eeprom::FACTORY_NAME_LEN],
    pub project_name: [u8; eeprom::PROJECT_NAME_LEN],
    pub version: u8,
}

impl EepromConfig {
    pub fn decode(image: &EepromImage) -> Self {
        let byte = |offset: u8| image.as_bytes()[offset as usize];
        let threshold = |offset: u8| adc_to_mv(adc_code(byte(offset), byte(offset + 1)));

        let sense = SenseResistor::from_eeprom_byte(byte(eeprom::SENSE_RESISTOR));
        let limits = image.pair(eeprom::CURRENT_LIMIT);

        let mut factory_name = [0u8; eeprom::FACTORY_NAME_LEN];
        let start = eeprom::FACTORY_NAME as usize;
        factory_name.copy_from_slice(&image.as_bytes()[start..start + eeprom::FACTORY_NAME_LEN]);
        let mut project_name = [0u8; eeprom::PROJECT_NAME_LEN];
        let start = eeprom::PROJECT_NAME as usize;
        project_name.copy_from_slice(&image.as_bytes()[start..start + eeprom::PROJECT_NAME_LEN]);

        Self {
            cell_count: byte(eeprom::CELL_COUNT) & 0x0F,
            software_mode: byte(eeprom::MODE_FLAGS) & 0x01 == 0,
            bleeding_enabled: byte(eeprom::MODE_FLAGS) & 0x02 != 0,
            idle_bleeding: byte(eeprom::IDLE_BLEED + 1) & 0x40 != 0,
            sense_resistor: sense,
            current_scale: limits[0] >> 6,
            discharge_limit: CurrentLimit::decode(limits[0], byte(eeprom::DISCHARGE_OFFSET), sense),
            charge_limit: CurrentLimit::decode(limits[1], byte(eeprom::CHARGE_OFFSET), sense),
            bleed_start_mv: threshold(eeprom::BLEED_START),
            voltage_limits: VoltageLimits {
                ov_trip: threshold(eeprom::OV_THRESHOLD),
                ov_release: threshold(eeprom::OV_RELEASE),
                uv_trip: threshold(eeprom::UV_THRESHOLD),
                uv_release: threshold(eeprom::UV_RELEASE),
            },
            factory_name,
            project_name,
            version: byte(eeprom::VERSION),
        }
    }

    pub fn factory_name_str(&self) -> &str {
        ascii_field(&self.factory_name)
    }

    pub fn project_name_str(&self) -> &str {
        ascii_field(&self.project_name)
    }
}

fn ascii_field(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0 || b == 0xFF).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end]).unwrap_or("").trim_end()
}

/// Outcome of the password unlock sequence.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthenticationState {
    Success,
    PasswordRejected,
    Busy,
}

impl AuthenticationState {
    pub fn from_status(bits: AuthStatusBits) -> Self {
        if bits.contains(AuthStatusBits::PWD_OK) {
            Self::Success
        } else if bits.contains(AuthStatusBits::PWD_BUSY) {
            Self::Busy
        } else {
            Self::PasswordRejected
        }
    }
}

/// Conditions reported by the flag registers.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Condition {
    ShortCircuitWake,
    LowPower,
    UnbalancedShutdown,
    MosfetFailure,
    VoltageHighFailure,
    VoltageLowFailure,
    UnderVoltage,
    ExtremeLowVoltage,
    ExtremeHighVoltage,
    MosfetPermanentFailure,
    UnbalancedPermanentFailure,
    OverVoltage,
    UnderTemperature,
    OverTemperature,
    DischargeFetSoftwareOff,
    ChargeFetSoftwareOff,
    PrechargeFetSoftwareOff,
    /// One or more FET-disable reason bits (0x1F) are set; the raw byte is in
    /// [`StatusReport::fet_disable`].
    FetsDisabled,
    Charging,
    Discharging,
}

impl Condition {
    pub fn description(self) -> &'static str {
        match self {
            Condition::ShortCircuitWake => "Woken up by short circuit.",
            Condition::LowPower => "Device is in low power state.",
            Condition::UnbalancedShutdown => "Battery is unbalanced (permanent failure flag).",
            Condition::MosfetFailure => "MOSFET failure detected.",
            Condition::VoltageHighFailure => "Voltage High Permanent Failure.",
            Condition::VoltageLowFailure => "Voltage Low Permanent Failure.",
            Condition::UnderVoltage => "Undervoltage detected.",
            Condition::ExtremeLowVoltage => "Cell voltage is extremely low (permanent failure flag)!",
            Condition::ExtremeHighVoltage => "Cell voltage is extremely high (permanent failure flag)!",
            Condition::MosfetPermanentFailure => "MOSFET failure (permanent failure flag)!",
            Condition::UnbalancedPermanentFailure => "Cells are unbalanced (permanent failure flag)!",
            Condition::OverVoltage => "Overvoltage detected.",
            Condition::UnderTemperature => "Temperature is too low.",
            Condition::OverTemperature => "Temperature is too high!",
            Condition::DischargeFetSoftwareOff => "Discharge MOSFET is disabled by software.",
            Condition::ChargeFetSoftwareOff => "Charge MOSFET is disabled by software.",
            Condition::PrechargeFetSoftwareOff => "Precharge MOSFET is disabled by software.",
            Condition::FetsDisabled => "MOSFETs disabled by the protection logic.",
            Condition::Charging => "Battery is charging.",
            Condition::Discharging => "Battery is discharging.",
        }
    }
}

static SOFT_SLEEP_MAP: [(SoftSleepBits, Condition); 2] = [
    (SoftSleepBits::SHORT_CIRCUIT_WAKE, Condition::ShortCircuitWake),
    (SoftSleepBits::LOW_POWER, Condition::LowPower),
];

static SHUTDOWN_MAP: [(ShutdownBits, Condition); 4] = [
    (ShutdownBits::UNBALANCED_PF, Condition::UnbalancedShutdown),
    (ShutdownBits::MOSFET_FAIL, Condition::MosfetFailure),
    (ShutdownBits::VOLTAGE_HIGH_PF, Condition::VoltageHighFailure),
    (ShutdownBits::VOLTAGE_LOW_PF, Condition::VoltageLowFailure),
];

static CHECK_YES_MAP: [(CheckYesBits, Condition); 8] = [
    (CheckYesBits::UNDER_VOLTAGE, Condition::UnderVoltage),
    (CheckYesBits::EXTREME_LOW_PF, Condition::ExtremeLowVoltage),
    (CheckYesBits::EXTREME_HIGH_PF, Condition::ExtremeHighVoltage),
    (CheckYesBits::MOSFET_PF, Condition::MosfetPermanentFailure),
    (CheckYesBits::UNBALANCED_PF, Condition::UnbalancedPermanentFailure),
    (CheckYesBits::OVER_VOLTAGE, Condition::OverVoltage),
    (CheckYesBits::UNDER_TEMP, Condition::UnderTemperature),
    (CheckYesBits::OVER_TEMP, Condition::OverTemperature),
];

// Inverted: a cleared enable bit is the condition.
static FET_ENABLE_MAP: [(FetEnableBits, Condition); 3] = [
    (FetEnableBits::DISCHARGE, Condition::DischargeFetSoftwareOff),
    (FetEnableBits::CHARGE, Condition::ChargeFetSoftwareOff),
    (FetEnableBits::PRECHARGE, Condition::PrechargeFetSoftwareOff),
];

static CHARGE_STATE_MAP: [(ChargeStateBits, Condition); 2] = [
    (ChargeStateBits::CHARGING, Condition::Charging),
    (ChargeStateBits::DISCHARGING, Condition::Discharging),
];

/// Raw flag registers captured in one status read.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StatusReport {
    pub software_mode: bool,
    pub bleeding_enabled: bool,
    pub soft_sleep: SoftSleepBits,
    pub shutdown: ShutdownBits,
    pub check_yes: CheckYesBits,
    pub fet_enable: FetEnableBits,
    /// Raw FET-disable reason byte (0x1F). Its bit layout is undocumented.
    pub fet_disable: u8,
    pub charge_state: ChargeStateBits,
}

impl StatusReport {
    /// Every condition flagged by the captured registers, in register order.
    /// Software FET conditions are only meaningful (and only reported) in software mode.
    pub fn conditions(&self) -> impl Iterator<Item = Condition> + '_ {
        let soft_sleep = SOFT_SLEEP_MAP
            .iter()
            .filter(move |(bit, _)| self.soft_sleep.contains(*bit))
            .map(|(_, condition)| *condition);
        let shutdown = SHUTDOWN_MAP
            .iter()
            .filter(move |(bit, _)| self.shutdown.contains(*bit))
            .map(|(_, condition)| *condition);
        let check_yes = CHECK_YES_MAP
            .iter()
            .filter(move |(bit, _)| self.check_yes.contains(*bit))
            .map(|(_, condition)| *condition);
        let fet_enable = FET_ENABLE_MAP
            .iter()
            .filter(move |(bit, _)| self.software_mode && !self.fet_enable.contains(*bit))
            .map(|(_, condition)| *condition);
        let fet_disable = core::iter::once(Condition::FetsDisabled).filter(move |_| self.fet_disable != 0);
        let charge_state = CHARGE_STATE_MAP
            .iter()
            .filter(move |(bit, _)| self.charge_state.contains(*bit))
            .map(|(_, condition)| *condition);

        soft_sleep
            .chain(shutdown)
            .chain(check_yes)
            .chain(fet_enable)
            .chain(fet_disable)
            .chain(charge_state)
    }

    pub fn has(&self, condition: Condition) -> bool {
        self.conditions().any(|c| c == condition)
    }
}
