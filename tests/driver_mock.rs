mod common;

use common::{eeprom_word_read, read, write, ADDR};
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};
use oz890_rs::data_types::Condition;
use oz890_rs::driver::Oz890;
use oz890_rs::registers::ShutdownBits;
use oz890_rs::Error;

#[test]
fn read_reg_clocks_out_dummy_byte() {
    let expectations = [I2cTrans::write_read(ADDR, vec![0x00], vec![0x02, 0xFF])];
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    assert_eq!(driver.check_chip(false).unwrap(), 2);
    driver.free().done();
}

#[test]
fn unknown_chip_rejected_unless_forced() {
    let expectations = [read(0x00, 0x05), read(0x00, 0x05)];
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    assert!(matches!(driver.check_chip(false), Err(Error::UnknownChip(0x05))));
    assert_eq!(driver.check_chip(true).unwrap(), 0x05);
    driver.free().done();
}

#[test]
fn missing_ack_is_an_error() {
    let expectations = [I2cTrans::write_read(ADDR, vec![0x1C], vec![0x00, 0x00])
        .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))];
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    assert!(matches!(
        driver.read_reg(0x1C),
        Err(Error::I2c(ErrorKind::NoAcknowledge(_)))
    ));
    driver.free().done();
}

#[test]
fn custom_address_is_used() {
    let expectations = [I2cTrans::write(0x31, vec![0x1E, 0x07])];
    let mut driver = Oz890::with_address(I2cMock::new(&expectations), 0x31);
    assert_eq!(driver.address(), 0x31);
    driver.write_reg(0x1E, 0x07).unwrap();
    driver.free().done();
}

#[test]
fn reboot_toggles_shutdown_register() {
    let expectations = [write(0x15, 0x01), write(0x15, 0x00)];
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    driver.reboot().unwrap();
    driver.free().done();
}

#[test]
fn cell_voltage_from_register_pair() {
    // (0x10 << 5) + (0x08 >> 3) = 513 -> 625.86 mV
    let expectations = [read(0x32, 0x08), read(0x33, 0x10), read(0x4A, 0xF8), read(0x4B, 0x01)];
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    let mv = driver.read_cell_voltage_mv(0).unwrap();
    assert!((mv - 625.86).abs() < 1e-3);
    assert_eq!(driver.read_cell_voltage_raw(12).unwrap(), (0x01 << 5) + (0xF8 >> 3));
    driver.free().done();
}

#[test]
fn cell_out_of_range_touches_nothing() {
    let expectations: [I2cTrans; 0] = [];
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    assert!(matches!(driver.read_cell_voltage_raw(13), Err(Error::OutOfRange)));
    driver.free().done();
}

#[test]
fn all_cells_are_read_in_order() {
    let mut expectations = Vec::new();
    for cell in 0..13u8 {
        expectations.push(read(0x32 + cell * 2, cell << 3));
        expectations.push(read(0x33 + cell * 2, 0x00));
    }
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    let cells = driver.read_cell_voltages().unwrap();
    for (cell, mv) in cells.iter().enumerate() {
        assert!((mv - cell as f32 * 1.22).abs() < 1e-3);
    }
    driver.free().done();
}

#[test]
fn current_uses_default_sense_resistor() {
    // Sense byte 0 -> 2.5 mOhm; raw 0xFC18 = -1000 -> -1000 * 7.63 uV / 2.5 mOhm
    let mut expectations = eeprom_word_read(0x34, [0x00, 0x00]);
    expectations.extend([read(0x54, 0x18), read(0x55, 0xFC)]);
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    let amps = driver.read_current_amps().unwrap();
    assert!((amps - (-3.052)).abs() < 1e-3);
    driver.free().done();
}

#[test]
fn status_report_reads_flag_registers() {
    let mut expectations = eeprom_word_read(0x32, [0x00, 0x00]);
    expectations.extend([
        read(0x14, 0x02),
        read(0x15, 0x10),
        read(0x1C, 0x01),
        read(0x1E, 0x07),
        read(0x1F, 0x00),
        read(0x20, 0x04),
    ]);
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    let status = driver.read_status().unwrap();
    assert!(status.software_mode);
    let conditions: Vec<_> = status.conditions().collect();
    assert_eq!(
        conditions,
        vec![
            Condition::ShortCircuitWake,
            Condition::UnbalancedShutdown,
            Condition::UnderVoltage,
            Condition::Discharging,
        ]
    );
    driver.free().done();
}

#[test]
fn clearing_flags_never_sets_reboot_bit() {
    let expectations = [write(0x15, 0x10)];
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    driver
        .clear_shutdown_flags(ShutdownBits::UNBALANCED_PF | ShutdownBits::REBOOT)
        .unwrap();
    driver.clear_shutdown_flags(ShutdownBits::empty()).unwrap();
    driver.free().done();
}
