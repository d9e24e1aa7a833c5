#![allow(dead_code)]

use embedded_hal_mock::eh1::i2c::Transaction as I2cTrans;

pub const ADDR: u8 = 0x30;

/// EEPROM control register poll with the busy flag clear.
pub fn idle() -> I2cTrans {
    I2cTrans::write_read(ADDR, vec![0x5F], vec![0x00, 0x00])
}

/// EEPROM control register poll with the busy flag set.
pub fn busy() -> I2cTrans {
    I2cTrans::write_read(ADDR, vec![0x5F], vec![0x80, 0x00])
}

/// Single register read; the second byte is the NACK'd dummy.
pub fn read(reg: u8, value: u8) -> I2cTrans {
    I2cTrans::write_read(ADDR, vec![reg], vec![value, 0x00])
}

pub fn write(reg: u8, value: u8) -> I2cTrans {
    I2cTrans::write(ADDR, vec![reg, value])
}

pub fn lock() -> Vec<I2cTrans> {
    vec![idle(), write(0x5F, 0x00)]
}

pub fn eeprom_word_read(address: u8, word: [u8; 2]) -> Vec<I2cTrans> {
    let mut t = vec![
        idle(),
        write(0x5E, address),
        idle(),
        write(0x5F, 0x55),
        idle(),
        read(0x5D, word[1]),
        idle(),
        read(0x5C, word[0]),
    ];
    t.extend(lock());
    t
}

pub fn eeprom_word_write(address: u8, word: [u8; 2]) -> Vec<I2cTrans> {
    let mut t = vec![
        idle(),
        write(0x5F, 0x52),
        idle(),
        write(0x5E, address),
        idle(),
        write(0x5D, word[1]),
        idle(),
        write(0x5C, word[0]),
    ];
    t.extend(lock());
    t
}

/// Password read, submission and status read, ending with the lock.
pub fn authentication(password: [u8; 2], status: u8) -> Vec<I2cTrans> {
    let mut t = eeprom_word_read(0x7A, password);
    t.extend([
        idle(),
        write(0x5F, 0x50),
        write(0x69, password[0]),
        write(0x6A, password[1]),
        read(0x6F, status),
    ]);
    t.extend(lock());
    t
}

/// Image whose byte at offset `i` is `i`.
pub fn counting_image() -> [u8; 128] {
    core::array::from_fn(|i| i as u8)
}
