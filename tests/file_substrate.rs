#![cfg(feature = "std")]

mod common;

use std::io::Cursor;
use std::path::Path;

use common::{counting_image, eeprom_word_read};
use embedded_hal_mock::eh1::i2c::Mock as I2cMock;
use oz890_rs::data_types::SenseResistor;
use oz890_rs::driver::Oz890;
use oz890_rs::substrate::{FileImage, Substrate, SubstrateChoice, DEFAULT_BUS_PATH};
use oz890_rs::{EepromImage, Error};

type FileSubstrate<'a> = Substrate<'a, I2cMock, Cursor<Vec<u8>>>;

fn file_substrate(bytes: Vec<u8>) -> FileSubstrate<'static> {
    Substrate::File(FileImage::new(Cursor::new(bytes)))
}

#[test]
fn file_word_read_seeks_to_address() {
    let mut substrate = file_substrate(counting_image().to_vec());
    assert_eq!(substrate.read_word(0x34).unwrap(), [0x34, 0x35]);
    assert_eq!(substrate.read_word(0x34).unwrap(), [0x34, 0x35]);
    assert_eq!(substrate.read_word(0x00).unwrap(), [0x00, 0x01]);
    assert!(matches!(substrate.read_word(0x35), Err(Error::InvalidAddress(0x35))));
}

#[test]
fn short_file_is_a_size_mismatch() {
    let mut substrate = file_substrate(vec![0u8; 100]);
    assert!(matches!(substrate.read_image(), Err(Error::ImageSizeMismatch(100))));
}

#[test]
fn bulk_rewrite_needs_a_device() {
    let mut substrate = file_substrate(counting_image().to_vec());
    assert!(!substrate.is_device());
    let image = EepromImage::default();
    assert!(matches!(substrate.rewrite(&image), Err(Error::InvalidConfig)));
}

#[test]
fn file_edit_rewrites_whole_image() {
    let mut image_file = FileImage::new(Cursor::new(counting_image().to_vec()));
    let mut image = image_file.read_image::<()>().unwrap();
    image.set_sense_resistor(SenseResistor::from_milliohms(2.0).unwrap());
    image_file.save_image::<()>(&image).unwrap();

    let bytes = image_file.into_inner().into_inner();
    assert_eq!(bytes.len(), 128);
    assert_eq!(bytes[0x34], 20);
    assert_eq!(bytes[0x35], 0x35);
    assert_eq!(&bytes[..0x34], &counting_image()[..0x34]);
}

#[test]
fn write_image_on_file_substrate_saves() {
    let mut substrate = file_substrate(vec![0u8; 128]);
    let image = EepromImage::new(counting_image());
    substrate.write_image(&image).unwrap();
    assert_eq!(substrate.read_image().unwrap(), image);
}

#[test]
fn device_substrate_reads_over_the_bus() {
    let expectations = eeprom_word_read(0x7A, [0x34, 0x12]);
    let mut driver = Oz890::new(I2cMock::new(&expectations));
    {
        let mut substrate: Substrate<'_, I2cMock, Cursor<Vec<u8>>> = Substrate::Device(&mut driver);
        assert!(substrate.is_device());
        assert_eq!(substrate.read_word(0x7A).unwrap(), [0x34, 0x12]);
    }
    driver.free().done();
}

#[test]
fn substrates_are_mutually_exclusive() {
    let image = Path::new("battery.bin");
    assert!(matches!(
        SubstrateChoice::select::<()>(Some("/dev/i2c-0"), Some(image)),
        Err(Error::InvalidConfig)
    ));
    assert_eq!(
        SubstrateChoice::select::<()>(None, Some(image)).unwrap(),
        SubstrateChoice::File(image)
    );
    assert_eq!(
        SubstrateChoice::select::<()>(Some("/dev/i2c-0"), None).unwrap(),
        SubstrateChoice::Device("/dev/i2c-0")
    );
    assert_eq!(
        SubstrateChoice::select::<()>(None, None).unwrap(),
        SubstrateChoice::Device(DEFAULT_BUS_PATH)
    );
}
