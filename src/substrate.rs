//! Backing stores for EEPROM operations: the live device or a flat image file.
//!
//! The substrate is chosen once and the two are mutually exclusive for a run.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::driver::Oz890;
use crate::eeprom::{check_word_address, EepromImage};
use crate::error::Error;
use crate::registers::eeprom;

/// Default Linux I2C device used when nothing else is selected.
pub const DEFAULT_BUS_PATH: &str = "/dev/i2c-1";

/// EEPROM image stored in a 128-byte file.
pub struct FileImage<F = File> {
    file: F,
}

impl FileImage<File> {
    /// Open an existing image for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Create (or truncate) an image file.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file })
    }
}

impl<F> FileImage<F>
where
    F: Read + Write + Seek,
{
    pub fn new(file: F) -> Self {
        Self { file }
    }

    pub fn into_inner(self) -> F {
        self.file
    }

    /// Read one word straight from the file.
    pub fn read_word<E>(&mut self, address: u8) -> Result<[u8; 2], Error<E>> {
        check_word_address::<E>(address)?;
        let mut word = [0u8; 2];
        self.file.seek(SeekFrom::Start(address as u64))?;
        self.file.read_exact(&mut word)?;
        debug!("image address {:#04x} read {:02x}{:02x}", address, word[0], word[1]);
        Ok(word)
    }

    /// Read the whole image. The file must hold exactly 128 bytes.
    pub fn read_image<E>(&mut self) -> Result<EepromImage, Error<E>> {
        let mut bytes = Vec::with_capacity(eeprom::SIZE);
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_end(&mut bytes)?;
        EepromImage::from_slice(&bytes)
    }

    /// Rewrite all 128 bytes from offset 0.
    pub fn save_image<E>(&mut self, image: &EepromImage) -> Result<(), Error<E>> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(image.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Where EEPROM operations are carried out.
pub enum Substrate<'a, I2C, F = File> {
    Device(&'a mut Oz890<I2C>),
    File(FileImage<F>),
}

impl<I2C, F> Substrate<'_, I2C, F>
where
    I2C: embedded_hal::i2c::I2c,
    F: Read + Write + Seek,
{
    pub fn is_device(&self) -> bool {
        matches!(self, Substrate::Device(_))
    }

    pub fn read_word(&mut self, address: u8) -> Result<[u8; 2], Error<I2C::Error>> {
        match self {
            Substrate::Device(dev) => dev.read_eeprom_word(address),
            Substrate::File(file) => file.read_word(address),
        }
    }

    pub fn read_image(&mut self) -> Result<EepromImage, Error<I2C::Error>> {
        match self {
            Substrate::Device(dev) => dev.read_eeprom(),
            Substrate::File(file) => file.read_image(),
        }
    }

    /// Store a modified image: an authenticated rewrite on the device, a whole-file save otherwise.
    pub fn write_image(&mut self, image: &EepromImage) -> Result<(), Error<I2C::Error>> {
        match self {
            Substrate::Device(dev) => dev.rewrite_eeprom(image),
            Substrate::File(file) => file.save_image(image),
        }
    }

    /// Password gated bulk rewrite. Only defined against a live device.
    pub fn rewrite(&mut self, image: &EepromImage) -> Result<(), Error<I2C::Error>> {
        match self {
            Substrate::Device(dev) => dev.rewrite_eeprom(image),
            Substrate::File(_) => Err(Error::InvalidConfig),
        }
    }
}

/// Substrate requested by the user, before anything is opened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubstrateChoice<'p> {
    Device(&'p str),
    File(&'p Path),
}

impl<'p> SubstrateChoice<'p> {
    /// Pick the substrate. Naming both a device and an image file is a configuration error;
    /// naming neither selects [`DEFAULT_BUS_PATH`].
    pub fn select<E>(device: Option<&'p str>, file: Option<&'p Path>) -> Result<Self, Error<E>> {
        match (device, file) {
            (Some(_), Some(_)) => Err(Error::InvalidConfig),
            (Some(device), None) => Ok(Self::Device(device)),
            (None, Some(file)) => Ok(Self::File(file)),
            (None, None) => Ok(Self::Device(DEFAULT_BUS_PATH)),
        }
    }
}
