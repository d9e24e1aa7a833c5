use std::path::PathBuf;

use anyhow::{bail, Context, Result as AnyResult};
use clap::{ArgAction, Parser};
use linux_embedded_hal::I2cdev;
use log::LevelFilter;

use oz890_rs::data_types::{Condition, EepromConfig, SenseResistor, VoltageLimits};
use oz890_rs::registers::ShutdownBits;
use oz890_rs::substrate::{FileImage, Substrate, SubstrateChoice};
use oz890_rs::{Config, Oz890};

type Device = Oz890<I2cdev>;

#[derive(Debug, Parser)]
#[command(author, version, about = "Inspect and reconfigure an OZ890 battery controller")]
struct Cli {
    /// Display current.
    #[arg(short = 'c', long)]
    current: bool,

    /// Debug output; use multiple times to increase verbosity.
    #[arg(short = 'd', long, action = ArgAction::Count)]
    debug: u8,

    /// Display and fix flags.
    #[arg(short = 'f', long)]
    flags: bool,

    /// Display cell voltages.
    #[arg(short = 'v', long)]
    voltages: bool,

    /// Display the configuration stored in EEPROM.
    #[arg(short = 'e', long)]
    eeprom: bool,

    /// Read the EEPROM into a file.
    #[arg(short = 'o', long, value_name = "FILE")]
    read_to: Option<PathBuf>,

    /// Write a 128-byte file into the EEPROM (password gated rewrite).
    #[arg(short = 'w', long, value_name = "FILE")]
    write_from: Option<PathBuf>,

    /// Operate on an EEPROM image file instead of the device.
    #[arg(short = 'F', long, value_name = "IMAGE")]
    file: Option<PathBuf>,

    /// I2C bus device (default /dev/i2c-1).
    #[arg(short = 'b', long, value_name = "PATH")]
    bus: Option<String>,

    /// 7-bit device address.
    #[arg(short = 'a', long, value_parser = parse_hex, default_value = "0x30")]
    address: u8,

    /// Continue even if the chip ID is not recognised.
    #[arg(long)]
    force: bool,

    /// Reboot the device.
    #[arg(short = 'r', long)]
    reboot: bool,

    /// Set the sense resistor, in milliohms (0.1 to 25.5).
    #[arg(short = 's', long, value_name = "MOHM")]
    sense_resistor: Option<f32>,

    /// Set cell voltage limits in volts: OV trip, OV release, UV trip, UV release.
    #[arg(short = 'l', long, value_name = "V", value_delimiter = ',')]
    voltage_limits: Option<Vec<f32>>,
}

fn parse_hex(s: &str) -> Result<u8, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(stripped) => u8::from_str_radix(stripped, 16),
        None => s.parse(),
    }
}

impl Cli {
    fn level(&self) -> LevelFilter {
        match self.debug {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn wants_device(&self) -> bool {
        self.current || self.flags || self.voltages || self.reboot
    }

    fn voltage_limits(&self) -> Option<VoltageLimits> {
        self.voltage_limits.as_deref().map(|v| VoltageLimits {
            ov_trip: v[0] * 1000.0,
            ov_release: v[1] * 1000.0,
            uv_trip: v[2] * 1000.0,
            uv_release: v[3] * 1000.0,
        })
    }
}

fn main() -> AnyResult<()> {
    let cli = Cli::parse();
    env_logger::Builder::new().filter_level(cli.level()).init();

    // Validate before touching the bus so a bad value never causes a write.
    let sense = match cli.sense_resistor {
        Some(mohm) => Some(SenseResistor::from_milliohms(mohm).with_context(|| {
            format!(
                "sense resistor {} mOhm outside {}..={} mOhm",
                mohm,
                SenseResistor::MIN_MOHM,
                SenseResistor::MAX_MOHM
            )
        })?),
        None => None,
    };

    if cli.voltage_limits.as_ref().is_some_and(|v| v.len() != 4) {
        bail!("voltage limits take four values: OV trip, OV release, UV trip, UV release");
    }

    let choice = SubstrateChoice::select::<linux_embedded_hal::I2CError>(cli.bus.as_deref(), cli.file.as_deref())?;
    match choice {
        SubstrateChoice::Device(path) => {
            let i2c = I2cdev::new(path).with_context(|| format!("transport unavailable: {}", path))?;
            let mut dev = Oz890::with_config(i2c, cli.address, Config::default());
            dev.check_chip(cli.force)?;
            println!("OZ890 rev C detected.");

            run_device(&cli, &mut dev)?;
            run_eeprom(&cli, Substrate::Device(&mut dev), sense)?;

            if cli.reboot {
                dev.reboot()?;
                println!("Rebooted.");
            }
        }
        SubstrateChoice::File(path) => {
            if cli.wants_device() {
                bail!("current, flags, voltages and reboot need a device, not an image file");
            }
            let image = FileImage::open(path).with_context(|| format!("cannot open {}", path.display()))?;
            run_eeprom(&cli, Substrate::File(image), sense)?;
        }
    }

    Ok(())
}

fn run_device(cli: &Cli, dev: &mut Device) -> AnyResult<()> {
    if cli.flags {
        let status = dev.read_status()?;
        if status.software_mode {
            println!("Software mode.");
        } else {
            println!(
                "Hardware mode. Bleeding is {}.",
                if status.bleeding_enabled { "enabled" } else { "disabled" }
            );
        }
        for condition in status.conditions() {
            match condition {
                Condition::FetsDisabled => {
                    println!("{} Reason flags {:#04x}.", condition.description(), status.fet_disable)
                }
                _ => println!("{}", condition.description()),
            }
        }
        if !status.has(Condition::Charging) {
            log::debug!("battery is not charging");
        }
        if !status.has(Condition::Discharging) {
            log::debug!("battery is not discharging");
        }
        if status.shutdown.contains(ShutdownBits::UNBALANCED_PF) {
            println!("Clearing unbalanced flag...");
            dev.clear_shutdown_flags(ShutdownBits::UNBALANCED_PF)?;
        }
    }

    if cli.voltages {
        for (cell, mv) in dev.read_cell_voltages()?.iter().enumerate() {
            println!("Cell {}: {:.2}mV", cell, mv);
        }
    }

    if cli.current {
        let raw = dev.read_current_raw()?;
        let sense = dev.read_sense_resistor()?;
        println!("Current: {:.3}A (raw {}, sense {:.1}mOhm)", sense.current_amps(raw), raw, sense.milliohms());
    }

    Ok(())
}

fn run_eeprom(cli: &Cli, mut substrate: Substrate<'_, I2cdev>, sense: Option<SenseResistor>) -> AnyResult<()> {
    if let Some(path) = &cli.write_from {
        let image = FileImage::open(path)
            .with_context(|| format!("cannot open {}", path.display()))?
            .read_image::<linux_embedded_hal::I2CError>()?;
        substrate.rewrite(&image)?;
        println!("EEPROM written from {}.", path.display());
    }

    let needs_image = cli.eeprom || cli.read_to.is_some() || sense.is_some() || cli.voltage_limits.is_some();
    if !needs_image {
        return Ok(());
    }
    let mut image = substrate.read_image()?;

    if let Some(path) = &cli.read_to {
        let mut out = FileImage::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        out.save_image::<linux_embedded_hal::I2CError>(&image)?;
        println!("EEPROM saved to {}.", path.display());
    }

    if cli.eeprom {
        print_config(&EepromConfig::decode(&image));
    }

    let original = image.clone();
    if let Some(sense) = sense {
        image.set_sense_resistor(sense);
    }
    if let Some(limits) = cli.voltage_limits() {
        image.set_voltage_limits(&limits);
    }
    if image != original {
        substrate.write_image(&image)?;
        println!("EEPROM updated.");
    }

    Ok(())
}

fn print_config(config: &EepromConfig) {
    println!("Factory: {}", config.factory_name_str());
    println!("Project: {} v{}", config.project_name_str(), config.version);
    println!("Cells: {}", config.cell_count);
    println!("Mode: {}", if config.software_mode { "software" } else { "hardware" });
    println!(
        "Bleeding: {}, idle bleeding: {}, start at {:.0}mV",
        config.bleeding_enabled, config.idle_bleeding, config.bleed_start_mv
    );
    println!("Sense resistor: {:.1}mOhm", config.sense_resistor.milliohms());
    println!("Current scale: {}", config.current_scale);
    println!(
        "Discharge limit: {:.1}A (max {:.1}A, offset {})",
        config.discharge_limit.amps, config.discharge_limit.max_amps, config.discharge_limit.offset
    );
    println!(
        "Charge limit: {:.1}A (max {:.1}A, offset {})",
        config.charge_limit.amps, config.charge_limit.max_amps, config.charge_limit.offset
    );
    let v = &config.voltage_limits;
    println!("Overvoltage: {:.0}mV, release {:.0}mV", v.ov_trip, v.ov_release);
    println!("Undervoltage: {:.0}mV, release {:.0}mV", v.uv_trip, v.uv_release);
}
