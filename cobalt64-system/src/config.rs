// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use cobalt64_core::factory::{
    CiaModel, DriveModel, GlueLogic, PowerGrid, SidModel, SystemModel, VicModel,
};
use cobalt64_core::device::joystick;
use cobalt64_core::device::mouse;
use cobalt64_core::sound::SamplingMethod;
use cobalt64_core::Error;

#[derive(Clone)]
pub struct Config {
    pub model: SystemModel,
    pub glue_logic: GlueLogic,
    pub joystick: JoystickConfig,
    pub mouse: Option<mouse::Model>,
    /// Paddle pair on control port 2.
    pub paddles: bool,
    pub sound: SoundConfig,
    pub roms: RomData,
    pub drive: DriveConfig,
    /// Extra SID chips mapped at 32-byte aligned offsets inside $D400-$D7FF.
    pub extra_sid_addresses: Vec<u16>,
}

impl Config {
    pub fn new(model: SystemModel) -> Config {
        Config {
            model,
            glue_logic: GlueLogic::Discrete,
            joystick: JoystickConfig::default(),
            mouse: None,
            paddles: false,
            sound: SoundConfig::default(),
            roms: RomData::default(),
            drive: DriveConfig::default(),
            extra_sid_addresses: Vec::new(),
        }
    }

    pub fn new_with_roms(
        model: SystemModel,
        basic: &[u8],
        charset: &[u8],
        kernal: &[u8],
    ) -> Config {
        let mut config = Config::new(model);
        config.roms = RomData::new(basic, charset, kernal);
        config
    }

    /// Apply a configuration option. Options that reconfigure chip
    /// construction are only valid while the machine is powered off; the
    /// caller enforces that and reports violations as configuration
    /// errors.
    pub fn apply(&mut self, option: ConfigOption) -> Result<(), Error> {
        match option {
            ConfigOption::PowerGrid(grid) => {
                self.model.power_grid = grid;
            }
            ConfigOption::CiaRevision(model) => {
                self.model.cia_model = model;
            }
            ConfigOption::VicRevision(model) => {
                if model.is_pal() != self.model.vic_model.is_pal() {
                    return Err(Error::Config(
                        "vic revision must match the system video standard".to_string(),
                    ));
                }
                self.model.vic_model = model;
            }
            ConfigOption::GlueLogic(glue) => {
                self.glue_logic = glue;
            }
            ConfigOption::SidRevision(model) => {
                self.model.sid_model = model;
            }
            ConfigOption::SidSampling(method) => {
                self.sound.sampling_method = method;
            }
            ConfigOption::SidFilters(enabled) => {
                self.sound.sid_filters = enabled;
            }
            ConfigOption::ExtraSidAddress(slot, address) => {
                if slot == 0 || slot > 3 {
                    return Err(Error::Config(format!("invalid sid slot {}", slot)));
                }
                match address {
                    Some(addr) => {
                        if addr < 0xd400 || addr > 0xd7e0 || addr & 0x1f != 0 {
                            return Err(Error::Config(format!(
                                "invalid sid address 0x{:04x}",
                                addr
                            )));
                        }
                        self.extra_sid_addresses.push(addr);
                    }
                    None => {
                        self.extra_sid_addresses.clear();
                    }
                }
            }
            ConfigOption::DriveConnect(drive, connected) => {
                let index = drive_index(drive)?;
                self.drive.connected[index] = connected;
            }
            ConfigOption::DriveType(drive, model) => {
                let index = drive_index(drive)?;
                self.drive.models[index] = model;
            }
            ConfigOption::JoystickMode(port, mode) => match port {
                1 => self.joystick.joystick_1 = mode,
                2 => self.joystick.joystick_2 = mode,
                _ => return Err(Error::Config(format!("invalid port {}", port))),
            },
            ConfigOption::MouseModel(model) => {
                self.mouse = model;
            }
            ConfigOption::Paddles(enabled) => {
                self.paddles = enabled;
            }
            ConfigOption::AutofirePeriod(cycles) => {
                if cycles == 0 {
                    return Err(Error::Config("autofire period must be non-zero".to_string()));
                }
                self.joystick.autofire_period = cycles;
            }
        }
        Ok(())
    }
}

fn drive_index(drive: u8) -> Result<usize, Error> {
    match drive {
        8 | 9 => Ok(usize::from(drive - 8)),
        _ => Err(Error::Config(format!("invalid drive {}", drive))),
    }
}

/// Runtime-settable options, each mapping to a single component effect.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigOption {
    PowerGrid(PowerGrid),
    CiaRevision(CiaModel),
    VicRevision(VicModel),
    GlueLogic(GlueLogic),
    SidRevision(SidModel),
    SidSampling(SamplingMethod),
    SidFilters(bool),
    ExtraSidAddress(u8, Option<u16>),
    DriveConnect(u8, bool),
    DriveType(u8, DriveModel),
    JoystickMode(u8, joystick::Mode),
    MouseModel(Option<mouse::Model>),
    Paddles(bool),
    AutofirePeriod(u32),
}

impl ConfigOption {
    /// True when the option can be applied to a powered-on machine.
    pub fn is_hot(&self) -> bool {
        match self {
            ConfigOption::PowerGrid(_)
            | ConfigOption::DriveConnect(_, _)
            | ConfigOption::JoystickMode(_, _)
            | ConfigOption::MouseModel(_)
            | ConfigOption::Paddles(_)
            | ConfigOption::AutofirePeriod(_) => true,
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct JoystickConfig {
    pub axis_motion_threshold: i16,
    pub joystick_1: joystick::Mode,
    pub joystick_2: joystick::Mode,
    pub autofire_period: u32,
}

impl Default for JoystickConfig {
    fn default() -> JoystickConfig {
        JoystickConfig {
            axis_motion_threshold: 3200,
            joystick_1: joystick::Mode::Numpad,
            joystick_2: joystick::Mode::None,
            autofire_period: 25_000,
        }
    }
}

#[derive(Clone)]
pub struct DriveConfig {
    pub connected: [bool; 2],
    pub models: [DriveModel; 2],
}

impl Default for DriveConfig {
    fn default() -> DriveConfig {
        DriveConfig {
            connected: [false; 2],
            models: [DriveModel::Vc1541II; 2],
        }
    }
}

#[derive(Clone)]
pub struct RomData {
    pub basic: Vec<u8>,
    pub charset: Vec<u8>,
    pub kernal: Vec<u8>,
    pub drive: Vec<u8>,
}

impl Default for RomData {
    fn default() -> Self {
        RomData {
            basic: vec![0x00; 0x2000],
            charset: vec![0x00; 0x1000],
            kernal: vec![0x00; 0x2000],
            drive: vec![0x00; 0x4000],
        }
    }
}

impl RomData {
    pub fn new(basic: &[u8], charset: &[u8], kernal: &[u8]) -> Self {
        RomData {
            basic: basic.to_vec(),
            charset: charset.to_vec(),
            kernal: kernal.to_vec(),
            drive: vec![0x00; 0x4000],
        }
    }
}

#[derive(Clone)]
pub struct SoundConfig {
    pub enable: bool,
    pub buffer_size: usize,
    pub sample_rate: u32,
    pub sampling_method: SamplingMethod,
    pub sid_filters: bool,
}

impl Default for SoundConfig {
    fn default() -> SoundConfig {
        SoundConfig {
            enable: true,
            buffer_size: 4096,
            sample_rate: 44100,
            sampling_method: SamplingMethod::Fast,
            sid_filters: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_option_is_rejected_without_effect() {
        let mut config = Config::new(SystemModel::c64_pal());
        let result = config.apply(ConfigOption::VicRevision(VicModel::Ntsc6567));
        assert!(result.is_err());
        assert_eq!(VicModel::Pal6569R3, config.model.vic_model);
    }

    #[test]
    fn extra_sid_address_must_be_aligned() {
        let mut config = Config::new(SystemModel::c64_pal());
        assert!(config
            .apply(ConfigOption::ExtraSidAddress(1, Some(0xd421)))
            .is_err());
        assert!(config
            .apply(ConfigOption::ExtraSidAddress(1, Some(0xd420)))
            .is_ok());
    }
}
