// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::Level;

// SPEC: http://ist.uwaterloo.ca/~schepers/formats/CRT.TXT
//
// The media parser lives with the external collaborators; this type models
// the banking hardware of a cartridge whose chips have already been
// extracted. Every family differs only in how IO1/IO2 accesses steer the
// ROML/ROMH banks and the GAME/EXROM lines.

pub enum ChipType {
    Rom,
    Ram,
    FlashRom,
}

impl ChipType {
    pub fn from(chip_type: u16) -> ChipType {
        match chip_type {
            0x00 => ChipType::Rom,
            0x01 => ChipType::Ram,
            0x02 => ChipType::FlashRom,
            _ => panic!("invalid chip type {}", chip_type),
        }
    }
}

pub struct Chip {
    pub chip_type: ChipType,
    pub bank_number: u8,
    pub offset: u16,
    pub size: u16,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, PartialEq)]
pub enum HwType {
    Normal,
    EasyFlash,
    Final3,
    GameSystem,
    GeoRam,
    MagicDesk,
    SimonsBasic,
    OceanType1,
}

impl HwType {
    pub fn from(value: u8) -> HwType {
        match value {
            0 => HwType::Normal,
            3 => HwType::Final3,
            4 => HwType::SimonsBasic,
            5 => HwType::OceanType1,
            15 => HwType::GameSystem,
            19 => HwType::MagicDesk,
            32 => HwType::EasyFlash,
            60 => HwType::GeoRam,
            _ => panic!("invalid hardware type {}", value),
        }
    }

    pub fn is_mirrored(self) -> bool {
        match self {
            HwType::OceanType1 | HwType::MagicDesk | HwType::Normal => true,
            _ => false,
        }
    }
}

pub struct IoConfig {
    pub exrom: bool,
    pub game: bool,
}

impl IoConfig {
    pub fn new() -> Self {
        IoConfig {
            exrom: true,
            game: true,
        }
    }
}

pub struct Cartridge {
    version: u16,
    hw_type: HwType,
    exrom: bool,
    game: bool,
    banks: Vec<Option<Chip>>,
    io_observer: Option<Box<dyn Fn(&IoConfig)>>,
    is_mirrored: bool,
    // GeoRAM pages
    georam: Vec<u8>,
    georam_page: usize,
    // Runtime state
    bank_lo: Option<usize>,
    bank_hi: Option<usize>,
    io_config: IoConfig,
    reg_value: u8,
}

impl Cartridge {
    pub fn new(version: u16, hw_type: HwType, exrom: bool, game: bool) -> Self {
        let mut banks = Vec::with_capacity(64);
        for _ in 0..64 {
            banks.push(None);
        }
        let georam = if hw_type == HwType::GeoRam {
            vec![0; 512 * 1024]
        } else {
            Vec::new()
        };
        Cartridge {
            version,
            hw_type,
            exrom,
            game,
            banks,
            io_observer: None,
            is_mirrored: hw_type.is_mirrored(),
            georam,
            georam_page: 0,
            bank_lo: None,
            bank_hi: None,
            io_config: IoConfig::new(),
            reg_value: 0,
        }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn set_io_observer(&mut self, observer: Option<Box<dyn Fn(&IoConfig)>>) {
        self.io_observer = observer;
    }

    pub fn add(&mut self, chip: Chip) {
        let bank_num = chip.bank_number as usize;
        self.banks[bank_num] = Some(chip);
    }

    pub fn reset(&mut self) {
        self.bank_lo = None;
        self.bank_hi = None;
        self.io_config = IoConfig {
            exrom: self.exrom,
            game: self.game,
        };
        self.georam_page = 0;
        if self.banks.iter().any(|bank| bank.is_some()) {
            self.switch_bank(0);
        }
        self.notify_io_changed();
    }

    fn notify_io_changed(&self) {
        if let Some(ref observer) = self.io_observer {
            observer(&self.io_config);
        }
    }

    fn switch_bank(&mut self, bank_number: u8) {
        if log_enabled!(Level::Trace) {
            trace!(
                target: "cart::banks",
                "Switching to bank {} game {} exrom {}",
                bank_number, self.io_config.game, self.io_config.exrom
            );
        }
        if let Some(ref bank) = self.banks[bank_number as usize] {
            match bank.offset {
                0x8000 => {
                    self.bank_lo = Some(bank.bank_number as usize);
                    if self.is_mirrored {
                        self.bank_hi = self.bank_lo;
                    } else {
                        self.bank_hi = None;
                    }
                }
                0xa000 | 0xe000 => {
                    self.bank_hi = Some(bank.bank_number as usize);
                    if self.is_mirrored {
                        self.bank_lo = self.bank_hi;
                    } else {
                        self.bank_lo = None;
                    }
                }
                _ => panic!("invalid load address {:04x}", bank.offset),
            }
        } else {
            panic!("invalid bank number {}", bank_number);
        }
    }

    // -- Device I/O

    fn read_io(&mut self, address: u16) -> Option<u8> {
        match self.hw_type {
            HwType::GameSystem => {
                if let 0xde00..=0xdeff = address {
                    self.switch_bank((address & 0x3f) as u8);
                }
                Some(self.reg_value)
            }
            HwType::GeoRam => match address {
                0xde00..=0xdeff => {
                    let offset = self.georam_page * 256 + usize::from(address & 0xff);
                    Some(self.georam[offset])
                }
                _ => None,
            },
            _ => Some(self.reg_value),
        }
    }

    fn write_io(&mut self, address: u16, value: u8) {
        self.reg_value = value;
        match self.hw_type {
            HwType::EasyFlash => {
                if address == 0xde00 {
                    self.switch_bank(value & 0x3f);
                }
            }
            HwType::Final3 => {
                if address == 0xde00 {
                    self.switch_bank(value.wrapping_sub(0x40));
                }
            }
            HwType::GeoRam => match address {
                0xde00..=0xdeff => {
                    let offset = self.georam_page * 256 + usize::from(address & 0xff);
                    self.georam[offset] = value;
                }
                0xdffe => {
                    self.georam_page =
                        (self.georam_page & !0x3f) | usize::from(value & 0x3f);
                }
                0xdfff => {
                    self.georam_page =
                        (self.georam_page & 0x3f) | (usize::from(value & 0x1f) << 6);
                }
                _ => {}
            },
            HwType::MagicDesk => {
                if address == 0xde00 {
                    if !value.get_bit(7) {
                        self.switch_bank(value & 0x3f);
                        self.io_config.exrom = self.exrom;
                        self.io_config.game = self.game;
                    } else {
                        self.io_config.exrom = true;
                        self.io_config.game = true;
                    }
                    self.notify_io_changed();
                }
            }
            HwType::Normal => {
                if address == 0xde00 {
                    self.switch_bank(value & 0x3f);
                }
            }
            HwType::OceanType1 => {
                if address == 0xde00 && value.get_bit(7) {
                    self.switch_bank(value & 0x3f);
                }
            }
            HwType::SimonsBasic => {
                if address == 0xde00 {
                    self.io_config.game = value == 0x01;
                    self.notify_io_changed();
                }
            }
            _ => {}
        }
    }

    pub fn read(&mut self, address: u16) -> Option<u8> {
        match address {
            0x8000..=0x9fff => self.bank_lo.and_then(|bank_num| {
                self.banks[bank_num]
                    .as_ref()
                    .map(|bank| bank.data[usize::from(address - 0x8000) % bank.data.len()])
            }),
            0xa000..=0xbfff | 0xe000..=0xffff => self.bank_hi.and_then(|bank_num| {
                self.banks[bank_num]
                    .as_ref()
                    .map(|bank| bank.data[usize::from(address & 0x1fff) % bank.data.len()])
            }),
            0xde00..=0xdfff => self.read_io(address),
            _ => None,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        if let 0xde00..=0xdfff = address {
            self.write_io(address, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_chip(bank: u8, offset: u16, fill: u8) -> Chip {
        Chip {
            chip_type: ChipType::Rom,
            bank_number: bank,
            offset,
            size: 0x2000,
            data: vec![fill; 0x2000],
        }
    }

    #[test]
    fn normal_cartridge_maps_roml() {
        let mut cart = Cartridge::new(0x100, HwType::Normal, false, false);
        cart.add(rom_chip(0, 0x8000, 0xaa));
        cart.reset();
        assert_eq!(Some(0xaa), cart.read(0x8000));
    }

    #[test]
    fn bank_switch_on_io_write() {
        let mut cart = Cartridge::new(0x100, HwType::Normal, false, false);
        cart.add(rom_chip(0, 0x8000, 0xaa));
        cart.add(rom_chip(1, 0x8000, 0xbb));
        cart.reset();
        cart.write(0xde00, 0x01);
        assert_eq!(Some(0xbb), cart.read(0x8000));
    }

    #[test]
    fn georam_pages() {
        let mut cart = Cartridge::new(0x100, HwType::GeoRam, true, true);
        cart.reset();
        cart.write(0xde00, 0x42);
        cart.write(0xdffe, 0x01); // switch page
        cart.write(0xde00, 0x43);
        cart.write(0xdffe, 0x00);
        assert_eq!(Some(0x42), cart.read(0xde00));
    }
}
