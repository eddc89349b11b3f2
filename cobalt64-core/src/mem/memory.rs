// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use crate::factory::{Addressable, AddressableFaded, Bank, Mmu};
use crate::util::{Ram, Rom, Shared};

use super::Mmio;

// Spec: COMMODORE 64 MEMORY MAPS p. 263
// Design:
//   The Addressable trait represents a bank of memory; the MMU maps each
//   access to the bank selected by the current PLA configuration. Writes to
//   ROM areas fall through to the RAM underneath; reads from the Ultimax
//   holes return the floating bus value.

pub struct Memory {
    // Dependencies
    mmu: Shared<dyn Mmu>,
    // Addressable
    basic: Shared<Rom>,
    charset: Shared<Rom>,
    expansion_port: Shared<dyn AddressableFaded>,
    io: Mmio,
    kernal: Shared<Rom>,
    ram: Shared<Ram>,
}

#[allow(dead_code)]
#[derive(Copy, Clone)]
enum BaseAddr {
    Basic = 0xa000,
    Charset = 0xd000,
    Kernal = 0xe000,
}

impl BaseAddr {
    pub fn addr(self) -> u16 {
        self as u16
    }
}

impl Memory {
    pub fn new(
        mmu: Shared<dyn Mmu>,
        expansion_port: Shared<dyn AddressableFaded>,
        io: Mmio,
        ram: Shared<Ram>,
        rom_basic: Shared<Rom>,
        rom_charset: Shared<Rom>,
        rom_kernal: Shared<Rom>,
    ) -> Self {
        Memory {
            mmu,
            basic: rom_basic,
            charset: rom_charset,
            expansion_port,
            io,
            kernal: rom_kernal,
            ram,
        }
    }
}

impl Addressable for Memory {
    fn read(&self, address: u16) -> u8 {
        match self.mmu.borrow().map(address) {
            Bank::Ram => self.ram.borrow().read(address),
            Bank::Basic => self.basic.borrow().read(address),
            Bank::Charset => self
                .charset
                .borrow()
                .read(address - BaseAddr::Charset.addr()),
            Bank::Kernal => self.kernal.borrow().read(address),
            Bank::RomL | Bank::RomH => self
                .expansion_port
                .borrow_mut()
                .read(address)
                .unwrap_or_else(|| self.io.bus_value()),
            Bank::Io => self.io.read(address),
            Bank::Disabled => self.io.bus_value(),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match self.mmu.borrow().map(address) {
            Bank::Ram | Bank::Basic | Bank::Charset | Bank::Kernal => {
                self.ram.borrow_mut().write(address, value)
            }
            Bank::RomL | Bank::RomH => {
                self.expansion_port.borrow_mut().write(address, value);
                self.ram.borrow_mut().write(address, value)
            }
            Bank::Io => self.io.write(address, value),
            Bank::Disabled => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Chip;
    use crate::mem::Pla;
    use crate::util::{new_shared, StateReader, StateWriter};
    use crate::Error;

    struct NullChip;

    impl Chip for NullChip {
        fn clock(&mut self) {}
        fn clock_delta(&mut self, _delta: u32) {}
        fn process_vsync(&mut self) {}
        fn reset(&mut self) {}
        fn read(&mut self, _reg: u8) -> u8 {
            0x22
        }
        fn write(&mut self, _reg: u8, _value: u8) {}
        fn save_state(&self, _writer: &mut StateWriter) {}
        fn restore_state(&mut self, _reader: &mut StateReader) -> Result<(), Error> {
            Ok(())
        }
    }

    struct NullExpansion;

    impl AddressableFaded for NullExpansion {
        fn read(&mut self, _address: u16) -> Option<u8> {
            None
        }
        fn write(&mut self, _address: u16, _value: u8) {}
    }

    fn setup_memory() -> (Memory, Shared<Pla>) {
        let basic = new_shared(Rom::new(0x2000, BaseAddr::Basic.addr(), 0x10));
        let charset = new_shared(Rom::new(0x1000, 0x0000, 0x11));
        let kernal = new_shared(Rom::new(0x2000, BaseAddr::Kernal.addr(), 0x12));
        let expansion_port = new_shared(NullExpansion {});
        let ram = new_shared(Ram::new(0x10000));
        ram.borrow_mut().fill(0x44);
        let color_ram = new_shared(Ram::new(1024));
        let chip: Shared<dyn Chip> = new_shared(NullChip {});
        let io = Mmio::new(
            chip.clone(),
            chip.clone(),
            color_ram,
            expansion_port.clone(),
            chip.clone(),
            Vec::new(),
            chip.clone(),
        );
        let mmu = new_shared(Pla::new());
        let mem = Memory::new(
            mmu.clone(),
            expansion_port,
            io,
            ram,
            basic,
            charset,
            kernal,
        );
        (mem, mmu)
    }

    #[test]
    fn read_basic() {
        let (mem, mmu) = setup_memory();
        mmu.borrow_mut().switch_banks(31);
        assert_eq!(0x10, mem.read(BaseAddr::Basic.addr()));
    }

    #[test]
    fn read_charset() {
        let (mem, mmu) = setup_memory();
        mmu.borrow_mut().switch_banks(27);
        assert_eq!(0x11, mem.read(BaseAddr::Charset.addr()));
    }

    #[test]
    fn read_io() {
        let (mem, mmu) = setup_memory();
        mmu.borrow_mut().switch_banks(31);
        assert_eq!(0x22, mem.read(0xd000));
    }

    #[test]
    fn read_kernal() {
        let (mem, mmu) = setup_memory();
        mmu.borrow_mut().switch_banks(31);
        assert_eq!(0x12, mem.read(BaseAddr::Kernal.addr()));
    }

    #[test]
    fn rom_write_falls_through_to_ram() {
        let (mut mem, mmu) = setup_memory();
        mmu.borrow_mut().switch_banks(31);
        mem.write(BaseAddr::Kernal.addr(), 0x55);
        assert_eq!(0x12, mem.read(BaseAddr::Kernal.addr()));
        mmu.borrow_mut().switch_banks(0);
        assert_eq!(0x55, mem.read(BaseAddr::Kernal.addr()));
    }

    #[test]
    fn open_bus_returns_last_value() {
        let (mem, mmu) = setup_memory();
        mmu.borrow_mut().switch_banks(31);
        assert_eq!(0x22, mem.read(0xd000));
        // IO1 is unmapped without a cartridge, the bus floats
        assert_eq!(0x22, mem.read(0xde00));
    }
}
