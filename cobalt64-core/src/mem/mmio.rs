// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::cell::Cell;

use crate::factory::{AddressableFaded, Chip};
use crate::util::{Ram, Shared};

/*
The I/O window at $D000-$DFFF decodes into:
  $D000-$D3FF VIC (mirrored every 64 bytes)
  $D400-$D7FF SID (primary at $D400, extra chips mappable at 32-byte steps)
  $D800-$DBFF color RAM (4 bit wide)
  $DC00-$DCFF CIA 1
  $DD00-$DDFF CIA 2
  $DE00-$DFFF cartridge I/O 1/2
Reads from unmapped slots return the value left on the data bus.
*/

pub struct Mmio {
    cia_1: Shared<dyn Chip>,
    cia_2: Shared<dyn Chip>,
    color_ram: Shared<Ram>,
    expansion_port: Shared<dyn AddressableFaded>,
    sid: Shared<dyn Chip>,
    extra_sids: Vec<(u16, Shared<dyn Chip>)>,
    vic: Shared<dyn Chip>,
    bus_value: Cell<u8>,
}

impl Mmio {
    pub fn new(
        cia_1: Shared<dyn Chip>,
        cia_2: Shared<dyn Chip>,
        color_ram: Shared<Ram>,
        expansion_port: Shared<dyn AddressableFaded>,
        sid: Shared<dyn Chip>,
        extra_sids: Vec<(u16, Shared<dyn Chip>)>,
        vic: Shared<dyn Chip>,
    ) -> Self {
        Self {
            cia_1,
            cia_2,
            color_ram,
            expansion_port,
            sid,
            extra_sids,
            vic,
            bus_value: Cell::new(0),
        }
    }

    fn sid_at(&self, address: u16) -> &Shared<dyn Chip> {
        let base = address & 0xffe0;
        for (sid_base, sid) in self.extra_sids.iter() {
            if *sid_base == base {
                return sid;
            }
        }
        &self.sid
    }

    pub fn read(&self, address: u16) -> u8 {
        let value = match address {
            0xd000..=0xd3ff => self.vic.borrow_mut().read((address & 0x003f) as u8),
            0xd400..=0xd7ff => self
                .sid_at(address)
                .borrow_mut()
                .read((address & 0x001f) as u8),
            0xd800..=0xdbff => {
                // only the low nibble is driven, the rest floats
                let nibble = self.color_ram.borrow().read(address - 0xd800) & 0x0f;
                (self.bus_value.get() & 0xf0) | nibble
            }
            0xdc00..=0xdcff => self.cia_1.borrow_mut().read((address & 0x000f) as u8),
            0xdd00..=0xddff => self.cia_2.borrow_mut().read((address & 0x000f) as u8),
            0xde00..=0xdfff => self
                .expansion_port
                .borrow_mut()
                .read(address)
                .unwrap_or_else(|| self.bus_value.get()),
            _ => panic!("invalid address 0x{:x}", address),
        };
        self.bus_value.set(value);
        value
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.bus_value.set(value);
        match address {
            0xd000..=0xd3ff => self.vic.borrow_mut().write((address & 0x003f) as u8, value),
            0xd400..=0xd7ff => self
                .sid_at(address)
                .borrow_mut()
                .write((address & 0x001f) as u8, value),
            0xd800..=0xdbff => self
                .color_ram
                .borrow_mut()
                .write(address - 0xd800, value & 0x0f),
            0xdc00..=0xdcff => self
                .cia_1
                .borrow_mut()
                .write((address & 0x000f) as u8, value),
            0xdd00..=0xddff => self
                .cia_2
                .borrow_mut()
                .write((address & 0x000f) as u8, value),
            0xde00..=0xdfff => self.expansion_port.borrow_mut().write(address, value),
            _ => panic!("invalid address 0x{:x}", address),
        }
    }

    /// Last value observed on the data bus, used for open-bus reads.
    pub fn bus_value(&self) -> u8 {
        self.bus_value.get()
    }
}
