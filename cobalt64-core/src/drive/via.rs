// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::{StateReader, StateWriter};
use crate::Error;

// Spec: MOS 6522 VERSATILE INTERFACE ADAPTER Datasheet
//
// Registers:
//   $0 ORB   $1 ORA   $2 DDRB  $3 DDRA
//   $4 T1C-L $5 T1C-H $6 T1L-L $7 T1L-H
//   $8 T2C-L $9 T2C-H $A SR    $B ACR
//   $C PCR   $D IFR   $E IER   $F ORA (no handshake)

pub mod ifr {
    pub const CA2: usize = 0;
    pub const CA1: usize = 1;
    pub const SR: usize = 2;
    pub const CB2: usize = 3;
    pub const CB1: usize = 4;
    pub const TIMER_2: usize = 5;
    pub const TIMER_1: usize = 6;
}

pub struct Via6522 {
    // Ports
    port_a: u8,
    port_b: u8,
    ddr_a: u8,
    ddr_b: u8,
    input_a: u8,
    input_b: u8,
    // Timers
    t1_counter: u16,
    t1_latch: u16,
    t1_running: bool,
    t2_counter: u16,
    t2_latch_lo: u8,
    t2_running: bool,
    // Control
    sr: u8,
    acr: u8,
    pcr: u8,
    ifr: u8,
    ier: u8,
    // Edge detection
    ca1: bool,
    cb1: bool,
    pb7_toggle: bool,
}

impl Via6522 {
    pub fn new() -> Self {
        Self {
            port_a: 0,
            port_b: 0,
            ddr_a: 0,
            ddr_b: 0,
            input_a: 0xff,
            input_b: 0xff,
            t1_counter: 0xffff,
            t1_latch: 0xffff,
            t1_running: false,
            t2_counter: 0xffff,
            t2_latch_lo: 0xff,
            t2_running: false,
            sr: 0,
            acr: 0,
            pcr: 0,
            ifr: 0,
            ier: 0,
            ca1: true,
            cb1: true,
            pb7_toggle: false,
        }
    }

    pub fn reset(&mut self) {
        self.port_a = 0;
        self.port_b = 0;
        self.ddr_a = 0;
        self.ddr_b = 0;
        self.input_a = 0xff;
        self.input_b = 0xff;
        self.t1_counter = 0xffff;
        self.t1_latch = 0xffff;
        self.t1_running = false;
        self.t2_counter = 0xffff;
        self.t2_latch_lo = 0xff;
        self.t2_running = false;
        self.sr = 0;
        self.acr = 0;
        self.pcr = 0;
        self.ifr = 0;
        self.ier = 0;
        self.pb7_toggle = false;
    }

    /// Effective port outputs: driven bits from the output register, input
    /// lines elsewhere.
    pub fn port_a_output(&self) -> u8 {
        (self.port_a & self.ddr_a) | (self.input_a & !self.ddr_a)
    }

    pub fn port_b_output(&self) -> u8 {
        let mut value = (self.port_b & self.ddr_b) | (self.input_b & !self.ddr_b);
        if self.acr.get_bit(7) {
            value.set_bit(7, self.pb7_toggle);
        }
        value
    }

    /// Only the pins configured as outputs; floating inputs read as 0.
    pub fn port_a_driven(&self) -> u8 {
        self.port_a & self.ddr_a
    }

    pub fn port_b_driven(&self) -> u8 {
        self.port_b & self.ddr_b
    }

    pub fn set_input_a(&mut self, value: u8) {
        self.input_a = value;
    }

    pub fn set_input_b(&mut self, value: u8) {
        self.input_b = value;
    }

    pub fn set_input_b_bit(&mut self, bit: usize, value: bool) {
        self.input_b.set_bit(bit, value);
    }

    /// CA2 output level per PCR; the drive uses it as the byte-ready
    /// enable (SOE).
    pub fn ca2_output(&self) -> bool {
        match (self.pcr >> 1) & 0x07 {
            0b110 => false,
            _ => true,
        }
    }

    /// CB2 output level per PCR; the drive uses it as the read/write mode
    /// select (low = write).
    pub fn cb2_output(&self) -> bool {
        match (self.pcr >> 5) & 0x07 {
            0b110 => false,
            _ => true,
        }
    }

    pub fn set_ca1(&mut self, level: bool) {
        if level != self.ca1 {
            let positive = self.pcr.get_bit(0);
            if (positive && level) || (!positive && !level) {
                self.ifr.set_bit(ifr::CA1, true);
            }
            self.ca1 = level;
        }
    }

    pub fn set_cb1(&mut self, level: bool) {
        if level != self.cb1 {
            let positive = self.pcr.get_bit(4);
            if (positive && level) || (!positive && !level) {
                self.ifr.set_bit(ifr::CB1, true);
            }
            self.cb1 = level;
        }
    }

    pub fn irq_active(&self) -> bool {
        (self.ifr & self.ier & 0x7f) != 0
    }

    pub fn clock(&mut self) {
        // timer 1
        if self.t1_running {
            if self.t1_counter == 0 {
                self.ifr.set_bit(ifr::TIMER_1, true);
                if self.acr.get_bit(6) {
                    // free running, reload and toggle PB7
                    self.t1_counter = self.t1_latch;
                    self.pb7_toggle = !self.pb7_toggle;
                } else {
                    self.t1_running = false;
                }
            } else {
                self.t1_counter -= 1;
            }
        }
        // timer 2 in timed mode; pulse counting is driven externally
        if self.t2_running && !self.acr.get_bit(5) {
            if self.t2_counter == 0 {
                self.ifr.set_bit(ifr::TIMER_2, true);
                self.t2_running = false;
                self.t2_counter = 0xffff;
            } else {
                self.t2_counter -= 1;
            }
        }
    }

    pub fn read(&mut self, reg: u8) -> u8 {
        match reg & 0x0f {
            0x00 => {
                self.ifr.set_bit(ifr::CB1, false);
                self.ifr.set_bit(ifr::CB2, false);
                self.port_b_output()
            }
            0x01 => {
                self.ifr.set_bit(ifr::CA1, false);
                self.ifr.set_bit(ifr::CA2, false);
                self.port_a_output()
            }
            0x02 => self.ddr_b,
            0x03 => self.ddr_a,
            0x04 => {
                self.ifr.set_bit(ifr::TIMER_1, false);
                (self.t1_counter & 0xff) as u8
            }
            0x05 => (self.t1_counter >> 8) as u8,
            0x06 => (self.t1_latch & 0xff) as u8,
            0x07 => (self.t1_latch >> 8) as u8,
            0x08 => {
                self.ifr.set_bit(ifr::TIMER_2, false);
                (self.t2_counter & 0xff) as u8
            }
            0x09 => (self.t2_counter >> 8) as u8,
            0x0a => {
                self.ifr.set_bit(ifr::SR, false);
                self.sr
            }
            0x0b => self.acr,
            0x0c => self.pcr,
            0x0d => {
                let mut value = self.ifr & 0x7f;
                value.set_bit(7, self.irq_active());
                value
            }
            0x0e => self.ier | 0x80,
            _ => self.port_a_output(),
        }
    }

    pub fn write(&mut self, reg: u8, value: u8) {
        match reg & 0x0f {
            0x00 => {
                self.ifr.set_bit(ifr::CB1, false);
                self.ifr.set_bit(ifr::CB2, false);
                self.port_b = value;
            }
            0x01 => {
                self.ifr.set_bit(ifr::CA1, false);
                self.ifr.set_bit(ifr::CA2, false);
                self.port_a = value;
            }
            0x02 => self.ddr_b = value,
            0x03 => self.ddr_a = value,
            0x04 | 0x06 => {
                self.t1_latch = (self.t1_latch & 0xff00) | u16::from(value);
            }
            0x05 => {
                self.t1_latch = (u16::from(value) << 8) | (self.t1_latch & 0x00ff);
                self.t1_counter = self.t1_latch;
                self.t1_running = true;
                self.ifr.set_bit(ifr::TIMER_1, false);
                if self.acr.get_bit(7) {
                    self.pb7_toggle = false;
                }
            }
            0x07 => {
                self.t1_latch = (u16::from(value) << 8) | (self.t1_latch & 0x00ff);
                self.ifr.set_bit(ifr::TIMER_1, false);
            }
            0x08 => self.t2_latch_lo = value,
            0x09 => {
                self.t2_counter = (u16::from(value) << 8) | u16::from(self.t2_latch_lo);
                self.t2_running = true;
                self.ifr.set_bit(ifr::TIMER_2, false);
            }
            0x0a => {
                self.ifr.set_bit(ifr::SR, false);
                self.sr = value;
            }
            0x0b => self.acr = value,
            0x0c => self.pcr = value,
            0x0d => {
                // flags are cleared by writing 1
                self.ifr &= !(value & 0x7f);
            }
            0x0e => {
                if value.get_bit(7) {
                    self.ier |= value & 0x7f;
                } else {
                    self.ier &= !(value & 0x7f);
                }
            }
            _ => {
                self.port_a = value;
            }
        }
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u8(self.port_a);
        writer.write_u8(self.port_b);
        writer.write_u8(self.ddr_a);
        writer.write_u8(self.ddr_b);
        writer.write_u8(self.input_a);
        writer.write_u8(self.input_b);
        writer.write_u16(self.t1_counter);
        writer.write_u16(self.t1_latch);
        writer.write_bool(self.t1_running);
        writer.write_u16(self.t2_counter);
        writer.write_u8(self.t2_latch_lo);
        writer.write_bool(self.t2_running);
        writer.write_u8(self.sr);
        writer.write_u8(self.acr);
        writer.write_u8(self.pcr);
        writer.write_u8(self.ifr);
        writer.write_u8(self.ier);
        writer.write_bool(self.ca1);
        writer.write_bool(self.cb1);
        writer.write_bool(self.pb7_toggle);
    }

    pub fn restore_state(&mut self, reader: &mut StateReader) -> Result<(), Error> {
        self.port_a = reader.read_u8()?;
        self.port_b = reader.read_u8()?;
        self.ddr_a = reader.read_u8()?;
        self.ddr_b = reader.read_u8()?;
        self.input_a = reader.read_u8()?;
        self.input_b = reader.read_u8()?;
        self.t1_counter = reader.read_u16()?;
        self.t1_latch = reader.read_u16()?;
        self.t1_running = reader.read_bool()?;
        self.t2_counter = reader.read_u16()?;
        self.t2_latch_lo = reader.read_u8()?;
        self.t2_running = reader.read_bool()?;
        self.sr = reader.read_u8()?;
        self.acr = reader.read_u8()?;
        self.pcr = reader.read_u8()?;
        self.ifr = reader.read_u8()?;
        self.ier = reader.read_u8()?;
        self.ca1 = reader.read_bool()?;
        self.cb1 = reader.read_bool()?;
        self.pb7_toggle = reader.read_bool()?;
        Ok(())
    }
}

impl Default for Via6522 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer1_one_shot_fires_once() {
        let mut via = Via6522::new();
        via.write(0x0e, 0xc0); // enable T1 irq
        via.write(0x04, 0x03);
        via.write(0x05, 0x00); // start
        for _ in 0..3 {
            assert!(!via.irq_active());
            via.clock();
        }
        via.clock();
        assert!(via.irq_active());
        // reading T1C-L acknowledges
        let _ = via.read(0x04);
        assert!(!via.irq_active());
    }

    #[test]
    fn ca1_edge_sets_flag() {
        let mut via = Via6522::new();
        via.write(0x0e, 0x82); // enable CA1 irq
        via.set_ca1(false); // negative edge (default polarity)
        assert!(via.irq_active());
        let _ = via.read(0x01);
        assert!(!via.irq_active());
    }

    #[test]
    fn ier_set_clear_protocol() {
        let mut via = Via6522::new();
        via.write(0x0e, 0xc0);
        assert_eq!(0x40, via.ier);
        via.write(0x0e, 0x40);
        assert_eq!(0x00, via.ier);
    }

    #[test]
    fn port_b_mixes_inputs_and_outputs() {
        let mut via = Via6522::new();
        via.write(0x02, 0x0f); // low nibble outputs
        via.write(0x00, 0x05);
        via.set_input_b(0xa0);
        assert_eq!(0xa5, via.read(0x00));
    }
}
