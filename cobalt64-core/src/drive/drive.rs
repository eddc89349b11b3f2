// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use crate::cpu::Cpu6510;
use crate::factory::{Cpu, DriveModel};
use crate::util::{new_shared, IrqLine, Pin, Ram, Rom, Shared, StateReader, StateWriter};
use crate::Error;

use super::disk::GcrDisk;
use super::iec::IecBus;
use super::mem::DriveMemory;
use super::via::Via6522;

// The 1541 runs its own 6502 from 2 KiB RAM and 16 KiB DOS ROM with two
// VIAs:
//
//   VIA1 ($1800): serial bus.
//     PB0 DATA in, PB1 DATA out, PB2 CLK in, PB3 CLK out, PB4 ATN ack,
//     PB5/6 device address jumpers, PB7 ATN in; CA1 = ATN edge.
//
//   VIA2 ($1C00): disk controller.
//     PA = head data; PB0/1 stepper phase, PB2 motor, PB3 LED, PB4 write
//     protect sense, PB5/6 density select, PB7 SYNC detect (active low);
//     CB1 byte-ready, CA2 byte-ready enable (SOE), CB2 read/write mode.
//
// The head moves one bit per speed-zone-scaled interval; the per-zone bit
// cell lengths are 16/15/14/13 quarter microseconds for zones 0-3.

const CYCLES_PER_BIT: [u16; 4] = [16, 15, 14, 13];

mod pb1 {
    pub const DATA_IN: usize = 0;
    pub const DATA_OUT: usize = 1;
    pub const CLK_IN: usize = 2;
    pub const CLK_OUT: usize = 3;
    pub const ATN_ACK: usize = 4;
    pub const ATN_IN: usize = 7;
}

mod pb2 {
    pub const MOTOR: usize = 2;
    pub const LED: usize = 3;
    pub const WRITE_PROTECT: usize = 4;
    pub const SYNC: usize = 7;
}

pub struct Drive {
    // Configuration
    device_number: u8,
    #[allow(unused)]
    model: DriveModel,
    enabled: bool,
    cpu_freq: u32,
    drive_freq: u32,
    // Components
    cpu: Cpu6510,
    ram: Shared<Ram>,
    via_1: Shared<Via6522>,
    via_2: Shared<Via6522>,
    irq_line: Shared<IrqLine>,
    disk: Option<GcrDisk>,
    // Mechanics
    halftrack: usize,
    bit_offset: usize,
    bit_timer: u16,
    read_shifter: u8,
    write_shifter: u8,
    bit_counter: u8,
    ones_run: u8,
    sync: bool,
    byte_ready: bool,
    prev_stepper: u8,
    motor: bool,
    // Clock ratio accumulator
    cycle_acc: u32,
    // I/O
    iec: Shared<IecBus>,
    iec_index: usize,
}

impl Drive {
    pub fn new(
        device_number: u8,
        model: DriveModel,
        rom: &[u8],
        iec: Shared<IecBus>,
        cpu_freq: u32,
        drive_freq: u32,
    ) -> Self {
        info!(target: "drive", "Initializing drive {}", device_number);
        let ram = new_shared(Ram::new(0x0800));
        let rom = new_shared(Rom::new_with_data(rom, 0xc000));
        let via_1 = new_shared(Via6522::new());
        let via_2 = new_shared(Via6522::new());
        let irq_line = new_shared(IrqLine::new("drive-irq"));
        let nmi_line = new_shared(IrqLine::new("drive-nmi"));
        let ba_line = new_shared(Pin::new_high());
        let mem = new_shared(DriveMemory::new(
            ram.clone(),
            rom,
            via_1.clone(),
            via_2.clone(),
        ));
        let cpu = Cpu6510::new(mem, None, ba_line, irq_line.clone(), nmi_line);
        Self {
            device_number,
            model,
            enabled: false,
            cpu_freq,
            drive_freq,
            cpu,
            ram,
            via_1,
            via_2,
            irq_line,
            disk: None,
            halftrack: 34, // track 18, the directory track
            bit_offset: 0,
            bit_timer: 0,
            read_shifter: 0,
            write_shifter: 0,
            bit_counter: 0,
            ones_run: 0,
            sync: false,
            byte_ready: false,
            prev_stepper: 0,
            motor: false,
            cycle_acc: 0,
            iec: iec.clone(),
            iec_index: usize::from(device_number - 8) + 1,
        }
    }

    pub fn device_number(&self) -> u8 {
        self.device_number
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            info!(target: "drive", "Drive {} {}", self.device_number,
                  if enabled { "connected" } else { "disconnected" });
            self.enabled = enabled;
            if enabled {
                self.reset();
            } else {
                let mut iec = self.iec.borrow_mut();
                iec.set_clk(self.iec_index, false);
                iec.set_data(self.iec_index, false);
            }
        }
    }

    pub fn has_disk(&self) -> bool {
        self.disk.is_some()
    }

    pub fn attach_disk(&mut self, disk: GcrDisk) {
        info!(target: "drive", "Drive {}: disk inserted", self.device_number);
        self.disk = Some(disk);
        self.bit_offset = 0;
    }

    pub fn eject_disk(&mut self) -> Option<GcrDisk> {
        info!(target: "drive", "Drive {}: disk ejected", self.device_number);
        self.disk.take()
    }

    pub fn track(&self) -> u8 {
        (self.halftrack / 2 + 1) as u8
    }

    pub fn is_motor_on(&self) -> bool {
        self.motor
    }

    pub fn is_led_on(&self) -> bool {
        self.via_2.borrow().port_b_driven() & (1 << pb2::LED) != 0
    }

    pub fn reset(&mut self) {
        self.via_1.borrow_mut().reset();
        self.via_2.borrow_mut().reset();
        self.irq_line.borrow_mut().reset();
        self.cpu.reset();
        self.bit_offset = 0;
        self.bit_timer = 0;
        self.read_shifter = 0;
        self.write_shifter = 0;
        self.bit_counter = 0;
        self.ones_run = 0;
        self.sync = false;
        self.byte_ready = false;
        self.prev_stepper = 0;
        self.motor = false;
        self.cycle_acc = 0;
    }

    /// Advance the drive for one main CPU cycle. The drive clock is not an
    /// integer multiple of the system clock, so a fractional accumulator
    /// decides how many drive cycles fit.
    pub fn clock(&mut self) {
        if !self.enabled {
            return;
        }
        self.cycle_acc += self.drive_freq;
        while self.cycle_acc >= self.cpu_freq {
            self.cycle_acc -= self.cpu_freq;
            self.step();
        }
    }

    fn step(&mut self) {
        self.update_inputs_from_bus();
        let irq = self.via_1.borrow().irq_active() || self.via_2.borrow().irq_active();
        self.irq_line.borrow_mut().set_low(0, irq);
        self.cpu.step_cycle();
        self.via_1.borrow_mut().clock();
        self.via_2.borrow_mut().clock();
        self.update_mechanics();
        self.update_bus_from_outputs();
    }

    fn update_inputs_from_bus(&mut self) {
        let (atn, clk, data) = {
            let iec = self.iec.borrow();
            (iec.atn(), iec.clk(), iec.data())
        };
        let mut via_1 = self.via_1.borrow_mut();
        via_1.set_input_b_bit(pb1::DATA_IN, data);
        via_1.set_input_b_bit(pb1::CLK_IN, clk);
        via_1.set_input_b_bit(pb1::ATN_IN, atn);
        // device address jumpers
        let jumpers = self.device_number - 8;
        via_1.set_input_b_bit(5, jumpers & 0x01 != 0);
        via_1.set_input_b_bit(6, jumpers & 0x02 != 0);
        via_1.set_ca1(atn);
    }

    fn update_bus_from_outputs(&mut self) {
        let pb = self.via_1.borrow().port_b_driven();
        let atn_low = !self.iec.borrow().atn();
        let atn_ack = pb & (1 << pb1::ATN_ACK) != 0;
        // the ATN acknowledge gate forces DATA low whenever ATN is
        // asserted without the acknowledge bit set
        let data_pull = (pb & (1 << pb1::DATA_OUT) != 0) || (atn_low && !atn_ack);
        let clk_pull = pb & (1 << pb1::CLK_OUT) != 0;
        let mut iec = self.iec.borrow_mut();
        iec.set_data(self.iec_index, data_pull);
        iec.set_clk(self.iec_index, clk_pull);
    }

    fn update_mechanics(&mut self) {
        let pb = self.via_2.borrow().port_b_driven();
        // head stepping
        let phase = pb & 0x03;
        if phase == (self.prev_stepper + 1) & 0x03 && self.halftrack < 83 {
            self.halftrack += 1;
            self.bit_timer = 0;
        } else if phase == self.prev_stepper.wrapping_sub(1) & 0x03 && self.halftrack > 0 {
            self.halftrack -= 1;
            self.bit_timer = 0;
        }
        self.prev_stepper = phase;
        self.motor = pb & (1 << pb2::MOTOR) != 0;
        // write protect sense (low while protected or no disk)
        let protected = self
            .disk
            .as_ref()
            .map_or(true, |disk| disk.is_write_protected());
        self.via_2
            .borrow_mut()
            .set_input_b_bit(pb2::WRITE_PROTECT, !protected);
        if self.motor && self.disk.is_some() {
            let zone = GcrDisk::speed_zone_for_halftrack(self.halftrack);
            self.bit_timer += 4;
            while self.bit_timer >= CYCLES_PER_BIT[zone] {
                self.bit_timer -= CYCLES_PER_BIT[zone];
                self.advance_bit();
            }
        }
    }

    fn advance_bit(&mut self) {
        if self.byte_ready {
            // release the byte-ready strobe from the previous byte
            self.via_2.borrow_mut().set_cb1(true);
            self.byte_ready = false;
        }
        let write_mode = !self.via_2.borrow().cb2_output();
        let protected = self
            .disk
            .as_ref()
            .map_or(true, |disk| disk.is_write_protected());
        if write_mode && !protected {
            if self.bit_counter == 0 {
                self.write_shifter = self.via_2.borrow().port_a_driven();
            }
            let bit = self.write_shifter & 0x80 != 0;
            if let Some(ref mut disk) = self.disk {
                disk.write_bit(self.halftrack, self.bit_offset, bit);
            }
            self.write_shifter <<= 1;
            self.bit_counter += 1;
            if self.bit_counter == 8 {
                self.bit_counter = 0;
                self.signal_byte_ready();
            }
        } else {
            let bit = self
                .disk
                .as_ref()
                .map_or(false, |disk| disk.read_bit(self.halftrack, self.bit_offset));
            if bit {
                self.ones_run = self.ones_run.saturating_add(1);
            } else {
                self.ones_run = 0;
            }
            self.sync = self.ones_run >= 10;
            self.via_2
                .borrow_mut()
                .set_input_b_bit(pb2::SYNC, !self.sync);
            self.read_shifter = (self.read_shifter << 1) | (bit as u8);
            if self.sync {
                // sync re-aligns the byte boundary
                self.bit_counter = 0;
            } else {
                self.bit_counter += 1;
                if self.bit_counter == 8 {
                    self.bit_counter = 0;
                    let byte = self.read_shifter;
                    self.via_2.borrow_mut().set_input_a(byte);
                    self.signal_byte_ready();
                }
            }
        }
        let len = self
            .disk
            .as_ref()
            .map_or(1, |disk| disk.len_bits(self.halftrack));
        self.bit_offset = (self.bit_offset + 1) % len;
    }

    fn signal_byte_ready(&mut self) {
        self.byte_ready = true;
        let mut via_2 = self.via_2.borrow_mut();
        via_2.set_cb1(false);
        if via_2.ca2_output() {
            drop(via_2);
            // the SO line sets the drive CPU's overflow flag directly
            self.cpu.set_overflow_pin();
        }
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        self.cpu.save_state(writer);
        writer.write_bytes(self.ram.borrow().snapshot());
        self.via_1.borrow().save_state(writer);
        self.via_2.borrow().save_state(writer);
        writer.write_bool(self.enabled);
        writer.write_u8(self.halftrack as u8);
        writer.write_u32(self.bit_offset as u32);
        writer.write_u16(self.bit_timer);
        writer.write_u8(self.read_shifter);
        writer.write_u8(self.write_shifter);
        writer.write_u8(self.bit_counter);
        writer.write_u8(self.ones_run);
        writer.write_bool(self.sync);
        writer.write_bool(self.byte_ready);
        writer.write_u8(self.prev_stepper);
        writer.write_bool(self.motor);
        writer.write_u32(self.cycle_acc);
    }

    pub fn restore_state(&mut self, reader: &mut StateReader) -> Result<(), Error> {
        self.cpu.restore_state(reader)?;
        let ram = reader.read_bytes()?;
        if ram.len() != 0x0800 {
            return Err(Error::Snapshot("invalid drive ram size".to_string()));
        }
        self.ram.borrow_mut().restore(ram);
        self.via_1.borrow_mut().restore_state(reader)?;
        self.via_2.borrow_mut().restore_state(reader)?;
        self.enabled = reader.read_bool()?;
        self.halftrack = usize::from(reader.read_u8()?).min(83);
        self.bit_offset = reader.read_u32()? as usize;
        self.bit_timer = reader.read_u16()?;
        self.read_shifter = reader.read_u8()?;
        self.write_shifter = reader.read_u8()?;
        self.bit_counter = reader.read_u8()?;
        self.ones_run = reader.read_u8()?;
        self.sync = reader.read_bool()?;
        self.byte_ready = reader.read_bool()?;
        self.prev_stepper = reader.read_u8()?;
        self.motor = reader.read_bool()?;
        self.cycle_acc = reader.read_u32()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::DriveModel;

    fn drive_rom() -> Vec<u8> {
        let mut rom = vec![0xea; 0x4000]; // NOP sled
        // reset vector points at $C000
        rom[0x3ffc] = 0x00;
        rom[0x3ffd] = 0xc0;
        rom
    }

    fn setup_drive() -> (Drive, Shared<IecBus>) {
        let iec = new_shared(IecBus::new());
        let mut drive = Drive::new(
            8,
            DriveModel::Vc1541II,
            &drive_rom(),
            iec.clone(),
            985_248,
            1_000_000,
        );
        drive.set_enabled(true);
        (drive, iec)
    }

    #[test]
    fn reset_lands_on_rom_vector() {
        let (drive, _) = setup_drive();
        assert_eq!(0xc000, drive.cpu.get_pc());
    }

    #[test]
    fn drive_cpu_executes_rom() {
        let (mut drive, _) = setup_drive();
        for _ in 0..100 {
            drive.clock();
        }
        // roughly one drive cycle per host cycle; the NOP sled advances PC
        assert!(drive.cpu.get_pc() > 0xc000);
    }

    #[test]
    fn atn_without_ack_pulls_data() {
        let (mut drive, iec) = setup_drive();
        iec.borrow_mut().set_atn(0, true);
        drive.clock();
        assert!(!iec.borrow().data());
        iec.borrow_mut().set_atn(0, false);
        for _ in 0..4 {
            drive.clock();
        }
        assert!(iec.borrow().data());
    }

    #[test]
    fn motor_spins_disk() {
        let (mut drive, _) = setup_drive();
        drive.attach_disk(GcrDisk::blank());
        // switch the motor on through VIA2 port B
        drive.via_2.borrow_mut().write(0x02, 0xff);
        drive.via_2.borrow_mut().write(0x00, 1 << pb2::MOTOR);
        let start = drive.bit_offset;
        for _ in 0..100 {
            drive.clock();
        }
        assert!(drive.bit_offset != start);
    }
}
