// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::Level;

use crate::factory::{Chip, CiaModel};
use crate::util::{IoPort, IrqControl, Pin, Shared, SharedCell, StateReader, StateWriter};
use crate::Error;

use super::cycle_counter::CycleCounter;
use super::rtc::Rtc;
use super::timer;
use super::timer::Timer;

// Spec: 6526 COMPLEX INTERFACE ADAPTER (CIA) Datasheet
// Spec: https://www.c64-wiki.com/index.php/CIA

enum IntDelay {
    Interrupt0 = 1,
    Interrupt1 = 1 << 1,
}

#[derive(Copy, Clone, PartialEq)]
pub enum Mode {
    Cia1 = 0,
    Cia2 = 1,
}

impl Mode {
    pub fn irq_source(self) -> usize {
        self as usize
    }
}

mod icr_event {
    pub const TIMER_A: usize = 0;
    pub const TIMER_B: usize = 1;
    pub const ALARM: usize = 2;
    pub const SERIAL: usize = 3;
    pub const FLAG: usize = 4;
}

pub mod reg {
    pub const PRA: u8 = 0x00;
    pub const PRB: u8 = 0x01;
    pub const DDRA: u8 = 0x02;
    pub const DDRB: u8 = 0x03;
    pub const TALO: u8 = 0x04;
    pub const TAHI: u8 = 0x05;
    pub const TBLO: u8 = 0x06;
    pub const TBHI: u8 = 0x07;
    pub const TODTS: u8 = 0x08;
    pub const TODSEC: u8 = 0x09;
    pub const TODMIN: u8 = 0x0a;
    pub const TODHR: u8 = 0x0b;
    pub const SDR: u8 = 0x0c;
    pub const ICR: u8 = 0x0d;
    pub const CRA: u8 = 0x0e;
    pub const CRB: u8 = 0x0f;
}

pub struct Cia {
    // Dependencies
    mode: Mode,
    chip_model: CiaModel,
    joystick_1: Option<SharedCell<u8>>,
    joystick_2: Option<SharedCell<u8>>,
    keyboard_matrix: Option<Shared<[u8; 16]>>,
    // Functional units
    irq_control: IrqControl,
    irq_delay: CycleCounter,
    timer_a: Timer,
    timer_b: Timer,
    tod_alarm: Rtc,
    tod_clock: Rtc,
    tod_set_alarm: bool,
    todin_60hz: bool,
    // Serial shift register
    sdr_value: u8,
    sdr_output: bool,
    sdr_shifting: bool,
    sdr_count: u8,
    sp_input: bool,
    // I/O
    cnt_pin: Shared<Pin>,
    flag_pin: Shared<Pin>,
    irq_line: Shared<crate::util::IrqLine>,
    port_a: Shared<IoPort>,
    port_b: Shared<IoPort>,
}

impl Cia {
    pub fn new(
        mode: Mode,
        chip_model: CiaModel,
        joystick_1: Option<SharedCell<u8>>,
        joystick_2: Option<SharedCell<u8>>,
        keyboard_matrix: Option<Shared<[u8; 16]>>,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        flag_pin: Shared<Pin>,
        cnt_pin: Shared<Pin>,
        irq_line: Shared<crate::util::IrqLine>,
    ) -> Self {
        Self {
            mode,
            chip_model,
            joystick_1,
            joystick_2,
            keyboard_matrix,
            irq_control: IrqControl::default(),
            irq_delay: CycleCounter::new(0xffff),
            timer_a: Timer::new(timer::Mode::TimerA, cnt_pin.clone()),
            timer_b: Timer::new(timer::Mode::TimerB, cnt_pin.clone()),
            tod_alarm: Rtc::new(),
            tod_clock: Rtc::new(),
            tod_set_alarm: false,
            todin_60hz: true,
            sdr_value: 0,
            sdr_output: false,
            sdr_shifting: false,
            sdr_count: 0,
            sp_input: false,
            cnt_pin,
            flag_pin,
            irq_line,
            port_a,
            port_b,
        }
    }

    /// True when CRA selects a 60 Hz TOD reference (bit 7 clear).
    pub fn is_todin_60hz(&self) -> bool {
        self.todin_60hz
    }

    /// Serial data input pin, sampled on rising CNT edges in input mode.
    pub fn set_sp_input(&mut self, level: bool) {
        self.sp_input = level;
    }

    fn trigger_interrupt(&mut self) {
        match self.chip_model {
            CiaModel::Mos6526 => {
                self.irq_delay.feed(IntDelay::Interrupt0 as u16);
            }
            CiaModel::Mos8521 => {
                self.irq_line
                    .borrow_mut()
                    .set_low(self.mode.irq_source(), true);
            }
        }
    }

    fn read_cia1_port_a(&self) -> u8 {
        let active_columns = self.port_b.borrow().get_value();
        let keyboard_state = self.scan_keyboard_active_cols(active_columns);
        let joystick_state = self.scan_joystick(&self.joystick_2);
        let result = self.port_a.borrow().get_value_with_input(keyboard_state);
        result & joystick_state
    }

    fn read_cia1_port_b(&self) -> u8 {
        let active_rows = self.port_a.borrow().get_value();
        let keyboard_state = self.scan_keyboard_active_rows(active_rows);
        let joystick_state = self.scan_joystick(&self.joystick_1);
        let mut result = self.port_b.borrow().get_value_with_input(keyboard_state);
        /*
        A control bit allows the timer output to appear on a PORT B output
        line (PB6 for TIMER A and PB7 for TIMER B). This function overrides
        the DDRB control bit and forces the appropriate PB line to an output.
        */
        if self.timer_a.is_pb_on() {
            result.set_bit(6, self.timer_a.get_pb_output());
        }
        if self.timer_b.is_pb_on() {
            result.set_bit(7, self.timer_b.get_pb_output());
        }
        result & joystick_state
    }

    fn read_cia2_port_a(&self) -> u8 {
        // serial bus inputs arrive through the port input lines
        self.port_a.borrow().get_value()
    }

    fn read_cia2_port_b(&self) -> u8 {
        let mut result = self.port_b.borrow().get_value();
        if self.timer_a.is_pb_on() {
            result.set_bit(6, self.timer_a.get_pb_output());
        }
        if self.timer_b.is_pb_on() {
            result.set_bit(7, self.timer_b.get_pb_output());
        }
        result
    }

    fn scan_joystick(&self, joystick: &Option<SharedCell<u8>>) -> u8 {
        if let Some(ref state) = *joystick {
            !state.get()
        } else {
            0xff
        }
    }

    fn scan_keyboard_active_cols(&self, active_columns: u8) -> u8 {
        if let Some(matrix) = self.keyboard_matrix.as_ref() {
            let mut result = 0xff;
            for col in 0..8 as usize {
                if !active_columns.get_bit(col) {
                    result &= matrix.borrow()[8 + col];
                }
            }
            result
        } else {
            0xff
        }
    }

    fn scan_keyboard_active_rows(&self, active_rows: u8) -> u8 {
        if let Some(matrix) = self.keyboard_matrix.as_ref() {
            let mut result = 0xff;
            for row in 0..8 as usize {
                if !active_rows.get_bit(row) {
                    result &= matrix.borrow()[row];
                }
            }
            result
        } else {
            0xff
        }
    }

    fn tod_target(&mut self) -> &mut Rtc {
        if !self.tod_set_alarm {
            &mut self.tod_clock
        } else {
            &mut self.tod_alarm
        }
    }
}

impl Chip for Cia {
    fn clock(&mut self) {
        // Process timers
        self.timer_a.feed_source(false);
        let timer_a_output = self.timer_a.clock();
        self.timer_b.feed_source(timer_a_output);
        let timer_b_output = self.timer_b.clock();

        // Serial port: output mode shifts on every second timer A
        // underflow, input mode counts rising CNT edges
        if timer_a_output && self.sdr_output && self.sdr_shifting {
            self.sdr_count += 1;
            if self.sdr_count == 16 {
                self.sdr_count = 0;
                self.sdr_shifting = false;
                self.irq_control.set_event(icr_event::SERIAL);
                if self.irq_control.is_triggered() {
                    self.trigger_interrupt();
                }
            }
        } else if !self.sdr_output && self.cnt_pin.borrow().is_rising() {
            self.sdr_value = (self.sdr_value << 1) | (self.sp_input as u8);
            self.sdr_count += 1;
            if self.sdr_count == 8 {
                self.sdr_count = 0;
                self.irq_control.set_event(icr_event::SERIAL);
                if self.irq_control.is_triggered() {
                    self.trigger_interrupt();
                }
            }
        }

        /*
        Any interrupt will set the corresponding bit in the DATA register.
        Any interrupt which is enabled by the MASK register will set the IR
        bit (MSB) of the DATA register and bring the IRQ pin low.
        */
        let mut irq_event = false;
        if timer_a_output {
            self.irq_control.set_event(icr_event::TIMER_A);
            irq_event = true;
        }
        if timer_b_output {
            self.irq_control.set_event(icr_event::TIMER_B);
            irq_event = true;
        }
        if self.flag_pin.borrow().is_falling() {
            self.irq_control.set_event(icr_event::FLAG);
            irq_event = true;
        }
        if irq_event && self.irq_control.is_triggered() {
            self.trigger_interrupt();
        }
        if self.irq_delay.has_cycle(IntDelay::Interrupt1 as u16) {
            self.irq_line
                .borrow_mut()
                .set_low(self.mode.irq_source(), true);
        }
        self.irq_delay.clock();
    }

    fn clock_delta(&mut self, delta: u32) {
        for _i in 0..delta {
            self.clock();
        }
    }

    fn process_vsync(&mut self) {}

    fn tod_tick(&mut self) {
        self.tod_clock.tick();
        if self.tod_clock == self.tod_alarm {
            self.irq_control.set_event(icr_event::ALARM);
            if self.irq_control.is_triggered() {
                self.trigger_interrupt();
            }
        }
    }

    fn reset(&mut self) {
        /*
        A low on the RES pin resets all internal registers. The port pins
        are set as inputs and port registers to zero (although a read of the
        ports will return all highs because of passive pullups). The timer
        control registers are set to zero and the timer latches to all
        ones. All other registers are reset to zero.
        */
        self.irq_control.reset();
        self.irq_delay.reset();
        self.timer_a.reset();
        self.timer_b.reset();
        self.tod_clock.reset();
        self.tod_alarm.reset();
        self.tod_set_alarm = false;
        self.todin_60hz = true;
        self.sdr_value = 0;
        self.sdr_output = false;
        self.sdr_shifting = false;
        self.sdr_count = 0;
        self.sp_input = false;
        self.cnt_pin.borrow_mut().set_active(true);
        self.flag_pin.borrow_mut().set_active(false);
        self.port_a.borrow_mut().reset();
        self.port_b.borrow_mut().reset();
    }

    // I/O

    fn read(&mut self, reg: u8) -> u8 {
        let value = match reg {
            reg::PRA => match self.mode {
                Mode::Cia1 => self.read_cia1_port_a(),
                Mode::Cia2 => self.read_cia2_port_a(),
            },
            reg::PRB => match self.mode {
                Mode::Cia1 => self.read_cia1_port_b(),
                Mode::Cia2 => self.read_cia2_port_b(),
            },
            reg::DDRA => self.port_a.borrow().get_direction(),
            reg::DDRB => self.port_b.borrow().get_direction(),
            reg::TALO => self.timer_a.get_counter_lo(),
            reg::TAHI => self.timer_a.get_counter_hi(),
            reg::TBLO => self.timer_b.get_counter_lo(),
            reg::TBHI => self.timer_b.get_counter_hi(),
            reg::TODTS => {
                let value = to_bcd(self.tod_clock.get_tenth());
                self.tod_clock.unlatch();
                value
            }
            reg::TODSEC => to_bcd(self.tod_clock.get_seconds()),
            reg::TODMIN => to_bcd(self.tod_clock.get_minutes()),
            reg::TODHR => {
                // freeze the read view until tenths are read
                self.tod_clock.latch();
                let mut result = to_bcd(self.tod_clock.get_hours());
                result.set_bit(7, self.tod_clock.get_pm());
                result
            }
            reg::SDR => self.sdr_value,
            reg::ICR => {
                /*
                The interrupt DATA register is cleared and the IRQ line
                returns high following a read of the DATA register.
                */
                let data = self.irq_control.get_data();
                self.irq_control.clear();
                self.irq_delay.reset();
                self.irq_line
                    .borrow_mut()
                    .set_low(self.mode.irq_source(), false);
                data
            }
            reg::CRA => {
                let mut config = self.timer_a.get_config();
                config.set_bit(6, self.sdr_output);
                config.set_bit(7, !self.todin_60hz);
                config
            }
            reg::CRB => {
                let mut config = self.timer_b.get_config();
                config.set_bit(7, self.tod_set_alarm);
                config
            }
            _ => panic!("invalid reg {}", reg),
        };
        if log_enabled!(Level::Trace) {
            trace!(target: "cia::reg", "Read 0x{:02x} = 0x{:02x}", reg, value);
        }
        value
    }

    fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(Level::Trace) {
            trace!(target: "cia::reg", "Write 0x{:02x} = 0x{:02x}", reg, value);
        }
        match reg {
            reg::PRA => {
                self.port_a.borrow_mut().set_value(value);
            }
            reg::PRB => {
                self.port_b.borrow_mut().set_value(value);
            }
            reg::DDRA => {
                self.port_a.borrow_mut().set_direction(value);
            }
            reg::DDRB => {
                self.port_b.borrow_mut().set_direction(value);
            }
            reg::TALO => {
                self.timer_a.set_latch_lo(value);
            }
            reg::TAHI => {
                self.timer_a.set_latch_hi(value);
            }
            reg::TBLO => {
                self.timer_b.set_latch_lo(value);
            }
            reg::TBHI => {
                self.timer_b.set_latch_hi(value);
            }
            reg::TODTS => {
                let target = self.tod_target();
                target.set_tenth(from_bcd(value & 0x0f));
                if !self.tod_set_alarm {
                    self.tod_clock.set_running(true);
                }
            }
            reg::TODSEC => {
                let target = self.tod_target();
                target.set_seconds(from_bcd(value & 0x7f));
            }
            reg::TODMIN => {
                let target = self.tod_target();
                target.set_minutes(from_bcd(value & 0x7f));
            }
            reg::TODHR => {
                let set_alarm = self.tod_set_alarm;
                let target = self.tod_target();
                target.set_hours(from_bcd(value & 0x7f));
                target.set_pm(value.get_bit(7));
                if !set_alarm {
                    // the clock halts until tenths are written
                    self.tod_clock.set_running(false);
                }
            }
            reg::SDR => {
                self.sdr_value = value;
                if self.sdr_output {
                    self.sdr_shifting = true;
                    self.sdr_count = 0;
                }
            }
            reg::ICR => {
                self.irq_control.update_mask(value);
                if self.irq_control.is_triggered() {
                    self.trigger_interrupt();
                }
            }
            reg::CRA => {
                let sdr_output = value.get_bit(6);
                if sdr_output != self.sdr_output {
                    self.sdr_count = 0;
                    self.sdr_shifting = false;
                }
                self.sdr_output = sdr_output;
                self.todin_60hz = !value.get_bit(7);
                self.timer_a.set_config(value & 0x3f);
            }
            reg::CRB => {
                self.tod_set_alarm = value.get_bit(7);
                self.timer_b.set_config(value & 0x7f);
            }
            _ => panic!("invalid reg {}", reg),
        }
    }

    // State

    fn save_state(&self, writer: &mut StateWriter) {
        self.timer_a.save_state(writer);
        self.timer_b.save_state(writer);
        self.tod_clock.save_state(writer);
        self.tod_alarm.save_state(writer);
        writer.write_bool(self.tod_set_alarm);
        writer.write_bool(self.todin_60hz);
        writer.write_u8(self.irq_control.get_raw_data());
        writer.write_u8(self.irq_control.get_mask());
        writer.write_u8(self.sdr_value);
        writer.write_bool(self.sdr_output);
        writer.write_bool(self.sdr_shifting);
        writer.write_u8(self.sdr_count);
        writer.write_bool(self.sp_input);
        writer.write_u8(self.port_a.borrow().get_direction());
        writer.write_u8(self.port_b.borrow().get_direction());
    }

    fn restore_state(&mut self, reader: &mut StateReader) -> Result<(), Error> {
        self.timer_a.restore_state(reader)?;
        self.timer_b.restore_state(reader)?;
        self.tod_clock.restore_state(reader)?;
        self.tod_alarm.restore_state(reader)?;
        self.tod_set_alarm = reader.read_bool()?;
        self.todin_60hz = reader.read_bool()?;
        let data = reader.read_u8()?;
        let mask = reader.read_u8()?;
        self.irq_control.set_raw_data(data);
        self.irq_control.set_mask(mask);
        self.sdr_value = reader.read_u8()?;
        self.sdr_output = reader.read_bool()?;
        self.sdr_shifting = reader.read_bool()?;
        self.sdr_count = reader.read_u8()?;
        self.sp_input = reader.read_bool()?;
        let ddra = reader.read_u8()?;
        let ddrb = reader.read_u8()?;
        self.port_a.borrow_mut().set_direction(ddra);
        self.port_b.borrow_mut().set_direction(ddrb);
        Ok(())
    }
}

fn from_bcd(decimal: u8) -> u8 {
    (decimal >> 4) * 10 + (decimal & 0x0f)
}

fn to_bcd(num: u8) -> u8 {
    ((num / 10) << 4) | (num % 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{new_shared, IrqLine};

    fn setup_cia() -> Cia {
        let cia_flag = new_shared(Pin::new_low());
        let cia_cnt = new_shared(Pin::new_high());
        let cia_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_port_b = new_shared(IoPort::new(0x00, 0xff));
        let cpu_irq = new_shared(IrqLine::new("irq"));
        let keyboard_matrix = new_shared([0xff; 16]);
        let mut cia = Cia::new(
            Mode::Cia1,
            CiaModel::Mos6526,
            None,
            None,
            Some(keyboard_matrix),
            cia_port_a,
            cia_port_b,
            cia_flag,
            cia_cnt,
            cpu_irq,
        );
        cia.reset();
        cia
    }

    #[test]
    fn read_regs() {
        let mut cia = setup_cia();
        assert_eq!(0xff, cia.read(reg::PRA));
        assert_eq!(0xff, cia.read(reg::PRB));
        assert_eq!(0x00, cia.read(reg::DDRA));
        assert_eq!(0x00, cia.read(reg::DDRB));
        assert_eq!(0x00, cia.read(reg::TALO));
        assert_eq!(0x00, cia.read(reg::TAHI));
        assert_eq!(0x00, cia.read(reg::TBLO));
        assert_eq!(0x00, cia.read(reg::TBHI));
        assert_eq!(0x00, cia.read(reg::TODSEC));
        assert_eq!(0x00, cia.read(reg::TODMIN));
        assert_eq!(0x00, cia.read(reg::SDR));
        assert_eq!(0x00, cia.read(reg::ICR));
        assert_eq!(0x08, cia.read(reg::CRA));
        assert_eq!(0x08, cia.read(reg::CRB));
    }

    #[test]
    fn timer_a_interrupt() {
        let mut cia = setup_cia();
        cia.write(reg::TALO, 0x01);
        cia.write(reg::TAHI, 0x00);
        cia.clock(); // LOAD0
        cia.clock(); // LOAD1
        cia.write(reg::ICR, 0x81); // enable irq for timer a
        cia.write(reg::CRA, 0b_0000_1001_u8);
        {
            cia.clock(); // COUNT0|COUNT1
            let cpu_irq = cia.irq_line.borrow();
            assert_eq!(false, cpu_irq.is_low());
        }
        {
            cia.clock(); // COUNT2
            let cpu_irq = cia.irq_line.borrow();
            assert_eq!(false, cpu_irq.is_low());
        }
        {
            cia.clock(); // COUNT3|INT0
            let cpu_irq = cia.irq_line.borrow();
            assert_eq!(false, cpu_irq.is_low());
        }
        {
            cia.clock(); // INT1
            assert_eq!(1, cia.timer_a.get_counter());
            let cpu_irq = cia.irq_line.borrow();
            assert_eq!(true, cpu_irq.is_low());
        }
    }

    #[test]
    fn timer_b_interrupt() {
        let mut cia = setup_cia();
        cia.write(reg::TBLO, 0x01);
        cia.write(reg::TBHI, 0x00);
        cia.clock(); // LOAD0
        cia.clock(); // LOAD1
        assert_eq!(1, cia.timer_b.get_counter());
        cia.write(reg::ICR, 0x82); // enable irq for timer b
        cia.write(reg::CRB, 0b_0000_1001_u8);
        for _ in 0..3 {
            cia.clock();
            let irq_low = cia.irq_line.borrow().is_low();
            assert_eq!(false, irq_low);
        }
        cia.clock(); // INT1
        let cpu_irq = cia.irq_line.borrow();
        assert_eq!(true, cpu_irq.is_low());
    }

    #[test]
    fn write_icr_mask() {
        let mut cia = setup_cia();
        cia.write(reg::ICR, 0b_1000_0011_u8);
        assert_eq!(0b_0000_0011_u8, cia.irq_control.get_mask());
        cia.write(reg::ICR, 0b_0000_0010_u8);
        assert_eq!(0b_0000_0001_u8, cia.irq_control.get_mask());
    }

    #[test]
    fn write_timer_value_loads_when_stopped() {
        let mut cia = setup_cia();
        cia.write(reg::TALO, 0xab);
        assert_eq!(0x0000, cia.timer_a.get_counter());
        cia.write(reg::TAHI, 0xcd);
        assert_eq!(0x0000, cia.timer_a.get_counter());
        cia.clock();
        cia.clock();
        assert_eq!(0xcdab, cia.timer_a.get_counter());
    }

    #[test]
    fn tod_hours_read_latches() {
        let mut cia = setup_cia();
        cia.write(reg::TODHR, 0x01);
        cia.write(reg::TODMIN, 0x00);
        cia.write(reg::TODSEC, 0x00);
        cia.write(reg::TODTS, 0x00);
        let _ = cia.read(reg::TODHR);
        cia.tod_tick();
        assert_eq!(0x00, cia.read(reg::TODSEC));
        assert_eq!(0x00, cia.read(reg::TODTS));
        // the tenths read released the latch
        assert_eq!(0x01, cia.read(reg::TODTS));
    }

    #[test]
    fn tod_alarm_interrupt() {
        let mut cia = setup_cia();
        cia.write(reg::ICR, 0x84); // enable alarm irq
        cia.write(reg::CRB, 0x80); // write alarm registers
        cia.write(reg::TODHR, 0x00);
        cia.write(reg::TODMIN, 0x00);
        cia.write(reg::TODSEC, 0x00);
        cia.write(reg::TODTS, 0x01);
        cia.write(reg::CRB, 0x00);
        cia.write(reg::TODHR, 0x00);
        cia.write(reg::TODMIN, 0x00);
        cia.write(reg::TODSEC, 0x00);
        cia.write(reg::TODTS, 0x00);
        cia.tod_tick();
        cia.clock();
        cia.clock();
        assert!(cia.irq_line.borrow().is_low());
    }

    /*
    Program CIA1TAB - TA, TB, PB67 and ICR in cascaded mode

    Both latches are set to 2. TA counts system clocks, TB counts TA
    underflows. PB6 is high for one cycle when TA underflows, PB7 is
    toggled when TB underflows. IMR is $02.

    TA  01 02 02 01 02 02 01 02 02 01 02 02
    TB  02 02 02 01 01 01 00 00 02 02 02 02
    PB  80 C0 80 80 C0 80 80 C0 00 00 40 00
    ICR 00 01 01 01 01 01 01 01 03 83 83 83
    */

    #[test]
    fn program_cia1tab() {
        let mut cia = setup_cia();
        cia.write(reg::DDRB, 0x7f);
        cia.write(reg::ICR, 0x82);
        cia.write(reg::CRA, 0x00);
        cia.write(reg::CRB, 0x00);
        cia.write(reg::TALO, 0x02);
        cia.write(reg::TAHI, 0x00);
        cia.write(reg::TBLO, 0x02);
        cia.write(reg::TBHI, 0x00);
        cia.clock();
        cia.clock();
        cia.write(reg::CRB, 0x47);
        cia.write(reg::CRA, 0x03);
        cia.clock(); // Count0|Count1
        cia.clock(); // Count2
        cia.clock(); // Count3
        assert_eq!(cia.timer_a.get_counter(), 0x01);
        assert_eq!(cia.timer_b.get_counter(), 0x02);
        assert_eq!(cia.read(reg::PRB), 0x80);
        assert_eq!(cia.irq_control.get_raw_data(), 0x00);
        cia.clock(); // Count3|Underflow|Load1
        assert_eq!(cia.timer_a.get_counter(), 0x02);
        assert_eq!(cia.timer_b.get_counter(), 0x02);
        assert_eq!(cia.read(reg::PRB), 0xc0);
        assert_eq!(cia.irq_control.get_raw_data(), 0x01);
        cia.clock(); // Count2
        assert_eq!(cia.timer_a.get_counter(), 0x02);
        assert_eq!(cia.timer_b.get_counter(), 0x02);
        assert_eq!(cia.read(reg::PRB), 0x80);
        cia.clock(); // Count3
        assert_eq!(cia.timer_a.get_counter(), 0x01);
        assert_eq!(cia.timer_b.get_counter(), 0x01);
        assert_eq!(cia.read(reg::PRB), 0x80);
        cia.clock(); // Count3|Underflow|Load1
        assert_eq!(cia.timer_a.get_counter(), 0x02);
        assert_eq!(cia.timer_b.get_counter(), 0x01);
        assert_eq!(cia.read(reg::PRB), 0xc0);
        cia.clock(); // Count2
        assert_eq!(cia.timer_a.get_counter(), 0x02);
        assert_eq!(cia.timer_b.get_counter(), 0x01);
        assert_eq!(cia.read(reg::PRB), 0x80);
        cia.clock(); // Count3
        assert_eq!(cia.timer_a.get_counter(), 0x01);
        assert_eq!(cia.timer_b.get_counter(), 0x00);
        assert_eq!(cia.read(reg::PRB), 0x80);
        cia.clock(); // Count3|Underflow|Load1
        assert_eq!(cia.timer_a.get_counter(), 0x02);
        assert_eq!(cia.timer_b.get_counter(), 0x00);
        assert_eq!(cia.read(reg::PRB), 0xc0);
        assert_eq!(cia.irq_control.get_raw_data(), 0x01);
        cia.clock(); // Count2, TB underflow
        assert_eq!(cia.timer_a.get_counter(), 0x02);
        assert_eq!(cia.timer_b.get_counter(), 0x02);
        assert_eq!(cia.read(reg::PRB), 0x00);
        assert_eq!(cia.irq_control.get_raw_data(), 0x03);
        cia.clock(); // Count3
        assert_eq!(cia.timer_a.get_counter(), 0x01);
        assert_eq!(cia.timer_b.get_counter(), 0x02);
        assert_eq!(cia.read(reg::PRB), 0x00);
        cia.clock(); // Count3|Underflow|Load1
        assert_eq!(cia.timer_a.get_counter(), 0x02);
        assert_eq!(cia.timer_b.get_counter(), 0x02);
        assert_eq!(cia.read(reg::PRB), 0x40);
        cia.clock(); // Count2
        assert_eq!(cia.timer_a.get_counter(), 0x02);
        assert_eq!(cia.timer_b.get_counter(), 0x02);
        assert_eq!(cia.read(reg::PRB), 0x00);
    }
}
