// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use crate::util::{Pin, Shared, StateReader, StateWriter};
use crate::Error;

use super::cycle_counter::CycleCounter;

// Count and load requests travel through a short pipeline before they act on
// the counter, which produces the 2-cycle start delay and the skipped count
// after a reload seen on the real part.

pub const COUNT0: u16 = 1;
pub const COUNT1: u16 = 1 << 1;
pub const COUNT2: u16 = 1 << 2;
pub const COUNT3: u16 = 1 << 3;
pub const LOAD0: u16 = 1 << 5;
pub const LOAD1: u16 = 1 << 6;

const PIPELINE_MASK: u16 = COUNT1 | COUNT2 | COUNT3 | LOAD1;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Mode {
    TimerA,
    TimerB,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Input {
    SystemClock,
    External,
    TimerA,
    TimerAWithCnt,
}

pub struct Timer {
    // Configuration
    mode: Mode,
    enabled: bool,
    one_shot: bool,
    pb_on: bool,
    pb_toggle_mode: bool,
    input: Input,
    config: u8,
    latch: u16,
    // Runtime state
    counter: u16,
    pb_toggle: bool,
    pb_pulse: bool,
    cycles: CycleCounter,
    // I/O
    cnt_pin: Shared<Pin>,
}

impl Timer {
    pub fn new(mode: Mode, cnt_pin: Shared<Pin>) -> Self {
        Self {
            mode,
            enabled: false,
            one_shot: false,
            pb_on: false,
            pb_toggle_mode: false,
            input: Input::SystemClock,
            config: 0,
            latch: 0xffff,
            counter: 0,
            pb_toggle: false,
            pb_pulse: false,
            cycles: CycleCounter::new(PIPELINE_MASK),
            cnt_pin,
        }
    }

    pub fn get_config(&self) -> u8 {
        self.config
    }

    pub fn get_counter(&self) -> u16 {
        self.counter
    }

    pub fn get_counter_lo(&self) -> u8 {
        (self.counter & 0xff) as u8
    }

    pub fn get_counter_hi(&self) -> u8 {
        (self.counter >> 8) as u8
    }

    pub fn get_latch(&self) -> u16 {
        self.latch
    }

    pub fn is_pb_on(&self) -> bool {
        self.pb_on
    }

    pub fn get_pb_output(&self) -> bool {
        if self.pb_toggle_mode {
            self.pb_toggle
        } else {
            self.pb_pulse
        }
    }

    pub fn set_latch_lo(&mut self, value: u8) {
        self.latch = (self.latch & 0xff00) | u16::from(value);
    }

    pub fn set_latch_hi(&mut self, value: u8) {
        self.latch = (u16::from(value) << 8) | (self.latch & 0x00ff);
        // a stopped timer reloads on a high latch write
        if !self.enabled {
            self.cycles.feed(LOAD0);
        }
    }

    pub fn set_config(&mut self, value: u8) {
        let was_enabled = self.enabled;
        self.enabled = value & 0x01 != 0;
        self.pb_on = value & 0x02 != 0;
        self.pb_toggle_mode = value & 0x04 != 0;
        self.one_shot = value & 0x08 != 0;
        if value & 0x10 != 0 {
            // force load strobe, not stored
            self.cycles.feed(LOAD0);
        }
        self.input = match self.mode {
            Mode::TimerA => {
                if value & 0x20 != 0 {
                    Input::External
                } else {
                    Input::SystemClock
                }
            }
            Mode::TimerB => match (value >> 5) & 0x03 {
                0 => Input::SystemClock,
                1 => Input::External,
                2 => Input::TimerA,
                _ => Input::TimerAWithCnt,
            },
        };
        if self.enabled && !was_enabled {
            // the toggle output is set high whenever the timer starts
            self.pb_toggle = true;
            if self.input == Input::SystemClock {
                self.cycles.feed(COUNT0 | COUNT1);
            }
        }
        self.cycles
            .autofeed(COUNT0, self.enabled && self.input == Input::SystemClock);
        self.config = value & !0x10;
    }

    /// Inject this cycle's count pulse for externally clocked modes.
    /// `cascade` carries timer A's underflow output when clocking timer B.
    pub fn feed_source(&mut self, cascade: bool) {
        if !self.enabled {
            return;
        }
        let active = match self.input {
            Input::SystemClock => false,
            Input::External => self.cnt_pin.borrow().is_rising(),
            Input::TimerA => cascade,
            Input::TimerAWithCnt => cascade && self.cnt_pin.borrow().is_high(),
        };
        if active {
            self.cycles.feed(COUNT1);
        }
    }

    /// Advance the timer one cycle; returns true on underflow.
    pub fn clock(&mut self) -> bool {
        self.pb_pulse = false;
        let mut output = false;
        if self.cycles.has_cycle(COUNT3) {
            self.counter = self.counter.wrapping_sub(1);
        }
        if self.counter == 0 && self.cycles.has_cycle(COUNT2) {
            output = true;
            self.pb_pulse = true;
            self.pb_toggle = !self.pb_toggle;
            if self.one_shot {
                /*
                In one-shot mode, the timer will count down from the latched
                value to zero, generate an interrupt, reload the latched
                value, then stop.
                */
                self.enabled = false;
                self.config &= !0x01;
                self.cycles.autofeed(COUNT0, false);
                self.cycles.remove(COUNT0 | COUNT1);
            }
            self.cycles.feed(LOAD1);
        }
        if self.cycles.has_cycle(LOAD1) {
            self.counter = self.latch;
            // a reload consumes the count in flight
            self.cycles.remove(COUNT2);
        }
        self.cycles.clock();
        output
    }

    pub fn reset(&mut self) {
        self.enabled = false;
        self.one_shot = true;
        self.pb_on = false;
        self.pb_toggle_mode = false;
        self.input = Input::SystemClock;
        self.config = 0x08;
        self.latch = 0xffff;
        self.counter = 0x0000;
        self.pb_toggle = false;
        self.pb_pulse = false;
        self.cycles.reset();
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u8(self.config);
        writer.write_u16(self.latch);
        writer.write_u16(self.counter);
        writer.write_bool(self.pb_toggle);
        writer.write_bool(self.pb_pulse);
        let (cycles, feed) = self.cycles.get();
        writer.write_u16(cycles);
        writer.write_u16(feed);
    }

    pub fn restore_state(&mut self, reader: &mut StateReader) -> Result<(), Error> {
        let config = reader.read_u8()?;
        self.set_config(config);
        self.config = config;
        self.latch = reader.read_u16()?;
        self.counter = reader.read_u16()?;
        self.pb_toggle = reader.read_bool()?;
        self.pb_pulse = reader.read_bool()?;
        let cycles = reader.read_u16()?;
        let feed = reader.read_u16()?;
        self.cycles.set(cycles, feed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared;

    fn setup_timer() -> Timer {
        let cnt = new_shared(Pin::new_high());
        let mut timer = Timer::new(Mode::TimerA, cnt);
        timer.reset();
        timer
    }

    #[test]
    fn start_delay_is_two_cycles() {
        let mut timer = setup_timer();
        timer.set_latch_lo(0x04);
        timer.set_latch_hi(0x00);
        timer.clock();
        timer.clock();
        assert_eq!(4, timer.get_counter());
        timer.set_config(0x01);
        timer.clock(); // count0|count1
        assert_eq!(4, timer.get_counter());
        timer.clock(); // count2
        assert_eq!(4, timer.get_counter());
        timer.clock(); // count3
        assert_eq!(3, timer.get_counter());
    }

    #[test]
    fn underflow_reloads_latch() {
        let mut timer = setup_timer();
        timer.set_latch_lo(0x01);
        timer.set_latch_hi(0x00);
        timer.clock();
        timer.clock();
        timer.set_config(0x01);
        assert_eq!(false, timer.clock()); // count0|count1
        assert_eq!(false, timer.clock()); // count2
        // the decrement to zero underflows and reloads in the same cycle
        assert_eq!(true, timer.clock());
        assert_eq!(1, timer.get_counter());
    }

    #[test]
    fn one_shot_stops_on_underflow() {
        let mut timer = setup_timer();
        timer.set_latch_lo(0x01);
        timer.set_latch_hi(0x00);
        timer.clock();
        timer.clock();
        timer.set_config(0x09);
        let mut underflows = 0;
        for _ in 0..16 {
            if timer.clock() {
                underflows += 1;
            }
        }
        assert_eq!(1, underflows);
        assert_eq!(0, timer.get_config() & 0x01);
    }
}
