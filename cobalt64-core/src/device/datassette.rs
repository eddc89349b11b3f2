// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::factory::Tape;
use crate::util::{IoPort, Pin, Shared};

// The datassette connects to the CIA 1 FLAG pin (read pulses) and to the
// processor port: bit 4 is the sense line (low while a button is down),
// bit 5 the motor control output (low = motor on).

const DUTY_CYCLE: u32 = 50;
const SENSE_BIT: usize = 4;
const MOTOR_BIT: usize = 5;

struct Pulse {
    low_cycles: u32,
    remaining_cycles: u32,
}

impl Pulse {
    pub fn new(length: u32, duty: u32) -> Pulse {
        Pulse {
            low_cycles: length * (100 - duty) / 100,
            remaining_cycles: length,
        }
    }

    #[inline(always)]
    pub fn is_done(&self) -> bool {
        self.remaining_cycles == 0
    }

    #[inline(always)]
    pub fn advance(&mut self) -> bool {
        self.remaining_cycles -= 1;
        if self.low_cycles == 0 {
            true
        } else {
            self.low_cycles -= 1;
            false
        }
    }
}

pub struct Datassette {
    // Dependencies
    cia_flag: Shared<Pin>,
    cpu_io_port: Shared<IoPort>,
    // Runtime state
    playing: bool,
    tape: Option<Box<dyn Tape>>,
    current_pulse: Pulse,
    position: usize,
}

impl Datassette {
    pub fn new(cia_flag: Shared<Pin>, cpu_io_port: Shared<IoPort>) -> Datassette {
        Datassette {
            cia_flag,
            cpu_io_port,
            playing: false,
            tape: None,
            current_pulse: Pulse::new(0, DUTY_CYCLE),
            position: 0,
        }
    }

    pub fn attach(&mut self, tape: Box<dyn Tape>) {
        info!(target: "device", "Attaching tape");
        self.tape = Some(tape);
        self.position = 0;
    }

    pub fn detach(&mut self) {
        info!(target: "device", "Detaching tape");
        self.stop();
        self.tape = None;
        self.position = 0;
    }

    pub fn is_playing(&self) -> bool {
        self.playing && self.motor_on()
    }

    pub fn has_tape(&self) -> bool {
        self.tape.is_some()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn play(&mut self) {
        if self.tape.is_some() && !self.playing {
            info!(target: "device", "Starting datassette");
            self.playing = true;
            self.cpu_io_port.borrow_mut().set_input_bit(SENSE_BIT, false);
        }
    }

    pub fn stop(&mut self) {
        if self.playing {
            info!(target: "device", "Stopping datassette");
            self.playing = false;
            self.cpu_io_port.borrow_mut().set_input_bit(SENSE_BIT, true);
        }
    }

    pub fn rewind(&mut self) {
        if let Some(ref mut tape) = self.tape {
            tape.seek(0);
            self.position = 0;
        }
    }

    pub fn set_position(&mut self, position: usize) {
        if let Some(ref mut tape) = self.tape {
            if tape.seek(position) {
                self.position = position;
            }
        }
    }

    pub fn reset(&mut self) {
        self.playing = false;
        self.current_pulse = Pulse::new(0, DUTY_CYCLE);
        self.position = 0;
        self.cpu_io_port.borrow_mut().set_input_bit(SENSE_BIT, true);
        if let Some(ref mut tape) = self.tape {
            tape.seek(0);
        }
    }

    #[inline(always)]
    pub fn clock(&mut self) {
        if self.is_playing() && self.tape.is_some() {
            if self.current_pulse.is_done() {
                let pulse_maybe = if let Some(ref mut tape) = self.tape {
                    tape.read_pulse()
                } else {
                    None
                };
                if let Some(pulse) = pulse_maybe {
                    self.current_pulse = Pulse::new(pulse, DUTY_CYCLE);
                    self.position += 1;
                } else {
                    self.stop();
                }
            }
            if !self.current_pulse.is_done() {
                let level = self.current_pulse.advance();
                self.cia_flag.borrow_mut().set_active(level);
            }
        }
    }

    fn motor_on(&self) -> bool {
        !self.cpu_io_port.borrow().get_value().get_bit(MOTOR_BIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared;

    struct MockTape {
        pulses: Vec<u32>,
        pos: usize,
    }

    impl Tape for MockTape {
        fn read_pulse(&mut self) -> Option<u32> {
            let pulse = self.pulses.get(self.pos).cloned();
            self.pos += 1;
            pulse
        }

        fn seek(&mut self, pos: usize) -> bool {
            self.pos = pos;
            true
        }
    }

    fn setup_datassette() -> Datassette {
        let cia_flag = new_shared(Pin::new_low());
        let cpu_io_port = new_shared(IoPort::new(0x2f, 0xff));
        // motor on
        cpu_io_port.borrow_mut().set_value(0x0f);
        Datassette::new(cia_flag, cpu_io_port)
    }

    #[test]
    fn play_pulls_sense_low() {
        let mut datassette = setup_datassette();
        datassette.attach(Box::new(MockTape {
            pulses: vec![100],
            pos: 0,
        }));
        datassette.play();
        let sense = datassette.cpu_io_port.borrow().get_value().get_bit(SENSE_BIT);
        assert!(!sense);
    }

    #[test]
    fn pulses_toggle_flag_pin() {
        let mut datassette = setup_datassette();
        datassette.attach(Box::new(MockTape {
            pulses: vec![4, 4],
            pos: 0,
        }));
        datassette.play();
        let mut rises = 0;
        for _ in 0..8 {
            datassette.clock();
            if datassette.cia_flag.borrow().is_rising() {
                rises += 1;
            }
        }
        assert!(rises > 0);
    }

    #[test]
    fn end_of_tape_stops_playback() {
        let mut datassette = setup_datassette();
        datassette.attach(Box::new(MockTape {
            pulses: vec![2],
            pos: 0,
        }));
        datassette.play();
        for _ in 0..8 {
            datassette.clock();
        }
        assert!(!datassette.is_playing());
    }
}
