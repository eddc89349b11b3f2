// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::SharedCell;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode {
    None = 0xff,
    Numpad = 0xfe,
    Joy0 = 0,
    Joy1 = 1,
}

impl Mode {
    pub fn from(mode: &str) -> Mode {
        match mode {
            "none" => Mode::None,
            "numpad" => Mode::Numpad,
            "joy0" => Mode::Joy0,
            "joy1" => Mode::Joy1,
            _ => panic!("invalid mode {}", mode),
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    Negative,
    Off,
    Positive,
}

#[derive(Clone, Copy, Debug)]
pub enum Event {
    Up(bool),
    Down(bool),
    Left(bool),
    Right(bool),
    Fire(bool),
}

/// Five-switch joystick on one of the control ports. The shared state cell
/// carries the active-high switch bits consumed by the CIA port scan.
pub struct Joystick {
    // Configuration
    mode: Mode,
    threshold: i16,
    autofire_period: u32,
    // Runtime state
    x_axis: Motion,
    y_axis: Motion,
    button: bool,
    autofire: bool,
    autofire_counter: u32,
    autofire_output: bool,
    // I/O
    state: SharedCell<u8>,
}

mod bit {
    pub const UP: usize = 0;
    pub const DOWN: usize = 1;
    pub const LEFT: usize = 2;
    pub const RIGHT: usize = 3;
    pub const FIRE: usize = 4;
}

impl Joystick {
    pub fn new(mode: Mode, threshold: i16, state: SharedCell<u8>) -> Self {
        Self {
            mode,
            threshold,
            autofire_period: 0,
            x_axis: Motion::Off,
            y_axis: Motion::Off,
            button: false,
            autofire: false,
            autofire_counter: 0,
            autofire_output: false,
            state,
        }
    }

    pub fn get_index(&self) -> u8 {
        self.mode.index()
    }

    pub fn is_virtual(&self) -> bool {
        self.mode == Mode::Numpad
    }

    pub fn set_autofire(&mut self, enabled: bool, period_cycles: u32) {
        self.autofire = enabled;
        self.autofire_period = period_cycles;
        self.autofire_counter = 0;
    }

    pub fn reset(&mut self) {
        self.x_axis = Motion::Off;
        self.y_axis = Motion::Off;
        self.button = false;
        self.autofire_counter = 0;
        self.autofire_output = false;
        self.state.set(0);
    }

    /// Advance the autofire divider by the given number of CPU cycles.
    pub fn clock_delta(&mut self, delta: u32) {
        if self.autofire && self.button && self.autofire_period > 0 {
            self.autofire_counter += delta;
            while self.autofire_counter >= self.autofire_period {
                self.autofire_counter -= self.autofire_period;
                self.autofire_output = !self.autofire_output;
            }
            self.update_state();
        }
    }

    // -- Events

    pub fn on_event(&mut self, event: Event) {
        match event {
            Event::Up(active) => {
                self.y_axis = if active { Motion::Negative } else { Motion::Off }
            }
            Event::Down(active) => {
                self.y_axis = if active { Motion::Positive } else { Motion::Off }
            }
            Event::Left(active) => {
                self.x_axis = if active { Motion::Negative } else { Motion::Off }
            }
            Event::Right(active) => {
                self.x_axis = if active { Motion::Positive } else { Motion::Off }
            }
            Event::Fire(active) => {
                self.button = active;
                self.autofire_output = active;
            }
        }
        self.update_state();
    }

    pub fn on_axis_motion(&mut self, axis_idx: u8, value: i16) {
        match axis_idx {
            0 if value < -self.threshold => self.x_axis = Motion::Negative,
            0 if value > self.threshold => self.x_axis = Motion::Positive,
            0 => self.x_axis = Motion::Off,
            1 if value < -self.threshold => self.y_axis = Motion::Negative,
            1 if value > self.threshold => self.y_axis = Motion::Positive,
            1 => self.y_axis = Motion::Off,
            _ => panic!("invalid axis {}", axis_idx),
        }
        self.update_state();
    }

    pub fn on_button_down(&mut self) {
        self.button = true;
        self.autofire_output = true;
        self.update_state();
    }

    pub fn on_button_up(&mut self) {
        self.button = false;
        self.autofire_output = false;
        self.update_state();
    }

    fn update_state(&mut self) {
        let mut state = 0u8;
        state.set_bit(bit::UP, self.y_axis == Motion::Negative);
        state.set_bit(bit::DOWN, self.y_axis == Motion::Positive);
        state.set_bit(bit::LEFT, self.x_axis == Motion::Negative);
        state.set_bit(bit::RIGHT, self.x_axis == Motion::Positive);
        let fire = if self.autofire {
            self.button && self.autofire_output
        } else {
            self.button
        };
        state.set_bit(bit::FIRE, fire);
        self.state.set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared_cell;

    #[test]
    fn events_drive_state_bits() {
        let state = new_shared_cell(0u8);
        let mut joystick = Joystick::new(Mode::Joy0, 3200, state.clone());
        joystick.on_event(Event::Left(true));
        joystick.on_event(Event::Fire(true));
        assert_eq!(0b1_0100, state.get());
        joystick.on_event(Event::Left(false));
        joystick.on_event(Event::Fire(false));
        assert_eq!(0, state.get());
    }

    #[test]
    fn autofire_toggles_fire_bit() {
        let state = new_shared_cell(0u8);
        let mut joystick = Joystick::new(Mode::Joy0, 3200, state.clone());
        joystick.set_autofire(true, 1000);
        joystick.on_event(Event::Fire(true));
        assert!(state.get().get_bit(bit::FIRE));
        joystick.clock_delta(1000);
        assert!(!state.get().get_bit(bit::FIRE));
        joystick.clock_delta(1000);
        assert!(state.get().get_bit(bit::FIRE));
    }
}
