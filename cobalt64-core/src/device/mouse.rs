// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::SharedCell;

/// Supported mouse hardware. The 1350 reports motion as digital joystick
/// pulses, the 1351 as analog quadrature on the POT lines, the Neos as a
/// nibble protocol strobed over the port lines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Model {
    Mouse1350,
    Mouse1351,
    NeosMouse,
}

impl Model {
    pub fn from(model: &str) -> Model {
        match model {
            "1350" => Model::Mouse1350,
            "1351" => Model::Mouse1351,
            "neos" => Model::NeosMouse,
            _ => panic!("invalid mouse model {}", model),
        }
    }
}

pub struct Mouse {
    model: Model,
    // Position state
    x: i32,
    y: i32,
    target_x: i32,
    target_y: i32,
    left_button: bool,
    right_button: bool,
    // Neos protocol state
    neos_phase: u8,
    neos_latch_x: i32,
    neos_latch_y: i32,
    // I/O
    port_state: SharedCell<u8>,
    pot_x: SharedCell<u8>,
    pot_y: SharedCell<u8>,
}

mod bit {
    pub const UP: usize = 0;
    pub const DOWN: usize = 1;
    pub const LEFT: usize = 2;
    pub const RIGHT: usize = 3;
    pub const FIRE: usize = 4;
}

impl Mouse {
    pub fn new(
        model: Model,
        port_state: SharedCell<u8>,
        pot_x: SharedCell<u8>,
        pot_y: SharedCell<u8>,
    ) -> Self {
        Self {
            model,
            x: 0,
            y: 0,
            target_x: 0,
            target_y: 0,
            left_button: false,
            right_button: false,
            neos_phase: 0,
            neos_latch_x: 0,
            neos_latch_y: 0,
            port_state,
            pot_x,
            pot_y,
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn reset(&mut self) {
        self.x = 0;
        self.y = 0;
        self.target_x = 0;
        self.target_y = 0;
        self.left_button = false;
        self.right_button = false;
        self.neos_phase = 0;
        self.port_state.set(0);
        self.pot_x.set(0xff);
        self.pot_y.set(0xff);
    }

    pub fn move_abs(&mut self, x: i32, y: i32) {
        let dx = x - self.target_x;
        let dy = y - self.target_y;
        self.target_x = x;
        self.target_y = y;
        self.apply_motion(dx, dy);
    }

    pub fn move_rel(&mut self, dx: i32, dy: i32) {
        self.target_x += dx;
        self.target_y += dy;
        self.apply_motion(dx, dy);
    }

    pub fn set_left_button(&mut self, pressed: bool) {
        self.left_button = pressed;
        self.update_lines();
    }

    pub fn set_right_button(&mut self, pressed: bool) {
        self.right_button = pressed;
        self.update_lines();
    }

    fn apply_motion(&mut self, dx: i32, dy: i32) {
        self.x += dx;
        self.y += dy;
        self.update_lines();
    }

    fn update_lines(&mut self) {
        match self.model {
            Model::Mouse1351 => {
                // analog quadrature: bits 1-6 carry the position modulo 64
                self.pot_x.set((((self.x & 0x3f) as u8) << 1) & 0x7e);
                self.pot_y.set((((-self.y & 0x3f) as u8) << 1) & 0x7e);
                let mut state = 0u8;
                state.set_bit(bit::FIRE, self.left_button);
                state.set_bit(bit::UP, self.right_button);
                self.port_state.set(state);
            }
            Model::Mouse1350 => {
                let mut state = 0u8;
                state.set_bit(bit::FIRE, self.left_button);
                state.set_bit(bit::RIGHT, self.x > 0);
                state.set_bit(bit::LEFT, self.x < 0);
                state.set_bit(bit::UP, self.y > 0);
                state.set_bit(bit::DOWN, self.y < 0);
                self.port_state.set(state);
                self.x = 0;
                self.y = 0;
            }
            Model::NeosMouse => {
                self.update_neos_lines();
            }
        }
    }

    /// The Neos protocol transfers the X/Y deltas as four nibbles, advanced
    /// by strobing port line 4 from the host side.
    pub fn neos_strobe(&mut self) {
        if self.neos_phase == 0 {
            self.neos_latch_x = self.x;
            self.neos_latch_y = self.y;
            self.x = 0;
            self.y = 0;
        }
        self.neos_phase = (self.neos_phase + 1) & 0x03;
        self.update_neos_lines();
    }

    fn update_neos_lines(&mut self) {
        let dx = (-self.neos_latch_x).max(-128).min(127) as u8;
        let dy = (self.neos_latch_y).max(-128).min(127) as u8;
        let nibble = match self.neos_phase {
            0 => dx >> 4,
            1 => dx & 0x0f,
            2 => dy >> 4,
            _ => dy & 0x0f,
        };
        let mut state = nibble & 0x0f;
        state.set_bit(bit::FIRE, self.left_button);
        self.port_state.set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared_cell;

    fn setup_mouse(model: Model) -> (Mouse, SharedCell<u8>, SharedCell<u8>, SharedCell<u8>) {
        let port = new_shared_cell(0u8);
        let pot_x = new_shared_cell(0xffu8);
        let pot_y = new_shared_cell(0xffu8);
        let mouse = Mouse::new(model, port.clone(), pot_x.clone(), pot_y.clone());
        (mouse, port, pot_x, pot_y)
    }

    #[test]
    fn mouse_1351_drives_pot_lines() {
        let (mut mouse, port, pot_x, _pot_y) = setup_mouse(Model::Mouse1351);
        mouse.move_rel(3, 0);
        assert_eq!(6, pot_x.get());
        mouse.set_left_button(true);
        assert!(port.get().get_bit(4));
    }

    #[test]
    fn mouse_1350_reports_digital_motion() {
        let (mut mouse, port, _pot_x, _pot_y) = setup_mouse(Model::Mouse1350);
        mouse.move_rel(5, 0);
        assert!(port.get().get_bit(3));
    }
}
