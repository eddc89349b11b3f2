// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::SharedCell;

/// A pair of paddles on one control port. Positions are reported through
/// the SID POT inputs, the two buttons through the directional port lines.
pub struct Paddle {
    pos_1: u8,
    pos_2: u8,
    button_1: bool,
    button_2: bool,
    port_state: SharedCell<u8>,
    pot_x: SharedCell<u8>,
    pot_y: SharedCell<u8>,
}

impl Paddle {
    pub fn new(
        port_state: SharedCell<u8>,
        pot_x: SharedCell<u8>,
        pot_y: SharedCell<u8>,
    ) -> Self {
        Self {
            pos_1: 0x80,
            pos_2: 0x80,
            button_1: false,
            button_2: false,
            port_state,
            pot_x,
            pot_y,
        }
    }

    pub fn reset(&mut self) {
        self.pos_1 = 0x80;
        self.pos_2 = 0x80;
        self.button_1 = false;
        self.button_2 = false;
        self.update_lines();
    }

    pub fn set_position(&mut self, paddle: usize, value: u8) {
        match paddle {
            0 => self.pos_1 = value,
            1 => self.pos_2 = value,
            _ => panic!("invalid paddle {}", paddle),
        }
        self.update_lines();
    }

    pub fn set_button(&mut self, paddle: usize, pressed: bool) {
        match paddle {
            0 => self.button_1 = pressed,
            1 => self.button_2 = pressed,
            _ => panic!("invalid paddle {}", paddle),
        }
        self.update_lines();
    }

    fn update_lines(&mut self) {
        self.pot_x.set(self.pos_1);
        self.pot_y.set(self.pos_2);
        let mut state = 0u8;
        // paddle buttons appear on the left/right joystick lines
        state.set_bit(2, self.button_1);
        state.set_bit(3, self.button_2);
        self.port_state.set(state);
    }
}
