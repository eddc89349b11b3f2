// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::{IrqLine, Shared};

// SPEC: https://www.c64-wiki.com/index.php/Keyboard#Hardware
//
// The matrix array holds both orientations: entries 0-7 are the column
// states per selected row, entries 8-15 the row states per selected column.
// A pressed key shorts its row to its column on both sides, so rows that
// share a pressed column become electrically connected and their other
// pressed keys ghost through; the rebuild pass below propagates this to a
// fixed point.

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Key {
    // Numerical
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    // Alpha
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    // Symbols
    Asterisk,
    At,
    Backspace,
    Caret,
    Colon,
    Comma,
    Equals,
    Minus,
    Period,
    Plus,
    Pound,
    Return,
    Semicolon,
    Slash,
    Space,
    // Control
    CrsrDown,
    CrsrRight,
    Ctrl,
    Home,
    Left,
    LGui,
    LShift,
    Restore,
    RunStop,
    RShift,
    // Function
    F1,
    F3,
    F5,
    F7,
}

#[derive(Copy, Clone, Debug)]
pub struct KeyEvent {
    keycode: Key,
    modifier: Option<Key>,
    disable_shift: bool,
}

impl KeyEvent {
    pub fn new(keycode: Key) -> Self {
        Self {
            keycode,
            modifier: None,
            disable_shift: false,
        }
    }

    pub fn with_disabled_shift(keycode: Key) -> KeyEvent {
        KeyEvent {
            keycode,
            modifier: None,
            disable_shift: true,
        }
    }

    pub fn with_mod(keycode: Key, modifier: Key) -> KeyEvent {
        KeyEvent {
            keycode,
            modifier: Some(modifier),
            disable_shift: false,
        }
    }

    pub fn keycode(&self) -> Key {
        self.keycode
    }
}

pub struct Keyboard {
    matrix: Shared<[u8; 16]>,
    pressed: [u8; 8],
    queue: Vec<(KeyEvent, bool, u32)>,
    disabled_shift: u8,
    nmi_line: Shared<IrqLine>,
    restore_down: bool,
}

mod nmi_source {
    pub const RESTORE: usize = 2;
}

impl Keyboard {
    pub fn new(matrix: Shared<[u8; 16]>, nmi_line: Shared<IrqLine>) -> Self {
        Self {
            matrix,
            pressed: [0; 8],
            queue: Vec::new(),
            disabled_shift: 0,
            nmi_line,
            restore_down: false,
        }
    }

    pub fn get_col(&self, col: u8) -> u8 {
        self.matrix.borrow()[8 + col as usize]
    }

    pub fn get_row(&self, row: u8) -> u8 {
        self.matrix.borrow()[row as usize]
    }

    pub fn has_events(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Apply the next scheduled key event; pending delays count down one
    /// step per call.
    pub fn drain_event(&mut self) {
        if let Some(first) = self.queue.first_mut() {
            if first.2 > 0 {
                first.2 -= 1;
                return;
            }
            let (key_event, pressed, _) = self.queue.remove(0);
            if pressed {
                self.on_key_down(key_event)
            } else {
                self.on_key_up(key_event)
            }
        }
    }

    pub fn enqueue(&mut self, text: &str) {
        for c in text.chars() {
            let key_event = self.map_char(c);
            self.queue.push((key_event, true, 1));
            self.queue.push((key_event, false, 1));
        }
    }

    pub fn schedule(&mut self, event: KeyEvent, pressed: bool, delay: u32) {
        self.queue.push((event, pressed, delay));
    }

    pub fn reset(&mut self) {
        self.pressed = [0; 8];
        self.queue.clear();
        self.disabled_shift = 0;
        self.restore_down = false;
        self.rebuild_matrix();
    }

    pub fn release_all(&mut self) {
        self.pressed = [0; 8];
        self.queue.clear();
        self.disabled_shift = 0;
        self.set_restore(false);
        self.rebuild_matrix();
    }

    pub fn set_key(&mut self, keycode: Key, enabled: bool) {
        if keycode == Key::Restore {
            self.set_restore(enabled);
            return;
        }
        let (row, col) = self.map_keycode(keycode);
        self.pressed[row].set_bit(col, enabled);
        self.rebuild_matrix();
    }

    pub fn is_pressed(&self, keycode: Key) -> bool {
        if keycode == Key::Restore {
            return self.restore_down;
        }
        let (row, col) = self.map_keycode(keycode);
        self.pressed[row].get_bit(col)
    }

    fn set_restore(&mut self, enabled: bool) {
        if enabled != self.restore_down {
            self.restore_down = enabled;
            self.nmi_line
                .borrow_mut()
                .set_low(nmi_source::RESTORE, enabled);
        }
    }

    fn rebuild_matrix(&mut self) {
        // propagate row connections through shared pressed columns
        let mut rows = self.pressed;
        loop {
            let mut changed = false;
            for r1 in 0..8 {
                for r2 in (r1 + 1)..8 {
                    if rows[r1] & rows[r2] != 0 {
                        let merged = rows[r1] | rows[r2];
                        if merged != rows[r1] || merged != rows[r2] {
                            rows[r1] = merged;
                            rows[r2] = merged;
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        let mut matrix = self.matrix.borrow_mut();
        for row in 0..8 {
            matrix[row] = !rows[row];
        }
        for col in 0..8 {
            let mut value = 0xffu8;
            for row in 0..8 {
                if rows[row].get_bit(col) {
                    value.set_bit(row, false);
                }
            }
            matrix[8 + col] = value;
        }
    }

    // -- Event handlers

    pub fn on_key_down(&mut self, event: KeyEvent) {
        self.set_key(event.keycode, true);
        if let Some(modifier) = event.modifier {
            self.set_key(modifier, true);
        }
        if event.disable_shift {
            if self.is_pressed(Key::LShift) {
                self.set_key(Key::LShift, false);
                self.disabled_shift.set_bit(0, true);
            }
            if self.is_pressed(Key::RShift) {
                self.set_key(Key::RShift, false);
                self.disabled_shift.set_bit(1, true);
            }
        }
    }

    pub fn on_key_up(&mut self, event: KeyEvent) {
        self.set_key(event.keycode, false);
        if let Some(modifier) = event.modifier {
            self.set_key(modifier, false);
        }
        if event.disable_shift {
            if self.disabled_shift.get_bit(0) {
                self.set_key(Key::LShift, true);
            }
            if self.disabled_shift.get_bit(1) {
                self.set_key(Key::RShift, true);
            }
            self.disabled_shift = 0;
        }
    }

    // -- State

    pub fn save_state(&self, writer: &mut crate::util::StateWriter) {
        for row in self.pressed.iter() {
            writer.write_u8(*row);
        }
        writer.write_bool(self.restore_down);
    }

    pub fn restore_state(
        &mut self,
        reader: &mut crate::util::StateReader,
    ) -> Result<(), crate::Error> {
        for row in 0..8 {
            self.pressed[row] = reader.read_u8()?;
        }
        let restore_down = reader.read_bool()?;
        self.set_restore(restore_down);
        self.queue.clear();
        self.disabled_shift = 0;
        self.rebuild_matrix();
        Ok(())
    }

    // -- Mapping ops

    fn map_char(&self, c: char) -> KeyEvent {
        match c {
            '\n' => KeyEvent::new(Key::Return),
            ' ' => KeyEvent::new(Key::Space),
            '!' => KeyEvent::with_mod(Key::Num1, Key::LShift),
            '"' => KeyEvent::with_mod(Key::Num2, Key::LShift),
            '#' => KeyEvent::with_mod(Key::Num3, Key::LShift),
            '$' => KeyEvent::with_mod(Key::Num4, Key::LShift),
            '%' => KeyEvent::with_mod(Key::Num5, Key::LShift),
            '&' => KeyEvent::with_mod(Key::Num6, Key::LShift),
            '\'' => KeyEvent::with_mod(Key::Num7, Key::LShift),
            '(' => KeyEvent::with_mod(Key::Num8, Key::LShift),
            ')' => KeyEvent::with_mod(Key::Num9, Key::LShift),
            '*' => KeyEvent::new(Key::Asterisk),
            '+' => KeyEvent::new(Key::Plus),
            ',' => KeyEvent::new(Key::Comma),
            '-' => KeyEvent::new(Key::Minus),
            '.' => KeyEvent::new(Key::Period),
            '/' => KeyEvent::new(Key::Slash),
            '0' => KeyEvent::new(Key::Num0),
            '1' => KeyEvent::new(Key::Num1),
            '2' => KeyEvent::new(Key::Num2),
            '3' => KeyEvent::new(Key::Num3),
            '4' => KeyEvent::new(Key::Num4),
            '5' => KeyEvent::new(Key::Num5),
            '6' => KeyEvent::new(Key::Num6),
            '7' => KeyEvent::new(Key::Num7),
            '8' => KeyEvent::new(Key::Num8),
            '9' => KeyEvent::new(Key::Num9),
            ':' => KeyEvent::new(Key::Colon),
            ';' => KeyEvent::new(Key::Semicolon),
            '<' => KeyEvent::with_mod(Key::Comma, Key::LShift),
            '=' => KeyEvent::new(Key::Equals),
            '>' => KeyEvent::with_mod(Key::Period, Key::LShift),
            '?' => KeyEvent::with_mod(Key::Slash, Key::LShift),
            '@' => KeyEvent::new(Key::At),
            'a'..='z' => self.map_alpha(c),
            'A'..='Z' => {
                let lower = (c as u8 + 0x20) as char;
                let base = self.map_alpha(lower);
                KeyEvent::with_mod(base.keycode, Key::LShift)
            }
            '[' => KeyEvent::with_mod(Key::Colon, Key::LShift),
            ']' => KeyEvent::with_mod(Key::Semicolon, Key::LShift),
            '^' => KeyEvent::new(Key::Caret),
            _ => panic!("unsupported char {}", c),
        }
    }

    fn map_alpha(&self, c: char) -> KeyEvent {
        let keycode = match c {
            'a' => Key::A,
            'b' => Key::B,
            'c' => Key::C,
            'd' => Key::D,
            'e' => Key::E,
            'f' => Key::F,
            'g' => Key::G,
            'h' => Key::H,
            'i' => Key::I,
            'j' => Key::J,
            'k' => Key::K,
            'l' => Key::L,
            'm' => Key::M,
            'n' => Key::N,
            'o' => Key::O,
            'p' => Key::P,
            'q' => Key::Q,
            'r' => Key::R,
            's' => Key::S,
            't' => Key::T,
            'u' => Key::U,
            'v' => Key::V,
            'w' => Key::W,
            'x' => Key::X,
            'y' => Key::Y,
            'z' => Key::Z,
            _ => panic!("unsupported char {}", c),
        };
        KeyEvent::new(keycode)
    }

    fn map_keycode(&self, keycode: Key) -> (usize, usize) {
        match keycode {
            Key::Backspace => (0, 0),
            Key::Return => (0, 1),
            Key::CrsrRight => (0, 2),
            Key::F7 => (0, 3),
            Key::F1 => (0, 4),
            Key::F3 => (0, 5),
            Key::F5 => (0, 6),
            Key::CrsrDown => (0, 7),
            Key::Num3 => (1, 0),
            Key::W => (1, 1),
            Key::A => (1, 2),
            Key::Num4 => (1, 3),
            Key::Z => (1, 4),
            Key::S => (1, 5),
            Key::E => (1, 6),
            Key::LShift => (1, 7),
            Key::Num5 => (2, 0),
            Key::R => (2, 1),
            Key::D => (2, 2),
            Key::Num6 => (2, 3),
            Key::C => (2, 4),
            Key::F => (2, 5),
            Key::T => (2, 6),
            Key::X => (2, 7),
            Key::Num7 => (3, 0),
            Key::Y => (3, 1),
            Key::G => (3, 2),
            Key::Num8 => (3, 3),
            Key::B => (3, 4),
            Key::H => (3, 5),
            Key::U => (3, 6),
            Key::V => (3, 7),
            Key::Num9 => (4, 0),
            Key::I => (4, 1),
            Key::J => (4, 2),
            Key::Num0 => (4, 3),
            Key::M => (4, 4),
            Key::K => (4, 5),
            Key::O => (4, 6),
            Key::N => (4, 7),
            Key::Plus => (5, 0),
            Key::P => (5, 1),
            Key::L => (5, 2),
            Key::Minus => (5, 3),
            Key::Period => (5, 4),
            Key::Colon => (5, 5),
            Key::At => (5, 6),
            Key::Comma => (5, 7),
            Key::Pound => (6, 0),
            Key::Asterisk => (6, 1),
            Key::Semicolon => (6, 2),
            Key::Home => (6, 3),
            Key::RShift => (6, 4),
            Key::Equals => (6, 5),
            Key::Caret => (6, 6),
            Key::Slash => (6, 7),
            Key::Num1 => (7, 0),
            Key::Left => (7, 1),
            Key::Ctrl => (7, 2),
            Key::Num2 => (7, 3),
            Key::Space => (7, 4),
            Key::LGui => (7, 5),
            Key::Q => (7, 6),
            Key::RunStop => (7, 7),
            Key::Restore => panic!("restore is not part of the matrix"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared;

    fn setup_keyboard() -> Keyboard {
        let matrix = new_shared([0xff; 16]);
        let nmi = new_shared(IrqLine::new("nmi"));
        let mut keyboard = Keyboard::new(matrix, nmi);
        keyboard.reset();
        keyboard
    }

    #[test]
    fn set_key_clears_matrix_bit() {
        let mut keyboard = setup_keyboard();
        keyboard.set_key(Key::A, true);
        assert_eq!(0xfb, keyboard.get_row(1));
        assert_eq!(0xfd, keyboard.get_col(2));
        keyboard.set_key(Key::A, false);
        assert_eq!(0xff, keyboard.get_row(1));
    }

    #[test]
    fn ghosting_connects_rows() {
        let mut keyboard = setup_keyboard();
        // A (row 1/col 2), D (row 2/col 2) and C (row 2/col 4) share wiring:
        // selecting row 1 must also show C through the row 1/2 short.
        keyboard.set_key(Key::A, true);
        keyboard.set_key(Key::D, true);
        keyboard.set_key(Key::C, true);
        assert_eq!(keyboard.get_row(1), keyboard.get_row(2));
        assert!(!keyboard.get_row(1).get_bit(4));
    }

    #[test]
    fn restore_pulls_nmi() {
        let mut keyboard = setup_keyboard();
        keyboard.set_key(Key::Restore, true);
        assert!(keyboard.nmi_line.borrow().is_low());
        keyboard.set_key(Key::Restore, false);
        assert!(!keyboard.nmi_line.borrow().is_low());
    }

    #[test]
    fn delayed_events_wait() {
        let mut keyboard = setup_keyboard();
        keyboard.schedule(KeyEvent::new(Key::Q), true, 2);
        keyboard.drain_event();
        keyboard.drain_event();
        assert!(!keyboard.is_pressed(Key::Q));
        keyboard.drain_event();
        assert!(keyboard.is_pressed(Key::Q));
    }
}
