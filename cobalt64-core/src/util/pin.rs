// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[derive(Clone, Copy, PartialEq)]
enum State {
    High,
    Low,
}

/// A single chip pin with edge detection across the last transition.
pub struct Pin {
    state: State,
    last: State,
}

impl Pin {
    pub fn new_high() -> Pin {
        Pin {
            state: State::High,
            last: State::High,
        }
    }

    pub fn new_low() -> Pin {
        Pin {
            state: State::Low,
            last: State::Low,
        }
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.last == State::High && self.state == State::Low
    }

    #[inline]
    pub fn is_high(&self) -> bool {
        self.state == State::High
    }

    #[inline]
    pub fn is_low(&self) -> bool {
        self.state == State::Low
    }

    #[inline]
    pub fn is_rising(&self) -> bool {
        self.last == State::Low && self.state == State::High
    }

    #[inline]
    pub fn set_active(&mut self, active: bool) {
        if active {
            self.set(State::High);
        } else {
            self.set(State::Low);
        }
    }

    #[inline]
    fn set(&mut self, state: State) {
        self.last = self.state;
        self.state = state;
    }
}
