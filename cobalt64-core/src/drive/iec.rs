// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// Four open-collector lines: ATN, CLK, DATA, SRQ. Every participant can
// independently pull a line low; a line reads high only while nobody does.
// Participant 0 is the computer, 1 and 2 the two drives.

pub const HOST: usize = 0;

const PARTICIPANTS: usize = 3;

pub struct IecBus {
    atn_pulls: [bool; PARTICIPANTS],
    clk_pulls: [bool; PARTICIPANTS],
    data_pulls: [bool; PARTICIPANTS],
    srq_pulls: [bool; PARTICIPANTS],
}

impl IecBus {
    pub fn new() -> Self {
        Self {
            atn_pulls: [false; PARTICIPANTS],
            clk_pulls: [false; PARTICIPANTS],
            data_pulls: [false; PARTICIPANTS],
            srq_pulls: [false; PARTICIPANTS],
        }
    }

    pub fn reset(&mut self) {
        self.atn_pulls = [false; PARTICIPANTS];
        self.clk_pulls = [false; PARTICIPANTS];
        self.data_pulls = [false; PARTICIPANTS];
        self.srq_pulls = [false; PARTICIPANTS];
    }

    pub fn set_atn(&mut self, participant: usize, pull_low: bool) {
        self.atn_pulls[participant] = pull_low;
    }

    pub fn set_clk(&mut self, participant: usize, pull_low: bool) {
        self.clk_pulls[participant] = pull_low;
    }

    pub fn set_data(&mut self, participant: usize, pull_low: bool) {
        self.data_pulls[participant] = pull_low;
    }

    pub fn set_srq(&mut self, participant: usize, pull_low: bool) {
        self.srq_pulls[participant] = pull_low;
    }

    // Line states: true = high, false = low.

    pub fn atn(&self) -> bool {
        !self.atn_pulls.iter().any(|pull| *pull)
    }

    pub fn clk(&self) -> bool {
        !self.clk_pulls.iter().any(|pull| *pull)
    }

    pub fn data(&self) -> bool {
        !self.data_pulls.iter().any(|pull| *pull)
    }

    pub fn srq(&self) -> bool {
        !self.srq_pulls.iter().any(|pull| *pull)
    }
}

impl Default for IecBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_start_high() {
        let bus = IecBus::new();
        assert!(bus.atn());
        assert!(bus.clk());
        assert!(bus.data());
        assert!(bus.srq());
    }

    #[test]
    fn wired_and_across_participants() {
        let mut bus = IecBus::new();
        bus.set_clk(0, true);
        bus.set_clk(1, true);
        assert!(!bus.clk());
        bus.set_clk(0, false);
        assert!(!bus.clk());
        bus.set_clk(1, false);
        assert!(bus.clk());
    }

    #[test]
    fn lines_are_independent() {
        let mut bus = IecBus::new();
        bus.set_atn(0, true);
        bus.set_data(2, true);
        assert!(!bus.atn());
        assert!(bus.clk());
        assert!(!bus.data());
    }
}
