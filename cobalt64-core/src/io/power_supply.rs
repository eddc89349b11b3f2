// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use crate::factory::PowerGrid;

/// Models the power-grid reference that clocks the CIA TOD counters. The
/// unstable variants add a small deterministic jitter to every tick so that
/// software relying on a perfectly clean grid reference can be tested
/// against a noisy one.
pub struct PowerSupply {
    grid: PowerGrid,
    cpu_freq: u32,
    noise: u64,
}

impl PowerSupply {
    pub fn new(grid: PowerGrid, cpu_freq: u32) -> Self {
        Self {
            grid,
            cpu_freq,
            noise: 0x2545_f491_4f6c_dd1d,
        }
    }

    pub fn set_grid(&mut self, grid: PowerGrid) {
        self.grid = grid;
    }

    /// Number of CPU cycles between two TOD tenth increments. `todin_60hz`
    /// reflects the inverse of CRA bit 7: the CIA divides its TOD input by 6
    /// when a 60 Hz reference is selected and by 5 for 50 Hz.
    pub fn tod_tick_delay(&mut self, todin_60hz: bool) -> u64 {
        let freq = u64::from(self.cpu_freq);
        let delay = match self.grid.frequency() {
            50 => {
                if todin_60hz {
                    freq * 6 / 50
                } else {
                    freq / 10
                }
            }
            _ => {
                if todin_60hz {
                    freq / 10
                } else {
                    freq * 5 / 60
                }
            }
        };
        if self.grid.is_stable() {
            delay
        } else {
            let jitter = (self.next_noise() % 1000) as i64 - 500;
            (delay as i64 + jitter) as u64
        }
    }

    fn next_noise(&mut self) -> u64 {
        // xorshift64, deterministic across runs
        let mut x = self.noise;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.noise = x;
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_grid_has_no_jitter() {
        let mut psu = PowerSupply::new(PowerGrid::Stable50Hz, 985_248);
        let d1 = psu.tod_tick_delay(false);
        let d2 = psu.tod_tick_delay(false);
        assert_eq!(d1, d2);
        assert_eq!(985_248 / 10, d1);
    }

    #[test]
    fn sixty_hz_input_divides_by_six() {
        let mut psu = PowerSupply::new(PowerGrid::Stable50Hz, 985_248);
        assert_eq!(985_248 * 6 / 50, psu.tod_tick_delay(true));
    }

    #[test]
    fn unstable_grid_jitters_within_bounds() {
        let mut psu = PowerSupply::new(PowerGrid::Unstable50Hz, 985_248);
        let nominal = 985_248i64 / 10;
        for _ in 0..100 {
            let delay = psu.tod_tick_delay(false) as i64;
            assert!((delay - nominal).abs() <= 500);
        }
    }
}
