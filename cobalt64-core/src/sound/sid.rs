// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;
use std::sync::Arc;

use log::Level;
use resid;

use crate::factory::{Chip, SidModel, SoundOutput};
use crate::util::{Clock, SharedCell, StateReader, StateWriter};
use crate::Error;

// Design:
//   The synthesis core is the reSID model. Since sample generation may be
//   deferred to v-sync, the system clock is used to bring the synthesizer
//   up to the current cycle whenever a register is touched. The analog POT
//   inputs come from the control ports (paddles, 1351 mouse); a register
//   shadow keeps the audible state restorable from snapshots.

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SamplingMethod {
    Fast,
    Interpolate,
    Resample,
    ResampleFast,
}

pub struct Sid {
    // Dependencies
    system_clock: Rc<Clock>,
    sound_buffer: Arc<dyn SoundOutput>,
    // Functional units
    resid: resid::Sid,
    // Runtime state
    reg_shadow: [u8; 25],
    buffer: [i16; 8192],
    cycles: u64,
    // I/O
    pot_x: SharedCell<u8>,
    pot_y: SharedCell<u8>,
}

impl Sid {
    pub fn new(
        chip_model: SidModel,
        system_clock: Rc<Clock>,
        pot_x: SharedCell<u8>,
        pot_y: SharedCell<u8>,
        sound_buffer: Arc<dyn SoundOutput>,
    ) -> Self {
        info!(target: "sound", "Initializing SID");
        let resid_model = match chip_model {
            SidModel::Mos6581 => resid::ChipModel::Mos6581,
            SidModel::Mos8580 => resid::ChipModel::Mos8580,
        };
        let resid = resid::Sid::new(resid_model);
        Sid {
            system_clock,
            sound_buffer,
            resid,
            reg_shadow: [0; 25],
            buffer: [0i16; 8192],
            cycles: 0,
            pot_x,
            pot_y,
        }
    }

    pub fn enable_filter(&mut self, enabled: bool) {
        self.resid.enable_filter(enabled);
    }

    pub fn set_sampling_parameters(
        &mut self,
        sampling_method: SamplingMethod,
        clock_freq: u32,
        sample_freq: u32,
    ) {
        let resid_sampling_method = match sampling_method {
            SamplingMethod::Fast => resid::SamplingMethod::Fast,
            SamplingMethod::Interpolate => resid::SamplingMethod::Interpolate,
            SamplingMethod::Resample => resid::SamplingMethod::Resample,
            SamplingMethod::ResampleFast => resid::SamplingMethod::ResampleFast,
        };
        self.resid
            .set_sampling_parameters(resid_sampling_method, clock_freq, sample_freq);
    }

    fn sync(&mut self) {
        if self.cycles != self.system_clock.get() {
            let delta = (self.system_clock.get() - self.cycles) as u32;
            self.clock_delta(delta);
        }
    }
}

impl Chip for Sid {
    fn clock(&mut self) {
        self.resid.clock();
        self.cycles = self.cycles.wrapping_add(1);
    }

    fn clock_delta(&mut self, delta: u32) {
        if delta > 0 {
            let mut delta = delta;
            while delta > 0 {
                let (samples, next_delta) = self.resid.sample(delta, &mut self.buffer[..], 1);
                self.sound_buffer.write(&self.buffer[0..samples]);
                delta = next_delta;
            }
        }
        self.cycles = self.cycles.wrapping_add(u64::from(delta));
    }

    fn process_vsync(&mut self) {
        self.sync();
    }

    fn reset(&mut self) {
        self.resid.reset();
        self.reg_shadow = [0; 25];
        self.cycles = self.system_clock.get();
    }

    // I/O

    fn read(&mut self, reg: u8) -> u8 {
        match reg {
            // POT lines are sampled from the control ports
            0x19 => self.pot_x.get(),
            0x1a => self.pot_y.get(),
            _ => {
                self.sync();
                self.resid.read(reg)
            }
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(Level::Trace) {
            trace!(target: "sid::reg", "Write 0x{:02x} = 0x{:02x}", reg, value);
        }
        self.sync();
        if (reg as usize) < self.reg_shadow.len() {
            self.reg_shadow[reg as usize] = value;
        }
        self.resid.write(reg, value)
    }

    // State

    fn save_state(&self, writer: &mut StateWriter) {
        for value in self.reg_shadow.iter() {
            writer.write_u8(*value);
        }
        writer.write_u64(self.cycles);
    }

    fn restore_state(&mut self, reader: &mut StateReader) -> Result<(), Error> {
        self.resid.reset();
        for i in 0..self.reg_shadow.len() {
            let value = reader.read_u8()?;
            self.reg_shadow[i] = value;
            self.resid.write(i as u8, value);
        }
        self.cycles = reader.read_u64()?;
        Ok(())
    }
}
