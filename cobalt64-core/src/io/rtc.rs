// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use crate::util::{StateReader, StateWriter};
use crate::Error;

/// CIA time-of-day counter: tenths, seconds, minutes and a 12-hour clock
/// with an AM/PM flag. Reading the hours register freezes the read view
/// until the tenths register is read; writing the hours register stops the
/// clock until tenths are written.
pub struct Rtc {
    running: bool,
    hours: u8,
    minutes: u8,
    seconds: u8,
    tenth: u8,
    pm: bool,
    latch: Option<(u8, u8, u8, u8, bool)>,
}

impl Rtc {
    pub fn new() -> Rtc {
        Rtc {
            running: true,
            hours: 0,
            minutes: 0,
            seconds: 0,
            tenth: 0,
            pm: false,
            latch: None,
        }
    }

    pub fn get_hours(&self) -> u8 {
        self.latch.map_or(self.hours, |l| l.0)
    }

    pub fn get_minutes(&self) -> u8 {
        self.latch.map_or(self.minutes, |l| l.1)
    }

    pub fn get_seconds(&self) -> u8 {
        self.latch.map_or(self.seconds, |l| l.2)
    }

    pub fn get_tenth(&self) -> u8 {
        self.latch.map_or(self.tenth, |l| l.3)
    }

    pub fn get_pm(&self) -> bool {
        self.latch.map_or(self.pm, |l| l.4)
    }

    pub fn latch(&mut self) {
        self.latch = Some((self.hours, self.minutes, self.seconds, self.tenth, self.pm));
    }

    pub fn unlatch(&mut self) {
        self.latch = None;
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn set_hours(&mut self, value: u8) {
        self.hours = value;
    }

    pub fn set_minutes(&mut self, value: u8) {
        self.minutes = value;
    }

    pub fn set_seconds(&mut self, value: u8) {
        self.seconds = value;
    }

    pub fn set_tenth(&mut self, value: u8) {
        self.tenth = value;
    }

    pub fn set_pm(&mut self, pm: bool) {
        self.pm = pm;
    }

    pub fn reset(&mut self) {
        self.running = true;
        self.hours = 0;
        self.minutes = 0;
        self.seconds = 0;
        self.tenth = 0;
        self.pm = false;
        self.latch = None;
    }

    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        self.tenth += 1;
        if self.tenth == 10 {
            self.tenth = 0;
            self.seconds += 1;
            if self.seconds == 60 {
                self.seconds = 0;
                self.minutes += 1;
                if self.minutes == 60 {
                    self.minutes = 0;
                    self.hours += 1;
                    if self.hours == 12 {
                        self.pm = !self.pm;
                    }
                    if self.hours == 13 {
                        self.hours = 1;
                    }
                }
            }
        }
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_bool(self.running);
        writer.write_u8(self.hours);
        writer.write_u8(self.minutes);
        writer.write_u8(self.seconds);
        writer.write_u8(self.tenth);
        writer.write_bool(self.pm);
    }

    pub fn restore_state(&mut self, reader: &mut StateReader) -> Result<(), Error> {
        self.running = reader.read_bool()?;
        self.hours = reader.read_u8()?;
        self.minutes = reader.read_u8()?;
        self.seconds = reader.read_u8()?;
        self.tenth = reader.read_u8()?;
        self.pm = reader.read_bool()?;
        self.latch = None;
        Ok(())
    }
}

impl PartialEq for Rtc {
    fn eq(&self, other: &Rtc) -> bool {
        self.hours == other.hours
            && self.minutes == other.minutes
            && self.seconds == other.seconds
            && self.tenth == other.tenth
            && self.pm == other.pm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_rollover() {
        let mut rtc = Rtc::new();
        rtc.set_hours(11);
        rtc.set_minutes(59);
        rtc.set_seconds(59);
        rtc.set_tenth(9);
        rtc.tick();
        assert_eq!(12, rtc.get_hours());
        assert_eq!(0, rtc.get_minutes());
        assert_eq!(0, rtc.get_seconds());
        assert_eq!(0, rtc.get_tenth());
        assert_eq!(true, rtc.get_pm());
    }

    #[test]
    fn latch_freezes_view() {
        let mut rtc = Rtc::new();
        rtc.latch();
        rtc.tick();
        assert_eq!(0, rtc.get_tenth());
        rtc.unlatch();
        assert_eq!(1, rtc.get_tenth());
    }
}
