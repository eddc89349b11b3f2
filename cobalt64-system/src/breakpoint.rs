// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use cobalt64_core::factory::Cpu;

pub struct Breakpoint {
    pub index: u16,
    pub address: u16,
    pub enabled: bool,
    ignore: u16,
    /// Soft breakpoints delete themselves when reached.
    autodelete: bool,
}

pub struct BreakpointManager {
    breakpoints: Vec<Breakpoint>,
    bp_index: u16,
}

impl BreakpointManager {
    pub fn new() -> Self {
        Self {
            breakpoints: Vec::new(),
            bp_index: 1,
        }
    }

    /// Check whether the CPU sits on an armed breakpoint; returns the
    /// matched address. Soft breakpoints are removed by the hit.
    pub fn check(&mut self, cpu: &dyn Cpu) -> Option<u16> {
        if self.breakpoints.is_empty() {
            return None;
        }
        let pc = cpu.get_pc();
        let bp_pos = self.breakpoints.iter_mut().position(|bp| {
            if bp.address == pc && bp.enabled {
                if bp.ignore == 0 {
                    true
                } else {
                    bp.ignore -= 1;
                    false
                }
            } else {
                false
            }
        });
        if let Some(pos) = bp_pos {
            let address = self.breakpoints[pos].address;
            if self.breakpoints[pos].autodelete {
                self.breakpoints.remove(pos);
            }
            Some(address)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.breakpoints.clear();
    }

    pub fn enable_all(&mut self, enabled: bool) {
        for bp in self.breakpoints.iter_mut() {
            bp.enabled = enabled;
        }
    }

    pub fn get(&self, index: u16) -> Result<&Breakpoint, String> {
        match self.breakpoints.iter().position(|bp| bp.index == index) {
            Some(pos) => Ok(&self.breakpoints[pos]),
            None => Err(format!("Invalid index {}", index)),
        }
    }

    pub fn is_bp_present(&self) -> bool {
        self.breakpoints.iter().any(|bp| bp.enabled)
    }

    pub fn ignore(&mut self, index: u16, count: u16) -> Result<(), String> {
        match self.find_mut(index) {
            Some(bp) => {
                bp.ignore = count;
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    pub fn list(&self) -> std::slice::Iter<'_, Breakpoint> {
        self.breakpoints.iter()
    }

    pub fn remove(&mut self, index: u16) -> Result<(), String> {
        match self.breakpoints.iter().position(|bp| bp.index == index) {
            Some(pos) => {
                self.breakpoints.remove(pos);
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    pub fn set(&mut self, address: u16, autodelete: bool) -> u16 {
        let index = self.bp_index;
        self.breakpoints.push(Breakpoint {
            index,
            address,
            enabled: true,
            ignore: 0,
            autodelete,
        });
        self.bp_index += 1;
        index
    }

    pub fn set_enabled(&mut self, index: u16, enabled: bool) -> Result<(), String> {
        match self.find_mut(index) {
            Some(bp) => {
                bp.enabled = enabled;
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    fn find_mut(&mut self, index: u16) -> Option<&mut Breakpoint> {
        self.breakpoints.iter_mut().find(|bp| bp.index == index)
    }
}

impl Default for BreakpointManager {
    fn default() -> Self {
        Self::new()
    }
}
