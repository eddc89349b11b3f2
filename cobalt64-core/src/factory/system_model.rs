// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

/*
          | Video  | # of  | Visible | Cycles/ |  Visible
   Type   | system | lines |  lines  |  line   | pixels/line
 ---------+--------+-------+---------+---------+------------
 6567R56A | NTSC-M |  262  |   234   |   64    |    411
  6567R8  | NTSC-M |  263  |   235   |   65    |    418
   6569   |  PAL-B |  312  |   284   |   63    |    403
*/

/// VIC revision. The revision selects the raster geometry, the luminance
/// profile and a couple of visible hardware quirks.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum VicModel {
    Pal6569R1,
    Pal6569R3,
    Pal8565,
    Ntsc6567,
    Ntsc6567R56A,
    Ntsc8562,
}

impl VicModel {
    pub fn from(model: &str) -> VicModel {
        match model {
            "6569" | "6569r1" => VicModel::Pal6569R1,
            "6569r3" => VicModel::Pal6569R3,
            "8565" => VicModel::Pal8565,
            "6567" => VicModel::Ntsc6567,
            "6567r56a" => VicModel::Ntsc6567R56A,
            "8562" => VicModel::Ntsc8562,
            _ => panic!("invalid vic model {}", model),
        }
    }

    pub fn is_pal(self) -> bool {
        match self {
            VicModel::Pal6569R1 | VicModel::Pal6569R3 | VicModel::Pal8565 => true,
            _ => false,
        }
    }

    /// Accessing a color register in the cycle its value is sent out
    /// produces a visible gray dot on the newer chip revisions.
    pub fn has_gray_dot_bug(self) -> bool {
        match self {
            VicModel::Pal8565 | VicModel::Ntsc8562 => true,
            _ => false,
        }
    }

    pub fn raster_lines(self) -> u16 {
        match self {
            VicModel::Ntsc6567R56A => 262,
            VicModel::Ntsc6567 | VicModel::Ntsc8562 => 263,
            _ => 312,
        }
    }

    pub fn cycles_per_line(self) -> u16 {
        match self {
            VicModel::Ntsc6567R56A => 64,
            VicModel::Ntsc6567 | VicModel::Ntsc8562 => 65,
            _ => 63,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SidModel {
    Mos6581,
    Mos8580,
}

impl SidModel {
    pub fn from(model: &str) -> SidModel {
        match model {
            "6581" => SidModel::Mos6581,
            "8580" => SidModel::Mos8580,
            _ => panic!("invalid sid model {}", model),
        }
    }
}

/// The original 6526 delays the interrupt one cycle behind a timer
/// underflow; the 8521 raises it in the same cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CiaModel {
    Mos6526,
    Mos8521,
}

impl CiaModel {
    pub fn from(model: &str) -> CiaModel {
        match model {
            "6526" => CiaModel::Mos6526,
            "8521" => CiaModel::Mos8521,
            _ => panic!("invalid cia model {}", model),
        }
    }
}

/// Shape of the power-grid reference that clocks the CIA TOD counters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PowerGrid {
    Stable50Hz,
    Unstable50Hz,
    Stable60Hz,
    Unstable60Hz,
}

impl PowerGrid {
    pub fn frequency(self) -> u32 {
        match self {
            PowerGrid::Stable50Hz | PowerGrid::Unstable50Hz => 50,
            PowerGrid::Stable60Hz | PowerGrid::Unstable60Hz => 60,
        }
    }

    pub fn is_stable(self) -> bool {
        match self {
            PowerGrid::Stable50Hz | PowerGrid::Stable60Hz => true,
            _ => false,
        }
    }
}

/// Discrete glue logic (early boards) updates the VIC address lines half a
/// cycle later than the integrated version.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GlueLogic {
    Discrete,
    Ic,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DriveModel {
    Vc1541,
    Vc1541C,
    Vc1541II,
}

#[derive(Clone)]
pub struct SystemModel {
    pub color_ram: usize,
    pub cpu_freq: u32,
    pub drive_freq: u32,
    pub cycles_per_frame: u32,
    pub frame_buffer_size: (usize, usize),
    pub memory_size: usize,
    pub refresh_rate: f64,
    pub cia_model: CiaModel,
    pub power_grid: PowerGrid,
    pub sid_model: SidModel,
    pub vic_model: VicModel,
}

impl SystemModel {
    pub fn from(model: &str) -> SystemModel {
        match model {
            "ntsc" | "c64-ntsc" => SystemModel::c64_ntsc(),
            "pal" | "c64-pal" => SystemModel::c64_pal(),
            _ => panic!("invalid model {}", model),
        }
    }

    pub fn c64_ntsc() -> SystemModel {
        let vic_model = VicModel::Ntsc6567;
        SystemModel {
            color_ram: 1024,
            cpu_freq: 1_022_727,
            drive_freq: 1_000_000,
            cycles_per_frame: u32::from(vic_model.cycles_per_line())
                * u32::from(vic_model.raster_lines()),
            frame_buffer_size: (520, 263),
            memory_size: 65536,
            refresh_rate: 59.826,
            cia_model: CiaModel::Mos6526,
            power_grid: PowerGrid::Stable60Hz,
            sid_model: SidModel::Mos6581,
            vic_model,
        }
    }

    pub fn c64_pal() -> SystemModel {
        let vic_model = VicModel::Pal6569R3;
        SystemModel {
            color_ram: 1024,
            cpu_freq: 985_248,
            drive_freq: 1_000_000,
            cycles_per_frame: u32::from(vic_model.cycles_per_line())
                * u32::from(vic_model.raster_lines()),
            frame_buffer_size: (520, 312),
            memory_size: 65536,
            // The PAL grid actually runs a shade above 50 Hz.
            refresh_rate: 50.125,
            cia_model: CiaModel::Mos6526,
            power_grid: PowerGrid::Stable50Hz,
            sid_model: SidModel::Mos6581,
            vic_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pal_frame_cycles() {
        let model = SystemModel::c64_pal();
        assert_eq!(63 * 312, model.cycles_per_frame);
    }

    #[test]
    fn ntsc_frame_cycles() {
        let model = SystemModel::c64_ntsc();
        assert_eq!(65 * 263, model.cycles_per_frame);
    }

    #[test]
    fn gray_dot_revisions() {
        assert!(VicModel::Pal8565.has_gray_dot_bug());
        assert!(VicModel::Ntsc8562.has_gray_dot_bug());
        assert!(!VicModel::Pal6569R3.has_gray_dot_bug());
        assert!(!VicModel::Ntsc6567.has_gray_dot_bug());
    }
}
