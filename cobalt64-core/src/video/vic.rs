// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::Level;

use crate::factory::{Chip, VicModel, VideoOutput};
use crate::util::{IrqControl, IrqLine, Pin, Ram, Shared, SharedCell, StateReader, StateWriter};
use crate::Error;

use super::border_unit::BorderUnit;
use super::gfx_sequencer::{GfxSequencer, Mode};
use super::mux_unit::MuxUnit;
use super::spec::Spec;
use super::sprite_sequencer::SpriteSequencer;
use super::vic_memory::VicMemory;

// Spec: The MOS 6567/6569 video controller (VIC-II) and its application
//       in the Commodore 64 (Christian Bauer)
// Design:
//   One clock() call emulates a single raster cycle: the pixel output of
//   the previous fetch runs through the sequencers while this cycle's
//   memory accesses (refresh, c/g-access, sprite p/s-access) are performed
//   and the BA line for the next cycle is computed. Line and frame
//   bookkeeping (bad lines, sprite DMA windows, border flip flops, raster
//   interrupt) follows the documented per-cycle schedule.

mod irq_source {
    pub const VIC: usize = 1;
}

mod irq_event {
    pub const RASTER: usize = 0;
    pub const SPRITE_DATA: usize = 1;
    pub const SPRITE_SPRITE: usize = 2;
    pub const LIGHTPEN: usize = 3;
}

pub struct Vic {
    // Configuration
    spec: Spec,
    chip_model: VicModel,
    // Functional units
    gfx: GfxSequencer,
    sprites: [SpriteSequencer; 8],
    border: BorderUnit,
    mux: MuxUnit,
    // Memory
    mem: VicMemory,
    color_ram: Shared<Ram>,
    // Control state
    den: bool,
    scroll_x: u8,
    scroll_y: u8,
    video_matrix: u16,
    char_base: u16,
    irq_control: IrqControl,
    raster_compare: u16,
    // Counters
    raster_line: u16,
    cycle: u16,
    vc: u16,
    vc_base: u16,
    rc: u8,
    vmli: usize,
    refresh_counter: u8,
    display_state: bool,
    bad_line: bool,
    den_in_30: bool,
    // Line buffers
    matrix_line: [u8; 40],
    color_line: [u8; 40],
    sprite_ptrs: [u8; 8],
    cleared_d017: u8,
    // Light pen
    lp_x: u8,
    lp_y: u8,
    lp_triggered: bool,
    gray_dot_pending: bool,
    // I/O
    ba_line: Shared<Pin>,
    irq_line: Shared<IrqLine>,
    frame_buffer: Shared<dyn VideoOutput>,
    vsync_flag: SharedCell<bool>,
}

impl Vic {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chip_model: VicModel,
        color_ram: Shared<Ram>,
        mem: VicMemory,
        frame_buffer: Shared<dyn VideoOutput>,
        vsync_flag: SharedCell<bool>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
    ) -> Self {
        info!(target: "video", "Initializing VIC");
        let spec = Spec::new(chip_model);
        Vic {
            spec,
            chip_model,
            gfx: GfxSequencer::new(),
            sprites: [
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
            ],
            border: BorderUnit::new(spec),
            mux: MuxUnit::new(),
            mem,
            color_ram,
            den: false,
            scroll_x: 0,
            scroll_y: 0,
            video_matrix: 0x0400,
            char_base: 0x1000,
            irq_control: IrqControl::default(),
            raster_compare: 0,
            raster_line: 0,
            cycle: 1,
            vc: 0,
            vc_base: 0,
            rc: 0,
            vmli: 0,
            refresh_counter: 0xff,
            display_state: false,
            bad_line: false,
            den_in_30: false,
            matrix_line: [0; 40],
            color_line: [0; 40],
            sprite_ptrs: [0; 8],
            cleared_d017: 0,
            lp_x: 0,
            lp_y: 0,
            lp_triggered: false,
            gray_dot_pending: false,
            ba_line,
            irq_line,
            frame_buffer,
            vsync_flag,
        }
    }

    pub fn raster_line(&self) -> u16 {
        self.raster_line
    }

    pub fn current_cycle(&self) -> u16 {
        self.cycle
    }

    /// Light pen trigger from control port 1. Only the first edge per frame
    /// latches a position.
    pub fn trigger_lightpen(&mut self) {
        if !self.lp_triggered {
            self.lp_triggered = true;
            self.lp_x = ((self.cycle - 1) * 4) as u8;
            self.lp_y = (self.raster_line & 0xff) as u8;
            self.raise_irq(irq_event::LIGHTPEN);
        }
    }

    fn raise_irq(&mut self, event: usize) {
        self.irq_control.set_event(event);
        if self.irq_control.is_triggered() {
            self.irq_line.borrow_mut().set_low(irq_source::VIC, true);
        }
    }

    fn update_irq_line(&mut self) {
        self.irq_line
            .borrow_mut()
            .set_low(irq_source::VIC, self.irq_control.is_triggered());
    }

    /*
    A Bad Line Condition is given at any arbitrary clock cycle, if at the
    negative edge of phi0 at the beginning of the cycle RASTER >= $30 and
    RASTER <= $f7 and the lower three bits of RASTER are equal to YSCROLL
    and if the DEN bit was set during an arbitrary cycle of raster line $30.
    */
    fn update_bad_line(&mut self) {
        self.bad_line = self.raster_line >= 0x30
            && self.raster_line <= 0xf7
            && (self.raster_line & 0x07) as u8 == self.scroll_y
            && self.den_in_30;
    }

    fn sprite_p_cycle(&self, sprite: usize) -> u16 {
        let cpl = self.spec.cycles_per_line;
        ((cpl - 5) + 2 * sprite as u16 - 1) % cpl + 1
    }

    fn wrap_cycle(&self, cycle: i32) -> u16 {
        let cpl = i32::from(self.spec.cycles_per_line);
        ((cycle - 1).rem_euclid(cpl) + 1) as u16
    }

    // -- Per cycle work

    fn raster_irq_check(&mut self) {
        if self.raster_line == self.raster_compare {
            self.raise_irq(irq_event::RASTER);
        }
    }

    /*
    1. The expansion flip flop is set as long as the bit in MxYE in register
       $d017 corresponding to the sprite is cleared.
    2. If the MxYE bit is set in the first phase of cycle 55, the expansion
       flip flop is inverted.
    */
    fn sprite_expansion_toggle(&mut self) {
        for sprite in self.sprites.iter_mut() {
            if sprite.config.expand_y {
                sprite.expansion_ff = !sprite.expansion_ff;
            }
        }
    }

    /*
    3. In the first phases of cycle 55 and 56, the VIC checks for every
       sprite if the corresponding MxE bit in register $d015 is set and the
       Y coordinate of the sprite matches the lower 8 bits of RASTER. If
       this is the case and the DMA for the sprite is still off, the DMA is
       switched on, MCBASE is cleared, and, if the MxYE bit is set, the
       expansion flip flop is reset.
    */
    fn sprite_dma_check(&mut self) {
        let raster = (self.raster_line & 0xff) as u8;
        for sprite in self.sprites.iter_mut() {
            if sprite.config.enabled && sprite.config.y == raster && !sprite.dma {
                sprite.dma = true;
                sprite.mc_base = 0;
                if sprite.config.expand_y {
                    sprite.expansion_ff = false;
                }
            }
        }
    }

    /*
    4. In the first phase of cycle 58, the MC of every sprite is loaded from
       its belonging MCBASE and it is checked if the DMA for the sprite is
       turned on and the Y coordinate of the sprite matches the lower 8 bits
       of RASTER. If this is the case, the display of the sprite is turned
       on.
    */
    fn sprite_display_check(&mut self) {
        let raster = (self.raster_line & 0xff) as u8;
        for sprite in self.sprites.iter_mut() {
            sprite.mc = sprite.mc_base;
            if sprite.dma {
                if sprite.config.y == raster {
                    sprite.display = true;
                }
            } else {
                sprite.display = false;
            }
        }
    }

    /*
    7. In the first phase of cycle 16, it is checked if the expansion flip
       flop is set. If so, MCBASE is loaded from MC unless the MxYE bit was
       cleared in the second phase of cycle 15, in which case MCBASE takes
       the glitched combination of MCBASE and MC. If MCBASE reaches 63, the
       DMA for the sprite is turned off.
    */
    fn sprite_mcbase_update(&mut self) {
        for (i, sprite) in self.sprites.iter_mut().enumerate() {
            if sprite.expansion_ff {
                if self.cleared_d017.get_bit(i) {
                    sprite.mc_base = (0b10_1010 & (sprite.mc_base & sprite.mc))
                        | (0b01_0101 & (sprite.mc_base | sprite.mc));
                } else {
                    sprite.mc_base = sprite.mc;
                }
                if sprite.mc_base == 63 {
                    sprite.dma = false;
                }
            }
        }
        self.cleared_d017 = 0;
    }

    fn c_access(&mut self) {
        if self.bad_line && self.vmli < 40 {
            let address = self.video_matrix | (self.vc & 0x3ff);
            self.matrix_line[self.vmli] = self.mem.read(address);
            self.color_line[self.vmli] = self.color_ram.borrow().read(self.vc & 0x3ff) & 0x0f;
        }
    }

    fn g_access(&mut self) {
        if self.display_state {
            let c_data = if self.vmli < 40 {
                self.matrix_line[self.vmli]
            } else {
                0
            };
            let c_color = if self.vmli < 40 {
                self.color_line[self.vmli]
            } else {
                0
            };
            let mut address = match self.gfx.config.mode {
                Mode::Text | Mode::McText | Mode::EcmText | Mode::InvalidText => {
                    self.char_base | (u16::from(c_data) << 3) | u16::from(self.rc)
                }
                Mode::Bitmap | Mode::McBitmap | Mode::InvalidBitmap1 | Mode::InvalidBitmap2 => {
                    (self.char_base & 0x2000) | ((self.vc & 0x3ff) << 3) | u16::from(self.rc)
                }
            };
            if self.gfx.config.mode.is_ecm() {
                address &= 0x39ff;
            }
            let g_data = self.mem.read(address);
            self.gfx.set_data(c_data, c_color, g_data);
            self.vc = (self.vc + 1) & 0x3ff;
            self.vmli += 1;
        } else {
            // idle access
            let address = if self.gfx.config.mode.is_ecm() {
                0x39ff
            } else {
                0x3fff
            };
            let g_data = self.mem.read(address);
            self.gfx.set_data(0, 0, g_data);
        }
    }

    fn refresh_access(&mut self) {
        let address = 0x3f00 | u16::from(self.refresh_counter);
        let _ = self.mem.read(address);
        self.refresh_counter = self.refresh_counter.wrapping_sub(1);
    }

    fn sprite_accesses(&mut self) {
        for i in 0..8 {
            let p_cycle = self.sprite_p_cycle(i);
            if self.cycle == p_cycle {
                // p-access
                let address = self.video_matrix | 0x03f8 | i as u16;
                self.sprite_ptrs[i] = self.mem.read(address);
            } else if self.cycle == self.wrap_cycle(i32::from(p_cycle) + 1)
                && self.sprites[i].dma
            {
                // three s-accesses off the fetched pointer
                let base = u16::from(self.sprite_ptrs[i]) << 6;
                for byte in 0..3 {
                    let data = self
                        .mem
                        .read(base | u16::from(self.sprites[i].mc & 0x3f));
                    self.sprites[i].set_data(byte, data);
                    self.sprites[i].mc = (self.sprites[i].mc + 1) & 0x3f;
                }
            }
        }
    }

    fn update_ba(&mut self) {
        let gfx_ba = self.bad_line && self.cycle >= 12 && self.cycle <= 54;
        let mut sprite_ba = false;
        for i in 0..8 {
            if self.sprites[i].dma {
                let p_cycle = i32::from(self.sprite_p_cycle(i));
                for offset in -3..=1 {
                    if self.cycle == self.wrap_cycle(p_cycle + offset) {
                        sprite_ba = true;
                    }
                }
            }
        }
        self.ba_line.borrow_mut().set_active(!(gfx_ba || sprite_ba));
    }

    fn draw_cycle(&mut self) {
        let y = self.raster_line;
        let pitch = self.frame_buffer.borrow().get_dimension().0;
        let x_start = (self.cycle - 1) * 8;
        for i in 0..8u16 {
            let x = x_start + i;
            self.border.update_main_ff(x, y, self.den);
            if (x & 0x07) as u8 == self.scroll_x {
                self.gfx.load_data();
            }
            self.gfx.clock();
            let mut sprite_output = [None; 8];
            for (n, sprite) in self.sprites.iter_mut().enumerate() {
                sprite.clock(x);
                sprite_output[n] = sprite.output();
            }
            let had_mm = self.mux.has_mm_collision();
            let had_md = self.mux.has_md_collision();
            self.mux.feed_graphics(self.gfx.output());
            self.mux.feed_sprites(sprite_output);
            if self.border.is_enabled() {
                self.mux.feed_border(self.border.config.border_color);
            }
            if !had_mm && self.mux.has_mm_collision() {
                self.raise_irq(irq_event::SPRITE_SPRITE);
            }
            if !had_md && self.mux.has_md_collision() {
                self.raise_irq(irq_event::SPRITE_DATA);
            }
            let mut color = self.mux.output();
            if self.gray_dot_pending {
                color = 0x0f;
                self.gray_dot_pending = false;
            }
            self.frame_buffer
                .borrow_mut()
                .write(usize::from(y) * pitch + usize::from(x), color);
        }
    }
}

impl Chip for Vic {
    fn clock(&mut self) {
        if self.raster_line == 0x30 && self.den {
            self.den_in_30 = true;
        }
        self.update_bad_line();
        if self.bad_line {
            self.display_state = true;
        }

        match self.cycle {
            1 => {
                if self.raster_line > 0 {
                    self.raster_irq_check();
                }
            }
            2 => {
                if self.raster_line == 0 {
                    self.raster_irq_check();
                }
            }
            14 => {
                /*
                In the first phase of cycle 14 of each line, VC is loaded
                from VCBASE and VMLI is cleared. If there is a Bad Line
                Condition in this phase, RC is also reset to zero.
                */
                self.vc = self.vc_base;
                self.vmli = 0;
                if self.bad_line {
                    self.rc = 0;
                }
            }
            16 => {
                self.sprite_mcbase_update();
            }
            55 => {
                self.sprite_expansion_toggle();
                self.sprite_dma_check();
            }
            56 => {
                self.sprite_dma_check();
            }
            58 => {
                /*
                In the first phase of cycle 58, the VIC checks if RC=7. If
                so, the video logic goes to idle state and VCBASE is loaded
                from VC. If the display is active, RC is incremented.
                */
                if self.rc == 7 {
                    self.vc_base = self.vc;
                    if !self.bad_line {
                        self.display_state = false;
                    }
                }
                if self.display_state {
                    self.rc = (self.rc + 1) & 0x07;
                }
                self.sprite_display_check();
            }
            _ => {}
        }

        // output pixels using the data fetched in the previous cycle
        self.draw_cycle();

        // this cycle's memory accesses
        if self.cycle >= 11 && self.cycle <= 15 {
            self.refresh_access();
        }
        if self.cycle >= 16 && self.cycle <= 55 {
            self.g_access();
        }
        if self.cycle >= 15 && self.cycle <= 54 {
            self.c_access();
        }
        self.sprite_accesses();

        // line and frame bookkeeping
        self.cycle += 1;
        if self.cycle > self.spec.cycles_per_line {
            self.cycle = 1;
            self.border
                .update_vertical_ff(self.raster_line, self.den);
            self.raster_line += 1;
            if self.raster_line == self.spec.raster_lines {
                self.raster_line = 0;
                self.vc_base = 0;
                self.lp_triggered = false;
                self.den_in_30 = false;
                self.vsync_flag.set(true);
            }
        }
        self.update_ba();
    }

    fn clock_delta(&mut self, delta: u32) {
        for _i in 0..delta {
            self.clock();
        }
    }

    fn process_vsync(&mut self) {}

    fn reset(&mut self) {
        self.gfx.reset();
        for sprite in self.sprites.iter_mut() {
            sprite.reset();
        }
        self.border.reset();
        self.mux.reset();
        self.den = false;
        self.scroll_x = 0;
        self.scroll_y = 3;
        self.video_matrix = 0x0400;
        self.char_base = 0x1000;
        self.irq_control.reset();
        self.raster_compare = 0;
        self.raster_line = 0;
        self.cycle = 1;
        self.vc = 0;
        self.vc_base = 0;
        self.rc = 0;
        self.vmli = 0;
        self.refresh_counter = 0xff;
        self.display_state = false;
        self.bad_line = false;
        self.den_in_30 = false;
        self.matrix_line = [0; 40];
        self.color_line = [0; 40];
        self.sprite_ptrs = [0; 8];
        self.cleared_d017 = 0;
        self.lp_x = 0;
        self.lp_y = 0;
        self.lp_triggered = false;
        self.gray_dot_pending = false;
        self.ba_line.borrow_mut().set_active(true);
        self.frame_buffer.borrow_mut().reset();
    }

    // I/O

    fn read(&mut self, reg: u8) -> u8 {
        let value = match reg {
            0x00 | 0x02 | 0x04 | 0x06 | 0x08 | 0x0a | 0x0c | 0x0e => {
                (self.sprites[(reg >> 1) as usize].config.x & 0xff) as u8
            }
            0x01 | 0x03 | 0x05 | 0x07 | 0x09 | 0x0b | 0x0d | 0x0f => {
                self.sprites[(reg >> 1) as usize].config.y
            }
            0x10 => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value |= (sprite.config.x.get_bit(8) as u8) << i;
                }
                value
            }
            0x11 => {
                let mut value = self.scroll_y & 0x07;
                value.set_bit(3, self.border.config.rsel);
                value.set_bit(4, self.den);
                value.set_bit(5, self.gfx.config.mode.value().get_bit(1));
                value.set_bit(6, self.gfx.config.mode.value().get_bit(2));
                value.set_bit(7, self.raster_line.get_bit(8));
                value
            }
            0x12 => (self.raster_line & 0xff) as u8,
            0x13 => self.lp_x,
            0x14 => self.lp_y,
            0x15 => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value |= (sprite.config.enabled as u8) << i;
                }
                value
            }
            0x16 => {
                // the unused top bits always read back as 1
                let mut value = self.scroll_x & 0x07;
                value.set_bit(3, self.border.config.csel);
                value.set_bit(4, self.gfx.config.mode.value().get_bit(0));
                value | 0xc0
            }
            0x17 => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value |= (sprite.config.expand_y as u8) << i;
                }
                value
            }
            0x18 => {
                let vm = ((self.video_matrix >> 10) as u8) << 4;
                let cb = ((self.char_base >> 11) as u8) << 1;
                vm | cb | 0x01
            }
            0x19 => {
                let mut value = self.irq_control.get_raw_data() | 0x70;
                value.set_bit(7, self.irq_control.is_triggered());
                value
            }
            0x1a => self.irq_control.get_mask() | 0xf0,
            0x1b => {
                let mut value = 0;
                for (i, on) in self.mux.data_priority.iter().enumerate() {
                    value |= (*on as u8) << i;
                }
                value
            }
            0x1c => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value |=
                        ((sprite.config.mode == super::sprite_sequencer::Mode::Multicolor) as u8)
                            << i;
                }
                value
            }
            0x1d => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value |= (sprite.config.expand_x as u8) << i;
                }
                value
            }
            0x1e => {
                // collision latches clear on read
                let value = self.mux.take_mm_collision();
                value
            }
            0x1f => {
                let value = self.mux.take_md_collision();
                value
            }
            0x20 => self.border.config.border_color | 0xf0,
            0x21..=0x24 => self.gfx.config.bg_color[(reg - 0x21) as usize] | 0xf0,
            0x25 => self.sprites[0].config.multicolor[0] | 0xf0,
            0x26 => self.sprites[0].config.multicolor[1] | 0xf0,
            0x27..=0x2e => self.sprites[(reg - 0x27) as usize].config.color | 0xf0,
            0x2f..=0x3f => 0xff,
            _ => panic!("invalid reg {}", reg),
        };
        if log_enabled!(Level::Trace) {
            trace!(target: "vic::reg", "Read 0x{:02x} = 0x{:02x}", reg, value);
        }
        value
    }

    fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(Level::Trace) {
            trace!(target: "vic::reg", "Write 0x{:02x} = 0x{:02x}", reg, value);
        }
        match reg {
            0x00 | 0x02 | 0x04 | 0x06 | 0x08 | 0x0a | 0x0c | 0x0e => {
                let n = (reg >> 1) as usize;
                let x = (self.sprites[n].config.x & 0x100) | u16::from(value);
                self.sprites[n].config.x = x;
                self.sprites[n].config.x_screen = self.spec.map_sprite_x(x);
            }
            0x01 | 0x03 | 0x05 | 0x07 | 0x09 | 0x0b | 0x0d | 0x0f => {
                self.sprites[(reg >> 1) as usize].config.y = value;
            }
            0x10 => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    let mut x = sprite.config.x;
                    x.set_bit(8, value.get_bit(i));
                    sprite.config.x = x;
                    sprite.config.x_screen = self.spec.map_sprite_x(x);
                }
            }
            0x11 => {
                self.scroll_y = value & 0x07;
                self.border.config.rsel = value.get_bit(3);
                self.den = value.get_bit(4);
                let mode = (self.gfx.config.mode.value() & 0x01)
                    | ((value.get_bit(5) as u8) << 1)
                    | ((value.get_bit(6) as u8) << 2);
                self.gfx.config.mode = Mode::from(mode);
                let compare = (self.raster_compare & 0xff)
                    | (u16::from(value.get_bit(7) as u8) << 8);
                let changed = compare != self.raster_compare;
                self.raster_compare = compare;
                if changed && self.raster_line == self.raster_compare {
                    self.raise_irq(irq_event::RASTER);
                }
                if self.raster_line == 0x30 && self.den {
                    self.den_in_30 = true;
                }
                self.update_bad_line();
            }
            0x12 => {
                let compare = (self.raster_compare & 0x100) | u16::from(value);
                let changed = compare != self.raster_compare;
                self.raster_compare = compare;
                if changed && self.raster_line == self.raster_compare {
                    self.raise_irq(irq_event::RASTER);
                }
            }
            0x13 | 0x14 => {
                // light pen latches are read only
            }
            0x15 => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.enabled = value.get_bit(i);
                }
            }
            0x16 => {
                self.scroll_x = value & 0x07;
                self.border.config.csel = value.get_bit(3);
                let mode =
                    (self.gfx.config.mode.value() & 0x06) | value.get_bit(4) as u8;
                self.gfx.config.mode = Mode::from(mode);
            }
            0x17 => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    let enabled = value.get_bit(i);
                    if !enabled && !sprite.expansion_ff {
                        // a clear at the wrong moment glitches the next
                        // MCBASE update
                        self.cleared_d017.set_bit(i, true);
                    }
                    sprite.config.expand_y = enabled;
                    if !enabled {
                        sprite.expansion_ff = true;
                    }
                }
            }
            0x18 => {
                self.video_matrix = u16::from(value & 0xf0) << 6;
                self.char_base = u16::from(value & 0x0e) << 10;
            }
            0x19 => {
                // bits are cleared by writing 1
                let data = self.irq_control.get_raw_data() & !(value & 0x0f);
                self.irq_control.set_raw_data(data);
                self.update_irq_line();
            }
            0x1a => {
                self.irq_control.set_mask(value & 0x0f);
                self.update_irq_line();
            }
            0x1b => {
                for (i, on) in self.mux.data_priority.iter_mut().enumerate() {
                    *on = value.get_bit(i);
                }
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.data_priority = value.get_bit(i);
                }
            }
            0x1c => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.mode = if value.get_bit(i) {
                        super::sprite_sequencer::Mode::Multicolor
                    } else {
                        super::sprite_sequencer::Mode::Standard
                    };
                }
            }
            0x1d => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.expand_x = value.get_bit(i);
                }
            }
            0x1e | 0x1f => {
                // collision latches are read only
            }
            0x20 => {
                self.border.config.border_color = value & 0x0f;
                self.mark_gray_dot();
            }
            0x21..=0x24 => {
                self.gfx.config.bg_color[(reg - 0x21) as usize] = value & 0x0f;
                self.mark_gray_dot();
            }
            0x25 => {
                for sprite in self.sprites.iter_mut() {
                    sprite.config.multicolor[0] = value & 0x0f;
                }
                self.mark_gray_dot();
            }
            0x26 => {
                for sprite in self.sprites.iter_mut() {
                    sprite.config.multicolor[1] = value & 0x0f;
                }
                self.mark_gray_dot();
            }
            0x27..=0x2e => {
                self.sprites[(reg - 0x27) as usize].config.color = value & 0x0f;
                self.mark_gray_dot();
            }
            0x2f..=0x3f => {}
            _ => panic!("invalid reg {}", reg),
        }
    }

    // State

    fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u8(self.gfx.config.mode.value());
        for color in self.gfx.config.bg_color.iter() {
            writer.write_u8(*color);
        }
        writer.write_bool(self.den);
        writer.write_u8(self.scroll_x);
        writer.write_u8(self.scroll_y);
        writer.write_u16(self.video_matrix);
        writer.write_u16(self.char_base);
        writer.write_u8(self.irq_control.get_raw_data());
        writer.write_u8(self.irq_control.get_mask());
        writer.write_u16(self.raster_compare);
        writer.write_u16(self.raster_line);
        writer.write_u16(self.cycle);
        writer.write_u16(self.vc);
        writer.write_u16(self.vc_base);
        writer.write_u8(self.rc);
        writer.write_u8(self.vmli as u8);
        writer.write_u8(self.refresh_counter);
        writer.write_bool(self.display_state);
        writer.write_bool(self.bad_line);
        writer.write_bool(self.den_in_30);
        for value in self.matrix_line.iter() {
            writer.write_u8(*value);
        }
        for value in self.color_line.iter() {
            writer.write_u8(*value);
        }
        writer.write_bool(self.border.config.rsel);
        writer.write_bool(self.border.config.csel);
        writer.write_u8(self.border.config.border_color);
        writer.write_u8(self.lp_x);
        writer.write_u8(self.lp_y);
        writer.write_bool(self.lp_triggered);
        writer.write_u8(self.cleared_d017);
        for (i, sprite) in self.sprites.iter().enumerate() {
            writer.write_u16(sprite.config.x);
            writer.write_u8(sprite.config.y);
            writer.write_u8(sprite.config.color);
            writer.write_bool(sprite.config.enabled);
            writer.write_bool(sprite.config.expand_x);
            writer.write_bool(sprite.config.expand_y);
            writer.write_bool(sprite.config.data_priority);
            writer
                .write_bool(sprite.config.mode == super::sprite_sequencer::Mode::Multicolor);
            writer.write_u8(sprite.config.multicolor[0]);
            writer.write_u8(sprite.config.multicolor[1]);
            writer.write_bool(sprite.dma);
            writer.write_bool(sprite.display);
            writer.write_bool(sprite.expansion_ff);
            writer.write_u8(sprite.mc);
            writer.write_u8(sprite.mc_base);
            writer.write_u8(self.sprite_ptrs[i]);
        }
    }

    fn restore_state(&mut self, reader: &mut StateReader) -> Result<(), Error> {
        self.gfx.config.mode = Mode::from(reader.read_u8()? & 0x07);
        for i in 0..4 {
            self.gfx.config.bg_color[i] = reader.read_u8()?;
        }
        self.den = reader.read_bool()?;
        self.scroll_x = reader.read_u8()?;
        self.scroll_y = reader.read_u8()?;
        self.video_matrix = reader.read_u16()?;
        self.char_base = reader.read_u16()?;
        let data = reader.read_u8()?;
        let mask = reader.read_u8()?;
        self.irq_control.set_raw_data(data);
        self.irq_control.set_mask(mask);
        self.raster_compare = reader.read_u16()?;
        self.raster_line = reader.read_u16()?;
        self.cycle = reader.read_u16()?;
        self.vc = reader.read_u16()?;
        self.vc_base = reader.read_u16()?;
        self.rc = reader.read_u8()?;
        self.vmli = usize::from(reader.read_u8()?);
        self.refresh_counter = reader.read_u8()?;
        self.display_state = reader.read_bool()?;
        self.bad_line = reader.read_bool()?;
        self.den_in_30 = reader.read_bool()?;
        for i in 0..40 {
            self.matrix_line[i] = reader.read_u8()?;
        }
        for i in 0..40 {
            self.color_line[i] = reader.read_u8()?;
        }
        self.border.config.rsel = reader.read_bool()?;
        self.border.config.csel = reader.read_bool()?;
        self.border.config.border_color = reader.read_u8()?;
        self.lp_x = reader.read_u8()?;
        self.lp_y = reader.read_u8()?;
        self.lp_triggered = reader.read_bool()?;
        self.cleared_d017 = reader.read_u8()?;
        for i in 0..8 {
            let x = reader.read_u16()?;
            self.sprites[i].config.x = x;
            self.sprites[i].config.x_screen = self.spec.map_sprite_x(x);
            self.sprites[i].config.y = reader.read_u8()?;
            self.sprites[i].config.color = reader.read_u8()?;
            self.sprites[i].config.enabled = reader.read_bool()?;
            self.sprites[i].config.expand_x = reader.read_bool()?;
            self.sprites[i].config.expand_y = reader.read_bool()?;
            self.sprites[i].config.data_priority = reader.read_bool()?;
            self.mux.data_priority[i] = self.sprites[i].config.data_priority;
            self.sprites[i].config.mode = if reader.read_bool()? {
                super::sprite_sequencer::Mode::Multicolor
            } else {
                super::sprite_sequencer::Mode::Standard
            };
            self.sprites[i].config.multicolor[0] = reader.read_u8()?;
            self.sprites[i].config.multicolor[1] = reader.read_u8()?;
            self.sprites[i].dma = reader.read_bool()?;
            self.sprites[i].display = reader.read_bool()?;
            self.sprites[i].expansion_ff = reader.read_bool()?;
            self.sprites[i].mc = reader.read_u8()?;
            self.sprites[i].mc_base = reader.read_u8()?;
            self.sprite_ptrs[i] = reader.read_u8()?;
        }
        self.update_irq_line();
        Ok(())
    }
}

impl Vic {
    fn mark_gray_dot(&mut self) {
        if self.chip_model.has_gray_dot_bug() {
            self.gray_dot_pending = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::VideoOutput;
    use crate::util::{new_shared, new_shared_cell, Rom};

    struct NullVideo;

    impl VideoOutput for NullVideo {
        fn get_dimension(&self) -> (usize, usize) {
            (520, 312)
        }
        fn reset(&mut self) {}
        fn write(&mut self, _index: usize, _color: u8) {}
    }

    fn setup_vic() -> Vic {
        let ba_line = new_shared(Pin::new_high());
        let irq_line = new_shared(IrqLine::new("irq"));
        let color_ram = new_shared(Ram::new(1024));
        let ram = new_shared(Ram::new(0x10000));
        let charset = new_shared(Rom::new(0x1000, 0x1000, 0x00));
        let base_address = new_shared_cell(0u16);
        let frame_buffer: Shared<dyn VideoOutput> = new_shared(NullVideo {});
        let vsync = new_shared_cell(false);
        let mem = VicMemory::new(base_address, charset, ram);
        let mut vic = Vic::new(
            VicModel::Pal6569R3,
            color_ram,
            mem,
            frame_buffer,
            vsync,
            ba_line.clone(),
            irq_line,
        );
        vic.reset();
        vic
    }

    fn run_line(vic: &mut Vic) {
        for _ in 0..63 {
            vic.clock();
        }
    }

    #[test]
    fn frame_has_expected_cycle_count() {
        let mut vic = setup_vic();
        let mut cycles = 0u32;
        while !vic.vsync_flag.get() {
            vic.clock();
            cycles += 1;
        }
        assert_eq!(63 * 312, cycles);
    }

    #[test]
    fn raster_irq_fires_at_line_start() {
        let mut vic = setup_vic();
        vic.write(0x1a, 0x01);
        vic.write(0x12, 0x64); // raster 100
        assert!(!vic.irq_line.borrow().is_low());
        while vic.raster_line() != 100 {
            vic.clock();
        }
        // the compare happens in the first cycle of the line
        vic.clock();
        assert!(vic.irq_line.borrow().is_low());
        assert_eq!(0x81, vic.read(0x19) & 0x81);
    }

    #[test]
    fn irr_write_one_clears() {
        let mut vic = setup_vic();
        vic.write(0x1a, 0x01);
        vic.write(0x12, 0x00);
        vic.write(0x11, 0x00);
        // line 0 compare fires at cycle 2
        vic.clock();
        vic.clock();
        assert!(vic.irq_line.borrow().is_low());
        vic.write(0x19, 0x01);
        assert!(!vic.irq_line.borrow().is_low());
    }

    #[test]
    fn bad_line_asserts_ba() {
        let mut vic = setup_vic();
        vic.write(0x11, 0x1b); // den, yscroll = 3
        // run into raster line 0x33 (badline for yscroll 3)
        while vic.raster_line() != 0x33 {
            vic.clock();
        }
        let mut ba_cycles = 0;
        let mut stalled = 0;
        while vic.raster_line() == 0x33 {
            if vic.ba_line.borrow().is_low() {
                stalled += 1;
            }
            vic.clock();
            ba_cycles += 1;
        }
        assert_eq!(63, ba_cycles);
        // BA is down from cycle 12 through 54
        assert_eq!(43, stalled);
    }

    #[test]
    fn cr2_unused_bits_read_high() {
        let mut vic = setup_vic();
        vic.write(0x16, 0x00);
        assert_eq!(0xc0, vic.read(0x16) & 0xc0);
    }

    #[test]
    fn memptr_bit0_reads_high() {
        let mut vic = setup_vic();
        vic.write(0x18, 0x14);
        assert_eq!(0x15, vic.read(0x18));
    }

    #[test]
    fn sprite_dma_starts_on_y_match() {
        let mut vic = setup_vic();
        vic.write(0x15, 0x01); // enable sprite 0
        vic.write(0x01, 0x64); // y = 100
        while !(vic.raster_line() == 100 && vic.current_cycle() == 55) {
            vic.clock();
        }
        assert!(!vic.sprites[0].dma);
        vic.clock();
        assert!(vic.sprites[0].dma);
        assert_eq!(0, vic.sprites[0].mc_base);
    }
}
