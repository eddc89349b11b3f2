// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

const PRIO_SCREEN_BORDER: u8 = 0;
const PRIO_FG_SPRITE: u8 = 1;
const PRIO_FG_GRAPHICS: u8 = 2;
const PRIO_BG_SPRITE: u8 = 3;
const PRIO_BG_GRAPHICS: u8 = 4;

/// Pixel priority multiplexer. Besides resolving the output color, the mux
/// observes sprite-sprite and sprite-data coincidences and accumulates them
/// into the collision latches read out through $d01e/$d01f.
pub struct MuxUnit {
    pub data_priority: [bool; 8],
    output: u8,
    output_priority: u8,
    gfx_foreground: bool,
    sprite_hit: Option<usize>,
    mm_collision: u8,
    md_collision: u8,
}

impl MuxUnit {
    pub fn new() -> Self {
        MuxUnit {
            data_priority: [false; 8],
            output: 0,
            output_priority: 0,
            gfx_foreground: false,
            sprite_hit: None,
            mm_collision: 0,
            md_collision: 0,
        }
    }

    #[inline]
    pub fn feed_border(&mut self, border_output: u8) {
        self.output_pixel(border_output, PRIO_SCREEN_BORDER);
    }

    #[inline]
    pub fn feed_graphics(&mut self, gfx_output: (u8, bool)) {
        self.gfx_foreground = gfx_output.1;
        if gfx_output.1 {
            self.output_pixel(gfx_output.0, PRIO_FG_GRAPHICS);
        } else {
            self.output_pixel(gfx_output.0, PRIO_BG_GRAPHICS);
        }
    }

    #[inline]
    pub fn feed_sprites(&mut self, sprite_output: [Option<u8>; 8]) {
        self.sprite_hit = None;
        for (i, out) in sprite_output.iter().enumerate() {
            if let Some(output) = *out {
                // collision bookkeeping happens even under the border
                match self.sprite_hit {
                    None => self.sprite_hit = Some(i),
                    Some(first) => {
                        self.mm_collision |= (1 << first) | (1 << i);
                    }
                }
                if self.gfx_foreground {
                    self.md_collision |= 1 << i;
                }
                if !self.data_priority[i] {
                    self.output_sprite_pixel(output, PRIO_FG_SPRITE);
                } else {
                    self.output_sprite_pixel(output, PRIO_BG_SPRITE);
                }
            }
        }
    }

    #[inline]
    pub fn output(&self) -> u8 {
        self.output
    }

    pub fn take_mm_collision(&mut self) -> u8 {
        let value = self.mm_collision;
        self.mm_collision = 0;
        value
    }

    pub fn take_md_collision(&mut self) -> u8 {
        let value = self.md_collision;
        self.md_collision = 0;
        value
    }

    pub fn has_mm_collision(&self) -> bool {
        self.mm_collision != 0
    }

    pub fn has_md_collision(&self) -> bool {
        self.md_collision != 0
    }

    pub fn reset(&mut self) {
        self.data_priority = [false; 8];
        self.output = 0;
        self.output_priority = 0;
        self.gfx_foreground = false;
        self.sprite_hit = None;
        self.mm_collision = 0;
        self.md_collision = 0;
    }

    #[inline]
    fn output_pixel(&mut self, pixel: u8, priority: u8) {
        self.output = pixel;
        self.output_priority = priority;
    }

    #[inline]
    fn output_sprite_pixel(&mut self, pixel: u8, priority: u8) {
        if priority < self.output_priority {
            self.output = pixel;
            self.output_priority = priority;
        }
    }
}
