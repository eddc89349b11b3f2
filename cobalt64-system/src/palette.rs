// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

/// The 16 C64 colors in RGBA format (Pepto's measured palette).
pub struct Palette;

impl Palette {
    pub fn default() -> [u32; 16] {
        [
            0x0000_00ff, // black
            0xffff_ffff, // white
            0x6837_2bff, // red
            0x70a4_b2ff, // cyan
            0x6f3d_86ff, // purple
            0x588d_43ff, // green
            0x3528_79ff, // blue
            0xb8c7_6fff, // yellow
            0x6f4f_25ff, // orange
            0x4339_00ff, // brown
            0x9a67_59ff, // light red
            0x4444_44ff, // dark gray
            0x6c6c_6cff, // gray
            0x9ad2_84ff, // light green
            0x6c5e_b5ff, // light blue
            0x9595_95ff, // light gray
        ]
    }
}
