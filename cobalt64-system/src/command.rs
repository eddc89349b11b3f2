// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use cobalt64_core::device::cartridge::{Chip, ChipType};
use cobalt64_core::device::joystick;
use cobalt64_core::device::keyboard::Key;
use cobalt64_core::drive::GcrDisk;
use cobalt64_core::factory::Tape;

use super::config::ConfigOption;

#[derive(Copy, Clone, Debug)]
pub enum MouseButton {
    LeftDown,
    LeftUp,
    RightDown,
    RightUp,
}

/// Cartridge contents in transferable form; the worker builds the actual
/// banking hardware from it when the command is applied.
pub struct CartridgeSpec {
    pub version: u16,
    pub hw_type: u8,
    pub exrom: bool,
    pub game: bool,
    pub chips: Vec<(u8, u16, Vec<u8>)>,
}

impl CartridgeSpec {
    pub fn into_cartridge(self) -> cobalt64_core::device::Cartridge {
        let hw_type = cobalt64_core::device::cartridge::HwType::from(self.hw_type);
        let mut cartridge =
            cobalt64_core::device::Cartridge::new(self.version, hw_type, self.exrom, self.game);
        for (bank, offset, data) in self.chips {
            cartridge.add(Chip {
                chip_type: ChipType::Rom,
                bank_number: bank,
                offset,
                size: data.len() as u16,
                data,
            });
        }
        cartridge
    }
}

/// Host to core commands, observed in FIFO order and applied at the start
/// of a cycle before any component ticks.
pub enum Command {
    // Machine lifecycle
    PowerOn,
    PowerOff,
    Run,
    Pause,
    HardReset,
    SoftReset,
    Halt,
    // Stepping
    StepInto,
    StepOver,
    StepCycle,
    FinishLine,
    FinishFrame,
    // Warp mode, per-source bit positions 0-6
    WarpOn(u8),
    WarpOff(u8),
    // Keyboard
    KeyPress(Key, u32),
    KeyRelease(Key, u32),
    KeyToggle(Key),
    KeyReleaseAll,
    KeyType(String),
    // Control ports
    MouseMoveAbs(u8, i32, i32),
    MouseMoveRel(u8, i32, i32),
    MouseButton(u8, MouseButton),
    JoyEvent(u8, joystick::Event),
    // Configuration
    Config(ConfigOption),
    ConfigScheme(String),
    // Media
    TapeInsert(Box<dyn Tape + Send>),
    TapeEject,
    TapePlay,
    TapeStop,
    TapeRewind,
    DiskInsert(u8, GcrDisk),
    DiskEject(u8),
    AttachCartridge(CartridgeSpec),
    DetachCartridge,
    // Snapshots
    SaveSnapshot,
    LoadSnapshot(Vec<u8>),
}
