// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[macro_use]
extern crate log;

mod breakpoint;
mod c64;
mod c64_factory;
mod command;
mod config;
mod execution;
mod frame_buffer;
mod message;
mod palette;
mod snapshot;
mod sound_buffer;

pub use self::breakpoint::{Breakpoint, BreakpointManager};
pub use self::c64::{C64, RunResult};
pub use self::c64_factory::C64Factory;
pub use self::command::{CartridgeSpec, Command, MouseButton};
pub use self::config::{Config, ConfigOption, DriveConfig, JoystickConfig, RomData, SoundConfig};
pub use self::execution::{Emulator, State};
pub use self::frame_buffer::{FrameBuffer, VideoBuffer};
pub use self::message::Message;
pub use self::palette::Palette;
pub use self::sound_buffer::SoundBuffer;
