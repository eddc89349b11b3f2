// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

pub mod cartridge;
mod datassette;
mod expansion_port;
pub mod joystick;
pub mod keyboard;
pub mod mouse;
mod paddle;

pub use self::cartridge::Cartridge;
pub use self::datassette::Datassette;
pub use self::expansion_port::ExpansionPort;
pub use self::joystick::Joystick;
pub use self::keyboard::{Key, KeyEvent, Keyboard};
pub use self::mouse::Mouse;
pub use self::paddle::Paddle;
