// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

mod chip_factory;
mod system_model;
mod types;

pub use self::chip_factory::ChipFactory;
pub use self::system_model::{
    CiaModel, DriveModel, GlueLogic, PowerGrid, SidModel, SystemModel, VicModel,
};
pub use self::types::{
    Addressable, AddressableFaded, Bank, Chip, Cpu, Mmu, Register, SoundOutput, Tape, VideoOutput,
};
