// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;
use std::sync::Arc;

use crate::factory::system_model::{CiaModel, SidModel, VicModel};
use crate::factory::types::*;
use crate::util::{Clock, IoPort, IrqLine, Pin, Ram, Rom, Shared, SharedCell};

/// ChipFactory provides the construction interface for each chip within the
/// system, allowing implementations to be swapped out without touching the
/// machine assembly. Interactions between chips are modelled through
/// separate I/O state handed to the constructors (`IrqLine`, `Pin`,
/// `IoPort`), never through direct chip-to-chip references.
pub trait ChipFactory {
    /// Constructs the CPU.
    ///
    /// The three least significant bits of the processor port drive the
    /// bank-switching control lines.
    ///
    /// # Dependencies
    /// `mem` - memory management unit
    /// # I/O
    /// `io_port` - on-chip I/O port
    /// # Signals
    /// `ba_line` - ba input
    /// `irq_line` - interrupt request input
    /// `nmi_line` - non-maskable interrupt request input
    fn new_cpu(
        &self,
        mem: Shared<dyn Addressable>,
        io_port: Shared<IoPort>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        nmi_line: Shared<IrqLine>,
    ) -> Box<dyn Cpu>;

    // -- Chipset

    /// Constructs CIA 1.
    ///
    /// CIA 1 is connected to the two control ports and the keyboard matrix.
    fn new_cia_1(
        &self,
        chip_model: CiaModel,
        joystick_1: SharedCell<u8>,
        joystick_2: SharedCell<u8>,
        keyboard_matrix: Shared<[u8; 16]>,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        flag_pin: Shared<Pin>,
        cnt_pin: Shared<Pin>,
        irq_line: Shared<IrqLine>,
    ) -> Shared<dyn Chip>;

    /// Constructs CIA 2.
    ///
    /// CIA 2 port A drives the VIC bank select and the serial bus handshake
    /// lines; its interrupt output feeds the NMI line.
    fn new_cia_2(
        &self,
        chip_model: CiaModel,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        flag_pin: Shared<Pin>,
        cnt_pin: Shared<Pin>,
        nmi_line: Shared<IrqLine>,
    ) -> Shared<dyn Chip>;

    /// Constructs a SID chip.
    ///
    /// Since SID processing may be deferred to v-sync, the system clock is
    /// provided so the chip can sync sample generation up to the current
    /// cycle whenever a register is accessed. Output goes to `sound_buffer`,
    /// analog paddle/mouse values come in through the two POT cells.
    fn new_sid(
        &self,
        chip_model: SidModel,
        system_clock: Rc<Clock>,
        pot_x: SharedCell<u8>,
        pot_y: SharedCell<u8>,
        sound_buffer: Arc<dyn SoundOutput>,
    ) -> Shared<dyn Chip>;

    /// Constructs the VIC chip.
    ///
    /// The memory base address is provided through `vic_base_address`, which
    /// tracks CIA 2 port A. VIC output is written to the frame buffer; the
    /// vsync flag is raised when the frame is complete.
    fn new_vic(
        &self,
        chip_model: VicModel,
        color_ram: Shared<Ram>,
        ram: Shared<Ram>,
        rom_charset: Shared<Rom>,
        vic_base_address: SharedCell<u16>,
        frame_buffer: Shared<dyn VideoOutput>,
        vsync_flag: SharedCell<bool>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
    ) -> Shared<dyn Chip>;

    // -- Memory

    /// Constructs the memory controller seen by the CPU. Bank switching is
    /// controlled through the 5 latch bits (LORAM, HIRAM, CHAREN, GAME,
    /// EXROM) fed to the MMU.
    fn new_memory(
        &self,
        mmu: Shared<dyn Mmu>,
        cia_1: Shared<dyn Chip>,
        cia_2: Shared<dyn Chip>,
        color_ram: Shared<Ram>,
        expansion_port: Shared<dyn AddressableFaded>,
        ram: Shared<Ram>,
        rom_basic: Shared<Rom>,
        rom_charset: Shared<Rom>,
        rom_kernal: Shared<Rom>,
        sid: Shared<dyn Chip>,
        vic: Shared<dyn Chip>,
    ) -> Shared<dyn Addressable>;

    /// Constructs RAM with the specified `capacity`.
    fn new_ram(&self, capacity: usize) -> Shared<Ram>;

    /// Constructs ROM from the specified image.
    fn new_rom(&self, data: &[u8], offset: u16) -> Shared<Rom>;
}
