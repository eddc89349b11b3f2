// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;
use std::sync::Arc;

use cobalt64_core::device::joystick;
use cobalt64_core::device::{Cartridge, Datassette, Joystick, Keyboard, Mouse, Paddle};
use cobalt64_core::drive::{Drive, GcrDisk, IecBus};
use cobalt64_core::factory::*;
use cobalt64_core::io::PowerSupply;
use cobalt64_core::mem::Pla;
use cobalt64_core::util::*;
use cobalt64_core::Error;

use super::breakpoint::BreakpointManager;
use super::snapshot;
use super::Config;

// Design:
//   C64 represents the machine itself and all of its components.
//   Connections between components are managed as component dependencies
//   wired up here: chips communicate through shared pins, ports and
//   interrupt lines, never through direct references to each other.
//
//   One step_cycle() advances every component by a single clock cycle in
//   the fixed order CPU (stalled by BA when the VIC owns the bus), CIAs,
//   VIC, datassette, then the drives through their fractional clock
//   accumulators.

#[allow(dead_code)]
#[derive(Copy, Clone)]
enum BaseAddr {
    Basic = 0xa000,
    Charset = 0xd000,
    Kernal = 0xe000,
}

impl BaseAddr {
    pub fn addr(self) -> u16 {
        self as u16
    }
}

pub enum RunResult {
    FrameCompleted,
    BreakpointReached(u16),
    CpuJammed(u16),
}

pub struct C64 {
    // Dependencies
    config: Rc<Config>,
    // Chipset
    cpu: Box<dyn Cpu>,
    cia_1: Shared<dyn Chip>,
    cia_2: Shared<dyn Chip>,
    sid: Shared<dyn Chip>,
    vic: Shared<dyn Chip>,
    // Memory
    color_ram: Shared<Ram>,
    expansion_port: Shared<cobalt64_core::device::ExpansionPort>,
    ram: Shared<Ram>,
    // Peripherals
    datassette: Shared<Datassette>,
    drives: Vec<Drive>,
    iec: Shared<IecBus>,
    joystick_1: Option<Joystick>,
    joystick_2: Option<Joystick>,
    mouse: Option<Mouse>,
    paddle: Option<Paddle>,
    keyboard: Keyboard,
    // Buffers
    frame_buffer: Shared<dyn VideoOutput>,
    sound_buffer: Arc<dyn SoundOutput>,
    // Runtime state
    breakpoints: BreakpointManager,
    clock: Rc<Clock>,
    power_supply: PowerSupply,
    tod_counters: [u64; 2],
    frame_count: u32,
    last_pc: u16,
    vsync_flag: SharedCell<bool>,
    cia_2_port_a: Shared<IoPort>,
}

impl C64 {
    pub fn build(
        config: Rc<Config>,
        factory: &super::C64Factory,
        frame_buffer: Shared<dyn VideoOutput>,
        sound_buffer: Arc<dyn SoundOutput>,
    ) -> C64 {
        info!(target: "c64", "Initializing system");
        // Shared state
        let clock = Rc::new(Clock::default());
        let joystick_1_state = new_shared_cell(0u8);
        let joystick_2_state = new_shared_cell(0u8);
        let keyboard_matrix = new_shared([0xff; 16]);
        let vsync_flag = new_shared_cell(false);
        let vic_base_address = new_shared_cell(0u16);
        let iec = new_shared(IecBus::new());

        // I/O lines
        let ba_line = new_shared(Pin::new_high());
        let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
        let cia_1_flag_pin = new_shared(Pin::new_low());
        let cia_1_cnt_pin = new_shared(Pin::new_high());
        let cia_1_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_1_port_b = new_shared(IoPort::new(0x00, 0xff));
        let cia_2_flag_pin = new_shared(Pin::new_low());
        let cia_2_cnt_pin = new_shared(Pin::new_high());
        let cia_2_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_2_port_b = new_shared(IoPort::new(0x00, 0xff));
        let exp_io_line = new_shared(IoPort::new(0xff, 0xff));
        let irq_line = new_shared(IrqLine::new("irq"));
        let nmi_line = new_shared(IrqLine::new("nmi"));

        // Memory
        let color_ram = factory.new_ram(config.model.color_ram);
        let ram = factory.new_ram(config.model.memory_size);
        let rom_basic = factory.new_rom(config.roms.basic.as_slice(), BaseAddr::Basic.addr());
        let rom_charset = factory.new_rom(config.roms.charset.as_slice(), 0);
        let rom_kernal = factory.new_rom(config.roms.kernal.as_slice(), BaseAddr::Kernal.addr());

        // Chipset
        let cia_1 = factory.new_cia_1(
            config.model.cia_model,
            joystick_1_state.clone(),
            joystick_2_state.clone(),
            keyboard_matrix.clone(),
            cia_1_port_a.clone(),
            cia_1_port_b.clone(),
            cia_1_flag_pin.clone(),
            cia_1_cnt_pin.clone(),
            irq_line.clone(),
        );
        let cia_2 = factory.new_cia_2(
            config.model.cia_model,
            cia_2_port_a.clone(),
            cia_2_port_b.clone(),
            cia_2_flag_pin.clone(),
            cia_2_cnt_pin.clone(),
            nmi_line.clone(),
        );
        let sid = factory.new_sid(
            config.model.sid_model,
            clock.clone(),
            factory.pot_x(),
            factory.pot_y(),
            sound_buffer.clone(),
        );
        let vic = factory.new_vic(
            config.model.vic_model,
            color_ram.clone(),
            ram.clone(),
            rom_charset.clone(),
            vic_base_address.clone(),
            frame_buffer.clone(),
            vsync_flag.clone(),
            ba_line.clone(),
            irq_line.clone(),
        );

        // Memory controller and processor
        let expansion_port = new_shared(cobalt64_core::device::ExpansionPort::new(
            exp_io_line.clone(),
        ));
        let mmu = new_shared(Pla::new());
        let mem = factory.new_memory(
            mmu.clone(),
            cia_1.clone(),
            cia_2.clone(),
            color_ram.clone(),
            expansion_port.clone(),
            ram.clone(),
            rom_basic,
            rom_charset,
            rom_kernal,
            sid.clone(),
            vic.clone(),
        );
        let cpu = factory.new_cpu(
            mem,
            cpu_io_port.clone(),
            ba_line,
            irq_line,
            nmi_line.clone(),
        );

        // Peripherals
        let datassette = new_shared(Datassette::new(cia_1_flag_pin, cpu_io_port.clone()));
        let joystick_1 = if config.joystick.joystick_1 != joystick::Mode::None {
            Some(Joystick::new(
                config.joystick.joystick_1,
                config.joystick.axis_motion_threshold,
                joystick_1_state.clone(),
            ))
        } else {
            None
        };
        let joystick_2 = if config.joystick.joystick_2 != joystick::Mode::None {
            Some(Joystick::new(
                config.joystick.joystick_2,
                config.joystick.axis_motion_threshold,
                joystick_2_state.clone(),
            ))
        } else {
            None
        };
        let mouse = config.mouse.map(|model| {
            Mouse::new(
                model,
                joystick_1_state.clone(),
                factory.pot_x(),
                factory.pot_y(),
            )
        });
        let paddle = if config.paddles {
            Some(Paddle::new(
                joystick_2_state.clone(),
                factory.pot_x(),
                factory.pot_y(),
            ))
        } else {
            None
        };
        let keyboard = Keyboard::new(keyboard_matrix, nmi_line.clone());
        let mut drives = Vec::with_capacity(2);
        for unit in 0..2u8 {
            let mut drive = Drive::new(
                8 + unit,
                config.drive.models[usize::from(unit)],
                config.roms.drive.as_slice(),
                iec.clone(),
                config.model.cpu_freq,
                config.model.drive_freq,
            );
            drive.set_enabled(config.drive.connected[usize::from(unit)]);
            drives.push(drive);
        }

        // Observers
        let exp_io_line_clone_1 = exp_io_line.clone();
        let mmu_clone_1 = mmu.clone();
        cpu_io_port
            .borrow_mut()
            .set_observer(Box::new(move |cpu_port| {
                let expansion_port_io = exp_io_line_clone_1.borrow().get_value();
                let mode = cpu_port & 0x07 | expansion_port_io & 0x18;
                mmu_clone_1.borrow_mut().switch_banks(mode);
            }));

        let cpu_io_port_clone_2 = cpu_io_port;
        let mmu_clone_2 = mmu;
        exp_io_line
            .borrow_mut()
            .set_observer(Box::new(move |expansion_port_io| {
                let cpu_port_io = cpu_io_port_clone_2.borrow().get_value();
                let mode = cpu_port_io & 0x07 | expansion_port_io & 0x18;
                mmu_clone_2.borrow_mut().switch_banks(mode);
            }));

        let vic_base_address_clone = vic_base_address;
        let iec_clone = iec.clone();
        cia_2_port_a
            .borrow_mut()
            .set_observer(Box::new(move |value| {
                let base_address = (u16::from(!value & 0x03)) << 14;
                vic_base_address_clone.set(base_address);
                // serial bus drivers: a set output bit grounds the line
                let mut bus = iec_clone.borrow_mut();
                bus.set_atn(cobalt64_core::drive::iec::HOST, value & 0x08 != 0);
                bus.set_clk(cobalt64_core::drive::iec::HOST, value & 0x10 != 0);
                bus.set_data(cobalt64_core::drive::iec::HOST, value & 0x20 != 0);
            }));

        let power_supply = PowerSupply::new(config.model.power_grid, config.model.cpu_freq);
        C64 {
            config,
            cpu,
            cia_1,
            cia_2,
            sid,
            vic,
            color_ram,
            expansion_port,
            ram,
            datassette,
            drives,
            iec,
            joystick_1,
            joystick_2,
            mouse,
            paddle,
            keyboard,
            frame_buffer,
            sound_buffer,
            breakpoints: BreakpointManager::default(),
            clock,
            power_supply,
            tod_counters: [0; 2],
            frame_count: 0,
            last_pc: 0,
            vsync_flag,
            cia_2_port_a,
        }
    }

    // -- Accessors

    pub fn get_bpm(&self) -> &BreakpointManager {
        &self.breakpoints
    }

    pub fn get_bpm_mut(&mut self) -> &mut BreakpointManager {
        &mut self.breakpoints
    }

    pub fn get_clock(&self) -> Rc<Clock> {
        self.clock.clone()
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    pub fn get_cpu(&self) -> &dyn Cpu {
        &*self.cpu
    }

    pub fn get_cpu_mut(&mut self) -> &mut dyn Cpu {
        &mut *self.cpu
    }

    pub fn get_cycles(&self) -> u64 {
        self.clock.get()
    }

    pub fn get_cia_1(&self) -> Shared<dyn Chip> {
        self.cia_1.clone()
    }

    pub fn get_cia_2(&self) -> Shared<dyn Chip> {
        self.cia_2.clone()
    }

    pub fn get_datasette(&self) -> Shared<Datassette> {
        self.datassette.clone()
    }

    pub fn get_drive(&self, unit: usize) -> &Drive {
        &self.drives[unit]
    }

    pub fn get_drive_mut(&mut self, unit: usize) -> &mut Drive {
        &mut self.drives[unit]
    }

    pub fn get_frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn get_joystick_mut(&mut self, port: u8) -> Option<&mut Joystick> {
        match port {
            1 => self.joystick_1.as_mut(),
            2 => self.joystick_2.as_mut(),
            _ => None,
        }
    }

    pub fn get_keyboard(&mut self) -> &mut Keyboard {
        &mut self.keyboard
    }

    pub fn get_mouse_mut(&mut self) -> Option<&mut Mouse> {
        self.mouse.as_mut()
    }

    pub fn get_paddle_mut(&mut self) -> Option<&mut Paddle> {
        self.paddle.as_mut()
    }

    pub fn get_sid(&self) -> Shared<dyn Chip> {
        self.sid.clone()
    }

    pub fn get_vic(&self) -> Shared<dyn Chip> {
        self.vic.clone()
    }

    pub fn get_vsync(&self) -> bool {
        self.vsync_flag.get()
    }

    pub fn reset_vsync(&self) {
        self.vsync_flag.set(false)
    }

    pub fn is_cpu_jammed(&self) -> bool {
        self.cpu.is_jammed()
    }

    // -- Memory ops

    pub fn load(&mut self, data: &[u8], offset: u16) {
        let mut mem = self.ram.borrow_mut();
        let mut address = offset;
        for byte in data {
            mem.write(address, *byte);
            address = address.wrapping_add(1);
        }
    }

    pub fn peek_ram(&self, start: u16, length: usize) -> Vec<u8> {
        let mem = self.ram.borrow();
        let mut result = Vec::with_capacity(length);
        let mut address = start;
        for _ in 0..length {
            result.push(mem.read(address));
            address = address.wrapping_add(1);
        }
        result
    }

    // -- Lifecycle

    pub fn reset(&mut self, hard: bool) {
        info!(target: "c64", "Resetting system");
        self.clock.reset();
        // Memory
        if hard {
            self.ram.borrow_mut().fill(0x00);
            self.color_ram.borrow_mut().fill(0x00);
        }
        // Chipset
        self.cpu.reset();
        self.cia_1.borrow_mut().reset();
        self.cia_2.borrow_mut().reset();
        self.sid.borrow_mut().reset();
        self.vic.borrow_mut().reset();
        // I/O
        self.expansion_port.borrow_mut().reset();
        self.iec.borrow_mut().reset();
        // Peripherals
        self.datassette.borrow_mut().reset();
        for drive in self.drives.iter_mut() {
            if drive.is_enabled() {
                drive.reset();
            }
        }
        if let Some(ref mut joystick) = self.joystick_1 {
            joystick.reset();
        }
        if let Some(ref mut joystick) = self.joystick_2 {
            joystick.reset();
        }
        if let Some(ref mut mouse) = self.mouse {
            mouse.reset();
        }
        if let Some(ref mut paddle) = self.paddle {
            paddle.reset();
        }
        self.keyboard.reset();
        self.frame_buffer.borrow_mut().reset();
        self.sound_buffer.reset();
        // Runtime state
        self.tod_counters = [0; 2];
        self.frame_count = 0;
        self.last_pc = 0;
        self.vsync_flag.set(false);
        // the CPU reset re-ran the port observers, leaving the PLA in the
        // default configuration
    }

    // -- Execution

    /// Advance every component by one clock cycle.
    pub fn step_cycle(&mut self) {
        self.cpu.step_cycle();
        self.cia_1.borrow_mut().clock();
        self.cia_2.borrow_mut().clock();
        self.vic.borrow_mut().clock();
        self.datassette.borrow_mut().clock();
        for drive in self.drives.iter_mut() {
            drive.clock();
        }
        self.update_iec_inputs();
        self.tick_tod();
        self.clock.tick();
    }

    /// Advance to the next instruction boundary.
    pub fn step(&mut self) {
        self.last_pc = self.cpu.get_pc();
        self.step_cycle();
        while !self.cpu.at_fetch() && !self.cpu.is_jammed() {
            self.step_cycle();
        }
    }

    /// Run until the end of the current raster line.
    pub fn finish_line(&mut self) {
        let cpl = u64::from(self.config.model.vic_model.cycles_per_line());
        let target = self.clock.get() + cpl - self.clock.get() % cpl;
        while self.clock.get() < target {
            self.step_cycle();
        }
    }

    pub fn check_breakpoints(&mut self) -> Option<u16> {
        self.breakpoints.check(&*self.cpu)
    }

    pub fn run_frame(&mut self) -> RunResult {
        let bp_present = self.breakpoints.is_bp_present();
        while !self.vsync_flag.get() {
            self.step();
            if self.cpu.is_jammed() {
                return RunResult::CpuJammed(self.last_pc);
            }
            if bp_present {
                if let Some(address) = self.check_breakpoints() {
                    return RunResult::BreakpointReached(address);
                }
            }
        }
        self.process_vsync();
        RunResult::FrameCompleted
    }

    pub fn process_vsync(&mut self) {
        if self.vsync_flag.get() {
            self.sid.borrow_mut().process_vsync();
            self.cia_1.borrow_mut().process_vsync();
            self.cia_2.borrow_mut().process_vsync();
            self.keyboard.drain_event();
            let frame_cycles = self.config.model.cycles_per_frame;
            if let Some(ref mut joystick) = self.joystick_1 {
                joystick.clock_delta(frame_cycles);
            }
            if let Some(ref mut joystick) = self.joystick_2 {
                joystick.clock_delta(frame_cycles);
            }
            self.frame_count = self.frame_count.wrapping_add(1);
            self.vsync_flag.set(false);
        }
    }

    fn update_iec_inputs(&mut self) {
        let (clk, data) = {
            let bus = self.iec.borrow();
            (bus.clk(), bus.data())
        };
        let mut port_a = self.cia_2_port_a.borrow_mut();
        port_a.set_input_bit(6, clk);
        port_a.set_input_bit(7, data);
    }

    /*
    The TOD pin is clocked by the power grid; the supply model returns the
    cycle count to the next tenth increment, including jitter on the
    unstable grids. CRA bit 7 selects which grid frequency the CIA divider
    expects.
    */
    fn tick_tod(&mut self) {
        for index in 0..2 {
            if self.tod_counters[index] == 0 {
                let cia = if index == 0 { &self.cia_1 } else { &self.cia_2 };
                let cra = cia.borrow_mut().read(0x0e);
                self.tod_counters[index] = self.power_supply.tod_tick_delay(cra & 0x80 == 0);
            }
            self.tod_counters[index] -= 1;
            if self.tod_counters[index] == 0 {
                let cia = if index == 0 { &self.cia_1 } else { &self.cia_2 };
                cia.borrow_mut().tod_tick();
            }
        }
    }

    // -- Peripheral ops

    pub fn attach_cartridge(&mut self, cartridge: Cartridge) {
        self.expansion_port.borrow_mut().attach(cartridge);
        self.reset(false);
    }

    pub fn detach_cartridge(&mut self) {
        self.expansion_port.borrow_mut().detach();
        self.reset(false);
    }

    pub fn attach_tape(&mut self, tape: Box<dyn Tape>) {
        self.datassette.borrow_mut().attach(tape);
    }

    pub fn detach_tape(&mut self) {
        self.datassette.borrow_mut().detach();
    }

    pub fn insert_disk(&mut self, unit: usize, disk: GcrDisk) {
        self.drives[unit].attach_disk(disk);
    }

    pub fn eject_disk(&mut self, unit: usize) -> Option<GcrDisk> {
        self.drives[unit].eject_disk()
    }

    pub fn set_drive_enabled(&mut self, unit: usize, enabled: bool) {
        self.drives[unit].set_enabled(enabled);
    }

    pub(crate) fn restore_counters(&mut self, frame_count: u32) {
        self.frame_count = frame_count;
        self.tod_counters = [0; 2];
        self.last_pc = self.cpu.get_pc();
    }

    // -- Snapshots

    pub fn save_snapshot(&self) -> Vec<u8> {
        snapshot::save(self)
    }

    pub fn load_snapshot(&mut self, data: &[u8]) -> Result<(), Error> {
        snapshot::load(self, data)
    }

    pub(crate) fn snapshot_components(&self) -> snapshot::Components<'_> {
        snapshot::Components {
            cpu: &*self.cpu,
            ram: &self.ram,
            color_ram: &self.color_ram,
            cia_1: &self.cia_1,
            cia_2: &self.cia_2,
            vic: &self.vic,
            sid: &self.sid,
            keyboard: &self.keyboard,
            drives: &self.drives,
            datassette: &self.datassette,
        }
    }

    pub(crate) fn snapshot_components_mut(
        &mut self,
    ) -> (
        &mut dyn Cpu,
        &Shared<Ram>,
        &Shared<Ram>,
        &Shared<dyn Chip>,
        &Shared<dyn Chip>,
        &Shared<dyn Chip>,
        &Shared<dyn Chip>,
        &mut Keyboard,
        &mut Vec<Drive>,
    ) {
        (
            &mut *self.cpu,
            &self.ram,
            &self.color_ram,
            &self.cia_1,
            &self.cia_2,
            &self.vic,
            &self.sid,
            &mut self.keyboard,
            &mut self.drives,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::C64Factory;
    use super::*;
    use cobalt64_core::factory::SystemModel;

    fn build_c64() -> C64 {
        // synthetic ROMs: the kernal reset vector points at a tight loop
        let mut kernal = vec![0xea; 0x2000];
        kernal[0x1ffc] = 0xe2;
        kernal[0x1ffd] = 0xfc; // $FCE2
        kernal[0x1ce2] = 0x4c; // JMP $FCE2
        kernal[0x1ce3] = 0xe2;
        kernal[0x1ce4] = 0xfc;
        let basic = vec![0x94; 0x2000];
        let charset = vec![0x11; 0x1000];
        let config = Rc::new(Config::new_with_roms(
            SystemModel::c64_pal(),
            &basic,
            &charset,
            &kernal,
        ));
        let factory = C64Factory::new(config.clone());
        let video: Shared<dyn VideoOutput> = new_shared(NullVideo {});
        let sound: Arc<dyn SoundOutput> = Arc::new(NullSound {});
        let mut c64 = C64::build(config, &factory, video, sound);
        c64.reset(true);
        c64
    }

    struct NullSound;
    impl SoundOutput for NullSound {
        fn reset(&self) {}
        fn write(&self, _samples: &[i16]) {}
    }

    struct NullVideo;
    impl VideoOutput for NullVideo {
        fn get_dimension(&self) -> (usize, usize) {
            (520, 312)
        }
        fn reset(&mut self) {}
        fn write(&mut self, _index: usize, _color: u8) {}
    }

    #[test]
    fn reset_follows_kernal_vector() {
        let c64 = build_c64();
        assert_eq!(0xfce2, c64.get_cpu().get_pc());
    }

    #[test]
    fn verify_mem_layout() {
        let c64 = build_c64();
        assert_eq!(0x94, c64.get_cpu().read(0xa000));
    }

    #[test]
    fn frame_advances_expected_cycles() {
        let mut c64 = build_c64();
        match c64.run_frame() {
            RunResult::FrameCompleted => {}
            _ => panic!("unexpected frame result"),
        }
        assert_eq!(u64::from(c64.get_config().model.cycles_per_frame), {
            // the frame boundary lands within the last instruction
            let cycles = c64.get_cycles();
            cycles - cycles % u64::from(c64.get_config().model.cycles_per_frame)
        });
        assert_eq!(1, c64.get_frame_count());
    }

    #[test]
    fn breakpoint_pauses_frame() {
        let mut c64 = build_c64();
        c64.get_bpm_mut().set(0xfce2, false);
        match c64.run_frame() {
            RunResult::BreakpointReached(addr) => assert_eq!(0xfce2, addr),
            _ => panic!("expected breakpoint"),
        }
    }

    #[test]
    fn snapshot_roundtrip_preserves_state() {
        let mut c64 = build_c64();
        for _ in 0..100 {
            c64.step();
        }
        c64.load(&[0xde, 0xad], 0x4000);
        let data = c64.save_snapshot();
        let pc = c64.get_cpu().get_pc();
        let mut other = build_c64();
        other.load_snapshot(&data).unwrap();
        assert_eq!(pc, other.get_cpu().get_pc());
        assert_eq!(vec![0xde, 0xad], other.peek_ram(0x4000, 2));
        // saving the restored machine reproduces the image
        assert_eq!(data, other.save_snapshot());
    }

    #[test]
    fn corrupted_snapshot_is_rejected() {
        let mut c64 = build_c64();
        let mut data = c64.save_snapshot();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        assert!(c64.load_snapshot(&data).is_err());
    }
}
