// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;
use std::sync::Arc;

use cobalt64_core::factory::{Register, SoundOutput, SystemModel, VideoOutput};
use cobalt64_core::util::{new_shared, Shared};
use cobalt64_system::{C64Factory, Config, RunResult, C64};

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

fn build_c64() -> C64 {
    // synthetic kernal: NOP sled, reset vector at $FCE2, IRQ vector at
    // $8000 in RAM
    let mut kernal = vec![0xea; 0x2000];
    kernal[0x1ffc] = 0xe2;
    kernal[0x1ffd] = 0xfc;
    kernal[0x1ffe] = 0x00;
    kernal[0x1fff] = 0x80;
    let basic = vec![0x94; 0x2000];
    let charset = vec![0x3c; 0x1000];
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

#[test]
fn reset_lands_on_kernal_vector() {
    let c64 = build_c64();
    assert_eq!(0xfce2, c64.get_cpu().get_pc());
}

#[test]
fn basic_rom_is_banked_in() {
    let c64 = build_c64();
    assert_eq!(0x94, c64.get_cpu().read(0xa000));
}

#[test]
fn raster_irq_fires_at_line_start() {
    let mut c64 = build_c64();
    // enable the raster interrupt for line 100 and unmask CPU interrupts
    c64.get_cpu_mut().write(0xd01a, 0x01);
    c64.get_cpu_mut().write(0xd012, 0x64);
    c64.get_cpu_mut().write(0xd011, 0x1b);
    c64.get_cpu_mut().set_register(Register::P, 0x20);
    c64.get_bpm_mut().set(0x8000, false);
    match c64.run_frame() {
        RunResult::BreakpointReached(address) => assert_eq!(0x8000, address),
        _ => panic!("expected the raster irq handler"),
    }
    // the handler was entered within a few cycles of the start of line 100
    let cycles = c64.get_cycles();
    let line = cycles / 63;
    let cycle_in_line = cycles % 63;
    assert_eq!(100, line);
    assert!(cycle_in_line <= 16, "irq latency too long: {}", cycle_in_line);
}

#[test]
fn cpu_stalls_on_bad_line() {
    let mut c64 = build_c64();
    // enable the display so bad lines occur; yscroll 3 matches line 0x33
    c64.get_cpu_mut().write(0xd011, 0x1b);
    let target_line = 0x33u64;
    while c64.get_cycles() / 63 != target_line {
        c64.step_cycle();
    }
    let pc_before = c64.get_cpu().get_pc();
    // cycles 12-54 of the line belong to the VIC; the NOP sled would cover
    // 20+ instructions in that window if the CPU were not frozen
    for _ in 0..43 {
        c64.step_cycle();
    }
    let pc_after = c64.get_cpu().get_pc();
    assert!(
        pc_after.wrapping_sub(pc_before) < 12,
        "cpu advanced too far on a bad line: {} -> {}",
        pc_before,
        pc_after
    );
}

#[test]
fn frame_counter_advances() {
    let mut c64 = build_c64();
    for _ in 0..3 {
        match c64.run_frame() {
            RunResult::FrameCompleted => {}
            _ => panic!("unexpected frame result"),
        }
    }
    assert_eq!(3, c64.get_frame_count());
}

#[test]
fn tod_ticks_with_power_grid() {
    let mut c64 = build_c64();
    // select the 50 Hz divider to match the PAL grid
    c64.get_cia_1().borrow_mut().write(0x0e, 0x80);
    // a tenth of a second of cycles plus slack
    let cycles = 985_248 / 10 + 1000;
    for _ in 0..cycles {
        c64.step_cycle();
    }
    let tenths = c64.get_cia_1().borrow_mut().read(0x08);
    assert_eq!(0x01, tenths & 0x0f);
}

#[test]
fn snapshot_survives_running_machine() {
    let mut c64 = build_c64();
    for _ in 0..1000 {
        c64.step();
    }
    let image = c64.save_snapshot();
    let cycles = c64.get_cycles();
    let mut restored = build_c64();
    restored.load_snapshot(&image).unwrap();
    assert_eq!(cycles, restored.get_cycles());
    assert_eq!(c64.get_cpu().get_pc(), restored.get_cpu().get_pc());
    // both machines continue identically
    c64.step();
    restored.step();
    assert_eq!(c64.get_cpu().get_pc(), restored.get_cpu().get_pc());
    assert_eq!(c64.get_cycles(), restored.get_cycles());
}
