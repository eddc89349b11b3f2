// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use cobalt64_core::util::new_shared;
use cobalt64_core::Error;

use super::c64::RunResult;
use super::command::{Command, MouseButton};
use super::config::Config;
use super::frame_buffer::{FrameBuffer, VideoBuffer};
use super::message::Message;
use super::palette::Palette;
use super::sound_buffer::SoundBuffer;
use super::{C64, C64Factory};

// Design:
//   The emulation runs on a dedicated worker thread driven by wake-up
//   pulses from the host (typically one per host video frame). Each
//   iteration drains the command queue, computes one emulated frame,
//   publishes the frame texture and sleeps on the wake-up condition with a
//   timeout of one refresh period. Suspension happens only at these frame
//   boundaries: suspend() blocks until the worker parks, giving the caller
//   a consistent view of the shared buffers.

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum State {
    Off = 0,
    Paused = 1,
    Running = 2,
    Halted = 3,
}

impl State {
    fn from(value: u8) -> State {
        match value {
            0 => State::Off,
            1 => State::Paused,
            2 => State::Running,
            _ => State::Halted,
        }
    }
}

struct SharedState {
    halt: AtomicBool,
    state: AtomicU8,
    warp: AtomicU8,
    wakeup: Mutex<bool>,
    wakeup_cond: Condvar,
    suspend: Mutex<SuspendState>,
    suspend_cond: Condvar,
    frame_buffer: FrameBuffer,
    sound_buffer: Arc<SoundBuffer>,
}

#[derive(Default)]
struct SuspendState {
    requests: usize,
    parked: bool,
}

/// Host-side handle to the emulation worker.
pub struct Emulator {
    command_tx: Sender<Command>,
    shared: Arc<SharedState>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Emulator {
    /// Start the worker thread. The machine is constructed inside the
    /// worker on the first POWER_ON command.
    pub fn launch(config: Config) -> (Emulator, Receiver<Message>) {
        let (command_tx, command_rx) = channel();
        let (message_tx, message_rx) = channel();
        let (width, height) = config.model.frame_buffer_size;
        let shared = Arc::new(SharedState {
            halt: AtomicBool::new(false),
            state: AtomicU8::new(State::Off as u8),
            warp: AtomicU8::new(0),
            wakeup: Mutex::new(false),
            wakeup_cond: Condvar::new(),
            suspend: Mutex::new(SuspendState::default()),
            suspend_cond: Condvar::new(),
            frame_buffer: FrameBuffer::new(width, height),
            sound_buffer: Arc::new(SoundBuffer::new(config.sound.buffer_size)),
        });
        let shared_clone = shared.clone();
        let worker = thread::Builder::new()
            .name("emulation".to_string())
            .spawn(move || {
                let mut worker = Worker::new(config, shared_clone, command_rx, message_tx);
                worker.run();
            })
            .expect("failed to spawn emulation thread");
        (
            Emulator {
                command_tx,
                shared,
                worker: Some(worker),
            },
            message_rx,
        )
    }

    pub fn send(&self, command: Command) -> Result<(), Error> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::Runtime("emulation thread is gone".to_string()))?;
        self.wake();
        Ok(())
    }

    /// Wake-up pulse; the host typically sends one per video frame.
    pub fn wake(&self) {
        let mut pending = self
            .shared
            .wakeup
            .lock()
            .expect("poisoned wakeup lock");
        *pending = true;
        self.shared.wakeup_cond.notify_one();
    }

    pub fn state(&self) -> State {
        State::from(self.shared.state.load(Ordering::Acquire))
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.shared.frame_buffer
    }

    pub fn sound_buffer(&self) -> Arc<SoundBuffer> {
        self.shared.sound_buffer.clone()
    }

    /// Force-pause the worker at its next safe point and block until it
    /// parks. Every suspend must be paired with a resume.
    pub fn suspend(&self) {
        let mut suspend = self
            .shared
            .suspend
            .lock()
            .expect("poisoned suspend lock");
        suspend.requests += 1;
        self.wake();
        let mut suspend = suspend;
        while !suspend.parked {
            suspend = self
                .shared
                .suspend_cond
                .wait(suspend)
                .expect("poisoned suspend lock");
        }
    }

    pub fn resume(&self) {
        let mut suspend = self
            .shared
            .suspend
            .lock()
            .expect("poisoned suspend lock");
        if suspend.requests > 0 {
            suspend.requests -= 1;
        }
        self.shared.suspend_cond.notify_all();
    }

    /// Request termination; the worker observes the flag at its next safe
    /// point.
    pub fn halt(&self) {
        self.shared.halt.store(true, Ordering::Release);
        self.wake();
    }

    /// Wait for the worker to exit.
    pub fn join(mut self) {
        self.halt();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        self.halt();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct Worker {
    config: Config,
    shared: Arc<SharedState>,
    command_rx: Receiver<Command>,
    message_tx: Sender<Message>,
    c64: Option<C64>,
    video_buffer: cobalt64_core::util::Shared<VideoBuffer>,
}

impl Worker {
    fn new(
        config: Config,
        shared: Arc<SharedState>,
        command_rx: Receiver<Command>,
        message_tx: Sender<Message>,
    ) -> Self {
        let (width, height) = config.model.frame_buffer_size;
        let video_buffer = new_shared(VideoBuffer::new(width, height, Palette::default()));
        Self {
            config,
            shared,
            command_rx,
            message_tx,
            c64: None,
            video_buffer,
        }
    }

    fn run(&mut self) {
        info!(target: "exec", "Emulation thread started");
        loop {
            self.drain_commands();
            if self.shared.halt.load(Ordering::Acquire) {
                break;
            }
            self.service_suspend();
            match self.state() {
                State::Running => {
                    self.compute_frame();
                    if self.warp() == 0 {
                        self.sleep(self.frame_duration());
                    }
                }
                _ => {
                    self.sleep(Duration::from_millis(20));
                }
            }
        }
        self.set_state(State::Halted);
        self.send(Message::Halted);
        info!(target: "exec", "Emulation thread stopped");
    }

    // -- Helpers

    fn state(&self) -> State {
        State::from(self.shared.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: State) {
        self.shared.state.store(state as u8, Ordering::Release);
    }

    fn warp(&self) -> u8 {
        self.shared.warp.load(Ordering::Acquire)
    }

    fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.model.refresh_rate)
    }

    fn send(&self, message: Message) {
        let _ = self.message_tx.send(message);
    }

    fn sleep(&self, timeout: Duration) {
        let mut pending = self
            .shared
            .wakeup
            .lock()
            .expect("poisoned wakeup lock");
        if !*pending {
            let (guard, _) = self
                .shared
                .wakeup_cond
                .wait_timeout(pending, timeout)
                .expect("poisoned wakeup lock");
            pending = guard;
        }
        *pending = false;
    }

    fn service_suspend(&self) {
        let mut suspend = self
            .shared
            .suspend
            .lock()
            .expect("poisoned suspend lock");
        if suspend.requests == 0 {
            return;
        }
        suspend.parked = true;
        self.shared.suspend_cond.notify_all();
        while suspend.requests > 0 {
            suspend = self
                .shared
                .suspend_cond
                .wait(suspend)
                .expect("poisoned suspend lock");
        }
        suspend.parked = false;
    }

    fn compute_frame(&mut self) {
        let result = match self.c64.as_mut() {
            Some(c64) => c64.run_frame(),
            None => return,
        };
        match result {
            RunResult::FrameCompleted => {
                self.publish_frame();
            }
            RunResult::BreakpointReached(address) => {
                self.set_state(State::Paused);
                self.send(Message::BreakpointReached(address));
                self.send(Message::Paused);
            }
            RunResult::CpuJammed(pc) => {
                self.set_state(State::Paused);
                self.send(Message::CpuJammed(pc));
                self.send(Message::Paused);
            }
        }
        if self.shared.sound_buffer.take_overflow() {
            self.send(Message::SoundBufferOverflow);
        }
        if self.shared.sound_buffer.take_underflow() {
            self.send(Message::SoundBufferUnderflow);
        }
        if let Some(c64) = self.c64.as_ref() {
            let datassette = c64.get_datasette();
            let datassette = datassette.borrow();
            if datassette.is_playing() && c64.get_frame_count() % 50 == 0 {
                self.send(Message::TapeProgress(datassette.position()));
            }
        }
    }

    fn publish_frame(&self) {
        self.shared
            .frame_buffer
            .publish(self.video_buffer.borrow().pixels());
    }

    fn power_on(&mut self) {
        if self.c64.is_some() {
            return;
        }
        let config = Rc::new(self.config.clone());
        let factory = C64Factory::new(config.clone());
        let mut c64 = C64::build(
            config,
            &factory,
            self.video_buffer.clone(),
            self.shared.sound_buffer.clone(),
        );
        c64.reset(true);
        self.c64 = Some(c64);
        self.set_state(State::Paused);
        self.send(Message::PoweredOn);
        if self.config.model.vic_model.is_pal() {
            self.send(Message::Pal);
        } else {
            self.send(Message::Ntsc);
        }
    }

    fn power_off(&mut self) {
        if self.c64.take().is_some() {
            self.set_state(State::Off);
            self.send(Message::PoweredOff);
        }
    }

    fn drain_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.shared.halt.store(true, Ordering::Release);
                    break;
                }
            }
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::PowerOn => self.power_on(),
            Command::PowerOff => self.power_off(),
            Command::Run => {
                if self.c64.is_some() {
                    self.set_state(State::Running);
                    self.send(Message::Running);
                }
            }
            Command::Pause => {
                if self.state() == State::Running {
                    self.set_state(State::Paused);
                    self.send(Message::Paused);
                }
            }
            Command::HardReset => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.reset(true);
                    self.send(Message::Reset);
                }
            }
            Command::SoftReset => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.reset(false);
                    self.send(Message::Reset);
                }
            }
            Command::Halt => {
                self.shared.halt.store(true, Ordering::Release);
            }
            Command::StepInto => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.step();
                    c64.process_vsync();
                }
            }
            Command::StepOver => self.step_over(),
            Command::StepCycle => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.step_cycle();
                    c64.process_vsync();
                }
            }
            Command::FinishLine => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.finish_line();
                    c64.process_vsync();
                }
            }
            Command::FinishFrame => {
                if self.c64.is_some() {
                    self.compute_frame();
                }
            }
            Command::WarpOn(source) => {
                let prev = self
                    .shared
                    .warp
                    .fetch_or(1 << (source & 0x07), Ordering::AcqRel);
                if prev == 0 {
                    self.send(Message::WarpOn);
                }
            }
            Command::WarpOff(source) => {
                let prev = self
                    .shared
                    .warp
                    .fetch_and(!(1 << (source & 0x07)), Ordering::AcqRel);
                if prev != 0 && self.warp() == 0 {
                    self.send(Message::WarpOff);
                }
            }
            Command::KeyPress(key, delay) => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.get_keyboard().schedule(
                        cobalt64_core::device::KeyEvent::new(key),
                        true,
                        delay,
                    );
                }
            }
            Command::KeyRelease(key, delay) => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.get_keyboard().schedule(
                        cobalt64_core::device::KeyEvent::new(key),
                        false,
                        delay,
                    );
                }
            }
            Command::KeyToggle(key) => {
                if let Some(c64) = self.c64.as_mut() {
                    let keyboard = c64.get_keyboard();
                    let pressed = keyboard.is_pressed(key);
                    keyboard.set_key(key, !pressed);
                }
            }
            Command::KeyReleaseAll => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.get_keyboard().release_all();
                }
            }
            Command::KeyType(text) => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.get_keyboard().enqueue(&text);
                }
            }
            Command::MouseMoveAbs(_port, x, y) => {
                if let Some(c64) = self.c64.as_mut() {
                    if let Some(mouse) = c64.get_mouse_mut() {
                        mouse.move_abs(x, y);
                    }
                }
            }
            Command::MouseMoveRel(_port, dx, dy) => {
                if let Some(c64) = self.c64.as_mut() {
                    if let Some(mouse) = c64.get_mouse_mut() {
                        mouse.move_rel(dx, dy);
                    }
                }
            }
            Command::MouseButton(_port, action) => {
                if let Some(c64) = self.c64.as_mut() {
                    if let Some(mouse) = c64.get_mouse_mut() {
                        match action {
                            MouseButton::LeftDown => mouse.set_left_button(true),
                            MouseButton::LeftUp => mouse.set_left_button(false),
                            MouseButton::RightDown => mouse.set_right_button(true),
                            MouseButton::RightUp => mouse.set_right_button(false),
                        }
                    }
                }
            }
            Command::JoyEvent(port, event) => {
                if let Some(c64) = self.c64.as_mut() {
                    if let Some(joystick) = c64.get_joystick_mut(port) {
                        joystick.on_event(event);
                    }
                }
            }
            Command::Config(option) => self.apply_config(option),
            Command::ConfigScheme(model) => {
                if self.c64.is_some() {
                    self.send(Message::ConfigError(
                        "config scheme requires power off".to_string(),
                    ));
                } else {
                    self.config.model =
                        cobalt64_core::factory::SystemModel::from(model.as_str());
                }
            }
            Command::TapeInsert(tape) => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.attach_tape(tape);
                    self.send(Message::TapeInserted);
                }
            }
            Command::TapeEject => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.detach_tape();
                    self.send(Message::TapeEjected);
                }
            }
            Command::TapePlay => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.get_datasette().borrow_mut().play();
                    self.send(Message::TapePlaying);
                }
            }
            Command::TapeStop => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.get_datasette().borrow_mut().stop();
                    self.send(Message::TapeStopped);
                }
            }
            Command::TapeRewind => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.get_datasette().borrow_mut().rewind();
                }
            }
            Command::DiskInsert(drive, disk) => {
                if let Some(c64) = self.c64.as_mut() {
                    let unit = usize::from(drive.saturating_sub(8)) & 0x01;
                    c64.insert_disk(unit, disk);
                    self.send(Message::DiskInserted(drive));
                }
            }
            Command::DiskEject(drive) => {
                if let Some(c64) = self.c64.as_mut() {
                    let unit = usize::from(drive.saturating_sub(8)) & 0x01;
                    c64.eject_disk(unit);
                    self.send(Message::DiskEjected(drive));
                }
            }
            Command::AttachCartridge(spec) => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.attach_cartridge(spec.into_cartridge());
                }
            }
            Command::DetachCartridge => {
                if let Some(c64) = self.c64.as_mut() {
                    c64.detach_cartridge();
                }
            }
            Command::SaveSnapshot => {
                if let Some(c64) = self.c64.as_ref() {
                    self.send(Message::Snapshot(c64.save_snapshot()));
                }
            }
            Command::LoadSnapshot(data) => {
                if let Some(c64) = self.c64.as_mut() {
                    match c64.load_snapshot(&data) {
                        Ok(()) => self.send(Message::SnapshotRestored),
                        Err(err) => self.send(Message::SnapshotError(err.to_string())),
                    }
                }
            }
        }
    }

    fn step_over(&mut self) {
        if let Some(c64) = self.c64.as_mut() {
            let pc = c64.get_cpu().get_pc();
            let opcode = c64.get_cpu().read(pc);
            if opcode == 0x20 {
                // run the subroutine to completion via a soft breakpoint
                let return_addr = pc.wrapping_add(3);
                c64.get_bpm_mut().set(return_addr, true);
                loop {
                    c64.step();
                    if c64.is_cpu_jammed() {
                        break;
                    }
                    if c64.check_breakpoints().is_some() {
                        break;
                    }
                    c64.process_vsync();
                }
            } else {
                c64.step();
            }
            c64.process_vsync();
        }
    }

    fn apply_config(&mut self, option: super::config::ConfigOption) {
        let hot = option.is_hot();
        if self.c64.is_some() && !hot {
            self.send(Message::ConfigError(
                "option requires power off".to_string(),
            ));
            return;
        }
        let applied = self.config.apply(option.clone());
        if let Err(err) = applied {
            self.send(Message::ConfigError(err.to_string()));
            return;
        }
        // propagate hot options into the live machine
        if let Some(c64) = self.c64.as_mut() {
            match option {
                super::config::ConfigOption::DriveConnect(drive, connected) => {
                    let unit = usize::from(drive - 8);
                    c64.set_drive_enabled(unit, connected);
                    self.send(Message::DriveConnected(drive, connected));
                }
                super::config::ConfigOption::AutofirePeriod(period) => {
                    for port in 1..=2u8 {
                        if let Some(joystick) = c64.get_joystick_mut(port) {
                            joystick.set_autofire(true, period);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobalt64_core::factory::SystemModel;
    use std::time::Instant;

    fn recv_message(rx: &Receiver<Message>, timeout: Duration) -> Option<Message> {
        rx.recv_timeout(timeout).ok()
    }

    fn launch() -> (Emulator, Receiver<Message>) {
        let config = Config::new(SystemModel::c64_pal());
        Emulator::launch(config)
    }

    #[test]
    fn power_on_reports_state() {
        let (emu, rx) = launch();
        emu.send(Command::PowerOn).unwrap();
        match recv_message(&rx, Duration::from_secs(5)) {
            Some(Message::PoweredOn) => {}
            other => panic!("unexpected message {:?}", other),
        }
        match recv_message(&rx, Duration::from_secs(5)) {
            Some(Message::Pal) => {}
            other => panic!("unexpected message {:?}", other),
        }
        emu.join();
    }

    #[test]
    fn frames_are_published_while_running() {
        let (emu, rx) = launch();
        emu.send(Command::PowerOn).unwrap();
        emu.send(Command::Run).unwrap();
        let _ = recv_message(&rx, Duration::from_secs(5));
        let deadline = Instant::now() + Duration::from_secs(10);
        while emu.frame_buffer().frame_count() < 2 {
            emu.wake();
            if Instant::now() > deadline {
                panic!("no frames produced");
            }
            thread::sleep(Duration::from_millis(5));
        }
        emu.join();
    }

    #[test]
    fn suspend_blocks_until_parked() {
        let (emu, _rx) = launch();
        emu.send(Command::PowerOn).unwrap();
        emu.send(Command::Run).unwrap();
        emu.suspend();
        let count = emu.frame_buffer().frame_count();
        thread::sleep(Duration::from_millis(50));
        // no frames are produced while suspended
        assert_eq!(count, emu.frame_buffer().frame_count());
        emu.resume();
        emu.join();
    }

    #[test]
    fn halt_terminates_worker() {
        let (emu, rx) = launch();
        emu.send(Command::PowerOn).unwrap();
        emu.halt();
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match recv_message(&rx, Duration::from_secs(1)) {
                Some(Message::Halted) => break,
                Some(_) => {}
                None => {
                    if Instant::now() > deadline {
                        panic!("worker did not halt");
                    }
                }
            }
        }
        emu.join();
    }
}
