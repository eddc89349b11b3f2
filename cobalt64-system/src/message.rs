// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

/// Typed notifications delivered to the host in FIFO order.
#[derive(Debug)]
pub enum Message {
    // State transitions
    PoweredOn,
    PoweredOff,
    Running,
    Paused,
    Halted,
    Reset,
    // System characteristics
    Pal,
    Ntsc,
    // Execution events
    CpuJammed(u16),
    BreakpointReached(u16),
    WarpOn,
    WarpOff,
    // Tape
    TapeInserted,
    TapeEjected,
    TapePlaying,
    TapeStopped,
    TapeProgress(usize),
    // Drives
    DriveConnected(u8, bool),
    DiskInserted(u8),
    DiskEjected(u8),
    // Audio
    SoundBufferOverflow,
    SoundBufferUnderflow,
    // Snapshots
    Snapshot(Vec<u8>),
    SnapshotRestored,
    SnapshotError(String),
    // Command feedback
    ConfigError(String),
}
