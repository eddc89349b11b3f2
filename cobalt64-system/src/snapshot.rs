// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use cobalt64_core::device::{Datassette, Keyboard};
use cobalt64_core::drive::Drive;
use cobalt64_core::factory::{Chip, Cpu};
use cobalt64_core::util::state::fnv1a;
use cobalt64_core::util::{Ram, Shared, StateReader, StateWriter};
use cobalt64_core::Error;

use super::c64::C64;

// Layout: a fixed header (magic, version, flags, checksum over the
// payload) followed by length-prefixed component blobs in fixed order.
// Loads verify the header and pre-split every blob before any component
// state is touched, so a corrupted image leaves the machine unchanged.

const MAGIC: u32 = 0x6363_3634; // "cc64"
const VERSION: u32 = 1;
const HEADER_LEN: usize = 16;

const BLOB_COUNT: usize = 11;

pub(crate) struct Components<'a> {
    pub cpu: &'a dyn Cpu,
    pub ram: &'a Shared<Ram>,
    pub color_ram: &'a Shared<Ram>,
    pub cia_1: &'a Shared<dyn Chip>,
    pub cia_2: &'a Shared<dyn Chip>,
    pub vic: &'a Shared<dyn Chip>,
    pub sid: &'a Shared<dyn Chip>,
    pub keyboard: &'a Keyboard,
    pub drives: &'a Vec<Drive>,
    pub datassette: &'a Shared<Datassette>,
}

fn blob<F>(payload: &mut StateWriter, write: F)
where
    F: FnOnce(&mut StateWriter),
{
    let mut writer = StateWriter::new();
    write(&mut writer);
    payload.write_bytes(&writer.into_data());
}

pub(crate) fn save(c64: &C64) -> Vec<u8> {
    let parts = c64.snapshot_components();
    let mut payload = StateWriter::new();
    blob(&mut payload, |w| parts.cpu.save_state(w));
    blob(&mut payload, |w| w.write_bytes(parts.ram.borrow().snapshot()));
    blob(&mut payload, |w| {
        w.write_bytes(parts.color_ram.borrow().snapshot())
    });
    blob(&mut payload, |w| parts.cia_1.borrow().save_state(w));
    blob(&mut payload, |w| parts.cia_2.borrow().save_state(w));
    blob(&mut payload, |w| parts.vic.borrow().save_state(w));
    blob(&mut payload, |w| parts.sid.borrow().save_state(w));
    blob(&mut payload, |w| parts.keyboard.save_state(w));
    blob(&mut payload, |w| parts.drives[0].save_state(w));
    blob(&mut payload, |w| parts.drives[1].save_state(w));
    blob(&mut payload, |w| {
        let datassette = parts.datassette.borrow();
        w.write_bool(datassette.has_tape());
        w.write_u32(datassette.position() as u32);
        w.write_u64(c64.get_cycles());
        w.write_u32(c64.get_frame_count());
    });
    let payload = payload.into_data();

    let mut out = StateWriter::new();
    out.write_u32(MAGIC);
    out.write_u32(VERSION);
    out.write_u64(fnv1a(&payload));
    let mut data = out.into_data();
    data.extend_from_slice(&payload);
    data
}

pub(crate) fn load(c64: &mut C64, data: &[u8]) -> Result<(), Error> {
    if data.len() < HEADER_LEN {
        return Err(Error::Snapshot("truncated header".to_string()));
    }
    let mut header = StateReader::new(&data[..HEADER_LEN]);
    let magic = header.read_u32()?;
    if magic != MAGIC {
        return Err(Error::Snapshot("invalid magic".to_string()));
    }
    let version = header.read_u32()?;
    if version != VERSION {
        return Err(Error::Snapshot(format!(
            "unsupported version {}",
            version
        )));
    }
    let checksum = header.read_u64()?;
    let payload = &data[HEADER_LEN..];
    if checksum != fnv1a(payload) {
        return Err(Error::Snapshot("checksum mismatch".to_string()));
    }

    // pre-split every blob so structural errors surface before any state
    // is modified
    let mut reader = StateReader::new(payload);
    let mut blobs: Vec<&[u8]> = Vec::with_capacity(BLOB_COUNT);
    for _ in 0..BLOB_COUNT {
        blobs.push(reader.read_bytes()?);
    }

    let clock = c64.get_clock();
    {
        let (cpu, ram, color_ram, cia_1, cia_2, vic, sid, keyboard, drives) =
            c64.snapshot_components_mut();
        cpu.restore_state(&mut StateReader::new(blobs[0]))?;
        let ram_data = StateReader::new(blobs[1]).read_bytes()?;
        if ram_data.len() != ram.borrow().capacity() {
            return Err(Error::Snapshot("invalid ram size".to_string()));
        }
        ram.borrow_mut().restore(ram_data);
        let color_data = StateReader::new(blobs[2]).read_bytes()?;
        if color_data.len() != color_ram.borrow().capacity() {
            return Err(Error::Snapshot("invalid color ram size".to_string()));
        }
        color_ram.borrow_mut().restore(color_data);
        cia_1
            .borrow_mut()
            .restore_state(&mut StateReader::new(blobs[3]))?;
        cia_2
            .borrow_mut()
            .restore_state(&mut StateReader::new(blobs[4]))?;
        vic.borrow_mut()
            .restore_state(&mut StateReader::new(blobs[5]))?;
        sid.borrow_mut()
            .restore_state(&mut StateReader::new(blobs[6]))?;
        keyboard.restore_state(&mut StateReader::new(blobs[7]))?;
        drives[0].restore_state(&mut StateReader::new(blobs[8]))?;
        drives[1].restore_state(&mut StateReader::new(blobs[9]))?;
    }
    let mut tail = StateReader::new(blobs[10]);
    let had_tape = tail.read_bool()?;
    let position = tail.read_u32()? as usize;
    let cycles = tail.read_u64()?;
    let frame_count = tail.read_u32()?;
    clock.reset();
    clock.tick_delta(cycles);
    c64.restore_counters(frame_count);
    if had_tape {
        c64.get_datasette().borrow_mut().set_position(position);
    }
    Ok(())
}
