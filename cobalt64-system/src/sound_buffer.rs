// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::sync::atomic::{AtomicBool, AtomicI16, AtomicUsize, Ordering};

use cobalt64_core::factory::SoundOutput;

// Single-producer single-consumer sample ring with atomic read/write
// indices; the emulation thread produces, the host audio callback
// consumes, and neither ever blocks. Overflow drops the oldest samples and
// raises a flag the worker turns into a message; underflow repeats the
// last delivered sample.

pub struct SoundBuffer {
    buffer: Vec<AtomicI16>,
    capacity: usize,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
    last_sample: AtomicI16,
    overflow: AtomicBool,
    underflow: AtomicBool,
}

impl SoundBuffer {
    pub fn new(capacity: usize) -> Self {
        let mut buffer = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            buffer.push(AtomicI16::new(0));
        }
        Self {
            buffer,
            capacity,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
            last_sample: AtomicI16::new(0),
            overflow: AtomicBool::new(false),
            underflow: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        (write + self.capacity - read) % self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once since the last call if the producer overran the consumer.
    pub fn take_overflow(&self) -> bool {
        self.overflow.swap(false, Ordering::AcqRel)
    }

    /// True once since the last call if the consumer ran dry.
    pub fn take_underflow(&self) -> bool {
        self.underflow.swap(false, Ordering::AcqRel)
    }

    fn pop(&self) -> i16 {
        let read = self.read_pos.load(Ordering::Relaxed);
        if read == self.write_pos.load(Ordering::Acquire) {
            self.underflow.store(true, Ordering::Release);
            return self.last_sample.load(Ordering::Relaxed);
        }
        let value = self.buffer[read].load(Ordering::Relaxed);
        self.read_pos
            .store((read + 1) % self.capacity, Ordering::Release);
        self.last_sample.store(value, Ordering::Relaxed);
        value
    }

    /// Copy mono samples, scaled to float.
    pub fn copy_mono(&self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = f32::from(self.pop()) / f32::from(i16::max_value());
        }
    }

    /// Copy one frame per output pair, duplicating the mono source.
    pub fn copy_stereo(&self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let value = f32::from(self.pop()) / f32::from(i16::max_value());
            *l = value;
            *r = value;
        }
    }

    /// Copy interleaved frames with the given channel count.
    pub fn copy_interleaved(&self, out: &mut [f32], channels: usize) {
        for frame in out.chunks_mut(channels.max(1)) {
            let value = f32::from(self.pop()) / f32::from(i16::max_value());
            for sample in frame.iter_mut() {
                *sample = value;
            }
        }
    }
}

impl SoundOutput for SoundBuffer {
    fn reset(&self) {
        self.read_pos.store(0, Ordering::Release);
        self.write_pos.store(0, Ordering::Release);
        self.last_sample.store(0, Ordering::Relaxed);
        self.overflow.store(false, Ordering::Release);
        self.underflow.store(false, Ordering::Release);
    }

    fn write(&self, samples: &[i16]) {
        for sample in samples {
            let write = self.write_pos.load(Ordering::Relaxed);
            let next = (write + 1) % self.capacity;
            if next == self.read_pos.load(Ordering::Acquire) {
                // full: drop the oldest sample so fresh audio wins
                let read = self.read_pos.load(Ordering::Acquire);
                let _ = self.read_pos.compare_exchange(
                    read,
                    (read + 1) % self.capacity,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                );
                self.overflow.store(true, Ordering::Release);
            }
            self.buffer[write].store(*sample, Ordering::Relaxed);
            self.write_pos.store(next, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let buffer = SoundBuffer::new(8);
        buffer.write(&[1, 2, 3]);
        let mut out = [0.0f32; 3];
        buffer.copy_mono(&mut out);
        assert!(out[0] > 0.0);
        assert_eq!(0, buffer.len());
    }

    #[test]
    fn underflow_repeats_last_sample() {
        let buffer = SoundBuffer::new(8);
        buffer.write(&[1000]);
        let mut out = [0.0f32; 3];
        buffer.copy_mono(&mut out);
        assert_eq!(out[0], out[1]);
        assert_eq!(out[1], out[2]);
        assert!(buffer.take_underflow());
    }

    #[test]
    fn overflow_drops_oldest() {
        let buffer = SoundBuffer::new(4);
        buffer.write(&[1, 2, 3, 4, 5]);
        assert!(buffer.take_overflow());
        let mut out = [0.0f32; 1];
        buffer.copy_mono(&mut out);
        // the first sample was dropped
        assert!((out[0] - 3.0 / f32::from(i16::max_value())).abs() < 1e-6);
    }
}
