// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use byteorder::{ByteOrder, LittleEndian};

use crate::Error;

// Snapshot blobs are little-endian byte streams. Every component writes its
// persistent fields in a fixed order and reads them back the same way; the
// reader range-checks so truncated input fails cleanly instead of panicking.

pub struct StateWriter {
    data: Vec<u8>,
}

impl StateWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.data.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, value);
        self.data.extend_from_slice(&buf);
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.data.extend_from_slice(&buf);
    }

    pub fn write_u64(&mut self, value: u64) {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        self.data.extend_from_slice(&buf);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.data.extend_from_slice(bytes);
    }
}

impl Default for StateWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub struct StateReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < count {
            return Err(Error::Snapshot(format!(
                "unexpected end of data at offset {}",
                self.pos
            )));
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn read_bytes(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }
}

/// FNV-1a over a snapshot payload, used for the header checksum.
pub fn fnv1a(data: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_scalars() {
        let mut writer = StateWriter::new();
        writer.write_u8(0xab);
        writer.write_u16(0x1234);
        writer.write_u32(0xdead_beef);
        writer.write_u64(0x0123_4567_89ab_cdef);
        writer.write_bool(true);
        writer.write_bytes(&[1, 2, 3]);
        let data = writer.into_data();
        let mut reader = StateReader::new(&data);
        assert_eq!(0xab, reader.read_u8().unwrap());
        assert_eq!(0x1234, reader.read_u16().unwrap());
        assert_eq!(0xdead_beef, reader.read_u32().unwrap());
        assert_eq!(0x0123_4567_89ab_cdef, reader.read_u64().unwrap());
        assert_eq!(true, reader.read_bool().unwrap());
        assert_eq!(&[1, 2, 3], reader.read_bytes().unwrap());
        assert_eq!(0, reader.remaining());
    }

    #[test]
    fn truncated_input_fails() {
        let data = [0x34u8];
        let mut reader = StateReader::new(&data);
        assert!(reader.read_u16().is_err());
    }
}
