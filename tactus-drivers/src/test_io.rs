//! Register file standing in for a transport

use std::vec::Vec;

use tactus_core::bus::{RegisterIo, Segment};
use tactus_core::{Error, Result};

/// 64 KiB register file implementing [`RegisterIo`]
pub struct RegisterFile {
    regs: Vec<u8>,
    writes: Vec<(u16, Vec<u8>)>,
    read_lens: Vec<usize>,
    fail: bool,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            regs: vec![0; 0x10000 + 1024],
            writes: Vec::new(),
            read_lens: Vec::new(),
            fail: false,
        }
    }

    pub fn set(&mut self, offset: u16, data: &[u8]) {
        let start = offset as usize;
        self.regs[start..start + data.len()].copy_from_slice(data);
    }

    pub fn get(&self, offset: u16, len: usize) -> &[u8] {
        &self.regs[offset as usize..offset as usize + len]
    }

    pub fn set_fail(&mut self, fail: bool) {
        self.fail = fail;
    }

    pub fn writes(&self) -> &[(u16, Vec<u8>)] {
        &self.writes
    }

    /// Writes addressed to `offset`
    pub fn writes_to(&self, offset: u16) -> Vec<Vec<u8>> {
        self.writes
            .iter()
            .filter(|(at, _)| *at == offset)
            .map(|(_, data)| data.clone())
            .collect()
    }

    pub fn reads(&self) -> usize {
        self.read_lens.len()
    }

    pub fn largest_read(&self) -> usize {
        self.read_lens.iter().copied().max().unwrap_or(0)
    }
}

impl RegisterIo for RegisterFile {
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<()> {
        if self.fail {
            return Err(Error::BusError);
        }
        self.read_lens.push(buf.len());
        let start = offset as usize;
        buf.copy_from_slice(&self.regs[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: u16, data: &[u8]) -> Result<()> {
        if self.fail {
            return Err(Error::BusError);
        }
        self.writes.push((offset, data.to_vec()));
        self.set(offset, data);
        Ok(())
    }

    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()> {
        for segment in segments.iter_mut() {
            match segment {
                Segment::Read { offset, buf } => self.read(*offset, buf)?,
                Segment::Write { offset, data } => self.write(*offset, data)?,
            }
        }
        Ok(())
    }
}
