//! In-memory `ReadMemory` implementation for tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::memory::ReadMemory;

/// A flat buffer mapped at `base`, optionally with extra regions at
/// arbitrary addresses (heap blocks outside the module image).
pub struct MockMemoryReader {
    base: u64,
    buffer: Vec<u8>,
    regions: Vec<(u64, Vec<u8>)>,
}

impl MockMemoryReader {
    fn slice(&self, address: u64, size: usize) -> Option<&[u8]> {
        if let Some((from, to)) = window(self.base, self.buffer.len(), address, size) {
            return Some(&self.buffer[from..to]);
        }
        self.regions.iter().find_map(|(start, data)| {
            window(*start, data.len(), address, size).map(|(from, to)| &data[from..to])
        })
    }
}

fn window(start: u64, len: usize, address: u64, size: usize) -> Option<(usize, usize)> {
    let offset = usize::try_from(address.checked_sub(start)?).ok()?;
    let end = offset.checked_add(size)?;
    (end <= len).then_some((offset, end))
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.slice(address, size)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: "address not mapped".to_string(),
            })
    }

    fn base_address(&self) -> u64 {
        self.base
    }

    fn module_size(&self) -> usize {
        self.buffer.len()
    }
}

/// Builder for `MockMemoryReader`. Offsets passed to `write_*` are relative
/// to the module base.
pub struct MockMemoryBuilder {
    base: u64,
    buffer: Vec<u8>,
    regions: Vec<(u64, Vec<u8>)>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self {
            base: 0x1000_0000,
            buffer: vec![0; 0x1000],
            regions: Vec::new(),
        }
    }

    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.buffer.resize(size, 0);
        self
    }

    pub fn write_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        let end = offset + bytes.len();
        if self.buffer.len() < end {
            self.buffer.resize(end, 0);
        }
        self.buffer[offset..end].copy_from_slice(bytes);
        self
    }

    pub fn write_u32(self, offset: usize, value: u32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_u64(self, offset: usize, value: u64) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_f64(self, offset: usize, value: f64) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Map `bytes` at an absolute address outside the module image.
    pub fn region(mut self, address: u64, bytes: Vec<u8>) -> Self {
        self.regions.push((address, bytes));
        self
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            base: self.base,
            buffer: self.buffer,
            regions: self.regions,
        }
    }
}

impl Default for MockMemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Clonable handle to a mock whose contents tests can swap between reads.
#[derive(Clone)]
pub struct SharedMockMemory(Rc<RefCell<MockMemoryReader>>);

impl SharedMockMemory {
    pub fn new(reader: MockMemoryReader) -> Self {
        Self(Rc::new(RefCell::new(reader)))
    }

    pub fn replace(&self, reader: MockMemoryReader) {
        *self.0.borrow_mut() = reader;
    }
}

impl ReadMemory for SharedMockMemory {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.0.borrow().read_bytes(address, size)
    }

    fn base_address(&self) -> u64 {
        self.0.borrow().base_address()
    }

    fn module_size(&self) -> usize {
        self.0.borrow().module_size()
    }
}
