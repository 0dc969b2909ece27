use encoding_rs::UTF_16LE;

use crate::error::{Error, Result};
use crate::memory::{ModuleInfo, ProcessHandle};

/// Cross-process memory access.
///
/// Implementors only provide `read_bytes` and the module bounds; typed reads
/// are built on top. Addresses are absolute virtual addresses in the target.
pub trait ReadMemory {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Base address of the module the reader was opened for
    fn base_address(&self) -> u64;

    /// Size in bytes of the module image
    fn module_size(&self) -> usize;

    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes(to_array(&bytes, address)?))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(i32::from_le_bytes(to_array(&bytes, address)?))
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(u64::from_le_bytes(to_array(&bytes, address)?))
    }

    fn read_f64(&self, address: u64) -> Result<f64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(f64::from_le_bytes(to_array(&bytes, address)?))
    }
}

fn to_array<const N: usize>(bytes: &[u8], address: u64) -> Result<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| Error::MemoryReadFailed {
            address,
            message: format!("short read: {} of {} bytes", bytes.len(), N),
        })
}

/// Decode a NUL-terminated UTF-16LE buffer.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let len = bytes
        .chunks_exact(2)
        .position(|pair| pair == [0, 0])
        .map(|units| units * 2)
        .unwrap_or(bytes.len() & !1);
    let (decoded, _, _) = UTF_16LE.decode(&bytes[..len]);
    decoded.into_owned()
}

/// Reader bound to one module of an opened process.
pub struct MemoryReader {
    process: ProcessHandle,
    module: ModuleInfo,
}

impl MemoryReader {
    pub fn new(process: ProcessHandle, module: ModuleInfo) -> Self {
        Self { process, module }
    }

    /// Open `pid` and locate `module_name` inside it.
    pub fn open(pid: u32, module_name: &str) -> Result<Self> {
        let process = ProcessHandle::open(pid)?;
        let module = process.find_module(module_name)?;
        Ok(Self::new(process, module))
    }

    pub fn pid(&self) -> u32 {
        self.process.pid
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }
}

impl ReadMemory for MemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.process.read_bytes(address, size)
    }

    fn base_address(&self) -> u64 {
        self.module.base
    }

    fn module_size(&self) -> usize {
        self.module.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;

    #[test]
    fn test_typed_reads() {
        let reader = MockMemoryBuilder::new()
            .base(0x1000)
            .write_u32(0x10, 0xDEADBEEF)
            .write_u64(0x20, 0x1122_3344_5566_7788)
            .write_f64(0x30, 12.5)
            .build();

        assert_eq!(reader.read_u32(0x1010).unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_u64(0x1020).unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(reader.read_f64(0x1030).unwrap(), 12.5);
    }

    #[test]
    fn test_read_outside_buffer_fails() {
        let reader = MockMemoryBuilder::new().base(0x1000).size(0x10).build();
        assert!(matches!(
            reader.read_u64(0x2000),
            Err(Error::MemoryReadFailed { address: 0x2000, .. })
        ));
    }

    #[test]
    fn test_decode_utf16le_stops_at_nul() {
        let mut bytes: Vec<u8> = "1234_5".encode_utf16().flat_map(u16::to_le_bytes).collect();
        bytes.extend_from_slice(&[0, 0, b'x', 0]);
        assert_eq!(decode_utf16le(&bytes), "1234_5");
    }

    #[test]
    fn test_decode_utf16le_odd_length() {
        let mut bytes: Vec<u8> = "42".encode_utf16().flat_map(u16::to_le_bytes).collect();
        bytes.push(0x33);
        assert_eq!(decode_utf16le(&bytes), "42");
    }
}
