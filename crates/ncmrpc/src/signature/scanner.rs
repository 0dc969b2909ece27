use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::memory::ReadMemory;
use crate::signature::{CodeSignature, SignatureSet};

/// Chunk size used when reading the module image
const CODE_SCAN_CHUNK_SIZE: usize = 1024 * 1024;

/// Find every offset in `buffer` where `pattern` matches, reported as
/// `base + offset`. `None` entries in the pattern match any byte.
pub fn find_matches(buffer: &[u8], base: u64, pattern: &[Option<u8>]) -> Vec<u64> {
    if pattern.is_empty() || buffer.len() < pattern.len() {
        return Vec::new();
    }

    // Anchor on the first concrete byte so memchr can skip ahead
    let Some((anchor, anchor_byte)) = pattern
        .iter()
        .enumerate()
        .find_map(|(i, byte)| byte.map(|value| (i, value)))
    else {
        return Vec::new();
    };

    let last = buffer.len() - pattern.len();
    memchr::memchr_iter(anchor_byte, &buffer[anchor..=anchor + last])
        .filter(|&start| matches_at(buffer, start, pattern))
        .map(|start| base + start as u64)
        .collect()
}

fn matches_at(buffer: &[u8], start: usize, pattern: &[Option<u8>]) -> bool {
    pattern
        .iter()
        .zip(&buffer[start..start + pattern.len()])
        .all(|(expected, actual)| expected.is_none_or(|value| value == *actual))
}

/// Absolute target of a RIP-relative operand.
///
/// The CPU adds the displacement to the address of the *next* instruction,
/// i.e. `instruction_address + instruction_length + displacement`.
pub fn resolve_displacement(instruction_address: u64, displacement: i32, instr_len: usize) -> u64 {
    let next_ip = instruction_address + instr_len as u64;
    next_ip.wrapping_add_signed(displacement as i64)
}

pub struct SignatureScanner<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
}

impl<'a, R: ReadMemory + ?Sized> SignatureScanner<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Scan the whole module image for `pattern`.
    ///
    /// The image is read in chunks; the last `pattern.len() - 1` bytes of each
    /// chunk are carried over so matches spanning a boundary are not lost.
    pub fn scan_module(&self, pattern: &[Option<u8>]) -> Result<Vec<u64>> {
        let base = self.reader.base_address();
        let limit = self.reader.module_size();
        let mut results: Vec<u64> = Vec::new();
        let mut scanned: usize = 0;
        let mut tail: Vec<u8> = Vec::new();

        while scanned < limit {
            let read_size = (limit - scanned).min(CODE_SCAN_CHUNK_SIZE);
            let addr = base + scanned as u64;

            let chunk = match self.reader.read_bytes(addr, read_size) {
                Ok(bytes) => bytes,
                Err(e) => {
                    if scanned == 0 {
                        return Err(e);
                    }
                    debug!(
                        "Code scan stopped at {:#x} (scanned {:#x} bytes): {}",
                        addr, scanned, e
                    );
                    break;
                }
            };

            let mut data = Vec::with_capacity(tail.len() + chunk.len());
            data.extend_from_slice(&tail);
            data.extend_from_slice(&chunk);

            let data_base = addr - tail.len() as u64;
            results.extend(find_matches(&data, data_base, pattern));

            let keep = pattern.len().saturating_sub(1).min(data.len());
            tail = data[data.len() - keep..].to_vec();

            scanned += read_size;
        }

        results.sort_unstable();
        results.dedup();
        Ok(results)
    }

    /// Resolve every match of `signature` to the data address it references.
    pub fn resolve_targets(&self, signature: &CodeSignature) -> Result<Vec<u64>> {
        let pattern = signature.pattern_bytes()?;
        let matches = self.scan_module(&pattern)?;
        let mut targets = Vec::new();

        for match_addr in matches {
            let instr_addr = match_addr + signature.instr_offset as u64;
            let disp_addr = instr_addr + signature.disp_offset as u64;

            let disp = match self.reader.read_i32(disp_addr) {
                Ok(value) => value,
                Err(_) => continue,
            };
            let mut target = resolve_displacement(instr_addr, disp, signature.instr_len);

            if signature.deref {
                match self.reader.read_u64(target) {
                    Ok(ptr) => target = ptr,
                    Err(e) => {
                        debug!("  Dereference of {:#x} failed: {}", target, e);
                        continue;
                    }
                }
            }

            if target == 0 {
                continue;
            }

            if signature.addend != 0 {
                target = target.wrapping_add_signed(signature.addend);
            }

            targets.push(target);
        }

        targets.sort_unstable();
        targets.dedup();
        Ok(targets)
    }

    /// Resolve a named entry, trying its signatures in order.
    ///
    /// A signature counts only if it yields exactly one address. Fails with
    /// `PatternNotFound` when none does.
    pub fn resolve_entry(&self, set: &SignatureSet, name: &str) -> Result<u64> {
        let entry = set
            .entry(name)
            .ok_or_else(|| Error::InvalidSignature(format!("missing entry '{}'", name)))?;

        for (index, signature) in entry.signatures.iter().enumerate() {
            let targets = self.resolve_targets(signature)?;
            match targets.as_slice() {
                [] => debug!("{} signature #{} matched nothing", name, index),
                [target] => {
                    debug!("{} resolved via signature #{}: {:#x}", name, index, target);
                    return Ok(*target);
                }
                _ => warn!(
                    "{} signature #{} is ambiguous ({} distinct targets), skipping it",
                    name,
                    index,
                    targets.len()
                ),
            }
        }

        Err(Error::PatternNotFound(name.to_string()))
    }
}
