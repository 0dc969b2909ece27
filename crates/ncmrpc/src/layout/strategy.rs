use tracing::debug;

use crate::error::Result;
use crate::memory::ReadMemory;
use crate::signature::{AUDIO_PLAYER, SCHEDULE, SignatureScanner, SignatureSet};

/// Where the current track token lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongPointer {
    /// A 32-bit pointer slot; the pointee is a UTF-16LE token
    Indirect { slot_address: u64 },
    /// An MSVC `std::string` holding a UTF-8 token
    SsoString { string_address: u64 },
}

/// Absolute addresses valid for one process instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPointers {
    pub position_address: u64,
    pub song: SongPointer,
}

/// Per-release recipe for turning an attached module into addresses.
pub trait LayoutStrategy {
    fn resolve(&self, reader: &dyn ReadMemory) -> Result<ResolvedPointers>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

/// Offsets relative to the module base (2.x releases)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedOffsetLayout {
    pub position_offset: u64,
    pub song_array_offset: u64,
}

impl LayoutStrategy for FixedOffsetLayout {
    fn resolve(&self, reader: &dyn ReadMemory) -> Result<ResolvedPointers> {
        let base = reader.base_address();
        Ok(ResolvedPointers {
            position_address: base + self.position_offset,
            song: SongPointer::Indirect {
                slot_address: base + self.song_array_offset,
            },
        })
    }

    fn describe(&self) -> String {
        format!(
            "fixed (position +{:#x}, song array +{:#x})",
            self.position_offset, self.song_array_offset
        )
    }
}

/// Signature-scanned addresses (3.x releases)
#[derive(Debug, Clone)]
pub struct ScannedLayout {
    pub signatures: SignatureSet,
}

impl LayoutStrategy for ScannedLayout {
    fn resolve(&self, reader: &dyn ReadMemory) -> Result<ResolvedPointers> {
        let scanner = SignatureScanner::new(reader);

        let position_address = scanner.resolve_entry(&self.signatures, SCHEDULE)?;
        debug!("  Schedule: {:#x}", position_address);

        let string_address = scanner.resolve_entry(&self.signatures, AUDIO_PLAYER)?;
        debug!("  Audio player track string: {:#x}", string_address);

        Ok(ResolvedPointers {
            position_address,
            song: SongPointer::SsoString { string_address },
        })
    }

    fn describe(&self) -> String {
        format!("scanned ({} signature entries)", self.signatures.entries.len())
    }
}
