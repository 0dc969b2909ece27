//! Reads the live playback position and track token from the target.

use tracing::trace;

use crate::error::{Error, Result};
use crate::layout::{ResolvedPointers, SongPointer};
use crate::memory::{ReadMemory, decode_utf16le};

/// Bytes read behind the 2.x song array pointer (ten UTF-16 units)
pub const INDIRECT_TOKEN_SIZE: usize = 0x14;
/// Longest string an MSVC `std::string` keeps inline
pub const SSO_INLINE_CAPACITY: usize = 15;
/// Offset of the length field inside an MSVC `std::string`
pub const SSO_LENGTH_OFFSET: u64 = 0x10;
/// Upper bound for heap token reads; real tokens are a few dozen bytes
pub const MAX_TOKEN_LENGTH: usize = 0x100;

/// One tick's reading
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub position_seconds: f64,
    pub song_id: String,
    /// Token as read from memory, kept for diagnostics
    pub raw_token: String,
}

/// Result of sampling: either a usable sample or a target that has not
/// finished initializing its state yet.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Ready(Sample),
    NotReady { token: String },
}

/// Extract the song id from a `"<digits>_<suffix>"` token.
///
/// The part before the first `_` is taken and its leading digit run is the id.
/// Returns `None` when the token does not start with a digit.
pub fn parse_song_token(token: &str) -> Option<&str> {
    let head = token.split('_').next().unwrap_or(token);
    let digits = head
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(head.len());
    (digits > 0).then(|| &head[..digits])
}

/// Format seconds as `mm:ss.ss` for log lines
pub fn format_position(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor();
    format!("{:02}:{:05.2}", minutes as u64, seconds - minutes * 60.0)
}

pub struct MemorySampler;

impl MemorySampler {
    pub fn sample(reader: &dyn ReadMemory, pointers: &ResolvedPointers) -> Result<SampleOutcome> {
        let position_seconds = reader.read_f64(pointers.position_address)?;
        if !position_seconds.is_finite() {
            return Err(Error::MemoryReadFailed {
                address: pointers.position_address,
                message: format!("position is not a finite number: {}", position_seconds),
            });
        }

        let token = match pointers.song {
            SongPointer::Indirect { slot_address } => read_indirect_token(reader, slot_address)?,
            SongPointer::SsoString { string_address } => read_sso_string(reader, string_address)?,
        };
        trace!("Sampled position={} token={:?}", position_seconds, token);

        Ok(match parse_song_token(&token) {
            Some(song_id) => SampleOutcome::Ready(Sample {
                position_seconds,
                song_id: song_id.to_string(),
                raw_token: token,
            }),
            None => SampleOutcome::NotReady { token },
        })
    }
}

/// 2.x: a 32-bit pointer slot pointing at a UTF-16LE token
fn read_indirect_token(reader: &dyn ReadMemory, slot_address: u64) -> Result<String> {
    let pointer = reader.read_u32(slot_address)? as u64;
    if pointer == 0 {
        return Ok(String::new());
    }
    let bytes = reader.read_bytes(pointer, INDIRECT_TOKEN_SIZE)?;
    Ok(decode_utf16le(&bytes))
}

/// Read an MSVC `std::string`.
///
/// Layout: 16-byte buffer at +0x00, length at +0x10, capacity at +0x18. A
/// string of at most 15 bytes lives inline in the buffer; a longer one stores
/// a pointer to its heap bytes in the first 8 bytes of the buffer.
pub fn read_sso_string(reader: &dyn ReadMemory, address: u64) -> Result<String> {
    let length = reader.read_u64(address + SSO_LENGTH_OFFSET)? as usize;
    if length > MAX_TOKEN_LENGTH {
        return Err(Error::MemoryReadFailed {
            address,
            message: format!("implausible string length {}", length),
        });
    }
    if length == 0 {
        return Ok(String::new());
    }

    let bytes = if length <= SSO_INLINE_CAPACITY {
        reader.read_bytes(address, length)?
    } else {
        let heap = reader.read_u64(address)?;
        reader.read_bytes(heap, length)?
    };

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
