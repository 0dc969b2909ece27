//! Code signatures for releases whose data addresses move on every launch.
//!
//! A signature is an AOB pattern over the module's code plus a description of
//! the RIP-relative instruction found at the match, from which the absolute
//! data address is reconstructed.

mod scanner;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub use scanner::{SignatureScanner, find_matches, resolve_displacement};

/// Name of the entry locating the playback position (a static `f64`)
pub const SCHEDULE: &str = "schedule";
/// Name of the entry locating the audio player's current track string
pub const AUDIO_PLAYER: &str = "audioPlayer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSignature {
    pub pattern: String,
    /// Offset of the RIP-relative instruction from the match start
    pub instr_offset: usize,
    /// Offset of the 32-bit displacement inside the instruction
    pub disp_offset: usize,
    /// Total instruction length (the displacement base is the next instruction)
    pub instr_len: usize,
    #[serde(default)]
    pub deref: bool,
    #[serde(default)]
    pub addend: i64,
}

impl CodeSignature {
    pub fn pattern_bytes(&self) -> Result<Vec<Option<u8>>> {
        parse_pattern(&self.pattern)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub name: String,
    pub signatures: Vec<CodeSignature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureSet {
    pub entries: Vec<SignatureEntry>,
}

impl SignatureSet {
    pub fn entry(&self, name: &str) -> Option<&SignatureEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Check that every pattern parses and the required entries exist.
    pub fn validate(&self) -> Result<()> {
        for required in [SCHEDULE, AUDIO_PLAYER] {
            let entry = self.entry(required).ok_or_else(|| {
                Error::InvalidSignature(format!("missing entry '{}'", required))
            })?;
            if entry.signatures.is_empty() {
                return Err(Error::InvalidSignature(format!(
                    "entry '{}' has no signatures",
                    required
                )));
            }
        }

        for entry in &self.entries {
            for signature in &entry.signatures {
                let pattern = signature.pattern_bytes()?;
                if signature.instr_offset >= pattern.len() {
                    return Err(Error::InvalidSignature(format!(
                        "'{}': instruction offset {} is outside the pattern",
                        entry.name, signature.instr_offset
                    )));
                }
                if signature.disp_offset + 4 > signature.instr_len {
                    return Err(Error::InvalidSignature(format!(
                        "'{}': displacement does not fit in a {}-byte instruction",
                        entry.name, signature.instr_len
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Signatures for the 3.x (x64) client line.
///
/// `schedule` matches a `ucomisd xmm1, [rip+disp32]` comparing against the
/// playback position; `audioPlayer` matches the `mov rcx, [rip+disp32]` that
/// loads the player singleton pointer, whose current track id string lives at
/// +0x60.
pub fn builtin_signatures() -> SignatureSet {
    SignatureSet {
        entries: vec![
            SignatureEntry {
                name: SCHEDULE.to_string(),
                signatures: vec![
                    CodeSignature {
                        pattern: "66 0F 2E 0D ?? ?? ?? ?? 7A ?? 75 ?? 66 0F 2E 15".to_string(),
                        instr_offset: 0,
                        disp_offset: 4,
                        instr_len: 8,
                        deref: false,
                        addend: 0,
                    },
                    CodeSignature {
                        pattern: "F2 0F 11 05 ?? ?? ?? ?? F2 0F 10 0D ?? ?? ?? ?? 66 0F 2F C8"
                            .to_string(),
                        instr_offset: 0,
                        disp_offset: 4,
                        instr_len: 8,
                        deref: false,
                        addend: 0,
                    },
                ],
            },
            SignatureEntry {
                name: AUDIO_PLAYER.to_string(),
                signatures: vec![CodeSignature {
                    pattern: "48 8D 0D ?? ?? ?? ?? E8 ?? ?? ?? ?? 48 8B 0D ?? ?? ?? ?? 48 85 C9 74"
                        .to_string(),
                    instr_offset: 12,
                    disp_offset: 3,
                    instr_len: 7,
                    deref: true,
                    addend: 0x60,
                }],
            },
        ],
    }
}

pub fn load_signatures<P: AsRef<Path>>(path: P) -> Result<SignatureSet> {
    let content = fs::read_to_string(&path)?;
    let data: SignatureSet = serde_json::from_str(&content)?;
    data.validate()?;
    Ok(data)
}

pub fn save_signatures<P: AsRef<Path>>(path: P, signatures: &SignatureSet) -> Result<()> {
    let content = serde_json::to_string_pretty(signatures)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidSignature(format!("Invalid signature token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidSignature(
            "Signature pattern is empty".to_string(),
        ));
    }

    if bytes.iter().all(Option::is_none) {
        return Err(Error::InvalidSignature(
            "Signature pattern has no concrete bytes".to_string(),
        ));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
