use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::{FixedOffsetLayout, LayoutStrategy, ScannedLayout};
use crate::signature::{SignatureSet, builtin_signatures};

/// A fixed-offset release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedEntry {
    pub version: &'static str,
    pub position_offset: u64,
    pub song_array_offset: u64,
}

/// Reverse-engineered 2.x releases. Append only.
pub const FIXED_LAYOUTS: &[FixedEntry] = &[
    FixedEntry {
        version: "2.7.1.1669",
        position_offset: 0x8C8AF8,
        song_array_offset: 0x8E9044,
    },
    FixedEntry {
        version: "2.10.5.3929",
        position_offset: 0xA47548,
        song_array_offset: 0xAF6FC8,
    },
    FixedEntry {
        version: "2.10.6.3993",
        position_offset: 0xA65568,
        song_array_offset: 0xB15654,
    },
    FixedEntry {
        version: "2.10.7.4239",
        position_offset: 0xA66568,
        song_array_offset: 0xB16974,
    },
    FixedEntry {
        version: "2.10.8.4337",
        position_offset: 0xA74570,
        song_array_offset: 0xB24F28,
    },
];

/// Major versions whose layout is recovered by signature scan
pub const SCANNED_MAJOR_VERSIONS: &[u32] = &[3];

#[derive(Debug, Clone)]
pub enum LayoutKind {
    Fixed(FixedOffsetLayout),
    Scanned(SignatureSet),
}

/// One catalog row as listed to users
#[derive(Debug, Clone)]
pub struct LayoutEntry {
    pub version: String,
    pub kind: LayoutKind,
}

pub struct LayoutCatalog {
    fixed: Vec<FixedEntry>,
    scanned_majors: Vec<u32>,
    signatures: SignatureSet,
}

impl LayoutCatalog {
    /// Catalog with the builtin tables and builtin signatures
    pub fn builtin() -> Self {
        Self::with_signatures(builtin_signatures())
    }

    pub fn with_signatures(signatures: SignatureSet) -> Self {
        Self::new(
            FIXED_LAYOUTS.to_vec(),
            SCANNED_MAJOR_VERSIONS.to_vec(),
            signatures,
        )
    }

    pub fn new(fixed: Vec<FixedEntry>, scanned_majors: Vec<u32>, signatures: SignatureSet) -> Self {
        Self {
            fixed,
            scanned_majors,
            signatures,
        }
    }

    /// Look up the entry for an exact file version.
    ///
    /// Exact fixed entries win over the major-version rule. Anything else is
    /// `UnsupportedVersion`; versions are never guessed.
    pub fn lookup(&self, version: &str) -> Result<LayoutEntry> {
        if let Some(entry) = self.fixed.iter().find(|e| e.version == version) {
            return Ok(LayoutEntry {
                version: version.to_string(),
                kind: LayoutKind::Fixed(FixedOffsetLayout {
                    position_offset: entry.position_offset,
                    song_array_offset: entry.song_array_offset,
                }),
            });
        }

        if let Some(major) = major_version(version)
            && self.scanned_majors.contains(&major)
        {
            return Ok(LayoutEntry {
                version: version.to_string(),
                kind: LayoutKind::Scanned(self.signatures.clone()),
            });
        }

        Err(Error::UnsupportedVersion {
            version: version.to_string(),
            supported: self.supported_versions(),
        })
    }

    /// Resolve a version to the strategy that yields its addresses.
    pub fn resolve(&self, version: &str) -> Result<Box<dyn LayoutStrategy>> {
        let entry = self.lookup(version)?;
        let strategy: Box<dyn LayoutStrategy> = match entry.kind {
            LayoutKind::Fixed(layout) => Box::new(layout),
            LayoutKind::Scanned(signatures) => Box::new(ScannedLayout { signatures }),
        };
        debug!("Layout for {}: {}", version, strategy.describe());
        Ok(strategy)
    }

    /// Comma-separated list for user-facing messages
    pub fn supported_versions(&self) -> String {
        self.fixed
            .iter()
            .map(|e| e.version.to_string())
            .chain(self.scanned_majors.iter().map(|m| format!("{}.x", m)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn fixed_entries(&self) -> &[FixedEntry] {
        &self.fixed
    }

    pub fn scanned_majors(&self) -> &[u32] {
        &self.scanned_majors
    }
}

fn major_version(version: &str) -> Option<u32> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    // Require the full four-part form so partial strings are not accepted
    (parts.count() == 3).then_some(major)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_fixed_version() {
        let catalog = LayoutCatalog::builtin();
        let entry = catalog.lookup("2.10.6.3993").unwrap();
        match entry.kind {
            LayoutKind::Fixed(layout) => {
                assert_eq!(layout.position_offset, 0xA65568);
                assert_eq!(layout.song_array_offset, 0xB15654);
            }
            LayoutKind::Scanned(_) => panic!("expected fixed layout"),
        }
    }

    #[test]
    fn test_lookup_scanned_major() {
        let catalog = LayoutCatalog::builtin();
        let entry = catalog.lookup("3.0.18.203152").unwrap();
        assert!(matches!(entry.kind, LayoutKind::Scanned(_)));
    }

    #[test]
    fn test_unknown_versions_are_rejected() {
        let catalog = LayoutCatalog::builtin();
        for version in ["2.10.9.0000", "1.0.0.1", "3.0", "", "abc"] {
            let err = catalog.lookup(version).unwrap_err();
            assert!(err.is_fatal(), "{} should be unsupported", version);
        }
    }

    #[test]
    fn test_unsupported_message_lists_versions() {
        let catalog = LayoutCatalog::builtin();
        match catalog.lookup("2.9.0.1") {
            Err(Error::UnsupportedVersion { version, supported }) => {
                assert_eq!(version, "2.9.0.1");
                assert!(supported.contains("2.7.1.1669"));
                assert!(supported.contains("2.10.8.4337"));
                assert!(supported.ends_with("3.x"));
            }
            other => panic!("unexpected result: {:?}", other.map(|e| e.version)),
        }
    }

    #[test]
    fn test_resolve_returns_strategy() {
        let catalog = LayoutCatalog::builtin();
        let strategy = catalog.resolve("2.10.8.4337").unwrap();
        assert!(strategy.describe().starts_with("fixed"));
        let strategy = catalog.resolve("3.1.0.1").unwrap();
        assert!(strategy.describe().starts_with("scanned"));
    }
}
