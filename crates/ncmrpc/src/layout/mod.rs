//! Memory layouts of the supported client releases.
//!
//! The catalog maps an exact file version to a [`LayoutStrategy`]. Releases of
//! the 2.x line have stable offsets from the `cloudmusic.dll` base; the 3.x
//! line relocates its data on every launch and is resolved by signature scan.

mod catalog;
mod strategy;

pub use catalog::{FixedEntry, LayoutCatalog, LayoutEntry, LayoutKind};
pub use strategy::{
    FixedOffsetLayout, LayoutStrategy, ResolvedPointers, ScannedLayout, SongPointer,
};
