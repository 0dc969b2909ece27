//! Prelude module for convenient imports
//!
//! ```ignore
//! use ncmrpc::prelude::*;
//! ```

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::scheduler::ShutdownSignal;
pub use crate::sync::{SyncEvent, SyncOptions, SyncService, Synchronizer};
