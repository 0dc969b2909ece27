mod process;
mod reader;

#[cfg(test)]
pub mod mock;

pub use process::{ModuleInfo, ProcessHandle};
pub use reader::{MemoryReader, ReadMemory, decode_utf16le};

#[cfg(test)]
pub use mock::{MockMemoryBuilder, MockMemoryReader, SharedMockMemory};
