//! Process discovery and attachment.

mod locator;
mod version;

pub use locator::{
    CHILD_PROCESS_MARKER, LocatedProcess, ProcessLocator, TARGET_EXECUTABLE, TARGET_MODULE,
};
pub use version::{format_file_version, read_file_version};

use std::path::{Path, PathBuf};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::error::Result;
use crate::memory::{MemoryReader, ReadMemory};

/// A running process as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub command_line: Vec<String>,
    pub executable: Option<PathBuf>,
}

/// OS process introspection.
pub trait ProcessBackend {
    /// All processes whose image name equals `executable_name` (case-insensitive)
    fn processes(&mut self, executable_name: &str) -> Vec<ProcessEntry>;

    fn is_alive(&mut self, pid: u32, executable_name: &str) -> bool;

    fn file_version(&self, executable: &Path) -> Result<String>;

    /// Open `pid` for reading and bind the reader to `module`
    fn attach(&self, pid: u32, module: &str) -> Result<Box<dyn ReadMemory>>;
}

/// `sysinfo` enumeration plus Win32 memory access
pub struct SystemProcessBackend {
    system: System,
}

impl SystemProcessBackend {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProcessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessBackend for SystemProcessBackend {
    fn processes(&mut self, executable_name: &str) -> Vec<ProcessEntry> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_cmd(UpdateKind::Always)
                .with_exe(UpdateKind::Always),
        );

        self.system
            .processes()
            .values()
            .filter(|p| p.name().to_string_lossy().eq_ignore_ascii_case(executable_name))
            .map(|p| ProcessEntry {
                pid: p.pid().as_u32(),
                name: p.name().to_string_lossy().into_owned(),
                command_line: p
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect(),
                executable: p.exe().map(Path::to_path_buf),
            })
            .collect()
    }

    fn is_alive(&mut self, pid: u32, executable_name: &str) -> bool {
        let pid = Pid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        self.system
            .process(pid)
            .is_some_and(|p| p.name().to_string_lossy().eq_ignore_ascii_case(executable_name))
    }

    fn file_version(&self, executable: &Path) -> Result<String> {
        read_file_version(executable)
    }

    fn attach(&self, pid: u32, module: &str) -> Result<Box<dyn ReadMemory>> {
        Ok(Box::new(MemoryReader::open(pid, module)?))
    }
}

#[cfg(test)]
pub(crate) use tests::MockBackend;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::SharedMockMemory;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// In-memory process table
    pub struct MockBackend {
        pub entries: Vec<ProcessEntry>,
        pub version: String,
        pub version_error: Option<fn() -> Error>,
        pub memory: Option<SharedMockMemory>,
        pub attach_error: Option<fn() -> Error>,
        pub attach_count: Cell<usize>,
    }

    impl MockBackend {
        pub fn new(version: &str) -> Self {
            Self {
                entries: Vec::new(),
                version: version.to_string(),
                version_error: None,
                memory: None,
                attach_error: None,
                attach_count: Cell::new(0),
            }
        }

        /// A single primary process at `pid`
        pub fn running(mut self, pid: u32) -> Self {
            self.entries = vec![ProcessEntry {
                pid,
                name: "cloudmusic.exe".to_string(),
                command_line: vec!["cloudmusic.exe".to_string()],
                executable: Some(PathBuf::from("cloudmusic.exe")),
            }];
            self
        }
    }

    impl ProcessBackend for MockBackend {
        fn processes(&mut self, executable_name: &str) -> Vec<ProcessEntry> {
            self.entries
                .iter()
                .filter(|e| e.name.eq_ignore_ascii_case(executable_name))
                .cloned()
                .collect()
        }

        fn is_alive(&mut self, pid: u32, executable_name: &str) -> bool {
            self.entries
                .iter()
                .any(|e| e.pid == pid && e.name.eq_ignore_ascii_case(executable_name))
        }

        fn file_version(&self, _executable: &Path) -> Result<String> {
            match self.version_error {
                Some(make) => Err(make()),
                None => Ok(self.version.clone()),
            }
        }

        fn attach(&self, _pid: u32, module: &str) -> Result<Box<dyn ReadMemory>> {
            self.attach_count.set(self.attach_count.get() + 1);
            if let Some(make) = self.attach_error {
                return Err(make());
            }
            self.memory
                .clone()
                .map(|memory| Box::new(memory) as Box<dyn ReadMemory>)
                .ok_or_else(|| Error::ModuleNotFound(module.to_string()))
        }
    }

    /// Lets a test keep a handle on the backend it hands to the synchronizer
    impl ProcessBackend for Rc<RefCell<MockBackend>> {
        fn processes(&mut self, executable_name: &str) -> Vec<ProcessEntry> {
            self.borrow_mut().processes(executable_name)
        }

        fn is_alive(&mut self, pid: u32, executable_name: &str) -> bool {
            self.borrow_mut().is_alive(pid, executable_name)
        }

        fn file_version(&self, executable: &Path) -> Result<String> {
            self.borrow().file_version(executable)
        }

        fn attach(&self, pid: u32, module: &str) -> Result<Box<dyn ReadMemory>> {
            self.borrow().attach(pid, module)
        }
    }

    #[test]
    fn test_mock_backend_liveness() {
        let mut backend = MockBackend::new("2.10.8.4337").running(42);
        assert!(backend.is_alive(42, "CloudMusic.exe"));
        assert!(!backend.is_alive(43, "cloudmusic.exe"));
        assert!(!backend.is_alive(42, "other.exe"));
    }
}
