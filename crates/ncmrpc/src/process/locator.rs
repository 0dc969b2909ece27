use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};
use crate::process::ProcessBackend;

pub const TARGET_EXECUTABLE: &str = "cloudmusic.exe";
pub const TARGET_MODULE: &str = "cloudmusic.dll";
/// Helper processes (renderer, GPU, ...) carry this on their command line
pub const CHILD_PROCESS_MARKER: &str = "--type=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedProcess {
    pub pid: u32,
    pub version: String,
    pub executable: PathBuf,
}

/// Finds the primary instance of the target executable.
#[derive(Debug, Clone)]
pub struct ProcessLocator {
    executable_name: String,
}

impl Default for ProcessLocator {
    fn default() -> Self {
        Self::new(TARGET_EXECUTABLE)
    }
}

impl ProcessLocator {
    pub fn new(executable_name: impl Into<String>) -> Self {
        Self {
            executable_name: executable_name.into(),
        }
    }

    pub fn executable_name(&self) -> &str {
        &self.executable_name
    }

    /// Locate the primary process.
    ///
    /// `Ok(None)` when nothing is running, or when the process vanished or
    /// refused access while its version was being read. More than one
    /// primary candidate is an error; the locator never picks one.
    pub fn locate(&self, backend: &mut dyn ProcessBackend) -> Result<Option<LocatedProcess>> {
        let mut primaries: Vec<_> = backend
            .processes(&self.executable_name)
            .into_iter()
            .filter(|p| !p.command_line.iter().any(|arg| arg.contains(CHILD_PROCESS_MARKER)))
            .collect();

        let entry = match primaries.len() {
            0 => return Ok(None),
            1 => primaries.remove(0),
            _ => {
                let mut pids: Vec<u32> = primaries.iter().map(|p| p.pid).collect();
                pids.sort_unstable();
                return Err(Error::MultipleCandidates(pids));
            }
        };

        let Some(executable) = entry.executable else {
            debug!("Executable path of pid {} is not readable", entry.pid);
            return Ok(None);
        };

        let version = match backend.file_version(&executable) {
            Ok(version) => version,
            Err(e) if e.is_process_race() => {
                debug!("Process {} went away during inspection: {}", entry.pid, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(Some(LocatedProcess {
            pid: entry.pid,
            version,
            executable,
        }))
    }

    /// Whether `pid` is still running under the target executable name.
    pub fn is_alive(&self, backend: &mut dyn ProcessBackend, pid: u32) -> bool {
        backend.is_alive(pid, &self.executable_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{MockBackend, ProcessEntry};

    fn entry(pid: u32, args: &[&str]) -> ProcessEntry {
        ProcessEntry {
            pid,
            name: "cloudmusic.exe".to_string(),
            command_line: args.iter().map(|s| s.to_string()).collect(),
            executable: Some(PathBuf::from(r"C:\Program Files\CloudMusic\cloudmusic.exe")),
        }
    }

    #[test]
    fn test_locate_filters_child_processes() {
        let mut backend = MockBackend::new("2.10.8.4337");
        backend.entries = vec![
            entry(10, &["cloudmusic.exe", "--type=renderer"]),
            entry(11, &["cloudmusic.exe"]),
            entry(12, &["cloudmusic.exe", "--type=gpu-process", "--foo"]),
        ];

        let located = ProcessLocator::default().locate(&mut backend).unwrap().unwrap();
        assert_eq!(located.pid, 11);
        assert_eq!(located.version, "2.10.8.4337");
    }

    #[test]
    fn test_locate_nothing_running() {
        let mut backend = MockBackend::new("2.10.8.4337");
        backend.entries = vec![entry(10, &["cloudmusic.exe", "--type=renderer"])];
        assert!(ProcessLocator::default().locate(&mut backend).unwrap().is_none());
    }

    #[test]
    fn test_locate_multiple_candidates() {
        let mut backend = MockBackend::new("2.10.8.4337");
        backend.entries = vec![entry(30, &[]), entry(20, &[])];
        match ProcessLocator::default().locate(&mut backend) {
            Err(Error::MultipleCandidates(pids)) => assert_eq!(pids, vec![20, 30]),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_version_race_is_not_found() {
        let mut backend = MockBackend::new("2.10.8.4337");
        backend.entries = vec![entry(5, &[])];
        backend.version_error = Some(|| Error::AccessDenied(5));
        assert!(ProcessLocator::default().locate(&mut backend).unwrap().is_none());

        backend.version_error = Some(|| Error::Unsupported("file version resources"));
        assert!(ProcessLocator::default().locate(&mut backend).is_err());
    }

    #[test]
    fn test_missing_executable_path_is_not_found() {
        let mut backend = MockBackend::new("2.10.8.4337");
        let mut process = entry(5, &[]);
        process.executable = None;
        backend.entries = vec![process];
        assert!(ProcessLocator::default().locate(&mut backend).unwrap().is_none());
    }
}
