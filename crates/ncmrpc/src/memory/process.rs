//! Process handle and module lookup.
//!
//! On Windows this wraps `OpenProcess` / `ReadProcessMemory` and a Toolhelp
//! module snapshot. Other platforms get stubs that report `Unsupported`.

use crate::error::{Error, Result};

/// Base address and image size of a module loaded in the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub base: u64,
    pub size: usize,
}

#[cfg(target_os = "windows")]
pub struct ProcessHandle {
    pub pid: u32,
    handle: windows::Win32::Foundation::HANDLE,
}

#[cfg(not(target_os = "windows"))]
pub struct ProcessHandle {
    pub pid: u32,
}

#[cfg(target_os = "windows")]
fn classify_os_error(pid: u32, error: &windows::core::Error) -> Error {
    use windows::Win32::Foundation::{ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER};

    if error.code() == ERROR_ACCESS_DENIED.to_hresult() {
        Error::AccessDenied(pid)
    } else if error.code() == ERROR_INVALID_PARAMETER.to_hresult() {
        // OpenProcess reports a pid that no longer exists this way
        Error::ProcessExited(pid)
    } else {
        Error::ProcessNotFound(format!("pid {}: {}", pid, error))
    }
}

#[cfg(target_os = "windows")]
impl ProcessHandle {
    /// Open a process for memory reads.
    pub fn open(pid: u32) -> Result<Self> {
        use windows::Win32::System::Threading::{
            OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_READ,
        };

        // SAFETY: OpenProcess has no memory-safety preconditions; the returned
        // handle is owned by Self and closed in Drop.
        let handle = unsafe {
            OpenProcess(
                PROCESS_VM_READ | PROCESS_QUERY_LIMITED_INFORMATION,
                false,
                pid,
            )
        }
        .map_err(|e| classify_os_error(pid, &e))?;

        Ok(Self { pid, handle })
    }

    pub fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;

        let mut buffer = vec![0u8; size];
        let mut read = 0usize;

        // SAFETY: the destination buffer is exactly `size` bytes and lives for
        // the duration of the call. The source address is in the target
        // process and is validated by the OS.
        unsafe {
            ReadProcessMemory(
                self.handle,
                address as *const _,
                buffer.as_mut_ptr().cast(),
                size,
                Some(&mut read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.message(),
        })?;

        if read != size {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("partial read: {} of {} bytes", read, size),
            });
        }

        Ok(buffer)
    }

    /// Find a loaded module by file name (case-insensitive).
    pub fn find_module(&self, name: &str) -> Result<ModuleInfo> {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Diagnostics::ToolHelp::{
            CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, Module32NextW,
            TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32,
        };

        // SAFETY: the snapshot handle is closed below on every path.
        let snapshot =
            unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, self.pid) }
                .map_err(|e| classify_os_error(self.pid, &e))?;

        let mut entry = MODULEENTRY32W {
            dwSize: std::mem::size_of::<MODULEENTRY32W>() as u32,
            ..Default::default()
        };

        let mut found = None;
        // SAFETY: entry.dwSize is initialised as the API requires.
        let mut ok = unsafe { Module32FirstW(snapshot, &mut entry) }.is_ok();
        while ok {
            let len = entry
                .szModule
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(entry.szModule.len());
            let module_name = String::from_utf16_lossy(&entry.szModule[..len]);

            if module_name.eq_ignore_ascii_case(name) {
                found = Some(ModuleInfo {
                    name: module_name,
                    base: entry.modBaseAddr as u64,
                    size: entry.modBaseSize as usize,
                });
                break;
            }

            // SAFETY: same snapshot and entry as above.
            ok = unsafe { Module32NextW(snapshot, &mut entry) }.is_ok();
        }

        // SAFETY: snapshot was returned by CreateToolhelp32Snapshot.
        unsafe {
            let _ = CloseHandle(snapshot);
        }

        found.ok_or_else(|| Error::ModuleNotFound(name.to_string()))
    }
}

#[cfg(target_os = "windows")]
impl Drop for ProcessHandle {
    fn drop(&mut self) {
        use windows::Win32::Foundation::CloseHandle;

        // SAFETY: the handle was returned by OpenProcess and is closed once.
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

#[cfg(not(target_os = "windows"))]
impl ProcessHandle {
    pub fn open(_pid: u32) -> Result<Self> {
        Err(Error::Unsupported("process memory access"))
    }

    pub fn read_bytes(&self, _address: u64, _size: usize) -> Result<Vec<u8>> {
        Err(Error::Unsupported("process memory access"))
    }

    pub fn find_module(&self, _name: &str) -> Result<ModuleInfo> {
        Err(Error::Unsupported("module enumeration"))
    }
}
