use std::path::Path;

use crate::error::Result;

/// `HIWORD(ms).LOWORD(ms).HIWORD(ls).LOWORD(ls)` of a `VS_FIXEDFILEINFO`
pub fn format_file_version(version_ms: u32, version_ls: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        version_ms >> 16,
        version_ms & 0xFFFF,
        version_ls >> 16,
        version_ls & 0xFFFF
    )
}

/// Read the four-part file version from an executable's version resource.
#[cfg(target_os = "windows")]
pub fn read_file_version(path: &Path) -> Result<String> {
    use crate::error::Error;
    use windows::Win32::Storage::FileSystem::{
        GetFileVersionInfoSizeW, GetFileVersionInfoW, VS_FIXEDFILEINFO, VerQueryValueW,
    };
    use windows::core::{HSTRING, w};

    let wide = HSTRING::from(path);

    // SAFETY: `wide` is a valid NUL-terminated wide string for the call.
    let size = unsafe { GetFileVersionInfoSizeW(&wide, None) };
    if size == 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }

    let mut block = vec![0u8; size as usize];
    // SAFETY: `block` is exactly `size` bytes as reported by the size query.
    unsafe { GetFileVersionInfoW(&wide, 0, size, block.as_mut_ptr().cast()) }
        .map_err(|e| Error::Io(std::io::Error::other(e.message())))?;

    let mut info: *mut std::ffi::c_void = std::ptr::null_mut();
    let mut info_len = 0u32;
    // SAFETY: `block` holds the version resource filled in above and outlives
    // the returned pointer, which points into it.
    let found = unsafe { VerQueryValueW(block.as_ptr().cast(), w!("\\"), &mut info, &mut info_len) };
    if !found.as_bool() || info.is_null() || (info_len as usize) < size_of::<VS_FIXEDFILEINFO>() {
        return Err(Error::Io(std::io::Error::other(format!(
            "no fixed version info in {}",
            path.display()
        ))));
    }

    // SAFETY: checked non-null and large enough for VS_FIXEDFILEINFO above.
    let fixed = unsafe { std::ptr::read_unaligned(info as *const VS_FIXEDFILEINFO) };
    Ok(format_file_version(fixed.dwFileVersionMS, fixed.dwFileVersionLS))
}

#[cfg(not(target_os = "windows"))]
pub fn read_file_version(_path: &Path) -> Result<String> {
    Err(crate::error::Error::Unsupported("file version resources"))
}
