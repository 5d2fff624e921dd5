use std::ffi::CString;
use std::os::raw::{c_int, c_void};
use std::os::unix::ffi::OsStrExt;
use std::{io, path::Path};

use crate::v4l2::vidioc;

fn check(ret: c_int) -> io::Result<c_int> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// Opens a device node and returns its file descriptor
///
/// The descriptor is not inherited by child processes.
///
/// # Example
///
/// ```
/// use uvc_lcd::v4l2;
///
/// let fd = v4l2::open("/dev/video0", libc::O_RDWR);
/// ```
pub fn open<P: AsRef<Path>>(path: P, flags: c_int) -> io::Result<c_int> {
    let c_path = CString::new(path.as_ref().as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    check(unsafe { libc::open(c_path.as_ptr(), flags | libc::O_CLOEXEC) })
}

/// Closes a file descriptor obtained from [`open`]
pub fn close(fd: c_int) -> io::Result<()> {
    check(unsafe { libc::close(fd) }).map(drop)
}

/// Issues a device control request, reporting errno on failure
///
/// # Safety
///
/// `argp` must point to a live value of the type `request` encodes.
pub unsafe fn ioctl(fd: c_int, request: vidioc::_IOC_TYPE, argp: *mut c_void) -> io::Result<()> {
    // libc disagrees across platforms on the type of the request argument, the raw syscall
    // does not care (https://github.com/rust-lang/libc/issues/1036)
    let ret = libc::syscall(libc::SYS_ioctl, fd, request, argp) as c_int;
    check(ret).map(drop)
}

/// Maps a region of a device into memory
///
/// # Safety
///
/// `start` is passed to mmap(2) unchecked, usually it is NULL.
pub unsafe fn mmap(
    start: *mut c_void,
    length: usize,
    prot: c_int,
    flags: c_int,
    fd: c_int,
    offset: libc::off_t,
) -> io::Result<*mut c_void> {
    let ret = libc::mmap(start, length, prot, flags, fd, offset);
    if ret == libc::MAP_FAILED {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// Removes a mapping created by [`mmap`]
///
/// # Safety
///
/// No reference into the region may outlive this call.
pub unsafe fn munmap(start: *mut c_void, length: usize) -> io::Result<()> {
    check(libc::munmap(start, length)).map(drop)
}
