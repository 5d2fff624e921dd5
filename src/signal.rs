//! Cooperative shutdown on SIGINT and SIGTERM.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn request_shutdown(_signum: libc::c_int) {
    // only async-signal-safe work in here
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Installs handlers for SIGINT and SIGTERM and returns the flag they set
///
/// `SA_RESTART` is not set, so a pending wait on the capture device returns with `EINTR`.
pub fn install() -> io::Result<&'static AtomicBool> {
    for &signum in &[libc::SIGINT, libc::SIGTERM] {
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = request_shutdown as extern "C" fn(libc::c_int) as usize;
            libc::sigemptyset(&mut action.sa_mask);
            action.sa_flags = 0;

            if libc::sigaction(signum, &action, std::ptr::null_mut()) == -1 {
                return Err(io::Error::last_os_error());
            }
        }
    }

    Ok(&SHUTDOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigterm_sets_flag() {
        let flag = install().unwrap();
        unsafe {
            assert_eq!(libc::raise(libc::SIGTERM), 0);
        }
        assert!(flag.load(Ordering::SeqCst));
    }
}
