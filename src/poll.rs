use std::os::raw::c_int;
use std::os::unix::io::RawFd;
use std::{io, time};

/// Converts a timeout to poll(2) milliseconds, rounding up so short waits still block
pub fn timeout_millis(timeout: Option<time::Duration>) -> c_int {
    match timeout {
        None => -1,
        Some(d) => {
            let millis = (d.as_nanos() + 999_999) / 1_000_000;
            millis.min(c_int::MAX as u128) as c_int
        }
    }
}

/// Blocks until `fd` becomes readable or `timeout` expires
///
/// Returns `Ok(false)` on timeout and when a signal interrupted the wait, so callers get a
/// chance to look at their shutdown flag. `None` waits forever. Any descriptor value is
/// accepted, there is no `FD_SETSIZE` ceiling.
pub fn wait_readable(fd: RawFd, timeout: Option<time::Duration>) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    match unsafe { libc::poll(&mut pfd, 1, timeout_millis(timeout)) } {
        -1 => {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                Ok(false)
            } else {
                Err(err)
            }
        }
        0 => Ok(false),
        _ if pfd.revents & libc::POLLNVAL != 0 => Err(io::Error::from_raw_os_error(libc::EBADF)),
        _ => Ok(pfd.revents & (libc::POLLIN | libc::POLLERR | libc::POLLHUP) != 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn millis_from_duration() {
        assert_eq!(timeout_millis(None), -1);
        assert_eq!(timeout_millis(Some(time::Duration::from_millis(1500))), 1500);
        assert_eq!(timeout_millis(Some(time::Duration::from_micros(10))), 1);
        assert_eq!(timeout_millis(Some(time::Duration::ZERO)), 0);
        assert_eq!(timeout_millis(Some(time::Duration::MAX)), c_int::MAX);
    }

    #[test]
    fn times_out_without_data() {
        let (a, _b) = UnixStream::pair().unwrap();
        let ready = wait_readable(a.as_raw_fd(), Some(time::Duration::from_millis(10))).unwrap();
        assert!(!ready);
    }

    #[test]
    fn ready_when_data_pending() {
        let (a, mut b) = UnixStream::pair().unwrap();
        b.write_all(b"x").unwrap();
        let ready = wait_readable(a.as_raw_fd(), Some(time::Duration::from_secs(1))).unwrap();
        assert!(ready);
    }

    #[test]
    fn descriptor_above_fd_setsize() {
        let high = libc::FD_SETSIZE as c_int + 64;

        let mut limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
            return;
        }
        if limit.rlim_cur <= high as libc::rlim_t {
            if limit.rlim_max <= high as libc::rlim_t {
                // the hard limit does not allow a descriptor this high
                return;
            }
            limit.rlim_cur = limit.rlim_max;
            if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &limit) } != 0 {
                return;
            }
        }

        let (a, mut b) = UnixStream::pair().unwrap();
        let fd = unsafe { libc::dup2(a.as_raw_fd(), high) };
        assert_eq!(fd, high);

        let ready = wait_readable(fd, Some(time::Duration::from_millis(10))).unwrap();
        assert!(!ready);

        b.write_all(b"x").unwrap();
        let ready = wait_readable(fd, Some(time::Duration::from_secs(1))).unwrap();
        assert!(ready);

        unsafe { libc::close(fd) };
    }
}
