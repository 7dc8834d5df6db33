use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// I/O readiness interest for a single handle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl Interest {
    pub(crate) const READ: Interest = Interest {
        read: true,
        write: false,
    };

    pub(crate) const WRITE: Interest = Interest {
        read: false,
        write: true,
    };

    /// Poll event mask for this interest.
    pub(crate) fn events(self) -> libc::c_short {
        let mut events = 0;

        if self.read {
            events |= libc::POLLIN;
        }
        if self.write {
            events |= libc::POLLOUT;
        }

        events
    }
}

/// Converts a timeout into the millisecond form `poll(2)` expects.
///
/// Rounds up so the call never returns before the requested deadline;
/// `None` means block indefinitely.
fn timeout_ms(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(d) => {
            let ms = d.as_secs() as u128 * 1_000 + u128::from(d.subsec_nanos().div_ceil(1_000_000));
            ms.min(libc::c_int::MAX as u128) as libc::c_int
        }
    }
}

/// Waits on a set of poll descriptors using `poll(2)`.
///
/// Returns the number of descriptors with events pending. An `EINTR`
/// is reported as zero ready descriptors; the caller recomputes its
/// deadline and blocks again.
pub(crate) fn sys_poll(fds: &mut [libc::pollfd], timeout: Option<Duration>) -> io::Result<usize> {
    let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms(timeout)) };

    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(0);
        }
        return Err(err);
    }

    Ok(rc as usize)
}

/// Checks or waits for readiness of a single handle.
///
/// With a zero timeout this is a non-blocking readiness probe. Error
/// and hang-up conditions count as ready so the subsequent read or
/// write observes them.
pub(crate) fn poll_interest(
    fd: RawFd,
    interest: Interest,
    timeout: Option<Duration>,
) -> io::Result<bool> {
    let mut fds = [libc::pollfd {
        fd,
        events: interest.events(),
        revents: 0,
    }];

    let ready = sys_poll(&mut fds, timeout)?;

    Ok(ready > 0 && fds[0].revents != 0)
}

/// Non-blocking `read(2)` into the buffer.
///
/// Returns the byte count, zero at end of stream, or a negative value
/// on error; the caller inspects `errno`. The handle must be in
/// non-blocking mode.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> isize {
    unsafe { libc::read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) }
}

/// Non-blocking `write(2)` from the buffer.
///
/// Returns the byte count actually accepted, which may be short of the
/// buffer, or a negative value on error. The handle must be in
/// non-blocking mode.
pub(crate) fn sys_write(fd: RawFd, buffer: &[u8]) -> isize {
    unsafe { libc::write(fd, buffer.as_ptr() as *const _, buffer.len()) }
}
