use crate::cancel::CancellationToken;
use crate::error::TaskError;
use crate::scheduler::context;
use crate::scheduler::poller::{self, Interest};
use crate::task::signal::{ReadOp, SuspendSignal, WriteOp};

use std::future::Future;
use std::io;
use std::os::fd::RawFd;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Creates a future that completes once `fd` is readable.
///
/// The handle is borrowed, not owned; it must stay open while the wait
/// is pending. Error and hang-up conditions count as readable so the
/// following read observes them.
pub fn readable(fd: RawFd) -> Readable {
    Readable {
        fd,
        deadline: None,
        token: None,
    }
}

/// Creates a future that completes once `fd` is writable.
pub fn writable(fd: RawFd) -> Writable {
    Writable {
        fd,
        deadline: None,
        token: None,
    }
}

/// A future that waits for a handle to become readable.
///
/// Resolution order on every poll: readiness, then cancellation, then
/// deadline — so a handle that is both ready and past its deadline
/// proceeds rather than timing out.
pub struct Readable {
    fd: RawFd,
    deadline: Option<Instant>,
    token: Option<CancellationToken>,
}

impl Readable {
    /// Bounds the wait with an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Bounds the wait with a timeout from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Attaches a cancellation token to the wait.
    pub fn with_token(mut self, token: &CancellationToken) -> Self {
        self.token = Some(token.clone());
        self
    }
}

impl Future for Readable {
    type Output = Result<(), TaskError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match poller::poll_interest(this.fd, Interest::READ, Some(Duration::ZERO)) {
            Ok(true) => return Poll::Ready(Ok(())),
            Ok(false) => {}
            Err(err) => return Poll::Ready(Err(err.into())),
        }

        if let Some(token) = &this.token {
            if token.is_cancelled() {
                return Poll::Ready(Err(TaskError::Cancelled));
            }
        }

        if let Some(deadline) = this.deadline {
            if Instant::now() >= deadline {
                return Poll::Ready(Err(TaskError::DeadlineExceeded));
            }
        }

        context::deposit(SuspendSignal::Read(ReadOp {
            fd: this.fd,
            deadline: this.deadline,
            token: this.token.clone(),
        }));

        Poll::Pending
    }
}

/// A future that waits for a handle to become writable.
///
/// Same resolution order as [`Readable`].
pub struct Writable {
    fd: RawFd,
    deadline: Option<Instant>,
    token: Option<CancellationToken>,
}

impl Writable {
    /// Bounds the wait with an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Bounds the wait with a timeout from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Attaches a cancellation token to the wait.
    pub fn with_token(mut self, token: &CancellationToken) -> Self {
        self.token = Some(token.clone());
        self
    }
}

impl Future for Writable {
    type Output = Result<(), TaskError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match poller::poll_interest(this.fd, Interest::WRITE, Some(Duration::ZERO)) {
            Ok(true) => return Poll::Ready(Ok(())),
            Ok(false) => {}
            Err(err) => return Poll::Ready(Err(err.into())),
        }

        if let Some(token) = &this.token {
            if token.is_cancelled() {
                return Poll::Ready(Err(TaskError::Cancelled));
            }
        }

        if let Some(deadline) = this.deadline {
            if Instant::now() >= deadline {
                return Poll::Ready(Err(TaskError::DeadlineExceeded));
            }
        }

        context::deposit(SuspendSignal::Write(WriteOp {
            fd: this.fd,
            deadline: this.deadline,
            token: this.token.clone(),
        }));

        Poll::Pending
    }
}

/// Reads from a non-blocking handle, suspending until it is readable.
///
/// Returns the number of bytes read; zero means end of stream. The
/// handle **must** be in non-blocking mode.
pub async fn read(fd: RawFd, buffer: &mut [u8]) -> Result<usize, TaskError> {
    loop {
        let n = poller::sys_read(fd, buffer);

        if n >= 0 {
            return Ok(n as usize);
        }

        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::WouldBlock => {
                readable(fd).await?;
            }
            io::ErrorKind::Interrupted => {}
            _ => return Err(TaskError::failed(err)),
        }
    }
}

/// Writes the whole buffer to a non-blocking handle, suspending
/// whenever the handle stops accepting data.
///
/// Partial writes are handled internally; the returned count is only
/// short of `buffer.len()` when the handle reports end of stream. The
/// handle **must** be in non-blocking mode.
pub async fn write(fd: RawFd, buffer: &[u8]) -> Result<usize, TaskError> {
    let mut written = 0;

    while written < buffer.len() {
        let n = poller::sys_write(fd, &buffer[written..]);

        if n > 0 {
            written += n as usize;
            continue;
        }

        if n == 0 {
            return Ok(written);
        }

        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::WouldBlock => {
                writable(fd).await?;
            }
            io::ErrorKind::Interrupted => {}
            _ => return Err(TaskError::failed(err)),
        }
    }

    Ok(written)
}
