use crate::error::{LimitKind, TaskError};
use crate::metrics::Metrics;

use std::io;
use std::time::Duration;

/// Advisory resource limits enforced by a scheduler.
///
/// Each limit is optional and checked at a different moment:
///
/// - `max_concurrent_tasks` at spawn (fail-fast),
/// - `max_task_duration` every time a task is stepped,
/// - `max_memory_bytes` / `max_open_handles` once per event-loop idle
///   cycle, against process-wide measurements.
///
/// All of them are cooperative: a task that never yields outruns them
/// until its next suspension point.
#[derive(Debug, Clone, Default)]
pub(crate) struct Limits {
    pub(crate) max_concurrent_tasks: Option<usize>,
    pub(crate) max_task_duration: Option<Duration>,
    pub(crate) max_memory_bytes: Option<u64>,
    pub(crate) max_open_handles: Option<u64>,
}

impl Limits {
    /// Runs the idle-cycle aggregate checks.
    ///
    /// A breach aborts the whole `all`/`race` invocation, not a single
    /// task, because the measured resource is shared across all live
    /// tasks. On platforms without the introspection hooks the checks
    /// are skipped.
    pub(crate) fn check_process(&self, metrics: &dyn Metrics) -> Result<(), TaskError> {
        if let Some(limit) = self.max_memory_bytes {
            if let Ok(current) = resident_memory_bytes() {
                if current > limit {
                    metrics.resource_limit(LimitKind::Memory, current, limit);
                    return Err(TaskError::LimitExceeded {
                        kind: LimitKind::Memory,
                        current,
                        limit,
                    });
                }
            }
        }

        if let Some(limit) = self.max_open_handles {
            if let Ok(current) = open_handle_count() {
                if current > limit {
                    metrics.resource_limit(LimitKind::OpenHandles, current, limit);
                    return Err(TaskError::LimitExceeded {
                        kind: LimitKind::OpenHandles,
                        current,
                        limit,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Resident set size of the current process, in bytes.
#[cfg(target_os = "linux")]
pub(crate) fn resident_memory_bytes() -> io::Result<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm")?;

    let pages: u64 = statm
        .split_whitespace()
        .nth(1)
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed /proc/self/statm"))?;

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(pages * page_size as u64)
}

/// Number of file descriptors the current process holds open.
#[cfg(target_os = "linux")]
pub(crate) fn open_handle_count() -> io::Result<u64> {
    Ok(std::fs::read_dir("/proc/self/fd")?.count() as u64)
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn resident_memory_bytes() -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "memory introspection is only available on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn open_handle_count() -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "handle introspection is only available on Linux",
    ))
}
