use fibra::io::{read, readable, write};
use fibra::time::sleep;
use fibra::{Scheduler, Task, TaskError};

use std::os::fd::RawFd;
use std::thread;
use std::time::{Duration, Instant};

/// Creates a non-blocking pipe, returning `(read_end, write_end)`.
fn pipe_nonblocking() -> (RawFd, RawFd) {
    let mut fds = [0; 2];
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(rc, 0, "pipe(2) failed");

    for fd in fds {
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        assert!(flags >= 0, "F_GETFL failed");

        let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        assert!(rc >= 0, "F_SETFL failed");
    }

    (fds[0], fds[1])
}

fn close(fd: RawFd) {
    unsafe { libc::close(fd) };
}

#[test]
fn test_read_waits_for_a_delayed_writer() {
    let scheduler = Scheduler::new();
    let (rx, tx) = pipe_nonblocking();

    let reader = Task::from_future(async move {
        let mut buffer = [0u8; 8];
        let n = read(rx, &mut buffer).await?;
        Ok(buffer[..n].to_vec())
    });

    let writer = Task::from_future(async move {
        sleep(Duration::from_millis(10)).await?;
        write(tx, b"ping").await?;
        Ok(Vec::new())
    });

    let results = scheduler
        .all(vec![("reader", reader), ("writer", writer)])
        .unwrap();

    assert_eq!(results[0].1, b"ping".to_vec());

    close(rx);
    close(tx);
}

#[test]
fn test_readable_times_out_on_a_silent_pipe() {
    let scheduler = Scheduler::new();
    let (rx, tx) = pipe_nonblocking();

    let waiter = Task::from_future(async move {
        readable(rx).with_timeout(Duration::from_millis(20)).await
    });

    let start = Instant::now();
    let err = scheduler
        .race(vec![waiter])
        .expect_err("nothing ever writes into the pipe");

    assert!(matches!(err, TaskError::DeadlineExceeded));
    assert!(
        start.elapsed() >= Duration::from_millis(20),
        "the deadline is not enforced early"
    );

    close(rx);
    close(tx);
}

#[test]
fn test_readiness_wins_over_a_passed_deadline() {
    let (rx, tx) = pipe_nonblocking();

    let n = unsafe { libc::write(tx, b"x".as_ptr() as *const _, 1) };
    assert_eq!(n, 1, "priming write failed");

    let expired = Instant::now() - Duration::from_millis(1);
    let mut waiter = Task::from_future(async move {
        readable(rx).with_deadline(expired).await
    });

    waiter
        .result()
        .expect("a ready handle proceeds even past its deadline");

    close(rx);
    close(tx);
}

#[test]
fn test_standalone_read_blocks_for_an_external_writer() {
    let (rx, tx) = pipe_nonblocking();

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        let n = unsafe { libc::write(tx, b"z".as_ptr() as *const _, 1) };
        assert_eq!(n, 1, "producer write failed");
    });

    let mut reader = Task::from_future(async move {
        let mut buffer = [0u8; 4];
        let n = read(rx, &mut buffer).await?;
        Ok(buffer[..n].to_vec())
    });

    assert_eq!(*reader.result().unwrap(), vec![b'z']);
    producer.join().unwrap();

    close(rx);
}

#[test]
fn test_write_backpressure_suspends_until_drained() {
    let scheduler = Scheduler::new();
    let (rx, tx) = pipe_nonblocking();

    // Large enough to overrun the default pipe buffer.
    let payload = vec![7u8; 256 * 1024];
    let expected = payload.len();

    let writer = Task::from_future(async move {
        let n = write(tx, &payload).await?;
        Ok(n)
    });

    let drainer = Task::from_future(async move {
        let mut drained = 0;
        let mut buffer = [0u8; 4096];

        while drained < expected {
            drained += read(rx, &mut buffer).await?;
        }

        Ok(drained)
    });

    let results = scheduler
        .all(vec![("writer", writer), ("drainer", drainer)])
        .unwrap();

    assert_eq!(results, vec![("writer", expected), ("drainer", expected)]);

    close(rx);
    close(tx);
}
