use fibra::time::{sleep, timeout, timeout_with_token};
use fibra::{CancellationToken, Scheduler, Task, TaskError};

use std::time::{Duration, Instant};

#[test]
fn test_timeout_expires_at_a_suspension_point() {
    let inner = Task::from_future(async {
        for _ in 0..100 {
            sleep(Duration::from_millis(10)).await?;
        }
        Ok(0)
    });

    let mut bounded = timeout(Duration::from_millis(50), inner);

    let start = Instant::now();
    let err = bounded.result().expect_err("the deadline fires between sleeps");
    let elapsed = start.elapsed();

    assert!(matches!(err, TaskError::DeadlineExceeded));
    assert!(
        elapsed >= Duration::from_millis(50),
        "the deadline is not enforced early: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(500),
        "the deadline fires at the next suspension after expiry: {elapsed:?}"
    );
}

#[test]
fn test_timeout_cannot_interrupt_a_busy_body() {
    let inner = Task::from_future(async {
        let end = Instant::now() + Duration::from_millis(80);
        let mut spins: u64 = 0;
        while Instant::now() < end {
            spins += 1;
        }
        Ok(spins)
    });

    let mut bounded = timeout(Duration::from_millis(20), inner);

    let spins = *bounded
        .result()
        .expect("a body that never suspends cannot be timed out");

    assert!(spins > 0);
}

#[test]
fn test_timeout_passes_through_an_early_completion() {
    let inner = Task::from_future(async {
        sleep(Duration::from_millis(5)).await?;
        Ok(123)
    });

    let mut bounded = timeout(Duration::from_millis(100), inner);

    assert_eq!(*bounded.result().unwrap(), 123);
}

#[test]
fn test_timeout_propagates_inner_failure_verbatim() {
    let inner: Task<i32> = Task::from_fn(|| Err(TaskError::message("inner fault")));

    let mut bounded = timeout(Duration::from_millis(100), inner);

    let err = bounded.result().expect_err("inner failure passes through");
    assert!(matches!(err, TaskError::Failed(_)));
    assert!(err.to_string().contains("inner fault"));
}

#[test]
fn test_cancelled_timeout_reports_cancellation_not_deadline() {
    let token = CancellationToken::new();
    token.cancel();

    let inner = Task::from_future(async {
        sleep(Duration::from_millis(10)).await?;
        Ok(())
    });

    let mut bounded = timeout_with_token(Duration::from_millis(50), inner, &token);

    let err = bounded.result().expect_err("the token wins over the deadline");
    assert!(
        matches!(err, TaskError::Cancelled),
        "cancellation stays distinct from a timeout: {err:?}"
    );
}

#[test]
fn test_timeout_is_transparent_to_the_scheduler() {
    let scheduler = Scheduler::new();

    let inner = Task::from_future(async {
        sleep(Duration::from_millis(5)).await?;
        Ok("inner")
    });
    let bounded = timeout(Duration::from_millis(100), inner);

    let companion = Task::from_future(async {
        sleep(Duration::from_millis(1)).await?;
        Ok("companion")
    });

    let results = scheduler
        .all(vec![("bounded", bounded), ("companion", companion)])
        .unwrap();

    assert_eq!(results, vec![("bounded", "inner"), ("companion", "companion")]);
}
