use fibra::time::sleep;
use fibra::{CancellationToken, Scheduler, Task, TaskError};

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

#[test]
fn test_token_cancel_is_idempotent() {
    let token = CancellationToken::new();

    assert!(!token.is_cancelled());
    assert!(token.check().is_ok());

    token.cancel();
    token.cancel();

    assert!(token.is_cancelled());
    assert!(matches!(token.check(), Err(TaskError::Cancelled)));
}

#[test]
fn test_clones_share_the_flag() {
    let token = CancellationToken::new();
    let clone = token.clone();

    clone.cancel();

    assert!(token.is_cancelled(), "cancelling any clone cancels them all");
}

#[test]
fn test_cancellation_is_edge_triggered() {
    let scheduler = Scheduler::new();
    let token = CancellationToken::new();
    let iterations = Rc::new(Cell::new(0u32));

    let counted = iterations.clone();
    let watched = token.clone();
    let worker = Task::from_future(async move {
        for _ in 0..1_000 {
            counted.set(counted.get() + 1);
            sleep(Duration::from_millis(5)).with_token(&watched).await?;
        }

        Ok(())
    });

    let stopper = token.clone();
    let canceller = Task::from_future(async move {
        sleep(Duration::from_millis(12)).await?;
        stopper.cancel();
        Ok(())
    });

    let err = scheduler
        .all(vec![("worker", worker), ("canceller", canceller)])
        .expect_err("the worker observes the cancellation");

    assert!(matches!(err, TaskError::Cancelled));
    assert!(
        iterations.get() >= 2,
        "work between suspension points keeps running until the next check: {} iterations",
        iterations.get()
    );
    assert!(
        iterations.get() < 1_000,
        "the worker never finished its full run"
    );
}

#[test]
fn test_cancel_before_start_still_runs_to_first_check() {
    let token = CancellationToken::new();
    token.cancel();

    let ran = Rc::new(Cell::new(false));

    let observed = ran.clone();
    let watched = token.clone();
    let mut task = Task::from_future(async move {
        observed.set(true);
        sleep(Duration::from_millis(1)).with_token(&watched).await?;
        Ok(())
    });

    let err = task.result().expect_err("the first check point raises");

    assert!(matches!(err, TaskError::Cancelled));
    assert!(
        ran.get(),
        "code ahead of the first suspension point still executed"
    );
}

#[test]
fn test_spawned_task_cancel_round_trip() {
    let scheduler = Scheduler::new();
    let token = CancellationToken::new();

    let watched = token.clone();
    let mut task = scheduler
        .spawn_with_token(
            async move {
                for _ in 0..1_000 {
                    sleep(Duration::from_millis(1)).with_token(&watched).await?;
                }
                Ok(())
            },
            &token,
        )
        .unwrap();

    task.cancel();

    let err = task.result().expect_err("cancel propagates through the task's token");
    assert!(matches!(err, TaskError::Cancelled));
    assert_eq!(scheduler.live_tasks(), 0, "terminal tasks leave the registry");
}

#[test]
fn test_scheduler_sleep_honors_token_at_entry() {
    let scheduler = Scheduler::new();
    let token = CancellationToken::new();
    token.cancel();

    let err = scheduler
        .sleep(Duration::from_secs(5), Some(&token))
        .expect_err("a cancelled token skips the blocking sleep");

    assert!(matches!(err, TaskError::Cancelled));
}
