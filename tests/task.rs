use fibra::time::sleep;
use fibra::{CancellationToken, Task, TaskError, TaskState};

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_completed_task_is_terminal() {
    let mut task = Task::completed(7);

    assert!(task.is_completed());
    assert!(!task.is_running());
    assert_eq!(task.state(), TaskState::Completed);
    assert_eq!(*task.result().expect("completed task yields its value"), 7);
}

#[test]
fn test_failed_task_raises_identically() {
    let mut task: Task<i32> = Task::failed(TaskError::message("boom"));

    let first = task.result().expect_err("failed task raises");
    let second = task.result().expect_err("failed task raises again");

    assert_eq!(first.to_string(), second.to_string());

    match (&first, &second) {
        (TaskError::Failed(a), TaskError::Failed(b)) => {
            assert!(Arc::ptr_eq(a, b), "both raises share the same source error");
        }
        other => panic!("expected two Failed errors, got {other:?}"),
    }
}

#[test]
fn test_closure_task_runs_once_and_caches() {
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();

    let mut task = Task::from_fn(move || {
        seen.set(seen.get() + 1);
        Ok(41)
    });

    assert!(!task.is_completed());
    assert_eq!(task.state(), TaskState::NotStarted);

    assert_eq!(*task.result().unwrap(), 41);
    assert_eq!(*task.result().unwrap(), 41);
    assert_eq!(calls.get(), 1, "closure body runs exactly once");
}

#[test]
fn test_standalone_drive_blocks_on_sleep() {
    let mut task = Task::from_future(async {
        sleep(Duration::from_millis(20)).await?;
        Ok("done")
    });

    let start = Instant::now();
    assert_eq!(*task.result().unwrap(), "done");

    assert!(
        start.elapsed() >= Duration::from_millis(20),
        "a standalone drive must block out the sleep"
    );
}

#[test]
fn test_yield_now_resumes_without_parking() {
    let mut task = Task::from_future(async {
        fibra::task::yield_now().await;
        Ok(5)
    });

    assert_eq!(*task.result().unwrap(), 5);
}

#[test]
fn test_failure_is_not_cancellation() {
    let token = CancellationToken::new();

    let mut task: Task<()> =
        Task::from_fn(|| Err(TaskError::message("exploded"))).with_token(&token);

    let err = task.result().expect_err("body failure surfaces");

    assert!(
        matches!(err, TaskError::Failed(_)),
        "a failing body reports Failed, not Cancelled: {err:?}"
    );
    assert!(!token.is_cancelled());
}

#[test]
fn test_cancel_is_noop_on_terminal_task() {
    let token = CancellationToken::new();
    let task = Task::completed(1).with_token(&token);

    task.cancel();

    assert!(!token.is_cancelled(), "terminal tasks ignore cancel");
}

#[test]
fn test_cancel_sets_attached_token() {
    let token = CancellationToken::new();

    let watched = token.clone();
    let mut task = Task::from_future(async move {
        for _ in 0..1_000 {
            sleep(Duration::from_millis(1)).with_token(&watched).await?;
        }

        Ok(())
    })
    .with_token(&token);

    task.cancel();
    assert!(token.is_cancelled());

    let err = task.result().expect_err("cancelled task raises at its next check point");
    assert!(matches!(err, TaskError::Cancelled));
}
