use fibra::time::sleep;
use fibra::{LimitKind, Scheduler, Task, TaskError};

use std::time::Duration;

#[test]
fn test_concurrency_cap_fails_fast_at_spawn() {
    let scheduler = Scheduler::builder().max_concurrent_tasks(2).build();

    let first = scheduler.spawn(async { Ok(1) }).unwrap();
    let _second = scheduler.spawn(async { Ok(2) }).unwrap();

    let err = scheduler
        .spawn(async { Ok(3) })
        .expect_err("the cap is enforced before any work is scheduled");

    assert!(matches!(
        err,
        TaskError::LimitExceeded {
            kind: LimitKind::Concurrency,
            current: 2,
            limit: 2,
        }
    ));
    assert_eq!(scheduler.live_tasks(), 2);

    // Finishing a task frees its slot.
    let mut first = first;
    first.result().unwrap();
    assert_eq!(scheduler.live_tasks(), 1);

    scheduler
        .spawn(async { Ok(4) })
        .expect("a freed slot admits a new task");
}

#[test]
fn test_dropping_a_live_task_frees_its_slot() {
    let scheduler = Scheduler::builder().max_concurrent_tasks(1).build();

    let task = scheduler.spawn(async { Ok(1) }).unwrap();
    assert_eq!(scheduler.live_tasks(), 1);

    drop(task);
    assert_eq!(scheduler.live_tasks(), 0, "abandoned tasks leave the registry");

    scheduler
        .spawn(async { Ok(2) })
        .expect("the slot is reusable after the drop");
}

#[test]
fn test_wall_clock_cap_aborts_a_long_task() {
    let scheduler = Scheduler::builder()
        .max_task_duration(Duration::from_millis(20))
        .build();

    let worker = scheduler
        .spawn(async {
            for _ in 0..100 {
                sleep(Duration::from_millis(5)).await?;
            }
            Ok(())
        })
        .unwrap();

    let err = scheduler
        .all(vec![("worker", worker)])
        .expect_err("the wall-clock cap aborts the task at a step");

    assert!(matches!(err, TaskError::DeadlineExceeded));
    assert_eq!(scheduler.live_tasks(), 0);
}

#[cfg(target_os = "linux")]
#[test]
fn test_memory_cap_aborts_the_whole_invocation() {
    let scheduler = Scheduler::builder().max_memory_bytes(1).build();

    let sleeper = Task::from_future(async {
        sleep(Duration::from_millis(50)).await?;
        Ok(())
    });

    let err = scheduler
        .all(vec![("sleeper", sleeper)])
        .expect_err("any real process exceeds a one-byte cap");

    assert!(matches!(
        err,
        TaskError::LimitExceeded {
            kind: LimitKind::Memory,
            ..
        }
    ));
}

#[cfg(target_os = "linux")]
#[test]
fn test_open_handle_cap_aborts_the_whole_invocation() {
    let scheduler = Scheduler::builder().max_open_handles(1).build();

    let sleeper = Task::from_future(async {
        sleep(Duration::from_millis(50)).await?;
        Ok(())
    });

    let err = scheduler
        .all(vec![("sleeper", sleeper)])
        .expect_err("any real process holds more than one descriptor");

    assert!(matches!(
        err,
        TaskError::LimitExceeded {
            kind: LimitKind::OpenHandles,
            ..
        }
    ));
}
