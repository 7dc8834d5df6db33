use crate::cancel::CancellationToken;
use crate::error::TaskError;
use crate::task::Task;
use crate::time::sleep;

use std::time::Duration;

/// Runs a callable a fixed number of times, pausing between runs.
///
/// The callable receives the 0-based iteration index; every return
/// value is collected, in order, into the task's result. Any
/// iteration's failure aborts the whole task with no partial result.
///
/// # Examples
///
/// ```rust,ignore
/// let mut task = repeat(5, |i| Ok(i * 2))
///     .set_interval(Duration::from_millis(10))
///     .into_task();
///
/// assert_eq!(task.result()?, &vec![0, 2, 4, 6, 8]);
/// ```
pub fn repeat<F>(times: usize, body: F) -> Repeat<F> {
    Repeat {
        body,
        times,
        interval: Duration::ZERO,
        token: None,
    }
}

/// A configured repetition, convertible into a [`Task`].
pub struct Repeat<F> {
    body: F,
    times: usize,

    interval: Duration,
    token: Option<CancellationToken>,
}

impl<F> Repeat<F> {
    /// Sets the pause between consecutive iterations.
    ///
    /// The pause is a real suspension point, so other tasks run during
    /// it. A zero interval (the default) makes the whole repetition
    /// atomic with respect to other tasks.
    pub fn set_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Attaches a cancellation token.
    ///
    /// The token is observed before each iteration and by the interval
    /// sleep itself.
    pub fn with_token(mut self, token: &CancellationToken) -> Self {
        self.token = Some(token.clone());
        self
    }

    /// Builds the coroutine task running the repetition.
    pub fn into_task<T>(self) -> Task<Vec<T>>
    where
        F: FnMut(usize) -> Result<T, TaskError> + 'static,
        T: 'static,
    {
        let Repeat {
            mut body,
            times,
            interval,
            token,
        } = self;

        let task_token = token.clone();

        let future = async move {
            let mut results = Vec::with_capacity(times);

            for index in 0..times {
                // Every iteration after the first waits out the
                // interval before running.
                if index > 0 && !interval.is_zero() {
                    let mut pause = sleep(interval);
                    if let Some(token) = &token {
                        pause = pause.with_token(token);
                    }
                    pause.await?;
                }

                if let Some(token) = &token {
                    token.check()?;
                }

                results.push(body(index)?);
            }

            Ok(results)
        };

        let mut task = Task::from_future(future);
        if let Some(token) = task_token {
            task = task.with_token(&token);
        }

        task
    }
}
