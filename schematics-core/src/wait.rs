//! Wait - Poll a remote job until it reaches a terminal status
//!
//! The caller supplies a fetch function that reads the job and a classifier
//! that maps what was fetched onto [`Progress`]. Time is measured with
//! `tokio::time`, so tests can run with a paused clock.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Classification of one poll result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Still running; carries the observed status for diagnostics
    Pending(String),
    /// Reached a terminal status
    Done,
    /// A status that is neither pending nor terminal
    Unexpected(String),
}

/// Poll timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Wait before the first fetch
    pub delay: Duration,
    /// Wait between fetches
    pub interval: Duration,
    /// Overall deadline, measured from the call
    pub timeout: Duration,
}

impl PollOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            delay: Duration::from_secs(10),
            interval: Duration::from_secs(10),
            timeout,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Poll error
#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
    #[error("failed to fetch status: {0}")]
    Fetch(#[source] E),

    #[error("timed out after {elapsed:?} waiting for a terminal status (last status '{last_status}')")]
    Timeout {
        elapsed: Duration,
        last_status: String,
    },

    #[error("unexpected status '{0}'")]
    UnexpectedStatus(String),

    #[error("wait cancelled")]
    Cancelled,
}

/// Poll until `classify` reports [`Progress::Done`]
///
/// A fetch error stops polling immediately. Returns the value fetched by the
/// last (terminal) poll.
pub async fn poll<T, E, F, Fut, C>(
    mut fetch: F,
    classify: C,
    options: &PollOptions,
    cancel: &CancellationToken,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&T) -> Progress,
{
    let start = Instant::now();
    let deadline = start + options.timeout;

    // The first fetch happens no later than the deadline
    sleep_or_cancel(options.delay.min(options.timeout), cancel).await?;

    loop {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            r = fetch() => r,
        };
        let value = fetched.map_err(PollError::Fetch)?;

        let status = match classify(&value) {
            Progress::Done => return Ok(value),
            Progress::Unexpected(status) => return Err(PollError::UnexpectedStatus(status)),
            Progress::Pending(status) => status,
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::Timeout {
                elapsed: now - start,
                last_status: status,
            });
        }

        log::debug!("job status '{}', polling again", status);
        sleep_or_cancel(options.interval.min(deadline - now), cancel).await?;
    }
}

async fn sleep_or_cancel<E>(
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), PollError<E>> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PollError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn classify(status: &String) -> Progress {
        match status.as_str() {
            "job_pending" | "job_in_progress" => Progress::Pending(status.clone()),
            "job_finished" | "job_failed" => Progress::Done,
            other => Progress::Unexpected(other.to_string()),
        }
    }

    fn options() -> PollOptions {
        PollOptions::new(Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_third_poll() {
        let mut statuses: VecDeque<&str> =
            VecDeque::from(["job_pending", "job_in_progress", "job_finished"]);
        let mut calls = 0;

        let result: Result<String, PollError<String>> = poll(
            || {
                calls += 1;
                let next = statuses.pop_front().map(str::to_string);
                async move { next.ok_or_else(|| "exhausted".to_string()) }
            },
            classify,
            &options(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.unwrap(), "job_finished");
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_never_terminal() {
        let mut calls = 0;
        let start = Instant::now();

        let result: Result<String, PollError<String>> = poll(
            || {
                calls += 1;
                async { Ok("job_in_progress".to_string()) }
            },
            classify,
            &PollOptions::new(Duration::from_secs(35)),
            &CancellationToken::new(),
        )
        .await;

        match result {
            Err(PollError::Timeout { last_status, .. }) => {
                assert_eq!(last_status, "job_in_progress");
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
        // polls at 10s, 20s, 30s and a final one clamped to the 35s deadline
        assert_eq!(calls, 4);
        assert_eq!(start.elapsed(), Duration::from_secs(35));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_shorter_than_delay_bounds_the_wait() {
        let mut calls = 0;
        let start = Instant::now();

        let result: Result<String, PollError<String>> = poll(
            || {
                calls += 1;
                async { Ok("job_in_progress".to_string()) }
            },
            classify,
            &PollOptions::new(Duration::from_secs(1)).with_interval(Duration::from_secs(1)),
            &CancellationToken::new(),
        )
        .await;

        match result {
            Err(PollError::Timeout { elapsed, last_status }) => {
                assert_eq!(elapsed, Duration::from_secs(1));
                assert_eq!(last_status, "job_in_progress");
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
        assert_eq!(calls, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_stops_immediately() {
        let mut calls = 0;

        let result: Result<String, PollError<String>> = poll(
            || {
                calls += 1;
                async { Err("HTTP 500".to_string()) }
            },
            classify,
            &options(),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(PollError::Fetch(ref e)) if e == "HTTP 500"));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_status_is_an_error() {
        let result: Result<String, PollError<String>> = poll(
            || async { Ok("job_exploded".to_string()) },
            classify,
            &options(),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(PollError::UnexpectedStatus(s)) if s == "job_exploded"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut calls = 0;

        let result: Result<String, PollError<String>> = poll(
            || {
                calls += 1;
                async { Ok("job_pending".to_string()) }
            },
            classify,
            &options(),
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(PollError::Cancelled)));
        assert_eq!(calls, 0);
    }
}
