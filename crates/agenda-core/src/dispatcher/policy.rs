//! Polling and dispatch policies

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{Error, Result};

/// How tool outputs are handled once a run requires action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Submit outputs back to the run and keep polling until it finishes
    Conversational,
    /// Return outputs to the caller; the run is left waiting
    Direct,
}

/// Handling of tool calls that name an unregistered function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFunctionPolicy {
    /// Abort the whole batch before any tool runs
    #[default]
    FailFast,
    /// Answer that call with an error result and run the others
    ReportError,
}

impl std::str::FromStr for UnknownFunctionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(Self::FailFast),
            "report_error" => Ok(Self::ReportError),
            other => Err(Error::Config(format!("unknown function policy: {}", other))),
        }
    }
}

/// Delay schedule and limits for polling a run
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay after the first pending poll
    pub interval: Duration,
    /// Multiplier applied after each pending poll (1.0 = fixed interval)
    pub backoff_factor: f64,
    /// Upper bound for the delay
    pub max_interval: Duration,
    /// Give up after this many pending polls
    pub max_attempts: Option<u32>,
    /// Give up after this much wall-clock time
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(2))
    }
}

impl PollPolicy {
    /// Fixed interval, no limits
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff_factor: 1.0,
            max_interval: interval,
            max_attempts: None,
            timeout: None,
        }
    }

    /// Exponential backoff from `interval` up to `max_interval`
    pub fn exponential(interval: Duration, factor: f64, max_interval: Duration) -> Self {
        Self {
            interval,
            backoff_factor: factor.max(1.0),
            max_interval: max_interval.max(interval),
            max_attempts: None,
            timeout: None,
        }
    }

    /// Limit the number of pending polls
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Limit the total time spent polling
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Delay following `current`
    pub fn next_delay(&self, current: Duration) -> Duration {
        if self.backoff_factor.is_nan() || self.backoff_factor <= 1.0 {
            return current;
        }
        // overflow saturates at the cap
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// Mutable polling state for one run
pub(crate) struct PollState<'a> {
    policy: &'a PollPolicy,
    attempts: u32,
    started: Instant,
    delay: Duration,
}

impl<'a> PollState<'a> {
    pub(crate) fn new(policy: &'a PollPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            started: Instant::now(),
            delay: policy.interval,
        }
    }

    /// Number of pending polls since the last progress
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Restart the delay schedule after the run made progress
    pub(crate) fn reset(&mut self) {
        self.attempts = 0;
        self.delay = self.policy.interval;
    }

    /// Record a pending poll and sleep until the next one
    ///
    /// Fails with [`Error::PollTimeout`] once a limit is hit and with
    /// [`Error::Cancelled`] when a shutdown signal arrives.
    pub(crate) async fn wait(
        &mut self,
        run_id: &str,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<()> {
        self.attempts += 1;

        let attempts_exhausted = self
            .policy
            .max_attempts
            .is_some_and(|max| self.attempts >= max);
        let timed_out = self
            .policy
            .timeout
            .is_some_and(|t| self.started.elapsed() >= t);

        if attempts_exhausted || timed_out {
            return Err(Error::PollTimeout {
                run_id: run_id.to_string(),
                attempts: self.attempts,
            });
        }

        debug!(
            run_id,
            attempt = self.attempts,
            delay = ?self.delay,
            "waiting for the assistant to process"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            signal = shutdown.recv() => match signal {
                // nobody can signal any more; keep polling
                Err(broadcast::error::RecvError::Closed) => tokio::time::sleep(self.delay).await,
                _ => {
                    info!(run_id, "Shutdown requested while polling");
                    return Err(Error::Cancelled);
                }
            }
        }

        self.delay = self.policy.next_delay(self.delay);
        Ok(())
    }
}
