use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::sleep;

/// Which pass of the bounded retry loop an attempt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// One of the evenly spaced initial attempts (1-based).
    Numbered { number: u32, of: u32 },
    /// The single extra attempt made after the longer settle delay.
    Final,
}

/// Bounded-retry parameters, independent of what is being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_delay: Duration,
    pub final_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_delay: Duration::from_secs(1),
            final_delay: Duration::from_secs(2),
        }
    }
}

/// Run `attempt` until it succeeds or the policy is exhausted:
/// `max_attempts` numbered passes spaced by `attempt_delay`, then one
/// `Final` pass after `final_delay`. The caller decides what each pass
/// does; connect flows issue connect requests on numbered passes and a
/// last session probe on the final one.
pub async fn run_with_retry<'a, T, E, F>(policy: RetryPolicy, mut attempt: F) -> Result<T, E>
where
    F: FnMut(Attempt) -> BoxFuture<'a, Result<T, E>>,
{
    for number in 1..=policy.max_attempts {
        if let Ok(value) = attempt(Attempt::Numbered {
            number,
            of: policy.max_attempts,
        })
        .await
        {
            return Ok(value);
        }
        if number < policy.max_attempts {
            sleep(policy.attempt_delay).await;
        }
    }
    sleep(policy.final_delay).await;
    attempt(Attempt::Final).await
}
