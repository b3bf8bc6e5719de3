//! Subscription activation polling
//!
//! After the payment form reports success, the backend activates the
//! subscription asynchronously (webhook). We poll the status endpoint on a
//! fixed interval until it reports active or the attempt budget runs out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::abort::AbortFlag;
use super::api::BillingApi;
use super::config::ReconcilerConfig;
use super::types::{ReconciliationAttempt, SubscriptionStatus};

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Status reported active on this attempt
    Active {
        status: SubscriptionStatus,
        attempts: u32,
    },
    /// Every attempt ran without observing activation
    TimedOut { attempts: u32 },
    /// Loop was cancelled; `attempts` fetches had been issued
    Aborted { attempts: u32 },
}

/// Counts running poll loops
///
/// The guard decrements on drop, so a loop dropped mid-await is still counted
/// correctly.
pub(crate) struct PollGuard {
    active: Arc<AtomicUsize>,
}

impl PollGuard {
    pub(crate) fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            active: Arc::clone(active),
        }
    }
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Poll until the subscription is observed active
///
/// Attempts are strictly sequential: sleep the interval, then fetch. A failed
/// fetch still consumes its attempt. `on_attempt` runs before each fetch.
pub async fn poll_until_active<F>(
    api: &dyn BillingApi,
    config: &ReconcilerConfig,
    abort: &AbortFlag,
    mut on_attempt: F,
) -> PollOutcome
where
    F: FnMut(ReconciliationAttempt) + Send,
{
    let started = Instant::now();

    for attempt_number in 1..=config.max_attempts {
        let issued = attempt_number - 1;

        tokio::select! {
            biased;
            _ = abort.aborted() => {
                debug!(attempts = issued, "Poll loop aborted while waiting");
                return PollOutcome::Aborted { attempts: issued };
            }
            _ = sleep(config.poll_interval) => {}
        }

        on_attempt(ReconciliationAttempt {
            attempt_number,
            elapsed: started.elapsed(),
        });

        let result = tokio::select! {
            biased;
            _ = abort.aborted() => {
                return PollOutcome::Aborted { attempts: attempt_number };
            }
            result = api.get_subscription_status() => result,
        };

        // Teardown during the fetch: drop the result rather than act on it
        if abort.is_aborted() {
            return PollOutcome::Aborted {
                attempts: attempt_number,
            };
        }

        match result {
            Ok(status) if status.is_active() => {
                info!(
                    attempt = attempt_number,
                    tier = status.tier_slug.as_deref().unwrap_or(""),
                    "Subscription activation confirmed"
                );
                return PollOutcome::Active {
                    status,
                    attempts: attempt_number,
                };
            }
            Ok(status) => {
                debug!(
                    attempt = attempt_number,
                    max = config.max_attempts,
                    status = ?status.subscription_status,
                    "Subscription not active yet"
                );
            }
            Err(e) => {
                warn!(
                    attempt = attempt_number,
                    max = config.max_attempts,
                    error = %e,
                    "Status poll failed, attempt consumed"
                );
            }
        }
    }

    info!(
        attempts = config.max_attempts,
        "Activation not observed before poll budget ran out"
    );
    PollOutcome::TimedOut {
        attempts: config.max_attempts,
    }
}
