//! Auto-locate: race several IP geolocation providers and keep the first
//! well-formed answer.
//!
//! Every provider call runs as a task in a [`JoinSet`] owned by [`race`].
//! The first valid success claims the shared [`AcceptedSlot`] and cancels
//! the others. When the overall budget runs out, whatever is still running
//! is aborted, so no lookup outlives the race.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::model::IpLocationGuess;

pub mod provider;

pub use provider::{HttpIpLocator, IpLocator, IpProviderId, locators_for};

pub const DEFAULT_AUTO_LOCATE_BUDGET: Duration = Duration::from_secs(4);

/// Holds at most one value; the first claimant wins.
#[derive(Debug)]
pub struct AcceptedSlot<T> {
    inner: Mutex<Option<T>>,
}

impl<T> Default for AcceptedSlot<T> {
    fn default() -> Self {
        Self { inner: Mutex::new(None) }
    }
}

impl<T> AcceptedSlot<T> {
    /// Store `value` if the slot is still empty. Check and set happen under
    /// one lock acquisition.
    pub fn try_claim(&self, value: T) -> bool {
        let mut slot = self.inner.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }

    pub fn is_claimed(&self) -> bool {
        self.inner.lock().is_some()
    }

    pub fn take(&self) -> Option<T> {
        self.inner.lock().take()
    }
}

/// The accepted guess and which provider supplied it.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceWinner {
    pub provider: String,
    pub guess: IpLocationGuess,
}

/// Query every locator concurrently and return the first usable guess.
///
/// Returns `None` when every provider failed, returned nothing usable, or
/// the budget elapsed first. Provider failures are only logged.
pub async fn race(locators: &[Arc<dyn IpLocator>], budget: Duration) -> Option<RaceWinner> {
    if locators.is_empty() {
        return None;
    }

    let slot: Arc<AcceptedSlot<RaceWinner>> = Arc::new(AcceptedSlot::default());
    let token = CancellationToken::new();
    let mut tasks = JoinSet::new();

    for locator in locators {
        let locator = Arc::clone(locator);
        let slot = Arc::clone(&slot);
        let token = token.clone();

        tasks.spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => return,
                outcome = locator.locate() => outcome,
            };

            match outcome {
                Ok(guess) if guess.is_empty() => {
                    tracing::debug!(provider = locator.name(), "provider returned no usable location");
                }
                Ok(guess) => {
                    let winner = RaceWinner { provider: locator.name().to_string(), guess };
                    if slot.try_claim(winner) {
                        tracing::debug!(provider = locator.name(), "provider won auto-locate race");
                        token.cancel();
                    } else {
                        tracing::debug!(provider = locator.name(), "late provider result discarded");
                    }
                }
                Err(e) => {
                    tracing::debug!(provider = locator.name(), error = %e, "provider lookup failed");
                }
            }
        });
    }

    let deadline = tokio::time::sleep(budget);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = &mut deadline => {
                tracing::debug!(?budget, "auto-locate budget elapsed");
                break;
            }
            joined = tasks.join_next() => {
                if joined.is_none() {
                    break;
                }
            }
        }
    }

    token.cancel();
    tasks.abort_all();

    let winner = slot.take();
    match &winner {
        Some(w) => tracing::info!(provider = %w.provider, city = ?w.guess.city, "auto-locate succeeded"),
        None => tracing::info!("auto-locate found no location"),
    }
    winner
}
