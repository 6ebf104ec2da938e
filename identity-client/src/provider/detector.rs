//! # Provider Detector
//!
//! Browser extensions inject their provider object some time after page
//! load, so presence is polled for a bounded window instead of checked once.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::app::state::SessionAction;
use crate::app::store::SessionStore;
use crate::config::ClientConfig;
use crate::core::service::ProviderGateway;
use crate::provider::connection::exposed_address;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 12;

/// Why polling stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The store already held a connected address.
    AlreadyConnected,
    /// The provider exposed an authorised address, now adopted.
    AddressFound(String),
    /// All attempts used. `detected` is the last presence reading.
    Exhausted { detected: bool },
}

#[derive(Clone)]
pub struct ProviderDetector {
    gateway: Arc<dyn ProviderGateway>,
    store: SessionStore,
    interval: Duration,
    max_attempts: u32,
}

impl ProviderDetector {
    pub fn new(gateway: Arc<dyn ProviderGateway>, store: SessionStore) -> Self {
        Self {
            gateway,
            store,
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn from_config(gateway: Arc<dyn ProviderGateway>, store: SessionStore, config: &ClientConfig) -> Self {
        Self::new(gateway, store).with_schedule(config.detect_interval(), config.detect_attempts)
    }

    pub fn with_schedule(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.interval = interval;
        self.max_attempts = max_attempts;
        self
    }

    /// Read provider presence; the store is only written when it changed.
    pub fn detect(&self) -> bool {
        let detected = self.gateway.detect();
        if self.store.provider_detected() != detected {
            tracing::debug!(detected, "Provider presence changed");
            self.store.dispatch(SessionAction::ProviderDetected(detected));
        }
        detected
    }

    /// Poll until an address is connected or the attempts run out.
    pub async fn poll(&self) -> PollOutcome {
        let mut ticker = tokio::time::interval(self.interval);
        let mut detected = false;

        for attempt in 1..=self.max_attempts {
            ticker.tick().await;

            if self.store.connected_address().is_some() {
                tracing::debug!(attempt, "Provider polling cancelled: already connected");
                return PollOutcome::AlreadyConnected;
            }

            detected = self.detect();
            if !detected {
                continue;
            }

            if let Some(address) = exposed_address(self.gateway.as_ref()) {
                tracing::info!(attempt, address = %address, "Provider exposes an authorised address");
                self.store.dispatch(SessionAction::ConnectionSucceeded {
                    address: address.clone(),
                });
                return PollOutcome::AddressFound(address);
            }
        }

        tracing::debug!(detected, attempts = self.max_attempts, "Provider polling finished");
        PollOutcome::Exhausted { detected }
    }

    /// Run [`ProviderDetector::poll`] in the background.
    pub fn spawn(&self) -> JoinHandle<PollOutcome> {
        let detector = self.clone();
        tokio::spawn(async move { detector.poll().await })
    }
}
