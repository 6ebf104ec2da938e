//! # Session Tracker
//!
//! Page-view session lifecycle for the current identity, independent of
//! wallet state: start, page records, periodic heartbeat, end.
//!
//! Tracking is best effort. Every backend failure is logged at `warn` and
//! swallowed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shared::{DeviceCategory, SessionStartRequest};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::app::identity::{KeyValueStorage, ORIGINAL_REFERRER_KEY};
use crate::core::service::IdentityApi;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// What the embedding page knows when a session starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub path: String,
    /// Native referrer of the current document.
    pub referrer: Option<String>,
    pub screen_width: Option<u32>,
}

impl SessionContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_screen_width(mut self, width: u32) -> Self {
        self.screen_width = Some(width);
        self
    }
}

#[derive(Default)]
struct TrackerState {
    /// Identity whose session was started in this load.
    user_id: Option<String>,
    last_path: Option<String>,
    heartbeat: Option<JoinHandle<()>>,
}

pub struct SessionTracker {
    api: Arc<dyn IdentityApi>,
    cookies: Option<Arc<dyn KeyValueStorage>>,
    heartbeat_interval: Duration,
    state: Mutex<TrackerState>,
    ended: AtomicBool,
}

impl SessionTracker {
    pub fn new(api: Arc<dyn IdentityApi>) -> Self {
        Self {
            api,
            cookies: None,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            state: Mutex::new(TrackerState::default()),
            ended: AtomicBool::new(false),
        }
    }

    /// Cookie jar holding the one-time `original_referrer` slot.
    pub fn with_cookies(mut self, cookies: Arc<dyn KeyValueStorage>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.ended.load(Ordering::SeqCst) && self.state.lock().user_id.is_some()
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.state
            .lock()
            .heartbeat
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Start the session for `user_id` and record the first page.
    ///
    /// Returns `false` when a session for this identity was already started
    /// in this load, or when the backend refused it.
    #[tracing::instrument(skip(self, context), fields(path = %context.path))]
    pub async fn start(&self, user_id: &str, context: SessionContext) -> bool {
        let previous = {
            let mut state = self.state.lock();
            if state.user_id.as_deref() == Some(user_id) {
                return false;
            }
            // Identity changed: the previous heartbeat belongs to another user
            if let Some(handle) = state.heartbeat.take() {
                handle.abort();
            }
            state.last_path = None;
            state.user_id.replace(user_id.to_string())
        };
        if let Some(previous) = previous {
            if !self.ended.swap(true, Ordering::SeqCst) {
                self.close(&previous).await;
            }
        }
        self.ended.store(false, Ordering::SeqCst);

        let request = SessionStartRequest {
            referrer: self.take_original_referrer().or(context.referrer),
            screen_width: context.screen_width,
            device: context.screen_width.map(DeviceCategory::from_width),
        };

        if let Err(err) = self.api.start_session(user_id, &request).await {
            tracing::warn!(user_id = %user_id, error = %err, "Failed to start session");
            let mut state = self.state.lock();
            if state.user_id.as_deref() == Some(user_id) {
                state.user_id = None;
            }
            return false;
        }

        tracing::info!(
            user_id = %user_id,
            device = request.device.map(|d| d.as_str()).unwrap_or("unknown"),
            "Session started"
        );
        self.spawn_heartbeat(user_id);
        self.record_page(&context.path).await;
        true
    }

    /// Read and clear the redirect-preserved referrer.
    fn take_original_referrer(&self) -> Option<String> {
        let cookies = self.cookies.as_ref()?;
        let referrer = match cookies.get(ORIGINAL_REFERRER_KEY) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read original referrer");
                return None;
            }
        };
        if referrer.is_some() {
            if let Err(err) = cookies.remove(ORIGINAL_REFERRER_KEY) {
                tracing::warn!(error = %err, "Failed to clear original referrer");
            }
        }
        referrer.filter(|r| !r.is_empty())
    }

    fn spawn_heartbeat(&self, user_id: &str) {
        let api = self.api.clone();
        let user_id = user_id.to_string();
        let period = self.heartbeat_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if let Err(err) = api.heartbeat(&user_id).await {
                    tracing::warn!(error = %err, "Session heartbeat failed");
                }
            }
        });

        if let Some(previous) = self.state.lock().heartbeat.replace(handle) {
            previous.abort();
        }
    }

    /// Record a navigation. Unchanged paths are skipped.
    pub async fn record_page(&self, path: &str) -> bool {
        if self.ended.load(Ordering::SeqCst) {
            return false;
        }

        let user_id = {
            let mut state = self.state.lock();
            let Some(user_id) = state.user_id.clone() else {
                return false;
            };
            if state.last_path.as_deref() == Some(path) {
                return false;
            }
            state.last_path = Some(path.to_string());
            user_id
        };

        if let Err(err) = self.api.record_page(&user_id, path).await {
            tracing::warn!(path, error = %err, "Failed to record page view");
        }
        true
    }

    /// Send one heartbeat now, outside the schedule.
    pub async fn heartbeat(&self) -> bool {
        if self.ended.load(Ordering::SeqCst) {
            return false;
        }
        let Some(user_id) = self.state.lock().user_id.clone() else {
            return false;
        };

        if let Err(err) = self.api.heartbeat(&user_id).await {
            tracing::warn!(error = %err, "Session heartbeat failed");
        }
        true
    }

    /// The page lost visibility; report engagement without waiting for the
    /// next tick. Nothing is sent once the heartbeat was stopped.
    pub async fn page_hidden(&self) -> bool {
        if !self.is_heartbeat_running() {
            return false;
        }
        self.heartbeat().await
    }

    /// End the session. Runs at most once per started session, however many
    /// teardown paths call it.
    #[tracing::instrument(skip(self))]
    pub async fn end(&self) -> bool {
        if self.ended.swap(true, Ordering::SeqCst) {
            return false;
        }

        let user_id = {
            let mut state = self.state.lock();
            if let Some(handle) = state.heartbeat.take() {
                handle.abort();
            }
            state.user_id.clone()
        };
        let Some(user_id) = user_id else {
            return false;
        };

        self.close(&user_id).await;
        true
    }

    /// Beacon first, awaited request as fallback.
    async fn close(&self, user_id: &str) {
        if self.api.send_end_beacon(user_id) {
            tracing::debug!(user_id = %user_id, "Session end queued");
            return;
        }

        if let Err(err) = self.api.end_session(user_id).await {
            tracing::warn!(user_id = %user_id, error = %err, "Failed to end session");
        }
    }

    /// Stop the heartbeat without ending the session (logout, teardown).
    pub fn stop(&self) {
        if let Some(handle) = self.state.lock().heartbeat.take() {
            tracing::debug!("Session heartbeat stopped");
            handle.abort();
        }
    }
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().heartbeat.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::identity::MemoryStorage;
    use crate::test_support::FakeApi;

    const INTERVAL: Duration = Duration::from_millis(30_000);

    fn tracker() -> (SessionTracker, Arc<FakeApi>) {
        let api = Arc::new(FakeApi::new());
        let tracker = SessionTracker::new(api.clone()).with_heartbeat_interval(INTERVAL);
        (tracker, api)
    }

    #[tokio::test]
    async fn test_start_once_per_identity() {
        let (tracker, api) = tracker();

        assert!(tracker.start("U1", SessionContext::new("/")).await);
        assert!(!tracker.start("U1", SessionContext::new("/")).await);

        assert_eq!(api.count("start_session"), 1);
        assert_eq!(api.pages.lock().clone(), vec!["/".to_string()]);
        assert!(tracker.is_active());
    }

    #[tokio::test]
    async fn test_unchanged_path_recorded_once() {
        let (tracker, api) = tracker();
        tracker.start("U1", SessionContext::new("/")).await;

        assert!(!tracker.record_page("/").await);
        assert!(tracker.record_page("/wallet").await);
        assert!(!tracker.record_page("/wallet").await);
        assert!(tracker.record_page("/").await);

        assert_eq!(api.pages.lock().clone(), vec!["/", "/wallet", "/"]);
    }

    #[tokio::test]
    async fn test_record_page_before_start_is_ignored() {
        let (tracker, api) = tracker();
        assert!(!tracker.record_page("/").await);
        assert!(!tracker.heartbeat().await);
        assert_eq!(api.calls.lock().len(), 0);
    }

    #[tokio::test]
    async fn test_referrer_cookie_read_once() {
        let api = Arc::new(FakeApi::new());
        let cookies = Arc::new(MemoryStorage::new());
        cookies
            .set(ORIGINAL_REFERRER_KEY, "https://partner.example/landing")
            .unwrap();

        let context = SessionContext::new("/")
            .with_referrer("https://auth.example/callback")
            .with_screen_width(800);
        let first = SessionTracker::new(api.clone()).with_cookies(cookies.clone());
        first.start("U1", context.clone()).await;
        let second = SessionTracker::new(api.clone()).with_cookies(cookies.clone());
        second.start("U1", context).await;

        let starts = api.session_starts.lock().clone();
        assert_eq!(starts[0].referrer.as_deref(), Some("https://partner.example/landing"));
        assert_eq!(starts[1].referrer.as_deref(), Some("https://auth.example/callback"));
        assert_eq!(starts[0].device, Some(DeviceCategory::Tablet));
        assert_eq!(starts[0].screen_width, Some(800));
        assert_eq!(cookies.get(ORIGINAL_REFERRER_KEY).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_plateaus_after_stop() {
        let (tracker, api) = tracker();
        tracker.start("U1", SessionContext::new("/")).await;

        tokio::time::sleep(INTERVAL / 2).await;
        assert_eq!(api.count("heartbeat"), 0);

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(api.count("heartbeat"), 3);

        tracker.stop();
        assert!(!tracker.is_heartbeat_running());
        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(api.count("heartbeat"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_hidden_sends_immediately() {
        let (tracker, api) = tracker();
        tracker.start("U1", SessionContext::new("/")).await;

        assert!(tracker.page_hidden().await);
        assert_eq!(api.count("heartbeat"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_hidden_after_stop_is_ignored() {
        let (tracker, api) = tracker();
        tracker.start("U1", SessionContext::new("/")).await;
        tracker.stop();

        assert!(!tracker.page_hidden().await);
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(api.count("heartbeat"), 0);
    }

    #[tokio::test]
    async fn test_end_fires_once() {
        let (tracker, api) = tracker();
        tracker.start("U1", SessionContext::new("/")).await;

        let (a, b) = tokio::join!(tracker.end(), tracker.end());

        assert!(a ^ b);
        assert_eq!(api.count("end_session"), 1);
        assert!(!tracker.is_active());
        assert!(!tracker.is_heartbeat_running());
        assert!(!tracker.record_page("/after").await);
    }

    #[tokio::test]
    async fn test_end_prefers_beacon() {
        let (tracker, api) = tracker();
        api.beacon_supported.store(true, Ordering::SeqCst);
        tracker.start("U1", SessionContext::new("/")).await;

        assert!(tracker.end().await);
        assert!(!tracker.end().await);

        assert_eq!(api.count("end_beacon"), 1);
        assert_eq!(api.count("end_session"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_swallowed() {
        let (tracker, api) = tracker();
        api.fail_sessions.store(true, Ordering::SeqCst);

        assert!(!tracker.start("U1", SessionContext::new("/")).await);
        assert!(!tracker.is_heartbeat_running());

        // Backend back: start can be retried
        api.fail_sessions.store(false, Ordering::SeqCst);
        assert!(tracker.start("U1", SessionContext::new("/")).await);

        api.fail_sessions.store(true, Ordering::SeqCst);
        assert!(tracker.record_page("/wallet").await);
        tokio::time::sleep(INTERVAL * 2 + INTERVAL / 2).await;
        assert_eq!(api.count("heartbeat"), 2);
        assert!(tracker.end().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_change_restarts_session() {
        let (tracker, api) = tracker();
        tracker.start("U1", SessionContext::new("/")).await;
        assert!(tracker.start("U2", SessionContext::new("/")).await);

        tokio::time::sleep(INTERVAL + INTERVAL / 2).await;
        assert_eq!(api.count("start_session"), 2);
        assert_eq!(api.count("heartbeat"), 1);
        assert_eq!(api.ended_sessions.lock().clone(), vec!["U1".to_string()]);

        assert!(tracker.end().await);
        assert_eq!(api.ended_sessions.lock().clone(), vec!["U1".to_string(), "U2".to_string()]);
    }

    #[tokio::test]
    async fn test_identity_change_after_end_does_not_end_twice() {
        let (tracker, api) = tracker();
        tracker.start("U1", SessionContext::new("/")).await;
        assert!(tracker.end().await);

        assert!(tracker.start("U2", SessionContext::new("/")).await);

        assert_eq!(api.ended_sessions.lock().clone(), vec!["U1".to_string()]);
        assert!(tracker.is_active());
    }
}
