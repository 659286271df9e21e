//! # Webhook Monitor
//!
//! Polls the webhook feed on a fixed interval and keeps the most recent
//! snapshot plus a source filter over it. Exactly one fetch runs at a time:
//! the first fires immediately on start, then one per interval until the
//! monitor is stopped. Stopping abandons any fetch still in flight; its
//! response is dropped, never applied.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::IntegrationClient;
use crate::error::TransportError;
use crate::models::WebhookEvent;

/// Source of webhook events for the monitor.
#[async_trait]
pub trait WebhookFeed: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<WebhookEvent>, TransportError>;
}

#[async_trait]
impl WebhookFeed for IntegrationClient {
    async fn fetch_events(&self) -> Result<Vec<WebhookEvent>, TransportError> {
        self.list_webhooks().await
    }
}

/// Filter over event sources.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceFilter {
    #[default]
    All,
    /// Exact, case-sensitive source match
    Source(String),
}

impl SourceFilter {
    fn matches(&self, event: &WebhookEvent) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::Source(source) => event.source == *source,
        }
    }
}

/// What the events region should show.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorView {
    /// The filtered snapshot from the most recent successful poll
    Events(Vec<WebhookEvent>),
    /// The last poll failed; shown until the next success
    Failed(String),
}

#[derive(Debug, Default)]
struct MonitorState {
    events: Vec<WebhookEvent>,
    sources: Vec<String>,
    error: Option<String>,
    /// Completed polls, successful or not; abandoned fetches do not count
    polls: u64,
}

/// Background poller over a [`WebhookFeed`].
///
/// A monitor is single-use: once stopped it stays stopped, and a fresh one
/// is created the next time the events view is activated.
pub struct WebhookMonitor {
    feed: Arc<dyn WebhookFeed>,
    interval: Duration,
    state: Arc<Mutex<MonitorState>>,
    filter: SourceFilter,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WebhookMonitor {
    pub fn new(feed: Arc<dyn WebhookFeed>, interval: Duration) -> Self {
        Self {
            feed,
            interval,
            state: Arc::new(Mutex::new(MonitorState::default())),
            filter: SourceFilter::All,
            shutdown: CancellationToken::new(),
            task: None,
        }
    }

    /// Begin polling: one fetch immediately, then one per interval.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        let feed = Arc::clone(&self.feed);
        let state = Arc::clone(&self.state);
        let shutdown = self.shutdown.clone();
        let poll_interval = self.interval;

        self.task = Some(tokio::spawn(async move {
            info!(
                interval_seconds = poll_interval.as_secs(),
                "webhook monitor started"
            );
            let mut ticker = time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("webhook monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let fetch_started = std::time::Instant::now();
                        let outcome = tokio::select! {
                            _ = shutdown.cancelled() => {
                                debug!("in-flight webhook fetch abandoned");
                                break;
                            }
                            outcome = feed.fetch_events() => outcome,
                        };
                        histogram!("webhook_poll_duration_ms")
                            .record(fetch_started.elapsed().as_secs_f64() * 1_000.0);
                        apply_poll(&state, outcome);
                    }
                }
            }
        }));
    }

    /// Replace the source filter applied by [`view`](Self::view).
    pub fn set_filter(&mut self, filter: SourceFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> &SourceFilter {
        &self.filter
    }

    /// The filtered view of the current snapshot, or the standing error.
    pub fn view(&self) -> MonitorView {
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.error {
            return MonitorView::Failed(message.clone());
        }
        let events = state
            .events
            .iter()
            .filter(|event| self.filter.matches(event))
            .cloned()
            .collect();
        MonitorView::Events(events)
    }

    /// Distinct sources seen in the latest successful snapshot, sorted.
    pub fn sources(&self) -> Vec<String> {
        self.state.lock().unwrap().sources.clone()
    }

    /// Number of polls whose outcome was applied.
    pub fn polls(&self) -> u64 {
        self.state.lock().unwrap().polls
    }

    /// Stop polling and wait for the worker to exit. Any fetch still in
    /// flight is dropped without touching the snapshot.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(join_error) = task.await {
                if !join_error.is_cancelled() {
                    error!(error = %join_error, "webhook monitor worker failed");
                }
            }
        }
    }
}

impl Drop for WebhookMonitor {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn apply_poll(state: &Mutex<MonitorState>, outcome: Result<Vec<WebhookEvent>, TransportError>) {
    match outcome {
        Ok(events) => {
            counter!("webhook_poll_success_total").increment(1);
            debug!(events = events.len(), "webhook snapshot replaced");
            let sources: Vec<String> = events
                .iter()
                .map(|event| event.source.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let mut state = state.lock().unwrap();
            state.events = events;
            state.sources = sources;
            state.error = None;
            state.polls += 1;
        }
        Err(fetch_error) => {
            counter!("webhook_poll_failure_total").increment(1);
            error!(error = %fetch_error, "webhook poll failed");
            let message = fetch_error.user_message("Failed to fetch webhook events");

            let mut state = state.lock().unwrap();
            state.error = Some(message);
            state.polls += 1;
        }
    }
}
