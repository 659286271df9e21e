//! Session-scoped shared state: the client handle and the notice board.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::debug;

use crate::client::IntegrationClient;

/// Kind of a transient notice line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient status line shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Default)]
struct NoticeSlot {
    current: Option<Notice>,
    /// Bumped on every post so an expired timer cannot clear a newer notice
    generation: u64,
    timer: Option<AbortHandle>,
}

impl NoticeSlot {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for NoticeSlot {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Holds the most recent notice for a session.
///
/// Success notices clear themselves once the TTL elapses; error notices stay
/// until replaced or cleared. Posting anything cancels the previous timer,
/// and dropping the last handle cancels whatever timer is still pending.
#[derive(Clone)]
pub struct NoticeBoard {
    slot: Arc<Mutex<NoticeSlot>>,
    ttl: Duration,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(NoticeSlot::default())),
            ttl,
        }
    }

    /// Post a success line and schedule its dismissal.
    ///
    /// Must be called from within a tokio runtime; the dismissal timer is a
    /// spawned task.
    pub fn post_success(&self, text: impl Into<String>) {
        let text = text.into();
        let mut slot = self.slot.lock().unwrap();
        slot.cancel_timer();
        slot.generation += 1;
        slot.current = Some(Notice {
            kind: NoticeKind::Success,
            text,
        });

        let generation = slot.generation;
        // The task holds only a weak handle so an ended session drops the
        // slot, and the slot's Drop aborts the sleeping timer.
        let shared = Arc::downgrade(&self.slot);
        let ttl = self.ttl;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let mut slot = shared.lock().unwrap();
            if slot.generation == generation {
                debug!("success notice expired");
                slot.current = None;
                slot.timer = None;
            }
        });
        slot.timer = Some(handle.abort_handle());
    }

    /// Post an error line. Errors do not expire on their own.
    pub fn post_error(&self, text: impl Into<String>) {
        let mut slot = self.slot.lock().unwrap();
        slot.cancel_timer();
        slot.generation += 1;
        slot.current = Some(Notice {
            kind: NoticeKind::Error,
            text: text.into(),
        });
    }

    /// The notice currently on display, if any.
    pub fn current(&self) -> Option<Notice> {
        self.slot.lock().unwrap().current.clone()
    }

    /// Drop the current notice and cancel its timer.
    pub fn clear(&self) {
        let mut slot = self.slot.lock().unwrap();
        slot.cancel_timer();
        slot.generation += 1;
        slot.current = None;
    }
}

/// Everything a flow needs for one operator session.
#[derive(Clone)]
pub struct SessionContext {
    pub client: Arc<IntegrationClient>,
    pub notices: NoticeBoard,
}

impl SessionContext {
    pub fn new(client: IntegrationClient, notice_ttl: Duration) -> Self {
        Self {
            client: Arc::new(client),
            notices: NoticeBoard::new(notice_ttl),
        }
    }
}
