//! Toast messages and yes/no confirmation requests, decoupled from screens.
//!
//! The bus is an explicitly constructed value: whoever builds it receives the
//! single [`ConfirmListener`] and decides which part of the UI owns it.
//! Message subscribers are scoped to the lifetime of their receiver.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

const MESSAGE_CAPACITY: usize = 32;

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// An operation completed.
    Success,
    /// An operation failed.
    Error,
    /// Neutral information.
    Info,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub kind: NoticeKind,
    /// Text shown in the banner.
    pub text: String,
}

/// A pending yes/no question. Dropping it without answering counts as "no".
#[derive(Debug)]
pub struct ConfirmRequest {
    id: u64,
    message: String,
    responder: oneshot::Sender<bool>,
}

impl ConfirmRequest {
    /// Monotonic identifier, unique per bus.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Question to display.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Answer the question, waking the caller suspended in [`NotificationBus::confirm`].
    pub fn resolve(self, answer: bool) {
        debug!(id = self.id, answer, "Confirmation resolved");
        let _ = self.responder.send(answer);
    }
}

/// Receiving side of the confirm channel.
///
/// Requests are queued first-in first-out, each with its own responder, so
/// overlapping confirmations never overwrite one another.
#[derive(Debug)]
pub struct ConfirmListener {
    receiver: mpsc::UnboundedReceiver<ConfirmRequest>,
}

impl ConfirmListener {
    /// Wait for the next request. `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<ConfirmRequest> {
        self.receiver.recv().await
    }

    /// Take the next request if one is already queued.
    pub fn try_recv(&mut self) -> Option<ConfirmRequest> {
        self.receiver.try_recv().ok()
    }
}

/// Publish/subscribe hub for notices and confirmations.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    messages: broadcast::Sender<Notice>,
    confirms: mpsc::UnboundedSender<ConfirmRequest>,
    next_id: Arc<AtomicU64>,
}

impl NotificationBus {
    /// Create a bus and the listener that will answer its confirmations.
    pub fn new() -> (Self, ConfirmListener) {
        let (messages, _) = broadcast::channel(MESSAGE_CAPACITY);
        let (confirms, receiver) = mpsc::unbounded_channel();
        (
            Self {
                messages,
                confirms,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            ConfirmListener { receiver },
        )
    }

    /// Receive every notice published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.messages.subscribe()
    }

    /// Publish a notice. Never blocks; dropped when nobody is subscribed.
    pub fn publish(&self, kind: NoticeKind, text: impl Into<String>) {
        let notice = Notice {
            kind,
            text: text.into(),
        };
        if self.messages.send(notice).is_err() {
            debug!("Notice published with no subscribers");
        }
    }

    /// Publish a success notice.
    pub fn success(&self, text: impl Into<String>) {
        self.publish(NoticeKind::Success, text);
    }

    /// Publish an error notice.
    pub fn error(&self, text: impl Into<String>) {
        self.publish(NoticeKind::Error, text);
    }

    /// Publish an informational notice.
    pub fn info(&self, text: impl Into<String>) {
        self.publish(NoticeKind::Info, text);
    }

    /// Ask the user a yes/no question and wait for the answer.
    ///
    /// Suspends only the calling task. Resolves to `false` if the listener is
    /// gone or the request is dropped unanswered.
    pub async fn confirm(&self, message: impl Into<String>) -> bool {
        let (responder, answer) = oneshot::channel();
        let request = ConfirmRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            message: message.into(),
            responder,
        };
        if self.confirms.send(request).is_err() {
            warn!("Confirmation requested but no listener is attached");
            return false;
        }
        answer.await.unwrap_or(false)
    }
}

/// Display state of the toast banner: at most one notice, auto-dismissed.
#[derive(Debug, Clone)]
pub struct Toast {
    duration: Duration,
    current: Option<(Notice, Instant)>,
}

impl Toast {
    /// Banner that hides each notice after `duration`.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            current: None,
        }
    }

    /// Show `notice`, replacing any visible one and restarting the timer.
    pub fn show(&mut self, notice: Notice, now: Instant) {
        self.current = Some((notice, now));
    }

    /// Notice visible at `now`, if it has not expired.
    pub fn visible(&self, now: Instant) -> Option<&Notice> {
        match &self.current {
            Some((notice, shown_at)) if now.duration_since(*shown_at) < self.duration => {
                Some(notice)
            }
            _ => None,
        }
    }

    /// Drop an expired notice. Returns true if something was hidden.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.current.is_some() && self.visible(now).is_none() {
            self.current = None;
            return true;
        }
        false
    }

    /// Hide the banner immediately.
    pub fn dismiss(&mut self) {
        self.current = None;
    }
}
