//! # Client Events
//!
//! Transient notifications for the embedding UI (toasts, banners). Delivery
//! is best effort: with no receiver attached, or a closed one, events are
//! dropped.

use async_channel::{Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// User-facing message.
    Notice { level: NoticeLevel, message: String },
    /// The active identity was replaced by the owner of a verified wallet.
    IdentitySwapped { previous: String, current: String },
    /// The connected wallet belongs to another identity.
    LoginRequired { address: String, existing_owner: String },
}

/// Cloneable, optional event sender.
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<ClientEvent>>,
}

impl EventSink {
    /// Sink that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Unbounded sink plus its receiver.
    pub fn channel() -> (Self, Receiver<ClientEvent>) {
        let (tx, rx) = async_channel::unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: ClientEvent) {
        if let Some(tx) = &self.tx {
            if tx.try_send(event).is_err() {
                tracing::debug!("Client event dropped: receiver closed");
            }
        }
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(ClientEvent::Notice {
            level,
            message: message.into(),
        });
    }
}
