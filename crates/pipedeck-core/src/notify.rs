//! User-facing notifications raised by the transport layer.
//!
//! The transport reports failed requests through a [`Notifier`] before the
//! error is handed back to the caller. Front ends decide how a notice is
//! shown; the default implementation only logs it.

use std::sync::{Mutex, PoisonError};

use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    /// HTTP status, `None` when no response was received
    pub status: Option<u16>,
    pub message: String,
}

impl Notice {
    /// Notice for a failed response, keyed by status code.
    pub fn for_status(status: u16) -> Self {
        let (level, message) = match status {
            401 => (
                NoticeLevel::Warning,
                "Session expired, please log in again".to_string(),
            ),
            403 => (
                NoticeLevel::Error,
                "You do not have permission to perform this action".to_string(),
            ),
            404 => (NoticeLevel::Error, "Resource not found".to_string()),
            500 => (NoticeLevel::Error, "Internal server error".to_string()),
            other => (NoticeLevel::Error, format!("Request failed: {}", other)),
        };
        Self {
            level,
            status: Some(status),
            message,
        }
    }

    /// Notice for a request that never got a response.
    pub fn network(timed_out: bool) -> Self {
        let message = if timed_out {
            "Request timed out, please check the network"
        } else {
            "Request failed, please check the network"
        };
        Self {
            level: NoticeLevel::Error,
            status: None,
            message: message.to_string(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Default notifier: notices go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Warning => warn!(status = ?notice.status, "{}", notice.message),
            NoticeLevel::Error => error!(status = ?notice.status, "{}", notice.message),
        }
    }
}

/// Keeps every notice in memory, in order.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_messages_by_status() {
        assert!(Notice::for_status(403).message.contains("permission"));
        assert_eq!(Notice::for_status(404).message, "Resource not found");
        assert_eq!(Notice::for_status(500).message, "Internal server error");
        assert_eq!(Notice::for_status(502).message, "Request failed: 502");
        assert_eq!(Notice::for_status(401).level, NoticeLevel::Warning);
        assert_eq!(Notice::network(true).status, None);
    }

    #[test]
    fn test_collecting_notifier_take_drains() {
        let notifier = CollectingNotifier::new();
        notifier.notify(Notice::for_status(404));
        notifier.notify(Notice::network(false));
        assert_eq!(notifier.notices().len(), 2);
        assert_eq!(notifier.take().len(), 2);
        assert!(notifier.notices().is_empty());
    }
}
