//! User-facing notices (the toast channel of every screen)

use chrono::{DateTime, Local};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Types of notices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NoticeKind::Info => "info",
            NoticeKind::Success => "success",
            NoticeKind::Warning => "warning",
            NoticeKind::Error => "error",
        }
    }
}

/// Notice with type, content and the time it was raised
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
            timestamp: Local::now(),
        }
    }
}

/// Sink for transient notices, injected into every component that raises one
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);

    fn info(&self, message: &str) {
        self.notify(NoticeKind::Info, message);
    }

    fn success(&self, message: &str) {
        self.notify(NoticeKind::Success, message);
    }

    fn warning(&self, message: &str) {
        self.notify(NoticeKind::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(NoticeKind::Error, message);
    }
}

/// Keeps notices in memory; backs the TUI status bar and the tests
#[derive(Debug)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
    max_history: usize,
}

impl Default for NoticeLog {
    fn default() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
            max_history: 100,
        }
    }
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.lock().clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.lock().iter().filter(|n| n.kind == kind).count()
    }

    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notice>> {
        // a panic while holding the lock cannot leave the Vec half-written
        self.notices.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, kind: NoticeKind, message: &str) {
        let mut notices = self.lock();
        notices.push(Notice::new(kind, message));
        if notices.len() > self.max_history {
            notices.remove(0);
        }
    }
}

/// Writes notices to the log; used by the command line where there is no status bar
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Info | NoticeKind::Success => info!(kind = kind.as_str(), "{}", message),
            NoticeKind::Warning => warn!("{}", message),
            NoticeKind::Error => error!("{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_log_keeps_order_and_trims_history() {
        let log = NoticeLog::new().with_history(2);
        log.success("one");
        log.warning("two");
        log.error("three");

        let notices = log.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].message, "two");
        assert_eq!(log.last().unwrap().kind, NoticeKind::Error);
        assert_eq!(log.count(NoticeKind::Error), 1);
    }

    #[test]
    fn test_drain_empties_log() {
        let log = NoticeLog::new();
        log.notify(NoticeKind::Info, "hello");
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
    }
}
