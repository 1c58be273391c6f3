//! Fire-and-forget user notifications.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Error,
}

impl NotifyLevel {
    pub fn label(&self) -> &'static str {
        match self {
            NotifyLevel::Info => "info",
            NotifyLevel::Success => "ok",
            NotifyLevel::Error => "error",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str, description: Option<&str>);
}

/// How long a toast stays on screen
pub const TOAST_TTL: Duration = Duration::from_secs(4);

/// Oldest toasts are dropped past this count
const MAX_TOASTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: NotifyLevel,
    pub message: String,
    pub description: Option<String>,
    pub created: Instant,
}

/// Notifications as short-lived toasts drawn by the TUI.
#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: Mutex<VecDeque<Toast>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current toasts, oldest first
    pub fn visible(&self) -> Vec<Toast> {
        let toasts = self.toasts.lock().unwrap_or_else(|e| e.into_inner());
        toasts.iter().cloned().collect()
    }

    /// Drop toasts older than `TOAST_TTL`. Called on every tick.
    pub fn prune(&self, now: Instant) {
        let mut toasts = self.toasts.lock().unwrap_or_else(|e| e.into_inner());
        toasts.retain(|t| now.saturating_duration_since(t.created) < TOAST_TTL);
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, level: NotifyLevel, message: &str, description: Option<&str>) {
        let mut toasts = self.toasts.lock().unwrap_or_else(|e| e.into_inner());
        toasts.push_back(Toast {
            level,
            message: message.to_string(),
            description: description.map(str::to_string),
            created: Instant::now(),
        });
        while toasts.len() > MAX_TOASTS {
            toasts.pop_front();
        }
    }
}

/// Prints notifications to stderr (one-shot prompt mode).
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NotifyLevel, message: &str, description: Option<&str>) {
        match description {
            Some(detail) => eprintln!("[{}] {}: {}", level.label(), message, detail),
            None => eprintln!("[{}] {}", level.label(), message),
        }
    }
}
