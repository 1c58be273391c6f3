//! Test doubles for the responder, notifier and clipboard seams.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::clipboard::Clipboard;
use crate::error::ExchangeError;
use crate::notify::{Notifier, NotifyLevel};
use crate::responder::Responder;

/// Answers every prompt with the same result, immediately
pub struct Scripted(pub Result<String, ExchangeError>);

#[async_trait]
impl Responder for Scripted {
    async fn respond(&self, _prompt: &str) -> Result<String, ExchangeError> {
        self.0.clone()
    }
}

/// Never settles on its own; only cancellation ends the exchange
pub struct NeverResponds;

#[async_trait]
impl Responder for NeverResponds {
    async fn respond(&self, _prompt: &str) -> Result<String, ExchangeError> {
        futures_util::future::pending().await
    }
}

pub type NotifyCall = (NotifyLevel, String, Option<String>);

#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<NotifyCall>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, level: NotifyLevel) -> usize {
        self.calls().iter().filter(|(l, _, _)| *l == level).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str, description: Option<&str>) {
        self.calls.lock().unwrap().push((
            level,
            message.to_string(),
            description.map(str::to_string),
        ));
    }
}

#[derive(Clone, Default)]
pub struct FakeClipboard {
    pub copied: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl FakeClipboard {
    pub fn copied(&self) -> Vec<String> {
        self.copied.lock().unwrap().clone()
    }
}

impl Clipboard for FakeClipboard {
    fn copy(&mut self, text: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("no display");
        }
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
