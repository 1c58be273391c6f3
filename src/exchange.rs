//! Exchange lifecycle: one prompt in flight at a time, every settlement
//! turned into exactly one assistant message.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clipboard::Clipboard;
use crate::error::ExchangeError;
use crate::message::Message;
use crate::notify::{Notifier, NotifyLevel};
use crate::responder::Responder;
use crate::transcript::TranscriptStore;

/// Transcript text for any failed exchange. Details go to the notifier.
pub const ERROR_REPLY: &str = "Sorry, I encountered an error while processing your request.";

/// Transcript text for an exchange the user stopped
pub const STOPPED_REPLY: &str = "Response stopped by user.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Replied(String),
    Cancelled,
    Failed(ExchangeError),
}

/// Result of one outbound call, tagged with the exchange it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub exchange_id: u64,
    pub outcome: Outcome,
}

pub type SettlementReceiver = mpsc::UnboundedReceiver<Settlement>;

struct PendingExchange {
    id: u64,
    cancel: CancellationToken,
}

impl Drop for PendingExchange {
    fn drop(&mut self) {
        // Abandon the outbound call if the controller goes away mid-flight
        self.cancel.cancel();
    }
}

enum ExchangeState {
    Idle,
    Pending(PendingExchange),
}

pub struct ExchangeController {
    transcript: TranscriptStore,
    state: ExchangeState,
    next_id: u64,
    responder: Arc<dyn Responder>,
    notifier: Arc<dyn Notifier>,
    clipboard: Box<dyn Clipboard>,
    settlements: mpsc::UnboundedSender<Settlement>,
}

impl ExchangeController {
    /// Settlements for submitted prompts arrive on the returned receiver and
    /// must be handed back through [`ExchangeController::settle`].
    pub fn new(
        responder: Arc<dyn Responder>,
        notifier: Arc<dyn Notifier>,
        clipboard: Box<dyn Clipboard>,
    ) -> (Self, SettlementReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            transcript: TranscriptStore::new(),
            state: ExchangeState::Idle,
            next_id: 1,
            responder,
            notifier,
            clipboard,
            settlements: tx,
        };
        (controller, rx)
    }

    pub fn transcript(&self) -> &[Message] {
        self.transcript.all()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ExchangeState::Pending(_))
    }

    pub fn pending_exchange_id(&self) -> Option<u64> {
        match &self.state {
            ExchangeState::Pending(pending) => Some(pending.id),
            ExchangeState::Idle => None,
        }
    }

    /// Start an exchange. Returns false (and does nothing) for blank prompts
    /// or while another exchange is in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, prompt: &str) -> bool {
        if prompt.trim().is_empty() {
            debug!("ignoring blank prompt");
            return false;
        }
        if let Some(id) = self.pending_exchange_id() {
            debug!(exchange_id = id, "exchange already in flight, ignoring submit");
            return false;
        }

        self.transcript.append(Message::user(prompt));

        let id = self.next_id;
        self.next_id += 1;
        let cancel = CancellationToken::new();
        tokio::spawn(run_exchange(
            id,
            prompt.to_string(),
            Arc::clone(&self.responder),
            cancel.clone(),
            self.settlements.clone(),
        ));

        info!(
            exchange_id = id,
            prompt_chars = prompt.chars().count(),
            "exchange submitted"
        );
        self.state = ExchangeState::Pending(PendingExchange { id, cancel });
        true
    }

    /// Ask the in-flight exchange to stop. The cancellation notice is appended
    /// when its settlement comes back, not here.
    pub fn cancel(&mut self) -> bool {
        match &self.state {
            ExchangeState::Pending(pending) => {
                if !pending.cancel.is_cancelled() {
                    info!(exchange_id = pending.id, "cancelling exchange");
                    pending.cancel.cancel();
                }
                true
            }
            ExchangeState::Idle => false,
        }
    }

    /// Apply a settlement: append the assistant message, notify, go idle.
    /// Settlements for anything but the current exchange are ignored.
    pub fn settle(&mut self, settlement: Settlement) -> bool {
        let pending = match std::mem::replace(&mut self.state, ExchangeState::Idle) {
            ExchangeState::Pending(pending) if pending.id == settlement.exchange_id => pending,
            other => {
                warn!(exchange_id = settlement.exchange_id, "ignoring stale settlement");
                self.state = other;
                return false;
            }
        };

        // A stop request beats a reply that raced it in
        let outcome = if pending.cancel.is_cancelled() {
            Outcome::Cancelled
        } else {
            settlement.outcome
        };

        match outcome {
            Outcome::Replied(reply) => {
                info!(
                    exchange_id = pending.id,
                    reply_chars = reply.chars().count(),
                    "exchange replied"
                );
                self.transcript.append(Message::assistant(reply));
            }
            Outcome::Cancelled => {
                info!(exchange_id = pending.id, "exchange cancelled");
                self.transcript.append(Message::cancelled(STOPPED_REPLY));
                self.notifier
                    .notify(NotifyLevel::Info, "Response stopped", None);
            }
            Outcome::Failed(err) => {
                warn!(exchange_id = pending.id, error = %err, "exchange failed");
                self.transcript.append(Message::error(ERROR_REPLY));
                self.notifier.notify(
                    NotifyLevel::Error,
                    "Failed to get response",
                    Some(&err.to_string()),
                );
            }
        }

        true
    }

    /// Empty the transcript. Refused while an exchange is in flight.
    pub fn clear_transcript(&mut self) -> bool {
        if self.is_pending() {
            debug!("refusing to clear transcript while an exchange is pending");
            return false;
        }

        self.transcript.clear();
        info!("transcript cleared");
        self.notifier.notify(NotifyLevel::Success, "Chat cleared", None);
        true
    }

    /// Copy the message at `index` to the clipboard. Only real assistant
    /// replies can be copied.
    pub fn copy_message(&mut self, index: usize) -> bool {
        let content = match self.transcript.all().get(index) {
            Some(message) if message.is_copyable() => message.content().to_string(),
            _ => return false,
        };

        match self.clipboard.copy(&content) {
            Ok(()) => {
                self.notifier
                    .notify(NotifyLevel::Success, "Copied to clipboard", None);
                true
            }
            Err(e) => {
                warn!(error = %e, "clipboard copy failed");
                self.notifier.notify(
                    NotifyLevel::Error,
                    "Failed to copy",
                    Some(&e.to_string()),
                );
                false
            }
        }
    }
}

async fn run_exchange(
    id: u64,
    prompt: String,
    responder: Arc<dyn Responder>,
    cancel: CancellationToken,
    settlements: mpsc::UnboundedSender<Settlement>,
) {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Outcome::Cancelled,
        result = responder.respond(&prompt) => match result {
            Ok(reply) => Outcome::Replied(reply),
            Err(err) => Outcome::Failed(err),
        },
    };

    if settlements
        .send(Settlement {
            exchange_id: id,
            outcome,
        })
        .is_err()
    {
        debug!(exchange_id = id, "settlement receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageKind, Role};
    use crate::testing::{FakeClipboard, NeverResponds, RecordingNotifier, Scripted};

    struct Harness {
        controller: ExchangeController,
        settlements: SettlementReceiver,
        notifier: Arc<RecordingNotifier>,
        clipboard: FakeClipboard,
    }

    impl Harness {
        fn new(responder: impl Responder + 'static) -> Self {
            Self::with_clipboard(responder, FakeClipboard::default())
        }

        fn with_clipboard(responder: impl Responder + 'static, clipboard: FakeClipboard) -> Self {
            let notifier = Arc::new(RecordingNotifier::default());
            let (controller, settlements) = ExchangeController::new(
                Arc::new(responder),
                notifier.clone(),
                Box::new(clipboard.clone()),
            );
            Self {
                controller,
                settlements,
                notifier,
                clipboard,
            }
        }

        async fn settle_next(&mut self) -> bool {
            let settlement = self.settlements.recv().await.expect("settlement");
            self.controller.settle(settlement)
        }

        fn contents(&self) -> Vec<(Role, MessageKind, String)> {
            self.controller
                .transcript()
                .iter()
                .map(|m| (m.role(), m.kind(), m.content().to_string()))
                .collect()
        }
    }

    #[tokio::test]
    async fn test_hello_round_trip() {
        let mut h = Harness::new(Scripted(Ok("hi there".into())));

        assert!(h.controller.submit("hello"));
        assert!(h.controller.is_pending());
        assert_eq!(
            h.contents(),
            vec![(Role::User, MessageKind::Normal, "hello".into())]
        );

        assert!(h.settle_next().await);
        assert!(!h.controller.is_pending());
        assert_eq!(
            h.contents(),
            vec![
                (Role::User, MessageKind::Normal, "hello".into()),
                (Role::Assistant, MessageKind::Normal, "hi there".into()),
            ]
        );
        assert!(h.notifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_submit_while_pending_is_ignored() {
        let mut h = Harness::new(NeverResponds);

        assert!(h.controller.submit("first"));
        assert!(!h.controller.submit("second"));
        assert!(!h.controller.submit("third"));

        assert_eq!(h.controller.transcript().len(), 1);
        assert_eq!(h.controller.transcript()[0].content(), "first");
        assert!(h.controller.is_pending());
    }

    #[tokio::test]
    async fn test_blank_prompt_is_ignored() {
        let mut h = Harness::new(Scripted(Ok("unused".into())));

        assert!(!h.controller.submit(""));
        assert!(!h.controller.submit("   \n\t"));
        assert!(h.controller.transcript().is_empty());
        assert!(!h.controller.is_pending());
    }

    #[tokio::test]
    async fn test_prompt_kept_verbatim() {
        let mut h = Harness::new(Scripted(Ok("ok".into())));

        assert!(h.controller.submit("  padded prompt  "));
        assert_eq!(h.controller.transcript()[0].content(), "  padded prompt  ");
    }

    #[tokio::test]
    async fn test_failure_appends_generic_error() {
        let mut h = Harness::new(Scripted(Err(ExchangeError::Status(500))));

        h.controller.submit("x");
        assert!(h.settle_next().await);

        let transcript = h.controller.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].kind(), MessageKind::Error);
        assert_eq!(transcript[1].content(), ERROR_REPLY);
        assert!(!h.controller.is_pending());

        let calls = h.notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, NotifyLevel::Error);
        assert_eq!(calls[0].2.as_deref(), Some("responder returned HTTP 500"));
    }

    #[tokio::test]
    async fn test_cancel_appends_single_stop_notice() {
        let mut h = Harness::new(NeverResponds);

        h.controller.submit("x");
        assert!(h.controller.cancel());
        // Still pending until the settlement is applied
        assert!(h.controller.is_pending());
        assert_eq!(h.controller.transcript().len(), 1);

        assert!(h.settle_next().await);

        assert_eq!(
            h.contents()[1],
            (Role::Assistant, MessageKind::Cancelled, STOPPED_REPLY.into())
        );
        assert_eq!(h.controller.transcript().len(), 2);
        assert!(!h.controller.is_pending());
        assert_eq!(h.notifier.count(NotifyLevel::Info), 1);
        assert_eq!(h.notifier.count(NotifyLevel::Error), 0);
    }

    #[tokio::test]
    async fn test_repeated_cancel_settles_once() {
        let mut h = Harness::new(NeverResponds);

        h.controller.submit("x");
        h.controller.cancel();
        h.controller.cancel();
        h.settle_next().await;

        assert_eq!(h.controller.transcript().len(), 2);
        assert!(h.settlements.try_recv().is_err());
        assert_eq!(h.notifier.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let mut h = Harness::new(Scripted(Ok("unused".into())));

        assert!(!h.controller.cancel());
        assert!(h.controller.transcript().is_empty());
        assert!(h.notifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_beats_racing_reply() {
        let mut h = Harness::new(NeverResponds);

        h.controller.submit("x");
        let id = h.controller.pending_exchange_id().expect("pending");
        h.controller.cancel();

        // A reply that arrives after the stop request still reads as stopped
        assert!(h.controller.settle(Settlement {
            exchange_id: id,
            outcome: Outcome::Replied("late reply".into()),
        }));
        assert_eq!(h.controller.transcript()[1].kind(), MessageKind::Cancelled);

        // The task's own settlement is now stale
        assert!(!h.settle_next().await);
        assert_eq!(h.controller.transcript().len(), 2);
        assert_eq!(h.notifier.count(NotifyLevel::Info), 1);
    }

    #[tokio::test]
    async fn test_stale_settlement_ignored() {
        let mut h = Harness::new(NeverResponds);

        assert!(!h.controller.settle(Settlement {
            exchange_id: 99,
            outcome: Outcome::Replied("ghost".into()),
        }));
        assert!(h.controller.transcript().is_empty());

        h.controller.submit("x");
        assert!(!h.controller.settle(Settlement {
            exchange_id: 99,
            outcome: Outcome::Replied("ghost".into()),
        }));
        assert!(h.controller.is_pending());
        assert_eq!(h.controller.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_state_cycles_per_submit() {
        let mut h = Harness::new(Scripted(Ok("pong".into())));

        for round in 1..=3 {
            assert!(h.controller.submit("ping"));
            assert!(h.settle_next().await);
            assert!(!h.controller.is_pending());
            assert_eq!(h.controller.transcript().len(), round * 2);
        }
    }

    #[tokio::test]
    async fn test_clear_refused_while_pending() {
        let mut h = Harness::new(NeverResponds);

        h.controller.submit("x");
        assert!(!h.controller.clear_transcript());
        assert_eq!(h.controller.transcript().len(), 1);
        assert!(h.notifier.calls().is_empty());

        h.controller.cancel();
        h.settle_next().await;

        assert!(h.controller.clear_transcript());
        assert!(h.controller.transcript().is_empty());
        let calls = h.notifier.calls();
        assert_eq!(calls.last().map(|c| c.0), Some(NotifyLevel::Success));
    }

    #[tokio::test]
    async fn test_copy_reply() {
        let mut h = Harness::new(Scripted(Ok("copy me".into())));

        h.controller.submit("x");
        h.settle_next().await;

        // The user's own message has no copy affordance
        assert!(!h.controller.copy_message(0));
        assert!(h.controller.copy_message(1));
        assert_eq!(h.clipboard.copied(), vec!["copy me".to_string()]);
        assert_eq!(h.notifier.count(NotifyLevel::Success), 1);
    }

    #[tokio::test]
    async fn test_copy_refuses_error_messages() {
        let mut h = Harness::new(Scripted(Err(ExchangeError::EmptyResponse)));

        h.controller.submit("x");
        h.settle_next().await;

        assert!(!h.controller.copy_message(1));
        assert!(!h.controller.copy_message(7));
        assert!(h.clipboard.copied().is_empty());
    }

    #[tokio::test]
    async fn test_copy_failure_notifies_error() {
        let clipboard = FakeClipboard {
            fail: true,
            ..FakeClipboard::default()
        };
        let mut h = Harness::with_clipboard(Scripted(Ok("copy me".into())), clipboard);

        h.controller.submit("x");
        h.settle_next().await;

        assert!(!h.controller.copy_message(1));
        let calls = h.notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, NotifyLevel::Error);
        assert_eq!(calls[0].2.as_deref(), Some("no display"));
    }
}
