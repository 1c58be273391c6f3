pub mod app;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod exchange;
pub mod handler;
pub mod message;
pub mod notify;
pub mod responder;
pub mod transcript;
pub mod tui;
pub mod ui;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use app::App;
pub use clipboard::{Clipboard, SystemClipboard};
pub use config::Config;
pub use error::ExchangeError;
pub use exchange::{ExchangeController, Outcome, Settlement, SettlementReceiver};
pub use message::{Message, MessageKind, Role};
pub use notify::{ConsoleNotifier, Notifier, NotifyLevel, ToastQueue};
pub use responder::{HttpResponder, Responder};
pub use transcript::TranscriptStore;
