//! Transcript entry types
//!
//! These types are shared by the exchange controller and the UI and don't
//! depend on any specific UI framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    kind: MessageKind,
    content: String,
    timestamp: DateTime<Utc>,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

/// Distinguishes real replies from error and cancellation notices without
/// encoding the distinction in the content text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageKind {
    #[default]
    Normal,
    Error,
    Cancelled,
}

impl MessageKind {
    /// Glyph shown in front of error and cancellation notices
    pub fn glyph(&self) -> Option<&'static str> {
        match self {
            MessageKind::Normal => None,
            MessageKind::Error => Some("✗"),
            MessageKind::Cancelled => Some("■"),
        }
    }
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, MessageKind::Normal, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageKind::Normal, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageKind::Error, content)
    }

    pub fn cancelled(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageKind::Cancelled, content)
    }

    fn new(role: Role, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Only real assistant replies get the copy affordance.
    pub fn is_copyable(&self) -> bool {
        self.role == Role::Assistant && self.kind == MessageKind::Normal
    }
}
