use std::sync::Arc;
use std::time::Instant;

use crate::exchange::{ExchangeController, Settlement};
use crate::message::Message;
use crate::notify::ToastQueue;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub endpoint: String,

    // Exchange state. Loading is read from here, never stored separately.
    pub exchange: ExchangeController,
    pub toasts: Arc<ToastQueue>,

    // Prompt input
    pub input: String,
    pub cursor: usize, // cursor position in chars

    // Transcript view
    pub scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub content_lines: u16, // Wrapped transcript height from the last render
    follow_bottom: bool,    // Jump to the end on the next render
    pub selected: Option<usize>, // Selected copyable message (index into transcript)

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(exchange: ExchangeController, toasts: Arc<ToastQueue>, endpoint: String) -> Self {
        Self {
            should_quit: false,
            endpoint,
            exchange,
            toasts,
            input: String::new(),
            cursor: 0,
            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            content_lines: 0,
            follow_bottom: false,
            selected: None,
            animation_frame: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.exchange.is_pending()
    }

    pub fn messages(&self) -> &[Message] {
        self.exchange.transcript()
    }

    // Exchange actions

    pub fn submit_input(&mut self) {
        if self.is_loading() {
            return;
        }
        if self.exchange.submit(&self.input) {
            self.input.clear();
            self.cursor = 0;
            self.selected = None;
            self.scroll_to_bottom();
        }
    }

    pub fn stop(&mut self) {
        self.exchange.cancel();
    }

    pub fn apply_settlement(&mut self, settlement: Settlement) {
        if self.exchange.settle(settlement) {
            self.scroll_to_bottom();
        }
    }

    pub fn clear_chat(&mut self) {
        if self.exchange.clear_transcript() {
            self.scroll = 0;
            self.selected = None;
        }
    }

    /// Copy the selected reply, or the latest one when nothing is selected
    pub fn copy_selected(&mut self) {
        let target = self.selected.or_else(|| self.last_copyable());
        if let Some(index) = target {
            self.exchange.copy_message(index);
        }
    }

    pub fn quit(&mut self) {
        self.exchange.cancel();
        self.should_quit = true;
    }

    // Message selection (copyable replies only)

    fn last_copyable(&self) -> Option<usize> {
        self.messages().iter().rposition(Message::is_copyable)
    }

    pub fn select_prev(&mut self) {
        let before = self.selected.unwrap_or(self.messages().len());
        let prev = self.messages()[..before.min(self.messages().len())]
            .iter()
            .rposition(Message::is_copyable);
        if prev.is_some() {
            self.selected = prev;
        }
    }

    pub fn select_next(&mut self) {
        let Some(current) = self.selected else {
            return;
        };
        self.selected = self
            .messages()
            .iter()
            .enumerate()
            .skip(current + 1)
            .find(|(_, m)| m.is_copyable())
            .map(|(i, _)| i);
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // Scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.visible_height() / 2);
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.visible_height() / 2);
    }

    /// Tick animation frame and expire toasts (called by Tick event)
    pub fn tick(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.toasts.prune(Instant::now());
    }

    /// Scroll so the newest message (or "Thinking...") is visible once the
    /// next frame has measured the wrapped transcript
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
    }

    /// Called by the renderer with the wrapped height of the transcript
    pub fn set_content_lines(&mut self, lines: u16) {
        self.content_lines = lines;
        self.scroll = if std::mem::take(&mut self.follow_bottom) {
            self.max_scroll()
        } else {
            self.scroll.min(self.max_scroll())
        };
    }

    fn max_scroll(&self) -> u16 {
        self.content_lines.saturating_sub(self.visible_height())
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }
}
