use std::sync::Arc;

use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use trading_assistant_core::{Ask, Conversation, QueryError};

use crate::tui::AppEvent;

pub struct App {
    pub should_quit: bool,
    pub conversation: Conversation,
    /// Endpoint shown in the header
    pub endpoint: String,

    asker: Arc<dyn Ask>,
    events: UnboundedSender<AppEvent>,
    pub query_task: Option<JoinHandle<()>>,

    // Chat scroll state, refreshed on every render
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_total_lines: u16,
    /// Keep the newest message in view until the user scrolls up
    pub follow_bottom: bool,
    pub chat_area: Option<Rect>,

    pub animation_frame: u8, // 0-2 for typing animation
}

impl App {
    pub fn new(asker: Arc<dyn Ask>, events: UnboundedSender<AppEvent>, endpoint: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            conversation: Conversation::new(),
            endpoint: endpoint.into(),
            asker,
            events,
            query_task: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_total_lines: 0,
            follow_bottom: true,
            chat_area: None,
            animation_frame: 0,
        }
    }

    /// Handle Enter in the composer. Spawns the query in the background and
    /// returns true if a question was actually sent.
    pub fn submit(&mut self, shift: bool) -> bool {
        let Some(question) = self.conversation.on_enter(shift) else {
            return false;
        };

        let asker = Arc::clone(&self.asker);
        let events = self.events.clone();
        self.query_task = Some(tokio::spawn(async move {
            let result = asker.ask(&question).await;
            // Receiver is gone only when the app is shutting down
            let _ = events.send(AppEvent::Answer(result));
        }));

        self.animation_frame = 0;
        // Scroll to bottom so the typing indicator is visible
        self.follow_bottom = true;
        true
    }

    pub fn on_answer(&mut self, result: Result<String, QueryError>) {
        self.query_task = None;
        if self.conversation.resolve(result) {
            self.follow_bottom = true;
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.min(self.max_scroll()).saturating_sub(lines);
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    /// Called by the renderer once the wrapped height of the log is known
    pub fn update_chat_metrics(&mut self, area: Rect, total_lines: u16) {
        self.chat_area = Some(area);
        self.chat_height = area.height.saturating_sub(2);
        self.chat_total_lines = total_lines;

        if self.follow_bottom {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }

    /// Abort the in-flight request, if any, before leaving
    pub fn shutdown(&mut self) {
        if let Some(task) = self.query_task.take() {
            task.abort();
        }
    }
}
