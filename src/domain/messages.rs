//! In-memory text message board shared between the desktop and mobile pages

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
    time::SystemTime,
};

use serde::{Deserialize, Serialize};

use crate::domain::utils::{epoch_seconds, format_local_clock};
use crate::errors::AppError;

pub const MAX_MESSAGE_CHARS: usize = 10_000;
pub const MAX_SENDER_CHARS: usize = 64;
const ANONYMOUS_SENDER: &str = "Anonymous";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Message {
    pub sender: String,
    pub content: String,
    pub timestamp: f64,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub sender: Option<String>,
    pub content: String,
}

/// Bounded queue of recent messages, oldest dropped first.
#[derive(Debug)]
pub struct MessageBoard {
    capacity: usize,
    messages: Mutex<VecDeque<Message>>,
}

impl MessageBoard {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            messages: Mutex::new(VecDeque::new()),
        }
    }

    pub fn post(&self, message: NewMessage, now: SystemTime) -> Result<Message, AppError> {
        let content = message.content.trim();
        if content.is_empty() {
            return Err(AppError::malformed("message content is empty"));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::malformed("message content is too long"));
        }

        let sender = message
            .sender
            .as_deref()
            .map(str::trim)
            .filter(|sender| !sender.is_empty())
            .map(|sender| sender.chars().take(MAX_SENDER_CHARS).collect())
            .unwrap_or_else(|| ANONYMOUS_SENDER.to_string());

        let posted = Message {
            sender,
            content: content.to_string(),
            timestamp: epoch_seconds(now),
            time: format_local_clock(now),
        };

        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        messages.push_back(posted.clone());
        while messages.len() > self.capacity {
            messages.pop_front();
        }

        Ok(posted)
    }

    pub fn list(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Removes every message and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        let cleared = messages.len();
        messages.clear();
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_message(sender: Option<&str>, content: &str) -> NewMessage {
        NewMessage {
            sender: sender.map(str::to_string),
            content: content.to_string(),
        }
    }

    #[test]
    fn posts_are_listed_oldest_first() {
        let board = MessageBoard::new(10);
        board
            .post(new_message(Some("phone"), "first"), SystemTime::now())
            .expect("post first");
        board
            .post(new_message(Some("desktop"), " second "), SystemTime::now())
            .expect("post second");

        let messages = board.list();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].sender, "desktop");
        assert_eq!(messages[1].content, "second");
    }

    #[test]
    fn blank_sender_is_anonymous() {
        let board = MessageBoard::new(10);
        let posted = board
            .post(new_message(Some("  "), "hi"), SystemTime::now())
            .expect("post");
        assert_eq!(posted.sender, "Anonymous");
    }

    #[test]
    fn empty_content_is_rejected() {
        let board = MessageBoard::new(10);
        let error = board
            .post(new_message(None, "   "), SystemTime::now())
            .expect_err("expected empty content error");
        assert!(matches!(error, AppError::MalformedRequest { .. }));
        assert!(board.list().is_empty());
    }

    #[test]
    fn capacity_drops_oldest() {
        let board = MessageBoard::new(2);
        for content in ["a", "b", "c"] {
            board
                .post(new_message(None, content), SystemTime::now())
                .expect("post");
        }

        let contents: Vec<String> = board.list().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["b", "c"]);
    }

    #[test]
    fn clear_reports_removed_count() {
        let board = MessageBoard::new(5);
        board
            .post(new_message(None, "hello"), SystemTime::now())
            .expect("post");

        assert_eq!(board.clear(), 1);
        assert!(board.list().is_empty());
    }
}
